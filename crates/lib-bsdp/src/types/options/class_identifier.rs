use std::fmt::Display;

use binbuf::prelude::*;

/// Vendor class identifier (option 60). BSDP requests carry
/// `AAPLBSDPC/<arch>/<model>`; replies carry the bare `AAPLBSDPC`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassIdentifier(String);

impl ClassIdentifier {
    pub fn new(ident: impl Into<String>) -> Self {
        Self(ident.into())
    }

    pub fn from_bytes(value: &[u8]) -> Self {
        Self(String::from_utf8_lossy(value).into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `/`-separated field at `index`, if present.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.0.split('/').nth(index)
    }
}

impl Display for ClassIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Writeable for ClassIdentifier {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        self.0.as_bytes().write::<E>(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_extraction() {
        let ident = ClassIdentifier::new("AAPLBSDPC/i386/Mac-7DF21CB3ED6977E5");

        assert_eq!(ident.field(0), Some("AAPLBSDPC"));
        assert_eq!(ident.field(2), Some("Mac-7DF21CB3ED6977E5"));
        assert_eq!(ident.field(3), None);
    }
}
