use binbuf::prelude::*;
use thiserror::Error;

mod data;
mod tag;

pub use data::*;
pub use tag::*;

#[derive(Debug, Error)]
pub enum OptionError {
    #[error("Invalid option data: {0}")]
    InvalidData(#[from] OptionDataError),

    #[error("Option value of {0} bytes does not fit the 8-bit length field")]
    ValueTooLong(usize),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
}

/// A single DHCP option as it appears in the variable-length tail of a
/// message. The length octet is derived from the data on write, so the two
/// can never disagree.
#[derive(Debug, Clone)]
pub struct DhcpOption {
    data: OptionData,
}

impl DhcpOption {
    pub fn new(data: OptionData) -> Self {
        Self { data }
    }

    pub fn tag(&self) -> OptionTag {
        self.data.tag()
    }

    pub fn data(&self) -> &OptionData {
        &self.data
    }
}

impl Readable for DhcpOption {
    type Error = OptionError;

    fn read<E: Endianness>(buf: &mut ReadBuffer<'_>) -> Result<Self, Self::Error> {
        let tag = OptionTag::from(buf.pop()?);

        // Pad and End carry no length octet
        if tag == OptionTag::Pad {
            return Ok(Self::new(OptionData::Pad));
        }
        if tag == OptionTag::End {
            return Ok(Self::new(OptionData::End));
        }

        let len = buf.pop()? as usize;
        let value = buf.read_slice(len)?;
        let data = OptionData::parse::<E>(tag, value)?;

        Ok(Self::new(data))
    }
}

impl Writeable for DhcpOption {
    type Error = OptionError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        if matches!(self.data, OptionData::Pad | OptionData::End) {
            self.tag().write::<E>(buf)?;
            return Ok(1);
        }

        let mut value = WriteBuffer::new();
        self.data.write::<E>(&mut value)?;

        if value.len() > u8::MAX as usize {
            return Err(OptionError::ValueTooLong(value.len()));
        }

        let mut n = self.tag().write::<E>(buf)?;
        n += (value.len() as u8).write::<E>(buf)?;
        buf.write_slice(value.bytes());

        Ok(n + value.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_known_option() {
        let data = [54, 4, 192, 0, 2, 1];
        let mut buf = ReadBuffer::new(&data);

        let option = DhcpOption::read_be(&mut buf).unwrap();
        assert_eq!(option.tag(), OptionTag::ServerIdentifier);
        assert!(matches!(
            option.data(),
            OptionData::ServerIdentifier(ip) if ip.octets() == [192, 0, 2, 1]
        ));
    }

    #[test]
    fn unknown_option_keeps_raw_value() {
        let data = [12, 3, b'm', b'a', b'c'];
        let mut buf = ReadBuffer::new(&data);

        let option = DhcpOption::read_be(&mut buf).unwrap();
        assert_eq!(option.tag(), OptionTag::Unknown(12));
        assert!(matches!(option.data(), OptionData::Unknown(_, v) if v == b"mac"));
    }

    #[test]
    fn write_recomputes_length() {
        let option = DhcpOption::new(OptionData::RootPath("nfs:192.0.2.1:/nbi:x.dmg".into()));

        let mut buf = WriteBuffer::new();
        let n = option.write_be(&mut buf).unwrap();

        assert_eq!(n, buf.len());
        assert_eq!(buf.bytes()[0], 17);
        assert_eq!(buf.bytes()[1] as usize, n - 2);
    }
}
