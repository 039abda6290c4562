use crate::{BufferError, Endianness};

/// A growable output buffer. Writers return the number of bytes they
/// appended so composite types can report their encoded size.
#[derive(Default)]
pub struct WriteBuffer {
    buf: Vec<u8>,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn push(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    pub fn write_slice(&mut self, slice: &[u8]) {
        self.buf.extend_from_slice(slice);
    }

    pub fn bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

pub trait Writeable {
    type Error: From<BufferError>;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error>;

    fn write_be(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        self.write::<crate::BigEndian>(buf)
    }
}

impl Writeable for u8 {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        buf.push(*self);
        Ok(1)
    }
}

impl Writeable for u16 {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        buf.write_slice(&E::u16_to_bytes(*self));
        Ok(2)
    }
}

impl Writeable for u32 {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        buf.write_slice(&E::u32_to_bytes(*self));
        Ok(4)
    }
}

impl Writeable for u64 {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        buf.write_slice(&E::u64_to_bytes(*self));
        Ok(8)
    }
}

impl Writeable for u128 {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        buf.write_slice(&E::u128_to_bytes(*self));
        Ok(16)
    }
}

impl Writeable for Vec<u8> {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        buf.write_slice(self);
        Ok(self.len())
    }
}

impl Writeable for &[u8] {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        buf.write_slice(self);
        Ok(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::Readable;

    #[test]
    fn write_primitives() {
        let mut buf = WriteBuffer::new();

        assert_eq!(0x01u8.write_be(&mut buf).unwrap(), 1);
        assert_eq!(0x0203u16.write_be(&mut buf).unwrap(), 2);
        assert_eq!(0x0405_0607u32.write_be(&mut buf).unwrap(), 4);

        assert_eq!(buf.bytes(), &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
    }

    #[test]
    fn round_trip_u128() {
        let value = 0x0011_2233_4455_6677_8899_aabb_ccdd_eeffu128;

        let mut out = WriteBuffer::new();
        value.write_be(&mut out).unwrap();

        let mut buf = crate::ReadBuffer::new(out.bytes());
        assert_eq!(u128::read_be(&mut buf).unwrap(), value);
    }
}
