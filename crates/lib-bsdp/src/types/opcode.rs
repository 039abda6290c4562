use std::fmt::Display;

use binbuf::prelude::*;

use crate::ProtocolError;

/// The BOOTP direction marker in the first byte of every message. The
/// INFORMs this server accepts arrive as `BootRequest`; every ACK it
/// emits carries `BootReply`. No other value is legal in the op field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    BootRequest,
    BootReply,
}

impl TryFrom<u8> for OpCode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::BootRequest),
            2 => Ok(Self::BootReply),
            other => Err(ProtocolError::InvalidOpCode(other)),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(opcode: OpCode) -> Self {
        match opcode {
            OpCode::BootRequest => 1,
            OpCode::BootReply => 2,
        }
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpCode::BootRequest => write!(f, "BOOTREQUEST"),
            OpCode::BootReply => write!(f, "BOOTREPLY"),
        }
    }
}

impl Readable for OpCode {
    type Error = BufferError;

    fn read<E: Endianness>(buf: &mut ReadBuffer<'_>) -> Result<Self, Self::Error> {
        Self::try_from(buf.pop()?).map_err(|_| BufferError::InvalidData)
    }
}

impl Writeable for OpCode {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        buf.push(u8::from(*self));
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_values_outside_the_wire_range() {
        assert!(OpCode::try_from(0).is_err());
        assert!(OpCode::try_from(3).is_err());

        let mut buf = ReadBuffer::new(&[0x07]);
        assert_eq!(OpCode::read_be(&mut buf), Err(BufferError::InvalidData));
    }
}
