use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid opcode ({0})")]
    InvalidOpCode(u8),

    #[error("Invalid DHCP message type ({0})")]
    InvalidMessageType(u8),

    #[error("Invalid BSDP message type ({0})")]
    InvalidBsdpMessageType(u8),
}
