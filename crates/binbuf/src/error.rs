use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("Buffer too short")]
    BufTooShort,

    #[error("Invalid data")]
    InvalidData,

    #[error("Max buffer length overflow")]
    MaxLengthOverflow,

    #[error("Invalid buffer jump index")]
    InvalidJumpIndex,
}
