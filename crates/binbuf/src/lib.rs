mod endianness;
mod error;
mod read;
mod write;

pub use endianness::*;
pub use error::*;
pub use read::*;
pub use write::*;

pub mod prelude {
    pub use crate::{
        BigEndian, BufferError, Endianness, LittleEndian, ReadBuffer, Readable, ReadableMulti,
        WriteBuffer, Writeable,
    };
}
