mod class_identifier;
mod message_type;

pub use class_identifier::*;
pub use message_type::*;
