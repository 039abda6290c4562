pub mod types;

mod catalog;
mod constants;
mod entitlement;
mod error;
mod prefetch;
mod server;
mod utils;

pub use catalog::*;
pub use constants::*;
pub use entitlement::*;
pub use error::*;
pub use prefetch::*;
pub use server::*;
pub use utils::*;
