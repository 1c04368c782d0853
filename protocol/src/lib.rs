pub mod client;
pub mod error;
pub mod messages;

pub use error::{Error, Result};
