pub mod analysis;
pub mod entry;
pub mod json_block;
pub mod mood;
pub mod qa;
pub mod time_serde;

mod error;

pub use error::{Error, Result};
