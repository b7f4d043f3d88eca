pub mod config;
pub mod error;

pub use config::GembotConfig;
pub use error::{GembotError, Result};
