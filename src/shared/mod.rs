pub mod config;
pub mod error;
pub mod trends;

pub use config::AppConfig;
pub use error::{AppError, Result};
