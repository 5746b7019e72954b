pub mod config;
pub mod errors;
pub mod types;

pub use config::AppConfig;
pub use errors::CaptureError;
pub use types::*;
