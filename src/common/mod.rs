pub mod config;
pub mod error;
pub mod paths;

pub use config::{Config, RearmPolicy};
pub use error::{FaceLockError, Result};
pub use paths::Paths;
