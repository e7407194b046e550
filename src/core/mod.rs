//! Infrastructure shared by the whole bot: configuration, errors, logging.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_startup_configuration};
