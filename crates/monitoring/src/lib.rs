//! Logging setup for the Tansu event services
//!
//! ```rust,no_run
//! use monitoring::{LogDestination, init_logging};
//!
//! fn main() -> anyhow::Result<()> {
//!     // keep the guard alive for file logging
//!     let _guard = init_logging("info", LogDestination::from_env())?;
//!     Ok(())
//! }
//! ```

pub mod logging;

pub use logging::{LogDestination, MAX_LOG_MESSAGE_LENGTH, init_logging, truncate_message};
