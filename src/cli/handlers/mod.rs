//! Command handlers
//!
//! Each handler receives the loaded configuration and an
//! [`OutputFormatter`](crate::cli::OutputFormatter) and owns its own output.

mod check;
mod config;
#[cfg(feature = "api")]
mod serve;

pub use check::{CheckReport, Statistics, Violation, check_store, handle_check_command};
pub use config::handle_config_command;
#[cfg(feature = "api")]
pub use serve::handle_serve_command;
