//! Utility modules for berth
//!
//! Currently this only holds structured logging setup.

pub mod logging;

pub use logging::{init_logging, LoggingConfig};
