//! Configuration validation
//!
//! The validator runs a fixed set of [`ValidationRule`]s over the raw document
//! and aggregates their messages into a [`ValidationReport`], so a user sees
//! every problem in a single run.

pub mod rules;
pub mod validator;

pub use rules::{ensure_local_directory, LocalPathStatus, ValidationRule};
pub use validator::{validate, ValidationReport, Validator};
