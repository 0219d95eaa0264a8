//! Configuration module.
//!
//! Environment variable parsing and tuning knobs.

pub mod env;
pub mod matcher;

pub use env::EnvConfig;
pub use matcher::MatchConfig;
