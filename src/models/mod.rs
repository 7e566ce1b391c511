//! Models Module - Data Structures & Configuration
//!
//! Single source of truth for shared types, report shapes and configuration.

pub mod config;
pub mod errors;
pub mod report;
pub mod types;

pub use config::*;
pub use errors::*;
pub use report::*;
pub use types::*;
