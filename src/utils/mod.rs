//! Utils Module - Helper Functions & Shared Utilities
//!
//! Constants, input validation, source-text helpers and the report store.

pub mod cache;
pub mod constants;
pub mod source;

pub use cache::*;
pub use constants::*;
pub use source::*;
