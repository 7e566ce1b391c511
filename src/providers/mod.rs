//! Providers Module - External Data Sources
//!
//! Chain intelligence behind a trait so modules stay pure and tests stay
//! deterministic.

pub mod intel;

pub use intel::*;
