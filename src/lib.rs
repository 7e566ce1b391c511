//! Contract Guard Library
//!
//! Heuristic smart-contract audit engine. Solidity source text (plus optional
//! bytecode) runs through an ordered registry of independent analysis
//! modules; the aggregator folds their scores into a single report with a
//! free view and a payment-gated premium view.
//!
//! Findings are pattern matches, not proofs: no control-flow analysis,
//! no bytecode disassembly.

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{Aggregator, AnalysisModule, ModuleRegistry};
pub use models::{
    AppError, AppResult, AuditConfig, AuditInput, AuditReport, ErrorCode, Issue, IntelMode,
    ModuleResult, ServerConfig, Severity,
};
pub use providers::{intel_for, ChainIntel, NoChainIntel, SimulatedChainIntel, StaticChainIntel};
pub use utils::cache::{AuditRecord, ReportStore, StoreStats};
