//! Core Module - Audit Engine
//!
//! Pattern rules, analysis modules, the module registry, the aggregator,
//! the keyword relabel pass and the report assembler.

pub mod aggregator;
pub mod modules;
pub mod registry;
pub mod relabel;
pub mod report;
pub mod rules;
pub mod scorecard;

pub use aggregator::{Aggregation, Aggregator};
pub use modules::AnalysisModule;
pub use registry::{ModuleRegistry, RegistryBuilder};
pub use relabel::KeywordRisks;
pub use scorecard::{level_from_risk, PassPolicy, ScoreCard};
