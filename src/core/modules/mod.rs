//! Analysis Modules
//!
//! Every module is a pure function of an `AuditInput`: it owns a local
//! `ScoreCard`, applies its rules and returns an immutable `ModuleResult`.
//! Modules share nothing except the compiled-pattern cache.

pub mod code_quality;
pub mod defi;
pub mod meta;
pub mod security;
pub mod trust;

pub use code_quality::*;
pub use defi::*;
pub use meta::*;
pub use security::*;
pub use trust::*;

use crate::models::{AppResult, AuditInput, ModuleDescriptor, ModuleResult};

/// A named, categorized bundle of pattern rules plus a scoring policy
pub trait AnalysisModule: Send + Sync {
    fn descriptor(&self) -> ModuleDescriptor;

    /// Score one input. An `Err` (or a panic) is substituted by the aggregator.
    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult>;

    fn id(&self) -> &'static str {
        self.descriptor().id
    }
}
