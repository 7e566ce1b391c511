//! Module Registry
//!
//! Ordered, read-only list of analysis modules. Built once (usually via
//! `ModuleRegistry::standard`) and injected into the aggregator; ids are
//! checked for uniqueness at build time.

use std::sync::Arc;
use tracing::info;

use crate::core::modules::*;
use crate::models::{AppError, AppResult, ModuleDescriptor};
use crate::providers::ChainIntel;

#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn AnalysisModule>>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.ids())
            .finish()
    }
}

impl ModuleRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The full 26-module sweep, in report order
    pub fn standard(intel: Arc<dyn ChainIntel>) -> Self {
        let modules: Vec<Arc<dyn AnalysisModule>> = vec![
            Arc::new(GasOptimizationModule),
            Arc::new(ReentrancyModule),
            Arc::new(IntegerOverflowModule),
            Arc::new(AccessControlModule),
            Arc::new(OracleManipulationModule),
            Arc::new(FlashLoanModule),
            Arc::new(LiquidityPoolModule),
            Arc::new(UpgradeabilityModule),
            Arc::new(RugPullModule),
            Arc::new(TimelockEmergencyModule),
            Arc::new(FormalVerificationModule),
            Arc::new(TestGenerationModule),
            Arc::new(OnChainBehaviorModule::new(Arc::clone(&intel))),
            Arc::new(DependencyModule),
            Arc::new(CrossContractModule),
            Arc::new(ExploitPatternModule),
            Arc::new(EconomicAttackModule),
            Arc::new(TokenomicsModule),
            Arc::new(SeverityClassificationModule),
            Arc::new(DeveloperReputationModule::new(Arc::clone(&intel))),
            Arc::new(TxOriginModule),
            Arc::new(WeakRandomnessModule),
            Arc::new(TimestampDependenceModule),
            Arc::new(DenialOfServiceModule),
            Arc::new(SignatureReplayModule),
            Arc::new(EventEmissionModule),
        ];
        info!(
            "🧭 Module registry ready: {} modules (chain intel: {})",
            modules.len(),
            intel.name()
        );
        Self { modules }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules in registry order
    pub fn modules(&self) -> &[Arc<dyn AnalysisModule>] {
        &self.modules
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn AnalysisModule>> {
        self.modules.iter().find(|m| m.id() == id)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.id()).collect()
    }

    pub fn descriptors(&self) -> Vec<ModuleDescriptor> {
        self.modules.iter().map(|m| m.descriptor()).collect()
    }
}

/// Builder for reduced or custom registries
#[derive(Default)]
pub struct RegistryBuilder {
    modules: Vec<Arc<dyn AnalysisModule>>,
}

impl RegistryBuilder {
    pub fn with(mut self, module: impl AnalysisModule + 'static) -> Self {
        self.modules.push(Arc::new(module));
        self
    }

    pub fn with_arc(mut self, module: Arc<dyn AnalysisModule>) -> Self {
        self.modules.push(module);
        self
    }

    /// Fails on the first repeated id
    pub fn build(self) -> AppResult<ModuleRegistry> {
        let mut seen = std::collections::HashSet::new();
        for module in &self.modules {
            if !seen.insert(module.id()) {
                return Err(AppError::duplicate_module(module.id()));
            }
        }
        Ok(ModuleRegistry {
            modules: self.modules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorCode;
    use crate::providers::NoChainIntel;
    use crate::utils::constants::*;

    #[test]
    fn test_standard_order_and_size() {
        let registry = ModuleRegistry::standard(Arc::new(NoChainIntel));
        assert_eq!(registry.len(), 26);
        let ids = registry.ids();
        assert_eq!(ids[0], MODULE_GAS_OPTIMIZATION);
        assert_eq!(ids[8], MODULE_RUG_PULL);
        assert_eq!(ids[19], MODULE_DEVELOPER_REPUTATION);
        assert_eq!(ids[25], MODULE_EVENT_EMISSION);
    }

    #[test]
    fn test_standard_ids_are_unique() {
        let registry = ModuleRegistry::standard(Arc::new(NoChainIntel));
        let rebuilt = registry
            .modules()
            .iter()
            .fold(ModuleRegistry::builder(), |b, m| b.with_arc(Arc::clone(m)))
            .build();
        assert!(rebuilt.is_ok());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = ModuleRegistry::builder()
            .with(ReentrancyModule)
            .with(TxOriginModule)
            .with(ReentrancyModule)
            .build()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RegistryDuplicateModule);
    }

    #[test]
    fn test_lookup_by_id() {
        let registry = ModuleRegistry::builder()
            .with(GasOptimizationModule)
            .build()
            .unwrap();
        assert!(registry.get(MODULE_GAS_OPTIMIZATION).is_some());
        assert!(registry.get(MODULE_REENTRANCY).is_none());
        assert_eq!(registry.descriptors()[0].name, "Gas Optimization Analysis");
    }
}
