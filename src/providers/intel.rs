//! Chain Intelligence Provider
//!
//! Deployer reputation and historical transaction behaviour for a contract
//! address. Modules read through the `ChainIntel` trait and never do I/O
//! themselves; the provider is picked once when the registry is built.
//!
//! - `NoChainIntel` (default): no data, the dependent modules stay silent
//! - `StaticChainIntel`: fixed records, for tests and offline fixtures
//! - `SimulatedChainIntel`: stable pseudo data seeded by the address, for demos

use alloy_primitives::keccak256;
use dashmap::DashMap;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;
use tracing::debug;

use crate::models::{BehaviorHistory, DeployerProfile, IntelMode};
use crate::utils::constants::normalize_address;

/// Synchronous, in-process source of on-chain context
pub trait ChainIntel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Reputation of whoever deployed `contract_address`
    fn deployer_profile(&self, contract_address: &str) -> Option<DeployerProfile>;

    /// Historical transaction statistics for `contract_address`
    fn behavior_history(&self, contract_address: &str) -> Option<BehaviorHistory>;
}

/// Provider for the configured mode
pub fn intel_for(mode: IntelMode) -> Arc<dyn ChainIntel> {
    match mode {
        IntelMode::None => Arc::new(NoChainIntel),
        IntelMode::Simulated => Arc::new(SimulatedChainIntel),
    }
}

// ============================================
// NO DATA
// ============================================

#[derive(Debug, Default, Clone, Copy)]
pub struct NoChainIntel;

impl ChainIntel for NoChainIntel {
    fn name(&self) -> &'static str {
        "none"
    }

    fn deployer_profile(&self, _contract_address: &str) -> Option<DeployerProfile> {
        None
    }

    fn behavior_history(&self, _contract_address: &str) -> Option<BehaviorHistory> {
        None
    }
}

// ============================================
// STATIC RECORDS
// ============================================

/// Fixed records keyed by lowercase address
#[derive(Debug, Default)]
pub struct StaticChainIntel {
    profiles: DashMap<String, DeployerProfile>,
    histories: DashMap<String, BehaviorHistory>,
}

impl StaticChainIntel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, contract_address: &str, profile: DeployerProfile) -> Self {
        self.profiles.insert(normalize_address(contract_address), profile);
        self
    }

    pub fn with_history(self, contract_address: &str, history: BehaviorHistory) -> Self {
        self.histories.insert(normalize_address(contract_address), history);
        self
    }
}

impl ChainIntel for StaticChainIntel {
    fn name(&self) -> &'static str {
        "static"
    }

    fn deployer_profile(&self, contract_address: &str) -> Option<DeployerProfile> {
        self.profiles
            .get(&normalize_address(contract_address))
            .map(|p| *p.value())
    }

    fn behavior_history(&self, contract_address: &str) -> Option<BehaviorHistory> {
        self.histories
            .get(&normalize_address(contract_address))
            .map(|h| *h.value())
    }
}

// ============================================
// SIMULATED
// ============================================

/// Pseudo data from an RNG seeded by the address hash, so repeated audits
/// of one contract always see the same numbers
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedChainIntel;

impl SimulatedChainIntel {
    fn rng(contract_address: &str, salt: u8) -> StdRng {
        let mut key = normalize_address(contract_address).into_bytes();
        key.push(salt);
        let hash = keccak256(&key);
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&hash.as_slice()[..8]);
        StdRng::seed_from_u64(u64::from_be_bytes(seed))
    }
}

impl ChainIntel for SimulatedChainIntel {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn deployer_profile(&self, contract_address: &str) -> Option<DeployerProfile> {
        let mut rng = Self::rng(contract_address, 0);
        let profile = DeployerProfile {
            contracts_deployed: rng.gen_range(1..=50),
            scam_reports: rng.gen_range(0..3),
            verified_projects: rng.gen_range(0..10),
            community_rating: rng.gen_range(0.0..5.0),
            account_age_days: rng.gen_range(30..1030),
        };
        debug!(address = %contract_address, "🎲 simulated deployer profile");
        Some(profile)
    }

    fn behavior_history(&self, contract_address: &str) -> Option<BehaviorHistory> {
        let mut rng = Self::rng(contract_address, 1);
        Some(BehaviorHistory {
            total_transactions: rng.gen_range(1_000..11_000),
            unique_users: rng.gen_range(100..1_100),
            owner_transactions: rng.gen_range(10..110),
            suspicious_activity: rng.gen_bool(0.3),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";

    #[test]
    fn test_no_intel_returns_nothing() {
        assert!(NoChainIntel.deployer_profile(ADDR).is_none());
        assert!(NoChainIntel.behavior_history(ADDR).is_none());
    }

    #[test]
    fn test_static_lookup_is_case_insensitive() {
        let intel = StaticChainIntel::new().with_profile(
            ADDR,
            DeployerProfile {
                contracts_deployed: 3,
                scam_reports: 1,
                verified_projects: 0,
                community_rating: 1.0,
                account_age_days: 10,
            },
        );
        let profile = intel.deployer_profile(&ADDR.to_lowercase()).unwrap();
        assert_eq!(profile.scam_reports, 1);
        assert!(intel.behavior_history(ADDR).is_none());
    }

    #[test]
    fn test_simulated_is_stable_per_address() {
        let a = SimulatedChainIntel.deployer_profile(ADDR).unwrap();
        let b = SimulatedChainIntel.deployer_profile(&ADDR.to_uppercase().replace("0X", "0x")).unwrap();
        assert_eq!(a, b);
        assert!((1..=50).contains(&a.contracts_deployed));
        assert!(a.scam_reports < 3);
        assert!(a.community_rating < 5.0);

        let h = SimulatedChainIntel.behavior_history(ADDR).unwrap();
        assert_eq!(h, SimulatedChainIntel.behavior_history(ADDR).unwrap());
        assert!(h.total_transactions >= 1_000);
    }

    #[test]
    fn test_intel_for_mode() {
        assert_eq!(intel_for(IntelMode::None).name(), "none");
        assert_eq!(intel_for(IntelMode::Simulated).name(), "simulated");
    }
}
