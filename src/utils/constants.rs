//! Constants Module - Single Source of Truth
//!
//! Module ids, keyword sets, thresholds and defaults used across the crate.
//! No hardcoded values in other modules.

use alloy_primitives::{Address, B256};
use std::str::FromStr;

use crate::models::errors::{AppError, AppResult};

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "ContractGuard";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// CONFIG DEFAULTS
// ============================================

pub const DEFAULT_MAX_CONCURRENT_MODULES: usize = 8;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 100;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

// ============================================
// MODULE IDS - Registry order
// ============================================

pub const MODULE_GAS_OPTIMIZATION: &str = "gas-optimization";
pub const MODULE_REENTRANCY: &str = "reentrancy-detection";
pub const MODULE_INTEGER_OVERFLOW: &str = "integer-overflow";
pub const MODULE_ACCESS_CONTROL: &str = "access-control";
pub const MODULE_ORACLE_MANIPULATION: &str = "oracle-manipulation";
pub const MODULE_FLASH_LOAN: &str = "flash-loan-attack";
pub const MODULE_LIQUIDITY_POOL: &str = "liquidity-pool-security";
pub const MODULE_UPGRADEABILITY: &str = "upgradeability-security";
pub const MODULE_RUG_PULL: &str = "rug-pull-risk";
pub const MODULE_TIMELOCK_EMERGENCY: &str = "timelock-emergency";
pub const MODULE_FORMAL_VERIFICATION: &str = "formal-verification";
pub const MODULE_TEST_GENERATION: &str = "test-generation";
pub const MODULE_ONCHAIN_BEHAVIOR: &str = "onchain-behavior";
pub const MODULE_DEPENDENCY: &str = "dependency-vulnerability";
pub const MODULE_CROSS_CONTRACT: &str = "cross-contract-interaction";
pub const MODULE_EXPLOIT_PATTERNS: &str = "exploit-pattern-matching";
pub const MODULE_ECONOMIC_ATTACK: &str = "economic-attack-simulation";
pub const MODULE_TOKENOMICS: &str = "tokenomics-supply-risk";
pub const MODULE_SEVERITY_CLASSIFICATION: &str = "severity-classification";
pub const MODULE_DEVELOPER_REPUTATION: &str = "developer-reputation";
pub const MODULE_TX_ORIGIN: &str = "tx-origin-authentication";
pub const MODULE_WEAK_RANDOMNESS: &str = "weak-randomness";
pub const MODULE_TIMESTAMP_DEPENDENCE: &str = "timestamp-dependence";
pub const MODULE_DENIAL_OF_SERVICE: &str = "denial-of-service";
pub const MODULE_SIGNATURE_REPLAY: &str = "signature-replay";
pub const MODULE_EVENT_EMISSION: &str = "event-emission";

/// Modules averaged into the security score, in category order
/// (accessControl, reentrancy, arithmetic, oracle, governance, economics)
pub const SECURITY_SCORE_MODULES: [&str; 6] = [
    MODULE_ACCESS_CONTROL,
    MODULE_REENTRANCY,
    MODULE_INTEGER_OVERFLOW,
    MODULE_ORACLE_MANIPULATION,
    MODULE_TIMELOCK_EMERGENCY,
    MODULE_TOKENOMICS,
];

/// Modules averaged into technical risk
pub const TECHNICAL_RISK_MODULES: [&str; 4] = [
    MODULE_REENTRANCY,
    MODULE_INTEGER_OVERFLOW,
    MODULE_FLASH_LOAN,
    MODULE_UPGRADEABILITY,
];

// ============================================
// AGGREGATION THRESHOLDS
// ============================================

/// Score used for a module the aggregator needs but the registry lacks
pub const MISSING_MODULE_SCORE: u8 = 50;
/// Sample descriptions per severity bucket
pub const BREAKDOWN_TOP_ISSUES: usize = 5;
/// Entries in `riskFactors`
pub const MAX_RISK_FACTORS: usize = 10;
/// Critical descriptions in the free view
pub const FREE_TIER_VULNERABILITIES: usize = 3;
/// De-duplicated premium recommendations
pub const MAX_RECOMMENDATIONS: usize = 20;
/// Source longer than this is treated as verified
pub const VERIFIED_SOURCE_MIN_LEN: usize = 100;
/// Gas attributed to each gas-optimization finding
pub const GAS_PER_OPTIMIZATION: u64 = 1000;

/// Issue kind used for substituted results
pub const MODULE_ERROR_KIND: &str = "module-error";

// ============================================
// KEYWORD SETS (relabel pass)
// ============================================

pub const SPYWARE_KEYWORDS: [&str; 5] = [
    "data collection",
    "privacy",
    "tracking",
    "surveillance",
    "personal information",
];

pub const HONEYPOT_KEYWORDS: [&str; 4] = [
    "trading restriction",
    "sell limitation",
    "liquidity lock",
    "transfer block",
];

pub const BACKDOOR_KEYWORDS: [&str; 5] = [
    "hidden function",
    "admin access",
    "owner control",
    "backdoor",
    "unauthorized access",
];

// ============================================
// PROXY DETECTION
// ============================================

/// EIP-1967 implementation slot: bytes32(uint256(keccak256("eip1967.proxy.implementation")) - 1)
pub const EIP1967_IMPLEMENTATION_SLOT: &str =
    "360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc";

// ============================================
// INPUT VALIDATION - Single Source of Truth
// ============================================

/// Parse a 20-byte hex address
pub fn parse_address(address: &str) -> AppResult<Address> {
    Address::from_str(address.trim())
        .map_err(|e| AppError::invalid_address(format!("Invalid address {}: {}", address, e)))
}

/// Parse a 32-byte payment transaction hash
pub fn parse_tx_hash(tx_hash: &str) -> AppResult<B256> {
    B256::from_str(tx_hash.trim())
        .map_err(|e| AppError::invalid_tx_hash(format!("Invalid tx hash {}: {}", tx_hash, e)))
}

/// Lowercase `0x`-prefixed key used by the report store
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Strip an optional `0x` prefix and decode bytecode hex
pub fn decode_bytecode(bytecode: &str) -> AppResult<Vec<u8>> {
    let trimmed = bytecode.trim();
    let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    Ok(hex::decode(hex_part)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;

    #[test]
    fn test_parse_address() {
        assert!(parse_address("0xdAC17F958D2ee523a2206206994597C13D831ec7").is_ok());
        let err = parse_address("0x1234").unwrap_err();
        assert_eq!(err.code, ErrorCode::InputInvalidAddress);
    }

    #[test]
    fn test_parse_tx_hash() {
        let hash = format!("0x{}", "ab".repeat(32));
        assert!(parse_tx_hash(&hash).is_ok());
        assert_eq!(
            parse_tx_hash("0xdeadbeef").unwrap_err().code,
            ErrorCode::InputInvalidTxHash
        );
    }

    #[test]
    fn test_decode_bytecode() {
        assert_eq!(decode_bytecode("0x6080").unwrap(), vec![0x60, 0x80]);
        assert_eq!(decode_bytecode("6080").unwrap(), vec![0x60, 0x80]);
        assert_eq!(
            decode_bytecode("0xzz").unwrap_err().code,
            ErrorCode::InputInvalidBytecode
        );
    }

    #[test]
    fn test_security_modules_are_unique() {
        let mut ids = SECURITY_SCORE_MODULES.to_vec();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), SECURITY_SCORE_MODULES.len());
    }
}
