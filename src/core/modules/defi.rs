//! DeFi modules: oracle manipulation, flash loans, AMM pools, proxies
//!
//! Every check here is gated on the feature it inspects. A contract that
//! never touches prices or pools scores 100.

use tracing::debug;

use crate::core::modules::AnalysisModule;
use crate::core::rules;
use crate::core::scorecard::{PassPolicy, ScoreCard};
use crate::models::{AppResult, AuditInput, Issue, ModuleCategory, ModuleDescriptor, ModuleResult, Severity};
use crate::utils::constants::{
    decode_bytecode, EIP1967_IMPLEMENTATION_SLOT, MODULE_FLASH_LOAN, MODULE_LIQUIDITY_POOL,
    MODULE_ORACLE_MANIPULATION, MODULE_UPGRADEABILITY,
};

// ============================================
// ORACLE MANIPULATION
// ============================================

const ORACLE_SIGNALS: [&str; 4] = [
    r"(?i)Chainlink|AggregatorV3Interface|latestRoundData",
    r"(?i)getPrice|price|oracle",
    r"(?i)Uniswap|getAmountsOut|getReserves",
    r"(?i)TWAP|timeWeightedAverage",
];

pub struct OracleManipulationModule;

impl AnalysisModule for OracleManipulationModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_ORACLE_MANIPULATION,
            name: "Oracle Manipulation Risk",
            category: ModuleCategory::DefiSecurity,
            severity: Severity::High,
            description: "Identifies oracle dependencies and manipulation risks",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        let mut has_oracle = false;

        card.check("oracle usage", |card| {
            has_oracle = rules::any_match(&ORACLE_SIGNALS, source)?;
            if !has_oracle {
                return Ok(());
            }

            if !rules::is_match(r"require\s*\([^)]*price|price\s*>\s*0|price\s*!=\s*0", source)? {
                card.flag(
                    Issue::new("oracle-manipulation", Severity::High, "Missing price validation from oracle")
                        .with_fix("Add price sanity checks and validation"),
                    20,
                );
            }
            if rules::count(r"(?i)latestRoundData|getPrice", source)? == 1 {
                card.flag(
                    Issue::new(
                        "oracle-manipulation",
                        Severity::Medium,
                        "Single oracle dependency creates centralization risk",
                    )
                    .with_fix("Implement multiple oracle sources or fallback mechanisms"),
                    15,
                );
            }
            if source.contains("Uniswap") && !rules::is_match(r"TWAP|timeWeighted|observe", source)? {
                card.flag(
                    Issue::new(
                        "oracle-manipulation",
                        Severity::High,
                        "Using spot price from DEX without TWAP protection",
                    )
                    .with_fix("Implement TWAP or use Chainlink oracles"),
                    25,
                );
            }
            if !rules::is_match(r"updatedAt|timestamp.*block\.timestamp", source)? {
                card.flag(
                    Issue::new("oracle-manipulation", Severity::Medium, "Missing oracle data staleness checks")
                        .with_fix("Add timestamp validation for oracle data"),
                    10,
                );
            }
            if !rules::is_match(r"(?i)pause|emergency|circuit.*breaker", source)? {
                card.flag(
                    Issue::new("oracle-manipulation", Severity::Medium, "Missing circuit breaker for oracle failures")
                        .with_fix("Implement emergency pause for oracle anomalies"),
                    10,
                );
            }
            Ok(())
        });

        let details = if has_oracle {
            format!("Oracle usage detected with {} potential risks", card.issues().len())
        } else {
            "No oracle usage detected".to_string()
        };
        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::NoHigh,
            level,
            &[
                "Use multiple oracle sources for price feeds",
                "Implement TWAP for DEX-based pricing",
                "Add price deviation limits and circuit breakers",
                "Validate oracle data freshness and staleness",
                "Consider using Chainlink Price Feeds for reliability",
            ],
            details,
        ))
    }
}

// ============================================
// FLASH LOAN ATTACK
// ============================================

pub struct FlashLoanModule;

impl AnalysisModule for FlashLoanModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_FLASH_LOAN,
            name: "Flash Loan Attack Analysis",
            category: ModuleCategory::DefiSecurity,
            severity: Severity::Critical,
            description: "Analyzes vulnerability to flash loan attacks",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        let mut balance_checks = 0usize;
        let mut price_calcs = 0usize;

        card.check("balance and price logic", |card| {
            balance_checks = rules::count(r"balanceOf\s*\([^)]*\)|\.balance", source)?;
            price_calcs = rules::count(r"(?i)getAmountsOut|getReserves|price", source)?;
            if balance_checks == 0 && price_calcs == 0 {
                return Ok(());
            }

            if !rules::is_match(r"block\.number|block\.timestamp", source)? {
                card.flag(
                    Issue::new("flash-loan", Severity::High, "Balance-dependent logic without block-based protection")
                        .with_fix("Add block.number or block.timestamp checks"),
                    20,
                );
            }
            if balance_checks > 2 && !rules::is_match(r"(?i)timelock|delay|commit.*reveal", source)? {
                card.flag(
                    Issue::new("flash-loan", Severity::Medium, "Multiple balance checks without time delays")
                        .with_fix("Consider implementing time delays for critical operations"),
                    15,
                );
            }
            if price_calcs > 0 && !rules::is_match(r"Chainlink|TWAP|timeWeighted", source)? {
                card.flag(
                    Issue::new(
                        "flash-loan",
                        Severity::Critical,
                        "Price calculations vulnerable to flash loan manipulation",
                    )
                    .with_fix("Use TWAP or external oracles instead of spot prices"),
                    30,
                );
            }
            if rules::is_match(r"flashLoan|onFlashLoan|IERC3156|FlashBorrower", source)?
                && !rules::is_match(r"nonReentrant|ReentrancyGuard", source)?
            {
                card.flag(
                    Issue::new(
                        "flash-loan",
                        Severity::Critical,
                        "Flash loan implementation without reentrancy protection",
                    )
                    .with_fix("Add nonReentrant modifier to flash loan functions"),
                    25,
                );
            }
            if price_calcs > 0 && !rules::is_match(r"slippage|minAmount|deadline", source)? {
                card.flag(
                    Issue::new(
                        "flash-loan",
                        Severity::Medium,
                        "Missing slippage protection in price-sensitive operations",
                    )
                    .with_fix("Add slippage limits and deadline checks"),
                    10,
                );
            }
            Ok(())
        });

        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::NoCritical,
            level,
            &[
                "Use TWAP instead of spot prices for critical calculations",
                "Implement block-based or time-based delays",
                "Add reentrancy protection for flash loan functions",
                "Use external oracles for price feeds",
                "Implement slippage protection and deadlines",
            ],
            format!(
                "Flash loan analysis found {} balance checks and {} price calculations",
                balance_checks, price_calcs
            ),
        ))
    }
}

// ============================================
// LIQUIDITY POOL / AMM
// ============================================

pub struct LiquidityPoolModule;

impl AnalysisModule for LiquidityPoolModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_LIQUIDITY_POOL,
            name: "Liquidity Pool & AMM Security Review",
            category: ModuleCategory::DefiSecurity,
            severity: Severity::High,
            description: "Evaluates DEX/DeFi contracts for LP token security and AMM vulnerabilities",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        let mut detected = false;

        card.check("amm checks", |card| {
            let has_lp = rules::is_match(r"mint.*LP|burn.*LP|liquidity|addLiquidity|removeLiquidity", source)?;
            let has_amm = rules::is_match(r"swap|getAmountsOut|getAmountsIn|getReserves", source)?;
            detected = has_lp || has_amm;
            if !detected {
                return Ok(());
            }

            if !rules::is_match(r"slippage|minAmount|amountOutMin|deadline", source)? {
                card.flag(
                    Issue::new("liquidity-pool", Severity::High, "Missing slippage protection in AMM operations")
                        .with_fix("Add minimum amount out and deadline parameters"),
                    20,
                );
            }
            if has_lp && !rules::is_match(r"require.*liquidity|liquidity.*>.*0", source)? {
                card.flag(
                    Issue::new("liquidity-pool", Severity::Medium, "Missing LP token mint/burn validation")
                        .with_fix("Add validation for liquidity amounts"),
                    15,
                );
            }
            if has_amm {
                if !rules::is_match(r"priceImpact|maxPriceImpact", source)? {
                    card.flag(
                        Issue::new("liquidity-pool", Severity::Medium, "Missing price impact protection")
                            .with_fix("Implement price impact limits for large trades"),
                        10,
                    );
                }
                if !rules::is_match(r"reserve.*ratio|k.*invariant", source)? {
                    card.flag(
                        Issue::new("liquidity-pool", Severity::High, "Missing reserve ratio validation")
                            .with_fix("Validate constant product formula (k = x * y)"),
                        15,
                    );
                }
                if !rules::is_match(r"fee.*calculation|tradingFee|lpFee", source)? {
                    card.flag(
                        Issue::new("liquidity-pool", Severity::Low, "No explicit fee calculation found")
                            .with_fix("Ensure proper fee calculation and distribution"),
                        5,
                    );
                }
            }
            Ok(())
        });

        let details = if detected {
            "AMM/LP analysis completed"
        } else {
            "No AMM/LP functionality detected"
        };
        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::NoHigh,
            level,
            &[
                "Implement slippage protection with deadline checks",
                "Validate LP token mint/burn operations",
                "Add price impact limits for large trades",
                "Ensure constant product formula validation",
                "Implement proper fee calculation and distribution",
            ],
            details,
        ))
    }
}

// ============================================
// UPGRADEABILITY / PROXY
// ============================================

/// Deployed bytecode references the EIP-1967 implementation slot.
/// Malformed hex is an error for the caller's rule.
fn bytecode_has_proxy_slot(bytecode: &str) -> AppResult<bool> {
    let bytes = decode_bytecode(bytecode)?;
    Ok(hex::encode(bytes).contains(EIP1967_IMPLEMENTATION_SLOT))
}

pub struct UpgradeabilityModule;

impl AnalysisModule for UpgradeabilityModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_UPGRADEABILITY,
            name: "Upgradeability & Proxy Security Review",
            category: ModuleCategory::Architecture,
            severity: Severity::High,
            description: "Analyzes proxy patterns and upgradeability mechanisms",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        let mut has_proxy = false;

        card.check("proxy bytecode", |_| {
            if let Some(bytecode) = input.bytecode.as_deref() {
                has_proxy = bytecode_has_proxy_slot(bytecode)?;
                if has_proxy {
                    debug!(address = %input.contract_address, "🔍 EIP-1967 slot in bytecode");
                }
            }
            Ok(())
        });

        card.check("proxy source", |card| {
            has_proxy |= rules::is_match(r"Proxy|Upgradeable|initialize|_implementation", source)?;
            if !has_proxy {
                return Ok(());
            }
            let oz_proxy = rules::is_match(r"UUPSUpgradeable|TransparentUpgradeableProxy|BeaconProxy", source)?;

            if !rules::is_match(r"initializer|_disableInitializers", source)? {
                card.flag(
                    Issue::new(
                        "upgradeability",
                        Severity::Critical,
                        "Missing initialization protection in upgradeable contract",
                    )
                    .with_fix("Add initializer modifier or _disableInitializers()"),
                    30,
                );
            }
            if oz_proxy && !rules::is_match(r"__gap|uint256.*gap", source)? {
                card.flag(
                    Issue::new("upgradeability", Severity::High, "Missing storage gaps in upgradeable contract")
                        .with_fix("Add __gap arrays to preserve storage layout"),
                    20,
                );
            }
            if !rules::is_match(r"_authorizeUpgrade|onlyOwner.*upgrade", source)? {
                card.flag(
                    Issue::new("upgradeability", Severity::Critical, "Missing upgrade authorization mechanism")
                        .with_fix("Implement _authorizeUpgrade function with proper access control"),
                    25,
                );
            }
            if oz_proxy && rules::is_match(r"constructor\s*\([^)]*\)\s*\{", source)? {
                card.flag(
                    Issue::new("upgradeability", Severity::High, "Constructor usage in upgradeable contract")
                        .with_fix("Replace constructor with initialize function"),
                    15,
                );
            }
            if oz_proxy && source.contains("immutable") {
                card.flag(
                    Issue::new("upgradeability", Severity::Medium, "Immutable variables in upgradeable contract")
                        .with_fix("Consider using regular state variables instead of immutable"),
                    10,
                );
            }
            if source.contains("delegatecall")
                && !rules::is_match(r"require.*delegatecall|delegatecall.*success", source)?
            {
                card.flag(
                    Issue::new("upgradeability", Severity::High, "Unprotected delegatecall usage")
                        .with_fix("Add proper error handling for delegatecall"),
                    15,
                );
            }
            Ok(())
        });

        let details = if has_proxy {
            format!("Proxy pattern detected with {} potential issues", card.issues().len())
        } else {
            "No proxy pattern detected".to_string()
        };
        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::NoCritical,
            level,
            &[
                "Use OpenZeppelin upgradeable contracts",
                "Implement proper initialization protection",
                "Add storage gaps to preserve layout",
                "Secure upgrade authorization with access control",
                "Avoid constructors in upgradeable contracts",
            ],
            details,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(module: &dyn AnalysisModule, src: &str) -> ModuleResult {
        module.analyze(&AuditInput::new(src, "0x0")).unwrap()
    }

    #[test]
    fn test_oracle_single_feed_without_checks() {
        let src = "function value() external view returns (int256) { (, int256 answer,,,) = feed.latestRoundData(); return answer; }";
        let result = run(&OracleManipulationModule, src);
        let descriptions: Vec<_> = result.issues.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec![
                "Missing price validation from oracle",
                "Single oracle dependency creates centralization risk",
                "Missing oracle data staleness checks",
                "Missing circuit breaker for oracle failures",
            ]
        );
        assert_eq!(result.score, 45);
        assert!(!result.passed);
        assert_eq!(result.details, "Oracle usage detected with 4 potential risks");
    }

    #[test]
    fn test_oracle_absent() {
        let result = run(&OracleManipulationModule, "contract A { uint x; }");
        assert!(result.issues.is_empty());
        assert_eq!(result.details, "No oracle usage detected");
        assert_eq!(result.risk_level, Severity::Low);
    }

    #[test]
    fn test_flash_loan_spot_price() {
        let src = "function swap() external { uint out = router.getAmountsOut(amount, path)[1]; }";
        let result = run(&FlashLoanModule, src);
        assert!(!result.passed);
        assert!(result
            .issues
            .iter()
            .any(|i| i.description == "Price calculations vulnerable to flash loan manipulation"));
        // no block guard -20, spot price -30, slippage -10
        assert_eq!(result.score, 40);
        assert_eq!(result.details, "Flash loan analysis found 0 balance checks and 1 price calculations");
    }

    #[test]
    fn test_liquidity_pool_clean_contract() {
        let result = run(&LiquidityPoolModule, "contract Counter { uint256 n; }");
        assert!(result.passed);
        assert_eq!(result.details, "No AMM/LP functionality detected");
    }

    #[test]
    fn test_liquidity_pool_swap_without_protection() {
        let result = run(&LiquidityPoolModule, "function swap(uint a) external { }");
        assert!(!result.passed);
        assert_eq!(result.score, 50);
        assert_eq!(result.risk_level, Severity::High);
    }

    #[test]
    fn test_upgradeable_without_protection() {
        let src = "contract Vault is UUPSUpgradeable { function initialize() public { owner = msg.sender; } }";
        let result = run(&UpgradeabilityModule, src);
        assert!(!result.passed);
        assert_eq!(result.risk_level, Severity::Critical);
        // initializer -30, gap -20, auth -25
        assert_eq!(result.score, 25);
    }

    #[test]
    fn test_proxy_slot_in_bytecode() {
        let bytecode = format!("0x6080{}5560", EIP1967_IMPLEMENTATION_SLOT);
        let input = AuditInput::new("contract Plain {}", "0x0").with_bytecode(bytecode);
        let result = UpgradeabilityModule.analyze(&input).unwrap();
        assert!(result.details.starts_with("Proxy pattern detected"));
        assert!(!result.passed);
    }

    #[test]
    fn test_malformed_bytecode_skips_rule() {
        let input = AuditInput::new("contract Plain {}", "0x0").with_bytecode("0xzz");
        let result = UpgradeabilityModule.analyze(&input).unwrap();
        assert_eq!(result.score, 100);
        assert_eq!(result.details, "No proxy pattern detected");
    }
}
