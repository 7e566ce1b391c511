//! Core security modules
//!
//! Reentrancy, integer overflow, access control, plus the supplementary
//! checks: tx.origin authentication, weak randomness, timestamp
//! dependence, denial of service and signature replay.

use crate::core::modules::AnalysisModule;
use crate::core::rules::{self, MatchMode, PatternRule};
use crate::core::scorecard::{PassPolicy, ScoreCard};
use crate::models::{AppResult, AuditInput, Issue, ModuleCategory, ModuleDescriptor, ModuleResult, Severity};
use crate::utils::constants::{
    MODULE_ACCESS_CONTROL, MODULE_DENIAL_OF_SERVICE, MODULE_INTEGER_OVERFLOW, MODULE_REENTRANCY,
    MODULE_SIGNATURE_REPLAY, MODULE_TIMESTAMP_DEPENDENCE, MODULE_TX_ORIGIN, MODULE_WEAK_RANDOMNESS,
};
use crate::utils::source::{
    first_line, function_context, function_spans, loop_spans, pragma_version, receiver_start,
    strip_comments,
};

// ============================================
// REENTRANCY
// ============================================

/// Matched from the dot; the receiver is recovered with `receiver_start`
const EXTERNAL_CALL_PATTERNS: [&str; 2] = [
    r"\.(?:call|delegatecall)(?:\{[^}]*\})?\s*\(",
    r"\.(?:transfer|send)\s*\(",
];

/// Unguarded external calls and state writes after calls
pub struct ReentrancyModule;

impl AnalysisModule for ReentrancyModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_REENTRANCY,
            name: "Reentrancy Attack Detection",
            category: ModuleCategory::Security,
            severity: Severity::Critical,
            description: "Detects potential reentrancy vulnerabilities in external calls",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        let mut call_sites = 0usize;

        for pattern in EXTERNAL_CALL_PATTERNS {
            card.check(pattern, |card| {
                for m in rules::find_all(pattern, source)? {
                    call_sites += 1;
                    let call = &source[receiver_start(source, m.start())..m.end()];
                    let context = function_context(source, m.start(), m.end());
                    if context.contains("nonReentrant") || context.contains("ReentrancyGuard") {
                        continue;
                    }
                    card.flag(
                        Issue::new(
                            "reentrancy",
                            Severity::Critical,
                            format!("Unguarded external call: {}", call),
                        )
                        .with_match(call)
                        .with_location(first_line(context))
                        .with_fix("Add nonReentrant modifier or implement checks-effects-interactions pattern"),
                        20,
                    );
                }
                Ok(())
            });
        }

        card.check("state change after call", |card| {
            let guarded = rules::is_match(r"(?i)nonReentrant|ReentrancyGuard", source)?;
            if !guarded && rules::is_match(r"\.call[\s\S]*?=\s*\w+", source)? {
                card.flag(
                    Issue::new("reentrancy", Severity::High, "State changes after external calls detected")
                        .with_fix("Move state changes before external calls or add reentrancy protection"),
                    15,
                );
            }
            Ok(())
        });

        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::NoCritical,
            level,
            &[
                "Use OpenZeppelin ReentrancyGuard",
                "Follow checks-effects-interactions pattern",
                "Move state changes before external calls",
                "Use pull payment pattern for withdrawals",
            ],
            format!("Reentrancy analysis checked {} external call sites", call_sites),
        ))
    }
}

// ============================================
// INTEGER OVERFLOW
// ============================================

/// Compiler enforces checked arithmetic from 0.8 onwards
fn has_checked_arithmetic(version: &str) -> bool {
    let Some(pos) = version.find("0.") else {
        return false;
    };
    let minor: String = version[pos + 2..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    minor.parse::<u32>().map_or(false, |m| m >= 8)
}

const RISKY_ARITHMETIC: [PatternRule; 2] = [
    PatternRule {
        kind: "integer-overflow",
        pattern: r"\w+\s*-\s*\w+",
        severity: Severity::Medium,
        penalty: 10,
        description: "Potential underflow in subtraction",
        fix: "Check operand order with require before subtracting",
        mode: MatchMode::EachMatch,
    },
    PatternRule {
        kind: "integer-overflow",
        pattern: r"\w+\s*\*\s*\w+",
        severity: Severity::Medium,
        penalty: 10,
        description: "Potential overflow in multiplication",
        fix: "Use SafeMath mul or bound the operands",
        mode: MatchMode::EachMatch,
    },
];

/// Overflow protection relative to the declared compiler version
pub struct IntegerOverflowModule;

impl AnalysisModule for IntegerOverflowModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_INTEGER_OVERFLOW,
            name: "Integer Overflow/Underflow Checks",
            category: ModuleCategory::Security,
            severity: Severity::High,
            description: "Checks for integer overflow/underflow vulnerabilities",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let code = strip_comments(source);
        let version = pragma_version(source).unwrap_or("");
        let checked = has_checked_arithmetic(version);
        let mut card = ScoreCard::new(self.descriptor());
        let mut has_safe_math = false;

        card.check("safemath", |card| {
            has_safe_math = rules::is_match(r"(?i)SafeMath", source)?;
            let has_arithmetic = rules::is_match(r"[\+\-\*/]\s*=|=\s*[\w\s]*[\+\-\*/]", &code)?;
            if !checked && has_arithmetic && !has_safe_math {
                card.flag(
                    Issue::new(
                        "integer-overflow",
                        Severity::Critical,
                        "Arithmetic operations without SafeMath in pre-0.8.0 Solidity",
                    )
                    .with_fix("Use SafeMath library or upgrade to Solidity 0.8.0+"),
                    30,
                );
            }
            Ok(())
        });

        if checked {
            card.check("unchecked blocks", |card| {
                for m in rules::find_all(r"unchecked\s*\{[^}]*\}", &code)? {
                    let block = m.as_str();
                    if block.contains('+') || block.contains('-') || block.contains('*') {
                        card.flag(
                            Issue::new("integer-overflow", Severity::High, "Unchecked arithmetic operations")
                                .with_match(block)
                                .with_fix("Ensure arithmetic operations in unchecked blocks are safe"),
                            15,
                        );
                    }
                }
                Ok(())
            });
        }

        if !checked && !has_safe_math {
            for rule in &RISKY_ARITHMETIC {
                card.apply(rule, &code);
            }
        }

        let level = card.worst_or_low();
        let first = if checked {
            "Review unchecked blocks carefully"
        } else {
            "Use SafeMath library"
        };
        let shown = if version.is_empty() { "unknown" } else { version };
        Ok(card.finish(
            PassPolicy::NoCritical,
            level,
            &[
                first,
                "Upgrade to Solidity 0.8.0+ for built-in overflow protection",
                "Add bounds checking for user inputs",
                "Use require statements for critical arithmetic",
            ],
            format!("Integer overflow analysis completed. Solidity version: {}", shown),
        ))
    }
}

// ============================================
// ACCESS CONTROL
// ============================================

const CRITICAL_FUNCTION_NAMES: [&str; 10] = [
    "mint",
    "burn",
    "withdraw",
    "pause",
    "unpause",
    "setowner",
    "transferownership",
    "selfdestruct",
    "destroy",
    "upgrade",
];

/// Unprotected privileged functions and centralization
pub struct AccessControlModule;

impl AnalysisModule for AccessControlModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_ACCESS_CONTROL,
            name: "Access Control & Permission Analysis",
            category: ModuleCategory::Security,
            severity: Severity::High,
            description: "Analyzes access control mechanisms and permission structures",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        let spans: Vec<_> = function_spans(source)
            .into_iter()
            .filter(|s| !s.body.is_empty())
            .collect();
        let owner_functions = spans.iter().filter(|s| s.header.contains("onlyOwner")).count();

        card.check("unprotected critical function", |card| {
            for span in &spans {
                let lower = span.name.to_lowercase();
                if !CRITICAL_FUNCTION_NAMES.iter().any(|c| lower.contains(c)) {
                    continue;
                }
                if rules::is_match(r"\b(?:internal|private)\b", span.header)? {
                    continue;
                }
                let guarded = rules::is_match(r"onlyOwner|onlyRole|onlyAdmin|require\s*\(.*msg\.sender", span.header)?
                    || rules::is_match(r"require\s*\([^;]*msg\.sender|_checkOwner|_checkRole", span.body)?;
                if !guarded {
                    card.flag(
                        Issue::new(
                            "access-control",
                            Severity::Critical,
                            format!("Unprotected critical function: {}", span.name),
                        )
                        .with_match(span.header.trim())
                        .with_fix("Add appropriate access control modifier"),
                        25,
                    );
                }
            }
            Ok(())
        });

        card.check("balance rewrite", |card| {
            for span in &spans {
                if rules::is_match(r"(?i)^(?:set|adjust|update)Balances?$", span.name)? {
                    card.flag(
                        Issue::new(
                            "access-control",
                            Severity::Critical,
                            "Admin access can rewrite user balances (hidden function)",
                        )
                        .with_match(span.header.trim())
                        .with_fix("Remove privileged balance manipulation functions"),
                        25,
                    );
                }
            }
            Ok(())
        });

        card.check("role definitions", |card| {
            if rules::is_match(r"AccessControl|hasRole", source)?
                && rules::count(r"bytes32\s+public\s+constant\s+\w+_ROLE", source)? < 2
            {
                card.flag(
                    Issue::new("access-control", Severity::Medium, "Limited role definitions in AccessControl")
                        .with_fix("Consider implementing granular role-based permissions"),
                    10,
                );
            }
            Ok(())
        });

        if owner_functions > 5 {
            card.flag(
                Issue::new(
                    "access-control",
                    Severity::High,
                    format!("High centralization risk: {} owner-only functions", owner_functions),
                )
                .with_fix("Consider implementing multi-sig or DAO governance"),
                15,
            );
        }

        card.check("two-step ownership", |card| {
            if rules::is_match(r"Ownable|onlyOwner", source)?
                && !rules::is_match(r"pendingOwner|Ownable2Step", source)?
            {
                card.flag(
                    Issue::new("access-control", Severity::Medium, "Missing two-step ownership transfer")
                        .with_fix("Implement two-step ownership transfer pattern"),
                    10,
                );
            }
            Ok(())
        });

        let modifiers = rules::count(r"modifier\s+\w+", source).unwrap_or(0);
        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::NoCritical,
            level,
            &[
                "Use OpenZeppelin AccessControl for role-based permissions",
                "Implement two-step ownership transfer",
                "Add multi-signature for critical operations",
                "Consider timelock for administrative functions",
                "Implement emergency pause mechanism",
            ],
            format!(
                "Access control analysis found {} modifiers and {} owner-only functions",
                modifiers, owner_functions
            ),
        ))
    }
}

// ============================================
// TX.ORIGIN AUTHENTICATION
// ============================================

const TX_ORIGIN_RULES: [PatternRule; 2] = [
    PatternRule {
        kind: "tx-origin",
        pattern: r"(?:require|if)\s*\(\s*tx\.origin\s*[=!]=|(?:require|if)\s*\([^;)]*[=!]=\s*tx\.origin",
        severity: Severity::Critical,
        penalty: 30,
        description: "tx.origin used for authentication: {match}",
        fix: "Use msg.sender instead of tx.origin for all authentication checks",
        mode: MatchMode::EachMatch,
    },
    PatternRule {
        kind: "tx-origin",
        pattern: r"modifier\s+\w+[^{]*\{[^}]*tx\.origin",
        severity: Severity::High,
        penalty: 20,
        description: "Modifier relies on tx.origin",
        fix: "Use msg.sender inside access modifiers",
        mode: MatchMode::EachMatch,
    },
];

pub struct TxOriginModule;

impl AnalysisModule for TxOriginModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_TX_ORIGIN,
            name: "tx.origin Authentication Check",
            category: ModuleCategory::Security,
            severity: Severity::Critical,
            description: "Flags authentication based on tx.origin (phishing risk)",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        for rule in &TX_ORIGIN_RULES {
            card.apply(rule, source);
        }
        let level = card.worst_or_low();
        let hits = card.issues().len();
        Ok(card.finish(
            PassPolicy::NoCritical,
            level,
            &[
                "Never use tx.origin for authentication",
                "Use msg.sender for caller checks",
            ],
            format!("Found {} tx.origin authentication sites", hits),
        ))
    }
}

// ============================================
// WEAK RANDOMNESS
// ============================================

const RANDOMNESS_RULES: [PatternRule; 3] = [
    PatternRule {
        kind: "weak-randomness",
        pattern: r"keccak256\s*\([^;]*block\.(?:timestamp|difficulty|number|prevrandao|coinbase)",
        severity: Severity::High,
        penalty: 20,
        description: "Randomness derived from block values is predictable",
        fix: "Use Chainlink VRF or a commit-reveal scheme",
        mode: MatchMode::EachMatch,
    },
    PatternRule {
        kind: "weak-randomness",
        pattern: r"block\.(?:difficulty|number|prevrandao)\s*%",
        severity: Severity::High,
        penalty: 20,
        description: "Modulo over block value used as random number",
        fix: "Use Chainlink VRF or a commit-reveal scheme",
        mode: MatchMode::EachMatch,
    },
    PatternRule {
        kind: "weak-randomness",
        pattern: r"blockhash\s*\(",
        severity: Severity::Medium,
        penalty: 10,
        description: "blockhash used as entropy source",
        fix: "blockhash is only available for 256 blocks and known to validators",
        mode: MatchMode::Once,
    },
];

pub struct WeakRandomnessModule;

impl AnalysisModule for WeakRandomnessModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_WEAK_RANDOMNESS,
            name: "Weak Randomness Detection",
            category: ModuleCategory::Security,
            severity: Severity::High,
            description: "Detects randomness derived from predictable block values",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        for rule in &RANDOMNESS_RULES {
            card.apply(rule, source);
        }
        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::NoHigh,
            level,
            &[
                "Use Chainlink VRF for verifiable randomness",
                "Use commit-reveal when an oracle is not available",
                "Never derive randomness from block properties",
            ],
            "Weak randomness analysis completed",
        ))
    }
}

// ============================================
// TIMESTAMP DEPENDENCE
// ============================================

const TIMESTAMP_RULES: [PatternRule; 3] = [
    PatternRule {
        kind: "timestamp-dependence",
        pattern: r"block\.timestamp\s*==|==\s*block\.timestamp",
        severity: Severity::Medium,
        penalty: 10,
        description: "Strict equality on block.timestamp",
        fix: "Compare timestamps with ranges, never equality",
        mode: MatchMode::EachMatch,
    },
    PatternRule {
        kind: "timestamp-dependence",
        pattern: r"block\.timestamp\s*%",
        severity: Severity::Medium,
        penalty: 10,
        description: "Timestamp modulo arithmetic is validator-influenced",
        fix: "Do not branch on timestamp parity or modulo",
        mode: MatchMode::EachMatch,
    },
    PatternRule {
        kind: "timestamp-dependence",
        pattern: r"\bnow\s*[<>=+\-]",
        severity: Severity::Low,
        penalty: 5,
        description: "Deprecated `now` alias for block.timestamp",
        fix: "Use block.timestamp",
        mode: MatchMode::Once,
    },
];

pub struct TimestampDependenceModule;

impl AnalysisModule for TimestampDependenceModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_TIMESTAMP_DEPENDENCE,
            name: "Timestamp Dependence Check",
            category: ModuleCategory::Security,
            severity: Severity::Medium,
            description: "Flags logic that depends on exact block timestamps",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        for rule in &TIMESTAMP_RULES {
            card.apply(rule, source);
        }
        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::MinScore(70),
            level,
            &[
                "Tolerate roughly 15 seconds of timestamp drift",
                "Avoid equality and modulo on block.timestamp",
            ],
            "Timestamp dependence analysis completed",
        ))
    }
}

// ============================================
// DENIAL OF SERVICE
// ============================================

pub struct DenialOfServiceModule;

impl AnalysisModule for DenialOfServiceModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_DENIAL_OF_SERVICE,
            name: "Denial of Service Analysis",
            category: ModuleCategory::Security,
            severity: Severity::High,
            description: "Detects external calls in loops and unbounded iteration",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        let loops = loop_spans(source);

        card.check("loop analysis", |card| {
            for l in &loops {
                if let Some(call) = rules::find_all(r"\.(?:call|transfer|send)\s*[\({]", l.body)?.first() {
                    card.flag(
                        Issue::new(
                            "denial-of-service",
                            Severity::High,
                            "External call inside loop can block execution",
                        )
                        .with_match(call.as_str())
                        .with_location(first_line(l.condition))
                        .with_fix("Use pull payments instead of pushing funds in a loop"),
                        20,
                    );
                }
                if l.condition.contains(".length") && !l.body.contains("break") {
                    card.flag(
                        Issue::new(
                            "denial-of-service",
                            Severity::Medium,
                            "Unbounded loop over dynamic array",
                        )
                        .with_location(first_line(l.condition))
                        .with_fix("Bound iteration or paginate over the array"),
                        10,
                    );
                }
            }
            Ok(())
        });

        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::NoHigh,
            level,
            &[
                "Favor pull over push payments",
                "Bound loops over user-growable arrays",
                "Isolate external calls so one failure cannot block others",
            ],
            format!("Denial of service analysis inspected {} loops", loops.len()),
        ))
    }
}

// ============================================
// SIGNATURE REPLAY
// ============================================

pub struct SignatureReplayModule;

impl AnalysisModule for SignatureReplayModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_SIGNATURE_REPLAY,
            name: "Signature Replay Protection",
            category: ModuleCategory::Security,
            severity: Severity::High,
            description: "Checks ecrecover usage for nonce, chain id and zero-address validation",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        let mut recovers = 0usize;

        card.check("ecrecover", |card| {
            recovers = rules::count(r"ecrecover\s*\(", source)?;
            if recovers == 0 {
                return Ok(());
            }
            if !rules::is_match(r"(?i)nonce", source)? {
                card.flag(
                    Issue::new("signature-replay", Severity::High, "ecrecover without nonce enables signature replay")
                        .with_fix("Include and increment a per-signer nonce in the signed payload"),
                    20,
                );
            }
            if !rules::is_match(r"chainid|DOMAIN_SEPARATOR|EIP712", source)? {
                card.flag(
                    Issue::new(
                        "signature-replay",
                        Severity::Medium,
                        "Signature not bound to chain id (cross-chain replay)",
                    )
                    .with_fix("Use an EIP-712 domain separator including block.chainid"),
                    10,
                );
            }
            if !rules::is_match(r"[!=]=\s*address\s*\(\s*0\s*\)", source)? {
                card.flag(
                    Issue::new(
                        "signature-replay",
                        Severity::Medium,
                        "ecrecover result not checked against zero address",
                    )
                    .with_fix("Reject address(0) returned by ecrecover"),
                    10,
                );
            }
            Ok(())
        });

        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::NoHigh,
            level,
            &[
                "Use OpenZeppelin ECDSA and EIP712 helpers",
                "Track nonces per signer",
                "Bind signatures to chain id and contract address",
            ],
            format!("Found {} ecrecover call sites", recovers),
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
    fn test_reentrancy_unguarded_call() {
        let src = r#"
            function withdraw(uint256 amount) external {
                (bool ok, ) = msg.sender.call{value: amount}("");
                balances[msg.sender] -= amount;
            }
        "#;
        let result = run(&ReentrancyModule, src);
        assert!(!result.passed);
        assert_eq!(result.risk_level, Severity::Critical);
        assert!(result.issues[0].description.starts_with("Unguarded external call: msg.sender.call{value: amount}("));
        assert_eq!(result.issues[0].location_hint.as_deref(), Some("function withdraw(uint256 amount) external {"));
        assert!(result.issues.iter().any(|i| i.description == "State changes after external calls detected"));
    }

    #[test]
    fn test_reentrancy_guarded_scores_full() {
        let src = r#"
            contract Vault is ReentrancyGuard {
                function withdraw(uint256 amount) external nonReentrant {
                    (bool ok, ) = msg.sender.call{value: amount}("");
                    require(ok);
                }
                function sweep(address t) external nonReentrant {
                    (bool ok, ) = payable(t).call{value: 1}("");
                    require(ok);
                }
            }
        "#;
        let result = run(&ReentrancyModule, src);
        assert!(result.passed);
        assert_eq!(result.score, 100);
        assert!(result.issues.is_empty());
        assert_eq!(result.details, "Reentrancy analysis checked 2 external call sites");
    }

    #[test]
    fn test_reentrancy_wrapped_receiver() {
        let src = r#"
            function withdraw() external {
                (bool ok,) = payable(msg.sender).call{value: bal}("");
                require(ok);
            }
        "#;
        let result = run(&ReentrancyModule, src);
        assert!(!result.passed);
        assert_eq!(result.risk_level, Severity::Critical);
        assert_eq!(
            result.issues[0].description,
            "Unguarded external call: payable(msg.sender).call{value: bal}("
        );
        assert_eq!(result.details, "Reentrancy analysis checked 1 external call sites");

        let transfer = run(&ReentrancyModule, "function pay(address to) public { payable(to).transfer(1); }");
        assert_eq!(transfer.issues[0].description, "Unguarded external call: payable(to).transfer(");
        assert!(!transfer.passed);
    }

    #[test]
    fn test_checked_arithmetic_versions() {
        assert!(has_checked_arithmetic("^0.8.20"));
        assert!(has_checked_arithmetic(">=0.8.0 <0.9.0"));
        assert!(!has_checked_arithmetic("^0.6.12"));
        assert!(!has_checked_arithmetic("0.4.24"));
        assert!(!has_checked_arithmetic(""));
    }

    #[test]
    fn test_integer_overflow_pre_08() {
        let src = "// SPDX-License-Identifier: MIT\npragma solidity ^0.6.0;\ncontract A { function f(uint a, uint b) public { total = a - b; } }";
        let result = run(&IntegerOverflowModule, src);
        assert!(!result.passed);
        assert_eq!(result.issues[0].severity, Severity::Critical);
        let underflows = result
            .issues
            .iter()
            .filter(|i| i.description == "Potential underflow in subtraction")
            .count();
        // license comment is ignored
        assert_eq!(underflows, 1);
        assert_eq!(result.score, 60);
    }

    #[test]
    fn test_integer_overflow_unchecked_block() {
        let src = "pragma solidity ^0.8.19; contract A { function f() public { unchecked { i = i + 1; } } }";
        let result = run(&IntegerOverflowModule, src);
        assert!(result.passed);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].severity, Severity::High);
        assert_eq!(result.score, 85);
    }

    #[test]
    fn test_unprotected_mint() {
        let src = "function mint(uint256 amt) public { _mint(msg.sender, amt); }";
        let result = run(&AccessControlModule, src);
        assert!(!result.passed);
        assert_eq!(result.issues[0].description, "Unprotected critical function: mint");
        assert_eq!(result.issues[0].severity, Severity::Critical);
    }

    #[test]
    fn test_protected_and_internal_functions_pass() {
        let src = r#"
            contract T is Ownable2Step {
                function mint(uint256 amt) external onlyOwner { _mint(msg.sender, amt); }
                function _burnFrom(address a) internal { }
                function pause() external { require(msg.sender == owner(), "no"); }
            }
        "#;
        let result = run(&AccessControlModule, src);
        assert!(result.passed, "{:?}", result.issues);
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_hidden_balance_function() {
        let src = "function setBalance(address u, uint256 v) external onlyOwner { balances[u] = v; }";
        let result = run(&AccessControlModule, src);
        assert!(result
            .issues
            .iter()
            .any(|i| i.description == "Admin access can rewrite user balances (hidden function)"));
        assert!(!result.passed);
    }

    #[test]
    fn test_tx_origin() {
        let src = "function f() external { require(tx.origin == owner); }";
        let result = run(&TxOriginModule, src);
        assert!(!result.passed);
        assert_eq!(result.score, 70);
    }

    #[test]
    fn test_weak_randomness() {
        let src = "uint r = uint(keccak256(abi.encodePacked(block.timestamp, msg.sender))) % 10;";
        let result = run(&WeakRandomnessModule, src);
        assert!(!result.passed);
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn test_dos_call_in_loop() {
        let src = "function pay() external { for (uint i = 0; i < users.length; i++) { payable(users[i]).transfer(1); } }";
        let result = run(&DenialOfServiceModule, src);
        assert_eq!(result.issues.len(), 2);
        assert!(!result.passed);
        assert_eq!(result.score, 70);
    }

    #[test]
    fn test_signature_replay() {
        let src = "function claim(bytes32 h, uint8 v, bytes32 r, bytes32 s) external { address a = ecrecover(h, v, r, s); }";
        let result = run(&SignatureReplayModule, src);
        assert_eq!(result.issues.len(), 3);
        assert!(!result.passed);
        assert_eq!(result.score, 60);
    }
}
