//! Meta-analysis modules
//!
//! Formal verification heuristics, test generation hints, dependency and
//! cross-contract checks, historical exploit signatures, economic attack
//! scenarios and a deterministic severity classification.

use crate::core::modules::AnalysisModule;
use crate::core::rules::{self, RiskRule};
use crate::core::scorecard::{PassPolicy, ScoreCard};
use crate::models::{AppResult, AuditInput, Issue, ModuleCategory, ModuleDescriptor, ModuleResult, Severity};
use crate::utils::constants::{
    MODULE_CROSS_CONTRACT, MODULE_DEPENDENCY, MODULE_ECONOMIC_ATTACK, MODULE_EXPLOIT_PATTERNS,
    MODULE_FORMAL_VERIFICATION, MODULE_SEVERITY_CLASSIFICATION, MODULE_TEST_GENERATION,
};

/// Penalty by severity for signature and scenario tables
fn table_penalty(severity: Severity) -> u8 {
    match severity {
        Severity::Critical => 30,
        Severity::High => 20,
        Severity::Medium => 10,
        Severity::Low => 5,
        Severity::Info => 0,
    }
}

// ============================================
// FORMAL VERIFICATION
// ============================================

const UNREACHABLE_TRIGGERS: [(&str, &str); 3] = [
    (r"return\s*;", "Code after return statement"),
    (r"revert\s*\([^)]*\)\s*;", "Code after revert statement"),
    (r"require\s*\(\s*false\s*[,)][^;]*;", "Code after require(false)"),
];

const CONTRADICTIONS: [&str; 2] = [
    r"require\s*\(\s*\w+\s*>\s*\d+\s*\)[\s\S]*?require\s*\(\s*\w+\s*<\s*\d+\s*\)",
    r"require\s*\(\s*\w+\s*==\s*true\s*\)[\s\S]*?require\s*\(\s*\w+\s*==\s*false\s*\)",
];

/// Text following `end` up to the next `function`, `}` or end of source
fn code_after(source: &str, end: usize) -> &str {
    let rest = &source[end..];
    let stop = [rest.find("function"), rest.find('}')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(rest.len());
    &rest[..stop]
}

fn snippet(text: &str) -> String {
    let cut: String = text.chars().take(100).collect();
    format!("{}...", cut.trim())
}

pub struct FormalVerificationModule;

impl AnalysisModule for FormalVerificationModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_FORMAL_VERIFICATION,
            name: "Formal Verification Checks",
            category: ModuleCategory::Analysis,
            severity: Severity::Info,
            description: "Applies symbolic logic to verify key invariants and detect unreachable code",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());

        for (trigger, label) in UNREACHABLE_TRIGGERS {
            card.check(label, |card| {
                for m in rules::find_all(trigger, source)? {
                    let tail = code_after(source, m.end());
                    if tail.trim().len() > 10 {
                        card.flag(
                            Issue::new(
                                "formal-verification",
                                Severity::Medium,
                                format!("Unreachable code detected: {}", label),
                            )
                            .with_match(snippet(&source[m.start()..m.end() + tail.len()]))
                            .with_fix("Remove unreachable code"),
                            10,
                        );
                    }
                }
                Ok(())
            });
        }

        for pattern in CONTRADICTIONS {
            card.check("contradiction", |card| {
                for m in rules::find_all(pattern, source)? {
                    card.flag(
                        Issue::new("formal-verification", Severity::High, "Logical contradiction in require statements")
                            .with_match(m.as_str())
                            .with_fix("Review and fix contradictory logic"),
                        15,
                    );
                }
                Ok(())
            });
        }

        card.check("balance invariant", |card| {
            if source.contains("balanceOf")
                && !rules::is_match(r"(?i)balanceOf.*\+.*balanceOf|totalSupply.*==.*sum", source)?
            {
                card.flag(
                    Issue::new("formal-verification", Severity::Low, "Missing balance invariant checks")
                        .with_fix("Consider adding balance sum invariants"),
                    5,
                );
            }
            Ok(())
        });

        card.check("state consistency", |card| {
            let state_vars = rules::count(r"uint256\s+(?:public\s+|private\s+)?\w+", source)?;
            if state_vars > 5 && !rules::is_match(r"require.*state|state.*validation", source)? {
                card.flag(
                    Issue::new("formal-verification", Severity::Low, "Complex state without validation checks")
                        .with_fix("Add state consistency validation"),
                    5,
                );
            }
            Ok(())
        });

        let found = card.issues().len();
        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::NoHigh,
            level,
            &[
                "Remove unreachable code segments",
                "Fix logical contradictions in require statements",
                "Add invariant checks for critical state variables",
                "Implement state consistency validation",
                "Consider using formal verification tools like Certora or K",
            ],
            format!("Formal verification analysis found {} potential issues in logic flow", found),
        ))
    }
}

// ============================================
// TEST GENERATION
// ============================================

pub struct TestGenerationModule;

impl AnalysisModule for TestGenerationModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_TEST_GENERATION,
            name: "Automated Test Suite Generation",
            category: ModuleCategory::Testing,
            severity: Severity::Info,
            description: "Generates test cases for public functions and access control",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        let (mut public, mut view, mut payable, mut guarded) = (0usize, 0usize, 0usize, 0usize);

        card.check("public surface", |card| {
            let headers = rules::find_all(r"function\s+\w+\s*\([^)]*\)\s+(?:public|external)[^{]*\{", source)?;
            public = headers.len();
            view = rules::count(r"function\s+\w+\s*\([^)]*\)\s+(?:public|external)\s+view[^{]*\{", source)?;
            payable = rules::count(r"function\s+\w+\s*\([^)]*\)\s+(?:public|external)\s+payable[^{]*\{", source)?;
            guarded = headers
                .iter()
                .filter(|h| h.as_str().contains("onlyOwner") || h.as_str().contains("onlyRole"))
                .count();

            if public == 0 && rules::is_match(r"contract\s+\w+", source)? {
                card.flag(
                    Issue::new("test-generation", Severity::Low, "No public functions found for testing")
                        .with_fix("Ensure contract has testable public interface"),
                    10,
                );
            }

            let mut critical = 0usize;
            for h in &headers {
                if rules::is_match(r"mint|burn|transfer|withdraw|pause|upgrade", h.as_str())? {
                    critical += 1;
                }
            }
            if critical > 0 {
                card.note(
                    Issue::new(
                        "test-generation",
                        Severity::Info,
                        format!("{} critical functions need comprehensive testing", critical),
                    )
                    .with_fix("Generate test cases for all critical functions"),
                );
            }
            Ok(())
        });

        let recommendations = [
            format!("Generate {} unit tests for public functions", public),
            format!("Create {} access control tests", guarded),
            format!("Add {} payable function tests", payable),
            "Implement integration tests for complex workflows".to_string(),
            "Add security-focused test cases".to_string(),
        ];
        let refs: Vec<&str> = recommendations.iter().map(String::as_str).collect();
        Ok(card.finish(
            PassPolicy::Always,
            Severity::Info,
            &refs,
            format!(
                "Test generation analysis: {} public functions, {} view functions, {} payable functions",
                public, view, payable
            ),
        ))
    }
}

// ============================================
// DEPENDENCY VULNERABILITY
// ============================================

const VULNERABLE_OZ_VERSIONS: [&str; 3] = ["4.0.0", "4.1.0", "4.2.0"];

/// (pattern, replacement)
const DEPRECATED_CALLS: [(&str, &str); 3] = [
    (r"safeApprove\s*\(", "forceApprove or safeIncreaseAllowance"),
    (r"_setupRole\s*\(", "_grantRole"),
    (r"\bisContract\s*\(", "address.code.length checks"),
];

pub struct DependencyModule;

impl AnalysisModule for DependencyModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_DEPENDENCY,
            name: "Dependency Vulnerability Check",
            category: ModuleCategory::Security,
            severity: Severity::High,
            description: "Analyzes imported contracts and libraries for known vulnerabilities",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        let (mut imports, mut oz_imports) = (0usize, 0usize);

        card.check("imports", |card| {
            let found = rules::find_all(r"import\s+[^;]+;", source)?;
            imports = found.len();
            oz_imports = found.iter().filter(|m| m.as_str().contains("@openzeppelin")).count();

            for caps in rules::compiled(r"@openzeppelin/contracts@([\d.]*\d)")?.captures_iter(source) {
                let Some(version) = caps.get(1).map(|v| v.as_str()) else {
                    continue;
                };
                if VULNERABLE_OZ_VERSIONS.contains(&version) {
                    card.flag(
                        Issue::new(
                            "dependency-vulnerability",
                            Severity::High,
                            format!("Vulnerable OpenZeppelin version detected: {}", version),
                        )
                        .with_fix("Upgrade to latest stable version"),
                        20,
                    );
                }
            }
            Ok(())
        });

        for (pattern, replacement) in DEPRECATED_CALLS {
            card.check(pattern, |card| {
                if let Some(m) = rules::find_all(pattern, source)?.first() {
                    card.flag(
                        Issue::new(
                            "dependency-vulnerability",
                            Severity::Medium,
                            format!("Deprecated function usage: {}", m.as_str()),
                        )
                        .with_match(m.as_str())
                        .with_fix(format!("Replace with {}", replacement)),
                        10,
                    );
                }
                Ok(())
            });
        }

        card.check("security imports", |card| {
            if rules::is_match(r"\.(?:call(?:\{[^}]*\})?|transfer|send)\s*\(", source)?
                && !source.contains("ReentrancyGuard")
            {
                card.flag(
                    Issue::new(
                        "dependency-vulnerability",
                        Severity::High,
                        "External calls without ReentrancyGuard import",
                    )
                    .with_fix("Import and use OpenZeppelin ReentrancyGuard"),
                    15,
                );
            }
            if rules::is_match(r"onlyOwner|onlyRole", source)?
                && !rules::is_match(r"AccessControl|Ownable", source)?
            {
                card.flag(
                    Issue::new(
                        "dependency-vulnerability",
                        Severity::Medium,
                        "Access control modifiers without proper imports",
                    )
                    .with_fix("Import OpenZeppelin Ownable or AccessControl"),
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
                "Keep dependencies updated to latest stable versions",
                "Regularly audit dependency security advisories",
                "Use OpenZeppelin security libraries",
                "Implement proper import management",
                "Monitor for deprecated function usage",
            ],
            format!("Analyzed {} imports, {} from OpenZeppelin", imports, oz_imports),
        ))
    }
}

// ============================================
// CROSS-CONTRACT INTERACTION
// ============================================

/// (pattern, call type, needs success handling)
const EXTERNAL_CALL_TYPES: [(&str, &str, bool); 5] = [
    (r"\w+\([\w\s,.\[\]]*\)\.call(?:\{[^}]*\})?\s*\(", "Low-level call", true),
    (r"\w+\([\w\s,.\[\]]*\)\.delegatecall\s*\(", "Delegate call", true),
    (r"\w+\([\w\s,.\[\]]*\)\.staticcall\s*\(", "Static call", false),
    (r"IERC20\s*\([^)]+\)\.\w+\s*\(", "ERC20 interface call", false),
    (r"\w+Interface\s*\([^)]+\)\.\w+\s*\(", "Interface call", false),
];

pub struct CrossContractModule;

impl AnalysisModule for CrossContractModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_CROSS_CONTRACT,
            name: "Cross-Contract Interaction Risk",
            category: ModuleCategory::IntegrationSecurity,
            severity: Severity::High,
            description: "Identifies external contract calls and trust assumptions",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        let mut total_calls = 0usize;
        let mut interfaces = 0usize;

        for (pattern, call_type, needs_success) in EXTERNAL_CALL_TYPES {
            card.check(call_type, |card| {
                let calls = rules::find_all(pattern, source)?;
                if calls.is_empty() {
                    return Ok(());
                }
                total_calls += calls.len();
                let handled = rules::is_match(r"require\s*\([^)]*success|success.*require", source)?;
                let validated =
                    rules::is_match(r"require\s*\([^)]*!=\s*address\s*\(0\)|address\s*\(0\).*require", source)?;
                let label = call_type.to_lowercase();

                for m in calls {
                    if needs_success && !handled {
                        card.flag(
                            Issue::new(
                                "cross-contract",
                                Severity::High,
                                format!("Unhandled {}: {}", label, m.as_str()),
                            )
                            .with_match(m.as_str())
                            .with_fix("Add proper error handling for external calls"),
                            15,
                        );
                    }
                    if !validated {
                        card.flag(
                            Issue::new(
                                "cross-contract",
                                Severity::Medium,
                                format!("Missing address validation for {}", label),
                            )
                            .with_fix("Validate addresses before external calls"),
                            10,
                        );
                    }
                }
                Ok(())
            });
        }

        card.check("interfaces", |card| {
            for caps in rules::compiled(r"interface\s+(\w+)\s*\{[^}]*\}")?.captures_iter(source) {
                interfaces += 1;
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                if !rules::is_match(r"version|VERSION", whole.as_str())? {
                    card.flag(
                        Issue::new(
                            "cross-contract",
                            Severity::Low,
                            format!("Interface {} lacks version compatibility checks", name.as_str()),
                        )
                        .with_fix("Add version checks for external interfaces"),
                        5,
                    );
                }
            }
            Ok(())
        });

        card.check("oracle calls", |card| {
            if rules::is_match(r"getLatestPrice|latestRoundData|getPrice", source)?
                && !rules::is_match(r"require\s*\([^)]*price.*>.*0|price.*!=.*0", source)?
            {
                card.flag(
                    Issue::new("cross-contract", Severity::High, "Oracle calls without price validation")
                        .with_fix("Add price validation and staleness checks"),
                    20,
                );
            }
            Ok(())
        });

        card.check("contract existence", |card| {
            if total_calls > 0 && !rules::is_match(r"isContract|extcodesize|code\.length", source)? {
                card.flag(
                    Issue::new(
                        "cross-contract",
                        Severity::Medium,
                        "External calls without contract existence verification",
                    )
                    .with_fix("Verify contract existence before calls"),
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
                "Implement proper error handling for all external calls",
                "Validate addresses and contract existence",
                "Add version compatibility checks for interfaces",
                "Use try-catch blocks for external calls",
                "Implement circuit breakers for critical dependencies",
            ],
            format!(
                "Found {} external contract interactions across {} interfaces",
                total_calls, interfaces
            ),
        ))
    }
}

// ============================================
// HISTORICAL EXPLOIT PATTERNS
// ============================================

/// A known incident shape. `unless_followed_by` is checked directly after
/// each trigger match; the signature fires if any trigger match is not
/// followed by it.
#[derive(Debug, Clone, Copy)]
pub struct ExploitSignature {
    pub name: &'static str,
    pub trigger: &'static str,
    pub unless_followed_by: Option<&'static str>,
    pub severity: Severity,
    pub description: &'static str,
    pub reference: &'static str,
}

impl ExploitSignature {
    pub fn fires(&self, text: &str) -> AppResult<bool> {
        for m in rules::find_all(self.trigger, text)? {
            match self.unless_followed_by {
                None => return Ok(true),
                Some(guard) => {
                    if !rules::matches_at_start(guard, &text[m.end()..])? {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }
}

pub const EXPLOIT_SIGNATURES: [ExploitSignature; 6] = [
    ExploitSignature {
        name: "DAO-style Reentrancy",
        trigger: r"function\s+\w+[^{]*\{[^}]*\.call[^}]*balances\s*\[[^\]]*\]\s*-=",
        unless_followed_by: None,
        severity: Severity::Critical,
        description: "Pattern similar to The DAO exploit",
        reference: "The DAO (2016)",
    },
    ExploitSignature {
        name: "Integer Overflow (BEC Token)",
        trigger: r"uint256\s+\w+\s*=\s*\w+\s*\*\s*\w+.*transfer",
        unless_followed_by: None,
        severity: Severity::High,
        description: "Multiplication overflow pattern",
        reference: "BeautyChain (BEC) Token (2018)",
    },
    ExploitSignature {
        name: "Unchecked Return Value",
        trigger: r"\.call\s*\([^)]*\)\s*;",
        unless_followed_by: Some(r"\s*require"),
        severity: Severity::High,
        description: "Unchecked external call return value",
        reference: "King of Ether (2016)",
    },
    ExploitSignature {
        name: "Short Address Attack",
        trigger: r"function\s+transfer[^{]*\{",
        unless_followed_by: Some(r"[^}]*require[^}]*msg\.data\.length"),
        severity: Severity::Medium,
        description: "Missing input length validation",
        reference: "Short Address Attack",
    },
    ExploitSignature {
        name: "Delegatecall to User Input",
        trigger: r"delegatecall\s*\([^)]*msg\.data",
        unless_followed_by: None,
        severity: Severity::Critical,
        description: "Delegatecall with user-controlled data",
        reference: "Parity Wallet (2017)",
    },
    ExploitSignature {
        name: "Uninitialized Storage Pointer",
        trigger: r"struct\s+\w+\s+\w+\s*;",
        unless_followed_by: Some(r"[^;]*="),
        severity: Severity::High,
        description: "Uninitialized storage struct",
        reference: "Various DeFi exploits",
    },
];

/// (name, trigger, severity, penalty)
const FLASH_LOAN_SIGNATURES: [(&str, &str, Severity, u8); 2] = [
    (
        "Price Manipulation via Flash Loan",
        r"flashLoan.*getAmountsOut|getAmountsOut.*flashLoan",
        Severity::Critical,
        25,
    ),
    (
        "Governance Attack via Flash Loan",
        r"flashLoan.*vote|vote.*flashLoan",
        Severity::High,
        15,
    ),
];

const MEV_SIGNATURES: [&str; 2] = [
    r"function\s+\w+[^{]*\{[^}]*block\.timestamp[^}]*transfer",
    r"function\s+\w+[^{]*\{[^}]*block\.number[^}]*mint",
];

pub struct ExploitPatternModule;

impl AnalysisModule for ExploitPatternModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_EXPLOIT_PATTERNS,
            name: "Historical Exploit Pattern Matching",
            category: ModuleCategory::ThreatIntelligence,
            severity: Severity::Critical,
            description: "Compares code patterns to known historical exploits",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());

        for sig in &EXPLOIT_SIGNATURES {
            card.check(sig.name, |card| {
                if sig.fires(source)? {
                    card.flag(
                        Issue::new(
                            "exploit-pattern",
                            sig.severity,
                            format!("{}: {}", sig.name, sig.description),
                        )
                        .with_location(sig.reference)
                        .with_fix(format!("Review code for {} exploit pattern", sig.reference)),
                        table_penalty(sig.severity),
                    );
                }
                Ok(())
            });
        }

        for (name, trigger, severity, penalty) in FLASH_LOAN_SIGNATURES {
            card.check(name, |card| {
                if rules::is_match(trigger, source)? {
                    card.flag(
                        Issue::new("exploit-pattern", severity, format!("{} pattern detected", name))
                            .with_fix("Implement proper flash loan protection"),
                        penalty,
                    );
                }
                Ok(())
            });
        }

        for trigger in MEV_SIGNATURES {
            card.check("mev", |card| {
                if rules::is_match(trigger, source)? {
                    card.flag(
                        Issue::new("exploit-pattern", Severity::Medium, "Potential MEV vulnerability pattern")
                            .with_fix("Review block-dependent logic for MEV risks"),
                        10,
                    );
                }
                Ok(())
            });
        }

        let scanned = EXPLOIT_SIGNATURES.len() + FLASH_LOAN_SIGNATURES.len() + MEV_SIGNATURES.len();
        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::NoCritical,
            level,
            &[
                "Review all flagged patterns against historical exploits",
                "Implement proper reentrancy protection",
                "Add input validation and bounds checking",
                "Use safe math operations",
                "Avoid delegatecall with user input",
            ],
            format!("Scanned against {} known exploit patterns", scanned),
        ))
    }
}

// ============================================
// ECONOMIC ATTACK SIMULATION
// ============================================

pub struct EconomicAttackModule;

impl AnalysisModule for EconomicAttackModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_ECONOMIC_ATTACK,
            name: "Economic Attack Simulation",
            category: ModuleCategory::EconomicSecurity,
            severity: Severity::High,
            description: "Simulates economic attacks like sandwich trades and front-running",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        let mut vulnerable = 0usize;

        card.check("economic scenarios", |card| {
            let has_dex = rules::is_match(r"swap|addLiquidity|removeLiquidity|getAmountsOut", source)?;
            let has_slippage = rules::is_match(r"slippage|minAmountOut|deadline", source)?;
            let has_governance = rules::is_match(r"vote|proposal|governance|\bdelegate\b", source)?;

            if has_dex {
                if !has_slippage {
                    card.flag(
                        Issue::new(
                            "economic-attack",
                            Severity::High,
                            "DEX functionality without slippage protection enables sandwich attacks",
                        )
                        .with_fix("Implement slippage limits and deadline checks"),
                        20,
                    );
                }
                if !rules::is_match(r"commit.*reveal|timelock|nonce", source)? {
                    card.flag(
                        Issue::new("economic-attack", Severity::Medium, "Missing front-running protection mechanisms")
                            .with_fix("Consider commit-reveal schemes or time delays"),
                        15,
                    );
                }
            }

            if rules::is_match(r"auction|bid|highest.*bidder", source)?
                && !rules::is_match(r"withdraw.*pattern|pull.*payment", source)?
            {
                card.flag(
                    Issue::new(
                        "economic-attack",
                        Severity::Medium,
                        "Auction mechanism without proper withdrawal pattern",
                    )
                    .with_fix("Implement pull payment pattern for auctions"),
                    10,
                );
            }

            if has_governance {
                if !rules::is_match(r"votingDelay|proposalDelay", source)? {
                    card.flag(
                        Issue::new(
                            "economic-attack",
                            Severity::High,
                            "Governance without voting delays enables flash loan attacks",
                        )
                        .with_fix("Implement voting delays and proposal periods"),
                        20,
                    );
                }
                if !rules::is_match(r"quorum|minimumVotes", source)? {
                    card.flag(
                        Issue::new("economic-attack", Severity::Medium, "Missing quorum requirements for governance")
                            .with_fix("Implement minimum quorum for proposal execution"),
                        10,
                    );
                }
            }

            let scenarios = [
                (
                    "Sandwich Attack",
                    has_dex && !has_slippage,
                    Severity::High,
                    "Attacker can manipulate prices around user transactions",
                ),
                (
                    "Flash Loan Governance Attack",
                    has_governance && !source.contains("votingDelay"),
                    Severity::Critical,
                    "Attacker can borrow tokens to manipulate governance votes",
                ),
                (
                    "Oracle Manipulation",
                    rules::is_match(r"getPrice|oracle", source)? && !source.contains("TWAP"),
                    Severity::High,
                    "Attacker can manipulate oracle prices for profit",
                ),
            ];
            for (name, hit, severity, description) in scenarios {
                if !hit {
                    continue;
                }
                vulnerable += 1;
                let penalty = if severity == Severity::Critical { 25 } else { 15 };
                card.flag(
                    Issue::new("economic-attack", severity, format!("{}: {}", name, description))
                        .with_fix(format!("Implement protection against {}", name.to_lowercase())),
                    penalty,
                );
            }
            Ok(())
        });

        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::NoCritical,
            level,
            &[
                "Implement slippage protection for DEX operations",
                "Add voting delays for governance mechanisms",
                "Use TWAP for price-sensitive calculations",
                "Implement commit-reveal schemes for sensitive operations",
                "Add circuit breakers for unusual market conditions",
            ],
            format!(
                "Economic attack simulation completed. {} vulnerabilities found.",
                vulnerable
            ),
        ))
    }
}

// ============================================
// SEVERITY CLASSIFICATION
// ============================================

/// Source indicators tallied per severity class. Each row counts once.
pub const SEVERITY_INDICATORS: [RiskRule; 17] = [
    // critical
    RiskRule {
        kind: "severity-classification",
        pattern: r"\.call(?:\{[^}]*\})?\s*\(",
        unless: Some(r"nonReentrant|ReentrancyGuard"),
        severity: Severity::Critical,
        weight: 0,
        penalty: 0,
        description: "Reentrancy vulnerabilities",
        fix: "",
    },
    RiskRule {
        kind: "severity-classification",
        pattern: r"pragma\s+solidity\s+[\^>=<~\s]*0\.[4-7]\.",
        unless: Some(r"SafeMath"),
        severity: Severity::Critical,
        weight: 0,
        penalty: 0,
        description: "Integer overflow/underflow",
        fix: "",
    },
    RiskRule {
        kind: "severity-classification",
        pattern: r"selfdestruct\s*\(",
        unless: None,
        severity: Severity::Critical,
        weight: 0,
        penalty: 0,
        description: "Unprotected selfdestruct",
        fix: "",
    },
    RiskRule {
        kind: "severity-classification",
        pattern: r"\b_?mint\s*\(",
        unless: Some(r"(?i)maxSupply|MAX_SUPPLY|cap\s*\("),
        severity: Severity::Critical,
        weight: 0,
        penalty: 0,
        description: "Unlimited token minting",
        fix: "",
    },
    // high
    RiskRule {
        kind: "severity-classification",
        pattern: r"tx\.origin",
        unless: None,
        severity: Severity::High,
        weight: 0,
        penalty: 0,
        description: "Access control bypass",
        fix: "",
    },
    RiskRule {
        kind: "severity-classification",
        pattern: r"(?i)getPrice|latestRoundData|getReserves",
        unless: Some(r"(?i)TWAP|timeWeighted"),
        severity: Severity::High,
        weight: 0,
        penalty: 0,
        description: "Oracle manipulation",
        fix: "",
    },
    RiskRule {
        kind: "severity-classification",
        pattern: r"flashLoan|onFlashLoan",
        unless: Some(r"nonReentrant|ReentrancyGuard"),
        severity: Severity::High,
        weight: 0,
        penalty: 0,
        description: "Flash loan vulnerabilities",
        fix: "",
    },
    RiskRule {
        kind: "severity-classification",
        pattern: r"\.call(?:\{[^}]*\})?\s*\(",
        unless: Some(r"require\s*\(\s*(?:success|ok|sent)\b"),
        severity: Severity::High,
        weight: 0,
        penalty: 0,
        description: "Unvalidated external calls",
        fix: "",
    },
    // medium
    RiskRule {
        kind: "severity-classification",
        pattern: r"function\s+(?:set|update)[A-Z_]\w*\s*\(",
        unless: Some(r"emit\s+\w+"),
        severity: Severity::Medium,
        weight: 0,
        penalty: 0,
        description: "Missing event emissions",
        fix: "",
    },
    RiskRule {
        kind: "severity-classification",
        pattern: r"(?s)onlyOwner(?:.*?onlyOwner){3}",
        unless: None,
        severity: Severity::Medium,
        weight: 0,
        penalty: 0,
        description: "Centralization risks",
        fix: "",
    },
    RiskRule {
        kind: "severity-classification",
        pattern: r"\w+\+\+",
        unless: None,
        severity: Severity::Medium,
        weight: 0,
        penalty: 0,
        description: "Gas optimization issues",
        fix: "",
    },
    RiskRule {
        kind: "severity-classification",
        pattern: r"function\s+\w+\s*\([^)]*address\s+\w+[^)]*\)\s*(?:external|public)",
        unless: Some(r"address\s*\(\s*0\s*\)"),
        severity: Severity::Medium,
        weight: 0,
        penalty: 0,
        description: "Input validation gaps",
        fix: "",
    },
    // low
    RiskRule {
        kind: "severity-classification",
        pattern: r"TODO|FIXME|XXX",
        unless: None,
        severity: Severity::Low,
        weight: 0,
        penalty: 0,
        description: "Code style issues",
        fix: "",
    },
    RiskRule {
        kind: "severity-classification",
        pattern: r"function\s+\w+",
        unless: Some(r"///|/\*\*"),
        severity: Severity::Low,
        weight: 0,
        penalty: 0,
        description: "Missing documentation",
        fix: "",
    },
    RiskRule {
        kind: "severity-classification",
        pattern: r"string\s+memory\s+\w+\s*=",
        unless: None,
        severity: Severity::Low,
        weight: 0,
        penalty: 0,
        description: "Optimization opportunities",
        fix: "",
    },
    // informational
    RiskRule {
        kind: "severity-classification",
        pattern: r"pragma\s+solidity\s+\^",
        unless: None,
        severity: Severity::Info,
        weight: 0,
        penalty: 0,
        description: "Floating compiler pragma",
        fix: "",
    },
    RiskRule {
        kind: "severity-classification",
        pattern: r"pragma\s+experimental",
        unless: None,
        severity: Severity::Info,
        weight: 0,
        penalty: 0,
        description: "Experimental compiler features",
        fix: "",
    },
];

/// Risk points per indicator of each class
fn class_weight(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 25,
        Severity::High => 15,
        Severity::Medium => 8,
        Severity::Low => 3,
        Severity::Info => 1,
    }
}

fn class_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "critical",
        Severity::High => "high",
        Severity::Medium => "medium",
        Severity::Low => "low",
        Severity::Info => "informational",
    }
}

pub struct SeverityClassificationModule;

impl AnalysisModule for SeverityClassificationModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_SEVERITY_CLASSIFICATION,
            name: "Automated Severity Classification",
            category: ModuleCategory::Analysis,
            severity: Severity::Info,
            description: "Classifies and summarizes all security issues by severity",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());

        // worst first, matching Severity::ALL
        let mut hits: Vec<(Severity, Vec<&'static str>)> =
            Severity::ALL.iter().map(|s| (*s, Vec::new())).collect();
        for indicator in &SEVERITY_INDICATORS {
            card.check(indicator.description, |_| {
                if indicator.fires(source)? {
                    if let Some((_, labels)) = hits.iter_mut().find(|(s, _)| *s == indicator.severity) {
                        labels.push(indicator.description);
                    }
                }
                Ok(())
            });
        }

        let count = |sev: Severity| {
            hits.iter()
                .find(|(s, _)| *s == sev)
                .map_or(0, |(_, labels)| labels.len())
        };
        let risk: u32 = hits
            .iter()
            .map(|(sev, labels)| class_weight(*sev) * labels.len() as u32)
            .sum();
        card.deduct(risk);

        for (sev, labels) in &hits {
            if labels.is_empty() {
                continue;
            }
            let label = class_label(*sev);
            card.note(
                Issue::new(
                    "severity-classification",
                    *sev,
                    format!("{} {} severity issues found", labels.len(), label),
                )
                .with_location(labels.join(", "))
                .with_fix(format!("Review and address all {} issues", label)),
            );
        }

        let (c, h, m, l, i) = (
            count(Severity::Critical),
            count(Severity::High),
            count(Severity::Medium),
            count(Severity::Low),
            count(Severity::Info),
        );
        let level = if c > 0 {
            Severity::Critical
        } else if h > 2 {
            Severity::High
        } else if m > 5 {
            Severity::Medium
        } else {
            Severity::Low
        };
        Ok(card.finish(
            PassPolicy::Explicit(c == 0 && h < 2),
            level,
            &[
                "Address all critical issues immediately",
                "Prioritize high severity issues",
                "Plan remediation for medium severity issues",
                "Consider fixing low severity issues for code quality",
                "Implement continuous security monitoring",
            ],
            format!("Classification complete: {}C/{}H/{}M/{}L/{}I", c, h, m, l, i),
        ))
    }
}
