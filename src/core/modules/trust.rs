//! Trust and governance modules
//!
//! Rug-pull and tokenomics risk are plain data tables (`RiskRule`) so the
//! weights can be read and reviewed without following control flow. The
//! reputation and behaviour modules read from the injected `ChainIntel`.

use std::sync::Arc;
use tracing::debug;

use crate::core::modules::AnalysisModule;
use crate::core::rules::{self, apply_risk_table, RiskRule};
use crate::core::scorecard::{level_from_risk, PassPolicy, ScoreCard};
use crate::models::{AppResult, AuditInput, Issue, ModuleCategory, ModuleDescriptor, ModuleResult, Severity};
use crate::providers::ChainIntel;
use crate::utils::constants::{
    MODULE_DEVELOPER_REPUTATION, MODULE_ONCHAIN_BEHAVIOR, MODULE_RUG_PULL, MODULE_TIMELOCK_EMERGENCY,
    MODULE_TOKENOMICS,
};

// ============================================
// RUG PULL
// ============================================

const GOVERNANCE_FIX: &str = "Consider implementing multi-sig or DAO governance";

/// Owner powers that let a deployer drain or lock holders.
/// Severity follows weight: >=30 CRITICAL, >=20 HIGH, else MEDIUM.
pub const RUG_PULL_TABLE: [RiskRule; 10] = [
    RiskRule {
        kind: "rug-pull",
        pattern: r"mint.*onlyOwner|onlyOwner.*mint",
        unless: None,
        severity: Severity::Critical,
        weight: 30,
        penalty: 30,
        description: "Owner can mint unlimited tokens",
        fix: GOVERNANCE_FIX,
    },
    RiskRule {
        kind: "rug-pull",
        pattern: r"withdraw.*onlyOwner|onlyOwner.*withdraw",
        unless: None,
        severity: Severity::High,
        weight: 25,
        penalty: 25,
        description: "Owner can withdraw all funds",
        fix: GOVERNANCE_FIX,
    },
    RiskRule {
        kind: "rug-pull",
        pattern: r"selfdestruct|suicide",
        unless: None,
        severity: Severity::Critical,
        weight: 40,
        penalty: 40,
        description: "Contract can be destroyed",
        fix: GOVERNANCE_FIX,
    },
    RiskRule {
        kind: "rug-pull",
        pattern: r"pause.*onlyOwner|onlyOwner.*pause",
        unless: None,
        severity: Severity::Medium,
        weight: 15,
        penalty: 15,
        description: "Owner can pause contract",
        fix: GOVERNANCE_FIX,
    },
    RiskRule {
        kind: "rug-pull",
        pattern: r"setFee.*onlyOwner|onlyOwner.*setFee",
        unless: None,
        severity: Severity::Medium,
        weight: 10,
        penalty: 10,
        description: "Owner can change fees",
        fix: GOVERNANCE_FIX,
    },
    RiskRule {
        kind: "rug-pull",
        pattern: r"blacklist.*onlyOwner|onlyOwner.*blacklist",
        unless: None,
        severity: Severity::High,
        weight: 20,
        penalty: 20,
        description: "Owner can blacklist addresses",
        fix: GOVERNANCE_FIX,
    },
    RiskRule {
        kind: "rug-pull",
        pattern: r"(?i)tradingEnabled|tradingOpen|enableTrading|setTrading",
        unless: None,
        severity: Severity::High,
        weight: 25,
        penalty: 25,
        description: "Owner-controlled trading restriction can block sells",
        fix: "Make trading permanently enabled after launch",
    },
    RiskRule {
        kind: "rug-pull",
        pattern: r"(?i)maxSell|sellLimit|maxTxAmount",
        unless: None,
        severity: Severity::Medium,
        weight: 15,
        penalty: 15,
        description: "Sell limitation enforced by owner-adjustable limits",
        fix: "Fix transaction limits at deployment or bound them",
    },
    RiskRule {
        kind: "rug-pull",
        pattern: r"mint|_mint",
        unless: Some(r"maxSupply|MAX_SUPPLY|totalSupply.*<="),
        severity: Severity::Critical,
        weight: 35,
        penalty: 35,
        description: "Unlimited token minting capability",
        fix: "Implement maximum supply cap",
    },
    RiskRule {
        kind: "rug-pull",
        pattern: r"Ownable|owner",
        unless: Some(r"MultiSig|Gnosis|multisig"),
        severity: Severity::High,
        weight: 20,
        penalty: 20,
        description: "Single owner control without multi-signature",
        fix: "Implement multi-signature wallet for ownership",
    },
];

const RUG_PULL_EMERGENCY: [RiskRule; 1] = [RiskRule {
    kind: "rug-pull",
    pattern: r"emergency|circuit.*breaker|pause",
    unless: Some(r"timelock.*emergency|multisig.*emergency"),
    severity: Severity::Medium,
    weight: 10,
    penalty: 10,
    description: "Emergency functions without proper protection",
    fix: "Add timelock or multi-sig for emergency functions",
}];

pub struct RugPullModule;

impl AnalysisModule for RugPullModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_RUG_PULL,
            name: "Rug Pull Risk Scoring",
            category: ModuleCategory::TrustAnalysis,
            severity: Severity::Critical,
            description: "Analyzes contract for rug pull indicators and centralization risks",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());

        apply_risk_table(&mut card, &RUG_PULL_TABLE, source);

        card.check("timelock", |card| {
            if card.risk() > 30 && !rules::is_match(r"timelock|TimelockController|delay", source)? {
                card.flag(
                    Issue::new("rug-pull", Severity::Medium, "No timelock for critical operations")
                        .with_fix("Implement timelock for administrative functions"),
                    15,
                );
                card.add_risk(15);
            }
            Ok(())
        });

        apply_risk_table(&mut card, &RUG_PULL_EMERGENCY, source);

        let risk = card.risk();
        let level = level_from_risk(risk);
        debug!(risk, "🪤 rug pull accumulator");

        let mut result = card.finish(
            PassPolicy::RiskBelow(50),
            level,
            &[
                "Implement multi-signature wallet for ownership",
                "Add timelock for critical administrative functions",
                "Set maximum supply cap for tokens",
                "Consider renouncing ownership after deployment",
                "Implement DAO governance for decentralization",
            ],
            format!("Rug pull risk score: {}/100. {} risk level.", risk, level),
        );
        result.risk_accumulator = Some(risk);
        Ok(result)
    }
}

// ============================================
// TIMELOCK & EMERGENCY
// ============================================

pub struct TimelockEmergencyModule;

impl AnalysisModule for TimelockEmergencyModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_TIMELOCK_EMERGENCY,
            name: "Time Lock & Emergency Function Audit",
            category: ModuleCategory::Governance,
            severity: Severity::Medium,
            description: "Analyzes timelock mechanisms and emergency function security",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        let mut has_timelock = false;
        let mut has_emergency = false;

        card.check("timelock", |card| {
            has_timelock = rules::is_match(r"timelock|TimelockController|delay.*seconds", source)?;
            if !has_timelock {
                return Ok(());
            }
            if !rules::is_match(r"require.*delay|delay.*>.*0", source)? {
                card.flag(
                    Issue::new("timelock", Severity::Medium, "Missing delay validation in timelock")
                        .with_fix("Add validation for minimum delay periods"),
                    15,
                );
            }
            if rules::is_match(r"onlyOwner.*immediate|bypass.*timelock", source)? {
                card.flag(
                    Issue::new("timelock", Severity::High, "Timelock can be bypassed")
                        .with_fix("Remove timelock bypass mechanisms"),
                    20,
                );
            }
            if !rules::is_match(r"PROPOSER_ROLE|EXECUTOR_ROLE|TIMELOCK_ADMIN_ROLE", source)? {
                card.flag(
                    Issue::new("timelock", Severity::Medium, "Missing proper role management in timelock")
                        .with_fix("Implement proper role-based access control"),
                    10,
                );
            }
            Ok(())
        });

        card.check("emergency", |card| {
            has_emergency = rules::is_match(r"pause|unpause|emergency|circuit.*breaker", source)?;
            if !has_emergency {
                return Ok(());
            }
            if !rules::is_match(r"onlyOwner.*pause|onlyRole.*pause", source)? {
                card.flag(
                    Issue::new("timelock", Severity::High, "Unprotected emergency functions")
                        .with_fix("Add proper access control to emergency functions"),
                    20,
                );
            }
            if source.contains("pause") && !source.contains("unpause") {
                card.flag(
                    Issue::new("timelock", Severity::Medium, "Missing unpause mechanism")
                        .with_fix("Implement unpause function for recovery"),
                    10,
                );
            }
            if has_timelock && !rules::is_match(r"emergency.*timelock|timelock.*emergency", source)? {
                card.flag(
                    Issue::new("timelock", Severity::Low, "Emergency functions not subject to timelock")
                        .with_fix("Consider adding timelock to emergency functions"),
                    5,
                );
            }
            Ok(())
        });

        card.check("governance", |card| {
            if has_timelock && !rules::is_match(r"Governor|Governance|DAO", source)? {
                card.flag(
                    Issue::new("timelock", Severity::Low, "Timelock without governance integration")
                        .with_fix("Consider integrating with governance system"),
                    5,
                );
            }
            Ok(())
        });

        let present = |yes: bool| if yes { "Present" } else { "Not found" };
        let details = format!(
            "Timelock: {}, Emergency functions: {}",
            present(has_timelock),
            present(has_emergency)
        );
        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::NoHigh,
            level,
            &[
                "Implement proper timelock delays for critical functions",
                "Add role-based access control for timelock operations",
                "Ensure emergency functions have appropriate protection",
                "Implement unpause mechanisms for recovery",
                "Consider governance integration for decentralization",
            ],
            details,
        ))
    }
}

// ============================================
// TOKENOMICS & SUPPLY
// ============================================

/// Supply controls. Weights: CRITICAL 40, HIGH 25, MEDIUM 15, LOW 5.
pub const TOKENOMICS_SUPPLY_TABLE: [RiskRule; 4] = [
    RiskRule {
        kind: "tokenomics",
        pattern: r"mint|_mint",
        unless: Some(r"(?i)maxSupply|MAX_SUPPLY|cap\s*\("),
        severity: Severity::Critical,
        weight: 40,
        penalty: 30,
        description: "Unlimited token minting capability without supply cap",
        fix: "Implement maximum supply limit",
    },
    RiskRule {
        kind: "tokenomics",
        pattern: r"mint|_mint",
        unless: Some(r"onlyOwner.*mint|onlyRole.*mint|mint.*onlyOwner"),
        severity: Severity::High,
        weight: 25,
        penalty: 20,
        description: "Uncontrolled token minting function",
        fix: "Add access control to minting functions",
    },
    RiskRule {
        kind: "tokenomics",
        pattern: r"mint|_mint",
        unless: Some(r"mintingRate|maxMintPerPeriod|lastMintTime"),
        severity: Severity::Medium,
        weight: 15,
        penalty: 15,
        description: "No rate limiting on token minting",
        fix: "Implement minting rate limits",
    },
    RiskRule {
        kind: "tokenomics",
        pattern: r"burn|_burn",
        unless: Some(r"require.*amount|amount.*>.*0.*burn"),
        severity: Severity::Medium,
        weight: 15,
        penalty: 10,
        description: "Token burning without proper validation",
        fix: "Add validation for burn amounts",
    },
];

/// Fee, pause and blacklist controls
pub const TOKENOMICS_CONTROL_TABLE: [RiskRule; 3] = [
    RiskRule {
        kind: "tokenomics",
        pattern: r"tax|fee.*burn|burn.*fee",
        unless: Some(r"require.*fee.*<=|fee.*<.*100"),
        severity: Severity::High,
        weight: 25,
        penalty: 15,
        description: "Deflationary fees without upper bounds",
        fix: "Add maximum fee limits",
    },
    RiskRule {
        kind: "tokenomics",
        pattern: r"pause|_pause|whenNotPaused",
        unless: Some(r"onlyOwner.*pause|onlyRole.*pause"),
        severity: Severity::High,
        weight: 25,
        penalty: 15,
        description: "Pause functionality without proper access control",
        fix: "Restrict pause functions to authorized roles",
    },
    RiskRule {
        kind: "tokenomics",
        pattern: r"blacklist|blocked|banned",
        unless: None,
        severity: Severity::Medium,
        weight: 15,
        penalty: 10,
        description: "Blacklist mechanism enables transfer blocking - centralization risk",
        fix: "Consider decentralized governance for blacklist decisions",
    },
];

/// Initial mints above this many base units count as concentrated
const LARGE_INITIAL_MINT: u128 = 1_000_000;

pub struct TokenomicsModule;

impl AnalysisModule for TokenomicsModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_TOKENOMICS,
            name: "Tokenomics & Supply Risk Audit",
            category: ModuleCategory::EconomicSecurity,
            severity: Severity::High,
            description: "Examines token economics, supply mechanisms, and distribution risks",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());

        apply_risk_table(&mut card, &TOKENOMICS_SUPPLY_TABLE, source);

        let mut has_vesting = false;
        card.check("initial distribution", |card| {
            has_vesting = rules::is_match(r"vesting|cliff|release.*schedule", source)?;
            let initial_mint = rules::is_match(
                r"constructor[^{]*\{[^}]*_mint|initialize[^{]*\{[^}]*_mint",
                source,
            )?;
            if !initial_mint {
                return Ok(());
            }
            let amount = rules::capture(r"_mint\s*\([^,]*,\s*(\d+)", source)?
                .and_then(|digits| digits.parse::<u128>().ok());
            if amount.map_or(false, |a| a > LARGE_INITIAL_MINT) {
                card.flag(
                    Issue::new("tokenomics", Severity::Medium, "Large initial token mint to single address")
                        .with_fix("Consider distributed initial allocation"),
                    10,
                );
                card.add_risk(15);
            }
            if !has_vesting {
                card.flag(
                    Issue::new("tokenomics", Severity::Low, "No vesting mechanism for initial token allocation")
                        .with_fix("Consider implementing token vesting"),
                    5,
                );
                card.add_risk(5);
            }
            Ok(())
        });

        apply_risk_table(&mut card, &TOKENOMICS_CONTROL_TABLE, source);

        let flag = |pattern: &str| rules::is_match(pattern, source).unwrap_or(false);
        let details = format!(
            "Tokenomics analysis: Minting={}, Burning={}, MaxSupply={}, Vesting={}",
            flag(r"mint|_mint"),
            flag(r"burn|_burn"),
            flag(r"(?i)maxSupply|MAX_SUPPLY|cap\s*\("),
            has_vesting
        );
        let risk = card.risk();
        let level = level_from_risk(risk);
        let mut result = card.finish(
            PassPolicy::NoCritical,
            level,
            &[
                "Implement maximum supply cap for tokens",
                "Add proper access control to minting functions",
                "Implement rate limiting for token operations",
                "Consider token vesting for initial allocations",
                "Add upper bounds for fees and taxes",
                "Use decentralized governance for critical parameters",
            ],
            details,
        );
        result.risk_accumulator = Some(risk);
        Ok(result)
    }
}

// ============================================
// DEVELOPER REPUTATION
// ============================================

pub struct DeveloperReputationModule {
    intel: Arc<dyn ChainIntel>,
}

impl DeveloperReputationModule {
    pub fn new(intel: Arc<dyn ChainIntel>) -> Self {
        Self { intel }
    }
}

impl AnalysisModule for DeveloperReputationModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_DEVELOPER_REPUTATION,
            name: "Developer Reputation Check",
            category: ModuleCategory::TrustAnalysis,
            severity: Severity::Medium,
            description: "Analyzes deployer wallet reputation and history",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let mut card = ScoreCard::new(self.descriptor());
        let recommendations = [
            "Verify developer identity through official channels",
            "Check project social media and community presence",
            "Review previous projects and their outcomes",
            "Look for third-party audits and certifications",
            "Monitor ongoing community feedback",
        ];

        let Some(p) = self.intel.deployer_profile(&input.contract_address) else {
            return Ok(card.finish(
                PassPolicy::Always,
                Severity::Low,
                &recommendations,
                format!("Reputation: UNKNOWN | no deployer data from {} provider", self.intel.name()),
            ));
        };

        if p.scam_reports > 0 {
            card.flag(
                Issue::new(
                    "developer-reputation",
                    Severity::High,
                    format!("{} scam reports associated with deployer", p.scam_reports),
                )
                .with_fix("Exercise extreme caution - verify project legitimacy"),
                30,
            );
        }
        if p.account_age_days < 30 {
            card.flag(
                Issue::new(
                    "developer-reputation",
                    Severity::Medium,
                    "Very new deployer account (less than 30 days)",
                )
                .with_fix("Verify developer identity and project legitimacy"),
                15,
            );
        }
        if p.contracts_deployed > 20 && p.verified_projects == 0 {
            card.flag(
                Issue::new(
                    "developer-reputation",
                    Severity::Medium,
                    "High deployment activity with no verified projects",
                )
                .with_fix("Investigate deployment patterns for potential spam"),
                10,
            );
        }
        if p.community_rating < 2.0 {
            card.flag(
                Issue::new(
                    "developer-reputation",
                    Severity::Medium,
                    format!("Low community rating: {:.1}/5.0", p.community_rating),
                )
                .with_fix("Check community feedback and reviews"),
                10,
            );
        }
        if p.verified_projects > 5 {
            card.note(
                Issue::new(
                    "developer-reputation",
                    Severity::Info,
                    format!("Developer has {} verified projects", p.verified_projects),
                )
                .with_fix("Positive reputation indicator"),
            );
        }
        if p.community_rating > 4.0 {
            card.note(
                Issue::new(
                    "developer-reputation",
                    Severity::Info,
                    format!("High community rating: {:.1}/5.0", p.community_rating),
                )
                .with_fix("Strong positive reputation"),
            );
        }

        let status = if p.scam_reports > 0 {
            "HIGH RISK"
        } else if p.verified_projects > 3 && p.community_rating > 3.5 {
            "VERIFIED CLEAN"
        } else if p.account_age_days > 365 && p.contracts_deployed > 5 {
            "ESTABLISHED"
        } else {
            "UNKNOWN"
        };
        let level = if p.scam_reports > 0 {
            Severity::High
        } else {
            card.worst_or_low()
        };
        let policy = if p.scam_reports == 0 {
            PassPolicy::Always
        } else {
            PassPolicy::NoHigh
        };
        Ok(card.finish(
            policy,
            level,
            &recommendations,
            format!(
                "Reputation: {} | Contracts: {} | Age: {} days",
                status, p.contracts_deployed, p.account_age_days
            ),
        ))
    }
}

// ============================================
// ON-CHAIN BEHAVIOR
// ============================================

pub struct OnChainBehaviorModule {
    intel: Arc<dyn ChainIntel>,
}

impl OnChainBehaviorModule {
    pub fn new(intel: Arc<dyn ChainIntel>) -> Self {
        Self { intel }
    }
}

impl AnalysisModule for OnChainBehaviorModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_ONCHAIN_BEHAVIOR,
            name: "On-chain Behavior Analysis",
            category: ModuleCategory::BehavioralAnalysis,
            severity: Severity::Medium,
            description: "Analyzes historical transaction patterns and function usage",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());

        card.check("owner functions", |card| {
            let owner_functions = rules::count(r"function\s+\w+[^{]*onlyOwner[^{]*\{", source)?;
            if owner_functions > 3 {
                card.flag(
                    Issue::new(
                        "onchain-behavior",
                        Severity::Medium,
                        format!("{} owner-only functions may indicate centralization", owner_functions),
                    )
                    .with_fix("Consider implementing DAO governance or multi-sig"),
                    15,
                );
            }
            Ok(())
        });

        let history = self.intel.behavior_history(&input.contract_address);
        if let Some(h) = &history {
            if h.suspicious_activity {
                card.flag(
                    Issue::new(
                        "onchain-behavior",
                        Severity::High,
                        "Suspicious transaction patterns detected in historical data",
                    )
                    .with_fix("Review transaction history for anomalies"),
                    20,
                );
            }
            let ratio = h.owner_ratio();
            if ratio > 0.1 {
                card.flag(
                    Issue::new(
                        "onchain-behavior",
                        Severity::Medium,
                        format!("High owner activity ratio: {:.1}%", ratio * 100.0),
                    )
                    .with_fix("Monitor owner activity for potential centralization risks"),
                    10,
                );
            }
        }

        let details = match &history {
            Some(h) => format!(
                "Analyzed {} transactions from {} unique users",
                h.total_transactions, h.unique_users
            ),
            None => format!("No transaction history from {} provider", self.intel.name()),
        };
        let level = card.worst_or_low();
        Ok(card.finish(
            PassPolicy::NoHigh,
            level,
            &[
                "Monitor transaction patterns regularly",
                "Implement decentralized governance",
                "Set up alerts for unusual activity",
                "Maintain transparent communication with community",
            ],
            details,
        ))
    }
}
