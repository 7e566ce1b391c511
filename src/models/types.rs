//! Type definitions for Contract Guard
//! Core data structures shared by rules, modules and the aggregator

use serde::{Deserialize, Serialize};

/// Issue severity, ordered so that `Critical` is the maximum.
///
/// Also used as a module's `riskLevel` and as the free-tier risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Info => "ℹ️",
            Severity::Low => "🟡",
            Severity::Medium => "🟠",
            Severity::High => "🔴",
            Severity::Critical => "💀",
        }
    }

    /// All severities, worst first
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Module classification shown in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleCategory {
    Security,
    Performance,
    #[serde(rename = "DeFi Security")]
    DefiSecurity,
    Architecture,
    Governance,
    Analysis,
    Testing,
    #[serde(rename = "Behavioral Analysis")]
    BehavioralAnalysis,
    #[serde(rename = "Integration Security")]
    IntegrationSecurity,
    #[serde(rename = "Threat Intelligence")]
    ThreatIntelligence,
    #[serde(rename = "Economic Security")]
    EconomicSecurity,
    #[serde(rename = "Trust Analysis")]
    TrustAnalysis,
    #[serde(rename = "Code Quality")]
    CodeQuality,
}

impl ModuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleCategory::Security => "Security",
            ModuleCategory::Performance => "Performance",
            ModuleCategory::DefiSecurity => "DeFi Security",
            ModuleCategory::Architecture => "Architecture",
            ModuleCategory::Governance => "Governance",
            ModuleCategory::Analysis => "Analysis",
            ModuleCategory::Testing => "Testing",
            ModuleCategory::BehavioralAnalysis => "Behavioral Analysis",
            ModuleCategory::IntegrationSecurity => "Integration Security",
            ModuleCategory::ThreatIntelligence => "Threat Intelligence",
            ModuleCategory::EconomicSecurity => "Economic Security",
            ModuleCategory::TrustAnalysis => "Trust Analysis",
            ModuleCategory::CodeQuality => "Code Quality",
        }
    }
}

impl std::fmt::Display for ModuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected pattern hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Rule family tag (e.g. "reentrancy", "tokenomics")
    pub kind: String,
    pub severity: Severity,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl Issue {
    pub fn new(kind: impl Into<String>, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            severity,
            description: description.into(),
            location_hint: None,
            matched_text: None,
            suggested_fix: None,
        }
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location_hint = Some(location.into());
        self
    }

    pub fn with_match(mut self, matched: impl Into<String>) -> Self {
        self.matched_text = Some(matched.into());
        self
    }
}

/// Output of one analysis module run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleResult {
    pub module_id: String,
    pub module_name: String,
    pub category: ModuleCategory,
    /// 0-100, starts at 100 and only decreases
    pub score: u8,
    pub passed: bool,
    /// Detection order
    pub issues: Vec<Issue>,
    /// Fixed per module, independent of which issues fired
    pub recommendations: Vec<String>,
    pub risk_level: Severity,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_impact_estimate: Option<u64>,
    /// Separate 0-100 risk number for accumulator-driven modules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_accumulator: Option<u8>,
}

impl ModuleResult {
    /// Count issues at a given severity
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Worst severity among issues, if any
    pub fn worst(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }
}

/// Static identity of an analysis module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub category: ModuleCategory,
    /// Headline severity of what the module looks for
    pub severity: Severity,
    pub description: &'static str,
}

/// Input to one audit sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInput {
    pub source_text: String,
    pub contract_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytecode: Option<String>,
}

impl AuditInput {
    pub fn new(source_text: impl Into<String>, contract_address: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            contract_address: contract_address.into(),
            bytecode: None,
        }
    }

    pub fn with_bytecode(mut self, bytecode: impl Into<String>) -> Self {
        self.bytecode = Some(bytecode.into());
        self
    }

    /// Source text shortcut
    #[inline]
    pub fn source(&self) -> &str {
        &self.source_text
    }
}

/// Reputation signals for the deployer of a contract
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployerProfile {
    pub contracts_deployed: u32,
    pub scam_reports: u32,
    pub verified_projects: u32,
    /// 0.0 - 5.0
    pub community_rating: f64,
    pub account_age_days: u32,
}

/// Historical on-chain activity for a contract
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHistory {
    pub total_transactions: u64,
    pub unique_users: u64,
    pub owner_transactions: u64,
    pub suspicious_activity: bool,
}

impl BehaviorHistory {
    /// Share of transactions sent by the owner
    pub fn owner_ratio(&self) -> f64 {
        if self.total_transactions == 0 {
            return 0.0;
        }
        self.owner_transactions as f64 / self.total_transactions as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low > Severity::Info);
        assert_eq!(
            [Severity::Low, Severity::Critical, Severity::Medium].iter().max(),
            Some(&Severity::Critical)
        );
    }

    #[test]
    fn test_severity_serializes_uppercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");
    }

    #[test]
    fn test_category_serializes_display_name() {
        let json = serde_json::to_string(&ModuleCategory::DefiSecurity).unwrap();
        assert_eq!(json, "\"DeFi Security\"");
    }

    #[test]
    fn test_issue_skips_empty_optionals() {
        let issue = Issue::new("gas", Severity::Low, "Post-increment usage");
        let json = serde_json::to_value(&issue).unwrap();
        assert!(json.get("suggestedFix").is_none());
        assert_eq!(json["severity"], "LOW");
    }

    #[test]
    fn test_owner_ratio_no_transactions() {
        let history = BehaviorHistory {
            total_transactions: 0,
            unique_users: 0,
            owner_transactions: 0,
            suspicious_activity: false,
        };
        assert_eq!(history.owner_ratio(), 0.0);
    }
}
