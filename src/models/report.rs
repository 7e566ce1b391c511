//! Audit report structures
//!
//! Shapes serialized to API clients. All numbers are computed by the
//! aggregator; nothing here applies scoring logic.

use serde::{Deserialize, Serialize};

use super::types::{ModuleResult, Severity};

/// Top-level output of one audit sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub contract_address: String,
    /// RFC 3339
    pub timestamp: String,
    pub risk_score: u8,
    pub summary: String,
    pub issue_count: IssueCount,
    pub contract_info: ContractInfo,
    pub free_report: FreeReport,
    /// Omitted for viewers who have not paid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_report: Option<PremiumReport>,
    pub is_paid: bool,
}

impl AuditReport {
    /// Copy of this report with the premium view stripped
    pub fn redacted(&self) -> Self {
        Self {
            premium_report: None,
            is_paid: false,
            ..self.clone()
        }
    }

    /// Copy of this report marked as paid
    pub fn unlocked(&self) -> Self {
        Self {
            is_paid: true,
            ..self.clone()
        }
    }

    /// View for a viewer with the given payment status
    pub fn view(&self, is_paid: bool) -> Self {
        if is_paid {
            self.unlocked()
        } else {
            self.redacted()
        }
    }
}

/// Issue counts per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCount {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub informational: usize,
}

impl IssueCount {
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.informational
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.informational,
        }
    }
}

/// Metadata derived once from raw source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    pub is_verified: bool,
    pub has_ownable: bool,
    pub has_mintable: bool,
    pub has_upgradeable: bool,
    pub compiler: String,
}

/// Truncated view available without payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeReport {
    pub summary: String,
    pub basic_vulnerabilities: Vec<String>,
    pub risk_level: Severity,
}

/// Full payment-gated view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumReport {
    pub critical_vulnerabilities: Vec<String>,
    pub medium_vulnerabilities: Vec<String>,
    pub spyware_risks: Vec<String>,
    pub honeypot_risks: Vec<String>,
    pub backdoor_risks: Vec<String>,
    pub recommendations: Vec<String>,
    pub detailed_analysis: String,
    pub module_results: Vec<ModuleResult>,
    pub severity_breakdown: SeverityBreakdown,
    pub gas_optimization: GasOptimization,
    pub security_score: SecurityScore,
    pub risk_assessment: RiskAssessment,
}

/// One severity bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityBucket {
    pub count: usize,
    /// Distinct module names, first-seen order
    pub modules: Vec<String>,
    /// Up to five sample descriptions
    pub top_issues: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityBreakdown {
    pub critical: SeverityBucket,
    pub high: SeverityBucket,
    pub medium: SeverityBucket,
    pub low: SeverityBucket,
    pub informational: SeverityBucket,
}

impl SeverityBreakdown {
    pub fn bucket(&self, severity: Severity) -> &SeverityBucket {
        match severity {
            Severity::Critical => &self.critical,
            Severity::High => &self.high,
            Severity::Medium => &self.medium,
            Severity::Low => &self.low,
            Severity::Info => &self.informational,
        }
    }

    pub fn bucket_mut(&mut self, severity: Severity) -> &mut SeverityBucket {
        match severity {
            Severity::Critical => &mut self.critical,
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
            Severity::Info => &mut self.informational,
        }
    }

    /// Sum of all bucket counts
    pub fn total(&self) -> usize {
        Severity::ALL.iter().map(|s| self.bucket(*s).count).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasOptimization {
    pub total_optimizations: usize,
    pub estimated_savings: u64,
    pub critical_optimizations: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCategories {
    pub access_control: u8,
    pub reentrancy: u8,
    pub arithmetic: u8,
    pub oracle: u8,
    pub governance: u8,
    pub economics: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityScore {
    pub overall: u8,
    pub categories: SecurityCategories,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub rug_pull_risk: u8,
    pub centralized_risk: u8,
    pub technical_risk: u8,
    pub economic_risk: u8,
    pub overall_risk: Severity,
    /// "ModuleName: description" for CRITICAL/HIGH issues, at most ten
    pub risk_factors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> AuditReport {
        AuditReport {
            contract_address: "0xabc".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            risk_score: 90,
            summary: "ok".to_string(),
            issue_count: IssueCount::default(),
            contract_info: ContractInfo {
                is_verified: false,
                has_ownable: false,
                has_mintable: false,
                has_upgradeable: false,
                compiler: "unknown".to_string(),
            },
            free_report: FreeReport {
                summary: "ok".to_string(),
                basic_vulnerabilities: vec![],
                risk_level: Severity::Critical,
            },
            premium_report: Some(PremiumReport {
                critical_vulnerabilities: vec![],
                medium_vulnerabilities: vec![],
                spyware_risks: vec![],
                honeypot_risks: vec![],
                backdoor_risks: vec![],
                recommendations: vec![],
                detailed_analysis: String::new(),
                module_results: vec![],
                severity_breakdown: SeverityBreakdown::default(),
                gas_optimization: GasOptimization::default(),
                security_score: SecurityScore::default(),
                risk_assessment: RiskAssessment {
                    rug_pull_risk: 0,
                    centralized_risk: 0,
                    technical_risk: 0,
                    economic_risk: 0,
                    overall_risk: Severity::Low,
                    risk_factors: vec![],
                },
            }),
            is_paid: false,
        }
    }

    #[test]
    fn test_redacted_omits_premium_field() {
        let report = sample_report().redacted();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("premiumReport").is_none());
        assert_eq!(json["isPaid"], false);
        assert_eq!(json["freeReport"]["riskLevel"], "CRITICAL");
    }

    #[test]
    fn test_unlocked_keeps_content() {
        let report = sample_report();
        let unlocked = report.view(true);
        assert!(unlocked.is_paid);
        assert_eq!(unlocked.premium_report, report.premium_report);
        assert_eq!(unlocked.risk_score, report.risk_score);
    }
}
