//! Report Assembler
//!
//! Pure formatting: every number comes from the aggregation, this file only
//! arranges it into the free and premium views.

use chrono::{SecondsFormat, Utc};

use crate::core::aggregator::Aggregation;
use crate::core::relabel;
use crate::core::rules;
use crate::models::{
    AuditInput, AuditReport, ContractInfo, FreeReport, IssueCount, ModuleResult, PremiumReport,
    Severity, SeverityBreakdown,
};
use crate::utils::constants::{FREE_TIER_VULNERABILITIES, MAX_RECOMMENDATIONS, VERIFIED_SOURCE_MIN_LEN};

pub fn assemble(
    input: &AuditInput,
    results: Vec<ModuleResult>,
    aggregation: Aggregation,
    module_count: usize,
) -> AuditReport {
    let breakdown = &aggregation.severity_breakdown;
    let issue_count = IssueCount {
        critical: breakdown.critical.count,
        high: breakdown.high.count,
        medium: breakdown.medium.count,
        low: breakdown.low.count,
        informational: breakdown.informational.count,
    };
    let summary = summary(&results, breakdown, module_count);
    let free_report = free_report(&results, aggregation.risk_score);
    let keyword_risks = relabel::relabel(&results);

    let premium = PremiumReport {
        critical_vulnerabilities: descriptions_at(&results, Severity::Critical),
        medium_vulnerabilities: descriptions_at(&results, Severity::Medium),
        spyware_risks: keyword_risks.spyware,
        honeypot_risks: keyword_risks.honeypot,
        backdoor_risks: keyword_risks.backdoor,
        recommendations: recommendations(&results),
        detailed_analysis: detailed_analysis(&results),
        module_results: results,
        severity_breakdown: aggregation.severity_breakdown,
        gas_optimization: aggregation.gas_optimization,
        security_score: aggregation.security_score,
        risk_assessment: aggregation.risk_assessment,
    };

    AuditReport {
        contract_address: input.contract_address.clone(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        risk_score: aggregation.risk_score,
        summary,
        issue_count,
        contract_info: contract_info(input.source()),
        free_report,
        premium_report: Some(premium),
        is_paid: false,
    }
}

/// Derived once from raw source text
pub fn contract_info(source: &str) -> ContractInfo {
    let compiler = rules::capture(r"pragma solidity ([^;]+);", source)
        .ok()
        .flatten()
        .unwrap_or("unknown")
        .to_string();
    ContractInfo {
        is_verified: source.chars().count() > VERIFIED_SOURCE_MIN_LEN,
        has_ownable: source.contains("Ownable") || source.contains("onlyOwner"),
        has_mintable: source.contains("mint"),
        has_upgradeable: ["Upgradeable", "Proxy", "initialize"]
            .iter()
            .any(|k| source.contains(k)),
        compiler,
    }
}

fn summary(results: &[ModuleResult], breakdown: &SeverityBreakdown, module_count: usize) -> String {
    let passed = results.iter().filter(|r| r.passed).count();
    format!(
        "Comprehensive analysis completed with {} security modules. \
         Found {} total issues across {} analysis categories. \
         {}/{} modules passed validation. \
         {} critical and {} high severity issues require immediate attention.",
        module_count,
        breakdown.total(),
        results.len(),
        passed,
        results.len(),
        breakdown.critical.count,
        breakdown.high.count
    )
}

/// Free-tier bucket of the overall score
pub fn free_tier_level(risk_score: u8) -> Severity {
    match risk_score {
        80..=u8::MAX => Severity::Critical,
        60..=79 => Severity::High,
        40..=59 => Severity::Medium,
        _ => Severity::Low,
    }
}

fn free_report(results: &[ModuleResult], risk_score: u8) -> FreeReport {
    let critical = descriptions_at(results, Severity::Critical);
    FreeReport {
        summary: format!(
            "Basic security analysis completed. Risk score: {}/100. {} critical issues detected.",
            risk_score,
            critical.len()
        ),
        basic_vulnerabilities: critical.into_iter().take(FREE_TIER_VULNERABILITIES).collect(),
        risk_level: free_tier_level(risk_score),
    }
}

/// Descriptions at one severity, module order then issue order
pub fn descriptions_at(results: &[ModuleResult], severity: Severity) -> Vec<String> {
    results
        .iter()
        .flat_map(|r| r.issues.iter())
        .filter(|i| i.severity == severity)
        .map(|i| i.description.clone())
        .collect()
}

/// First occurrences only, capped
fn recommendations(results: &[ModuleResult]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for rec in results.iter().flat_map(|r| r.recommendations.iter()) {
        if out.len() == MAX_RECOMMENDATIONS {
            break;
        }
        if !out.contains(rec) {
            out.push(rec.clone());
        }
    }
    out
}

fn detailed_analysis(results: &[ModuleResult]) -> String {
    let sections: Vec<String> = results
        .iter()
        .map(|r| {
            format!(
                "{} ({}): {} Score: {}/100. {} issues found.",
                r.module_name,
                r.category,
                r.details,
                r.score,
                r.issues.len()
            )
        })
        .collect();
    format!(
        "Detailed Technical Analysis:\n\n{}\n\nThis analysis covers {} security domains.",
        sections.join("\n\n"),
        results.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Issue, ModuleCategory};

    fn result(id: &str, score: u8, issues: Vec<Issue>, recs: &[&str]) -> ModuleResult {
        ModuleResult {
            module_id: id.to_string(),
            module_name: id.to_string(),
            category: ModuleCategory::Security,
            score,
            passed: score >= 70,
            issues,
            recommendations: recs.iter().map(|r| r.to_string()).collect(),
            risk_level: Severity::Low,
            details: "checked".to_string(),
            gas_impact_estimate: None,
            risk_accumulator: None,
        }
    }

    #[test]
    fn test_contract_info() {
        let info = contract_info("pragma solidity ^0.8.19;\ncontract T is Ownable { function mint() onlyOwner {} }");
        assert_eq!(info.compiler, "^0.8.19");
        assert!(info.has_ownable);
        assert!(info.has_mintable);
        assert!(!info.has_upgradeable);
        assert!(!info.is_verified);

        let empty = contract_info("");
        assert_eq!(empty.compiler, "unknown");
    }

    #[test]
    fn test_free_tier_buckets() {
        assert_eq!(free_tier_level(39), Severity::Low);
        assert_eq!(free_tier_level(40), Severity::Medium);
        assert_eq!(free_tier_level(60), Severity::High);
        assert_eq!(free_tier_level(80), Severity::Critical);
        assert_eq!(free_tier_level(100), Severity::Critical);
    }

    #[test]
    fn test_free_report_takes_first_three_criticals() {
        let issues = (0..5)
            .map(|i| Issue::new("x", Severity::Critical, format!("c{}", i)))
            .collect();
        let free = free_report(&[result("a", 20, issues, &[])], 20);
        assert_eq!(free.basic_vulnerabilities, vec!["c0", "c1", "c2"]);
        assert_eq!(free.summary, "Basic security analysis completed. Risk score: 20/100. 5 critical issues detected.");
        assert_eq!(free.risk_level, Severity::Low);
    }

    #[test]
    fn test_recommendations_deduplicated_and_capped() {
        let many: Vec<String> = (0..30).map(|i| format!("r{}", i)).collect();
        let many_refs: Vec<&str> = many.iter().map(String::as_str).collect();
        let results = vec![
            result("a", 100, vec![], &["shared", "r0"]),
            result("b", 100, vec![], &many_refs),
        ];
        let recs = recommendations(&results);
        assert_eq!(recs.len(), 20);
        assert_eq!(recs[0], "shared");
        assert_eq!(recs[1], "r0");
        assert_eq!(recs[2], "r1");
    }

    #[test]
    fn test_detailed_analysis_line() {
        let text = detailed_analysis(&[result("gas", 90, vec![Issue::new("x", Severity::Low, "l")], &[])]);
        assert!(text.contains("gas (Security): checked Score: 90/100. 1 issues found."));
    }
}
