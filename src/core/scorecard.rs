//! Per-module score accumulator
//!
//! Each module run owns one `ScoreCard`: score starts at 100, penalties
//! subtract, the result is floored at 0 when finished. Modules that keep a
//! separate risk number (rug-pull, tokenomics) add to `risk` independently.

use tracing::warn;

use crate::core::rules::PatternRule;
use crate::models::{Issue, ModuleDescriptor, ModuleResult, Severity};

/// When a module reports `passed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassPolicy {
    /// No CRITICAL issue
    NoCritical,
    /// No HIGH or CRITICAL issue
    NoHigh,
    /// Final score at or above the threshold
    MinScore(u8),
    /// Risk accumulator strictly below the threshold
    RiskBelow(u8),
    /// Decided by the module from its own tallies
    Explicit(bool),
    Always,
}

#[derive(Debug)]
pub struct ScoreCard {
    descriptor: ModuleDescriptor,
    score: i32,
    risk: u32,
    issues: Vec<Issue>,
}

impl ScoreCard {
    pub fn new(descriptor: ModuleDescriptor) -> Self {
        Self {
            descriptor,
            score: 100,
            risk: 0,
            issues: Vec::new(),
        }
    }

    /// Record an issue and subtract its penalty
    pub fn flag(&mut self, issue: Issue, penalty: u8) {
        self.score -= i32::from(penalty);
        self.issues.push(issue);
    }

    /// Record an issue without a penalty
    pub fn note(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// Subtract without an issue (used by tallies that summarise elsewhere)
    pub fn deduct(&mut self, penalty: u32) {
        self.score = self.score.saturating_sub(penalty.min(i32::MAX as u32) as i32);
    }

    pub fn add_risk(&mut self, weight: u8) {
        self.risk += u32::from(weight);
    }

    /// Accumulated risk, capped at 100
    pub fn risk(&self) -> u8 {
        self.risk.min(100) as u8
    }

    /// Current score clamped to 0..=100
    pub fn score(&self) -> u8 {
        self.score.clamp(0, 100) as u8
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn has(&self, severity: Severity) -> bool {
        self.issues.iter().any(|i| i.severity == severity)
    }

    /// Worst severity present, LOW when clean
    pub fn worst_or_low(&self) -> Severity {
        self.issues
            .iter()
            .map(|i| i.severity)
            .max()
            .unwrap_or(Severity::Low)
    }

    /// Run one rule. On error the rule's partial contribution is rolled
    /// back, logged and skipped; the rest of the module still runs.
    pub fn check<F>(&mut self, rule: &str, f: F)
    where
        F: FnOnce(&mut ScoreCard) -> crate::models::AppResult<()>,
    {
        let issues_before = self.issues.len();
        let score_before = self.score;
        let risk_before = self.risk;

        if let Err(e) = f(self) {
            self.issues.truncate(issues_before);
            self.score = score_before;
            self.risk = risk_before;
            warn!(
                module = %self.descriptor.id,
                rule = %rule,
                code = e.code_str(),
                "⚠️  rule skipped: {}",
                e
            );
        }
    }

    /// Apply a pattern rule: each issue it raises costs its penalty
    pub fn apply(&mut self, rule: &PatternRule, text: &str) {
        self.check(rule.description, |card| {
            for issue in rule.evaluate(text)? {
                card.flag(issue, rule.penalty);
            }
            Ok(())
        });
    }

    pub fn passes(&self, policy: PassPolicy) -> bool {
        match policy {
            PassPolicy::NoCritical => !self.has(Severity::Critical),
            PassPolicy::NoHigh => !self.has(Severity::Critical) && !self.has(Severity::High),
            PassPolicy::MinScore(min) => self.score() >= min,
            PassPolicy::RiskBelow(max) => self.risk() < max,
            PassPolicy::Explicit(passed) => passed,
            PassPolicy::Always => true,
        }
    }

    /// Build the immutable result
    pub fn finish(
        self,
        policy: PassPolicy,
        risk_level: Severity,
        recommendations: &[&str],
        details: impl Into<String>,
    ) -> ModuleResult {
        let passed = self.passes(policy);
        ModuleResult {
            module_id: self.descriptor.id.to_string(),
            module_name: self.descriptor.name.to_string(),
            category: self.descriptor.category,
            score: self.score(),
            passed,
            issues: self.issues,
            recommendations: recommendations.iter().map(|r| r.to_string()).collect(),
            risk_level,
            details: details.into(),
            gas_impact_estimate: None,
            risk_accumulator: None,
        }
    }
}

/// Level from a 0-100 risk accumulator (>=70 CRITICAL, >=50 HIGH, >=30 MEDIUM)
pub fn level_from_risk(risk: u8) -> Severity {
    match risk {
        70..=u8::MAX => Severity::Critical,
        50..=69 => Severity::High,
        30..=49 => Severity::Medium,
        _ => Severity::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppError, ModuleCategory};

    fn descriptor() -> ModuleDescriptor {
        ModuleDescriptor {
            id: "test-module",
            name: "Test Module",
            category: ModuleCategory::Security,
            severity: Severity::High,
            description: "test",
        }
    }

    #[test]
    fn test_score_floors_at_zero() {
        let mut card = ScoreCard::new(descriptor());
        for _ in 0..6 {
            card.flag(Issue::new("t", Severity::Critical, "x"), 30);
        }
        assert_eq!(card.score(), 0);
        let result = card.finish(PassPolicy::NoCritical, Severity::Critical, &[], "");
        assert_eq!(result.score, 0);
        assert!(!result.passed);
        assert_eq!(result.issues.len(), 6);
    }

    #[test]
    fn test_failed_rule_rolls_back() {
        let mut card = ScoreCard::new(descriptor());
        card.check("partial", |card| {
            card.flag(Issue::new("t", Severity::High, "partial"), 15);
            card.add_risk(20);
            Err(AppError::rule_failed("boom"))
        });
        assert!(card.issues().is_empty());
        assert_eq!(card.score(), 100);
        assert_eq!(card.risk(), 0);
    }

    #[test]
    fn test_pass_policies() {
        let mut card = ScoreCard::new(descriptor());
        card.flag(Issue::new("t", Severity::High, "h"), 15);
        assert!(card.passes(PassPolicy::NoCritical));
        assert!(!card.passes(PassPolicy::NoHigh));
        assert!(card.passes(PassPolicy::MinScore(70)));
        assert!(!card.passes(PassPolicy::MinScore(90)));
        assert_eq!(card.worst_or_low(), Severity::High);
    }

    #[test]
    fn test_level_from_risk() {
        assert_eq!(level_from_risk(0), Severity::Low);
        assert_eq!(level_from_risk(30), Severity::Medium);
        assert_eq!(level_from_risk(55), Severity::High);
        assert_eq!(level_from_risk(100), Severity::Critical);
    }
}
