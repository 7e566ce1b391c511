//! Pattern Rule Engine
//!
//! Regex checks over Solidity source text. Patterns are compiled once into a
//! process-wide cache (insert-only DashMap) and shared by every module.
//!
//! Rust's `regex` has no look-around; negative look-ahead from the classic
//! exploit signatures is expressed as a separate `unless_followed_by`
//! pattern anchored at the end of the trigger match.

use dashmap::DashMap;
use regex::{Match, Regex};
use std::sync::Arc;
use tracing::debug;

use crate::models::{AppError, AppResult, Issue, Severity};
use crate::core::scorecard::ScoreCard;

lazy_static::lazy_static! {
    /// pattern text -> compiled regex
    static ref PATTERN_CACHE: DashMap<String, Arc<Regex>> = DashMap::new();
}

/// Compile (or fetch) a pattern
pub fn compiled(pattern: &str) -> AppResult<Arc<Regex>> {
    if let Some(re) = PATTERN_CACHE.get(pattern) {
        return Ok(Arc::clone(re.value()));
    }
    let re = Arc::new(Regex::new(pattern).map_err(|e| AppError::invalid_pattern(pattern, e))?);
    debug!("🧩 compiled pattern: {}", pattern);
    PATTERN_CACHE.insert(pattern.to_string(), Arc::clone(&re));
    Ok(re)
}

/// Number of distinct compiled patterns
pub fn cached_patterns() -> usize {
    PATTERN_CACHE.len()
}

/// Any match in `text`
pub fn is_match(pattern: &str, text: &str) -> AppResult<bool> {
    Ok(compiled(pattern)?.is_match(text))
}

/// Every non-overlapping match in `text`
pub fn find_all<'t>(pattern: &str, text: &'t str) -> AppResult<Vec<Match<'t>>> {
    Ok(compiled(pattern)?.find_iter(text).collect())
}

/// True when any of `patterns` matches
pub fn any_match(patterns: &[&str], text: &str) -> AppResult<bool> {
    for pattern in patterns {
        if is_match(pattern, text)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Count of non-overlapping matches
pub fn count(pattern: &str, text: &str) -> AppResult<usize> {
    Ok(compiled(pattern)?.find_iter(text).count())
}

/// First capture group of the first match
pub fn capture<'t>(pattern: &str, text: &'t str) -> AppResult<Option<&'t str>> {
    Ok(compiled(pattern)?
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str()))
}

/// Pattern matches at the very start of `text`
pub fn matches_at_start(pattern: &str, text: &str) -> AppResult<bool> {
    is_match(&format!("^(?:{})", pattern), text)
}

/// How many issues a rule may contribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// One issue if the pattern matches anywhere
    Once,
    /// One issue per match; `{match}` in the description is substituted
    EachMatch,
}

/// A named regex check with fixed severity, penalty and fix text
#[derive(Debug, Clone, Copy)]
pub struct PatternRule {
    pub kind: &'static str,
    pub pattern: &'static str,
    pub severity: Severity,
    pub penalty: u8,
    pub description: &'static str,
    pub fix: &'static str,
    pub mode: MatchMode,
}

impl PatternRule {
    /// Issues this rule raises on `text`, in match order
    pub fn evaluate(&self, text: &str) -> AppResult<Vec<Issue>> {
        let re = compiled(self.pattern)?;
        let issues = match self.mode {
            MatchMode::Once => re
                .find(text)
                .map(|m| vec![self.issue(self.description.to_string(), m.as_str())])
                .unwrap_or_default(),
            MatchMode::EachMatch => re
                .find_iter(text)
                .map(|m| self.issue(self.description.replace("{match}", m.as_str()), m.as_str()))
                .collect(),
        };
        Ok(issues)
    }

    fn issue(&self, description: String, matched: &str) -> Issue {
        let mut issue = Issue::new(self.kind, self.severity, description).with_match(matched);
        if !self.fix.is_empty() {
            issue = issue.with_fix(self.fix);
        }
        issue
    }
}

/// One row of a weighted risk table: fires when `pattern` matches and
/// `unless` (if any) does not
#[derive(Debug, Clone, Copy)]
pub struct RiskRule {
    pub kind: &'static str,
    pub pattern: &'static str,
    pub unless: Option<&'static str>,
    pub severity: Severity,
    /// Added to the module's risk accumulator
    pub weight: u8,
    /// Subtracted from the module score
    pub penalty: u8,
    pub description: &'static str,
    pub fix: &'static str,
}

impl RiskRule {
    pub fn fires(&self, text: &str) -> AppResult<bool> {
        if !is_match(self.pattern, text)? {
            return Ok(false);
        }
        match self.unless {
            Some(guard) => Ok(!is_match(guard, text)?),
            None => Ok(true),
        }
    }

    pub fn issue(&self) -> Issue {
        Issue::new(self.kind, self.severity, self.description).with_fix(self.fix)
    }
}

/// Evaluate a risk table uniformly; each row is its own rule
pub fn apply_risk_table(card: &mut ScoreCard, table: &[RiskRule], text: &str) {
    for rule in table {
        card.check(rule.description, |card| {
            if rule.fires(text)? {
                card.flag(rule.issue(), rule.penalty);
                card.add_risk(rule.weight);
            }
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorCode;

    #[test]
    fn test_cache_reuses_compiled_pattern() {
        let a = compiled(r"cache_test_\d+").unwrap();
        let b = compiled(r"cache_test_\d+").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_invalid_pattern_is_rule_error() {
        let err = is_match(r"(unclosed", "x").unwrap_err();
        assert_eq!(err.code, ErrorCode::RuleInvalidPattern);
    }

    #[test]
    fn test_each_match_rule() {
        let rule = PatternRule {
            kind: "gas",
            pattern: r"\w+\+\+",
            severity: Severity::Low,
            penalty: 5,
            description: "Post-increment {match}",
            fix: "Use ++i",
            mode: MatchMode::EachMatch,
        };
        let issues = rule.evaluate("i++; j++; ++k;").unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].description, "Post-increment i++");
        assert_eq!(issues[1].matched_text.as_deref(), Some("j++"));
        assert_eq!(issues[0].suggested_fix.as_deref(), Some("Use ++i"));
    }

    #[test]
    fn test_once_rule() {
        let rule = PatternRule {
            kind: "x",
            pattern: r"tx\.origin",
            severity: Severity::High,
            penalty: 10,
            description: "origin",
            fix: "",
            mode: MatchMode::Once,
        };
        assert_eq!(rule.evaluate("tx.origin tx.origin").unwrap().len(), 1);
        assert!(rule.evaluate("").unwrap().is_empty());
    }

    #[test]
    fn test_risk_rule_unless() {
        let rule = RiskRule {
            kind: "rug-pull",
            pattern: r"mint|_mint",
            unless: Some(r"maxSupply|MAX_SUPPLY"),
            severity: Severity::Critical,
            weight: 35,
            penalty: 35,
            description: "Unlimited token minting capability",
            fix: "Implement maximum supply cap",
        };
        assert!(rule.fires("function mint() {}").unwrap());
        assert!(!rule.fires("function mint() { require(total <= MAX_SUPPLY); }").unwrap());
        assert!(!rule.fires("").unwrap());
    }

    #[test]
    fn test_matches_at_start() {
        assert!(matches_at_start(r"\s*require", "  require(ok);").unwrap());
        assert!(!matches_at_start(r"\s*require", "x; require(ok);").unwrap());
    }

    #[test]
    fn test_capture() {
        assert_eq!(
            capture(r"pragma\s+solidity\s+([^;]+);", "pragma solidity 0.7.6;").unwrap(),
            Some("0.7.6")
        );
    }
}
