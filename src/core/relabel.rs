//! Keyword relabel pass
//!
//! Runs after aggregation over the issues already produced. Never changes
//! an issue; it only picks existing descriptions into three themed lists.

use serde::{Deserialize, Serialize};

use crate::models::ModuleResult;
use crate::utils::constants::{BACKDOOR_KEYWORDS, HONEYPOT_KEYWORDS, SPYWARE_KEYWORDS};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRisks {
    pub spyware: Vec<String>,
    pub honeypot: Vec<String>,
    pub backdoor: Vec<String>,
}

/// Descriptions (module order, issue order) containing any keyword,
/// case-insensitively
pub fn select(results: &[ModuleResult], keywords: &[&str]) -> Vec<String> {
    results
        .iter()
        .flat_map(|r| r.issues.iter())
        .filter(|issue| {
            let lower = issue.description.to_lowercase();
            keywords.iter().any(|k| lower.contains(k))
        })
        .map(|issue| issue.description.clone())
        .collect()
}

pub fn relabel(results: &[ModuleResult]) -> KeywordRisks {
    KeywordRisks {
        spyware: select(results, &SPYWARE_KEYWORDS),
        honeypot: select(results, &HONEYPOT_KEYWORDS),
        backdoor: select(results, &BACKDOOR_KEYWORDS),
    }
}
