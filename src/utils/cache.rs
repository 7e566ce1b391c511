//! In-Memory Report Store
//!
//! Thread-safe store for finished audit reports plus an access ledger of
//! who requested which report and whether they paid.
//! Uses DashMap for concurrent access without lock contention.
//!
//! Features:
//! - Report content keyed by lowercase contract address, stored once and
//!   never recomputed
//! - Ledger keyed by (contract, user); anonymous viewers share one entry
//! - Payment-gated views (premium section stripped until paid)
//! - HIT/MISS statistics

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{AppError, AppResult, AuditReport};
use crate::utils::constants::normalize_address;

/// Ledger entry for one (contract, user) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub audit_id: Uuid,
    pub contract_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_address: Option<String>,
    pub is_paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub risk_score: u8,
}

type LedgerKey = (String, String);

fn ledger_key(contract_address: &str, user_address: Option<&str>) -> LedgerKey {
    (
        normalize_address(contract_address),
        user_address.map(normalize_address).unwrap_or_default(),
    )
}

#[derive(Clone)]
pub struct ReportStore {
    /// lowercase contract address -> full report
    reports: Arc<DashMap<String, AuditReport>>,
    /// (contract, user) -> ledger entry
    records: Arc<DashMap<LedgerKey, AuditRecord>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    audits_run: Arc<AtomicU64>,
    started_at: Instant,
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportStore {
    pub fn new() -> Self {
        Self {
            reports: Arc::new(DashMap::new()),
            records: Arc::new(DashMap::new()),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            audits_run: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    /// Stored full report, if any
    pub fn get(&self, contract_address: &str) -> Option<AuditReport> {
        let key = normalize_address(contract_address);
        match self.reports.get(&key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                info!("✅ STORE HIT: {}", key);
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("📭 STORE MISS: {}", key);
                None
            }
        }
    }

    /// Store a freshly computed report. If another request stored one
    /// first, that one wins and is returned.
    pub fn insert(&self, contract_address: &str, report: AuditReport) -> AuditReport {
        let key = normalize_address(contract_address);
        self.audits_run.fetch_add(1, Ordering::Relaxed);
        let stored = self
            .reports
            .entry(key.clone())
            .or_insert(report)
            .value()
            .clone();
        info!("💾 STORE SET: {} (score {})", key, stored.risk_score);
        stored
    }

    /// Ledger entry for the pair, created on first access
    pub fn record_access(
        &self,
        contract_address: &str,
        user_address: Option<&str>,
        risk_score: u8,
    ) -> AuditRecord {
        let key = ledger_key(contract_address, user_address);
        self.records
            .entry(key.clone())
            .or_insert_with(|| AuditRecord {
                audit_id: Uuid::new_v4(),
                contract_address: key.0.clone(),
                user_address: (!key.1.is_empty()).then(|| key.1.clone()),
                is_paid: false,
                payment_tx_hash: None,
                created_at: Utc::now(),
                risk_score,
            })
            .value()
            .clone()
    }

    pub fn is_paid(&self, contract_address: &str, user_address: Option<&str>) -> bool {
        self.records
            .get(&ledger_key(contract_address, user_address))
            .is_some_and(|r| r.is_paid)
    }

    /// Mark the pair paid. The report must already exist.
    pub fn mark_paid(
        &self,
        contract_address: &str,
        user_address: Option<&str>,
        tx_hash: &str,
    ) -> AppResult<AuditRecord> {
        let risk_score = self
            .reports
            .get(&normalize_address(contract_address))
            .map(|r| r.risk_score)
            .ok_or_else(|| AppError::audit_not_found(contract_address))?;

        self.record_access(contract_address, user_address, risk_score);
        let key = ledger_key(contract_address, user_address);
        let mut record = self
            .records
            .get_mut(&key)
            .ok_or_else(|| AppError::audit_not_found(contract_address))?;
        record.is_paid = true;
        record.payment_tx_hash = Some(tx_hash.to_string());
        let payer = if key.1.is_empty() { "anonymous" } else { key.1.as_str() };
        info!("💰 PAYMENT RECORDED: {} by {}", key.0, payer);
        Ok(record.value().clone())
    }

    /// Report as the given viewer may see it
    pub fn view(&self, contract_address: &str, user_address: Option<&str>) -> AppResult<AuditReport> {
        let report = self
            .get(contract_address)
            .ok_or_else(|| AppError::audit_not_found(contract_address))?;
        Ok(report.view(self.is_paid(contract_address, user_address)))
    }

    /// Ledger entries for a user, newest first
    pub fn user_history(&self, user_address: &str) -> Vec<AuditRecord> {
        let user = normalize_address(user_address);
        let mut history: Vec<AuditRecord> = self
            .records
            .iter()
            .filter(|entry| entry.key().1 == user)
            .map(|entry| entry.value().clone())
            .collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        history
    }

    pub fn stats(&self) -> StoreStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        StoreStats {
            reports: self.reports.len(),
            records: self.records.len(),
            hits,
            misses,
            hit_rate,
            audits_run: self.audits_run.load(Ordering::Relaxed),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }
}

/// Store statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub reports: usize,
    pub records: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub audits_run: u64,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContractInfo, ErrorCode, FreeReport, IssueCount, PremiumReport, Severity};
    use crate::core::aggregator::Aggregation;

    const CONTRACT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";
    const USER: &str = "0x1234567890AbcdEF1234567890aBcdef12345678";

    fn report(score: u8) -> AuditReport {
        let aggregation = Aggregation::compute(&[]);
        AuditReport {
            contract_address: CONTRACT.to_string(),
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            risk_score: score,
            summary: String::new(),
            issue_count: IssueCount::default(),
            contract_info: ContractInfo {
                is_verified: false,
                has_ownable: false,
                has_mintable: false,
                has_upgradeable: false,
                compiler: "unknown".to_string(),
            },
            free_report: FreeReport {
                summary: String::new(),
                basic_vulnerabilities: vec![],
                risk_level: Severity::Low,
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
                severity_breakdown: aggregation.severity_breakdown,
                gas_optimization: aggregation.gas_optimization,
                security_score: aggregation.security_score,
                risk_assessment: aggregation.risk_assessment,
            }),
            is_paid: false,
        }
    }

    #[test]
    fn test_insert_keeps_first_report() {
        let store = ReportStore::new();
        store.insert(CONTRACT, report(70));
        let second = store.insert(&CONTRACT.to_lowercase(), report(10));
        assert_eq!(second.risk_score, 70);
        assert_eq!(store.get(CONTRACT).unwrap().risk_score, 70);
        assert_eq!(store.stats().audits_run, 2);
    }

    #[test]
    fn test_view_is_redacted_until_paid() {
        let store = ReportStore::new();
        store.insert(CONTRACT, report(70));
        store.record_access(CONTRACT, Some(USER), 70);

        let unpaid = store.view(CONTRACT, Some(USER)).unwrap();
        assert!(unpaid.premium_report.is_none());
        assert!(!unpaid.is_paid);

        let record = store.mark_paid(CONTRACT, Some(USER), "0xabc").unwrap();
        assert!(record.is_paid);
        assert_eq!(record.payment_tx_hash.as_deref(), Some("0xabc"));

        let paid = store.view(CONTRACT, Some(&USER.to_lowercase())).unwrap();
        assert!(paid.premium_report.is_some());
        assert!(paid.is_paid);

        // other viewers still see the free view
        assert!(store.view(CONTRACT, None).unwrap().premium_report.is_none());
    }

    #[test]
    fn test_mark_paid_requires_report() {
        let store = ReportStore::new();
        let err = store.mark_paid(CONTRACT, None, "0xabc").unwrap_err();
        assert_eq!(err.code, ErrorCode::StoreAuditNotFound);
    }

    #[test]
    fn test_record_access_is_stable() {
        let store = ReportStore::new();
        let a = store.record_access(CONTRACT, Some(USER), 70);
        let b = store.record_access(CONTRACT, Some(USER), 10);
        assert_eq!(a.audit_id, b.audit_id);
        assert_eq!(b.risk_score, 70);
        assert_eq!(a.user_address.as_deref(), Some(USER.to_lowercase().as_str()));
        assert!(store.record_access(CONTRACT, None, 70).user_address.is_none());
    }

    #[test]
    fn test_user_history() {
        let store = ReportStore::new();
        store.record_access(CONTRACT, Some(USER), 70);
        store.record_access("0x00000000000000000000000000000000000000aa", Some(USER), 40);
        store.record_access(CONTRACT, None, 70);
        assert_eq!(store.user_history(USER).len(), 2);
        assert!(store.user_history("0xnobody").is_empty());
    }

    #[test]
    fn test_stats_hits_and_misses() {
        let store = ReportStore::new();
        store.insert(CONTRACT, report(70));
        store.get(CONTRACT);
        store.get("0xnonexistent");
        let stats = store.stats();
        assert_eq!(stats.reports, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 50.0);
    }
}
