//! Integration tests for Contract Guard

use contract_guard::models::{ModuleCategory, ModuleDescriptor};
use contract_guard::utils::constants::{MODULE_ACCESS_CONTROL, MODULE_ERROR_KIND, MODULE_TOKENOMICS};
use contract_guard::{
    AnalysisModule, AppError, AppResult, Aggregator, AuditConfig, AuditInput, AuditReport, ErrorCode,
    ModuleRegistry, ModuleResult, NoChainIntel, ReportStore, Severity,
};
use std::sync::Arc;

const ADDRESS: &str = "0x1111111111111111111111111111111111111111";

const TOKEN: &str = r#"
pragma solidity ^0.8.19;

import "@openzeppelin/contracts/access/Ownable.sol";

contract Token is Ownable {
    mapping(address => uint256) public balances;
    mapping(address => bool) public blacklist;

    function mint(uint256 amt) public { _mint(msg.sender, amt); }

    function withdraw(uint256 amount) external {
        require(balances[msg.sender] >= amount);
        (bool ok,) = msg.sender.call{value: amount}("");
        require(ok);
        balances[msg.sender] = balances[msg.sender] - amount;
    }

    function setBlacklist(address user, bool value) external onlyOwner {
        blacklist[user] = value;
    }

    function pick() external view returns (uint256) {
        return uint256(keccak256(abi.encodePacked(block.timestamp, block.difficulty))) % 10;
    }
}
"#;

fn standard() -> Aggregator {
    let registry = Arc::new(ModuleRegistry::standard(Arc::new(NoChainIntel)));
    Aggregator::new(registry, &AuditConfig::default())
}

fn audit(source: &str) -> AuditReport {
    standard().run_all(&AuditInput::new(source, ADDRESS))
}

fn results(report: &AuditReport) -> &[ModuleResult] {
    &report
        .premium_report
        .as_ref()
        .expect("full report carries premium view")
        .module_results
}

fn result<'a>(report: &'a AuditReport, id: &str) -> &'a ModuleResult {
    results(report)
        .iter()
        .find(|r| r.module_id == id)
        .unwrap_or_else(|| panic!("module {} missing", id))
}

struct BrokenModule;

impl AnalysisModule for BrokenModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: "broken",
            name: "Broken Module",
            category: ModuleCategory::Security,
            severity: Severity::High,
            description: "Always fails",
        }
    }

    fn analyze(&self, _input: &AuditInput) -> AppResult<ModuleResult> {
        Err(AppError::module_failed("rule table unavailable"))
    }
}

// ============================================
// Report invariants
// ============================================

#[test]
fn test_standard_registry_runs_every_module_in_order() {
    let report = audit(TOKEN);
    let ids: Vec<&str> = results(&report).iter().map(|r| r.module_id.as_str()).collect();
    let registry = ModuleRegistry::standard(Arc::new(NoChainIntel));
    assert_eq!(registry.len(), 26);
    assert_eq!(ids, registry.ids());
}

#[test]
fn test_scores_within_bounds() {
    let report = audit(TOKEN);
    assert!(report.risk_score <= 100);
    for r in results(&report) {
        assert!(r.score <= 100, "{} scored {}", r.module_id, r.score);
        if let Some(risk) = r.risk_accumulator {
            assert!(risk <= 100);
        }
    }
}

#[test]
fn test_risk_score_is_rounded_mean() {
    let report = audit(TOKEN);
    let scores: Vec<f64> = results(&report).iter().map(|r| r.score as f64).collect();
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    assert_eq!(report.risk_score, mean.round() as u8);
}

#[test]
fn test_breakdown_matches_issue_counts() {
    let report = audit(TOKEN);
    let premium = report.premium_report.as_ref().unwrap();
    let total: usize = results(&report).iter().map(|r| r.issues.len()).sum();

    assert_eq!(premium.severity_breakdown.total(), total);
    assert_eq!(report.issue_count.total(), total);
    for severity in Severity::ALL {
        assert_eq!(
            premium.severity_breakdown.bucket(severity).count,
            report.issue_count.get(severity)
        );
        assert!(premium.severity_breakdown.bucket(severity).top_issues.len() <= 5);
    }
    assert!(premium.risk_assessment.risk_factors.len() <= 10);
    assert!(premium.recommendations.len() <= 20);
}

#[test]
fn test_audit_is_deterministic() {
    let aggregator = standard();
    let input = AuditInput::new(TOKEN, ADDRESS);
    let first = aggregator.run_all(&input);
    let second = aggregator.run_all(&input);
    assert_eq!(first.premium_report, second.premium_report);
    assert_eq!(first.risk_score, second.risk_score);
    assert_eq!(first.free_report, second.free_report);
}

#[tokio::test]
async fn test_concurrent_sweep_matches_sequential() {
    let aggregator = standard();
    let input = AuditInput::new(TOKEN, ADDRESS);
    let sequential = aggregator.run_all(&input);
    let concurrent = aggregator.run_all_concurrent(Arc::new(input)).await;
    assert_eq!(sequential.premium_report, concurrent.premium_report);
    assert_eq!(sequential.issue_count, concurrent.issue_count);
}

#[test]
fn test_keyword_lists_only_hold_existing_descriptions() {
    let report = audit(TOKEN);
    let premium = report.premium_report.as_ref().unwrap();
    let descriptions: Vec<&str> = results(&report)
        .iter()
        .flat_map(|r| r.issues.iter())
        .map(|i| i.description.as_str())
        .collect();

    for entry in premium
        .honeypot_risks
        .iter()
        .chain(&premium.backdoor_risks)
        .chain(&premium.spyware_risks)
    {
        assert!(descriptions.contains(&entry.as_str()), "{} has no source issue", entry);
    }
}

// ============================================
// Scenarios
// ============================================

#[test]
fn test_unprotected_mint_flagged_twice() {
    let report = audit("function mint(uint256 amt) public { _mint(msg.sender, amt); }");

    let access = result(&report, MODULE_ACCESS_CONTROL);
    assert!(!access.passed);
    assert!(access
        .issues
        .iter()
        .any(|i| i.description == "Unprotected critical function: mint" && i.severity == Severity::Critical));

    let tokenomics = result(&report, MODULE_TOKENOMICS);
    assert!(!tokenomics.passed);
    assert!(tokenomics.issues.iter().any(|i| {
        i.description == "Unlimited token minting capability without supply cap"
            && i.severity == Severity::Critical
    }));

    assert!(report.issue_count.critical >= 2);
}

#[test]
fn test_guarded_withdraw_passes_reentrancy() {
    let src = r#"
        contract Vault is ReentrancyGuard {
            function withdraw() external nonReentrant {
                (bool ok,) = msg.sender.call{value: 1}("");
                require(ok);
            }
        }
    "#;
    let report = audit(src);
    let reentrancy = result(&report, "reentrancy-detection");
    assert!(reentrancy.passed);
    assert_eq!(reentrancy.score, 100);
    assert_eq!(reentrancy.count(Severity::Critical), 0);
}

#[test]
fn test_wrapped_receiver_withdraw_flagged() {
    let src = r#"
        contract Vault {
            function withdraw() external {
                (bool ok,) = payable(msg.sender).call{value: bal}("");
                require(ok);
            }
        }
    "#;
    let report = audit(src);
    let reentrancy = result(&report, "reentrancy-detection");
    assert!(!reentrancy.passed);
    assert!(reentrancy.score < 100);
    assert!(reentrancy
        .issues
        .iter()
        .any(|i| i.severity == Severity::Critical && i.description.contains("payable(msg.sender).call")));
}

#[test]
fn test_parity_delegatecall_signature() {
    let src = "function forward() external { address(lib).delegatecall(msg.data); }";
    let report = audit(src);
    let exploits = result(&report, "exploit-pattern-matching");
    let parity = exploits
        .issues
        .iter()
        .find(|i| i.location_hint.as_deref() == Some("Parity Wallet (2017)"))
        .expect("parity signature fires");
    assert_eq!(parity.severity, Severity::Critical);
    assert!(!exploits.passed);
}

#[test]
fn test_empty_source_is_clean() {
    let report = audit("");
    assert_eq!(report.issue_count.critical, 0);
    assert_eq!(report.issue_count.high, 0);
    for r in results(&report) {
        assert!(r.passed, "{} failed on empty input: {:?}", r.module_id, r.issues);
    }
    assert_eq!(report.contract_info.compiler, "unknown");
    assert!(!report.contract_info.is_verified);
}

#[test]
fn test_failing_module_is_substituted() {
    let registry = ModuleRegistry::builder()
        .with(BrokenModule)
        .build()
        .unwrap();
    let aggregator = Aggregator::new(Arc::new(registry), &AuditConfig::default());
    let report = aggregator.run_all(&AuditInput::new(TOKEN, ADDRESS));

    let broken = &results(&report)[0];
    assert_eq!(broken.score, 0);
    assert!(!broken.passed);
    assert_eq!(broken.risk_level, Severity::High);
    assert_eq!(broken.issues.len(), 1);
    assert_eq!(broken.issues[0].kind, MODULE_ERROR_KIND);
    assert!(broken.issues[0].description.starts_with("Module analysis failed: "));
    assert_eq!(report.risk_score, 0);
    assert_eq!(report.issue_count.high, 1);
}

#[test]
fn test_duplicate_module_rejected() {
    let err = ModuleRegistry::builder()
        .with(BrokenModule)
        .with(BrokenModule)
        .build()
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RegistryDuplicateModule);
}

// ============================================
// Report store
// ============================================

#[test]
fn test_payment_unlocks_premium_view() {
    let store = ReportStore::new();
    let user = "0x2222222222222222222222222222222222222222";

    assert!(store.view(ADDRESS, Some(user)).is_err());
    assert!(store.mark_paid(ADDRESS, Some(user), "0xabc").is_err());

    let stored = store.insert(ADDRESS, audit(TOKEN));
    let record = store.record_access(ADDRESS, Some(user), stored.risk_score);
    assert!(!record.is_paid);

    let free = store.view(ADDRESS, Some(user)).unwrap();
    assert!(free.premium_report.is_none());
    assert!(!free.is_paid);
    assert!(free.free_report.basic_vulnerabilities.len() <= 3);

    let paid = store.mark_paid(ADDRESS, Some(user), "0xabc").unwrap();
    assert!(paid.is_paid);
    assert_eq!(paid.audit_id, record.audit_id);
    assert_eq!(paid.payment_tx_hash.as_deref(), Some("0xabc"));

    let full = store.view(ADDRESS, Some(user)).unwrap();
    assert!(full.is_paid);
    assert!(full.premium_report.is_some());

    // payment is per viewer
    let other = store.view(ADDRESS, None).unwrap();
    assert!(other.premium_report.is_none());

    assert_eq!(store.user_history(user).len(), 1);
}

#[test]
fn test_first_stored_report_wins() {
    let store = ReportStore::new();
    let first = store.insert(ADDRESS, audit(TOKEN));
    let second = store.insert(ADDRESS, audit(""));
    assert_eq!(first.risk_score, second.risk_score);
    assert_eq!(first.summary, second.summary);
    assert_eq!(store.stats().reports, 1);
}
