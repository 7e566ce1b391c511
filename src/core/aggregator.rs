//! Audit Aggregator
//!
//! Runs every registered module over one input and folds the results into
//! the derived report numbers. A module that errors or panics is replaced by
//! a synthetic failed result; the sweep itself never fails.
//!
//! Two sweeps share the same aggregation:
//! - `run_all`: sequential, registry order
//! - `run_all_concurrent`: blocking tasks bounded by a semaphore, joined in
//!   registry order

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::core::modules::AnalysisModule;
use crate::core::registry::ModuleRegistry;
use crate::core::report;
use crate::models::{
    AppError, AuditConfig, AuditInput, AuditReport, GasOptimization, Issue, ModuleDescriptor,
    ModuleResult, RiskAssessment, SecurityCategories, SecurityScore, Severity, SeverityBreakdown,
};
use crate::utils::constants::{
    BREAKDOWN_TOP_ISSUES, MAX_RISK_FACTORS, MISSING_MODULE_SCORE, MODULE_ACCESS_CONTROL,
    MODULE_ECONOMIC_ATTACK, MODULE_ERROR_KIND, MODULE_GAS_OPTIMIZATION, MODULE_RUG_PULL,
    SECURITY_SCORE_MODULES, TECHNICAL_RISK_MODULES,
};

// ============================================
// SWEEPS
// ============================================

#[derive(Debug, Clone)]
pub struct Aggregator {
    registry: Arc<ModuleRegistry>,
    max_concurrent_modules: usize,
}

impl Aggregator {
    pub fn new(registry: Arc<ModuleRegistry>, config: &AuditConfig) -> Self {
        Self {
            registry,
            max_concurrent_modules: config.max_concurrent_modules.max(1),
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Sequential sweep
    pub fn run_all(&self, input: &AuditInput) -> AuditReport {
        let start = Instant::now();
        info!(
            "🔍 Audit sweep started: {} ({} modules)",
            input.contract_address,
            self.registry.len()
        );

        let results: Vec<ModuleResult> = self
            .registry
            .modules()
            .iter()
            .map(|m| run_module(m.as_ref(), input))
            .collect();

        self.finish(input, results, start)
    }

    /// Concurrent sweep; output order is still registry order
    pub async fn run_all_concurrent(&self, input: Arc<AuditInput>) -> AuditReport {
        let start = Instant::now();
        info!(
            "🔍 Concurrent audit sweep started: {} ({} modules, max {} in parallel)",
            input.contract_address,
            self.registry.len(),
            self.max_concurrent_modules
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_modules));
        let mut handles = Vec::with_capacity(self.registry.len());

        for module in self.registry.modules() {
            let permit = Arc::clone(&semaphore).acquire_owned().await.ok();
            let module = Arc::clone(module);
            let input = Arc::clone(&input);
            let descriptor = module.descriptor();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                run_module(module.as_ref(), &input)
            });
            handles.push((descriptor, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (descriptor, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let err = AppError::module_panicked(descriptor.id, e.to_string());
                    warn!(module = %descriptor.id, code = err.code_str(), "❌ module task lost: {}", err);
                    failure_result(&descriptor, &err.message)
                }
            };
            results.push(result);
        }

        self.finish(&input, results, start)
    }

    fn finish(&self, input: &AuditInput, results: Vec<ModuleResult>, start: Instant) -> AuditReport {
        let aggregation = Aggregation::compute(&results);
        let report = report::assemble(input, results, aggregation, self.registry.len());
        info!(
            "✅ Audit sweep complete: {} | score {} | {} issues | {}ms",
            input.contract_address,
            report.risk_score,
            report.issue_count.total(),
            start.elapsed().as_millis()
        );
        report
    }
}

/// Run one module, substituting a failed result on error or panic
pub fn run_module(module: &dyn AnalysisModule, input: &AuditInput) -> ModuleResult {
    let descriptor = module.descriptor();
    let outcome = catch_unwind(AssertUnwindSafe(|| module.analyze(input)));

    match outcome {
        Ok(Ok(result)) => {
            debug!(
                module = %descriptor.id,
                score = result.score,
                issues = result.issues.len(),
                "{} module finished",
                result.risk_level.emoji()
            );
            result
        }
        Ok(Err(e)) => {
            warn!(module = %descriptor.id, code = e.code_str(), "❌ module failed: {}", e);
            failure_result(&descriptor, &e.message)
        }
        Err(payload) => {
            let err = AppError::module_panicked(descriptor.id, panic_message(payload.as_ref()));
            warn!(module = %descriptor.id, code = err.code_str(), "❌ module panicked: {}", err);
            failure_result(&descriptor, &err.message)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Synthetic result for a module that could not complete
pub fn failure_result(descriptor: &ModuleDescriptor, reason: &str) -> ModuleResult {
    ModuleResult {
        module_id: descriptor.id.to_string(),
        module_name: descriptor.name.to_string(),
        category: descriptor.category,
        score: 0,
        passed: false,
        issues: vec![Issue::new(
            MODULE_ERROR_KIND,
            Severity::High,
            format!("Module analysis failed: {}", reason),
        )
        .with_fix("Manual review required")],
        recommendations: vec!["Manual security review recommended".to_string()],
        risk_level: Severity::High,
        details: "Module failed to complete analysis".to_string(),
        gas_impact_estimate: None,
        risk_accumulator: None,
    }
}

// ============================================
// AGGREGATION
// ============================================

/// Everything derived from the module results; read-only over them
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub severity_breakdown: SeverityBreakdown,
    pub gas_optimization: GasOptimization,
    pub security_score: SecurityScore,
    pub risk_assessment: RiskAssessment,
    pub risk_score: u8,
}

impl Aggregation {
    pub fn compute(results: &[ModuleResult]) -> Self {
        Self {
            severity_breakdown: severity_breakdown(results),
            gas_optimization: gas_summary(results),
            security_score: security_score(results),
            risk_assessment: risk_assessment(results),
            risk_score: overall_score(results),
        }
    }
}

fn mean_rounded(values: &[u8]) -> u8 {
    if values.is_empty() {
        return 0;
    }
    let sum: u32 = values.iter().map(|v| u32::from(*v)).sum();
    (f64::from(sum) / values.len() as f64).round() as u8
}

/// Score of a module, or the neutral default when the registry lacks it
pub fn module_score(results: &[ModuleResult], module_id: &str) -> u8 {
    results
        .iter()
        .find(|r| r.module_id == module_id)
        .map_or(MISSING_MODULE_SCORE, |r| r.score)
}

/// One pass over every issue
pub fn severity_breakdown(results: &[ModuleResult]) -> SeverityBreakdown {
    let mut breakdown = SeverityBreakdown::default();
    for result in results {
        for issue in &result.issues {
            let bucket = breakdown.bucket_mut(issue.severity);
            bucket.count += 1;
            if !bucket.modules.contains(&result.module_name) {
                bucket.modules.push(result.module_name.clone());
            }
            if bucket.top_issues.len() < BREAKDOWN_TOP_ISSUES {
                bucket.top_issues.push(issue.description.clone());
            }
        }
    }
    breakdown
}

pub fn gas_summary(results: &[ModuleResult]) -> GasOptimization {
    let Some(gas) = results.iter().find(|r| r.module_id == MODULE_GAS_OPTIMIZATION) else {
        return GasOptimization::default();
    };
    GasOptimization {
        total_optimizations: gas.issues.len(),
        estimated_savings: gas.gas_impact_estimate.unwrap_or(0),
        critical_optimizations: gas
            .issues
            .iter()
            .filter(|i| i.severity >= Severity::High)
            .map(|i| i.description.clone())
            .collect(),
        recommendations: gas.recommendations.clone(),
    }
}

pub fn security_score(results: &[ModuleResult]) -> SecurityScore {
    let [access_control, reentrancy, arithmetic, oracle, governance, economics] =
        SECURITY_SCORE_MODULES.map(|id| module_score(results, id));
    let categories = SecurityCategories {
        access_control,
        reentrancy,
        arithmetic,
        oracle,
        governance,
        economics,
    };
    SecurityScore {
        overall: mean_rounded(&[access_control, reentrancy, arithmetic, oracle, governance, economics]),
        categories,
    }
}

pub fn risk_assessment(results: &[ModuleResult]) -> RiskAssessment {
    let inverse = |id: &str| 100 - module_score(results, id);

    let rug_pull_risk = inverse(MODULE_RUG_PULL);
    let centralized_risk = inverse(MODULE_ACCESS_CONTROL);
    let economic_risk = inverse(MODULE_ECONOMIC_ATTACK);
    let technical_risk = 100 - mean_rounded(&TECHNICAL_RISK_MODULES.map(|id| module_score(results, id)));

    let combined = f64::from(
        u32::from(rug_pull_risk)
            + u32::from(centralized_risk)
            + u32::from(technical_risk)
            + u32::from(economic_risk),
    ) / 4.0;
    let overall_risk = if combined >= 75.0 {
        Severity::Critical
    } else if combined >= 50.0 {
        Severity::High
    } else if combined >= 25.0 {
        Severity::Medium
    } else {
        Severity::Low
    };

    let risk_factors = results
        .iter()
        .flat_map(|r| {
            r.issues
                .iter()
                .filter(|i| i.severity >= Severity::High)
                .map(move |i| format!("{}: {}", r.module_name, i.description))
        })
        .take(MAX_RISK_FACTORS)
        .collect();

    RiskAssessment {
        rug_pull_risk,
        centralized_risk,
        technical_risk,
        economic_risk,
        overall_risk,
        risk_factors,
    }
}

/// Rounded mean module score; 0 for an empty sweep
pub fn overall_score(results: &[ModuleResult]) -> u8 {
    let scores: Vec<u8> = results.iter().map(|r| r.score).collect();
    mean_rounded(&scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::modules::{GasOptimizationModule, ReentrancyModule, TxOriginModule};
    use crate::models::{AppResult, ModuleCategory};

    struct FailingModule;

    impl AnalysisModule for FailingModule {
        fn descriptor(&self) -> ModuleDescriptor {
            ModuleDescriptor {
                id: "failing",
                name: "Failing Module",
                category: ModuleCategory::Analysis,
                severity: Severity::Low,
                description: "always errors",
            }
        }

        fn analyze(&self, _input: &AuditInput) -> AppResult<ModuleResult> {
            Err(AppError::module_failed("synthetic failure"))
        }
    }

    struct PanickingModule;

    impl AnalysisModule for PanickingModule {
        fn descriptor(&self) -> ModuleDescriptor {
            ModuleDescriptor {
                id: "panicking",
                name: "Panicking Module",
                category: ModuleCategory::Analysis,
                severity: Severity::Low,
                description: "always panics",
            }
        }

        fn analyze(&self, _input: &AuditInput) -> AppResult<ModuleResult> {
            panic!("boom")
        }
    }

    fn aggregator(registry: ModuleRegistry) -> Aggregator {
        Aggregator::new(Arc::new(registry), &AuditConfig::default())
    }

    fn result(id: &str, score: u8, issues: Vec<Issue>) -> ModuleResult {
        ModuleResult {
            module_id: id.to_string(),
            module_name: id.to_uppercase(),
            category: ModuleCategory::Security,
            score,
            passed: true,
            issues,
            recommendations: vec![],
            risk_level: Severity::Low,
            details: String::new(),
            gas_impact_estimate: None,
            risk_accumulator: None,
        }
    }

    #[test]
    fn test_error_is_substituted() {
        let out = run_module(&FailingModule, &AuditInput::default());
        assert_eq!(out.score, 0);
        assert!(!out.passed);
        assert_eq!(out.risk_level, Severity::High);
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].kind, MODULE_ERROR_KIND);
        assert_eq!(out.issues[0].description, "Module analysis failed: synthetic failure");
        assert_eq!(out.recommendations, vec!["Manual security review recommended".to_string()]);
    }

    #[test]
    fn test_panic_is_substituted() {
        let out = run_module(&PanickingModule, &AuditInput::default());
        assert_eq!(out.score, 0);
        assert_eq!(out.issues[0].description, "Module analysis failed: panicking panicked: boom");
    }

    #[test]
    fn test_failing_module_does_not_affect_others() {
        let registry = ModuleRegistry::builder()
            .with(TxOriginModule)
            .with(FailingModule)
            .with(GasOptimizationModule)
            .build()
            .unwrap();
        let report = aggregator(registry).run_all(&AuditInput::new("", "0x0"));
        let premium = report.premium_report.unwrap();
        let scores: Vec<u8> = premium.module_results.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![100, 0, 100]);
        assert_eq!(report.risk_score, 67);
        assert_eq!(report.issue_count.high, 1);
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let registry = ModuleRegistry::builder()
            .with(ReentrancyModule)
            .with(PanickingModule)
            .with(GasOptimizationModule)
            .with(TxOriginModule)
            .build()
            .unwrap();
        let agg = aggregator(registry);
        let input = AuditInput::new(
            "function f() external { msg.sender.call{value: 1}(\"\"); for (uint i = 0; i < a.length; i++) {} require(tx.origin == owner); }",
            "0x0",
        );
        let sequential = agg.run_all(&input);
        let concurrent = agg.run_all_concurrent(Arc::new(input)).await;
        assert_eq!(sequential.premium_report, concurrent.premium_report);
        assert_eq!(sequential.risk_score, concurrent.risk_score);
    }

    #[test]
    fn test_breakdown_counts_every_issue() {
        let results = vec![
            result("a", 80, vec![
                Issue::new("x", Severity::Critical, "c1"),
                Issue::new("x", Severity::Low, "l1"),
            ]),
            result("b", 90, vec![Issue::new("x", Severity::Critical, "c2")]),
        ];
        let breakdown = severity_breakdown(&results);
        assert_eq!(breakdown.total(), 3);
        assert_eq!(breakdown.critical.count, 2);
        assert_eq!(breakdown.critical.modules, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(breakdown.critical.top_issues, vec!["c1".to_string(), "c2".to_string()]);
    }

    #[test]
    fn test_breakdown_top_issues_capped() {
        let issues = (0..8).map(|i| Issue::new("x", Severity::Medium, format!("m{}", i))).collect();
        let breakdown = severity_breakdown(&[result("a", 50, issues)]);
        assert_eq!(breakdown.medium.count, 8);
        assert_eq!(breakdown.medium.top_issues.len(), 5);
        assert_eq!(breakdown.medium.modules.len(), 1);
    }

    #[test]
    fn test_missing_modules_default_to_fifty() {
        let score = security_score(&[]);
        assert_eq!(score.overall, 50);
        assert_eq!(score.categories.oracle, 50);

        let risk = risk_assessment(&[]);
        assert_eq!(risk.rug_pull_risk, 50);
        assert_eq!(risk.technical_risk, 50);
        assert_eq!(risk.overall_risk, Severity::High);
        assert!(risk.risk_factors.is_empty());
    }

    #[test]
    fn test_overall_score_is_rounded_mean() {
        assert_eq!(overall_score(&[]), 0);
        let results = vec![result("a", 100, vec![]), result("b", 55, vec![])];
        assert_eq!(overall_score(&results), 78);
    }

    #[test]
    fn test_security_overall_rounds_half_up() {
        let mut results: Vec<ModuleResult> = SECURITY_SCORE_MODULES
            .iter()
            .map(|id| result(id, 100, vec![]))
            .collect();
        results[5].score = 25;
        let security = security_score(&results);
        assert_eq!(security.categories.economics, 25);
        // 525 / 6 = 87.5
        assert_eq!(security.overall, 88);
    }

    #[test]
    fn test_risk_factors_capped_at_ten() {
        let issues = (0..15).map(|i| Issue::new("x", Severity::High, format!("h{}", i))).collect();
        let risk = risk_assessment(&[result(MODULE_ACCESS_CONTROL, 40, issues)]);
        assert_eq!(risk.risk_factors.len(), 10);
        assert_eq!(risk.risk_factors[0], "ACCESS-CONTROL: h0");
        assert_eq!(risk.centralized_risk, 60);
    }

    #[test]
    fn test_gas_summary_absent_module() {
        assert_eq!(gas_summary(&[]), GasOptimization::default());
    }
}
