//! Code quality modules: gas optimization and event emission

use tracing::debug;

use crate::core::modules::AnalysisModule;
use crate::core::rules::{self, MatchMode, PatternRule};
use crate::core::scorecard::{PassPolicy, ScoreCard};
use crate::models::{AppResult, AuditInput, Issue, ModuleCategory, ModuleDescriptor, ModuleResult, Severity};
use crate::utils::constants::{GAS_PER_OPTIMIZATION, MODULE_EVENT_EMISSION, MODULE_GAS_OPTIMIZATION};
use crate::utils::source::function_spans;

// ============================================
// GAS OPTIMIZATION
// ============================================

const GAS_KIND: &str = "gas-optimization";
const POST_INCREMENT_FIX: &str = "Use pre-increment (++i) instead of post-increment (i++)";

const GAS_RULES: [PatternRule; 5] = [
    PatternRule {
        kind: GAS_KIND,
        pattern: r"for\s*\([^)]*;\s*[^;]*\.length\s*;",
        severity: Severity::Medium,
        penalty: 10,
        description: "Loop with array.length in condition",
        fix: "Cache array length in a local variable before the loop",
        mode: MatchMode::EachMatch,
    },
    PatternRule {
        kind: GAS_KIND,
        pattern: r"storage\s+\w+\[\]\s+\w+",
        severity: Severity::High,
        penalty: 15,
        description: "Dynamic storage array usage",
        fix: "",
        mode: MatchMode::EachMatch,
    },
    PatternRule {
        kind: GAS_KIND,
        pattern: r#"string\s+memory\s+\w+\s*=\s*"""#,
        severity: Severity::Low,
        penalty: 5,
        description: "Empty string initialization",
        fix: "",
        mode: MatchMode::EachMatch,
    },
    PatternRule {
        kind: GAS_KIND,
        pattern: r"\+\+\w+",
        severity: Severity::Info,
        penalty: 0,
        description: "Pre-increment usage (good)",
        fix: "",
        mode: MatchMode::EachMatch,
    },
    PatternRule {
        kind: GAS_KIND,
        pattern: r"\w+\+\+",
        severity: Severity::Low,
        penalty: 5,
        description: "Post-increment usage (less efficient)",
        fix: POST_INCREMENT_FIX,
        mode: MatchMode::EachMatch,
    },
];

const GAS_RECOMMENDATIONS: [&str; 5] = [
    POST_INCREMENT_FIX,
    "Cache array length in loops",
    "Pack struct variables efficiently",
    "Use immutable for constants",
    "Consider using bytes32 instead of string for fixed-length data",
];

/// Flags expensive loop, storage and increment patterns
pub struct GasOptimizationModule;

impl AnalysisModule for GasOptimizationModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_GAS_OPTIMIZATION,
            name: "Gas Optimization Analysis",
            category: ModuleCategory::Performance,
            severity: Severity::Medium,
            description: "Analyzes functions for expensive operations and gas optimization opportunities",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());

        for rule in &GAS_RULES {
            card.apply(rule, source);
        }

        // Struct packing only matters when structs live in mappings
        if source.contains("mapping") && source.contains("struct") {
            card.check("struct packing", |card| {
                for m in rules::find_all(r"struct\s+\w+\s*\{[^}]*\}", source)? {
                    let text = m.as_str();
                    if text.contains("uint256") && text.contains("bool") {
                        card.flag(
                            Issue::new(GAS_KIND, Severity::Medium, "Struct packing optimization possible")
                                .with_match(text)
                                .with_fix("Pack smaller types together to save storage slots"),
                            10,
                        );
                    }
                }
                Ok(())
            });
        }

        let findings = card.issues().len();
        let score = card.score();
        let level = match score {
            0..=49 => Severity::High,
            50..=69 => Severity::Medium,
            _ => Severity::Low,
        };
        debug!(findings, score, "⛽ gas analysis");

        let mut result = card.finish(
            PassPolicy::MinScore(70),
            level,
            &GAS_RECOMMENDATIONS,
            format!("Gas optimization analysis found {} potential improvements", findings),
        );
        result.gas_impact_estimate = Some(findings as u64 * GAS_PER_OPTIMIZATION);
        Ok(result)
    }
}

// ============================================
// EVENT EMISSION
// ============================================

/// Administrative setters that change state without emitting an event
pub struct EventEmissionModule;

impl AnalysisModule for EventEmissionModule {
    fn descriptor(&self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: MODULE_EVENT_EMISSION,
            name: "Event Emission Review",
            category: ModuleCategory::CodeQuality,
            severity: Severity::Low,
            description: "Checks that state-changing administrative functions emit events",
        }
    }

    fn analyze(&self, input: &AuditInput) -> AppResult<ModuleResult> {
        let source = input.source();
        let mut card = ScoreCard::new(self.descriptor());
        let mut setters = 0usize;

        card.check("silent setter", |card| {
            for span in function_spans(source) {
                if span.body.is_empty() || !rules::is_match(r"^(?:set|update|change)[A-Z_]", span.name)? {
                    continue;
                }
                setters += 1;
                if !span.body.contains("emit ") {
                    card.flag(
                        Issue::new(
                            "event-emission",
                            Severity::Low,
                            format!("State change without event emission: {}", span.name),
                        )
                        .with_location(span.header.trim())
                        .with_fix("Emit an event for every administrative state change"),
                        5,
                    );
                }
            }
            Ok(())
        });

        let level = card.worst_or_low();
        let silent = card.issues().len();
        Ok(card.finish(
            PassPolicy::Always,
            level,
            &[
                "Emit events for all administrative state changes",
                "Index key event parameters for off-chain monitoring",
                "Include old and new values in parameter-change events",
            ],
            format!("Checked {} setter functions, {} without events", setters, silent),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gas_post_increment() {
        let input = AuditInput::new("for (uint i = 0; i < n; i++) { total += 1; }", "0x0");
        let result = GasOptimizationModule.analyze(&input).unwrap();
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].description, "Post-increment usage (less efficient)");
        assert_eq!(result.issues[0].suggested_fix.as_deref(), Some(POST_INCREMENT_FIX));
        assert_eq!(result.score, 95);
        assert_eq!(result.gas_impact_estimate, Some(1000));
        assert!(result.passed);
    }

    #[test]
    fn test_gas_length_loop_and_struct_packing() {
        let src = r#"
            struct User { uint256 balance; bool active; }
            mapping(address => User) users;
            function f() public { for (uint i = 0; i < arr.length; ++i) {} }
        "#;
        let result = GasOptimizationModule.analyze(&AuditInput::new(src, "0x0")).unwrap();
        let descriptions: Vec<_> = result.issues.iter().map(|i| i.description.as_str()).collect();
        assert!(descriptions.contains(&"Loop with array.length in condition"));
        assert!(descriptions.contains(&"Pre-increment usage (good)"));
        assert!(descriptions.contains(&"Struct packing optimization possible"));
        // -10 loop, -10 packing, pre-increment is free
        assert_eq!(result.score, 80);
    }

    #[test]
    fn test_gas_many_findings_fail() {
        let src = "a++; b++; c++; d++; e++; f++; g++;";
        let result = GasOptimizationModule.analyze(&AuditInput::new(src, "0x0")).unwrap();
        assert_eq!(result.score, 65);
        assert!(!result.passed);
        assert_eq!(result.risk_level, Severity::Medium);
    }

    #[test]
    fn test_event_emission() {
        let src = r#"
            function setFee(uint256 f) external onlyOwner { fee = f; }
            function setOwner(address o) external onlyOwner { owner = o; emit OwnerSet(o); }
            function settle() external { }
        "#;
        let result = EventEmissionModule.analyze(&AuditInput::new(src, "0x0")).unwrap();
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].description, "State change without event emission: setFee");
        assert_eq!(result.score, 95);
        assert!(result.passed);
    }
}
