//! Contract Guard CLI
//!
//! Audits a Solidity file from disk and prints the report.
//!
//! Usage:
//!   contract_guard Token.sol --address 0x... [--bytecode code.hex] [--json] [--free]
//!
//! Environment:
//!   CG_CHAIN_INTEL            - none | simulated (default: none)
//!   CG_MAX_CONCURRENT_MODULES - parallel modules per sweep (default: 8)
//!   RUST_LOG                  - log filter (default: warn), logs go to stderr

use clap::Parser;
use contract_guard::utils::constants::{parse_address, APP_NAME, APP_VERSION};
use contract_guard::{intel_for, Aggregator, AuditConfig, AuditInput, AuditReport, IntelMode, ModuleRegistry};
use eyre::{Result, WrapErr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

#[derive(Parser, Debug)]
#[command(name = "contract_guard")]
#[command(about = "Heuristic smart-contract audit", long_about = None)]
#[command(version)]
struct Cli {
    /// Solidity source file
    source: PathBuf,

    /// File containing deployed bytecode as hex
    #[arg(long)]
    bytecode: Option<PathBuf>,

    /// Contract address recorded in the report
    #[arg(long, default_value = ZERO_ADDRESS)]
    address: String,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Show only the free view
    #[arg(long)]
    free: bool,

    /// Chain intelligence source (overrides CG_CHAIN_INTEL)
    #[arg(long = "chain-intel")]
    chain_intel: Option<IntelMode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    parse_address(&cli.address)?;
    let source = std::fs::read_to_string(&cli.source)
        .wrap_err_with(|| format!("reading {}", cli.source.display()))?;
    let mut input = AuditInput::new(source, cli.address.clone());
    if let Some(path) = &cli.bytecode {
        let bytecode = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading {}", path.display()))?;
        input = input.with_bytecode(bytecode.trim());
    }

    let mut config = AuditConfig::from_env()?;
    if let Some(mode) = cli.chain_intel {
        config.intel_mode = mode;
    }

    let registry = Arc::new(ModuleRegistry::standard(intel_for(config.intel_mode)));
    let aggregator = Aggregator::new(registry, &config);
    let report = aggregator.run_all_concurrent(Arc::new(input)).await.view(!cli.free);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &AuditReport) {
    let counts = &report.issue_count;
    println!("{} v{} audit: {}", APP_NAME, APP_VERSION, report.contract_address);
    println!("  Compiler:   {}", report.contract_info.compiler);
    println!(
        "  Score:      {}/100 ({} {})",
        report.risk_score,
        report.free_report.risk_level.emoji(),
        report.free_report.risk_level
    );
    println!(
        "  Issues:     {} critical, {} high, {} medium, {} low, {} info",
        counts.critical, counts.high, counts.medium, counts.low, counts.informational
    );
    println!("  {}", report.summary);

    for vulnerability in &report.free_report.basic_vulnerabilities {
        println!("  💀 {}", vulnerability);
    }

    let Some(premium) = &report.premium_report else {
        println!("\n  Premium view hidden (--free)");
        return;
    };

    println!("\n  Modules:");
    for result in &premium.module_results {
        println!(
            "    {} {:<45} {:>3}/100 {:>3} issues{}",
            if result.passed { "✅" } else { "❌" },
            result.module_name,
            result.score,
            result.issues.len(),
            result
                .risk_accumulator
                .map(|r| format!(" (risk {})", r))
                .unwrap_or_default()
        );
    }

    let risk = &premium.risk_assessment;
    println!(
        "\n  Risk: {} (rug pull {}, centralization {}, technical {}, economic {})",
        risk.overall_risk, risk.rug_pull_risk, risk.centralized_risk, risk.technical_risk, risk.economic_risk
    );
    for factor in &risk.risk_factors {
        println!("    - {}", factor);
    }
    for (label, list) in [
        ("Honeypot", &premium.honeypot_risks),
        ("Backdoor", &premium.backdoor_risks),
        ("Spyware", &premium.spyware_risks),
    ] {
        if !list.is_empty() {
            println!("  {} signals: {}", label, list.join("; "));
        }
    }
}
