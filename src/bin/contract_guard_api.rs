//! Contract Guard API Server
//!
//! REST API for submitting audits and serving payment-gated reports
//!
//! Usage:
//!   cargo run --bin contract_guard_api
//!
//! Environment:
//!   PORT / CG_PORT            - Server port (default: 8080)
//!   CG_HOST                   - Server host (default: 0.0.0.0)
//!   CG_RATE_LIMIT_PER_MINUTE  - Requests per client per minute (default: 100)
//!   CG_MAX_IN_FLIGHT          - Concurrent requests (default: 64)
//!   CG_MAX_CONCURRENT_MODULES - Parallel modules per sweep (default: 8)
//!   CG_CHAIN_INTEL            - none | simulated (default: none)
//!   RUST_LOG                  - Log filter (default: info)

use contract_guard::api::{create_router, start_cleanup_task, AppState};
use contract_guard::utils::constants::{APP_NAME, APP_VERSION};
use contract_guard::{intel_for, Aggregator, AuditConfig, ModuleRegistry, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let audit_config = AuditConfig::from_env()?;
    let server_config = ServerConfig::from_env()?;

    let intel = intel_for(audit_config.intel_mode);
    let chain_intel = intel.name();
    let registry = Arc::new(ModuleRegistry::standard(intel));
    let aggregator = Arc::new(Aggregator::new(registry, &audit_config));

    let state = Arc::new(AppState::new(aggregator, chain_intel, &server_config));

    start_cleanup_task(Arc::clone(&state.rate_limiter));
    info!("🧹 Background cleanup task started");

    let app = create_router(Arc::clone(&state), server_config.max_in_flight);
    let addr: SocketAddr = server_config.bind_addr().parse()?;

    info!("🚀 {} API v{} starting on http://{}", APP_NAME, APP_VERSION, addr);
    info!("Endpoints:");
    info!("  POST /v1/audit                          - Run or reuse an audit");
    info!("  GET  /v1/audit/:address                 - Stored report (redacted unless paid)");
    info!("  POST /v1/audit/:address/payment         - Record payment, unlock premium view");
    info!("  GET  /v1/audits/user/:user_address      - Audit history for a user");
    info!("  GET  /v1/modules                        - Registered analysis modules");
    info!("  GET  /v1/stats                          - Store statistics");
    info!("  GET  /v1/health                         - Health check");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("⚠️  Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    let stats = state.store.stats();
    info!("🛑 Shutdown signal received");
    info!("   Audits run: {}", stats.audits_run);
    info!("   Reports stored: {}", stats.reports);
    info!("   Store hit rate: {:.1}%", stats.hit_rate);
    info!("👋 {} API shutdown complete", APP_NAME);

    Ok(())
}
