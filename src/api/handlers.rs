//! API Request Handlers

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::middleware::RateLimiter;
use super::types::*;
use crate::core::aggregator::Aggregator;
use crate::models::{AppError, AuditInput, ServerConfig};
use crate::utils::cache::ReportStore;
use crate::utils::constants::{parse_address, parse_tx_hash, APP_VERSION};

/// Shared application state
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub store: Arc<ReportStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub chain_intel: &'static str,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(aggregator: Arc<Aggregator>, chain_intel: &'static str, server: &ServerConfig) -> Self {
        Self {
            aggregator,
            store: Arc::new(ReportStore::new()),
            rate_limiter: Arc::new(RateLimiter::per_minute(server.rate_limit_per_minute)),
            chain_intel,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

type ApiFailure = (StatusCode, Json<ApiResponse<()>>);

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn fail(err: AppError, start: Instant) -> ApiFailure {
    let status = StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!(code = err.code_str(), "❌ request failed: {}", err);
    }
    (status, Json(ApiResponse::error(ApiError::from(&err), elapsed_ms(start))))
}

fn validate_user(user_address: Option<&str>) -> Result<(), AppError> {
    if let Some(user) = user_address {
        parse_address(user)?;
    }
    Ok(())
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: APP_VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Registry
// ============================================

pub async fn list_modules(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ModulesData>> {
    let start = Instant::now();
    let modules: Vec<ModuleInfo> = state
        .aggregator
        .registry()
        .descriptors()
        .into_iter()
        .map(ModuleInfo::from)
        .collect();

    Json(ApiResponse::success(
        ModulesData {
            total: modules.len(),
            modules,
        },
        elapsed_ms(start),
    ))
}

// ============================================
// Audit
// ============================================

/// Run (or reuse) an audit. Stored content is never recomputed.
pub async fn run_audit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AuditRequest>,
) -> Result<Json<ApiResponse<AuditData>>, ApiFailure> {
    let start = Instant::now();

    parse_address(&req.contract_address).map_err(|e| fail(e, start))?;
    validate_user(req.user_address.as_deref()).map_err(|e| fail(e, start))?;

    let (report, cached) = match state.store.get(&req.contract_address) {
        Some(report) => (report, true),
        None => {
            let mut input = AuditInput::new(req.source_code, req.contract_address.clone());
            if let Some(bytecode) = req.bytecode {
                input = input.with_bytecode(bytecode);
            }
            let report = state.aggregator.run_all_concurrent(Arc::new(input)).await;
            (state.store.insert(&req.contract_address, report), false)
        }
    };

    let record = state
        .store
        .record_access(&req.contract_address, req.user_address.as_deref(), report.risk_score);

    info!(
        contract = %req.contract_address,
        cached,
        paid = record.is_paid,
        "📝 Audit served: score {}",
        report.risk_score
    );

    Ok(Json(ApiResponse::success(
        AuditData {
            audit_id: record.audit_id.to_string(),
            cached,
            report: report.view(record.is_paid),
        },
        elapsed_ms(start),
    )))
}

pub async fn get_audit(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(viewer): Query<ViewerQuery>,
) -> Result<Json<ApiResponse<AuditData>>, ApiFailure> {
    let start = Instant::now();

    parse_address(&address).map_err(|e| fail(e, start))?;
    validate_user(viewer.user_address.as_deref()).map_err(|e| fail(e, start))?;

    let report = state
        .store
        .view(&address, viewer.user_address.as_deref())
        .map_err(|e| fail(e, start))?;
    let record = state
        .store
        .record_access(&address, viewer.user_address.as_deref(), report.risk_score);

    Ok(Json(ApiResponse::success(
        AuditData {
            audit_id: record.audit_id.to_string(),
            cached: true,
            report,
        },
        elapsed_ms(start),
    )))
}

pub async fn record_payment(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<ApiResponse<PaymentData>>, ApiFailure> {
    let start = Instant::now();

    parse_address(&address).map_err(|e| fail(e, start))?;
    validate_user(req.user_address.as_deref()).map_err(|e| fail(e, start))?;
    parse_tx_hash(&req.tx_hash).map_err(|e| fail(e, start))?;

    let record = state
        .store
        .mark_paid(&address, req.user_address.as_deref(), &req.tx_hash)
        .map_err(|e| fail(e, start))?;
    let report = state
        .store
        .view(&address, req.user_address.as_deref())
        .map_err(|e| fail(e, start))?;

    Ok(Json(ApiResponse::success(
        PaymentData { record, report },
        elapsed_ms(start),
    )))
}

pub async fn user_history(
    State(state): State<Arc<AppState>>,
    Path(user_address): Path<String>,
) -> Result<Json<ApiResponse<UserHistoryData>>, ApiFailure> {
    let start = Instant::now();
    parse_address(&user_address).map_err(|e| fail(e, start))?;

    let audits = state.store.user_history(&user_address);
    Ok(Json(ApiResponse::success(
        UserHistoryData {
            user_address,
            audits,
        },
        elapsed_ms(start),
    )))
}

// ============================================
// Stats
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();
    let store = state.store.stats();

    info!(
        "📊 Store Stats: {} reports, {:.1}% hit rate ({} hits / {} misses)",
        store.reports, store.hit_rate, store.hits, store.misses
    );

    let data = StatsData {
        store,
        modules: state.aggregator.registry().len(),
        chain_intel: state.chain_intel.to_string(),
        uptime_seconds: state.uptime_seconds(),
        api_version: APP_VERSION.to_string(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}
