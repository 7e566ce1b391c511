//! API Request/Response Types

use serde::{Deserialize, Serialize};

use crate::models::{AppError, AuditReport, ModuleDescriptor};
use crate::utils::cache::{AuditRecord, StoreStats};

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "API_BAD_REQUEST".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: "API_RATE_LIMITED".to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "API_INTERNAL_ERROR".to_string(),
            message: message.into(),
            details: None,
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            details: None,
        }
    }
}

// ============================================
// Audit
// ============================================

#[derive(Debug, Deserialize)]
pub struct AuditRequest {
    pub contract_address: String,
    pub source_code: String,
    #[serde(default)]
    pub bytecode: Option<String>,
    #[serde(default)]
    pub user_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewerQuery {
    #[serde(default)]
    pub user_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    #[serde(default)]
    pub user_address: Option<String>,
    pub tx_hash: String,
}

#[derive(Debug, Serialize)]
pub struct AuditData {
    pub audit_id: String,
    /// Served from the store rather than a fresh sweep
    pub cached: bool,
    pub report: AuditReport,
}

#[derive(Debug, Serialize)]
pub struct PaymentData {
    pub record: AuditRecord,
    pub report: AuditReport,
}

#[derive(Debug, Serialize)]
pub struct UserHistoryData {
    pub user_address: String,
    pub audits: Vec<AuditRecord>,
}

// ============================================
// Registry
// ============================================

#[derive(Debug, Serialize)]
pub struct ModuleInfo {
    pub id: String,
    pub name: String,
    pub category: String,
    pub severity: String,
    pub description: String,
}

impl From<ModuleDescriptor> for ModuleInfo {
    fn from(d: ModuleDescriptor) -> Self {
        Self {
            id: d.id.to_string(),
            name: d.name.to_string(),
            category: d.category.as_str().to_string(),
            severity: d.severity.as_str().to_string(),
            description: d.description.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModulesData {
    pub total: usize,
    pub modules: Vec<ModuleInfo>,
}

// ============================================
// Stats
// ============================================

#[derive(Debug, Serialize)]
pub struct StatsData {
    pub store: StoreStats,
    pub modules: usize,
    pub chain_intel: String,
    pub uptime_seconds: u64,
    pub api_version: String,
}

// ============================================
// Health Check
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}
