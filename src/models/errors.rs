//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so it can be traced in logs.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - RULE_xxx: Pattern rule evaluation errors
//! - MODULE_xxx: Analysis module errors
//! - REGISTRY_xxx: Module registry errors
//! - INPUT_xxx: Audit input validation errors
//! - API_xxx: API errors
//! - CFG_xxx: Configuration errors
//! - STORE_xxx: Report store errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Rule Errors (1xx)
    // ============================================
    /// Rule pattern failed to compile
    RuleInvalidPattern,
    /// Rule evaluation failed on the given input
    RuleEvaluationFailed,

    // ============================================
    // Module Errors (2xx)
    // ============================================
    /// Module returned an error
    ModuleFailed,
    /// Module panicked during analysis
    ModulePanicked,

    // ============================================
    // Registry Errors (3xx)
    // ============================================
    /// Two modules registered with the same id
    RegistryDuplicateModule,

    // ============================================
    // Input Errors (4xx)
    // ============================================
    /// Contract or user address is not a 20-byte hex address
    InputInvalidAddress,
    /// Bytecode is not valid hex
    InputInvalidBytecode,
    /// Payment transaction hash is not a 32-byte hex hash
    InputInvalidTxHash,

    // ============================================
    // API Errors (5xx)
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Internal server error
    ApiInternalError,
    /// Resource not found
    ApiNotFound,

    // ============================================
    // Configuration Errors (6xx)
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Store Errors (7xx)
    // ============================================
    /// No stored audit for the requested key
    StoreAuditNotFound,

    // ============================================
    // Generic Errors (9xx)
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            // Rule Errors
            Self::RuleInvalidPattern => "RULE_INVALID_PATTERN",
            Self::RuleEvaluationFailed => "RULE_EVALUATION_FAILED",

            // Module Errors
            Self::ModuleFailed => "MODULE_FAILED",
            Self::ModulePanicked => "MODULE_PANICKED",

            // Registry Errors
            Self::RegistryDuplicateModule => "REGISTRY_DUPLICATE_MODULE",

            // Input Errors
            Self::InputInvalidAddress => "INPUT_INVALID_ADDRESS",
            Self::InputInvalidBytecode => "INPUT_INVALID_BYTECODE",
            Self::InputInvalidTxHash => "INPUT_INVALID_TX_HASH",

            // API Errors
            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",
            Self::ApiNotFound => "API_NOT_FOUND",

            // Configuration Errors
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            // Store Errors
            Self::StoreAuditNotFound => "STORE_AUDIT_NOT_FOUND",

            // Generic
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiBadRequest
            | Self::InputInvalidAddress
            | Self::InputInvalidBytecode
            | Self::InputInvalidTxHash
            | Self::ConfigInvalidValue => 400,
            Self::ApiNotFound | Self::StoreAuditNotFound => 404,
            Self::ApiRateLimited => 429,
            _ => 500,
        }
    }

    /// Rule and module failures degrade a single module; they never fail a sweep
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RuleInvalidPattern
                | Self::RuleEvaluationFailed
                | Self::ModuleFailed
                | Self::ModulePanicked
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Rule pattern did not compile
    pub fn invalid_pattern(pattern: &str, source: regex::Error) -> Self {
        Self::with_source(
            ErrorCode::RuleInvalidPattern,
            format!("Invalid rule pattern: {}", pattern),
            source,
        )
    }

    /// Rule evaluation failed
    pub fn rule_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RuleEvaluationFailed, msg)
    }

    /// Module analysis failed
    pub fn module_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ModuleFailed, msg)
    }

    /// Module panicked
    pub fn module_panicked(module_id: &str, msg: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModulePanicked,
            format!("{} panicked: {}", module_id, msg.into()),
        )
    }

    /// Duplicate registry id
    pub fn duplicate_module(module_id: &str) -> Self {
        Self::new(
            ErrorCode::RegistryDuplicateModule,
            format!("Module id already registered: {}", module_id),
        )
    }

    /// Invalid address
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InputInvalidAddress, msg)
    }

    /// Invalid bytecode
    pub fn invalid_bytecode(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InputInvalidBytecode, msg)
    }

    /// Invalid payment transaction hash
    pub fn invalid_tx_hash(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InputInvalidTxHash, msg)
    }

    /// Invalid configuration value
    pub fn invalid_config(key: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: {}", key, value),
        )
    }

    /// Stored audit not found
    pub fn audit_not_found(contract_address: &str) -> Self {
        Self::new(
            ErrorCode::StoreAuditNotFound,
            format!("No audit stored for {}", contract_address),
        )
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// API internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::ApiBadRequest, "JSON parse error", err)
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        Self::with_source(ErrorCode::RuleInvalidPattern, "Regex error", err)
    }
}

impl From<hex::FromHexError> for AppError {
    fn from(err: hex::FromHexError) -> Self {
        Self::with_source(ErrorCode::InputInvalidBytecode, "Hex decode error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::rule_failed("bad bytecode");
        assert_eq!(err.code, ErrorCode::RuleEvaluationFailed);
        assert_eq!(err.code_str(), "RULE_EVALUATION_FAILED");
        assert_eq!(err.to_string(), "[RULE_EVALUATION_FAILED] bad bytecode");
    }

    #[test]
    fn test_recoverable() {
        assert!(ErrorCode::RuleInvalidPattern.is_recoverable());
        assert!(ErrorCode::ModulePanicked.is_recoverable());
        assert!(!ErrorCode::InputInvalidAddress.is_recoverable());
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorCode::InputInvalidAddress.http_status(), 400);
        assert_eq!(ErrorCode::StoreAuditNotFound.http_status(), 404);
        assert_eq!(ErrorCode::ApiRateLimited.http_status(), 429);
        assert_eq!(ErrorCode::ModuleFailed.http_status(), 500);
    }

    #[test]
    fn test_hex_error_conversion() {
        let err: AppError = hex::decode("zz").unwrap_err().into();
        assert_eq!(err.code, ErrorCode::InputInvalidBytecode);
        assert!(std::error::Error::source(&err).is_some());
    }
}
