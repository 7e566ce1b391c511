//! Configuration module for Contract Guard
//!
//! Defaults live in utils/constants.rs; this file only reads the
//! environment and validates values.

use std::str::FromStr;
use tracing::{info, warn};

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    DEFAULT_HOST, DEFAULT_MAX_CONCURRENT_MODULES, DEFAULT_MAX_IN_FLIGHT, DEFAULT_PORT,
    DEFAULT_RATE_LIMIT_PER_MINUTE,
};

/// Where chain data for reputation/behaviour modules comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntelMode {
    /// No chain data; those modules report nothing
    #[default]
    None,
    /// Stable pseudo data seeded from the contract address (demo only)
    Simulated,
}

impl IntelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntelMode::None => "none",
            IntelMode::Simulated => "simulated",
        }
    }
}

impl FromStr for IntelMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "off" => Ok(IntelMode::None),
            "simulated" | "sim" => Ok(IntelMode::Simulated),
            other => Err(AppError::invalid_config("CG_CHAIN_INTEL", other)),
        }
    }
}

/// Audit engine configuration
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Upper bound on modules evaluated in parallel per sweep
    pub max_concurrent_modules: usize,
    /// Chain intelligence source
    pub intel_mode: IntelMode,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_concurrent_modules: DEFAULT_MAX_CONCURRENT_MODULES,
            intel_mode: IntelMode::None,
        }
    }
}

impl AuditConfig {
    /// Read from environment, rejecting malformed values
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("CG_MAX_CONCURRENT_MODULES") {
            config.max_concurrent_modules = parse_positive("CG_MAX_CONCURRENT_MODULES", &raw)?;
        }
        if let Ok(raw) = std::env::var("CG_CHAIN_INTEL") {
            config.intel_mode = raw.parse()?;
        }

        if config.intel_mode == IntelMode::Simulated {
            warn!("⚠️  CG_CHAIN_INTEL=simulated: reputation data is synthetic, not for production");
        }
        info!(
            "⚙️  Audit config: max_concurrent_modules={}, chain_intel={}",
            config.max_concurrent_modules,
            config.intel_mode.as_str()
        );

        Ok(config)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests per minute per client key
    pub rate_limit_per_minute: u32,
    /// Concurrent in-flight requests
    pub max_in_flight: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl ServerConfig {
    /// Read from environment. `PORT` wins over `CG_PORT` (platform convention)
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("CG_HOST") {
            if !host.trim().is_empty() {
                config.host = host;
            }
        }
        if let Some(raw) = std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("CG_PORT").ok())
        {
            config.port = raw
                .trim()
                .parse()
                .map_err(|_| AppError::invalid_config("PORT", &raw))?;
        }
        if let Ok(raw) = std::env::var("CG_RATE_LIMIT_PER_MINUTE") {
            config.rate_limit_per_minute = parse_positive("CG_RATE_LIMIT_PER_MINUTE", &raw)?;
        }
        if let Ok(raw) = std::env::var("CG_MAX_IN_FLIGHT") {
            config.max_in_flight = parse_positive("CG_MAX_IN_FLIGHT", &raw)?;
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_positive<T>(key: &str, raw: &str) -> AppResult<T>
where
    T: FromStr + PartialEq + Default,
{
    match raw.trim().parse::<T>() {
        Ok(v) if v != T::default() => Ok(v),
        _ => Err(AppError::invalid_config(key, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;

    #[test]
    fn test_intel_mode_parse() {
        assert_eq!("simulated".parse::<IntelMode>().unwrap(), IntelMode::Simulated);
        assert_eq!("NONE".parse::<IntelMode>().unwrap(), IntelMode::None);
        let err = "oracle".parse::<IntelMode>().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn test_parse_positive_rejects_zero() {
        assert!(parse_positive::<usize>("X", "0").is_err());
        assert!(parse_positive::<usize>("X", "abc").is_err());
        assert_eq!(parse_positive::<usize>("X", " 4 ").unwrap(), 4);
    }

    #[test]
    fn test_defaults() {
        let audit = AuditConfig::default();
        assert_eq!(audit.max_concurrent_modules, 8);
        assert_eq!(audit.intel_mode, IntelMode::None);

        let server = ServerConfig::default();
        assert_eq!(server.bind_addr(), "0.0.0.0:8080");
        assert_eq!(server.rate_limit_per_minute, 100);
    }
}
