use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};

use crate::env_utils::parse_bool_env;

const MAX_SEARCH_LIMIT_DEFAULT: usize = 100;

#[derive(Debug, Clone)]
pub(crate) struct AppConfig {
    pub(crate) bind: SocketAddr,
    pub(crate) request_timeout_ms: u64,
    pub(crate) max_body_bytes: usize,
    pub(crate) max_concurrency: usize,
    pub(crate) max_search_limit: usize,
    pub(crate) log_json: bool,
}

impl AppConfig {
    pub(crate) fn from_env() -> Result<Self> {
        let bind = parse_socket_addr("SEMSTORE_BIND", "127.0.0.1:8080")?;
        let request_timeout_ms = parse_u64("SEMSTORE_REQUEST_TIMEOUT_MS", 2000)?;
        let max_body_bytes = parse_usize("SEMSTORE_MAX_BODY_BYTES", 1_048_576)?;
        let max_concurrency = parse_usize("SEMSTORE_MAX_CONCURRENCY", 256)?;
        let max_search_limit =
            parse_usize("SEMSTORE_MAX_SEARCH_LIMIT", MAX_SEARCH_LIMIT_DEFAULT)?;
        let log_json = parse_bool_env("SEMSTORE_LOG_JSON", false)?;

        if request_timeout_ms == 0 {
            anyhow::bail!("SEMSTORE_REQUEST_TIMEOUT_MS must be > 0");
        }
        if max_body_bytes == 0 {
            anyhow::bail!("SEMSTORE_MAX_BODY_BYTES must be > 0");
        }
        if max_concurrency == 0 {
            anyhow::bail!("SEMSTORE_MAX_CONCURRENCY must be > 0");
        }
        if max_search_limit == 0 {
            anyhow::bail!("SEMSTORE_MAX_SEARCH_LIMIT must be > 0");
        }
        if max_search_limit > MAX_SEARCH_LIMIT_DEFAULT {
            anyhow::bail!("SEMSTORE_MAX_SEARCH_LIMIT must be <= {MAX_SEARCH_LIMIT_DEFAULT}");
        }

        Ok(Self {
            bind,
            request_timeout_ms,
            max_body_bytes,
            max_concurrency,
            max_search_limit,
            log_json,
        })
    }
}

fn parse_socket_addr(key: &str, default: &str) -> Result<SocketAddr> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .with_context(|| format!("{key} must be a valid socket address, got '{raw}'"))
}

fn parse_usize(key: &str, default: usize) -> Result<usize> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .with_context(|| format!("{key} must be a positive integer, got '{raw}'"))
}

fn parse_u64(key: &str, default: u64) -> Result<u64> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .with_context(|| format!("{key} must be a positive integer, got '{raw}'"))
}
