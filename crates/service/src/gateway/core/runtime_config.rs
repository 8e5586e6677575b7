use aprassist_core::completion::CompletionSettings;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::gateway::upstream::backoff::{
    RetryPolicy, DEFAULT_INITIAL_RETRY_DELAY_MS, DEFAULT_MAX_RETRIES,
};
use crate::gateway::upstream::config::{
    normalize_proxy_endpoint, normalize_upstream_base_url, TransportMode,
    DEFAULT_UPSTREAM_BASE_URL,
};

const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_UPSTREAM_TOTAL_TIMEOUT_MS: u64 = 120_000;
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

pub(crate) const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub(crate) const ENV_API_KEY_FALLBACK: &str = "API_KEY";
const ENV_TRANSPORT: &str = "APRASSIST_TRANSPORT";
const ENV_PROXY_URL: &str = "APRASSIST_PROXY_URL";
const ENV_UPSTREAM_BASE_URL: &str = "APRASSIST_UPSTREAM_BASE_URL";
const ENV_MODEL: &str = "APRASSIST_MODEL";
const ENV_TEMPERATURE: &str = "APRASSIST_TEMPERATURE";
const ENV_TOP_P: &str = "APRASSIST_TOP_P";
const ENV_MAX_RETRIES: &str = "APRASSIST_MAX_RETRIES";
const ENV_INITIAL_RETRY_DELAY_MS: &str = "APRASSIST_INITIAL_RETRY_DELAY_MS";
const ENV_UPSTREAM_CONNECT_TIMEOUT_SECS: &str = "APRASSIST_UPSTREAM_CONNECT_TIMEOUT_SECS";
const ENV_UPSTREAM_TOTAL_TIMEOUT_MS: &str = "APRASSIST_UPSTREAM_TOTAL_TIMEOUT_MS";
const ENV_MAX_BODY_BYTES: &str = "APRASSIST_MAX_BODY_BYTES";
const ENV_SYSTEM_PROMPT_FILE: &str = "APRASSIST_SYSTEM_PROMPT_FILE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("API key not configured on server")]
    MissingApiKey,
    #[error("Proxy URL not configured on server")]
    MissingProxyUrl,
}

/// Process-wide settings, read once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub transport: TransportMode,
    pub proxy_url: Option<String>,
    pub upstream_base_url: String,
    pub completion: CompletionSettings,
    pub retry: RetryPolicy,
    pub upstream_connect_timeout: Duration,
    /// Per-attempt timeout; `None` leaves attempts unbounded.
    pub upstream_total_timeout: Option<Duration>,
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            transport: TransportMode::Direct,
            proxy_url: None,
            upstream_base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            completion: CompletionSettings::default(),
            retry: RetryPolicy::default(),
            upstream_connect_timeout: Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS),
            upstream_total_timeout: Some(Duration::from_millis(DEFAULT_UPSTREAM_TOTAL_TIMEOUT_MS)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let defaults = CompletionSettings::default();
        let transport = match env_non_empty(ENV_TRANSPORT) {
            Some(raw) => TransportMode::parse(&raw).unwrap_or_else(|| {
                log::warn!(
                    "event=config_invalid_value key={} value={} fallback={}",
                    ENV_TRANSPORT,
                    raw,
                    TransportMode::Direct.as_str()
                );
                TransportMode::Direct
            }),
            None => TransportMode::Direct,
        };
        let total_timeout_ms =
            env_u64_or(ENV_UPSTREAM_TOTAL_TIMEOUT_MS, DEFAULT_UPSTREAM_TOTAL_TIMEOUT_MS);

        Self {
            api_key: env_non_empty(ENV_API_KEY).or_else(|| env_non_empty(ENV_API_KEY_FALLBACK)),
            transport,
            proxy_url: env_non_empty(ENV_PROXY_URL).map(|value| normalize_proxy_endpoint(&value)),
            upstream_base_url: env_non_empty(ENV_UPSTREAM_BASE_URL)
                .map(|value| normalize_upstream_base_url(&value))
                .unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.to_string()),
            completion: CompletionSettings {
                model: env_non_empty(ENV_MODEL).unwrap_or(defaults.model),
                system_instruction: load_system_instruction()
                    .unwrap_or(defaults.system_instruction),
                temperature: env_f32_or(ENV_TEMPERATURE, defaults.temperature),
                top_p: env_f32_or(ENV_TOP_P, defaults.top_p),
            },
            retry: RetryPolicy::new(
                env_u32_or(ENV_MAX_RETRIES, DEFAULT_MAX_RETRIES),
                Duration::from_millis(env_u64_or(
                    ENV_INITIAL_RETRY_DELAY_MS,
                    DEFAULT_INITIAL_RETRY_DELAY_MS,
                )),
            ),
            upstream_connect_timeout: Duration::from_secs(env_u64_or(
                ENV_UPSTREAM_CONNECT_TIMEOUT_SECS,
                DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS,
            )),
            upstream_total_timeout: if total_timeout_ms == 0 {
                None
            } else {
                Some(Duration::from_millis(total_timeout_ms))
            },
            max_body_bytes: env_usize_or(ENV_MAX_BODY_BYTES, DEFAULT_MAX_BODY_BYTES),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Credential check run before any upstream call.
    pub fn check_credentials(&self) -> Result<(), ConfigError> {
        match self.transport {
            TransportMode::Direct if self.api_key.is_none() => Err(ConfigError::MissingApiKey),
            TransportMode::Proxy if self.proxy_url.is_none() => Err(ConfigError::MissingProxyUrl),
            _ => Ok(()),
        }
    }
}

pub(crate) fn build_upstream_client(connect_timeout: Duration) -> Client {
    // 中文注释：总超时按单次尝试设置在请求上，客户端层不设，避免重试间隔被算进去。
    Client::builder()
        .connect_timeout(connect_timeout)
        .pool_max_idle_per_host(32)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(30)))
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn load_system_instruction() -> Option<String> {
    let path = PathBuf::from(env_non_empty(ENV_SYSTEM_PROMPT_FILE)?);
    match std::fs::read_to_string(&path) {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => {
            log::warn!(
                "event=system_prompt_empty path={} fallback=builtin",
                path.display()
            );
            None
        }
        Err(err) => {
            log::warn!(
                "event=system_prompt_unreadable path={} err={} fallback=builtin",
                path.display(),
                err
            );
            None
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u64_or(name: &str, default: u64) -> u64 {
    env_non_empty(name)
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u32_or(name: &str, default: u32) -> u32 {
    env_non_empty(name)
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_usize_or(name: &str, default: usize) -> usize {
    env_non_empty(name)
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_f32_or(name: &str, default: f32) -> f32 {
    env_non_empty(name)
        .and_then(|value| value.parse::<f32>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(default)
}
