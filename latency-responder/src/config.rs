use std::{ffi::OsString, time::Duration};

use rama::telemetry::tracing;

pub const ENV_LATENCY: &str = "LATENCY";
pub const ENV_APP_NAME: &str = "APP_NAME";

pub const DEFAULT_LATENCY_MS: u64 = 10;
pub const DEFAULT_APP_NAME: &str = "unknown";

/// Manually defined responder parameters,
/// these overwrite the values found in the environment.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigOverrides {
    /// Artificial delay applied before responding (overwrites the `LATENCY` env var).
    #[arg(long, value_name = "MS")]
    pub latency: Option<u64>,

    /// Name echoed in the response body (overwrites the `APP_NAME` env var).
    #[arg(long, value_name = "NAME")]
    pub app_name: Option<String>,
}

/// Identity and latency of the responder,
/// resolved once at startup and shared read-only by all requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponderConfig {
    pub latency_ms: u64,
    pub app_name: String,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            latency_ms: DEFAULT_LATENCY_MS,
            app_name: DEFAULT_APP_NAME.to_owned(),
        }
    }
}

impl ResponderConfig {
    /// Resolve the config from the overrides, falling back
    /// to the process environment and finally the defaults.
    pub fn resolve(overrides: ConfigOverrides) -> Self {
        Self::resolve_with_lookup(overrides, |key| std::env::var_os(key).map(env_value_lossy))
    }

    fn resolve_with_lookup<F>(overrides: ConfigOverrides, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let latency_ms = if let Some(value) = overrides.latency {
            tracing::info!("property 'latency': use overwrite: {value}ms");
            value
        } else if let Some(raw) = lookup(ENV_LATENCY) {
            match parse_latency_ms(&raw) {
                Some(value) => {
                    tracing::info!("property 'latency': use env {ENV_LATENCY}: {value}ms");
                    value
                }
                None => {
                    tracing::warn!(
                        "property 'latency': invalid env {ENV_LATENCY} value {raw:?}; use default: {DEFAULT_LATENCY_MS}ms"
                    );
                    DEFAULT_LATENCY_MS
                }
            }
        } else {
            tracing::info!("property 'latency': use default: {DEFAULT_LATENCY_MS}ms");
            DEFAULT_LATENCY_MS
        };

        let app_name = if let Some(value) = overrides.app_name {
            tracing::info!("property 'app_name': use overwrite: {value}");
            value
        } else if let Some(value) = lookup(ENV_APP_NAME) {
            tracing::info!("property 'app_name': use env {ENV_APP_NAME}: {value}");
            value
        } else {
            tracing::info!("property 'app_name': use default: {DEFAULT_APP_NAME}");
            DEFAULT_APP_NAME.to_owned()
        };

        Self {
            latency_ms,
            app_name,
        }
    }

    #[inline(always)]
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn response_body(&self) -> String {
        format!(
            "Response from {} with latency {}ms\n",
            self.app_name, self.latency_ms
        )
    }
}

/// Env values are not guaranteed to be UTF-8,
/// invalid sequences are replaced with `U+FFFD`.
fn env_value_lossy(value: OsString) -> String {
    match value.into_string() {
        Ok(value) => value,
        Err(value) => value.to_string_lossy().into_owned(),
    }
}

/// Decimal digits, optionally with a leading `+`
/// and single `_` separators between digits (e.g. `1_000`).
fn parse_latency_ms(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let digits = raw.strip_prefix('+').unwrap_or(raw);

    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
        || !digits.bytes().all(|b| b.is_ascii_digit() || b == b'_')
    {
        return None;
    }

    digits.replace('_', "").parse().ok()
}
