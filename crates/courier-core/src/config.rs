//! Configuration loaded from `COURIER_*` environment variables.
//!
//! Missing variables use the defaults; unparsable ones fall back with a warning.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::executor::MobilePrefixRule;
use crate::readiness::RetryPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    /// How long an RPC caller waits for its response.
    pub rpc_timeout: Duration,

    /// How long a task or SEND_MESSAGE waits for the readiness signal.
    pub ready_timeout: Duration,

    /// Backoff for operations failing with "not ready".
    pub retry: RetryPolicy,

    /// Country code the mobile-prefix contact fallback applies to.
    pub mobile_country_code: String,

    /// Frames buffered per bus subscriber before it lags.
    pub bus_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let retry_defaults = RetryPolicy::default();

        let multiplier = parse_or(&lookup, "COURIER_RETRY_MULTIPLIER", retry_defaults.multiplier);
        let multiplier = if multiplier >= 1.0 {
            multiplier
        } else {
            warn!(env_var = "COURIER_RETRY_MULTIPLIER", multiplier, "multiplier below 1, using default");
            retry_defaults.multiplier
        };

        let bus_capacity = match parse_or(&lookup, "COURIER_BUS_CAPACITY", 256usize) {
            0 => {
                warn!(env_var = "COURIER_BUS_CAPACITY", "capacity must be positive, using default");
                256
            }
            n => n,
        };

        Config {
            rpc_timeout: millis_or(&lookup, "COURIER_RPC_TIMEOUT_MS", Duration::from_secs(15)),

            ready_timeout: millis_or(&lookup, "COURIER_READY_TIMEOUT_MS", Duration::from_secs(15)),

            retry: RetryPolicy {
                base_delay: millis_or(&lookup, "COURIER_RETRY_BASE_MS", retry_defaults.base_delay),
                multiplier,
                max_delay: millis_or(&lookup, "COURIER_RETRY_MAX_DELAY_MS", retry_defaults.max_delay),
                max_retries: parse_or(&lookup, "COURIER_RETRY_MAX", retry_defaults.max_retries),
            },

            mobile_country_code: lookup("COURIER_MOBILE_COUNTRY_CODE")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
                .unwrap_or_else(|| "55".to_string()),

            bus_capacity,
        }
    }

    pub fn mobile_rule(&self) -> MobilePrefixRule {
        MobilePrefixRule::default().with_country_code(self.mobile_country_code.clone())
    }
}

fn parse_or<T: FromStr + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    let Some(raw) = lookup(name) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

fn millis_or(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: Duration,
) -> Duration {
    let ms = parse_or(lookup, name, default.as_millis() as u64);
    Duration::from_millis(ms)
}
