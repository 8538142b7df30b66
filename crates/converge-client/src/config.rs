use std::collections::BTreeMap;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Used wherever a configured timeout is zero.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Retry decision for one HTTP status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retryability {
    pub retryable: bool,
    /// Regex over the error message; empty matches everything.
    #[serde(default)]
    pub pattern: String,
    /// Stop retrying this code after this long; 0 = no extra bound.
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Retryability {
    pub fn retryable() -> Self {
        Self {
            retryable: true,
            pattern: String::new(),
            timeout_secs: 0,
        }
    }

    pub fn not_retryable() -> Self {
        Self {
            retryable: false,
            pattern: String::new(),
            timeout_secs: 0,
        }
    }

    /// A malformed pattern never matches.
    pub fn matches(&self, message: &str) -> bool {
        if self.pattern.is_empty() {
            return true;
        }
        match Regex::new(&self.pattern) {
            Ok(re) => re.is_match(message),
            Err(e) => {
                tracing::warn!(pattern = %self.pattern, error = %e, "invalid retryability pattern");
                false
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): doubling from the
    /// initial backoff, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationWait {
    pub poll_interval_ms: u64,
    /// 0 falls back to the client timeout.
    pub timeout_secs: u64,
}

impl Default for OperationWait {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            timeout_secs: 0,
        }
    }
}

/// Immutable client configuration.
///
/// Never mutated once a [`crate::Client`] holds it; per-call variations go
/// through [`Config::clone_with`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overrides every resource's default endpoint when non-empty.
    pub base_path: String,
    /// Bound on a whole Get/List/Apply/Delete call; 0 = [`DEFAULT_TIMEOUT`].
    pub timeout_secs: u64,
    pub user_agent: String,
    pub retry: RetryPolicy,
    pub code_retryability: BTreeMap<u16, Retryability>,
    pub operation_wait: OperationWait,
    /// Extra Get attempts after a delete before giving up on seeing 404.
    pub delete_confirm_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            timeout_secs: 0,
            user_agent: concat!("converge/", env!("CARGO_PKG_VERSION")).to_string(),
            retry: RetryPolicy::default(),
            code_retryability: default_code_retryability(),
            operation_wait: OperationWait::default(),
            delete_confirm_attempts: 10,
        }
    }
}

/// 412 is retryable here; entry points that must not retry it override
/// that per call.
pub fn default_code_retryability() -> BTreeMap<u16, Retryability> {
    [412, 429, 500, 502, 503]
        .into_iter()
        .map(|code| (code, Retryability::retryable()))
        .collect()
}

#[derive(Debug, Clone)]
pub enum ConfigOverride {
    /// Merged over the existing table, entry by entry.
    CodeRetryability(BTreeMap<u16, Retryability>),
    BasePath(String),
    Timeout(Duration),
    UserAgent(String),
}

impl Config {
    pub fn timeout(&self) -> Duration {
        self.timeout_or(DEFAULT_TIMEOUT)
    }

    pub fn timeout_or(&self, fallback: Duration) -> Duration {
        if self.timeout_secs == 0 {
            fallback
        } else {
            Duration::from_secs(self.timeout_secs)
        }
    }

    pub fn operation_timeout(&self) -> Duration {
        if self.operation_wait.timeout_secs == 0 {
            self.timeout()
        } else {
            Duration::from_secs(self.operation_wait.timeout_secs)
        }
    }

    pub fn retryability(&self, status: u16) -> Option<&Retryability> {
        self.code_retryability.get(&status)
    }

    /// Pure: returns a new config with the overrides applied.
    pub fn clone_with(&self, overrides: &[ConfigOverride]) -> Config {
        let mut next = self.clone();
        for o in overrides {
            match o {
                ConfigOverride::CodeRetryability(table) => {
                    for (code, r) in table {
                        next.code_retryability.insert(*code, r.clone());
                    }
                }
                ConfigOverride::BasePath(path) => next.base_path = path.clone(),
                ConfigOverride::Timeout(t) => next.timeout_secs = t.as_secs(),
                ConfigOverride::UserAgent(ua) => next.user_agent = ua.clone(),
            }
        }
        next
    }
}

/// Applied by every engine entry point: a 412 surfaces immediately.
pub fn precondition_failed_not_retryable() -> ConfigOverride {
    ConfigOverride::CodeRetryability(BTreeMap::from([(412, Retryability::not_retryable())]))
}
