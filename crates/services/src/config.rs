use std::env;
use std::time::Duration;

/// Timing knobs for a running assessment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound on a single start or submit call to storage.
    pub submit_timeout: Duration,
    /// Ticks between automatic re-submissions after an expired
    /// submission failed. Zero leaves retries to the user.
    pub expired_retry_ticks: u32,
    /// Period of the countdown timer.
    pub tick_period: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            submit_timeout: Duration::from_secs(10),
            expired_retry_ticks: 5,
            tick_period: Duration::from_secs(1),
        }
    }
}

impl SessionConfig {
    /// Reads `ASSESS_SUBMIT_TIMEOUT_SECS` and `ASSESS_SUBMIT_RETRY_SECS`,
    /// falling back to defaults for missing or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let submit_timeout = env::var("ASSESS_SUBMIT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(defaults.submit_timeout, Duration::from_secs);
        let expired_retry_ticks = env::var("ASSESS_SUBMIT_RETRY_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(defaults.expired_retry_ticks);
        Self {
            submit_timeout,
            expired_retry_ticks,
            ..defaults
        }
    }
}

/// Connection settings for the chat-completions question generator.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl GeneratorConfig {
    /// Returns `None` when `ASSESS_AI_API_KEY` is unset or blank.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("ASSESS_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("ASSESS_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("ASSESS_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
            request_timeout: Duration::from_secs(30),
        })
    }
}
