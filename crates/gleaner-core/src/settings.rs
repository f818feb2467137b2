use std::time::Duration;

use crate::error::AppError;
use crate::scoring::CompletionState;

/// Tunables of the job-extraction pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    /// Lowest deterministic result accepted without escalating to the AI.
    pub accept_state: CompletionState,
    /// Request timeout handed to the AI client.
    pub llm_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            accept_state: CompletionState::Sufficient,
            llm_timeout: Duration::from_secs(120),
        }
    }
}

impl PipelineSettings {
    /// Read settings from environment variables.
    ///
    /// - `GLEANER_ACCEPT_STATE` (optional, defaults to `sufficient`)
    /// - `GLEANER_LLM_TIMEOUT_SECS` (optional, defaults to 120)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let accept_state = match lookup("GLEANER_ACCEPT_STATE") {
            None => defaults.accept_state,
            Some(raw) => {
                let state: CompletionState = raw.parse().map_err(|_| {
                    AppError::ConfigError(format!(
                        "Invalid GLEANER_ACCEPT_STATE '{raw}': expected minimal, partial, sufficient or complete"
                    ))
                })?;
                if state == CompletionState::Failed {
                    return Err(AppError::ConfigError(
                        "GLEANER_ACCEPT_STATE cannot be 'failed'".into(),
                    ));
                }
                state
            }
        };

        let llm_timeout = match lookup("GLEANER_LLM_TIMEOUT_SECS") {
            None => defaults.llm_timeout,
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    AppError::ConfigError(format!(
                        "Invalid GLEANER_LLM_TIMEOUT_SECS '{raw}': must be a positive integer"
                    ))
                })?;
                if secs == 0 {
                    return Err(AppError::ConfigError(
                        "GLEANER_LLM_TIMEOUT_SECS must be at least 1".into(),
                    ));
                }
                Duration::from_secs(secs)
            }
        };

        Ok(Self {
            accept_state,
            llm_timeout,
        })
    }

    pub fn with_accept_state(mut self, state: CompletionState) -> Self {
        self.accept_state = state;
        self
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }
}
