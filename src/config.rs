//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Thresholds for the sign-up prompt policy.
#[derive(Debug, Clone, PartialEq)]
pub struct GatingConfig {
    /// Prompts ever shown before permanent suppression.
    pub max_prompt_count: u32,
    /// Last session (inclusive) of the early stage, which starts at session 2.
    pub early_stage_sessions: u32,
    /// First session of the reduced-frequency stage.
    pub reduced_frequency_session_start: u32,
    /// Minimum gap in days between prompts in the reduced-frequency stage.
    pub reduced_frequency_days: f64,
    /// High-intent actions required before the reduced-frequency stage prompts.
    pub high_intent_actions_threshold: u32,
    /// Prompts allowed per UTC day in the reduced-frequency stage.
    pub max_prompts_per_day: u32,
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            max_prompt_count: 10,
            early_stage_sessions: 4,
            reduced_frequency_session_start: 5,
            reduced_frequency_days: 2.0,
            high_intent_actions_threshold: 5,
            max_prompts_per_day: 1,
        }
    }
}

impl GatingConfig {
    /// Build a config from `ENGAGEMENT_*` environment variables, falling back
    /// to the defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`GatingConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            max_prompt_count: parse_var(
                &lookup,
                "ENGAGEMENT_MAX_PROMPT_COUNT",
                defaults.max_prompt_count,
            )?,
            early_stage_sessions: parse_var(
                &lookup,
                "ENGAGEMENT_EARLY_STAGE_SESSIONS",
                defaults.early_stage_sessions,
            )?,
            reduced_frequency_session_start: parse_var(
                &lookup,
                "ENGAGEMENT_REDUCED_FREQUENCY_SESSION_START",
                defaults.reduced_frequency_session_start,
            )?,
            reduced_frequency_days: parse_var(
                &lookup,
                "ENGAGEMENT_REDUCED_FREQUENCY_DAYS",
                defaults.reduced_frequency_days,
            )?,
            high_intent_actions_threshold: parse_var(
                &lookup,
                "ENGAGEMENT_HIGH_INTENT_THRESHOLD",
                defaults.high_intent_actions_threshold,
            )?,
            max_prompts_per_day: parse_var(
                &lookup,
                "ENGAGEMENT_MAX_PROMPTS_PER_DAY",
                defaults.max_prompts_per_day,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the policy cannot evaluate sensibly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_prompt_count == 0 {
            return Err(ConfigError::Inconsistent(
                "max_prompt_count must be at least 1".to_string(),
            ));
        }
        if !self.reduced_frequency_days.is_finite() || self.reduced_frequency_days < 0.0 {
            return Err(ConfigError::Inconsistent(format!(
                "reduced_frequency_days must be a non-negative number, got {}",
                self.reduced_frequency_days
            )));
        }
        if self.reduced_frequency_session_start <= self.early_stage_sessions {
            return Err(ConfigError::Inconsistent(format!(
                "reduced-frequency stage (session {}) overlaps the early stage (through session {})",
                self.reduced_frequency_session_start, self.early_stage_sessions
            )));
        }
        Ok(())
    }
}

/// Where the CLI keeps its state file.
pub fn state_path_from_env() -> PathBuf {
    std::env::var("ENGAGEMENT_STATE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./data/engagement.json"))
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
    }
}
