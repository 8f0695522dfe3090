//! Engine configuration.
//!
//! Every section uses `#[serde(default)]`, so a config file only needs to
//! name the values it overrides:
//!
//! ```toml
//! [tracker]
//! window_size = 7
//!
//! [randomizer]
//! cooldown_hours = 12
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Main configuration for the quiz engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Performance tracker settings.
    pub tracker: TrackerConfig,
    /// Difficulty policy thresholds.
    pub policy: PolicyConfig,
    /// Anti-repetition randomizer settings.
    pub randomizer: RandomizerConfig,
    /// Session defaults.
    pub session: SessionConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot reject on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracker.window_size == 0 {
            return Err(ConfigError::Invalid(
                "tracker.window_size must be at least 1".into(),
            ));
        }
        if self.randomizer.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "randomizer.max_attempts must be at least 1".into(),
            ));
        }
        if self.randomizer.max_sequence_cache == 0 {
            return Err(ConfigError::Invalid(
                "randomizer.max_sequence_cache must be at least 1".into(),
            ));
        }
        if self.session.questions_count == 0 {
            return Err(ConfigError::Invalid(
                "session.questions_count must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("raise_accuracy", self.policy.raise_accuracy),
            ("lower_accuracy", self.policy.lower_accuracy),
            ("fast_accuracy", self.policy.fast_accuracy),
            ("slow_accuracy", self.policy.slow_accuracy),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "policy.{name} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }
        if self.policy.medium_level > self.policy.hard_level {
            return Err(ConfigError::Invalid(
                "policy.medium_level must not exceed policy.hard_level".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the performance tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Number of recent answers kept in the sliding window.
    pub window_size: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { window_size: 5 }
    }
}

/// Thresholds for difficulty recommendations and initial tier selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Recent accuracy needed to raise on a correct streak.
    pub raise_accuracy: f64,
    /// Consecutive correct answers needed to raise.
    pub raise_streak: u32,
    /// Recent accuracy at or below which a wrong streak lowers.
    pub lower_accuracy: f64,
    /// Consecutive wrong answers needed to lower.
    pub lower_streak: u32,
    /// Recent accuracy needed to raise on fast answers.
    pub fast_accuracy: f64,
    /// Average latency below which answers count as fast.
    pub fast_latency_ms: u64,
    /// Recent accuracy at or below which slow answers lower.
    pub slow_accuracy: f64,
    /// Average latency above which answers count as slow.
    pub slow_latency_ms: u64,
    /// Learner level at which sessions start on hard.
    pub hard_level: u32,
    /// Learner level at which sessions start on medium.
    pub medium_level: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            raise_accuracy: 0.80,
            raise_streak: 3,
            lower_accuracy: 0.40,
            lower_streak: 2,
            fast_accuracy: 0.70,
            fast_latency_ms: 5_000,
            slow_accuracy: 0.60,
            slow_latency_ms: 20_000,
            hard_level: 20,
            medium_level: 10,
        }
    }
}

/// Configuration for the anti-repetition randomizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomizerConfig {
    /// Hours during which a served question set may not be served again.
    pub cooldown_hours: u32,
    /// Maximum number of sequence records retained.
    pub max_sequence_cache: usize,
    /// Draw attempts before accepting a colliding set.
    pub max_attempts: u32,
}

impl Default for RandomizerConfig {
    fn default() -> Self {
        Self {
            cooldown_hours: 24,
            max_sequence_cache: 50,
            max_attempts: 10,
        }
    }
}

/// Defaults applied to sessions when the start request leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of questions per session.
    pub questions_count: usize,
    /// Whether tracker recommendations reflow the session.
    pub enable_difficulty_adjustment: bool,
    /// Whether to draw through the randomizer (otherwise weakest-first).
    pub enable_randomization: bool,
    /// Unserved questions required before a reflow is worth doing.
    pub min_remaining_for_reflow: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            questions_count: 10,
            enable_difficulty_adjustment: true,
            enable_randomization: true,
            min_remaining_for_reflow: 3,
        }
    }
}
