//! Difficulty policy.
//!
//! Turns windowed performance statistics into a tier recommendation. Rules are
//! checked in order and the first match wins:
//!
//! | # | Condition | Effect |
//! |---|-----------|--------|
//! | 1 | recent accuracy >= 0.80 and correct streak >= 3 | one tier up |
//! | 2 | recent accuracy <= 0.40 and wrong streak >= 2 | one tier down |
//! | 3 | recent accuracy >= 0.70 and average latency < 5s | one tier up |
//! | 4 | recent accuracy <= 0.60 and average latency > 20s | one tier down |
//!
//! A rule that would move past the floor or ceiling yields no recommendation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PolicyConfig;
use crate::types::Difficulty;

/// Why a difficulty change was recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    /// High recent accuracy with a run of correct answers.
    CorrectStreak,
    /// Low recent accuracy with a run of wrong answers.
    WrongStreak,
    /// Accurate and quick: the tier is too easy.
    FastAndAccurate,
    /// Inaccurate and slow: the tier is too hard.
    SlowAndInaccurate,
    /// The caller reflowed the session explicitly.
    Requested,
}

impl fmt::Display for AdjustmentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CorrectStreak => write!(f, "correct streak"),
            Self::WrongStreak => write!(f, "wrong streak"),
            Self::FastAndAccurate => write!(f, "fast and accurate"),
            Self::SlowAndInaccurate => write!(f, "slow and inaccurate"),
            Self::Requested => write!(f, "requested"),
        }
    }
}

/// Statistics the policy looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub current: Difficulty,
    pub recent_accuracy: f64,
    pub consecutive_correct: u32,
    pub consecutive_wrong: u32,
    pub average_latency_ms: f64,
}

/// A tier change the tracker is proposing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub suggested: Difficulty,
    pub reason: AdjustmentReason,
}

/// Direction a matching rule wants to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Up,
    Down,
}

/// Rule set deciding when to change difficulty.
#[derive(Debug, Clone, Default)]
pub struct DifficultyPolicy {
    config: PolicyConfig,
}

impl DifficultyPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Evaluate the rules against `stats`.
    ///
    /// Returns `None` when no rule matches or the first matching rule has no
    /// headroom at the current tier.
    pub fn evaluate(&self, stats: &WindowStats) -> Option<Recommendation> {
        let (step, reason) = self.first_match(stats)?;
        let suggested = match step {
            Step::Up => stats.current.raised(),
            Step::Down => stats.current.lowered(),
        }?;
        Some(Recommendation { suggested, reason })
    }

    fn first_match(&self, stats: &WindowStats) -> Option<(Step, AdjustmentReason)> {
        let c = &self.config;
        if stats.recent_accuracy >= c.raise_accuracy && stats.consecutive_correct >= c.raise_streak
        {
            return Some((Step::Up, AdjustmentReason::CorrectStreak));
        }
        if stats.recent_accuracy <= c.lower_accuracy && stats.consecutive_wrong >= c.lower_streak {
            return Some((Step::Down, AdjustmentReason::WrongStreak));
        }
        if stats.recent_accuracy >= c.fast_accuracy
            && stats.average_latency_ms < c.fast_latency_ms as f64
        {
            return Some((Step::Up, AdjustmentReason::FastAndAccurate));
        }
        if stats.recent_accuracy <= c.slow_accuracy
            && stats.average_latency_ms > c.slow_latency_ms as f64
        {
            return Some((Step::Down, AdjustmentReason::SlowAndInaccurate));
        }
        None
    }

    /// Starting tier for a learner at `level`.
    pub fn initial_difficulty(&self, level: u32) -> Difficulty {
        Difficulty::from_level(level, &self.config)
    }
}
