//! Performance tracker.
//!
//! Consumes the answer stream of one session and keeps a sliding window of
//! recent outcomes. After every observation the difficulty policy is asked
//! whether the current tier still fits, once the window holds enough answers
//! to say anything (`min(window_size, 3)`).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{PolicyConfig, TrackerConfig};
use crate::policy::{AdjustmentReason, DifficultyPolicy, Recommendation, WindowStats};
use crate::types::{AnswerObservation, Difficulty};

/// Fewest windowed answers before recommendations are evaluated.
const MIN_EVALUATION_WINDOW: usize = 3;

/// Snapshot of a learner's performance within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceState {
    /// Correct answers over the whole session.
    pub correct_count: u32,
    /// Answers over the whole session.
    pub total_count: u32,
    /// `correct_count / total_count`.
    pub accuracy: f64,
    /// Accuracy over the window only.
    pub recent_accuracy: f64,
    /// Mean latency over the window.
    pub average_latency_ms: f64,
    /// Last `window_size` outcomes, oldest first.
    pub recent_window: VecDeque<bool>,
    /// Last `window_size` latencies, oldest first.
    pub recent_latencies: VecDeque<u64>,
    pub consecutive_correct: u32,
    pub consecutive_wrong: u32,
    /// Tier the learner is currently on.
    pub current: Difficulty,
    /// Whether the policy recommends a change.
    pub should_adjust: bool,
    /// Tier the policy recommends (equals `current` when holding).
    pub suggested: Difficulty,
    /// Rule that produced the recommendation.
    pub reason: Option<AdjustmentReason>,
}

impl PerformanceState {
    fn new(current: Difficulty) -> Self {
        Self {
            correct_count: 0,
            total_count: 0,
            accuracy: 0.0,
            recent_accuracy: 0.0,
            average_latency_ms: 0.0,
            recent_window: VecDeque::new(),
            recent_latencies: VecDeque::new(),
            consecutive_correct: 0,
            consecutive_wrong: 0,
            current,
            should_adjust: false,
            suggested: current,
            reason: None,
        }
    }

    /// Pending recommendation, if any.
    pub fn recommendation(&self) -> Option<Recommendation> {
        match (self.should_adjust, self.reason) {
            (true, Some(reason)) => Some(Recommendation {
                suggested: self.suggested,
                reason,
            }),
            _ => None,
        }
    }

    fn window_stats(&self) -> WindowStats {
        WindowStats {
            current: self.current,
            recent_accuracy: self.recent_accuracy,
            consecutive_correct: self.consecutive_correct,
            consecutive_wrong: self.consecutive_wrong,
            average_latency_ms: self.average_latency_ms,
        }
    }
}

/// Tracks answers for one session and recommends difficulty changes.
#[derive(Debug, Clone)]
pub struct PerformanceTracker {
    window_size: usize,
    policy: DifficultyPolicy,
    initial: Difficulty,
    state: PerformanceState,
}

impl PerformanceTracker {
    /// Create a tracker starting at `initial`.
    pub fn new(config: &TrackerConfig, policy: PolicyConfig, initial: Difficulty) -> Self {
        Self {
            window_size: config.window_size.max(1),
            policy: DifficultyPolicy::new(policy),
            initial,
            state: PerformanceState::new(initial),
        }
    }

    pub fn state(&self) -> &PerformanceState {
        &self.state
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Record one answer and recompute the derived statistics.
    pub fn record(&mut self, observation: AnswerObservation) -> &PerformanceState {
        let window_size = self.window_size;
        let state = &mut self.state;

        state.recent_window.push_back(observation.is_correct);
        while state.recent_window.len() > window_size {
            state.recent_window.pop_front();
        }
        state.recent_latencies.push_back(observation.latency_ms);
        while state.recent_latencies.len() > window_size {
            state.recent_latencies.pop_front();
        }

        state.total_count += 1;
        if observation.is_correct {
            state.correct_count += 1;
            state.consecutive_correct += 1;
            state.consecutive_wrong = 0;
        } else {
            state.consecutive_wrong += 1;
            state.consecutive_correct = 0;
        }

        state.accuracy = f64::from(state.correct_count) / f64::from(state.total_count);
        let windowed_correct = state.recent_window.iter().filter(|&&c| c).count();
        state.recent_accuracy = windowed_correct as f64 / state.recent_window.len() as f64;
        state.average_latency_ms = state
            .recent_latencies
            .iter()
            .map(|&ms| ms as f64)
            .sum::<f64>()
            / state.recent_latencies.len() as f64;

        let recommendation = if state.recent_window.len() >= window_size.min(MIN_EVALUATION_WINDOW)
        {
            self.policy.evaluate(&state.window_stats())
        } else {
            None
        };

        match recommendation {
            Some(rec) => {
                state.should_adjust = true;
                state.suggested = rec.suggested;
                state.reason = Some(rec.reason);
            }
            None => {
                state.should_adjust = false;
                state.suggested = state.current;
                state.reason = None;
            }
        }

        debug!(
            total = state.total_count,
            recent_accuracy = state.recent_accuracy,
            average_latency_ms = state.average_latency_ms,
            should_adjust = state.should_adjust,
            "Recorded answer"
        );

        &self.state
    }

    /// Commit the pending recommendation.
    ///
    /// Moves to the suggested tier and clears both streaks; the window is
    /// kept. Returns the new tier, or `None` when nothing was pending.
    pub fn apply_adjustment(&mut self) -> Option<Difficulty> {
        if !self.state.should_adjust {
            return None;
        }
        let state = &mut self.state;
        state.current = state.suggested;
        state.consecutive_correct = 0;
        state.consecutive_wrong = 0;
        state.should_adjust = false;
        state.reason = None;
        Some(state.current)
    }

    /// Move to `difficulty` directly, dropping any pending recommendation.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        let state = &mut self.state;
        state.current = difficulty;
        state.suggested = difficulty;
        state.should_adjust = false;
        state.reason = None;
        state.consecutive_correct = 0;
        state.consecutive_wrong = 0;
    }

    /// Forget everything and return to the starting tier.
    pub fn reset(&mut self) {
        self.state = PerformanceState::new(self.initial);
    }
}
