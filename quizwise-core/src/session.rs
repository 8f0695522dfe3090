//! Quiz session state machine.
//!
//! A session moves through three phases:
//!
//! ```text
//! ┌───────────────┐  start   ┌────────┐  finish / abandon  ┌──────────┐
//! │ Uninitialized │ ───────► │ Active │ ─────────────────► │ Finished │
//! └───────────────┘          └────────┘                    └──────────┘
//! ```
//!
//! While active, the session serves questions one at a time. Every answer is
//! fed to the [`PerformanceTracker`]; when it recommends a new tier and enough
//! questions remain, the unserved tail is redrawn at that tier (a reflow).
//! Questions already served are never replaced.
//!
//! Calls made in the wrong phase are rejected with
//! [`EngineError::InvalidTransition`] and change nothing.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{ConfigError, EngineError, Result};
use crate::policy::{AdjustmentReason, DifficultyPolicy, Recommendation};
use crate::selection::{DrawRequest, QuestionSelector};
use crate::store::LearnerProfileStore;
use crate::tracker::{PerformanceState, PerformanceTracker};
use crate::types::{
    AnswerObservation, AnswerRecord, Difficulty, LearnerId, Question, QuestionId, SessionId,
};

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Uninitialized,
    Active,
    Finished,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Active => write!(f, "active"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Parameters for starting a session.
///
/// Fields left as `None` fall back to the engine's [`SessionConfig`]
/// defaults, or to the learner's level for the difficulty.
///
/// [`SessionConfig`]: crate::config::SessionConfig
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartRequest {
    pub learner_id: LearnerId,
    pub category: Option<String>,
    pub initial_difficulty: Option<Difficulty>,
    pub question_count: Option<usize>,
    pub enable_difficulty_adjustment: Option<bool>,
    pub enable_randomization: Option<bool>,
}

impl StartRequest {
    pub fn new(learner_id: impl Into<LearnerId>) -> Self {
        Self {
            learner_id: learner_id.into(),
            category: None,
            initial_difficulty: None,
            question_count: None,
            enable_difficulty_adjustment: None,
            enable_randomization: None,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.initial_difficulty = Some(difficulty);
        self
    }

    #[must_use]
    pub fn with_question_count(mut self, count: usize) -> Self {
        self.question_count = Some(count);
        self
    }

    #[must_use]
    pub fn with_difficulty_adjustment(mut self, enabled: bool) -> Self {
        self.enable_difficulty_adjustment = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_randomization(mut self, enabled: bool) -> Self {
        self.enable_randomization = Some(enabled);
        self
    }
}

/// A difficulty change applied during a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentEvent {
    /// Index of the question whose answer triggered the change
    pub at_index: usize,
    pub from: Difficulty,
    pub to: Difficulty,
    pub reason: AdjustmentReason,
}

/// Result of answering the current question
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    /// Whether the remaining questions were redrawn at a new tier
    pub did_adjust: bool,
    pub correct_option: String,
    pub explanation: Option<String>,
    /// What the tracker recommended after this answer, applied or not
    pub signal: Option<Recommendation>,
}

/// Summary of a session, handed to the learner profile store on finish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub learner_id: LearnerId,
    pub score: u32,
    pub total: u32,
    /// `round(100 * score / total)`, 0 for an empty session
    pub percentage: u32,
    pub difficulty_adjustments: Vec<AdjustmentEvent>,
    pub answers: Vec<AnswerRecord>,
    /// False when the session was abandoned
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Percentage of `score` over `total`, rounded half away from zero
pub fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * f64::from(score) / f64::from(total)).round() as u32
}

/// State held only while a session is active
struct ActiveSession {
    learner_id: LearnerId,
    category: Option<String>,
    selector: Arc<dyn QuestionSelector>,
    questions: Vec<Question>,
    cursor: usize,
    answered: bool,
    current: Difficulty,
    tracker: PerformanceTracker,
    adjust_enabled: bool,
    adjustments: Vec<AdjustmentEvent>,
    answers: Vec<AnswerRecord>,
    score: u32,
    started_at: DateTime<Utc>,
}

impl ActiveSession {
    fn remaining_after_cursor(&self) -> usize {
        self.questions.len().saturating_sub(self.cursor + 1)
    }

    /// Redraw everything after the cursor at `to`.
    async fn reflow(
        &mut self,
        session_id: SessionId,
        to: Difficulty,
        reason: AdjustmentReason,
    ) -> Result<()> {
        let from = self.current;
        let tail_start = (self.cursor + 1).min(self.questions.len());
        let needed = self.questions.len() - tail_start;

        let exclude: Vec<QuestionId> = self.questions.iter().map(|q| q.id.clone()).collect();
        let mut present: HashSet<QuestionId> = exclude.iter().cloned().collect();
        let request = DrawRequest {
            learner_id: self.learner_id.clone(),
            category: self.category.clone(),
            difficulty: to,
            count: needed,
            exclude_ids: exclude,
        };
        let drawn = self.selector.draw(&request).await?;

        self.questions.truncate(tail_start);
        self.questions.extend(
            drawn
                .into_iter()
                .filter(|q| present.insert(q.id.clone()))
                .take(needed),
        );

        let refilled = self.questions.len() - tail_start;
        if refilled < needed {
            warn!(
                session_id = %session_id,
                needed,
                refilled,
                difficulty = %to,
                "Reflow ran short, truncating session"
            );
        }

        self.adjustments.push(AdjustmentEvent {
            at_index: self.cursor,
            from,
            to,
            reason,
        });
        self.current = to;

        info!(
            session_id = %session_id,
            learner_id = %self.learner_id,
            at_index = self.cursor,
            from = %from,
            to = %to,
            reason = %reason,
            "Adjusted difficulty"
        );
        Ok(())
    }

    fn summary(&self, session_id: SessionId, completed: bool) -> SessionSummary {
        let total = self.questions.len() as u32;
        SessionSummary {
            session_id,
            learner_id: self.learner_id.clone(),
            score: self.score,
            total,
            percentage: percentage(self.score, total),
            difficulty_adjustments: self.adjustments.clone(),
            answers: self.answers.clone(),
            completed,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

enum SessionState {
    Uninitialized,
    Active(Box<ActiveSession>),
    Finished(SessionSummary),
}

/// One learner's quiz sitting.
///
/// A session is driven by a single caller; it is not shared between tasks.
/// The selectors and stores it talks to are shared and safe for concurrent
/// use by many sessions.
pub struct QuizSession {
    id: SessionId,
    config: EngineConfig,
    randomizer: Arc<dyn QuestionSelector>,
    adaptive: Arc<dyn QuestionSelector>,
    profiles: Arc<dyn LearnerProfileStore>,
    state: SessionState,
}

impl QuizSession {
    /// Create an uninitialized session.
    ///
    /// `randomizer` serves sessions with randomization enabled, `adaptive`
    /// serves the rest.
    pub fn new(
        config: EngineConfig,
        randomizer: Arc<dyn QuestionSelector>,
        adaptive: Arc<dyn QuestionSelector>,
        profiles: Arc<dyn LearnerProfileStore>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            randomizer,
            adaptive,
            profiles,
            state: SessionState::Uninitialized,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            SessionState::Uninitialized => SessionPhase::Uninitialized,
            SessionState::Active(_) => SessionPhase::Active,
            SessionState::Finished(_) => SessionPhase::Finished,
        }
    }

    fn active(&self, operation: &'static str) -> Result<&ActiveSession> {
        match &self.state {
            SessionState::Active(active) => Ok(&**active),
            _ => Err(EngineError::InvalidTransition {
                operation,
                state: self.phase(),
            }),
        }
    }

    fn active_mut(&mut self, operation: &'static str) -> Result<&mut ActiveSession> {
        let phase = self.phase();
        match &mut self.state {
            SessionState::Active(active) => Ok(&mut **active),
            _ => Err(EngineError::InvalidTransition {
                operation,
                state: phase,
            }),
        }
    }

    /// Start the session: pick the tier, draw the questions, go active.
    ///
    /// Fails with [`EngineError::NoContentAvailable`] when nothing can be
    /// drawn; the session then stays uninitialized and may be started again.
    /// A draw that comes back short starts a shorter session.
    pub async fn start(&mut self, request: StartRequest) -> Result<()> {
        if !matches!(self.state, SessionState::Uninitialized) {
            return Err(EngineError::InvalidTransition {
                operation: "start",
                state: self.phase(),
            });
        }

        let defaults = &self.config.session;
        let count = request.question_count.unwrap_or(defaults.questions_count);
        if count == 0 {
            return Err(ConfigError::Invalid("question_count must be at least 1".into()).into());
        }
        let adjust_enabled = request
            .enable_difficulty_adjustment
            .unwrap_or(defaults.enable_difficulty_adjustment);
        let randomize = request
            .enable_randomization
            .unwrap_or(defaults.enable_randomization);

        let difficulty = match request.initial_difficulty {
            Some(difficulty) => difficulty,
            None => self.difficulty_for_learner(&request.learner_id).await?,
        };

        let selector = if randomize {
            Arc::clone(&self.randomizer)
        } else {
            Arc::clone(&self.adaptive)
        };

        let draw = DrawRequest {
            learner_id: request.learner_id.clone(),
            category: request.category.clone(),
            difficulty,
            count,
            exclude_ids: Vec::new(),
        };
        let questions = selector.draw(&draw).await?;
        if questions.is_empty() {
            warn!(
                session_id = %self.id,
                category = draw.category_label(),
                difficulty = %difficulty,
                "No content available to start session"
            );
            return Err(EngineError::NoContentAvailable {
                category: draw.category_label().to_string(),
                difficulty,
                requested: count,
                available: 0,
            });
        }
        if questions.len() < count {
            warn!(
                session_id = %self.id,
                requested = count,
                available = questions.len(),
                "Starting shortened session"
            );
        }

        info!(
            session_id = %self.id,
            learner_id = %request.learner_id,
            selector = selector.name(),
            difficulty = %difficulty,
            questions = questions.len(),
            "Session started"
        );

        self.state = SessionState::Active(Box::new(ActiveSession {
            learner_id: request.learner_id,
            category: request.category,
            selector,
            questions,
            cursor: 0,
            answered: false,
            current: difficulty,
            tracker: PerformanceTracker::new(
                &self.config.tracker,
                self.config.policy.clone(),
                difficulty,
            ),
            adjust_enabled,
            adjustments: Vec::new(),
            answers: Vec::new(),
            score: 0,
            started_at: Utc::now(),
        }));
        Ok(())
    }

    async fn difficulty_for_learner(&self, learner_id: &LearnerId) -> Result<Difficulty> {
        let profile = self.profiles.profile(learner_id).await.inspect_err(|e| {
            warn!(learner_id = %learner_id, error = %e, "Learner profile fetch failed")
        })?;
        let level = profile.map(|p| p.level).unwrap_or(0);
        Ok(DifficultyPolicy::new(self.config.policy.clone()).initial_difficulty(level))
    }

    /// Question at the cursor, or `None` when there is none to serve
    pub fn current_question(&self) -> Option<&Question> {
        match &self.state {
            SessionState::Active(active) => active.questions.get(active.cursor),
            _ => None,
        }
    }

    /// Answer the current question.
    ///
    /// If the tracker recommends a new tier, adjustment is enabled and at
    /// least `min_remaining_for_reflow` questions remain after this one, the
    /// remaining questions are redrawn before returning.
    ///
    /// A failed redraw returns the store error, but the answer is already
    /// recorded: [`score`](Self::score) and [`performance`](Self::performance)
    /// include it, the question counts as answered and the tail is untouched.
    /// The caller can carry on with [`advance`](Self::advance).
    pub async fn answer(&mut self, selected: &str, latency_ms: u64) -> Result<AnswerOutcome> {
        let min_remaining = self.config.session.min_remaining_for_reflow;
        let session_id = self.id;
        let active = self.active_mut("answer")?;

        if active.answered {
            return Err(EngineError::InvalidTransition {
                operation: "answer the same question twice",
                state: SessionPhase::Active,
            });
        }
        let Some(question) = active.questions.get(active.cursor) else {
            return Err(EngineError::InvalidTransition {
                operation: "answer past the last question",
                state: SessionPhase::Active,
            });
        };
        if !question.has_option(selected) {
            return Err(EngineError::InvalidAnswer(format!(
                "'{selected}' is not an option of question {}",
                question.id
            )));
        }

        let is_correct = question.is_correct(selected);
        let correct_option = question.correct_option().unwrap_or_default().to_string();
        let explanation = question.explanation.clone();
        let question_id = question.id.clone();

        active.answered = true;
        if is_correct {
            active.score += 1;
        }
        active.answers.push(AnswerRecord {
            question_id,
            is_correct,
            latency_ms,
            answered_at: Utc::now(),
        });

        let signal = active
            .tracker
            .record(AnswerObservation::new(is_correct, latency_ms))
            .recommendation();

        let mut did_adjust = false;
        if let Some(rec) = signal
            && active.adjust_enabled
            && active.remaining_after_cursor() >= min_remaining
        {
            active.reflow(session_id, rec.suggested, rec.reason).await?;
            active.tracker.apply_adjustment();
            did_adjust = true;
        }

        Ok(AnswerOutcome {
            is_correct,
            did_adjust,
            correct_option,
            explanation,
            signal,
        })
    }

    /// Redraw the unserved tail at `difficulty`.
    ///
    /// Returns `false` without redrawing when already at that tier.
    pub async fn reflow(&mut self, difficulty: Difficulty) -> Result<bool> {
        let session_id = self.id;
        let active = self.active_mut("reflow")?;
        if active.current == difficulty {
            return Ok(false);
        }
        active
            .reflow(session_id, difficulty, AdjustmentReason::Requested)
            .await?;
        active.tracker.set_difficulty(difficulty);
        Ok(true)
    }

    /// Move to the next question; `false` once past the last one.
    pub fn advance(&mut self) -> Result<bool> {
        let active = self.active_mut("advance")?;
        if active.cursor < active.questions.len() {
            active.cursor += 1;
            active.answered = false;
        }
        Ok(active.cursor < active.questions.len())
    }

    /// Finish the session and hand its summary to the learner profile store.
    ///
    /// If the handoff fails the session stays active so the call can be
    /// retried.
    pub async fn finish(&mut self) -> Result<SessionSummary> {
        let summary = self.active("finish")?.summary(self.id, true);

        self.profiles
            .record_session(&summary)
            .await
            .inspect_err(|e| {
                warn!(session_id = %self.id, error = %e, "Failed to record session summary")
            })?;

        info!(
            session_id = %self.id,
            learner_id = %summary.learner_id,
            score = summary.score,
            total = summary.total,
            percentage = summary.percentage,
            adjustments = summary.difficulty_adjustments.len(),
            "Session finished"
        );
        self.state = SessionState::Finished(summary.clone());
        Ok(summary)
    }

    /// End the session without recording it. The summary is marked incomplete.
    pub fn abandon(&mut self) -> Result<SessionSummary> {
        let summary = self.active("abandon")?.summary(self.id, false);
        info!(
            session_id = %self.id,
            learner_id = %summary.learner_id,
            answered = summary.answers.len(),
            "Session abandoned"
        );
        self.state = SessionState::Finished(summary.clone());
        Ok(summary)
    }

    /// Position of the cursor while active
    pub fn cursor(&self) -> Option<usize> {
        self.active("cursor").ok().map(|a| a.cursor)
    }

    /// Questions scheduled for the session (empty unless active)
    pub fn questions(&self) -> &[Question] {
        match &self.state {
            SessionState::Active(active) => active.questions.as_slice(),
            _ => &[],
        }
    }

    pub fn current_difficulty(&self) -> Option<Difficulty> {
        self.active("current_difficulty").ok().map(|a| a.current)
    }

    pub fn score(&self) -> u32 {
        match &self.state {
            SessionState::Uninitialized => 0,
            SessionState::Active(active) => active.score,
            SessionState::Finished(summary) => summary.score,
        }
    }

    pub fn adjustments(&self) -> &[AdjustmentEvent] {
        match &self.state {
            SessionState::Uninitialized => &[],
            SessionState::Active(active) => active.adjustments.as_slice(),
            SessionState::Finished(summary) => summary.difficulty_adjustments.as_slice(),
        }
    }

    pub fn performance(&self) -> Option<&PerformanceState> {
        self.active("performance").ok().map(|a| a.tracker.state())
    }

    /// Summary of a finished session
    pub fn summary(&self) -> Option<&SessionSummary> {
        match &self.state {
            SessionState::Finished(summary) => Some(summary),
            _ => None,
        }
    }
}
