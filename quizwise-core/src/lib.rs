//! quizwise-core - Adaptive quiz session engine
//!
//! This crate decides, for one learner at one moment, which difficulty tier to
//! present and which questions to serve, and re-tunes both while the learner
//! answers. It is built from three parts:
//!
//! - [`PerformanceTracker`]: sliding-window statistics over the answer stream,
//!   with tier recommendations from the [`DifficultyPolicy`].
//! - [`Randomizer`]: anti-repetition random draws with option shuffling, and
//!   [`AdaptiveSelector`] as the weakest-first alternative.
//! - [`QuizSession`]: the per-sitting state machine that serves questions and
//!   reflows the unserved tail when the tier changes.
//!
//! Question content and learner profiles live behind the [`QuestionStore`] and
//! [`LearnerProfileStore`] traits.

pub mod config;
pub mod engine;
pub mod error;
pub mod policy;
pub mod selection;
pub mod session;
pub mod store;
pub mod tracker;
pub mod types;

pub use config::{EngineConfig, PolicyConfig, RandomizerConfig, SessionConfig, TrackerConfig};
pub use engine::QuizEngine;
pub use error::{ConfigError, EngineError, Result, StoreError};
pub use policy::{AdjustmentReason, DifficultyPolicy, Recommendation, WindowStats};
pub use selection::{
    AdaptiveSelector, DrawReport, DrawRequest, QuestionSelector, Randomizer, SequenceHash,
    SequenceRecord,
};
pub use session::{
    AdjustmentEvent, AnswerOutcome, QuizSession, SessionPhase, SessionSummary, StartRequest,
    percentage,
};
pub use store::{
    CandidateQuery, InMemoryLearnerStore, InMemoryQuestionStore, LearnerProfileStore,
    QuestionStore,
};
pub use tracker::{PerformanceState, PerformanceTracker};
pub use types::{
    AnswerObservation, AnswerRecord, Difficulty, LearnerId, LearnerProfile, Question,
    QuestionHistory, QuestionId, SessionId,
};
