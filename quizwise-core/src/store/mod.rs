//! Store contracts for the engine's external collaborators.
//!
//! The engine reads questions from a [`QuestionStore`] and reads/writes learner
//! state through a [`LearnerProfileStore`]. Both are asynchronous boundaries;
//! the engine never retries a failed call.

mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::session::SessionSummary;
use crate::types::{Difficulty, LearnerId, LearnerProfile, Question, QuestionId};

pub use memory::{InMemoryLearnerStore, InMemoryQuestionStore};

/// Filter for candidate questions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateQuery {
    /// Restrict to one category, or any category when `None`
    pub category: Option<String>,
    pub difficulty: Difficulty,
    /// Question ids that must not be returned
    pub exclude_ids: Vec<QuestionId>,
}

/// Read access to approved questions
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// All approved questions matching the query.
    ///
    /// A failure is an `Err`; `Ok(vec![])` means no question matches.
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<Vec<Question>, StoreError>;
}

/// Learner state owned outside the engine
#[async_trait]
pub trait LearnerProfileStore: Send + Sync {
    async fn profile(&self, learner_id: &LearnerId) -> Result<Option<LearnerProfile>, StoreError>;

    /// Hand off a finished session's summary.
    async fn record_session(&self, summary: &SessionSummary) -> Result<(), StoreError>;
}
