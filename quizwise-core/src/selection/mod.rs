//! Question selection strategies.
//!
//! A session draws its questions through a [`QuestionSelector`]. Two strategies
//! exist: the anti-repetition [`Randomizer`] (default) and the weakest-first
//! [`AdaptiveSelector`] used when randomization is turned off.

mod adaptive;
mod randomizer;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::CandidateQuery;
use crate::types::{Difficulty, LearnerId, Question, QuestionId};

pub use adaptive::AdaptiveSelector;
pub use randomizer::{DrawReport, Randomizer, SequenceHash, SequenceRecord};

/// What a session asks a selector for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawRequest {
    pub learner_id: LearnerId,
    pub category: Option<String>,
    pub difficulty: Difficulty,
    pub count: usize,
    pub exclude_ids: Vec<QuestionId>,
}

impl DrawRequest {
    pub fn new(learner_id: impl Into<LearnerId>, difficulty: Difficulty, count: usize) -> Self {
        Self {
            learner_id: learner_id.into(),
            category: None,
            difficulty,
            count,
            exclude_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn excluding(mut self, ids: impl IntoIterator<Item = QuestionId>) -> Self {
        self.exclude_ids.extend(ids);
        self
    }

    pub fn candidate_query(&self) -> CandidateQuery {
        CandidateQuery {
            category: self.category.clone(),
            difficulty: self.difficulty,
            exclude_ids: self.exclude_ids.clone(),
        }
    }

    /// Category label for logs and errors
    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or("any")
    }
}

/// Strategy that picks the questions for a session
#[async_trait]
pub trait QuestionSelector: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Draw up to `request.count` distinct questions.
    ///
    /// Returns fewer (possibly none) when the store runs short; store
    /// failures are errors.
    async fn draw(&self, request: &DrawRequest) -> Result<Vec<Question>>;

    /// Drop any state remembered between draws
    async fn reset(&self);
}

/// Keep the first question seen for each id
fn dedupe_by_id(questions: Vec<Question>) -> Vec<Question> {
    let mut seen = HashSet::new();
    questions
        .into_iter()
        .filter(|q| seen.insert(q.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str) -> Question {
        Question {
            id: QuestionId::from(id),
            prompt: "p".into(),
            options: vec!["a".into()],
            correct_index: 0,
            explanation: None,
            category: "c".into(),
            difficulty: Difficulty::Easy,
            approved: true,
        }
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let deduped = dedupe_by_id(vec![question("a"), question("b"), question("a")]);
        let ids: Vec<_> = deduped.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_request_builders() {
        let request = DrawRequest::new("learner-1", Difficulty::Medium, 4)
            .with_category("investing")
            .excluding([QuestionId::from("q1")]);
        let query = request.candidate_query();
        assert_eq!(query.category.as_deref(), Some("investing"));
        assert_eq!(query.difficulty, Difficulty::Medium);
        assert_eq!(query.exclude_ids, vec![QuestionId::from("q1")]);
        assert_eq!(request.category_label(), "investing");
        assert_eq!(DrawRequest::new("l", Difficulty::Easy, 1).category_label(), "any");
    }
}
