//! In-memory store implementations
//!
//! Both stores are thread-safe via RwLock and can be shared across sessions.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{CandidateQuery, LearnerProfileStore, QuestionStore};
use crate::error::StoreError;
use crate::session::SessionSummary;
use crate::types::{Difficulty, LearnerId, LearnerProfile, Question};

/// Accepted layouts for a question bank file
#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionBank {
    List(Vec<Question>),
    Wrapped { questions: Vec<Question> },
}

/// Question store backed by a Vec
#[derive(Debug, Default)]
pub struct InMemoryQuestionStore {
    questions: RwLock<Vec<Question>>,
}

impl InMemoryQuestionStore {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions: RwLock::new(questions),
        }
    }

    /// Parse a question bank: either a JSON array of questions or an object
    /// with a `questions` array.
    ///
    /// Rejects questions whose `correct_index` is out of range or whose
    /// option texts repeat, since answers are matched by text.
    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        let questions = match serde_json::from_str(json)? {
            QuestionBank::List(questions) => questions,
            QuestionBank::Wrapped { questions } => questions,
        };
        for question in &questions {
            check_question(question)?;
        }
        Ok(Self::new(questions))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub async fn insert(&self, question: Question) {
        self.questions.write().await.push(question);
    }

    pub async fn len(&self) -> usize {
        self.questions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.questions.read().await.is_empty()
    }

    /// Number of approved questions per (category, difficulty)
    pub async fn category_counts(&self) -> BTreeMap<(String, Difficulty), usize> {
        let mut counts = BTreeMap::new();
        for q in self.questions.read().await.iter().filter(|q| q.approved) {
            *counts
                .entry((q.category.clone(), q.difficulty))
                .or_insert(0) += 1;
        }
        counts
    }
}

fn check_question(question: &Question) -> Result<(), StoreError> {
    if question.correct_index >= question.options.len() {
        return Err(StoreError::Serialization(format!(
            "question {}: correct_index {} out of range for {} options",
            question.id,
            question.correct_index,
            question.options.len()
        )));
    }
    let mut seen = HashSet::new();
    if let Some(repeated) = question.options.iter().find(|o| !seen.insert(o.as_str())) {
        return Err(StoreError::Serialization(format!(
            "question {}: option '{repeated}' appears more than once",
            question.id
        )));
    }
    Ok(())
}

#[async_trait]
impl QuestionStore for InMemoryQuestionStore {
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<Vec<Question>, StoreError> {
        let excluded: HashSet<_> = query.exclude_ids.iter().collect();
        Ok(self
            .questions
            .read()
            .await
            .iter()
            .filter(|q| q.approved)
            .filter(|q| q.difficulty == query.difficulty)
            .filter(|q| {
                query
                    .category
                    .as_ref()
                    .is_none_or(|category| &q.category == category)
            })
            .filter(|q| !excluded.contains(&q.id))
            .cloned()
            .collect())
    }
}

/// Learner profile store backed by a HashMap
#[derive(Debug, Default)]
pub struct InMemoryLearnerStore {
    profiles: RwLock<HashMap<LearnerId, LearnerProfile>>,
    sessions: RwLock<Vec<SessionSummary>>,
}

impl InMemoryLearnerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, profile: LearnerProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.learner_id.clone(), profile);
    }

    /// Summaries recorded so far, oldest first
    pub async fn sessions(&self) -> Vec<SessionSummary> {
        self.sessions.read().await.clone()
    }
}

#[async_trait]
impl LearnerProfileStore for InMemoryLearnerStore {
    async fn profile(&self, learner_id: &LearnerId) -> Result<Option<LearnerProfile>, StoreError> {
        Ok(self.profiles.read().await.get(learner_id).cloned())
    }

    async fn record_session(&self, summary: &SessionSummary) -> Result<(), StoreError> {
        {
            let mut profiles = self.profiles.write().await;
            let profile = profiles
                .entry(summary.learner_id.clone())
                .or_insert_with(|| LearnerProfile::new(summary.learner_id.clone(), 0));
            for answer in &summary.answers {
                profile
                    .history
                    .entry(answer.question_id.clone())
                    .or_default()
                    .record(answer);
            }
            profile.xp += u64::from(summary.score);
        }
        self.sessions.write().await.push(summary.clone());
        Ok(())
    }
}
