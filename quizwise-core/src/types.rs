//! Core data types shared across the engine.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PolicyConfig;

/// Unique identifier for a question (assigned by the question store)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl QuestionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QuestionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for QuestionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a learner
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LearnerId(pub String);

impl LearnerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LearnerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for LearnerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for one quiz sitting
pub type SessionId = Uuid;

/// Difficulty tier of a question.
///
/// Tiers are totally ordered `Easy < Medium < Hard`. The question store
/// names them `basic`, `intermediate` and `advanced`; both spellings are
/// accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "basic", alias = "easy")]
    Easy,
    #[serde(rename = "intermediate", alias = "medium")]
    Medium,
    #[serde(rename = "advanced", alias = "hard")]
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];

    /// One tier up, or `None` at the ceiling
    pub fn raised(self) -> Option<Self> {
        match self {
            Self::Easy => Some(Self::Medium),
            Self::Medium => Some(Self::Hard),
            Self::Hard => None,
        }
    }

    /// One tier down, or `None` at the floor
    pub fn lowered(self) -> Option<Self> {
        match self {
            Self::Easy => None,
            Self::Medium => Some(Self::Easy),
            Self::Hard => Some(Self::Medium),
        }
    }

    /// Starting tier for a learner at `level`
    pub fn from_level(level: u32, policy: &PolicyConfig) -> Self {
        if level >= policy.hard_level {
            Self::Hard
        } else if level >= policy.medium_level {
            Self::Medium
        } else {
            Self::Easy
        }
    }

    /// Name used by the question store
    pub fn stored_name(self) -> &'static str {
        match self {
            Self::Easy => "basic",
            Self::Medium => "intermediate",
            Self::Hard => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Easy => write!(f, "easy"),
            Self::Medium => write!(f, "medium"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" | "basic" => Ok(Self::Easy),
            "medium" | "intermediate" => Ok(Self::Medium),
            "hard" | "advanced" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

fn default_approved() -> bool {
    true
}

/// A multiple-choice question as served by the question store.
///
/// The engine never edits question content. Randomized draws reorder
/// `options` in their own working copy and move `correct_index` with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub category: String,
    pub difficulty: Difficulty,
    /// Only approved questions are eligible for sessions
    #[serde(default = "default_approved")]
    pub approved: bool,
}

impl Question {
    /// Text of the correct option
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_index).map(String::as_str)
    }

    /// Whether `selected` matches the correct option's text
    pub fn is_correct(&self, selected: &str) -> bool {
        self.correct_option() == Some(selected)
    }

    /// Whether `selected` names any option of this question
    pub fn has_option(&self, selected: &str) -> bool {
        self.options.iter().any(|o| o == selected)
    }
}

/// One answer given by the learner, consumed by the performance tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerObservation {
    pub is_correct: bool,
    pub latency_ms: u64,
}

impl AnswerObservation {
    pub fn new(is_correct: bool, latency_ms: u64) -> Self {
        Self {
            is_correct,
            latency_ms,
        }
    }
}

/// Persistent record of one answered question, handed off with the summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub latency_ms: u64,
    pub answered_at: DateTime<Utc>,
}

/// A learner's history with a single question
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionHistory {
    pub attempts: u32,
    pub correct: u32,
    pub last_seen: Option<DateTime<Utc>>,
}

impl QuestionHistory {
    /// Laplace-smoothed accuracy; an unseen question scores 0.5
    pub fn smoothed_accuracy(&self) -> f64 {
        (f64::from(self.correct) + 1.0) / (f64::from(self.attempts) + 2.0)
    }

    pub fn record(&mut self, answer: &AnswerRecord) {
        self.attempts += 1;
        if answer.is_correct {
            self.correct += 1;
        }
        self.last_seen = Some(answer.answered_at);
    }
}

/// Learner state owned by the learner profile store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub learner_id: LearnerId,
    pub level: u32,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub history: HashMap<QuestionId, QuestionHistory>,
}

impl LearnerProfile {
    pub fn new(learner_id: impl Into<LearnerId>, level: u32) -> Self {
        Self {
            learner_id: learner_id.into(),
            level,
            xp: 0,
            history: HashMap::new(),
        }
    }
}
