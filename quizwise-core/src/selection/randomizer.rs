//! Anti-repetition randomizer.
//!
//! Draws a random subset of the eligible questions and remembers which sets it
//! has served recently, so that back-to-back sessions for the same
//! category/difficulty do not repeat the same questions.
//!
//! ## Draw loop
//!
//! 1. Fetch all eligible candidates from the question store.
//! 2. Shuffle the candidates (Fisher-Yates) and take the first `count`.
//! 3. Hash the drawn ids (order-independent). If a retained record has the
//!    same hash, category and difficulty within the cooldown window, retry.
//! 4. After `max_attempts` collisions the last draw is accepted anyway.
//! 5. Shuffle each question's options and record the served set.
//!
//! Repetition avoidance is best-effort: with a pool of exactly `count`
//! questions every draw is the same set and is accepted after the retries.
//!
//! The sequence history is shared by every session using this randomizer.
//! Steps 2-5 run under one mutex so two sessions cannot both pass the
//! collision check for the same set.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{DrawRequest, QuestionSelector, dedupe_by_id};
use crate::config::RandomizerConfig;
use crate::error::Result;
use crate::store::QuestionStore;
use crate::types::{Difficulty, Question, QuestionId};

/// Order-independent SHA-256 hash of a served question-id set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceHash(pub [u8; 32]);

impl SequenceHash {
    /// Hash a set of ids; the order they are given in does not matter
    pub fn from_ids<'a>(ids: impl IntoIterator<Item = &'a QuestionId>) -> Self {
        let mut sorted: Vec<&str> = ids.into_iter().map(QuestionId::as_str).collect();
        sorted.sort_unstable();

        let mut hasher = Sha256::new();
        for id in sorted {
            hasher.update(id.as_bytes());
            hasher.update([0u8]);
        }
        Self(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 12 hex characters, for logs
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

/// A question set served at some point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub hash: SequenceHash,
    pub category: Option<String>,
    pub difficulty: Difficulty,
    pub served_at: DateTime<Utc>,
}

impl SequenceRecord {
    fn blocks(
        &self,
        hash: &SequenceHash,
        category: &Option<String>,
        difficulty: Difficulty,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> bool {
        self.hash == *hash
            && self.category == *category
            && self.difficulty == difficulty
            && now - self.served_at < cooldown
    }
}

/// Outcome of a single draw
#[derive(Debug, Clone, PartialEq)]
pub struct DrawReport {
    pub questions: Vec<Question>,
    /// Attempts made (0 when nothing was drawn)
    pub attempts: u32,
    /// Attempts rejected because the set was served recently
    pub collisions: u32,
    /// Hash of the accepted set, `None` when nothing was drawn
    pub hash: Option<SequenceHash>,
}

impl DrawReport {
    fn empty() -> Self {
        Self {
            questions: Vec::new(),
            attempts: 0,
            collisions: 0,
            hash: None,
        }
    }

    /// True when the accepted set was itself a recent repeat
    pub fn accepted_repeat(&self) -> bool {
        self.attempts > 0 && self.collisions == self.attempts
    }
}

/// State guarded by the randomizer mutex
struct RandomizerState {
    rng: StdRng,
    history: VecDeque<SequenceRecord>,
}

/// Randomized selector with sequence-level repetition avoidance
pub struct Randomizer {
    store: Arc<dyn QuestionStore>,
    config: RandomizerConfig,
    state: Mutex<RandomizerState>,
}

impl Randomizer {
    pub fn new(store: Arc<dyn QuestionStore>, config: RandomizerConfig) -> Self {
        Self::with_rng(store, config, StdRng::from_entropy())
    }

    /// Create a randomizer with a fixed seed (for testing).
    pub fn with_seed(store: Arc<dyn QuestionStore>, config: RandomizerConfig, seed: u64) -> Self {
        Self::with_rng(store, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: Arc<dyn QuestionStore>, config: RandomizerConfig, rng: StdRng) -> Self {
        Self {
            store,
            config,
            state: Mutex::new(RandomizerState {
                rng,
                history: VecDeque::new(),
            }),
        }
    }

    pub fn config(&self) -> &RandomizerConfig {
        &self.config
    }

    fn cooldown(&self) -> Duration {
        Duration::hours(i64::from(self.config.cooldown_hours))
    }

    /// Number of retained sequence records
    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }

    /// Snapshot of retained sequence records, oldest first
    pub async fn history(&self) -> Vec<SequenceRecord> {
        self.state.lock().await.history.iter().cloned().collect()
    }

    /// Draw questions and report how the draw went.
    pub async fn draw_report(&self, request: &DrawRequest) -> Result<DrawReport> {
        self.draw_report_at(request, Utc::now()).await
    }

    async fn draw_report_at(&self, request: &DrawRequest, now: DateTime<Utc>) -> Result<DrawReport> {
        if request.count == 0 {
            return Ok(DrawReport::empty());
        }

        let candidates = match self.store.fetch_candidates(&request.candidate_query()).await {
            Ok(candidates) => dedupe_by_id(candidates),
            Err(e) => {
                warn!(
                    category = request.category_label(),
                    difficulty = %request.difficulty,
                    error = %e,
                    "Question store fetch failed"
                );
                return Err(e.into());
            }
        };

        if candidates.is_empty() {
            info!(
                category = request.category_label(),
                difficulty = %request.difficulty,
                "No candidates for draw"
            );
            return Ok(DrawReport::empty());
        }

        let take = request.count.min(candidates.len());
        let cooldown = self.cooldown();
        let max_attempts = self.config.max_attempts.max(1);

        let mut state = self.state.lock().await;
        state.history.retain(|r| now - r.served_at < cooldown);

        let mut order: Vec<usize> = (0..candidates.len()).collect();
        let mut attempts = 0;
        let mut collisions = 0;
        let mut hash;
        loop {
            attempts += 1;
            order.shuffle(&mut state.rng);
            hash = SequenceHash::from_ids(order[..take].iter().map(|&i| &candidates[i].id));

            let collided = state.history.iter().any(|r| {
                r.blocks(&hash, &request.category, request.difficulty, now, cooldown)
            });
            if !collided {
                break;
            }
            collisions += 1;
            debug!(attempt = attempts, hash = %hash.short(), "Drawn set served recently, retrying");
            if attempts >= max_attempts {
                break;
            }
        }

        let mut questions: Vec<Question> =
            order[..take].iter().map(|&i| candidates[i].clone()).collect();
        for question in &mut questions {
            shuffle_options(question, &mut state.rng);
        }

        state.history.push_back(SequenceRecord {
            hash,
            category: request.category.clone(),
            difficulty: request.difficulty,
            served_at: now,
        });
        while state.history.len() > self.config.max_sequence_cache {
            if let Some(evicted) = state.history.pop_front() {
                debug!(hash = %evicted.hash.short(), "Evicted oldest sequence record");
            }
        }
        drop(state);

        if collisions == attempts {
            warn!(
                attempts,
                hash = %hash.short(),
                "Accepted recently served set after exhausting attempts"
            );
        }
        info!(
            category = request.category_label(),
            difficulty = %request.difficulty,
            requested = request.count,
            drawn = questions.len(),
            attempts,
            hash = %hash.short(),
            "Drew questions"
        );

        Ok(DrawReport {
            questions,
            attempts,
            collisions,
            hash: Some(hash),
        })
    }
}

#[async_trait]
impl QuestionSelector for Randomizer {
    fn name(&self) -> &'static str {
        "randomizer"
    }

    async fn draw(&self, request: &DrawRequest) -> Result<Vec<Question>> {
        Ok(self.draw_report(request).await?.questions)
    }

    async fn reset(&self) {
        self.state.lock().await.history.clear();
    }
}

/// Reorder a question's options, keeping `correct_index` on the right one
fn shuffle_options(question: &mut Question, rng: &mut StdRng) {
    if question.correct_index >= question.options.len() {
        return;
    }
    let mut order: Vec<usize> = (0..question.options.len()).collect();
    order.shuffle(rng);

    let original = std::mem::take(&mut question.options);
    question.options = order.iter().map(|&i| original[i].clone()).collect();
    if let Some(pos) = order.iter().position(|&i| i == question.correct_index) {
        question.correct_index = pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::error::{EngineError, StoreError};
    use crate::store::{CandidateQuery, InMemoryQuestionStore};

    fn question(id: usize, difficulty: Difficulty) -> Question {
        Question {
            id: QuestionId(format!("q{id}")),
            prompt: format!("Question {id}"),
            options: vec![
                format!("right-{id}"),
                format!("wrong-a-{id}"),
                format!("wrong-b-{id}"),
                format!("wrong-c-{id}"),
            ],
            correct_index: 0,
            explanation: None,
            category: "budgeting".into(),
            difficulty,
            approved: true,
        }
    }

    fn pool(n: usize) -> Arc<dyn QuestionStore> {
        Arc::new(InMemoryQuestionStore::new(
            (0..n).map(|i| question(i, Difficulty::Easy)).collect(),
        ))
    }

    fn request(count: usize) -> DrawRequest {
        DrawRequest::new("learner", Difficulty::Easy, count).with_category("budgeting")
    }

    struct BrokenStore;

    #[async_trait]
    impl QuestionStore for BrokenStore {
        async fn fetch_candidates(
            &self,
            _query: &CandidateQuery,
        ) -> std::result::Result<Vec<Question>, StoreError> {
            Err(StoreError::Unavailable("connection reset".into()))
        }
    }

    #[test]
    fn test_sequence_hash_is_order_independent() {
        let a = [QuestionId::from("q1"), QuestionId::from("q2")];
        let b = [QuestionId::from("q2"), QuestionId::from("q1")];
        assert_eq!(SequenceHash::from_ids(&a), SequenceHash::from_ids(&b));
        assert_ne!(
            SequenceHash::from_ids(&a),
            SequenceHash::from_ids(&[QuestionId::from("q1")])
        );
        assert_eq!(SequenceHash::from_ids(&a).to_hex().len(), 64);
    }

    #[test]
    fn test_sequence_hash_does_not_concatenate_ids() {
        let joined = [QuestionId::from("ab")];
        let split = [QuestionId::from("a"), QuestionId::from("b")];
        assert_ne!(SequenceHash::from_ids(&joined), SequenceHash::from_ids(&split));
    }

    #[test]
    fn test_shuffle_options_tracks_correct_answer() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut q = question(1, Difficulty::Easy);
            shuffle_options(&mut q, &mut rng);
            assert_eq!(q.correct_option(), Some("right-1"));
            assert_eq!(q.options.len(), 4);
        }
    }

    #[tokio::test]
    async fn test_draw_has_no_duplicates() {
        let randomizer = Randomizer::with_seed(pool(20), RandomizerConfig::default(), 1);
        for count in [1, 5, 10, 20] {
            let drawn = randomizer.draw(&request(count)).await.unwrap();
            assert_eq!(drawn.len(), count);
            let ids: HashSet<_> = drawn.iter().map(|q| q.id.clone()).collect();
            assert_eq!(ids.len(), count);
        }
    }

    #[tokio::test]
    async fn test_duplicate_candidates_are_collapsed() {
        let mut questions: Vec<_> = (0..3).map(|i| question(i, Difficulty::Easy)).collect();
        questions.push(question(0, Difficulty::Easy));
        let store: Arc<dyn QuestionStore> = Arc::new(InMemoryQuestionStore::new(questions));
        let randomizer = Randomizer::with_seed(store, RandomizerConfig::default(), 3);

        let drawn = randomizer.draw(&request(4)).await.unwrap();
        let ids: HashSet<_> = drawn.iter().map(|q| q.id.clone()).collect();
        assert_eq!(drawn.len(), 3);
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_exact_pool_repeat_is_accepted_after_retries() {
        let randomizer = Randomizer::with_seed(pool(4), RandomizerConfig::default(), 42);

        let first = randomizer.draw_report(&request(4)).await.unwrap();
        assert_eq!(first.attempts, 1);
        assert_eq!(first.collisions, 0);

        let second = randomizer.draw_report(&request(4)).await.unwrap();
        assert_eq!(second.attempts, 10);
        assert_eq!(second.collisions, 10);
        assert!(second.accepted_repeat());
        assert_eq!(second.hash, first.hash);
        assert_eq!(randomizer.history_len().await, 2);
    }

    #[tokio::test]
    async fn test_other_difficulty_does_not_collide() {
        let mut questions: Vec<_> = (0..3).map(|i| question(i, Difficulty::Easy)).collect();
        questions.extend((0..3).map(|i| question(i, Difficulty::Medium)));
        let store: Arc<dyn QuestionStore> = Arc::new(InMemoryQuestionStore::new(questions));
        let randomizer = Randomizer::with_seed(store, RandomizerConfig::default(), 5);

        randomizer.draw_report(&request(3)).await.unwrap();
        let medium = DrawRequest::new("learner", Difficulty::Medium, 3).with_category("budgeting");
        let report = randomizer.draw_report(&medium).await.unwrap();
        assert_eq!(report.collisions, 0);
    }

    #[tokio::test]
    async fn test_expired_records_do_not_collide_and_are_pruned() {
        let randomizer = Randomizer::with_seed(pool(3), RandomizerConfig::default(), 9);
        let yesterday = Utc::now() - Duration::hours(25);

        randomizer.draw_report_at(&request(3), yesterday).await.unwrap();
        assert_eq!(randomizer.history_len().await, 1);

        let report = randomizer.draw_report(&request(3)).await.unwrap();
        assert_eq!(report.attempts, 1);
        assert_eq!(report.collisions, 0);
        assert_eq!(randomizer.history_len().await, 1);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let config = RandomizerConfig {
            max_sequence_cache: 3,
            ..RandomizerConfig::default()
        };
        let randomizer = Randomizer::with_seed(pool(30), config, 11);
        for _ in 0..8 {
            randomizer.draw(&request(2)).await.unwrap();
        }
        assert_eq!(randomizer.history_len().await, 3);
    }

    #[tokio::test]
    async fn test_empty_pool_returns_empty_without_record() {
        let randomizer = Randomizer::with_seed(pool(0), RandomizerConfig::default(), 2);
        let report = randomizer.draw_report(&request(5)).await.unwrap();
        assert!(report.questions.is_empty());
        assert_eq!(report.attempts, 0);
        assert!(report.hash.is_none());
        assert_eq!(randomizer.history_len().await, 0);
    }

    #[tokio::test]
    async fn test_zero_count_draws_nothing() {
        let randomizer = Randomizer::with_seed(pool(5), RandomizerConfig::default(), 2);
        assert!(randomizer.draw(&request(0)).await.unwrap().is_empty());
        assert_eq!(randomizer.history_len().await, 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_an_error_not_empty() {
        let randomizer =
            Randomizer::with_seed(Arc::new(BrokenStore), RandomizerConfig::default(), 2);
        let err = randomizer.draw(&request(5)).await.unwrap_err();
        assert!(matches!(err, EngineError::StoreUnavailable(_)));
        assert_eq!(randomizer.history_len().await, 0);
    }

    #[tokio::test]
    async fn test_reset_clears_history() {
        let randomizer = Randomizer::with_seed(pool(4), RandomizerConfig::default(), 8);
        randomizer.draw(&request(4)).await.unwrap();
        randomizer.reset().await;
        assert_eq!(randomizer.history_len().await, 0);

        let report = randomizer.draw_report(&request(4)).await.unwrap();
        assert_eq!(report.collisions, 0);
    }
}
