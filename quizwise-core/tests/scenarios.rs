//! End-to-end session scenarios against the in-memory stores.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use quizwise_core::{
    AnswerOutcome, CandidateQuery, Difficulty, EngineConfig, EngineError, InMemoryLearnerStore,
    InMemoryQuestionStore, Question, QuestionId, QuestionStore, QuizEngine, QuizSession,
    SessionPhase, StartRequest, StoreError,
};

fn question(id: &str, category: &str, difficulty: Difficulty) -> Question {
    Question {
        id: QuestionId::from(id),
        prompt: format!("What about {id}?"),
        options: vec![
            "Pay yourself first".into(),
            "Spend it all".into(),
            "Borrow more".into(),
            "Ignore it".into(),
        ],
        correct_index: 0,
        explanation: Some("Saving comes before spending.".into()),
        category: category.into(),
        difficulty,
        approved: true,
    }
}

fn pool(category: &str, difficulty: Difficulty, n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| question(&format!("{category}-{difficulty}-{i}"), category, difficulty))
        .collect()
}

fn engine_with(questions: Vec<Question>) -> (QuizEngine, Arc<InMemoryLearnerStore>) {
    let profiles = Arc::new(InMemoryLearnerStore::new());
    let engine = QuizEngine::with_seed(
        EngineConfig::default(),
        Arc::new(InMemoryQuestionStore::new(questions)),
        profiles.clone(),
        2024,
    );
    (engine, profiles)
}

async fn answer_correctly(session: &mut QuizSession, latency_ms: u64) -> AnswerOutcome {
    let choice = session
        .current_question()
        .and_then(|q| q.correct_option())
        .unwrap()
        .to_string();
    session.answer(&choice, latency_ms).await.unwrap()
}

#[tokio::test]
async fn fast_streak_signals_but_short_tail_blocks_reflow() {
    let (engine, _) = engine_with(pool("saving", Difficulty::Easy, 20));
    let mut session = engine
        .start_session(
            StartRequest::new("learner-a")
                .with_category("saving")
                .with_difficulty(Difficulty::Easy)
                .with_question_count(3),
        )
        .await
        .unwrap();
    let served: Vec<_> = session.questions().iter().map(|q| q.id.clone()).collect();

    let mut last = None;
    for _ in 0..3 {
        last = Some(answer_correctly(&mut session, 2_000).await);
        session.advance().unwrap();
    }
    let last = last.unwrap();

    assert_eq!(last.signal.map(|s| s.suggested), Some(Difficulty::Medium));
    assert!(!last.did_adjust);
    assert!(session.adjustments().is_empty());
    let after: Vec<_> = session.questions().iter().map(|q| q.id.clone()).collect();
    assert_eq!(served, after);

    let summary = session.finish().await.unwrap();
    assert_eq!(summary.score, 3);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.percentage, 100);
}

#[tokio::test]
async fn fast_streak_with_long_tail_reflows_to_medium() {
    let mut questions = pool("saving", Difficulty::Easy, 20);
    questions.extend(pool("saving", Difficulty::Medium, 20));
    let (engine, profiles) = engine_with(questions);

    let mut session = engine
        .start_session(
            StartRequest::new("learner-b")
                .with_category("saving")
                .with_difficulty(Difficulty::Easy)
                .with_question_count(6),
        )
        .await
        .unwrap();

    let mut outcomes = Vec::new();
    for _ in 0..3 {
        outcomes.push(answer_correctly(&mut session, 2_000).await);
        session.advance().unwrap();
    }
    assert!(!outcomes[0].did_adjust);
    assert!(!outcomes[1].did_adjust);
    assert!(outcomes[2].did_adjust);
    assert_eq!(session.current_difficulty(), Some(Difficulty::Medium));

    let questions = session.questions();
    assert_eq!(questions.len(), 6);
    assert!(questions[..3].iter().all(|q| q.difficulty == Difficulty::Easy));
    assert!(questions[3..].iter().all(|q| q.difficulty == Difficulty::Medium));
    let distinct: HashSet<_> = questions.iter().map(|q| q.id.clone()).collect();
    assert_eq!(distinct.len(), 6);

    while session.current_question().is_some() {
        answer_correctly(&mut session, 6_000).await;
        session.advance().unwrap();
    }
    let summary = session.finish().await.unwrap();
    assert!(summary.score <= summary.total);
    assert_eq!(summary.difficulty_adjustments.len(), 1);
    assert_eq!(summary.difficulty_adjustments[0].from, Difficulty::Easy);
    assert_eq!(summary.difficulty_adjustments[0].to, Difficulty::Medium);
    assert_eq!(profiles.sessions().await.len(), 1);
}

/// Question store that remembers every query it served
struct RecordingStore {
    inner: InMemoryQuestionStore,
    queries: Mutex<Vec<CandidateQuery>>,
}

impl RecordingStore {
    fn new(questions: Vec<Question>) -> Self {
        Self {
            inner: InMemoryQuestionStore::new(questions),
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl QuestionStore for RecordingStore {
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<Vec<Question>, StoreError> {
        self.queries.lock().await.push(query.clone());
        self.inner.fetch_candidates(query).await
    }
}

#[tokio::test]
async fn reflow_excludes_every_scheduled_question() {
    let mut questions = pool("saving", Difficulty::Easy, 20);
    questions.extend(pool("saving", Difficulty::Medium, 20));
    let store = Arc::new(RecordingStore::new(questions));
    let engine = QuizEngine::with_seed(
        EngineConfig::default(),
        store.clone(),
        Arc::new(InMemoryLearnerStore::new()),
        7,
    );

    let mut session = engine
        .start_session(
            StartRequest::new("learner-b")
                .with_category("saving")
                .with_difficulty(Difficulty::Easy)
                .with_question_count(6),
        )
        .await
        .unwrap();
    let scheduled: HashSet<QuestionId> =
        session.questions().iter().map(|q| q.id.clone()).collect();
    assert_eq!(scheduled.len(), 6);

    for _ in 0..3 {
        answer_correctly(&mut session, 2_000).await;
        session.advance().unwrap();
    }
    assert_eq!(session.adjustments().len(), 1);

    let queries = store.queries.lock().await;
    assert_eq!(queries.len(), 2);
    let reflow = &queries[1];
    assert_eq!(reflow.difficulty, Difficulty::Medium);
    assert_eq!(reflow.category.as_deref(), Some("saving"));
    let excluded: HashSet<QuestionId> = reflow.exclude_ids.iter().cloned().collect();
    assert_eq!(excluded, scheduled);
}

/// Question store that ignores exclusions and always returns one pinned question
struct PinnedStore {
    inner: InMemoryQuestionStore,
    pinned: Question,
}

#[async_trait]
impl QuestionStore for PinnedStore {
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<Vec<Question>, StoreError> {
        let mut unfiltered = query.clone();
        unfiltered.exclude_ids.clear();
        let mut found = self.inner.fetch_candidates(&unfiltered).await?;
        found.push(self.pinned.clone());
        Ok(found)
    }
}

#[tokio::test]
async fn reflow_drops_repeats_from_a_store_ignoring_exclusions() {
    let easy = pool("saving", Difficulty::Easy, 6);
    let pinned = easy[0].clone();
    let mut questions = easy;
    questions.extend(pool("saving", Difficulty::Medium, 2));
    let engine = QuizEngine::with_seed(
        EngineConfig::default(),
        Arc::new(PinnedStore {
            inner: InMemoryQuestionStore::new(questions),
            pinned: pinned.clone(),
        }),
        Arc::new(InMemoryLearnerStore::new()),
        3,
    );

    let mut session = engine
        .start_session(
            StartRequest::new("learner-g")
                .with_difficulty(Difficulty::Easy)
                .with_question_count(6),
        )
        .await
        .unwrap();
    assert_eq!(session.questions().len(), 6);
    let first = session.questions()[0].id.clone();

    assert!(session.reflow(Difficulty::Medium).await.unwrap());

    let questions = session.questions();
    let ids: Vec<_> = questions.iter().map(|q| q.id.clone()).collect();
    let distinct: HashSet<_> = ids.iter().cloned().collect();
    assert_eq!(distinct.len(), ids.len());
    // Five slots to refill, only two fresh medium questions: truncated, not padded.
    assert_eq!(questions.len(), 3);
    assert_eq!(questions[0].id, first);
    assert!(questions[1..].iter().all(|q| q.difficulty == Difficulty::Medium));
    assert!(questions[1..].iter().all(|q| q.id != pinned.id));
}

#[tokio::test]
async fn empty_category_reports_no_content() {
    let (engine, _) = engine_with(pool("saving", Difficulty::Hard, 5));
    let mut session = engine.session();

    let err = session
        .start(
            StartRequest::new("learner-c")
                .with_category("crypto")
                .with_difficulty(Difficulty::Hard),
        )
        .await
        .unwrap_err();

    match err {
        EngineError::NoContentAvailable {
            category,
            difficulty,
            available,
            ..
        } => {
            assert_eq!(category, "crypto");
            assert_eq!(difficulty, Difficulty::Hard);
            assert_eq!(available, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(session.phase(), SessionPhase::Uninitialized);

    // The same session can still be started with content that exists.
    session
        .start(
            StartRequest::new("learner-c")
                .with_category("saving")
                .with_difficulty(Difficulty::Hard)
                .with_question_count(2),
        )
        .await
        .unwrap();
    assert_eq!(session.phase(), SessionPhase::Active);
}

struct OfflineStore;

#[async_trait]
impl QuestionStore for OfflineStore {
    async fn fetch_candidates(&self, _query: &CandidateQuery) -> Result<Vec<Question>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

#[tokio::test]
async fn store_outage_is_distinct_from_empty_pool() {
    let engine = QuizEngine::new(
        EngineConfig::default(),
        Arc::new(OfflineStore),
        Arc::new(InMemoryLearnerStore::new()),
    );

    let err = engine
        .start_session(StartRequest::new("learner-d").with_difficulty(Difficulty::Easy))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, EngineError::StoreUnavailable(_)));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn adaptive_sessions_revisit_missed_questions_first() {
    let (engine, _) = engine_with(pool("saving", Difficulty::Easy, 6));

    let mut first = engine
        .start_session(
            StartRequest::new("learner-e")
                .with_difficulty(Difficulty::Easy)
                .with_question_count(6)
                .with_randomization(false)
                .with_difficulty_adjustment(false),
        )
        .await
        .unwrap();
    let missed = first.current_question().unwrap().id.clone();
    first.answer("Spend it all", 8_000).await.unwrap();
    first.advance().unwrap();
    while first.current_question().is_some() {
        answer_correctly(&mut first, 8_000).await;
        first.advance().unwrap();
    }
    first.finish().await.unwrap();

    let second = engine
        .start_session(
            StartRequest::new("learner-e")
                .with_difficulty(Difficulty::Easy)
                .with_question_count(2)
                .with_randomization(false),
        )
        .await
        .unwrap();
    assert_eq!(second.questions()[0].id, missed);
}

#[tokio::test]
async fn config_file_drives_session_defaults() {
    let config = EngineConfig::from_toml_str(
        r#"
        [session]
        questions_count = 4
        enable_randomization = false
        "#,
    )
    .unwrap();
    let engine = QuizEngine::new(
        config,
        Arc::new(InMemoryQuestionStore::new(pool("saving", Difficulty::Easy, 10))),
        Arc::new(InMemoryLearnerStore::new()),
    );

    let session = engine
        .start_session(StartRequest::new("learner-f").with_difficulty(Difficulty::Easy))
        .await
        .unwrap();
    assert_eq!(session.questions().len(), 4);
    assert_eq!(engine.randomizer().history_len().await, 0);
}
