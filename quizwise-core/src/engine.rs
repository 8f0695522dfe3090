//! Engine facade wiring stores, selectors and configuration together.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::selection::{AdaptiveSelector, Randomizer};
use crate::session::{QuizSession, StartRequest};
use crate::store::{LearnerProfileStore, QuestionStore};

/// Shared entry point for creating quiz sessions.
///
/// The randomizer (and its sequence history) is shared by every session the
/// engine creates, so repetition is avoided across learners and sittings.
pub struct QuizEngine {
    config: EngineConfig,
    profiles: Arc<dyn LearnerProfileStore>,
    randomizer: Arc<Randomizer>,
    adaptive: Arc<AdaptiveSelector>,
}

impl QuizEngine {
    pub fn new(
        config: EngineConfig,
        questions: Arc<dyn QuestionStore>,
        profiles: Arc<dyn LearnerProfileStore>,
    ) -> Self {
        let randomizer = Randomizer::new(Arc::clone(&questions), config.randomizer.clone());
        Self::with_randomizer(config, questions, profiles, randomizer)
    }

    /// Create an engine whose randomizer uses a fixed seed (for testing).
    pub fn with_seed(
        config: EngineConfig,
        questions: Arc<dyn QuestionStore>,
        profiles: Arc<dyn LearnerProfileStore>,
        seed: u64,
    ) -> Self {
        let randomizer =
            Randomizer::with_seed(Arc::clone(&questions), config.randomizer.clone(), seed);
        Self::with_randomizer(config, questions, profiles, randomizer)
    }

    fn with_randomizer(
        config: EngineConfig,
        questions: Arc<dyn QuestionStore>,
        profiles: Arc<dyn LearnerProfileStore>,
        randomizer: Randomizer,
    ) -> Self {
        let adaptive = AdaptiveSelector::new(questions, Arc::clone(&profiles));
        Self {
            config,
            profiles,
            randomizer: Arc::new(randomizer),
            adaptive: Arc::new(adaptive),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn randomizer(&self) -> &Arc<Randomizer> {
        &self.randomizer
    }

    /// A new, uninitialized session
    pub fn session(&self) -> QuizSession {
        QuizSession::new(
            self.config.clone(),
            self.randomizer.clone(),
            self.adaptive.clone(),
            Arc::clone(&self.profiles),
        )
    }

    /// Create a session and start it.
    pub async fn start_session(&self, request: StartRequest) -> Result<QuizSession> {
        let mut session = self.session();
        session.start(request).await?;
        Ok(session)
    }
}
