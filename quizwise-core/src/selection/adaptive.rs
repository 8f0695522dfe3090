//! Weakest-first selection.
//!
//! Used when randomization is disabled. Ranks candidates by the learner's
//! smoothed accuracy on each question, so questions they keep missing come
//! first, then unseen ones, then ones they have mastered. Ties go to the
//! question seen longest ago.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{DrawRequest, QuestionSelector, dedupe_by_id};
use crate::error::Result;
use crate::store::{LearnerProfileStore, QuestionStore};
use crate::types::{Question, QuestionHistory};

/// Deterministic selector driven by the learner's answer history
pub struct AdaptiveSelector {
    questions: Arc<dyn QuestionStore>,
    profiles: Arc<dyn LearnerProfileStore>,
}

impl AdaptiveSelector {
    pub fn new(questions: Arc<dyn QuestionStore>, profiles: Arc<dyn LearnerProfileStore>) -> Self {
        Self {
            questions,
            profiles,
        }
    }
}

fn weakest_first(a: (&Question, &QuestionHistory), b: (&Question, &QuestionHistory)) -> Ordering {
    let (qa, ha) = a;
    let (qb, hb) = b;
    ha.smoothed_accuracy()
        .total_cmp(&hb.smoothed_accuracy())
        .then_with(|| ha.last_seen.cmp(&hb.last_seen))
        .then_with(|| qa.id.cmp(&qb.id))
}

#[async_trait]
impl QuestionSelector for AdaptiveSelector {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    async fn draw(&self, request: &DrawRequest) -> Result<Vec<Question>> {
        if request.count == 0 {
            return Ok(Vec::new());
        }

        let candidates = self
            .questions
            .fetch_candidates(&request.candidate_query())
            .await
            .inspect_err(|e| warn!(error = %e, "Question store fetch failed"))?;
        let candidates = dedupe_by_id(candidates);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let profile = self
            .profiles
            .profile(&request.learner_id)
            .await
            .inspect_err(|e| warn!(learner_id = %request.learner_id, error = %e, "Learner profile fetch failed"))?;

        let unseen = QuestionHistory::default();
        let mut ranked: Vec<(&Question, &QuestionHistory)> = candidates
            .iter()
            .map(|q| {
                let history = profile
                    .as_ref()
                    .and_then(|p| p.history.get(&q.id))
                    .unwrap_or(&unseen);
                (q, history)
            })
            .collect();
        ranked.sort_by(|a, b| weakest_first(*a, *b));

        let selected: Vec<Question> = ranked
            .into_iter()
            .take(request.count)
            .map(|(q, _)| q.clone())
            .collect();

        info!(
            learner_id = %request.learner_id,
            category = request.category_label(),
            difficulty = %request.difficulty,
            requested = request.count,
            drawn = selected.len(),
            "Selected weakest questions"
        );
        Ok(selected)
    }

    async fn reset(&self) {}
}
