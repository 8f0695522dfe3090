pub mod bank;
pub mod play;
pub mod simulate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use quizwise_core::{
    AnswerOutcome, Difficulty, EngineConfig, InMemoryLearnerStore, InMemoryQuestionStore,
    Question, QuizEngine, SessionSummary, StartRequest,
};

/// Session options shared by `play` and `simulate`
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Question bank (JSON list of questions)
    #[arg(long)]
    pub bank: PathBuf,

    /// Learner identifier
    #[arg(long, default_value = "local")]
    pub learner: String,

    /// Restrict questions to one category
    #[arg(long)]
    pub category: Option<String>,

    /// Starting difficulty (easy, medium, hard)
    #[arg(long)]
    pub difficulty: Option<Difficulty>,

    /// Number of questions
    #[arg(long)]
    pub count: Option<usize>,

    /// Keep the starting difficulty for the whole session
    #[arg(long)]
    pub no_adjust: bool,

    /// Serve weakest questions first instead of a random draw
    #[arg(long)]
    pub no_randomize: bool,
}

impl SessionArgs {
    pub fn start_request(&self) -> StartRequest {
        let mut request = StartRequest::new(self.learner.as_str());
        request.category = self.category.clone();
        request.initial_difficulty = self.difficulty;
        request.question_count = self.count;
        if self.no_adjust {
            request.enable_difficulty_adjustment = Some(false);
        }
        if self.no_randomize {
            request.enable_randomization = Some(false);
        }
        request
    }
}

/// Load a question bank file into an in-memory store
pub fn load_bank(path: &Path) -> Result<InMemoryQuestionStore> {
    InMemoryQuestionStore::from_json_file(path)
        .with_context(|| format!("Failed to load question bank {}", path.display()))
}

/// Engine over a bank file with a fresh learner store
pub fn build_engine(config: EngineConfig, bank: &Path, seed: Option<u64>) -> Result<QuizEngine> {
    let questions = Arc::new(load_bank(bank)?);
    let profiles = Arc::new(InMemoryLearnerStore::new());
    Ok(match seed {
        Some(seed) => QuizEngine::with_seed(config, questions, profiles, seed),
        None => QuizEngine::new(config, questions, profiles),
    })
}

/// Outcome of an answer the session recorded without adjusting difficulty
pub fn recorded_outcome(question: &Question, selected: &str) -> AnswerOutcome {
    AnswerOutcome {
        is_correct: question.is_correct(selected),
        did_adjust: false,
        correct_option: question.correct_option().unwrap_or_default().to_string(),
        explanation: question.explanation.clone(),
        signal: None,
    }
}

pub fn print_summary(summary: &SessionSummary) {
    println!();
    println!(
        "Score: {}/{} ({}%)",
        summary.score, summary.total, summary.percentage
    );
    if summary.difficulty_adjustments.is_empty() {
        println!("Difficulty unchanged");
    } else {
        println!("Difficulty changes:");
        for event in &summary.difficulty_adjustments {
            println!(
                "  after question {}: {} -> {} ({})",
                event.at_index + 1,
                event.from,
                event.to,
                event.reason
            );
        }
    }
}
