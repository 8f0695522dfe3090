//! Scripted learner simulation

use anyhow::{Result, ensure};
use clap::Args;
use quizwise_core::{EngineConfig, Question};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::SessionArgs;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Probability of answering correctly
    #[arg(long, default_value_t = 0.75)]
    pub accuracy: f64,

    /// Answer latency in milliseconds
    #[arg(long, default_value_t = 8_000)]
    pub latency_ms: u64,

    /// Seed for both the simulated learner and the question draw
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the summary as JSON instead of a transcript
    #[arg(long)]
    pub json: bool,
}

/// Learner that answers correctly with a fixed probability
struct ScriptedLearner {
    rng: StdRng,
    accuracy: f64,
}

impl ScriptedLearner {
    fn new(accuracy: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, accuracy }
    }

    fn choose<'a>(&mut self, question: &'a Question) -> Option<&'a str> {
        let correct = question.correct_option()?;
        if self.rng.gen_bool(self.accuracy) {
            return Some(correct);
        }
        let wrong: Vec<&str> = question
            .options
            .iter()
            .map(String::as_str)
            .filter(|o| *o != correct)
            .collect();
        Some(wrong.choose(&mut self.rng).copied().unwrap_or(correct))
    }
}

pub async fn run(args: SimulateArgs, config: EngineConfig) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&args.accuracy),
        "--accuracy must be between 0.0 and 1.0"
    );

    let engine = super::build_engine(config, &args.session.bank, args.seed)?;
    let mut session = engine.start_session(args.session.start_request()).await?;
    let mut learner = ScriptedLearner::new(args.accuracy, args.seed);

    while let Some(question) = session.current_question().cloned() {
        let Some(selected) = learner.choose(&question) else {
            debug!(question_id = %question.id, "Skipping question without a correct option");
            session.advance()?;
            continue;
        };
        let outcome = match session.answer(selected, args.latency_ms).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Difficulty adjustment failed, keeping remaining questions");
                super::recorded_outcome(&question, selected)
            }
            Err(e) => return Err(e.into()),
        };

        if !args.json {
            let mark = if outcome.is_correct { "+" } else { "-" };
            let adjusted = if outcome.did_adjust {
                session
                    .current_difficulty()
                    .map(|d| format!("  -> {d}"))
                    .unwrap_or_default()
            } else {
                String::new()
            };
            println!(
                "{} [{}] {} {}{}",
                mark, question.difficulty, question.id, question.prompt, adjusted
            );
        }
        session.advance()?;
    }

    let summary = session.finish().await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        super::print_summary(&summary);
    }
    Ok(())
}
