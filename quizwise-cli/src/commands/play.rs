//! Interactive play on stdin/stdout

use std::time::Instant;

use anyhow::{Result, bail};
use clap::Args;
use quizwise_core::{EngineConfig, EngineError, Question};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use super::SessionArgs;

#[derive(Args, Debug)]
pub struct PlayArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

pub async fn run(args: PlayArgs, config: EngineConfig) -> Result<()> {
    let engine = super::build_engine(config, &args.session.bank, None)?;
    let mut session = engine.start_session(args.session.start_request()).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Answer with the option number, or 'q' to quit.");
    while let Some(question) = session.current_question().cloned() {
        let index = session.cursor().unwrap_or_default();
        print_question(index, session.questions().len(), &question);

        let asked_at = Instant::now();
        let outcome = loop {
            let Some(line) = lines.next_line().await? else {
                let summary = session.abandon()?;
                println!("\nSession abandoned after {} answers", summary.answers.len());
                return Ok(());
            };
            let input = line.trim();
            if input.eq_ignore_ascii_case("q") {
                let summary = session.abandon()?;
                println!("Session abandoned after {} answers", summary.answers.len());
                return Ok(());
            }
            let Some(selected) = parse_choice(input, &question) else {
                println!("Enter a number between 1 and {}", question.options.len());
                continue;
            };
            let latency_ms = u64::try_from(asked_at.elapsed().as_millis()).unwrap_or(u64::MAX);
            match session.answer(selected, latency_ms).await {
                Ok(outcome) => break outcome,
                Err(EngineError::InvalidAnswer(reason)) => println!("{reason}"),
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "Difficulty adjustment failed, keeping remaining questions");
                    break super::recorded_outcome(&question, selected);
                }
                Err(e) => bail!(e),
            }
        };

        if outcome.is_correct {
            println!("Correct!");
        } else {
            println!("Wrong. The answer was: {}", outcome.correct_option);
        }
        if let Some(explanation) = &outcome.explanation {
            println!("{explanation}");
        }
        if outcome.did_adjust
            && let Some(difficulty) = session.current_difficulty()
        {
            println!("Difficulty is now {difficulty}");
        }
        session.advance()?;
    }

    let summary = session.finish().await?;
    super::print_summary(&summary);
    Ok(())
}

fn print_question(index: usize, total: usize, question: &Question) {
    println!();
    println!(
        "[{}/{}] ({}, {}) {}",
        index + 1,
        total,
        question.category,
        question.difficulty,
        question.prompt
    );
    for (i, option) in question.options.iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }
}

/// Option text for a 1-based choice number
fn parse_choice<'a>(input: &str, question: &'a Question) -> Option<&'a str> {
    let n: usize = input.parse().ok()?;
    question
        .options
        .get(n.checked_sub(1)?)
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizwise_core::{Difficulty, QuestionId};

    fn question() -> Question {
        Question {
            id: QuestionId::from("q1"),
            prompt: "Which is an asset?".into(),
            options: vec!["Savings".into(), "Debt".into()],
            correct_index: 0,
            explanation: None,
            category: "basics".into(),
            difficulty: Difficulty::Easy,
            approved: true,
        }
    }

    #[test]
    fn test_choice_numbers_are_one_based() {
        let q = question();
        assert_eq!(parse_choice("1", &q), Some("Savings"));
        assert_eq!(parse_choice("2", &q), Some("Debt"));
        assert_eq!(parse_choice("0", &q), None);
        assert_eq!(parse_choice("3", &q), None);
        assert_eq!(parse_choice("Savings", &q), None);
    }
}
