//! Question bank inventory

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use quizwise_core::Difficulty;

#[derive(Args, Debug)]
pub struct BankArgs {
    /// Question bank (JSON list of questions)
    #[arg(long)]
    pub bank: PathBuf,
}

pub async fn run(args: BankArgs) -> Result<()> {
    let store = super::load_bank(&args.bank)?;
    let counts = store.category_counts().await;

    if counts.is_empty() {
        println!("No approved questions in {}", args.bank.display());
        return Ok(());
    }

    println!("{:<24} {:>6} {:>8} {:>6}", "CATEGORY", "EASY", "MEDIUM", "HARD");
    let mut category: Option<&str> = None;
    for (name, _) in counts.keys() {
        if category == Some(name.as_str()) {
            continue;
        }
        category = Some(name.as_str());
        let count = |d: Difficulty| counts.get(&(name.clone(), d)).copied().unwrap_or(0);
        println!(
            "{:<24} {:>6} {:>8} {:>6}",
            name,
            count(Difficulty::Easy),
            count(Difficulty::Medium),
            count(Difficulty::Hard)
        );
    }
    println!();
    println!("{} approved questions", counts.values().sum::<usize>());
    Ok(())
}
