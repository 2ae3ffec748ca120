//! Evaluation command

use anyhow::Result;

use hopper_rl::{EvaluationSummary, Evaluator};

use super::{RunSummary, Session};
use crate::config::Config;

/// Evaluate the saved table; nothing is written back
pub async fn run(config: &Config) -> Result<()> {
    let mut session = Session::open(config).await?;
    let evaluator = Evaluator::new(config.evaluation.clone(), config.rewards)?;
    let evaluation = evaluator
        .evaluate(&mut session.link, &mut session.agent)
        .await?;

    println!("{}", format_evaluation(&evaluation));

    RunSummary {
        training: None,
        evaluation: Some(evaluation),
    }
    .write(config)
}

pub fn format_evaluation(summary: &EvaluationSummary) -> String {
    format!(
        "Test: {}/{} successes ({:.2}%)",
        summary.counts.successes,
        summary.episodes,
        summary.success_rate * 100.0
    )
}
