//! Training commands

use anyhow::{Context, Result};

use hopper_rl::{report, Agent, Evaluator, Trainer, TrainingSummary};

use super::{RunSummary, Session};
use crate::config::Config;

/// Train only
pub async fn run(config: &Config) -> Result<()> {
    let mut session = Session::open(config).await?;
    let training = train(config, &mut session).await?;

    println!("{}", format_training(&training));

    RunSummary {
        training: Some(training),
        evaluation: None,
    }
    .write(config)
}

/// Train, then evaluate the learned policy on the same connection
pub async fn run_and_evaluate(config: &Config) -> Result<()> {
    let mut session = Session::open(config).await?;
    let training = train(config, &mut session).await?;

    let evaluator = Evaluator::new(config.evaluation.clone(), config.rewards)?;
    let evaluation = evaluator
        .evaluate(&mut session.link, &mut session.agent)
        .await?;

    println!("{}", format_training(&training));
    println!("{}", super::eval::format_evaluation(&evaluation));

    RunSummary {
        training: Some(training),
        evaluation: Some(evaluation),
    }
    .write(config)
}

async fn train(config: &Config, session: &mut Session) -> Result<TrainingSummary> {
    let trainer = Trainer::new(config.training.clone(), config.rewards)?;
    let summary = trainer.train(&mut session.link, &mut session.agent).await?;
    save_outputs(config, &session.agent, &summary)?;
    Ok(summary)
}

fn save_outputs(config: &Config, agent: &Agent, summary: &TrainingSummary) -> Result<()> {
    report::write_routes(&config.output.routes, &summary.routes)
        .with_context(|| format!("Failed to write route report {:?}", config.output.routes))?;
    agent
        .table()
        .save(&config.output.q_table)
        .with_context(|| format!("Failed to write Q-table {:?}", config.output.q_table))?;
    Ok(())
}

pub fn format_training(summary: &TrainingSummary) -> String {
    format!(
        "Training: {}/{} successes ({:.2}%) | deaths: {} | timeouts: {} | epsilon: {:.3}",
        summary.counts.successes,
        summary.episodes,
        summary.success_rate * 100.0,
        summary.counts.deaths,
        summary.counts.timeouts,
        summary.final_epsilon
    )
}
