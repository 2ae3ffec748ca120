//! Route report for successful episodes

use std::fmt::Write as _;
use std::path::Path;

use chrono::Utc;
use tracing::info;

use hopper_core::Result;

use crate::episode::EpisodeOutcome;

/// Render one section per successful episode
pub fn render_routes(routes: &[EpisodeOutcome]) -> String {
    let mut out = String::from("# Successful Routes\n\n");
    let _ = writeln!(out, "_Generated {}_\n", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    for outcome in routes {
        let _ = writeln!(
            out,
            "## Episode {} ({} steps)",
            outcome.episode, outcome.steps
        );
        for step in &outcome.route {
            let _ = writeln!(out, "- {step}");
        }
        out.push('\n');
    }
    out
}

pub fn write_routes(path: &Path, routes: &[EpisodeOutcome]) -> Result<()> {
    std::fs::write(path, render_routes(routes))?;
    info!("{} successful routes written to {:?}", routes.len(), path);
    Ok(())
}
