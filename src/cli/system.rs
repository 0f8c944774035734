//! Doctor and reset handlers

use crate::cli::AppContext;
use crate::cli::output::{heading, notice, print_json, success};
use crate::error::Result;
use crate::service::doctor::{self, CheckStatus};
use colored::Colorize;
use serde_json::json;

pub async fn handle_doctor(ctx: &AppContext) -> Result<()> {
    let report = doctor::run(&ctx.data_dir, &ctx.keys).await;
    if ctx.json {
        return print_json(&report);
    }
    heading("CodeMaster environment check");
    for check in &report.checks {
        let mark = match check.status {
            CheckStatus::Ok => "✓".green(),
            CheckStatus::Warn => "!".yellow(),
            CheckStatus::Fail => "✗".red(),
        };
        println!("  {mark} {:<16} {}", check.name, check.detail);
    }
    println!();
    if report.healthy() {
        success("Ready");
    } else {
        println!("{}", "Some checks failed".red().bold());
    }
    Ok(())
}

/// Delete every piece of local state, then recreate an empty data
/// directory with a freshly seeded database.
pub async fn handle_reset(ctx: &mut AppContext, yes: bool) -> Result<()> {
    if !yes {
        notice(&format!(
            "This deletes {} including settings, tutorial progress and caches.\nRe-run with --yes to confirm.",
            ctx.data_dir.root().display()
        ));
        return Ok(());
    }
    let removed = ctx.data_dir.wipe()?;
    ctx.data_dir.ensure()?;
    let engine = ctx.engine().await?;
    let progress = engine.progress().await?;
    engine.close().await;

    if ctx.json {
        return print_json(&json!({
            "data_dir": ctx.data_dir.root(),
            "removed": removed,
            "tutorial_progress": progress.len(),
        }));
    }
    if removed {
        success(&format!("Removed {}", ctx.data_dir.root().display()));
    }
    success("Fresh database initialized");
    Ok(())
}
