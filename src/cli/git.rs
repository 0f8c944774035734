//! Git command handlers

use crate::cli::output::{heading, notice, print_json, print_table, success, truncate};
use crate::cli::{AppContext, GitCommands};
use crate::error::Result;
use crate::service::GitRepo;
use colored::Colorize;
use tabled::Tabled;

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "State")]
    state: &'static str,
    #[tabled(rename = "Staged")]
    staged: bool,
    #[tabled(rename = "Path")]
    path: String,
}

#[derive(Tabled)]
struct CommitRow {
    #[tabled(rename = "Commit")]
    hash: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Subject")]
    subject: String,
}

pub async fn handle(ctx: &AppContext, cmd: GitCommands) -> Result<()> {
    match cmd {
        GitCommands::Status { repo } => {
            let status = GitRepo::new(repo).status().await?;
            if ctx.json {
                return print_json(&status);
            }
            heading(&format!(
                "On branch {}",
                status.branch.as_deref().unwrap_or("(detached)")
            ));
            if status.is_clean() {
                success("Working tree clean");
                return Ok(());
            }
            print_table(
                status
                    .entries
                    .iter()
                    .map(|e| StatusRow {
                        state: e.describe(),
                        staged: e.is_staged(),
                        path: match &e.orig_path {
                            Some(from) => format!("{from} -> {}", e.path),
                            None => e.path.clone(),
                        },
                    })
                    .collect(),
            );
        }
        GitCommands::Log { repo, limit } => {
            let commits = GitRepo::new(repo).log(limit).await?;
            if ctx.json {
                return print_json(&commits);
            }
            if commits.is_empty() {
                notice("No commits yet.");
                return Ok(());
            }
            print_table(
                commits
                    .into_iter()
                    .map(|c| CommitRow {
                        hash: c.hash.chars().take(8).collect(),
                        date: c.date,
                        author: c.author,
                        subject: truncate(&c.subject, 60),
                    })
                    .collect(),
            );
        }
        GitCommands::Diff { repo, staged } => {
            let diff = GitRepo::new(repo).diff(staged).await?;
            if ctx.json {
                return print_json(&serde_json::json!({ "staged": staged, "diff": diff }));
            }
            if diff.is_empty() {
                notice("No changes.");
            }
            for line in diff.lines() {
                if line.starts_with('+') && !line.starts_with("+++") {
                    println!("{}", line.green());
                } else if line.starts_with('-') && !line.starts_with("---") {
                    println!("{}", line.red());
                } else if line.starts_with("@@") {
                    println!("{}", line.cyan());
                } else {
                    println!("{line}");
                }
            }
        }
        GitCommands::Branches { repo } => {
            let branches = GitRepo::new(repo).branches().await?;
            if ctx.json {
                return print_json(&branches);
            }
            for b in branches {
                if b.current {
                    println!("{} {}", "*".green(), b.name.green().bold());
                } else {
                    println!("  {}", b.name);
                }
            }
        }
        GitCommands::Init { repo } => {
            let git = GitRepo::new(repo);
            git.init().await?;
            success(&format!("Initialized repository in {}", git.root().display()));
        }
        GitCommands::Add { repo, paths } => {
            let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
            GitRepo::new(repo).add(&paths).await?;
            success("Staged");
        }
        GitCommands::Commit { repo, message } => {
            let hash = GitRepo::new(repo).commit(&message).await?;
            if ctx.json {
                return print_json(&serde_json::json!({ "commit": hash }));
            }
            success(&format!("Committed {}", &hash[..hash.len().min(8)]));
        }
    }
    Ok(())
}
