//! Project command handlers

use crate::cli::output::{field, notice, or_dash, print_json, print_table, success};
use crate::cli::{AppContext, ProjectCommands};
use crate::error::Result;
use crate::service::ProjectService;
use crate::utils::format_file_size;
use serde_json::json;
use tabled::Tabled;

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Language")]
    language: String,
    #[tabled(rename = "Files")]
    files: i64,
    #[tabled(rename = "Lines")]
    lines: i64,
    #[tabled(rename = "Last opened")]
    last_accessed: String,
    #[tabled(rename = "Path")]
    path: String,
}

pub async fn handle(ctx: &mut AppContext, cmd: ProjectCommands) -> Result<()> {
    let engine = ctx.engine().await?;
    let service = ProjectService::new(engine.clone());

    let outcome = match cmd {
        ProjectCommands::Add {
            path,
            name,
            description,
        } => match service.add(&path, name, description).await {
            Ok((record, scan)) if ctx.json => print_json(&json!({ "project": record, "scan": scan })),
            Ok((record, scan)) => {
                success(&format!("Project {} registered", record.name));
                field("Path", &record.path);
                field("Language", or_dash(record.language.as_deref()));
                field("Files", scan.file_count);
                field("Lines", scan.line_count);
                field("Size", format_file_size(scan.total_bytes));
                Ok(())
            }
            Err(e) => Err(e),
        },
        ProjectCommands::List => match service.list().await {
            Ok(projects) if ctx.json => print_json(&projects),
            Ok(projects) if projects.is_empty() => {
                notice("No projects yet. Register one with: codemaster project add <dir>");
                Ok(())
            }
            Ok(projects) => {
                print_table(
                    projects
                        .into_iter()
                        .map(|p| ProjectRow {
                            name: p.name,
                            language: or_dash(p.language.as_deref()),
                            files: p.file_count,
                            lines: p.line_count,
                            last_accessed: p.last_accessed.format("%Y-%m-%d %H:%M").to_string(),
                            path: p.path,
                        })
                        .collect(),
                );
                Ok(())
            }
            Err(e) => Err(e),
        },
        ProjectCommands::Open { name } => match service.open(&name, &mut ctx.store).await {
            Ok(record) if ctx.json => print_json(&record),
            Ok(record) => {
                success(&format!("Opened {}", record.name));
                println!("{}", record.path);
                Ok(())
            }
            Err(e) => Err(e),
        },
    };
    engine.close().await;
    outcome
}
