//! SQL tutorial command handlers

use crate::cli::output::{field, heading, notice, print_json, print_table, success};
use crate::cli::{AppContext, SqlCommands};
use crate::error::Result;
use crate::service::sql_tutor::{self, RunOutcome, SqlTutor, render_feedback, render_result};
use colored::Colorize;
use serde_json::json;
use tabled::Tabled;
use tokio::io::BufReader;

#[derive(Tabled)]
struct LessonRow {
    #[tabled(rename = "ID")]
    id: &'static str,
    #[tabled(rename = "Title")]
    title: &'static str,
    #[tabled(rename = "Level")]
    difficulty: String,
    #[tabled(rename = "Examples")]
    examples: usize,
}

#[derive(Tabled)]
struct ProgressRow {
    #[tabled(rename = "Lesson")]
    lesson: String,
    #[tabled(rename = "Completed")]
    completed: String,
    #[tabled(rename = "Score")]
    score: i64,
    #[tabled(rename = "Attempts")]
    attempts: i64,
    #[tabled(rename = "Completed at")]
    completed_at: String,
}

#[derive(Tabled)]
struct SchemaRow {
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Type")]
    data_type: String,
    #[tabled(rename = "Not null")]
    not_null: bool,
    #[tabled(rename = "Primary key")]
    primary_key: bool,
}

pub async fn handle(ctx: &AppContext, cmd: SqlCommands) -> Result<()> {
    let tutor = SqlTutor::new(ctx.engine().await?);
    let outcome = match cmd {
        SqlCommands::Run { query } => handle_run(ctx, &tutor, &query).await,
        SqlCommands::Shell => {
            let executed = tutor
                .shell(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await?;
            tracing::info!(statements = executed, "shell session ended");
            Ok(())
        }
        SqlCommands::Tables => {
            let tables = tutor.engine().available_tables().await?;
            if ctx.json {
                print_json(&tables)
            } else {
                tables.iter().for_each(|t| println!("{t}"));
                Ok(())
            }
        }
        SqlCommands::Schema { table } => {
            let cols = tutor.engine().table_schema(&table).await?;
            if ctx.json {
                print_json(&cols)
            } else {
                heading(&format!("Table {table}"));
                print_table(
                    cols.into_iter()
                        .map(|c| SchemaRow {
                            column: c.column,
                            data_type: c.data_type,
                            not_null: c.not_null,
                            primary_key: c.primary_key,
                        })
                        .collect(),
                );
                Ok(())
            }
        }
        SqlCommands::Lessons => handle_lessons(ctx),
        SqlCommands::Lesson { id, example } => handle_lesson(ctx, &tutor, &id, example).await,
        SqlCommands::Progress => handle_progress(ctx, &tutor).await,
    };
    tutor.engine().close().await;
    outcome
}

async fn handle_run(ctx: &AppContext, tutor: &SqlTutor, query: &str) -> Result<()> {
    let outcome = tutor.run(query).await?;
    if ctx.json {
        return print_json(&outcome);
    }
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Success { result, feedback } => {
            print!("{}", render_result(result));
            println!();
            print!("{}", render_feedback(feedback));
        }
        RunOutcome::Rejected { reason } => {
            println!("{} {reason}", "Rejected:".yellow().bold());
        }
        RunOutcome::SqlError { message } => {
            println!("{} {message}", "SQL error:".red().bold());
        }
    }
}

fn handle_lessons(ctx: &AppContext) -> Result<()> {
    let lessons = sql_tutor::lessons();
    if ctx.json {
        return print_json(lessons);
    }
    print_table(
        lessons
            .iter()
            .map(|l| LessonRow {
                id: l.id,
                title: l.title,
                difficulty: l.difficulty.to_string(),
                examples: l.examples.len(),
            })
            .collect(),
    );
    Ok(())
}

async fn handle_lesson(
    ctx: &AppContext,
    tutor: &SqlTutor,
    id: &str,
    example: Option<usize>,
) -> Result<()> {
    let Some(number) = example else {
        let lesson = sql_tutor::lesson(id)?;
        if ctx.json {
            return print_json(lesson);
        }
        heading(lesson.title);
        field("Level", lesson.difficulty);
        field("About", lesson.description);
        println!();
        for (i, ex) in lesson.examples.iter().enumerate() {
            println!("{} {}", format!("{}.", i + 1).bold(), ex.explanation);
            for line in ex.query.lines() {
                println!("     {}", line.cyan());
            }
        }
        println!();
        notice(&format!("Run one with: codemaster sql lesson {id} --example <n>"));
        return Ok(());
    };

    let run = tutor.run_lesson_example(id, number).await?;
    if ctx.json {
        return print_json(&json!({
            "lesson_id": run.lesson_id,
            "example": run.example,
            "outcome": run.outcome,
            "progress": run.progress,
        }));
    }
    heading(run.example.explanation);
    println!("{}\n", run.example.query.cyan());
    print_outcome(&run.outcome);
    println!();
    if run.outcome.is_success() {
        success(&format!(
            "Lesson {} attempt recorded ({} so far)",
            run.lesson_id, run.progress.attempts
        ));
    } else {
        notice(&format!("Attempt recorded ({} so far)", run.progress.attempts));
    }
    Ok(())
}

async fn handle_progress(ctx: &AppContext, tutor: &SqlTutor) -> Result<()> {
    let progress = tutor.progress().await?;
    if ctx.json {
        return print_json(&progress);
    }
    if progress.is_empty() {
        notice("No lessons attempted yet. Try: codemaster sql lessons");
        return Ok(());
    }
    let total = sql_tutor::lessons().len();
    let done = progress.iter().filter(|p| p.completed).count();
    print_table(
        progress
            .into_iter()
            .map(|p| ProgressRow {
                lesson: p.lesson_title,
                completed: if p.completed { "yes" } else { "no" }.to_string(),
                score: p.score,
                attempts: p.attempts,
                completed_at: p
                    .completed_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            })
            .collect(),
    );
    println!("\n{done}/{total} lessons completed");
    Ok(())
}
