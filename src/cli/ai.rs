//! AI assistant command handlers

use crate::cli::output::{notice, print_json};
use crate::cli::{AiCommands, AppContext, CodeInput};
use crate::error::Result;
use crate::service::AssistantService;
use crate::service::assistant::{AssistantReply, CodeAction};
use crate::service::projects::language_for;
use colored::Colorize;
use tokio::io::AsyncReadExt;

/// Read the snippet and guess the fence language from the extension.
async fn read_code(input: &CodeInput) -> Result<(String, Option<String>)> {
    let code = match input.file.as_deref() {
        Some(path) if path.as_os_str() != "-" => tokio::fs::read_to_string(path).await?,
        _ => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };
    let language = input.language.clone().or_else(|| {
        input
            .file
            .as_deref()
            .and_then(language_for)
            .map(str::to_lowercase)
    });
    Ok((code, language))
}

fn print_reply(reply: &AssistantReply) {
    match reply {
        AssistantReply::Completion {
            provider,
            completion,
        } => {
            println!("{}", format!("{provider} · {}", completion.model).dimmed());
            println!("{}", completion.text.trim_end());
        }
        AssistantReply::Offline(stats) => {
            println!("{}", stats.report());
        }
    }
}

pub async fn handle(ctx: &AppContext, cmd: AiCommands) -> Result<()> {
    let service = AssistantService::new(ctx.http()?, ctx.config(), &ctx.keys);

    let (action, input) = match cmd {
        AiCommands::Ask { prompt } => {
            let reply = service.ask(&prompt).await?;
            return finish(ctx, &reply);
        }
        AiCommands::Analyze(input) => (CodeAction::Analyze, input),
        AiCommands::Document(input) => (CodeAction::Document, input),
        AiCommands::Refactor(input) => (CodeAction::Refactor, input),
        AiCommands::Explain(input) => (CodeAction::Explain, input),
    };
    let (code, language) = read_code(&input).await?;
    if code.trim().is_empty() {
        notice("No code to work with.");
        return Ok(());
    }
    let reply = service
        .code_action(action, &code, language.as_deref())
        .await?;
    finish(ctx, &reply)
}

fn finish(ctx: &AppContext, reply: &AssistantReply) -> Result<()> {
    if ctx.json {
        return print_json(reply);
    }
    print_reply(reply);
    if matches!(reply, AssistantReply::Offline(_)) {
        notice("\nOffline analysis only. Set OPENAI_API_KEY or ANTHROPIC_API_KEY for AI review.");
    }
    Ok(())
}
