mod common;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use codemaster::config::AiProviderChoice;
use codemaster::service::AssistantService;
use codemaster::service::assistant::{AssistantReply, CodeAction, Provider};
use codemaster::{ApiKeys, CodeMasterError, Config};
use serde_json::{Value, json};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

#[derive(Clone, Default)]
struct Calls {
    openai: Arc<AtomicUsize>,
    anthropic: Arc<AtomicUsize>,
}

/// Fails the first call with a 503 when the prompt asks for it.
async fn openai_chat(
    State(calls): State<Calls>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let n = calls.openai.fetch_add(1, Ordering::SeqCst);
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer sk-test") {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let prompt = body["messages"][1]["content"].as_str().unwrap_or_default();
    if prompt.contains("flaky") && n == 0 {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    assert_eq!(body["messages"][0]["role"], "system");
    Ok(Json(json!({
        "model": body["model"],
        "choices": [{ "message": { "role": "assistant", "content": format!("echo: {prompt}") } }]
    })))
}

async fn anthropic_messages(
    State(calls): State<Calls>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    calls.anthropic.fetch_add(1, Ordering::SeqCst);
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("sk-ant-test") {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if headers.get("anthropic-version").is_none() || body["system"].as_str().is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }
    // System prompts travel in the top-level field, never as a message.
    let roles: Vec<&str> = body["messages"]
        .as_array()
        .map(|m| m.iter().filter_map(|x| x["role"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(roles, vec!["user"]);
    Ok(Json(json!({
        "model": body["model"],
        "content": [
            { "type": "text", "text": "part one, " },
            { "type": "text", "text": "part two" }
        ]
    })))
}

async fn setup(choice: AiProviderChoice) -> (Calls, Config) {
    let calls = Calls::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(openai_chat))
        .route("/v1/messages", post(anthropic_messages))
        .with_state(calls.clone());
    let addr = common::serve(app).await;

    let mut cfg = Config::default();
    cfg.ai_provider = choice;
    cfg.api_endpoints.openai = common::base_url(addr, "/v1");
    cfg.api_endpoints.anthropic = common::base_url(addr, "/v1");
    (calls, cfg)
}

fn keys(openai: Option<&str>, anthropic: Option<&str>) -> ApiKeys {
    ApiKeys {
        openai: openai.map(str::to_string),
        anthropic: anthropic.map(str::to_string),
        ..ApiKeys::default()
    }
}

fn assistant(cfg: &Config, keys: &ApiKeys) -> AssistantService {
    AssistantService::new(reqwest::Client::new(), cfg, keys).with_retry_policy(common::fast_retry())
}

#[tokio::test]
async fn openai_completion_round_trip() {
    let (calls, cfg) = setup(AiProviderChoice::Auto).await;
    let svc = assistant(&cfg, &keys(Some("sk-test"), Some("sk-ant-test")));

    let reply = svc.ask("what is a lifetime?").await.expect("ask failed");
    let AssistantReply::Completion {
        provider,
        completion,
    } = reply
    else {
        panic!("expected a completion");
    };
    assert_eq!(provider, Provider::OpenAi);
    assert_eq!(completion.text, "echo: what is a lifetime?");
    assert_eq!(completion.model, cfg.ai_model_preference);
    assert_eq!(calls.openai.load(Ordering::SeqCst), 1);
    assert_eq!(calls.anthropic.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn anthropic_joins_text_blocks() {
    let (calls, cfg) = setup(AiProviderChoice::Anthropic).await;
    let svc = assistant(&cfg, &keys(Some("sk-test"), Some("sk-ant-test")));

    let reply = svc
        .code_action(CodeAction::Explain, "fn main() {}", Some("rust"))
        .await
        .expect("explain failed");
    let AssistantReply::Completion {
        provider,
        completion,
    } = reply
    else {
        panic!("expected a completion");
    };
    assert_eq!(provider, Provider::Anthropic);
    assert_eq!(completion.text, "part one, part two");
    assert_eq!(completion.model, cfg.anthropic_model);
    assert_eq!(calls.openai.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let (calls, cfg) = setup(AiProviderChoice::OpenAi).await;
    let svc = assistant(&cfg, &keys(Some("sk-test"), None));

    let reply = svc.ask("flaky question").await.expect("retry did not recover");
    assert!(matches!(reply, AssistantReply::Completion { .. }));
    assert_eq!(calls.openai.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rejected_key_is_an_auth_error_and_not_retried() {
    let (calls, cfg) = setup(AiProviderChoice::OpenAi).await;
    let svc = assistant(&cfg, &keys(Some("sk-wrong"), None));

    let err = svc.ask("hello").await.expect_err("bad key must fail");
    assert!(matches!(err, CodeMasterError::ProviderAuth(_)), "{err:?}");
    assert!(err.hint().is_some());
    assert_eq!(calls.openai.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn no_provider_analysis_runs_offline() {
    let (calls, cfg) = setup(AiProviderChoice::Auto).await;
    let svc = assistant(&cfg, &keys(None, None));

    let code = "// entry point\nfn main() {\n    println!(\"hi\");\n}\n";
    let reply = svc
        .code_action(CodeAction::Analyze, code, Some("rust"))
        .await
        .expect("offline analysis failed");
    let AssistantReply::Offline(stats) = reply else {
        panic!("expected offline stats");
    };
    assert_eq!(stats.function_definitions, 1);
    assert_eq!(stats.comment_lines, 1);

    let err = svc
        .code_action(CodeAction::Refactor, code, None)
        .await
        .expect_err("refactor needs a provider");
    assert!(matches!(err, CodeMasterError::MissingApiKey(_)));
    assert_eq!(calls.openai.load(Ordering::SeqCst), 0);
}
