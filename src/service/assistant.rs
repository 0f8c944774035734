use crate::api::ai_api::{AiEndpoints, ChatMessage, Completion};
use crate::api::{default_retry_policy, with_retry};
use crate::config::{
    ANTHROPIC_KEY_ENV, AiProviderChoice, ApiEndpoints, ApiKeys, Config, OPENAI_KEY_ENV,
};
use crate::error::{CodeMasterError, Result};
use backon::ExponentialBuilder;
use serde::Serialize;
use std::fmt;
use tracing::info;

const SYSTEM_PROMPT: &str = "You are a patient programming tutor. Answer concisely and \
use fenced code blocks for code.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeAction {
    Analyze,
    Document,
    Refactor,
    Explain,
}

impl CodeAction {
    fn task(self) -> &'static str {
        match self {
            CodeAction::Analyze => {
                "Review the following code. Point out bugs, risky constructs and \
                 style problems, most important first."
            }
            CodeAction::Document => {
                "Write documentation comments for every function, type and module \
                 in the following code. Return the documented code."
            }
            CodeAction::Refactor => {
                "Suggest a refactoring of the following code that improves structure \
                 and readability without changing behavior. Show the result."
            }
            CodeAction::Explain => {
                "Explain what the following code does, step by step, for a learner."
            }
        }
    }
}

/// Line statistics computed locally when no provider is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodeStats {
    pub total_lines: usize,
    pub non_empty_lines: usize,
    pub comment_lines: usize,
    pub function_definitions: usize,
    pub class_definitions: usize,
}

impl CodeStats {
    pub fn of(code: &str) -> Self {
        let mut stats = CodeStats::default();
        for line in code.split('\n') {
            stats.total_lines += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            stats.non_empty_lines += 1;
            if ["#", "//", "--", "/*", "*"]
                .iter()
                .any(|p| trimmed.starts_with(p))
            {
                stats.comment_lines += 1;
            }
            if ["def ", "fn ", "function ", "func "]
                .iter()
                .any(|kw| line.contains(kw))
            {
                stats.function_definitions += 1;
            }
            if ["class ", "struct "].iter().any(|kw| line.contains(kw)) {
                stats.class_definitions += 1;
            }
        }
        stats
    }

    pub fn report(&self) -> String {
        format!(
            "Code analysis (offline)\n\
             Total lines: {}\n\
             Non-empty lines: {}\n\
             Comment lines: {}\n\
             Function definitions: {}\n\
             Class definitions: {}\n\n\
             Set OPENAI_API_KEY or ANTHROPIC_API_KEY for a full review.",
            self.total_lines,
            self.non_empty_lines,
            self.comment_lines,
            self.function_definitions,
            self.class_definitions,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AssistantReply {
    Completion {
        provider: Provider,
        #[serde(flatten)]
        completion: Completion,
    },
    Offline(CodeStats),
}

/// Forwards prompts and code snippets to the configured LLM provider.
pub struct AssistantService {
    client: reqwest::Client,
    endpoints: ApiEndpoints,
    choice: AiProviderChoice,
    openai_key: Option<String>,
    anthropic_key: Option<String>,
    openai_model: String,
    anthropic_model: String,
    retry_policy: ExponentialBuilder,
}

impl AssistantService {
    pub fn new(client: reqwest::Client, cfg: &Config, keys: &ApiKeys) -> Self {
        Self {
            client,
            endpoints: cfg.api_endpoints.clone(),
            choice: cfg.ai_provider,
            openai_key: keys.openai.clone(),
            anthropic_key: keys.anthropic.clone(),
            openai_model: cfg.ai_model_preference.clone(),
            anthropic_model: cfg.anthropic_model.clone(),
            retry_policy: default_retry_policy(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: ExponentialBuilder) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// `auto` picks the first provider with a key, OpenAI first.
    pub fn provider(&self) -> Result<(Provider, &str)> {
        let openai = self.openai_key.as_deref().map(|k| (Provider::OpenAi, k));
        let anthropic = self
            .anthropic_key
            .as_deref()
            .map(|k| (Provider::Anthropic, k));
        match self.choice {
            AiProviderChoice::OpenAi => openai.ok_or(CodeMasterError::MissingApiKey(OPENAI_KEY_ENV)),
            AiProviderChoice::Anthropic => {
                anthropic.ok_or(CodeMasterError::MissingApiKey(ANTHROPIC_KEY_ENV))
            }
            AiProviderChoice::Auto => openai
                .or(anthropic)
                .ok_or(CodeMasterError::MissingApiKey(
                    "OPENAI_API_KEY or ANTHROPIC_API_KEY",
                )),
        }
    }

    pub async fn ask(&self, prompt: &str) -> Result<AssistantReply> {
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        self.complete(&messages).await
    }

    pub async fn code_action(
        &self,
        action: CodeAction,
        code: &str,
        language: Option<&str>,
    ) -> Result<AssistantReply> {
        if action == CodeAction::Analyze && self.provider().is_err() {
            info!("no AI provider configured; running offline analysis");
            return Ok(AssistantReply::Offline(CodeStats::of(code)));
        }
        let fence = language.unwrap_or_default();
        let prompt = format!("{}\n\n```{fence}\n{code}\n```", action.task());
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        self.complete(&messages).await
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<AssistantReply> {
        let (provider, key) = self.provider()?;
        let completion = match provider {
            Provider::OpenAi => {
                with_retry("openai", self.retry_policy, || async {
                    AiEndpoints::openai_chat(
                        &self.client,
                        &self.endpoints.openai,
                        key,
                        &self.openai_model,
                        messages,
                    )
                    .await
                })
                .await?
            }
            Provider::Anthropic => {
                with_retry("anthropic", self.retry_policy, || async {
                    AiEndpoints::anthropic_messages(
                        &self.client,
                        &self.endpoints.anthropic,
                        key,
                        &self.anthropic_model,
                        messages,
                    )
                    .await
                })
                .await?
            }
        };
        Ok(AssistantReply::Completion {
            provider,
            completion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(choice: AiProviderChoice, openai: Option<&str>, anthropic: Option<&str>) -> AssistantService {
        let cfg = Config {
            ai_provider: choice,
            ..Config::default()
        };
        let keys = ApiKeys {
            openai: openai.map(str::to_string),
            anthropic: anthropic.map(str::to_string),
            ..ApiKeys::default()
        };
        AssistantService::new(reqwest::Client::new(), &cfg, &keys)
    }

    #[test]
    fn auto_prefers_openai_then_anthropic() {
        let svc = service(AiProviderChoice::Auto, Some("sk-a"), Some("sk-ant-b"));
        assert_eq!(svc.provider().unwrap().0, Provider::OpenAi);
        let svc = service(AiProviderChoice::Auto, None, Some("sk-ant-b"));
        assert_eq!(svc.provider().unwrap().0, Provider::Anthropic);
        let svc = service(AiProviderChoice::Auto, None, None);
        assert!(matches!(svc.provider(), Err(CodeMasterError::MissingApiKey(_))));
    }

    #[test]
    fn explicit_choice_requires_its_own_key() {
        let svc = service(AiProviderChoice::Anthropic, Some("sk-a"), None);
        assert!(matches!(
            svc.provider(),
            Err(CodeMasterError::MissingApiKey(ANTHROPIC_KEY_ENV))
        ));
    }

    #[test]
    fn code_stats_counts_lines() {
        let code = "# header\nclass Foo:\n    def bar(self):\n\n        return 1\n";
        let stats = CodeStats::of(code);
        assert_eq!(
            stats,
            CodeStats {
                total_lines: 6,
                non_empty_lines: 4,
                comment_lines: 1,
                function_definitions: 1,
                class_definitions: 1,
            }
        );
        assert!(stats.report().contains("Function definitions: 1"));
    }

    #[tokio::test]
    async fn analyze_runs_offline_without_keys() {
        let svc = service(AiProviderChoice::Auto, None, None);
        let reply = svc
            .code_action(CodeAction::Analyze, "fn main() {}", Some("rust"))
            .await
            .unwrap();
        assert!(matches!(reply, AssistantReply::Offline(s) if s.function_definitions == 1));

        let err = svc
            .code_action(CodeAction::Explain, "fn main() {}", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CodeMasterError::MissingApiKey(_)));
    }
}
