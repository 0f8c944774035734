use reqwest::StatusCode;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CodeMasterError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("unknown configuration key `{0}`")]
    UnknownConfigKey(String),

    #[error("invalid value for `{key}`: {reason}")]
    InvalidConfigValue { key: String, reason: String },

    #[error("Query rejected: {0}")]
    QueryRejected(String),

    #[error("SQL error: {0}")]
    Sql(String),

    #[error("unknown lesson `{0}`")]
    UnknownLesson(String),

    #[error("lesson `{lesson}` has no example #{index}")]
    UnknownExample { lesson: String, index: usize },

    #[error("unknown table `{0}`")]
    UnknownTable(String),

    #[error("unknown project `{0}`")]
    UnknownProject(String),

    #[error("missing API key: set {0} in your environment or .env file")]
    MissingApiKey(&'static str),

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("Provider authentication failed: {0}")]
    ProviderAuth(String),

    #[error("Provider rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("location `{0}` not found")]
    LocationNotFound(String),

    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("not a git repository: {0}")]
    NotARepository(String),
}

pub type Result<T> = std::result::Result<T, CodeMasterError>;

impl From<figment::Error> for CodeMasterError {
    fn from(e: figment::Error) -> Self {
        CodeMasterError::Config(Box::new(e))
    }
}

/// Network-aware retry classification used by the backon policies.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for CodeMasterError {
    fn is_retryable(&self) -> bool {
        match self {
            CodeMasterError::Reqwest(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            CodeMasterError::UpstreamStatus(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            CodeMasterError::RateLimited(_) => true,
            _ => false,
        }
    }
}

impl CodeMasterError {
    /// Map a non-success provider response onto the error taxonomy.
    pub(crate) fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CodeMasterError::ProviderAuth(body),
            StatusCode::TOO_MANY_REQUESTS => CodeMasterError::RateLimited(body),
            _ => CodeMasterError::UpstreamStatus(status),
        }
    }

    /// Short troubleshooting hint shown under the error message.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CodeMasterError::MissingApiKey(_) | CodeMasterError::ProviderAuth(_) => {
                Some("check the API keys in your .env file (run `codemaster doctor`)")
            }
            CodeMasterError::DatabaseError(_) => {
                Some("local state may be corrupted; `codemaster reset --yes` recreates it")
            }
            CodeMasterError::Config(_) => Some("fix or remove config.json in the data directory"),
            CodeMasterError::QueryRejected(_) => {
                Some("learning mode only runs SELECT queries terminated by `;`")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_provider_semantics() {
        assert!(matches!(
            CodeMasterError::from_status(StatusCode::UNAUTHORIZED, "bad key".into()),
            CodeMasterError::ProviderAuth(_)
        ));
        assert!(matches!(
            CodeMasterError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            CodeMasterError::RateLimited(_)
        ));
        assert!(matches!(
            CodeMasterError::from_status(StatusCode::BAD_GATEWAY, String::new()),
            CodeMasterError::UpstreamStatus(StatusCode::BAD_GATEWAY)
        ));
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(CodeMasterError::UpstreamStatus(StatusCode::SERVICE_UNAVAILABLE).is_retryable());
        assert!(CodeMasterError::RateLimited(String::new()).is_retryable());
        assert!(!CodeMasterError::UpstreamStatus(StatusCode::NOT_FOUND).is_retryable());
        assert!(!CodeMasterError::ProviderAuth(String::new()).is_retryable());
        assert!(!CodeMasterError::QueryRejected("x".into()).is_retryable());
    }
}
