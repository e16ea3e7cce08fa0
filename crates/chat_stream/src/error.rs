use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

/// Transport-level failure surfaced to the caller.
///
/// Frame-level problems (undecodable payloads, missing delta fields) are
/// not represented here; they are recovered locally by the accumulator.
#[derive(Debug)]
pub enum ChatApiError {
    MissingApiKey,
    InvalidBaseUrl(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    RateLimited { message: String },
    Serde(JsonError),
    EmptyCompletion,
    RetryExhausted {
        status: Option<StatusCode>,
        last_error: Option<String>,
    },
    Cancelled,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(rename = "error")]
    pub value: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayloadFields {
    pub message: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

impl ErrorPayloadFields {
    fn code_or_type(&self) -> &str {
        self.code
            .as_deref()
            .filter(|value| !value.is_empty())
            .or_else(|| self.type_.as_deref().filter(|value| !value.is_empty()))
            .unwrap_or("")
    }

    fn is_rate_limited(&self, status: StatusCode) -> bool {
        let code = self.code_or_type();
        status == StatusCode::TOO_MANY_REQUESTS
            || code.eq_ignore_ascii_case("rate_limit_exceeded")
            || code.eq_ignore_ascii_case("insufficient_quota")
            || code.eq_ignore_ascii_case("quota_exceeded")
    }
}

impl fmt::Display for ChatApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "api key is required"),
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::RateLimited { message } => write!(f, "{message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::EmptyCompletion => write!(f, "completion response carried no content"),
            Self::RetryExhausted { status, last_error } => {
                let status = status
                    .map(|status| status.as_u16().to_string())
                    .unwrap_or_else(|| "n/a".to_owned());
                write!(
                    f,
                    "retry exhausted after max attempts (status: {status}, last_error: {last_error:?})"
                )
            }
            Self::Cancelled => write!(f, "request was cancelled"),
        }
    }
}

impl std::error::Error for ChatApiError {}

impl From<reqwest::Error> for ChatApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for ChatApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Map a non-2xx response to an error, extracting the upstream message
/// when the body carries the conventional `{"error":{...}}` payload.
pub fn status_error(status: StatusCode, body: &str) -> ChatApiError {
    if let Ok(ErrorPayload { value: Some(fields) }) = serde_json::from_str::<ErrorPayload>(body) {
        let message = fields
            .message
            .as_deref()
            .filter(|value| !value.is_empty())
            .unwrap_or("request failed")
            .to_string();

        if fields.is_rate_limited(status) {
            return ChatApiError::RateLimited { message };
        }
        return ChatApiError::Status(status, message);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return ChatApiError::RateLimited {
            message: fallback_message(status, body),
        };
    }

    ChatApiError::Status(status, fallback_message(status, body))
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
