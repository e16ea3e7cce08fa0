use serde::{Deserialize, Serialize};

/// Role of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the ordered, append-only conversation history.
///
/// Role alternation is not enforced; the session layer coalesces
/// consecutive assistant content into one turn while a stream is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request payload for the completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatTurn>,
    /// Default: true. The transport is stream-first; `complete` flips it.
    #[serde(default = "default_true")]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

fn default_true() -> bool {
    true
}

impl ChatRequest {
    #[must_use]
    pub fn new(messages: Vec<ChatTurn>) -> Self {
        Self {
            model: None,
            messages,
            stream: true,
            temperature: None,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Single-JSON reply shape used by the non-streaming response mode.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatResponseChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponseChoice {
    #[serde(default)]
    pub message: ChatResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatResponseMessage {
    pub content: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice, when present.
    #[must_use]
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatRequest, ChatResponse, ChatTurn, Role};

    #[test]
    fn turns_serialize_with_lowercase_roles() {
        let turn = ChatTurn::user("hi");
        let json = serde_json::to_value(&turn).expect("turn should serialize");
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
    }

    #[test]
    fn request_defaults_to_streaming() {
        let request = ChatRequest::new(vec![ChatTurn::user("hi")]);
        assert!(request.stream);
        assert!(request.model.is_none());
    }

    #[test]
    fn response_first_content_reads_first_choice() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#,
        )
        .expect("response should parse");
        assert_eq!(response.first_content(), Some("hello"));

        let empty: ChatResponse =
            serde_json::from_str(r#"{"choices":[]}"#).expect("response should parse");
        assert_eq!(empty.first_content(), None);
    }

    #[test]
    fn role_round_trips_through_serde() {
        let role: Role = serde_json::from_str("\"assistant\"").expect("role should parse");
        assert_eq!(role, Role::Assistant);
    }
}
