/// Default base URL for completion requests.
pub const DEFAULT_CHAT_BASE_URL: &str = "https://api.openai.com/v1";

/// Normalize a base URL to a chat completions endpoint.
///
/// Normalization rules:
/// 1) keep `/chat/completions` unchanged
/// 2) append `/completions` when the path ends in `/chat`
/// 3) append `/chat/completions` otherwise
pub fn normalize_chat_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_CHAT_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        return trimmed.to_string();
    }
    if trimmed.ends_with("/chat") {
        return format!("{trimmed}/completions");
    }
    format!("{trimmed}/chat/completions")
}

#[cfg(test)]
mod tests {
    use super::{normalize_chat_url, DEFAULT_CHAT_BASE_URL};

    #[test]
    fn empty_input_falls_back_to_default_base() {
        assert_eq!(
            normalize_chat_url("  "),
            format!("{DEFAULT_CHAT_BASE_URL}/chat/completions")
        );
    }

    #[test]
    fn full_endpoint_is_left_unchanged() {
        assert_eq!(
            normalize_chat_url("https://example.test/v1/chat/completions/"),
            "https://example.test/v1/chat/completions"
        );
    }

    #[test]
    fn partial_paths_are_completed() {
        assert_eq!(
            normalize_chat_url("https://example.test/v1/chat"),
            "https://example.test/v1/chat/completions"
        );
        assert_eq!(
            normalize_chat_url("https://example.test/v1"),
            "https://example.test/v1/chat/completions"
        );
    }
}
