//! Best-effort extraction of file mutation intents embedded in assistant
//! prose.
//!
//! The model is asked to reply with ordinary text that may contain one JSON
//! object of the form `{"message": "...", "actions": [...]}`. Extraction is
//! a two-stage pipeline: a permissive locate stage finds the first balanced
//! JSON object carrying an `"actions"` key, and a strict validate stage
//! parses it, dropping elements that fail validation individually. Any
//! failure at any stage yields an empty list and the text is treated as
//! plain conversation.
//!
//! False negatives are acceptable; false positives that could corrupt files
//! are not, hence the strict gate after the permissive scan.

use serde::Deserialize;
use serde_json::Value;

/// Kind of one file mutation intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Create,
    Edit,
}

/// A parsed instruction to create or edit one project file.
///
/// Born from one assistant message, consumed immediately by the
/// reconciler, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAction {
    pub kind: ActionKind,
    /// Target path. For `Edit` intents the reconciler targets the
    /// currently selected file instead and this field is informational
    /// only — a preserved quirk of the upstream behavior.
    pub path: String,
    pub content: String,
    pub language: String,
}

#[derive(Debug, Deserialize)]
struct ActionEnvelope {
    actions: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    content: String,
    language: String,
}

/// Extracts file mutation intents from final assistant text.
///
/// Returns an empty list when no action block is found, the block is not
/// valid JSON, or it carries no `actions` list.
pub fn extract_actions(text: &str) -> Vec<FileAction> {
    let Some(block) = locate_action_block(text) else {
        return Vec::new();
    };

    let envelope = match serde_json::from_str::<ActionEnvelope>(block) {
        Ok(envelope) => envelope,
        Err(error) => {
            tracing::debug!(%error, "candidate action block failed strict parse");
            return Vec::new();
        }
    };

    envelope
        .actions
        .into_iter()
        .filter_map(validate_action)
        .collect()
}

fn validate_action(value: Value) -> Option<FileAction> {
    let raw = match serde_json::from_value::<RawAction>(value) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::debug!(%error, "dropping action element failing validation");
            return None;
        }
    };

    let kind = match raw.kind.as_str() {
        "create" => ActionKind::Create,
        "edit" => ActionKind::Edit,
        other => {
            tracing::debug!(kind = other, "dropping action element with unknown type");
            return None;
        }
    };

    Some(FileAction {
        kind,
        path: raw.path,
        content: raw.content,
        language: raw.language,
    })
}

/// Locate stage: the first balanced JSON object containing the literal
/// `"actions"` key.
///
/// The scan is string-aware so braces inside file content values do not
/// truncate the block early.
fn locate_action_block(text: &str) -> Option<&str> {
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;

        if let Some(len) = balanced_object_len(&text[start..]) {
            let candidate = &text[start..start + len];
            if candidate.contains("\"actions\"") {
                return Some(candidate);
            }
        }

        // Advance one brace at a time so nested objects are also candidates.
        search_from = start + 1;
    }

    None
}

/// Length of the balanced object starting at the `{` the slice begins
/// with, or `None` when it never closes.
fn balanced_object_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(index + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{balanced_object_len, locate_action_block};

    #[test]
    fn balanced_scan_ignores_braces_inside_strings() {
        let text = r#"{"content": "if (x) { y(); }"} trailing"#;
        let len = balanced_object_len(text).expect("object should close");
        assert_eq!(&text[..len], r#"{"content": "if (x) { y(); }"}"#);
    }

    #[test]
    fn balanced_scan_handles_escaped_quotes() {
        let text = r#"{"content": "say \"{\" loudly"}"#;
        assert_eq!(balanced_object_len(text), Some(text.len()));
    }

    #[test]
    fn unclosed_object_is_not_located() {
        assert_eq!(balanced_object_len(r#"{"actions": ["#), None);
        assert!(locate_action_block(r#"prefix {"actions": [oops"#).is_none());
    }

    #[test]
    fn nested_object_with_actions_key_is_found() {
        let text = r#"{"outer": 1} and then {"wrapper": {"actions": []}}"#;
        let block = locate_action_block(text).expect("block should be found");
        assert_eq!(block, r#"{"wrapper": {"actions": []}}"#);
    }
}
