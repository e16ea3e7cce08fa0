use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct DeltaPayload {
    #[serde(default)]
    choices: Vec<DeltaChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct DeltaChoice {
    #[serde(default)]
    delta: DeltaFields,
}

#[derive(Debug, Default, Deserialize)]
struct DeltaFields {
    content: Option<String>,
}

/// Running assembly of one streamed assistant message.
///
/// Growth is monotonic: deltas are appended in arrival order and the text
/// is never rewritten for the lifetime of one stream.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    text: String,
}

impl DeltaAccumulator {
    /// Applies one Data frame payload, returning true when a delta was
    /// appended.
    ///
    /// The payload must be JSON carrying `choices[0].delta.content`.
    /// Undecodable payloads and heartbeat frames without a content field
    /// are skipped; a single malformed frame never ends the stream.
    pub fn apply(&mut self, payload: &str) -> bool {
        let parsed = match serde_json::from_str::<DeltaPayload>(payload) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::debug!(%error, "skipping undecodable data frame");
                return false;
            }
        };

        let delta = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content);

        match delta {
            Some(delta) if !delta.is_empty() => {
                self.text.push_str(&delta);
                true
            }
            _ => false,
        }
    }

    /// The full message assembled so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::DeltaAccumulator;

    #[test]
    fn apply_appends_deltas_in_order() {
        let mut accumulator = DeltaAccumulator::default();

        assert!(accumulator.apply(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#));
        assert!(accumulator.apply(r#"{"choices":[{"delta":{"content":"lo"}}]}"#));
        assert_eq!(accumulator.text(), "Hello");
    }

    #[test]
    fn malformed_and_heartbeat_payloads_are_skipped() {
        let mut accumulator = DeltaAccumulator::default();

        assert!(!accumulator.apply("{broken"));
        assert!(!accumulator.apply(r#"{"choices":[]}"#));
        assert!(!accumulator.apply(r#"{"choices":[{"delta":{}}]}"#));
        assert!(!accumulator.apply(r#"{"choices":[{"delta":{"content":""}}]}"#));
        assert!(accumulator.is_empty());

        assert!(accumulator.apply(r#"{"choices":[{"delta":{"content":"still going"}}]}"#));
        assert_eq!(accumulator.text(), "still going");
    }

    #[test]
    fn only_the_first_choice_is_consulted() {
        let mut accumulator = DeltaAccumulator::default();

        accumulator.apply(
            r#"{"choices":[{"delta":{"content":"first"}},{"delta":{"content":"second"}}]}"#,
        );
        assert_eq!(accumulator.text(), "first");
    }
}
