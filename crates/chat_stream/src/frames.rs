const DATA_MARKER: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// One protocol frame derived from a decoded line. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Empty line. Carries nothing; callers skip it.
    Blank,
    /// Keep-alive comment line (`:` prefix). Callers skip it.
    Comment,
    /// A `data:` line carrying one payload.
    Data(String),
    /// The `data: [DONE]` sentinel ending the stream.
    Terminator,
}

impl StreamFrame {
    /// Classify one decoded line.
    ///
    /// Lines with an unrecognized field prefix yield `None`: unknown frame
    /// types are not part of this protocol surface and must not abort the
    /// stream.
    pub fn classify(line: &str) -> Option<Self> {
        if line.is_empty() {
            return Some(Self::Blank);
        }

        if line.starts_with(':') {
            return Some(Self::Comment);
        }

        let payload = line.strip_prefix(DATA_MARKER)?;
        let payload = payload.strip_prefix(' ').unwrap_or(payload).trim();

        if payload == DONE_SENTINEL {
            return Some(Self::Terminator);
        }

        Some(Self::Data(payload.to_string()))
    }
}
