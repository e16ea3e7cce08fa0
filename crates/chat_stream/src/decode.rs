/// Incremental decoder turning raw response-body chunks into complete lines.
///
/// Chunk boundaries carry no guarantees: a chunk may be empty, may split a
/// line anywhere, and may split a multi-byte UTF-8 character. Partial
/// trailing bytes are carried over to the next call rather than dropped or
/// mis-decoded.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending_bytes: Vec<u8>,
    carryover: String,
}

impl LineDecoder {
    /// Feed one chunk and drain every line completed by it.
    ///
    /// A line terminated by `\r\n` has the carriage return stripped.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending_bytes.extend_from_slice(chunk);
        self.decode_pending_bytes();
        self.drain_lines()
    }

    /// Ends the stream, discarding any unterminated trailing partial line.
    ///
    /// The upstream protocol terminates every frame on a line boundary, so
    /// trailing residue can only come from an aborted stream. Dropping it is
    /// a deliberate simplification; callers that need the partial tail must
    /// not call this.
    pub fn finish(&mut self) {
        self.pending_bytes.clear();
        self.carryover.clear();
    }

    /// True when no undelivered bytes or text remain buffered.
    pub fn is_empty(&self) -> bool {
        self.pending_bytes.is_empty() && self.carryover.is_empty()
    }

    fn decode_pending_bytes(&mut self) {
        loop {
            match std::str::from_utf8(&self.pending_bytes) {
                Ok(valid) => {
                    self.carryover.push_str(valid);
                    self.pending_bytes.clear();
                    return;
                }
                Err(error) => {
                    let valid_up_to = error.valid_up_to();
                    if let Ok(valid) = std::str::from_utf8(&self.pending_bytes[..valid_up_to]) {
                        self.carryover.push_str(valid);
                    }

                    match error.error_len() {
                        // Genuinely invalid bytes are substituted, matching
                        // lossy decoding.
                        Some(invalid_len) => {
                            self.carryover.push(char::REPLACEMENT_CHARACTER);
                            self.pending_bytes.drain(0..valid_up_to + invalid_len);
                        }
                        // A multi-byte character split at the chunk boundary
                        // stays buffered until its remaining bytes arrive.
                        None => {
                            self.pending_bytes.drain(0..valid_up_to);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();

        while let Some(split) = self.carryover.find('\n') {
            let mut line = self.carryover[..split].to_string();
            self.carryover.drain(0..split + 1);

            if line.ends_with('\r') {
                line.pop();
            }

            lines.push(line);
        }

        lines
    }
}
