use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// Maximum retry attempts after the initial request attempt.
pub const MAX_RETRIES: u32 = 3;
/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 1000;

fn transient_error_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?i)overloaded|service.?unavailable|gateway.?time.?out|upstream.?connect|connection.?(refused|reset)")
            .expect("transient-error regex must compile")
    })
}

/// Retry policy for failures observed before streaming begins.
///
/// Rate-limit and quota failures are excluded on purpose: retrying them
/// burns the same budget that caused the failure. They surface to the
/// caller instead.
pub fn is_retryable_http_error(status: u16, error_text: &str) -> bool {
    matches!(status, 500 | 502 | 503 | 504) || transient_error_regex().is_match(error_text)
}

/// Compute the exponential backoff delay for a retry attempt.
pub fn retry_delay_ms(attempt: u32) -> Duration {
    let exponent = attempt.min(30);
    Duration::from_millis(BASE_DELAY_MS * 2u64.saturating_pow(exponent))
}
