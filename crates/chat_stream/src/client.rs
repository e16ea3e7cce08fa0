use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};

use crate::accumulate::DeltaAccumulator;
use crate::config::ChatApiConfig;
use crate::decode::LineDecoder;
use crate::error::{status_error, ChatApiError};
use crate::frames::StreamFrame;
use crate::payload::{ChatRequest, ChatResponse};
use crate::retry::{is_retryable_http_error, retry_delay_ms, MAX_RETRIES};
use crate::url::normalize_chat_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// HTTP client for the chat completion endpoint.
///
/// One instance is cheap to share; all state lives in the underlying
/// connection pool.
#[derive(Debug)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ChatApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_chat_url(&self.config.base_url)
    }

    fn build_headers(&self) -> Result<HeaderMap, ChatApiError> {
        if self.config.api_key.trim().is_empty() {
            return Err(ChatApiError::MissingApiKey);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.config.api_key.trim()))
                .map_err(|_| ChatApiError::InvalidBaseUrl("invalid api key bytes".to_string()))?,
        );

        if let Some(user_agent) = self.config.user_agent.as_deref() {
            headers.insert(
                USER_AGENT,
                HeaderValue::from_str(user_agent).map_err(|_| {
                    ChatApiError::InvalidBaseUrl(format!("invalid user agent: {user_agent}"))
                })?,
            );
        }

        for (key, value) in &self.config.extra_headers {
            headers.insert(
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                    ChatApiError::InvalidBaseUrl(format!("invalid header key: {key}"))
                })?,
                HeaderValue::from_str(value).map_err(|_| {
                    ChatApiError::InvalidBaseUrl(format!("invalid header value for {key}"))
                })?,
            );
        }

        Ok(headers)
    }

    fn build_request(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<reqwest::RequestBuilder, ChatApiError> {
        let headers = self.build_headers()?;
        let mut payload = request.clone();
        payload.stream = stream;
        if payload.model.is_none() {
            payload.model = self.config.model.clone();
        }

        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(&payload))
    }

    async fn send_with_retry(
        &self,
        request: &ChatRequest,
        stream: bool,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, ChatApiError> {
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }

            let response = self.build_request(request, stream)?.send();
            let response = await_or_cancel(response, cancellation).await?;

            match response {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    last_status = Some(status);
                    let body = await_or_cancel(response.text(), cancellation)
                        .await?
                        .unwrap_or_default();
                    let error = status_error(status, &body);
                    last_error = Some(error.to_string());

                    let retryable = !matches!(error, ChatApiError::RateLimited { .. })
                        && is_retryable_http_error(status.as_u16(), &body);
                    if attempt < MAX_RETRIES && retryable {
                        await_or_cancel(tokio::time::sleep(retry_delay_ms(attempt)), cancellation)
                            .await?;
                        continue;
                    }

                    return Err(error);
                }
                Err(error) => {
                    last_error = Some(error.to_string());
                    if attempt < MAX_RETRIES {
                        await_or_cancel(tokio::time::sleep(retry_delay_ms(attempt)), cancellation)
                            .await?;
                        continue;
                    }
                }
            }
        }

        Err(ChatApiError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }

    /// Streams a completion, invoking `on_update` with the full message
    /// assembled so far after every appended delta.
    ///
    /// Returns the final assembled assistant text. Processing ends at the
    /// `[DONE]` terminator; any bytes after it are not consumed. An
    /// unterminated trailing partial line at end of stream is discarded.
    pub async fn stream_with_handler<F>(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_update: F,
    ) -> Result<String, ChatApiError>
    where
        F: FnMut(&str),
    {
        let response = self.send_with_retry(request, true, cancellation).await?;
        let mut bytes = response.bytes_stream();
        let mut decoder = LineDecoder::default();
        let mut accumulator = DeltaAccumulator::default();

        'stream: loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            let chunk = chunk.map_err(ChatApiError::from)?;

            for line in decoder.feed(&chunk) {
                match StreamFrame::classify(&line) {
                    Some(StreamFrame::Data(payload)) => {
                        if accumulator.apply(&payload) {
                            on_update(accumulator.text());
                        }
                    }
                    Some(StreamFrame::Terminator) => break 'stream,
                    Some(StreamFrame::Blank) | Some(StreamFrame::Comment) | None => {}
                }
            }
        }

        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        decoder.finish();
        Ok(accumulator.into_text())
    }

    /// Requests a non-streaming completion and returns its content.
    pub async fn complete(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<String, ChatApiError> {
        let response = self.send_with_retry(request, false, cancellation).await?;
        let parsed = await_or_cancel(response.json::<ChatResponse>(), cancellation)
            .await?
            .map_err(ChatApiError::from)?;

        parsed
            .first_content()
            .map(str::to_string)
            .ok_or(ChatApiError::EmptyCompletion)
    }
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, ChatApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatApiClient, ChatApiError};
    use crate::config::ChatApiConfig;
    use crate::payload::{ChatRequest, ChatTurn};

    #[test]
    fn missing_api_key_is_rejected_before_any_request() {
        let client =
            ChatApiClient::new(ChatApiConfig::default()).expect("client should construct");
        let request = ChatRequest::new(vec![ChatTurn::user("hi")]);

        let error = client
            .build_request(&request, true)
            .expect_err("empty api key must be rejected");
        assert!(matches!(error, ChatApiError::MissingApiKey));
    }

    #[test]
    fn config_model_fills_unset_request_model() {
        let client = ChatApiClient::new(
            ChatApiConfig::new("key").with_model("gpt-4o-mini"),
        )
        .expect("client should construct");

        let request = ChatRequest::new(vec![ChatTurn::user("hi")]);
        let built = client
            .build_request(&request, true)
            .expect("request should build")
            .build()
            .expect("request should finalize");

        let body = built
            .body()
            .and_then(|body| body.as_bytes())
            .expect("json body should be in-memory bytes");
        let payload: serde_json::Value =
            serde_json::from_slice(body).expect("body should be json");
        assert_eq!(payload["model"], "gpt-4o-mini");
        assert_eq!(payload["stream"], true);
    }

    #[tokio::test]
    async fn preset_cancellation_short_circuits_before_any_request() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;

        use super::CancellationSignal;

        let client = ChatApiClient::new(ChatApiConfig::new("key"))
            .expect("client should construct");
        let request = ChatRequest::new(vec![ChatTurn::user("hi")]);
        let cancel: CancellationSignal = Arc::new(AtomicBool::new(true));

        let error = client
            .stream_with_handler(&request, Some(&cancel), |_| {})
            .await
            .expect_err("pre-set cancellation must short-circuit");
        assert!(matches!(error, ChatApiError::Cancelled));

        let error = client
            .complete(&request, Some(&cancel))
            .await
            .expect_err("pre-set cancellation must short-circuit");
        assert!(matches!(error, ChatApiError::Cancelled));
    }

    #[test]
    fn normalized_endpoint_completes_partial_base_urls() {
        let client = ChatApiClient::new(
            ChatApiConfig::new("key").with_base_url("https://example.test/v1"),
        )
        .expect("client should construct");

        assert_eq!(
            client.normalized_endpoint(),
            "https://example.test/v1/chat/completions"
        );
    }
}
