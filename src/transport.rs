use async_trait::async_trait;
use chat_stream::{CancellationSignal, ChatApiClient, ChatApiError, ChatRequest};

/// Streaming completion transport the session depends on.
///
/// [`ChatApiClient`] is the production implementation; tests drive the
/// session through scripted doubles instead of a live endpoint.
/// `on_update` observes the full assistant message assembled so far,
/// once per appended delta.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn stream_message(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
        on_update: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, ChatApiError>;
}

#[async_trait]
impl CompletionTransport for ChatApiClient {
    async fn stream_message(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
        on_update: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, ChatApiError> {
        self.stream_with_handler(request, cancellation, |text: &str| on_update(text))
            .await
    }
}
