//! Transport-only chat completion client primitives.
//!
//! This crate owns request building and response decoding for a streamed
//! chat completion endpoint. It intentionally contains no auth/login code
//! and no session or file-state coupling.
//!
//! The streaming pipeline is three layers, each independently testable:
//! byte chunks become complete lines ([`LineDecoder`]), lines become
//! protocol frames ([`StreamFrame`]), and Data frame payloads become an
//! incrementally assembled assistant message ([`DeltaAccumulator`]).
//! [`ChatApiClient::stream_with_handler`] wires the three together over a
//! chunked HTTP response body.

pub mod accumulate;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod frames;
pub mod payload;
pub mod retry;
pub mod url;

pub use accumulate::DeltaAccumulator;
pub use client::CancellationSignal;
pub use client::ChatApiClient;
pub use config::ChatApiConfig;
pub use decode::LineDecoder;
pub use error::ChatApiError;
pub use frames::StreamFrame;
pub use payload::{ChatRequest, ChatTurn, Role};
pub use url::normalize_chat_url;
