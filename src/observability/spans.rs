//! Spans for completion calls.

use tracing::Span;
use uuid::Uuid;

/// Span wrapping one `complete()` call, keyed by a fresh request id.
pub fn completion_span(request_id: &Uuid, messages: usize) -> Span {
    tracing::info_span!("complete", request_id = %request_id, messages)
}
