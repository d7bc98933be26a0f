// ABOUTME: Reusable Server-Sent Events (SSE) helpers
// ABOUTME: Stream and event builders for the live tracking views

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;

/// Helper to create an SSE response with standard keep-alive settings
pub fn create_sse_response<S>(stream: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Helper to create an SSE event from JSON-serializable data
pub fn create_sse_event<T: serde::Serialize>(
    event_type: &str,
    data: &T,
) -> Result<Event, serde_json::Error> {
    let json_data = serde_json::to_string(data)?;
    Ok(Event::default().event(event_type).data(json_data))
}

/// Helper to create an error SSE event
pub fn create_error_event(error_message: &str) -> Event {
    Event::default()
        .event("error")
        .data(format!("{{\"error\":\"{}\"}}", error_message))
}
