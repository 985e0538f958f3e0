/// Board read/write operations.
pub mod board_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Live store link driver and publish pipeline.
pub mod live_service;
/// Search queries and the shared display filter.
pub mod search_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Vote admission and settlement.
pub mod vote_service;
