use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Body of `POST /board/songs/{id}/vote`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VoteRequest {
    /// Session identifier the client drew when it connected.
    pub session_id: Uuid,
}

/// Outcome of a vote intent.
///
/// A rejected intent is not an error; the board simply stays as it was.
#[derive(Debug, Serialize, ToSchema)]
pub struct VoteResponse {
    /// Whether the vote passed the cool-down gate.
    pub accepted: bool,
    /// Displayed (optimistic) vote count after the intent.
    pub vote_count: u64,
    /// Click meter level for the song after the intent.
    pub click_level: u32,
}
