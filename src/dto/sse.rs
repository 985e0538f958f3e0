use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::song::SongSummary;

#[derive(Clone, Debug)]
/// Dispatched payload carried across the SSE channel.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the live store link is currently up.
    pub online: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the live store link goes up or down.
pub struct ConnectivityEvent {
    pub online: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the live link has exhausted its reconnect attempts.
pub struct LinkFailedEvent {
    /// Reconnect attempts that were made before giving up.
    pub attempts: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever the ranked board is replaced.
pub struct BoardSnapshotEvent {
    pub songs: Vec<SongSummary>,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
/// Direction carried by a rank flag event.
pub enum FlagDirection {
    Up,
    Down,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a song gets a moved-up / moved-down flag.
pub struct RankFlagEvent {
    pub song_id: String,
    pub direction: FlagDirection,
    /// How long the flag stays visible before it expires on its own.
    pub expires_in_ms: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
/// Which flag expired.
pub enum ClearedFlag {
    Move,
    Leader,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a rank flag expires.
pub struct FlagClearedEvent {
    pub song_id: String,
    pub flag: ClearedFlag,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a song takes over the top spot.
pub struct NewLeaderEvent {
    pub song_id: String,
    /// How long the celebration flag stays visible.
    pub expires_in_ms: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a song gained votes without changing position.
pub struct CountPulseEvent {
    pub song_id: String,
    pub vote_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a song's click meter level changes.
pub struct ClickMeterEvent {
    pub song_id: String,
    pub level: u32,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
/// Kind of per-vote feedback: acceptance fires right away, failure only if
/// the store write later goes wrong.
pub enum ToastStatus {
    Accepted,
    Failed,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast as transient per-vote feedback.
pub struct VoteToastEvent {
    pub song_id: String,
    pub status: ToastStatus,
    /// How long the toast should stay on screen.
    pub ttl_ms: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the shared display filter settled on a new result set.
pub struct SearchResultsEvent {
    /// Term the results correspond to.
    pub query: String,
    /// `false` when the filter is inactive and the full board shows.
    pub searching: bool,
    /// Matching song ids in display order.
    pub song_ids: Vec<String>,
}
