use serde::{Deserialize, Serialize};
use serde_with::{TimestampMilliSeconds, serde_as};
use std::time::SystemTime;
use uuid::Uuid;

/// Representation of a song as stored and pushed by the storage collaborator.
///
/// The engine never trusts these fields blindly: conversion into the runtime
/// [`Song`](crate::state::board::Song) validates them and drops entries that
/// make no sense (empty id, negative count, deactivated).
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongEntity {
    /// Stable identifier assigned by the store.
    pub id: String,
    /// Song title as suggested by a guest.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Current authoritative vote count.
    pub vote_count: i64,
    /// Creation timestamp for ordering/auditing, epoch milliseconds on the
    /// wire.
    #[serde_as(as = "TimestampMilliSeconds")]
    pub created_at: SystemTime,
    /// Soft-deactivation flag; inactive songs are excluded from snapshots.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// A recorded vote intent, persisted by the store as a plain insert.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteEntity {
    /// Song the vote targets.
    pub song_id: String,
    /// Best-effort session token of the voting client.
    pub session_id: Uuid,
    /// When the client issued the vote.
    #[serde_as(as = "TimestampMilliSeconds")]
    pub issued_at: SystemTime,
}

/// A single message pushed by the store subscription.
///
/// The store is allowed to deliver either full-snapshot or per-interaction
/// granularity; the live link must tolerate both. Unknown or malformed
/// payloads arrive as [`StorePush::Raw`] and are decoded defensively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorePush {
    /// Full list of active songs with current vote counts.
    Snapshot {
        /// Every currently active song.
        songs: Vec<SongEntity>,
    },
    /// A single vote was recorded against a song.
    VoteRecorded {
        /// Target song identifier.
        song_id: String,
    },
    /// A new suggestion was inserted.
    SongSuggested {
        /// The inserted song, vote count included.
        song: SongEntity,
    },
    /// Payload the store could not type; must be parsed or dropped, never
    /// allowed to crash the link.
    #[serde(untagged)]
    Raw(serde_json::Value),
}
