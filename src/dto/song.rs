use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{dto::validation::validate_not_blank, state::board::Song};

/// One ranked entry of the board as exposed over HTTP and SSE.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SongSummary {
    /// Stable store-assigned identifier.
    pub id: String,
    /// Song title.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Vote count as currently displayed (may be optimistic).
    pub vote_count: u64,
    /// 1-based position on the board.
    pub rank: usize,
    /// Creation timestamp, RFC 3339.
    pub created_at: String,
}

impl SongSummary {
    /// Render a ranked song at 0-based index `index`.
    pub fn from_song(song: &Song, index: usize) -> Self {
        Self {
            id: song.id.clone(),
            title: song.title.clone(),
            artist: song.artist.clone(),
            vote_count: song.vote_count,
            rank: index + 1,
            created_at: super::format_system_time(song.created_at),
        }
    }

    /// Render a whole ranked snapshot.
    pub fn from_snapshot(songs: &[Song]) -> Vec<Self> {
        songs
            .iter()
            .enumerate()
            .map(|(index, song)| Self::from_song(song, index))
            .collect()
    }
}

/// Full board response returned by `GET /board/songs`.
#[derive(Debug, Serialize, ToSchema)]
pub struct BoardResponse {
    /// Ranked songs, best first.
    pub songs: Vec<SongSummary>,
    /// Whether the live store link is currently up.
    pub online: bool,
}

/// Body of `POST /board/songs` suggesting a new entry.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SuggestSongRequest {
    /// Title of the suggested song.
    #[validate(length(max = 200), custom(function = validate_not_blank))]
    pub title: String,
    /// Performing artist.
    #[validate(length(max = 200), custom(function = validate_not_blank))]
    pub artist: String,
}

/// Response to a successful suggestion.
#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestSongResponse {
    /// Identifier the store assigned to the new song.
    pub id: String,
}
