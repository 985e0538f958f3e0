use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{dto::song::SongSummary, state::search::SearchMode};

/// Query parameters of `GET /board/songs/search`.
#[derive(Debug, Deserialize, Validate, IntoParams)]
pub struct SearchParams {
    /// Raw search term; blank means "no filter".
    #[serde(default)]
    #[validate(length(max = 200))]
    pub q: String,
    /// Match mode; defaults to exact.
    #[serde(default)]
    pub mode: SearchMode,
}

/// Body of `PUT /board/search` updating the shared display filter.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FilterRequest {
    /// Raw search term; applied after the debounce window.
    #[serde(default)]
    #[validate(length(max = 200))]
    pub q: String,
    /// Match mode switch, applied immediately when present.
    pub mode: Option<SearchMode>,
}

/// Result of a one-shot search or the current shared filter.
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    /// Term the results correspond to.
    pub query: String,
    /// `false` when the term was blank and the full board is returned.
    pub searching: bool,
    /// Matching songs; best match first in fuzzy mode, board order otherwise.
    pub songs: Vec<SongSummary>,
}
