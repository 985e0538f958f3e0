//! Read and write operations on the board itself.

use crate::{
    dto::song::{BoardResponse, SongSummary, SuggestSongRequest, SuggestSongResponse},
    error::ServiceError,
    services::live_service::publish_update,
    state::{SharedState, board::sanitize_snapshot},
};

/// Current ranked board.
pub fn get_board(state: &SharedState) -> BoardResponse {
    let snapshot = state.board().current();
    BoardResponse {
        songs: SongSummary::from_snapshot(&snapshot),
        online: state.is_online(),
    }
}

/// Fetch the initial top-N from the store and publish it as the first board.
///
/// Runs once at startup so clients have something to look at before the live
/// subscription delivers its first push. Failing here is not fatal; the live
/// link will bring the board up when it connects.
pub async fn initial_paint(state: &SharedState) -> Result<(), ServiceError> {
    let store = state.require_song_store().await?;
    let songs = store.top_songs(state.config().initial_top_n).await?;
    let snapshot = state.board().replace(sanitize_snapshot(songs));
    publish_update(state, snapshot);
    Ok(())
}

/// Forward a song suggestion to the store.
///
/// The board itself is not touched here; the store acknowledges by pushing
/// the new song back over the live link, which is when it appears.
pub async fn suggest(
    state: &SharedState,
    request: SuggestSongRequest,
) -> Result<SuggestSongResponse, ServiceError> {
    let store = state.require_song_store().await?;
    let song = store
        .suggest_song(request.title.trim().to_string(), request.artist.trim().to_string())
        .await?;
    Ok(SuggestSongResponse { id: song.id })
}
