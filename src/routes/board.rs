use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, put},
};
use axum_valid::Valid;

use crate::{
    dto::{
        search::{FilterRequest, SearchParams, SearchResponse},
        song::{BoardResponse, SuggestSongRequest, SuggestSongResponse},
    },
    error::AppError,
    services::{board_service, search_service},
    state::SharedState,
};

/// Routes serving the board itself and the search surface.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/board/songs", get(get_songs).post(suggest_song))
        .route("/board/songs/search", get(search_songs))
        .route("/board/search", put(set_filter))
}

/// Return the full ranked board.
#[utoipa::path(
    get,
    path = "/board/songs",
    tag = "board",
    responses(
        (status = 200, description = "Current ranked board", body = BoardResponse)
    )
)]
pub async fn get_songs(State(state): State<SharedState>) -> Json<BoardResponse> {
    Json(board_service::get_board(&state))
}

/// Suggest a new song for the board.
#[utoipa::path(
    post,
    path = "/board/songs",
    tag = "board",
    request_body = SuggestSongRequest,
    responses(
        (status = 200, description = "Song forwarded to the store", body = SuggestSongResponse),
        (status = 503, description = "No song store available")
    )
)]
pub async fn suggest_song(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SuggestSongRequest>>,
) -> Result<Json<SuggestSongResponse>, AppError> {
    let response = board_service::suggest(&state, payload).await?;
    Ok(Json(response))
}

/// Run a one-shot search without touching the shared display filter.
#[utoipa::path(
    get,
    path = "/board/songs/search",
    tag = "board",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching songs", body = SearchResponse)
    )
)]
pub async fn search_songs(
    State(state): State<SharedState>,
    Valid(Query(params)): Valid<Query<SearchParams>>,
) -> Json<SearchResponse> {
    Json(search_service::search(&state, &params))
}

/// Update the shared display filter (term and/or match mode).
#[utoipa::path(
    put,
    path = "/board/search",
    tag = "board",
    request_body = FilterRequest,
    responses(
        (status = 200, description = "Filter update queued; currently settled view", body = SearchResponse)
    )
)]
pub async fn set_filter(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<FilterRequest>>,
) -> Json<SearchResponse> {
    Json(search_service::set_filter(&state, payload))
}
