use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;

use crate::{
    dto::vote::{VoteRequest, VoteResponse},
    error::AppError,
    services::vote_service,
    state::SharedState,
};

/// Routes handling vote intents.
pub fn router() -> Router<SharedState> {
    Router::new().route("/board/songs/{id}/vote", post(vote))
}

/// Submit a vote intent for a song.
#[utoipa::path(
    post,
    path = "/board/songs/{id}/vote",
    tag = "board",
    params(("id" = String, Path, description = "Identifier of the song to vote for")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote intent processed", body = VoteResponse),
        (status = 404, description = "Song is not on the board")
    )
)]
pub async fn vote(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Valid(Json(payload)): Valid<Json<VoteRequest>>,
) -> Result<Json<VoteResponse>, AppError> {
    let response = vote_service::vote(&state, &id, payload.session_id).await?;
    Ok(Json(response))
}
