use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{
    services::{sse_events::broadcast_board_snapshot, sse_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/board",
    responses((status = 200, description = "Board SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream realtime board events to connected frontends.
///
/// Right after subscribing, the current board is re-broadcast so the new
/// client starts from a complete picture instead of waiting for the next
/// store push.
pub async fn board_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state);
    info!("new board SSE connection");

    if let Ok(event) =
        crate::dto::sse::ServerEvent::json(Some("handshake".to_string()), &sse_service::handshake(&state))
    {
        state.sse().broadcast(event);
    }
    broadcast_board_snapshot(&state, &state.board().current());

    sse_service::to_sse_stream(receiver)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/board", get(board_stream))
}
