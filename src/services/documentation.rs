use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Encore board service.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::board_stream,
        crate::routes::board::get_songs,
        crate::routes::board::suggest_song,
        crate::routes::board::search_songs,
        crate::routes::board::set_filter,
        crate::routes::vote::vote,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::song::SongSummary,
            crate::dto::song::BoardResponse,
            crate::dto::song::SuggestSongRequest,
            crate::dto::song::SuggestSongResponse,
            crate::dto::vote::VoteRequest,
            crate::dto::vote::VoteResponse,
            crate::dto::search::FilterRequest,
            crate::dto::search::SearchResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::ConnectivityEvent,
            crate::dto::sse::BoardSnapshotEvent,
            crate::dto::sse::RankFlagEvent,
            crate::dto::sse::NewLeaderEvent,
            crate::dto::sse::CountPulseEvent,
            crate::dto::sse::ClickMeterEvent,
            crate::dto::sse::VoteToastEvent,
            crate::dto::sse::SearchResultsEvent,
            crate::state::search::SearchMode,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events stream"),
        (name = "board", description = "Board, vote, and search operations"),
    )
)]
pub struct ApiDoc;
