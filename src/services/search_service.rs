//! One-shot search queries and the shared display filter.

use tracing::info;

use crate::{
    dto::{
        search::{FilterRequest, SearchParams, SearchResponse},
        song::SongSummary,
    },
    services::sse_events::broadcast_search_results,
    state::{SharedState, search::SearchOutcome},
};

/// Run a one-shot search against the current corpus.
///
/// Bypasses the debounce entirely: the caller gets an answer for exactly the
/// term it sent, and the shared filter is left alone.
pub fn search(state: &SharedState, params: &SearchParams) -> SearchResponse {
    let outcome = state.search_index().query(&params.q, params.mode);
    to_response(params.q.trim().to_lowercase(), outcome)
}

/// Update the shared display filter.
///
/// The term goes through the debounce window; a mode switch is applied
/// immediately to whatever term already settled.
pub fn set_filter(state: &SharedState, request: FilterRequest) -> SearchResponse {
    if let Some(mode) = request.mode {
        state.live_search().set_mode(mode);
    }
    state.live_search().set_query(request.q);

    // Respond with the currently settled view; the new term lands on the
    // SSE stream once its debounce fires.
    to_response(state.live_search().settled_query(), state.live_search().results())
}

/// Forward settled filter results onto the SSE stream.
///
/// Runs for the lifetime of the process; ends when the state (and with it
/// the debounce task) is torn down.
pub async fn run_filter_forwarder(state: SharedState) {
    let mut results = state.live_search().subscribe();
    loop {
        match results.changed().await {
            Ok(()) => {
                let outcome = results.borrow_and_update().clone();
                let query = state.live_search().settled_query();
                broadcast_search_results(&state, &query, &outcome);
            }
            Err(_) => {
                info!("search filter channel closed");
                return;
            }
        }
    }
}

fn to_response(query: String, outcome: SearchOutcome) -> SearchResponse {
    SearchResponse {
        query,
        searching: outcome.searching,
        songs: SongSummary::from_snapshot(&outcome.songs),
    }
}
