use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        song::SongSummary,
        sse::{
            BoardSnapshotEvent, ClearedFlag, ClickMeterEvent, ConnectivityEvent, CountPulseEvent,
            FlagClearedEvent, FlagDirection, LinkFailedEvent, NewLeaderEvent, RankFlagEvent,
            SearchResultsEvent, ServerEvent, ToastStatus, VoteToastEvent,
        },
    },
    state::{SharedState, SseHub, board::Song, search::SearchOutcome},
};

const EVENT_CONNECTIVITY: &str = "connectivity";
const EVENT_LINK_FAILED: &str = "link.failed";
const EVENT_BOARD_SNAPSHOT: &str = "board.snapshot";
const EVENT_RANK_FLAG: &str = "rank.flag";
const EVENT_FLAG_CLEARED: &str = "rank.flag_cleared";
const EVENT_NEW_LEADER: &str = "rank.new_leader";
const EVENT_COUNT_PULSE: &str = "rank.count_pulse";
const EVENT_CLICK_METER: &str = "vote.click_meter";
const EVENT_VOTE_TOAST: &str = "vote.toast";
const EVENT_SEARCH_RESULTS: &str = "search.results";

/// Broadcast a connectivity transition of the live store link.
pub fn broadcast_connectivity(state: &SharedState, online: bool) {
    send_event(state.sse(), EVENT_CONNECTIVITY, &ConnectivityEvent { online });
}

/// Broadcast that the live link gave up after exhausting its retries.
pub fn broadcast_link_failed(state: &SharedState, attempts: u32) {
    send_event(state.sse(), EVENT_LINK_FAILED, &LinkFailedEvent { attempts });
}

/// Broadcast the full ranked board after a replacement.
pub fn broadcast_board_snapshot(state: &SharedState, songs: &[Song]) {
    let payload = BoardSnapshotEvent {
        songs: SongSummary::from_snapshot(songs),
    };
    send_event(state.sse(), EVENT_BOARD_SNAPSHOT, &payload);
}

/// Broadcast a moved-up / moved-down flag for a song.
pub fn broadcast_rank_flag(
    state: &SharedState,
    song_id: &str,
    direction: FlagDirection,
    expires_in_ms: u64,
) {
    let payload = RankFlagEvent {
        song_id: song_id.to_string(),
        direction,
        expires_in_ms,
    };
    send_event(state.sse(), EVENT_RANK_FLAG, &payload);
}

/// Broadcast that a rank flag expired on its own.
pub fn broadcast_flag_cleared(hub: &SseHub, song_id: &str, flag: ClearedFlag) {
    let payload = FlagClearedEvent {
        song_id: song_id.to_string(),
        flag,
    };
    send_event(hub, EVENT_FLAG_CLEARED, &payload);
}

/// Broadcast that a song took over the top spot.
pub fn broadcast_new_leader(state: &SharedState, song_id: &str, expires_in_ms: u64) {
    let payload = NewLeaderEvent {
        song_id: song_id.to_string(),
        expires_in_ms,
    };
    send_event(state.sse(), EVENT_NEW_LEADER, &payload);
}

/// Broadcast a vote-count pulse for a song that kept its position.
pub fn broadcast_count_pulse(state: &SharedState, song_id: &str, vote_count: u64) {
    let payload = CountPulseEvent {
        song_id: song_id.to_string(),
        vote_count,
    };
    send_event(state.sse(), EVENT_COUNT_PULSE, &payload);
}

/// Broadcast a click meter level change.
pub fn broadcast_click_meter(hub: &SseHub, song_id: &str, level: u32) {
    let payload = ClickMeterEvent {
        song_id: song_id.to_string(),
        level,
    };
    send_event(hub, EVENT_CLICK_METER, &payload);
}

/// Broadcast a transient vote toast.
pub fn broadcast_vote_toast(hub: &SseHub, song_id: &str, status: ToastStatus, ttl_ms: u64) {
    let payload = VoteToastEvent {
        song_id: song_id.to_string(),
        status,
        ttl_ms,
    };
    send_event(hub, EVENT_VOTE_TOAST, &payload);
}

/// Broadcast a settled result set of the shared display filter.
pub fn broadcast_search_results(state: &SharedState, query: &str, outcome: &SearchOutcome) {
    let payload = SearchResultsEvent {
        query: query.to_string(),
        searching: outcome.searching,
        song_ids: outcome.songs.iter().map(|song| song.id.clone()).collect(),
    };
    send_event(state.sse(), EVENT_SEARCH_RESULTS, &payload);
}

fn send_event(hub: &SseHub, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
