//! Driver of the one logical store subscription.
//!
//! Owns the reconnect loop around [`LinkStateMachine`], turns store pushes
//! into snapshot replacements, and runs the publish pipeline every board
//! update goes through: rank diffing, flag arming, SSE fan-out, and search
//! corpus refresh.

use std::sync::Arc;

use futures::StreamExt;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{
    dao::{
        models::StorePush,
        song_store::PushStream,
    },
    dto::sse::{ClearedFlag, FlagDirection},
    error::ServiceError,
    services::sse_events::{
        broadcast_board_snapshot, broadcast_connectivity, broadcast_count_pulse,
        broadcast_flag_cleared, broadcast_link_failed, broadcast_new_leader, broadcast_rank_flag,
    },
    state::{
        SharedState,
        board::{Song, sanitize_snapshot},
        link::{LinkDirective, LinkStateMachine},
        rank::{FlagSlot, RankFlag, RankShift},
    },
};

/// Run the live link until it permanently fails or the process stops.
///
/// The loop owns the whole lifecycle: open the subscription, drain pushes,
/// and on any drop walk the backoff schedule before trying again. Exhausting
/// the schedule is terminal; only a process restart recovers from it.
pub async fn run(state: SharedState) {
    let policy = state.config().backoff();
    let mut link = LinkStateMachine::new(policy);
    if !link.connect() {
        return;
    }

    loop {
        match open_subscription(&state).await {
            Ok(mut stream) => {
                link.opened();
                announce_online(&state, true);
                info!("live store link established");

                while let Some(push) = stream.next().await {
                    handle_push(&state, push);
                }

                announce_online(&state, false);
                warn!("live store link dropped");
            }
            Err(err) => {
                warn!(error = %err, "failed to open store subscription");
            }
        }

        match link.lost() {
            LinkDirective::Retry { attempt, delay } => {
                info!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "scheduling store reconnect"
                );
                sleep(delay).await;
                if !link.retry_due() {
                    break;
                }
            }
            LinkDirective::GiveUp => {
                announce_online(&state, false);
                broadcast_link_failed(&state, policy.max_attempts);
                error!("live store link failed permanently; restart required");
                break;
            }
        }
    }
}

async fn open_subscription(state: &SharedState) -> Result<PushStream, ServiceError> {
    let store = state.require_song_store().await?;
    Ok(store.subscribe().await?)
}

/// Flip the connectivity flag and tell subscribers, once per transition.
fn announce_online(state: &SharedState, online: bool) {
    if state.is_online() == online {
        return;
    }
    state.set_online(online);
    broadcast_connectivity(state, online);
}

/// Apply one store push to the board.
fn handle_push(state: &SharedState, push: StorePush) {
    match push {
        StorePush::Snapshot { songs } => {
            // Authoritative list: any optimistic bump still awaiting its
            // echo is folded in (or superseded) here.
            state.gate().reset_in_flight();
            let snapshot = state.board().replace(sanitize_snapshot(songs));
            publish_update(state, snapshot);
        }
        StorePush::VoteRecorded { song_id } => {
            // The echo of a vote this process issued: the board already
            // counted it optimistically.
            if state.gate().absorb_echo(&song_id) {
                return;
            }
            match state.board().apply_vote(&song_id) {
                Some(snapshot) => publish_update(state, snapshot),
                None => warn!(song_id, "vote push for a song not on the board"),
            }
        }
        StorePush::SongSuggested { song } => {
            // Same validation path as a full snapshot; a malformed or
            // inactive entry is dropped.
            match sanitize_snapshot(vec![song]).pop() {
                Some(song) => {
                    let snapshot = state.board().apply_suggestion(song);
                    publish_update(state, snapshot);
                }
                None => warn!("dropping malformed suggested song push"),
            }
        }
        StorePush::Raw(value) => {
            warn!(payload = %value, "ignoring unrecognized store push");
        }
    }
}

/// Publish pipeline run after every snapshot replacement, wherever it came
/// from: diff ranks, arm flags, fan events out, refresh the search corpus.
pub fn publish_update(state: &SharedState, snapshot: Arc<Vec<Song>>) {
    let deltas = state.ranks().observe(Arc::clone(&snapshot));
    broadcast_board_snapshot(state, &snapshot);

    for delta in deltas {
        if let Some(shift) = delta.shift {
            let (direction, flag) = match shift {
                RankShift::Up => (FlagDirection::Up, RankFlag::MovedUp),
                RankShift::Down => (FlagDirection::Down, RankFlag::MovedDown),
            };
            let ttl = state.config().move_flag_ttl();
            arm_flag(state, &delta.song_id, FlagSlot::Move, flag, ttl);
            broadcast_rank_flag(state, &delta.song_id, direction, ttl.as_millis() as u64);
        }

        // A song already celebrating does not celebrate again.
        if delta.took_lead && !state.flags().leader_visible(&delta.song_id) {
            let ttl = state.config().lead_flag_ttl();
            arm_flag(state, &delta.song_id, FlagSlot::Leader, RankFlag::Leader, ttl);
            broadcast_new_leader(state, &delta.song_id, ttl.as_millis() as u64);
        }

        if delta.count_pulse {
            if let Some(song) = snapshot.iter().find(|song| song.id == delta.song_id) {
                broadcast_count_pulse(state, &delta.song_id, song.vote_count);
            }
        }
    }

    // The filter forwarder picks the recomputed results up off the watch
    // channel and broadcasts them.
    state.search_index().set_corpus(snapshot);
    state.live_search().recompute();
}

fn arm_flag(
    state: &SharedState,
    song_id: &str,
    slot: FlagSlot,
    flag: RankFlag,
    ttl: std::time::Duration,
) {
    let expire_state = Arc::clone(state);
    state.flags().arm(
        song_id.to_string(),
        slot,
        flag,
        ttl,
        move |song_id, slot| {
            let cleared = match slot {
                FlagSlot::Move => ClearedFlag::Move,
                FlagSlot::Leader => ClearedFlag::Leader,
            };
            broadcast_flag_cleared(expire_state.sse(), song_id, cleared);
        },
    );
}
