//! Vote intent handling: admission, optimistic board update, and the
//! fire-and-forget store write.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{sse::ToastStatus, vote::VoteResponse},
    error::ServiceError,
    services::{
        live_service::publish_update,
        sse_events::{broadcast_click_meter, broadcast_vote_toast},
    },
    state::SharedState,
};

/// Handle one vote intent for `song_id` from `session_id`.
///
/// A rejected intent (cool-down still running) is not an error; the response
/// simply reports the unchanged display state. An accepted intent updates
/// the board optimistically and settles against the store in the background.
/// The next authoritative snapshot reconciles the count either way, so a
/// failed write is never rolled back locally.
pub async fn vote(
    state: &SharedState,
    song_id: &str,
    session_id: Uuid,
) -> Result<VoteResponse, ServiceError> {
    let song = state
        .board()
        .find(song_id)
        .ok_or_else(|| ServiceError::NotFound(format!("no song with id {song_id}")))?;

    if !state.gate().admit(session_id, song_id, Instant::now().into_std()) {
        return Ok(VoteResponse {
            accepted: false,
            vote_count: song.vote_count,
            click_level: state.meter().level(song_id),
        });
    }

    // Escalating click feedback, with its own decay broadcasts.
    let decay_state = Arc::clone(state);
    let click_level = state.meter().bump(song_id, move |song_id, level| {
        broadcast_click_meter(decay_state.sse(), song_id, level);
    });
    broadcast_click_meter(state.sse(), song_id, click_level);

    // Optimistic bump; the store's next push is authoritative.
    let vote_count = match state.board().apply_vote(song_id) {
        Some(snapshot) => {
            let count = snapshot
                .iter()
                .find(|song| song.id == song_id)
                .map(|song| song.vote_count)
                .unwrap_or(song.vote_count + 1);
            publish_update(state, snapshot);
            count
        }
        None => song.vote_count,
    };

    state.gate().mark_in_flight(session_id, song_id);

    // Acceptance feedback fires immediately; the write's fate never holds
    // up the toast, only a failure adds one later.
    let toast_ttl = state.config().toast_ttl().as_millis() as u64;
    broadcast_vote_toast(state.sse(), song_id, ToastStatus::Accepted, toast_ttl);

    settle_in_background(state, song_id.to_string(), session_id);

    Ok(VoteResponse {
        accepted: true,
        vote_count,
        click_level,
    })
}

/// Send the vote to the store without holding up the response.
///
/// On success the in-flight marker stays armed so the store's push echo is
/// absorbed instead of counted a second time. When no echo will come (no
/// store, or the write failed) the marker is dropped and a failure toast
/// goes out.
fn settle_in_background(state: &SharedState, song_id: String, session_id: Uuid) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        let toast_ttl = state.config().toast_ttl().as_millis() as u64;
        let outcome = match state.song_store().await {
            Some(store) => store.record_vote(song_id.clone(), session_id).await,
            None => {
                warn!(song_id, "vote issued while degraded; dropping store write");
                state.gate().clear_in_flight(session_id, &song_id);
                broadcast_vote_toast(state.sse(), &song_id, ToastStatus::Failed, toast_ttl);
                return;
            }
        };

        if let Err(err) = outcome {
            warn!(song_id, error = %err, "store rejected vote; awaiting next snapshot");
            state.gate().clear_in_flight(session_id, &song_id);
            broadcast_vote_toast(state.sse(), &song_id, ToastStatus::Failed, toast_ttl);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    use tokio::{sync::broadcast, time::sleep};

    use crate::{
        config::AppConfig,
        dao::{memory::MemorySongStore, models::SongEntity},
        dto::sse::ServerEvent,
        services::{board_service, live_service},
        state::{AppState, board::sanitize_snapshot},
    };

    fn drain_toasts(receiver: &mut broadcast::Receiver<ServerEvent>) -> Vec<String> {
        let mut statuses = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            if event.event.as_deref() == Some("vote.toast") {
                let payload: serde_json::Value =
                    serde_json::from_str(&event.data).expect("toast payload");
                statuses.push(payload["status"].as_str().expect("status field").to_string());
            }
        }
        statuses
    }

    fn entity(id: &str, votes: i64) -> SongEntity {
        SongEntity {
            id: id.to_string(),
            title: format!("title-{id}"),
            artist: format!("artist-{id}"),
            vote_count: votes,
            created_at: SystemTime::UNIX_EPOCH,
            active: true,
        }
    }

    async fn test_state(store: &MemorySongStore) -> SharedState {
        let state = AppState::new(AppConfig {
            session_seed: Some(7),
            ..AppConfig::default()
        });
        state.install_song_store(Arc::new(store.clone())).await;
        board_service::initial_paint(&state)
            .await
            .expect("initial paint");
        state
    }

    #[tokio::test]
    async fn voting_for_an_unknown_song_is_not_found() {
        let store = MemorySongStore::new();
        store.seed([entity("a", 1)]);
        let state = test_state(&store).await;

        let err = vote(&state, "missing", Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_rejects_rapid_double_votes() {
        let store = MemorySongStore::new();
        store.seed([entity("a", 2), entity("b", 1)]);
        let state = test_state(&store).await;
        let session = Uuid::new_v4();

        let first = vote(&state, "a", session).await.unwrap();
        assert!(first.accepted);
        assert_eq!(first.vote_count, 3);
        assert_eq!(first.click_level, 1);

        // Inside the 300ms window: silently rejected, display untouched.
        let second = vote(&state, "a", session).await.unwrap();
        assert!(!second.accepted);
        assert_eq!(second.vote_count, 3);

        sleep(Duration::from_millis(400)).await;
        let third = vote(&state, "a", session).await.unwrap();
        assert!(third.accepted);
        assert_eq!(third.vote_count, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_votes_settle_against_the_store() {
        let store = MemorySongStore::new();
        store.seed([entity("a", 0)]);
        let state = test_state(&store).await;
        let session = Uuid::new_v4();

        let response = vote(&state, "a", session).await.unwrap();
        assert!(response.accepted);
        assert!(state.gate().is_in_flight(session, "a"));

        // Let the background settlement run. The marker outlives a
        // successful write: the store's push echo retires it.
        sleep(Duration::from_millis(50)).await;
        assert_eq!(store.recorded_votes(), 1);
        assert!(state.gate().is_in_flight(session, "a"));
    }

    #[tokio::test(start_paused = true)]
    async fn store_echo_of_an_own_vote_counts_once() {
        let store = MemorySongStore::new();
        store.seed([entity("a", 0)]);
        let state = test_state(&store).await;
        tokio::spawn(live_service::run(state.clone()));
        sleep(Duration::from_millis(20)).await;

        let session = Uuid::new_v4();
        let response = vote(&state, "a", session).await.unwrap();
        assert!(response.accepted);
        assert_eq!(response.vote_count, 1);

        // The write settles and its push echo comes back through the link;
        // the board must agree with the store, not run one ahead of it.
        sleep(Duration::from_millis(100)).await;
        assert_eq!(store.recorded_votes(), 1);
        assert_eq!(state.board().find("a").unwrap().vote_count, 1);
        assert!(!state.gate().is_in_flight(session, "a"));
    }

    #[tokio::test(start_paused = true)]
    async fn acceptance_toast_fires_before_the_write_settles() {
        let store = MemorySongStore::new();
        store.seed([entity("a", 0)]);
        let state = test_state(&store).await;
        let mut events = state.sse().subscribe();

        vote(&state, "a", Uuid::new_v4()).await.unwrap();
        // No settlement has run yet; the toast rides on acceptance alone.
        assert_eq!(drain_toasts(&mut events), vec!["accepted"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_settlement_raises_a_failure_toast() {
        // No store installed, so the write can never settle.
        let state = AppState::new(AppConfig {
            session_seed: Some(7),
            ..AppConfig::default()
        });
        state.board().replace(sanitize_snapshot(vec![entity("a", 0)]));
        let mut events = state.sse().subscribe();
        let session = Uuid::new_v4();

        vote(&state, "a", session).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(drain_toasts(&mut events), vec!["accepted", "failed"]);
        assert!(!state.gate().is_in_flight(session, "a"));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_votes_never_reach_the_store() {
        let store = MemorySongStore::new();
        store.seed([entity("a", 0)]);
        let state = test_state(&store).await;
        let session = Uuid::new_v4();

        vote(&state, "a", session).await.unwrap();
        vote(&state, "a", session).await.unwrap();
        vote(&state, "a", session).await.unwrap();

        sleep(Duration::from_millis(50)).await;
        // Only the first intent passed the gate.
        assert_eq!(store.recorded_votes(), 1);
    }
}
