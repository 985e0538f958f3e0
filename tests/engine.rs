//! End-to-end flow through the in-memory store: pushes go in one side, the
//! ranked board and its events come out the other.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use encore_board::{
    config::AppConfig,
    dao::{memory::MemorySongStore, models::SongEntity, song_store::SongStore},
    services::live_service,
    state::{AppState, SharedState, board::Song},
};
use serde_json::json;
use tokio::time::sleep;
use uuid::Uuid;

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

/// Install the store, start the live link, and hand back the shared state.
async fn boot(store: &MemorySongStore) -> SharedState {
    let state = AppState::new(AppConfig {
        session_seed: Some(7),
        ..AppConfig::default()
    });
    state.install_song_store(Arc::new(store.clone())).await;
    tokio::spawn(live_service::run(state.clone()));
    state
}

/// Poll the board until `pred` holds; panics if it never does.
async fn wait_until(state: &SharedState, pred: impl Fn(&[Song]) -> bool) {
    for _ in 0..200 {
        if pred(&state.board().current()) {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("board never reached the expected shape");
}

#[tokio::test(start_paused = true)]
async fn store_pushes_flow_onto_the_board() {
    let store = MemorySongStore::new();
    store.seed([entity("a", 4), entity("b", 1)]);
    let state = boot(&store).await;

    wait_until(&state, |songs| songs.len() == 2).await;
    assert_eq!(state.board().current()[0].id, "a");
    assert!(state.is_online());

    // A vote recorded elsewhere arrives as a push and bumps the board.
    store.record_vote("b".into(), Uuid::new_v4()).await.unwrap();
    wait_until(&state, |songs| {
        songs.iter().any(|song| song.id == "b" && song.vote_count == 2)
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn suggestions_and_deactivations_propagate() {
    let store = MemorySongStore::new();
    store.seed([entity("a", 3)]);
    let state = boot(&store).await;
    wait_until(&state, |songs| songs.len() == 1).await;

    let song = store
        .suggest_song("Seven Nation Army".into(), "The White Stripes".into())
        .await
        .unwrap();
    wait_until(&state, |songs| songs.iter().any(|s| s.id == song.id)).await;

    store.deactivate_song("a".into()).await.unwrap();
    wait_until(&state, |songs| songs.iter().all(|s| s.id != "a")).await;
    assert_eq!(state.board().current().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn malformed_pushes_do_not_kill_the_link() {
    let store = MemorySongStore::new();
    store.seed([entity("a", 1)]);
    let state = boot(&store).await;
    wait_until(&state, |songs| songs.len() == 1).await;

    store.push_raw(json!({ "kind": "telemetry", "blob": [1, 2, 3] }));
    store.push_raw(json!("not even an object"));

    // The link survives and keeps applying real pushes.
    store.record_vote("a".into(), Uuid::new_v4()).await.unwrap();
    wait_until(&state, |songs| songs[0].vote_count == 2).await;
    assert!(state.is_online());
}
