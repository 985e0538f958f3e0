//! Shared in-memory state of the board engine.

pub mod board;
pub mod link;
pub mod ordering;
pub mod rank;
mod sse;
pub mod search;
pub mod votes;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::song_store::SongStore,
    state::{
        board::SnapshotStore,
        ordering::SessionSeed,
        rank::{FlagBoard, RankTracker},
        search::{LiveSearch, SearchIndex},
        votes::{ClickMeter, VoteGate},
    },
};

pub use self::sse::SseHub;

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state: the snapshot store, all per-song transient
/// state, the SSE hub, and the handle to the song store.
pub struct AppState {
    config: AppConfig,
    song_store: RwLock<Option<Arc<dyn SongStore>>>,
    sse: SseHub,
    board: SnapshotStore,
    ranks: RankTracker,
    flags: Arc<FlagBoard>,
    gate: VoteGate,
    meter: Arc<ClickMeter>,
    search_index: Arc<SearchIndex>,
    live_search: LiveSearch,
    online: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned
    /// cheaply.
    ///
    /// The application starts offline and degraded until a song store is
    /// installed and the live link opens.
    pub fn new(config: AppConfig) -> SharedState {
        let seed = config
            .session_seed
            .map(SessionSeed::from_value)
            .unwrap_or_else(SessionSeed::generate);
        let (online, _rx) = watch::channel(false);
        let search_index = Arc::new(SearchIndex::new());
        let live_search = LiveSearch::spawn(Arc::clone(&search_index), config.debounce());
        Arc::new(Self {
            song_store: RwLock::new(None),
            sse: SseHub::new(64),
            board: SnapshotStore::new(seed),
            ranks: RankTracker::new(),
            flags: Arc::new(FlagBoard::new()),
            gate: VoteGate::new(config.cooldown()),
            meter: Arc::new(ClickMeter::new(config.click_quiet(), config.click_step())),
            search_index,
            live_search,
            online,
            config,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current song store, if one is installed.
    pub async fn song_store(&self) -> Option<Arc<dyn SongStore>> {
        let guard = self.song_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a new song store implementation.
    pub async fn install_song_store(&self, store: Arc<dyn SongStore>) {
        let mut guard = self.song_store.write().await;
        *guard = Some(store);
    }

    /// Obtain the current song store or fail with a degraded-mode error.
    pub async fn require_song_store(&self) -> Result<Arc<dyn SongStore>, crate::error::ServiceError> {
        self.song_store()
            .await
            .ok_or(crate::error::ServiceError::Degraded)
    }

    /// Whether the application currently has no store installed.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.song_store.read().await;
        guard.is_none()
    }

    /// Broadcast hub for the board SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// The snapshot store holding the ranked song list.
    pub fn board(&self) -> &SnapshotStore {
        &self.board
    }

    /// Rank baseline tracker.
    pub fn ranks(&self) -> &RankTracker {
        &self.ranks
    }

    /// The self-expiring rank flag board.
    pub fn flags(&self) -> &Arc<FlagBoard> {
        &self.flags
    }

    /// Vote admission gate.
    pub fn gate(&self) -> &VoteGate {
        &self.gate
    }

    /// Per-song click meter.
    pub fn meter(&self) -> &Arc<ClickMeter> {
        &self.meter
    }

    /// Search index over the current corpus.
    pub fn search_index(&self) -> &Arc<SearchIndex> {
        &self.search_index
    }

    /// Debounced shared display filter.
    pub fn live_search(&self) -> &LiveSearch {
        &self.live_search
    }

    /// Current connectivity flag of the live store link.
    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Subscribe to connectivity updates.
    pub fn online_watcher(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    /// Update the connectivity flag, notifying watchers on change.
    pub fn set_online(&self, value: bool) {
        self.online.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}
