use std::{
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::SystemTime,
};

use futures::{StreamExt, future::BoxFuture};
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dao::{
    models::{SongEntity, StorePush, VoteEntity},
    song_store::{PushStream, SongStore},
    storage::{StorageError, StorageResult},
};

const PUSH_CHANNEL_CAPACITY: usize = 64;

/// In-process [`SongStore`] backed by plain maps and a broadcast channel.
///
/// Serves as the store for single-host deployments and as the harness the
/// integration tests drive the engine with. Push fan-out mirrors what a
/// managed realtime store delivers: a full snapshot on subscribe, then
/// per-interaction events.
#[derive(Clone)]
pub struct MemorySongStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    songs: Mutex<IndexMap<String, SongEntity>>,
    votes: Mutex<Vec<VoteEntity>>,
    pushes: broadcast::Sender<StorePush>,
    next_id: AtomicU64,
}

impl Default for MemorySongStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySongStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (pushes, _) = broadcast::channel(PUSH_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MemoryInner {
                songs: Mutex::new(IndexMap::new()),
                votes: Mutex::new(Vec::new()),
                pushes,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Insert a batch of songs and push a full snapshot to subscribers.
    pub fn seed(&self, songs: impl IntoIterator<Item = SongEntity>) {
        {
            let mut guard = self.inner.songs.lock().expect("songs lock poisoned");
            for song in songs {
                guard.insert(song.id.clone(), song);
            }
        }
        self.push_snapshot();
    }

    /// Inject an arbitrary payload into the push stream.
    ///
    /// Lets tests exercise the defensive-parse path of the live link.
    pub fn push_raw(&self, payload: serde_json::Value) {
        let _ = self.inner.pushes.send(StorePush::Raw(payload));
    }

    /// Number of vote intents recorded so far.
    pub fn recorded_votes(&self) -> usize {
        self.inner.votes.lock().expect("votes lock poisoned").len()
    }

    fn active_songs(&self) -> Vec<SongEntity> {
        let guard = self.inner.songs.lock().expect("songs lock poisoned");
        guard.values().filter(|song| song.active).cloned().collect()
    }

    fn push_snapshot(&self) {
        let _ = self.inner.pushes.send(StorePush::Snapshot {
            songs: self.active_songs(),
        });
    }
}

impl SongStore for MemorySongStore {
    fn subscribe(&self) -> BoxFuture<'static, StorageResult<PushStream>> {
        let store = self.clone();
        Box::pin(async move {
            let mut receiver = store.inner.pushes.subscribe();
            let initial = StorePush::Snapshot {
                songs: store.active_songs(),
            };

            let stream = async_stream::stream! {
                yield initial;
                loop {
                    match receiver.recv().await {
                        Ok(push) => yield push,
                        // Skip lagged messages; the next full snapshot
                        // resynchronizes subscribers anyway.
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            };

            Ok(stream.boxed() as PushStream)
        })
    }

    fn top_songs(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<SongEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut songs = store.active_songs();
            songs.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));
            songs.truncate(limit);
            Ok(songs)
        })
    }

    fn record_vote(
        &self,
        song_id: String,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<SongEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let updated = {
                let mut guard = store.inner.songs.lock().expect("songs lock poisoned");
                let song = guard
                    .get_mut(&song_id)
                    .filter(|song| song.active)
                    .ok_or_else(|| StorageError::UnknownSong {
                        song_id: song_id.clone(),
                    })?;
                song.vote_count += 1;
                song.clone()
            };

            store
                .inner
                .votes
                .lock()
                .expect("votes lock poisoned")
                .push(VoteEntity {
                    song_id: song_id.clone(),
                    session_id,
                    issued_at: SystemTime::now(),
                });

            let _ = store.inner.pushes.send(StorePush::VoteRecorded { song_id });
            Ok(updated)
        })
    }

    fn suggest_song(
        &self,
        title: String,
        artist: String,
    ) -> BoxFuture<'static, StorageResult<SongEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let id = format!("song-{:04}", store.inner.next_id.fetch_add(1, Ordering::Relaxed));
            let song = SongEntity {
                id: id.clone(),
                title,
                artist,
                vote_count: 0,
                created_at: SystemTime::now(),
                active: true,
            };

            store
                .inner
                .songs
                .lock()
                .expect("songs lock poisoned")
                .insert(id, song.clone());

            let _ = store.inner.pushes.send(StorePush::SongSuggested { song: song.clone() });
            Ok(song)
        })
    }

    fn deactivate_song(&self, song_id: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            {
                let mut guard = store.inner.songs.lock().expect("songs lock poisoned");
                let song = guard
                    .get_mut(&song_id)
                    .ok_or_else(|| StorageError::UnknownSong {
                        song_id: song_id.clone(),
                    })?;
                song.active = false;
            }

            // Deactivation re-announces the whole board so subscribers drop
            // the song atomically.
            store.push_snapshot();
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
