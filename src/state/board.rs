//! The snapshot store: single source of truth for the song list.
//!
//! Holds the latest known list of active songs behind a `watch` channel.
//! Every write is a whole-value replacement of an `Arc`'d, already ranked
//! vector, so readers never observe a partial list.

use std::{sync::Arc, time::SystemTime};

use indexmap::IndexMap;
use tokio::sync::watch;
use tracing::warn;

use crate::{dao::models::SongEntity, state::ordering::SessionSeed};

/// A song on the board, as the engine and UI see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    /// Stable identifier assigned by the store.
    pub id: String,
    /// Song title.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Current vote count as last seen (authoritative or optimistic).
    pub vote_count: u64,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

impl Song {
    /// Validate a stored entity into a runtime song.
    ///
    /// Returns `None` (with a warning) for entries that make no sense; a
    /// malformed song is dropped, never allowed to poison the snapshot.
    fn from_entity(entity: SongEntity) -> Option<Self> {
        if entity.id.trim().is_empty() {
            warn!(title = %entity.title, "dropping song with empty id from snapshot");
            return None;
        }
        let Ok(vote_count) = u64::try_from(entity.vote_count) else {
            warn!(id = %entity.id, count = entity.vote_count, "dropping song with negative vote count");
            return None;
        };
        Some(Self {
            id: entity.id,
            title: entity.title,
            artist: entity.artist,
            vote_count,
            created_at: entity.created_at,
        })
    }
}

/// Validate a pushed song list into runtime songs.
///
/// Deactivated entries are filtered out, malformed ones are logged and
/// dropped, and duplicate ids keep only the last occurrence so the snapshot
/// invariant (each id exactly once) always holds.
pub fn sanitize_snapshot(entities: Vec<SongEntity>) -> Vec<Song> {
    let mut by_id: IndexMap<String, Song> = IndexMap::with_capacity(entities.len());
    for entity in entities {
        if !entity.active {
            continue;
        }
        if let Some(song) = Song::from_entity(entity) {
            if by_id.insert(song.id.clone(), song.clone()).is_some() {
                warn!(id = %song.id, "duplicate song id in pushed snapshot; keeping last");
            }
        }
    }
    by_id.into_values().collect()
}

/// Shared snapshot store publishing ranked song lists to subscribers.
pub struct SnapshotStore {
    songs: watch::Sender<Arc<Vec<Song>>>,
    seed: SessionSeed,
}

impl SnapshotStore {
    /// Create an empty store ranking ties with the given session seed.
    pub fn new(seed: SessionSeed) -> Self {
        let (songs, _) = watch::channel(Arc::new(Vec::new()));
        Self { songs, seed }
    }

    /// Seed used for the tie-break permutation.
    pub fn seed(&self) -> SessionSeed {
        self.seed
    }

    /// Subscribe to snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Song>>> {
        self.songs.subscribe()
    }

    /// Latest published snapshot, already ranked.
    pub fn current(&self) -> Arc<Vec<Song>> {
        self.songs.borrow().clone()
    }

    /// Look up a song by id in the current snapshot.
    pub fn find(&self, song_id: &str) -> Option<Song> {
        self.songs
            .borrow()
            .iter()
            .find(|song| song.id == song_id)
            .cloned()
    }

    /// Replace the whole board with an authoritative song list.
    pub fn replace(&self, songs: Vec<Song>) -> Arc<Vec<Song>> {
        self.publish(songs)
    }

    /// Apply one optimistic or store-pushed vote to a song.
    ///
    /// Returns the new snapshot, or `None` when the song is not on the
    /// board. The next authoritative replacement always wins over this.
    pub fn apply_vote(&self, song_id: &str) -> Option<Arc<Vec<Song>>> {
        let mut songs: Vec<Song> = self.songs.borrow().as_ref().clone();
        let song = songs.iter_mut().find(|song| song.id == song_id)?;
        song.vote_count += 1;
        Some(self.publish(songs))
    }

    /// Insert (or overwrite) a single suggested song.
    pub fn apply_suggestion(&self, song: Song) -> Arc<Vec<Song>> {
        let mut songs: Vec<Song> = self.songs.borrow().as_ref().clone();
        match songs.iter_mut().find(|existing| existing.id == song.id) {
            Some(existing) => *existing = song,
            None => songs.push(song),
        }
        self.publish(songs)
    }

    fn publish(&self, mut songs: Vec<Song>) -> Arc<Vec<Song>> {
        let seed = self.seed;
        songs.sort_by_key(|song| (std::cmp::Reverse(song.vote_count), seed.tiebreak(&song.id)));
        let next = Arc::new(songs);
        // send_replace: the snapshot must land even when nobody is
        // subscribed, since current() and find() read the stored value.
        self.songs.send_replace(next.clone());
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str, votes: u64) -> Song {
        Song {
            id: id.to_string(),
            title: format!("title-{id}"),
            artist: format!("artist-{id}"),
            vote_count: votes,
            created_at: SystemTime::UNIX_EPOCH,
        }
    }

    fn entity(id: &str, votes: i64, active: bool) -> SongEntity {
        SongEntity {
            id: id.to_string(),
            title: format!("title-{id}"),
            artist: format!("artist-{id}"),
            vote_count: votes,
            created_at: SystemTime::UNIX_EPOCH,
            active,
        }
    }

    #[test]
    fn ranked_by_votes_then_session_tiebreak() {
        let store = SnapshotStore::new(SessionSeed::from_value(99));
        let snapshot = store.replace(vec![song("1", 5), song("2", 5), song("3", 10)]);

        assert_eq!(snapshot[0].id, "3");

        // The tied pair keeps a session-deterministic order across renders.
        let tied: Vec<String> = snapshot[1..].iter().map(|s| s.id.clone()).collect();
        let again = store.replace(vec![song("2", 5), song("3", 10), song("1", 5)]);
        let tied_again: Vec<String> = again[1..].iter().map(|s| s.id.clone()).collect();
        assert_eq!(tied, tied_again);
    }

    #[test]
    fn every_active_song_appears_exactly_once() {
        let sanitized = sanitize_snapshot(vec![
            entity("a", 1, true),
            entity("a", 2, true),
            entity("b", 0, true),
            entity("gone", 7, false),
        ]);
        let ids: Vec<&str> = sanitized.iter().map(|song| song.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        // Last duplicate wins.
        assert_eq!(sanitized[0].vote_count, 2);
    }

    #[test]
    fn sanitize_drops_malformed_entries() {
        let sanitized = sanitize_snapshot(vec![
            entity("", 1, true),
            entity("neg", -3, true),
            entity("ok", 0, true),
        ]);
        assert_eq!(sanitized.len(), 1);
        assert_eq!(sanitized[0].id, "ok");
    }

    #[test]
    fn apply_vote_reorders_the_board() {
        let store = SnapshotStore::new(SessionSeed::from_value(5));
        store.replace(vec![song("a", 2), song("b", 1)]);

        let next = store.apply_vote("b").unwrap();
        assert_eq!(next.iter().filter(|s| s.id == "b").count(), 1);
        // Each vote builds on the last: b walks 1 → 2 → 3 and takes the top.
        let next = store.apply_vote("b").unwrap();
        assert_eq!(next[0].id, "b");
        assert_eq!(next[0].vote_count, 3);

        assert!(store.apply_vote("missing").is_none());
    }

    #[test]
    fn snapshot_persists_without_any_subscriber() {
        let store = SnapshotStore::new(SessionSeed::from_value(5));
        store.replace(vec![song("a", 2), song("b", 1)]);
        assert_eq!(store.current().len(), 2);

        store.apply_vote("b").unwrap();
        store.apply_vote("b").unwrap();
        // Reads go through the stored value, not the return of the write.
        assert_eq!(store.find("b").unwrap().vote_count, 3);
        assert_eq!(store.current()[0].id, "b");
    }

    #[test]
    fn suggestion_lands_on_the_board_once() {
        let store = SnapshotStore::new(SessionSeed::from_value(5));
        store.replace(vec![song("a", 2)]);

        let next = store.apply_suggestion(song("new", 0));
        assert_eq!(next.len(), 2);
        let next = store.apply_suggestion(song("new", 1));
        assert_eq!(next.len(), 2);
        assert_eq!(store.find("new").unwrap().vote_count, 1);
    }
}
