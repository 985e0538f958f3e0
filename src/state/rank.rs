//! Rank change detection and self-expiring rank flags.
//!
//! `diff_ranks` is the pure diff between two consecutive ranked snapshots;
//! `RankTracker` keeps the baseline so the very first snapshot produces no
//! events; `FlagBoard` owns the per-song flag map and its expiry timers.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use dashmap::DashMap;
use tokio::{task::JoinHandle, time::sleep};

use crate::state::board::Song;

/// Direction of a rank move between two consecutive snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankShift {
    /// The song's index decreased.
    Up,
    /// The song's index increased.
    Down,
}

/// One song's change between two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankDelta {
    /// Song the delta applies to.
    pub song_id: String,
    /// Positional move, if the index changed.
    pub shift: Option<RankShift>,
    /// The song moved into index 0 from a non-zero index.
    pub took_lead: bool,
    /// Vote count grew without the position changing.
    pub count_pulse: bool,
}

/// Diff two consecutive ranked snapshots per song id.
///
/// Songs only present in one snapshot produce nothing; a brand-new entry has
/// no previous position to move from.
pub fn diff_ranks(previous: &[Song], next: &[Song]) -> Vec<RankDelta> {
    let mut previous_rank: HashMap<&str, (usize, u64)> = HashMap::with_capacity(previous.len());
    for (index, song) in previous.iter().enumerate() {
        previous_rank.insert(song.id.as_str(), (index, song.vote_count));
    }

    let mut deltas = Vec::new();
    for (new_index, song) in next.iter().enumerate() {
        let Some(&(old_index, old_count)) = previous_rank.get(song.id.as_str()) else {
            continue;
        };

        let shift = match new_index.cmp(&old_index) {
            std::cmp::Ordering::Less => Some(RankShift::Up),
            std::cmp::Ordering::Greater => Some(RankShift::Down),
            std::cmp::Ordering::Equal => None,
        };
        let took_lead = new_index == 0 && old_index > 0;
        let count_pulse = shift.is_none() && song.vote_count > old_count;

        if shift.is_some() || took_lead || count_pulse {
            deltas.push(RankDelta {
                song_id: song.id.clone(),
                shift,
                took_lead,
                count_pulse,
            });
        }
    }
    deltas
}

/// Baseline keeper: the first snapshot ever observed is stored without
/// producing events, so initial load never triggers a "everything moved"
/// burst.
pub struct RankTracker {
    baseline: Mutex<Option<Arc<Vec<Song>>>>,
}

impl Default for RankTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RankTracker {
    /// Create a tracker that has not seen any snapshot yet.
    pub fn new() -> Self {
        Self {
            baseline: Mutex::new(None),
        }
    }

    /// Record `next` as the latest snapshot and return the deltas against
    /// the previous one, or an empty list when `next` is the first.
    pub fn observe(&self, next: Arc<Vec<Song>>) -> Vec<RankDelta> {
        let mut guard = self.baseline.lock().expect("baseline lock poisoned");
        let deltas = match guard.as_ref() {
            Some(previous) => diff_ranks(previous, &next),
            None => Vec::new(),
        };
        *guard = Some(next);
        deltas
    }
}

/// Which flag slot a timer belongs to; a song can carry a move flag and a
/// leader flag at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagSlot {
    /// Generic moved-up / moved-down marker.
    Move,
    /// Celebratory new-leader marker with its own longer expiry.
    Leader,
}

/// A visible, self-expiring rank flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankFlag {
    /// Moved up since the previous snapshot.
    MovedUp,
    /// Moved down since the previous snapshot.
    MovedDown,
    /// Became the new #1.
    Leader,
}

/// Keyed map of visible flags plus the timers that expire them.
///
/// Timers are tracked per (song, slot) and always cancelled before a
/// replacement is armed, so a stale expiry can never clear a newer flag.
pub struct FlagBoard {
    flags: DashMap<(String, FlagSlot), RankFlag>,
    timers: DashMap<(String, FlagSlot), JoinHandle<()>>,
}

impl Default for FlagBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl FlagBoard {
    /// Create an empty flag board.
    pub fn new() -> Self {
        Self {
            flags: DashMap::new(),
            timers: DashMap::new(),
        }
    }

    /// Raise `flag` for `ttl`, replacing any pending expiry for the same
    /// (song, slot). `on_expire` runs once when the flag times out.
    pub fn arm(
        self: &Arc<Self>,
        song_id: String,
        slot: FlagSlot,
        flag: RankFlag,
        ttl: Duration,
        on_expire: impl FnOnce(&str, FlagSlot) + Send + 'static,
    ) {
        let key = (song_id.clone(), slot);
        self.flags.insert(key.clone(), flag);

        if let Some((_, stale)) = self.timers.remove(&key) {
            stale.abort();
        }

        let board = Arc::clone(self);
        let handle = tokio::spawn(async move {
            sleep(ttl).await;
            let key = (song_id, slot);
            board.flags.remove(&key);
            board.timers.remove(&key);
            on_expire(&key.0, slot);
        });
        self.timers.insert(key, handle);
    }

    /// Current flag for a (song, slot), if still visible.
    pub fn get(&self, song_id: &str, slot: FlagSlot) -> Option<RankFlag> {
        self.flags
            .get(&(song_id.to_string(), slot))
            .map(|entry| *entry.value())
    }

    /// Whether the leader flag is still visible for this song.
    ///
    /// Used as the re-trigger cooldown: a song that is already celebrating
    /// does not celebrate again.
    pub fn leader_visible(&self, song_id: &str) -> bool {
        self.flags.contains_key(&(song_id.to_string(), FlagSlot::Leader))
    }

    /// Snapshot of all visible flags, for the initial paint of a new client.
    pub fn visible(&self) -> Vec<(String, FlagSlot, RankFlag)> {
        self.flags
            .iter()
            .map(|entry| (entry.key().0.clone(), entry.key().1, *entry.value()))
            .collect()
    }

    /// Abort every outstanding timer and drop all flags.
    pub fn clear(&self) {
        for entry in self.timers.iter() {
            entry.value().abort();
        }
        self.timers.clear();
        self.flags.clear();
    }
}
