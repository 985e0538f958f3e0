//! Search over the song corpus: an exact/fuzzy index plus the debounced
//! shared display filter.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use utoipa::ToSchema;

use crate::state::board::Song;

/// Minimum similarity for a fuzzy hit.
const FUZZY_THRESHOLD: f64 = 0.72;
/// Title matches outrank artist matches of the same quality.
const TITLE_WEIGHT: f64 = 1.0;
const ARTIST_WEIGHT: f64 = 0.75;

/// How query terms are matched against the corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Case-insensitive substring over title and artist.
    #[default]
    Exact,
    /// Typo-tolerant similarity, title weighted above artist.
    Fuzzy,
}

/// Result of a query: the filtered view plus whether a filter is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// `false` for an empty/whitespace query: the view is the whole corpus.
    pub searching: bool,
    /// Songs matching the query, best match first in fuzzy mode.
    pub songs: Vec<Song>,
}

struct IndexEntry {
    title: String,
    artist: String,
    position: usize,
}

struct IndexInner {
    corpus: Arc<Vec<Song>>,
    // Lowercased entries, built lazily on the first query after a corpus
    // change rather than eagerly on every push.
    entries: Option<Vec<IndexEntry>>,
}

/// Lazily (re)built search index over the full song corpus.
pub struct SearchIndex {
    inner: Mutex<IndexInner>,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchIndex {
    /// Create an index over an empty corpus.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(IndexInner {
                corpus: Arc::new(Vec::new()),
                entries: None,
            }),
        }
    }

    /// Swap in a new corpus reference; the index is rebuilt on next read.
    pub fn set_corpus(&self, corpus: Arc<Vec<Song>>) {
        let mut inner = self.inner.lock().expect("index lock poisoned");
        if !Arc::ptr_eq(&inner.corpus, &corpus) {
            inner.corpus = corpus;
            inner.entries = None;
        }
    }

    /// Run a query against the corpus.
    ///
    /// An empty or whitespace-only term returns the unfiltered corpus and
    /// reports that no search is active.
    pub fn query(&self, raw: &str, mode: SearchMode) -> SearchOutcome {
        let term = raw.trim().to_lowercase();
        let mut inner = self.inner.lock().expect("index lock poisoned");

        if term.is_empty() {
            return SearchOutcome {
                searching: false,
                songs: inner.corpus.as_ref().clone(),
            };
        }

        if inner.entries.is_none() {
            inner.entries = Some(
                inner
                    .corpus
                    .iter()
                    .enumerate()
                    .map(|(position, song)| IndexEntry {
                        title: song.title.to_lowercase(),
                        artist: song.artist.to_lowercase(),
                        position,
                    })
                    .collect(),
            );
        }
        let entries = inner.entries.as_ref().expect("entries just built");

        let songs = match mode {
            SearchMode::Exact => entries
                .iter()
                .filter(|entry| entry.title.contains(&term) || entry.artist.contains(&term))
                .map(|entry| inner.corpus[entry.position].clone())
                .collect(),
            SearchMode::Fuzzy => {
                let mut scored: Vec<(f64, usize)> = entries
                    .iter()
                    .filter_map(|entry| {
                        let score = fuzzy_score(&term, entry);
                        (score >= FUZZY_THRESHOLD).then_some((score, entry.position))
                    })
                    .collect();
                scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
                scored
                    .into_iter()
                    .map(|(_, position)| inner.corpus[position].clone())
                    .collect()
            }
        };

        SearchOutcome {
            searching: true,
            songs,
        }
    }
}

/// Best weighted similarity of the term against one song.
///
/// A plain substring hit counts as a perfect match for its field, so fuzzy
/// mode is always at least as permissive as exact mode.
fn fuzzy_score(term: &str, entry: &IndexEntry) -> f64 {
    let title = if entry.title.contains(term) {
        TITLE_WEIGHT
    } else {
        strsim::jaro_winkler(term, &entry.title) * TITLE_WEIGHT
    };
    let artist = if entry.artist.contains(term) {
        ARTIST_WEIGHT
    } else {
        strsim::jaro_winkler(term, &entry.artist) * ARTIST_WEIGHT
    };
    title.max(artist)
}

/// The shared display filter: raw input debounced before it affects the
/// published results, mode switches applied instantly.
pub struct LiveSearch {
    input: mpsc::UnboundedSender<String>,
    mode: Arc<Mutex<SearchMode>>,
    settled: watch::Sender<String>,
    results: watch::Sender<SearchOutcome>,
    index: Arc<SearchIndex>,
    debounce_task: JoinHandle<()>,
}

impl LiveSearch {
    /// Spawn the debounce task over `index`.
    pub fn spawn(index: Arc<SearchIndex>, debounce: Duration) -> Self {
        let (input, mut input_rx) = mpsc::unbounded_channel::<String>();
        let (settled, _) = watch::channel(String::new());
        let (results, _) = watch::channel(SearchOutcome {
            searching: false,
            songs: Vec::new(),
        });
        let mode = Arc::new(Mutex::new(SearchMode::default()));

        let task_index = Arc::clone(&index);
        let task_mode = Arc::clone(&mode);
        let task_settled = settled.clone();
        let task_results = results.clone();
        let debounce_task = tokio::spawn(async move {
            while let Some(mut pending) = input_rx.recv().await {
                loop {
                    let timer = tokio::time::sleep(debounce);
                    tokio::pin!(timer);
                    tokio::select! {
                        next = input_rx.recv() => match next {
                            // Fresh keystroke: restart the debounce window.
                            Some(raw) => pending = raw,
                            // Teardown mid-debounce: the pending term is
                            // never applied.
                            None => return,
                        },
                        _ = &mut timer => {
                            let mode = *task_mode.lock().expect("mode lock poisoned");
                            let outcome = task_index.query(&pending, mode);
                            // send_replace: the settled term and results
                            // must stick with or without subscribers.
                            task_settled.send_replace(pending.clone());
                            task_results.send_replace(outcome);
                            break;
                        }
                    }
                }
            }
        });

        Self {
            input,
            mode,
            settled,
            results,
            index,
            debounce_task,
        }
    }

    /// Feed a raw query update; it only takes effect after the debounce.
    pub fn set_query(&self, raw: String) {
        let _ = self.input.send(raw);
    }

    /// Switch match mode, re-applying the already-debounced term instantly.
    pub fn set_mode(&self, mode: SearchMode) {
        {
            let mut guard = self.mode.lock().expect("mode lock poisoned");
            if *guard == mode {
                return;
            }
            *guard = mode;
        }
        self.recompute();
    }

    /// Current match mode.
    pub fn mode(&self) -> SearchMode {
        *self.mode.lock().expect("mode lock poisoned")
    }

    /// Term currently applied to the results (post-debounce).
    pub fn settled_query(&self) -> String {
        self.settled.borrow().clone()
    }

    /// Re-run the settled term, e.g. after the corpus changed.
    pub fn recompute(&self) {
        let term = self.settled.borrow().clone();
        let mode = self.mode();
        let outcome = self.index.query(&term, mode);
        self.results.send_replace(outcome);
    }

    /// Latest published results.
    pub fn results(&self) -> SearchOutcome {
        self.results.borrow().clone()
    }

    /// Subscribe to result updates.
    pub fn subscribe(&self) -> watch::Receiver<SearchOutcome> {
        self.results.subscribe()
    }
}

impl Drop for LiveSearch {
    // Component teardown must not leave a debounce timer firing later.
    fn drop(&mut self) {
        self.debounce_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn song(id: &str, title: &str, artist: &str) -> Song {
        Song {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            vote_count: 0,
            created_at: SystemTime::UNIX_EPOCH,
        }
    }

    fn corpus() -> Arc<Vec<Song>> {
        Arc::new(vec![
            song("1", "Bohemian Rhapsody", "Queen"),
            song("2", "Don't Stop Me Now", "Queen"),
            song("3", "Mr. Brightside", "The Killers"),
        ])
    }

    #[test]
    fn empty_query_returns_full_corpus_not_searching() {
        let index = SearchIndex::new();
        index.set_corpus(corpus());

        for raw in ["", "   ", "\t"] {
            let outcome = index.query(raw, SearchMode::Exact);
            assert!(!outcome.searching);
            assert_eq!(outcome.songs.len(), 3);
        }
    }

    #[test]
    fn exact_match_is_case_insensitive_over_title_and_artist() {
        let index = SearchIndex::new();
        index.set_corpus(corpus());

        let outcome = index.query("BRIGHT", SearchMode::Exact);
        assert!(outcome.searching);
        assert_eq!(outcome.songs.len(), 1);
        assert_eq!(outcome.songs[0].id, "3");

        let by_artist = index.query("queen", SearchMode::Exact);
        assert_eq!(by_artist.songs.len(), 2);
    }

    #[test]
    fn no_match_returns_empty_result_set() {
        let index = SearchIndex::new();
        index.set_corpus(corpus());
        let outcome = index.query("zzzzzz", SearchMode::Exact);
        assert!(outcome.searching);
        assert!(outcome.songs.is_empty());
    }

    #[test]
    fn fuzzy_match_tolerates_typos() {
        let index = SearchIndex::new();
        index.set_corpus(corpus());

        let outcome = index.query("bohemian rhapsdy", SearchMode::Fuzzy);
        assert_eq!(outcome.songs.first().map(|s| s.id.as_str()), Some("1"));

        // Exact mode stays strict about the same typo.
        let strict = index.query("bohemian rhapsdy", SearchMode::Exact);
        assert!(strict.songs.is_empty());
    }

    #[test]
    fn corpus_swap_invalidates_stale_results_lazily() {
        let index = SearchIndex::new();
        index.set_corpus(corpus());
        assert_eq!(index.query("queen", SearchMode::Exact).songs.len(), 2);

        index.set_corpus(Arc::new(vec![song("9", "Seven Nation Army", "The White Stripes")]));
        let outcome = index.query("queen", SearchMode::Exact);
        assert!(outcome.songs.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn query_only_applies_after_the_debounce_window() {
        let index = Arc::new(SearchIndex::new());
        index.set_corpus(corpus());
        let live = LiveSearch::spawn(Arc::clone(&index), Duration::from_millis(300));

        live.set_query("queen".into());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!live.results().searching);

        tokio::time::sleep(Duration::from_millis(400)).await;
        let outcome = live.results();
        assert!(outcome.searching);
        assert_eq!(outcome.songs.len(), 2);
        assert_eq!(live.settled_query(), "queen");
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_keystrokes_only_apply_the_last_term() {
        let index = Arc::new(SearchIndex::new());
        index.set_corpus(corpus());
        let live = LiveSearch::spawn(Arc::clone(&index), Duration::from_millis(300));

        for term in ["q", "qu", "que", "bright"] {
            live.set_query(term.into());
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(live.settled_query(), "bright");
        let outcome = live.results();
        assert_eq!(outcome.songs.len(), 1);
        assert_eq!(outcome.songs[0].id, "3");
    }

    #[tokio::test(start_paused = true)]
    async fn mode_switch_reapplies_instantly_without_debounce() {
        let index = Arc::new(SearchIndex::new());
        index.set_corpus(corpus());
        let live = LiveSearch::spawn(Arc::clone(&index), Duration::from_millis(300));

        live.set_query("bohemian rhapsdy".into());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(live.results().songs.is_empty());

        // No sleep between the switch and the assertion.
        live.set_mode(SearchMode::Fuzzy);
        let outcome = live.results();
        assert_eq!(outcome.songs.first().map(|s| s.id.as_str()), Some("1"));
    }
}
