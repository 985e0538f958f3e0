//! Vote admission: per-session cool-down gate and the display click meter.
//!
//! Neither structure is a correctness guarantee; the authoritative count
//! always comes from the store. The gate is a client-spam guard, the meter
//! only drives escalating visual feedback.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tokio::{task::JoinHandle, time::sleep};
use uuid::Uuid;

type VoteKey = (Uuid, String);

/// Cool-down gate rejecting repeat votes for the same song from the same
/// session inside the cool-down window. State is keyed per (session, song),
/// never global: any number of songs can be mid-cool-down at once.
pub struct VoteGate {
    cooldown: Duration,
    accepted: DashMap<VoteKey, Instant>,
    in_flight: DashMap<VoteKey, ()>,
}

impl VoteGate {
    /// Create a gate with the given per-song cool-down.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            accepted: DashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    /// Admit or silently reject a vote intent issued at `now`.
    ///
    /// Acceptance records `now` as the new cool-down reference.
    pub fn admit(&self, session_id: Uuid, song_id: &str, now: Instant) -> bool {
        let key = (session_id, song_id.to_string());
        match self.accepted.entry(key) {
            dashmap::Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) < self.cooldown {
                    return false;
                }
                entry.insert(now);
                true
            }
            dashmap::Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Mark an optimistic bump as awaiting its store echo.
    pub fn mark_in_flight(&self, session_id: Uuid, song_id: &str) {
        self.in_flight.insert((session_id, song_id.to_string()), ());
    }

    /// Drop the marker when no echo will come (failed or degraded write).
    pub fn clear_in_flight(&self, session_id: Uuid, song_id: &str) {
        self.in_flight.remove(&(session_id, song_id.to_string()));
    }

    /// Whether an optimistic bump is still awaiting its echo.
    pub fn is_in_flight(&self, session_id: Uuid, song_id: &str) -> bool {
        self.in_flight
            .contains_key(&(session_id, song_id.to_string()))
    }

    /// Retire one in-flight marker for `song_id`, whichever session owns it.
    ///
    /// Returns `true` when a marker was found: the vote push echoing that
    /// write is already counted on the board and must not land again.
    pub fn absorb_echo(&self, song_id: &str) -> bool {
        let key = self
            .in_flight
            .iter()
            .find(|entry| entry.key().1 == song_id)
            .map(|entry| entry.key().clone());
        match key {
            Some(key) => self.in_flight.remove(&key).is_some(),
            None => false,
        }
    }

    /// Drop every in-flight marker; an authoritative snapshot supersedes
    /// all outstanding optimistic writes.
    pub fn reset_in_flight(&self) {
        self.in_flight.clear();
    }
}

/// Per-song display click counter with stepped decay.
///
/// Every accepted vote bumps the level; once clicks go quiet the level steps
/// back down to zero on its own, regardless of later server updates. The
/// decay timer is keyed per song and cancel-then-armed on every bump.
pub struct ClickMeter {
    quiet_delay: Duration,
    step_interval: Duration,
    levels: DashMap<String, u32>,
    timers: DashMap<String, JoinHandle<()>>,
}

impl ClickMeter {
    /// Create a meter that starts decaying `quiet_delay` after the last
    /// click, one step every `step_interval`.
    pub fn new(quiet_delay: Duration, step_interval: Duration) -> Self {
        Self {
            quiet_delay,
            step_interval,
            levels: DashMap::new(),
            timers: DashMap::new(),
        }
    }

    /// Current display level for a song.
    pub fn level(&self, song_id: &str) -> u32 {
        self.levels.get(song_id).map(|entry| *entry.value()).unwrap_or(0)
    }

    /// Bump the level for `song_id` and (re)arm its decay timer.
    ///
    /// `on_decay` is invoked with the new level after every decay step.
    /// Returns the level right after the bump.
    pub fn bump(
        self: &Arc<Self>,
        song_id: &str,
        on_decay: impl Fn(&str, u32) + Send + Sync + 'static,
    ) -> u32 {
        let level = {
            let mut entry = self.levels.entry(song_id.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        if let Some((_, stale)) = self.timers.remove(song_id) {
            stale.abort();
        }

        let meter = Arc::clone(self);
        let id = song_id.to_string();
        let handle = tokio::spawn(async move {
            sleep(meter.quiet_delay).await;
            loop {
                let remaining = {
                    let Some(mut entry) = meter.levels.get_mut(&id) else {
                        break;
                    };
                    let level = entry.value_mut();
                    *level = level.saturating_sub(1);
                    *level
                };
                on_decay(&id, remaining);
                if remaining == 0 {
                    meter.levels.remove(&id);
                    break;
                }
                sleep(meter.step_interval).await;
            }
            meter.timers.remove(&id);
        });
        self.timers.insert(song_id.to_string(), handle);

        level
    }

    /// Abort every decay timer and reset all levels.
    pub fn clear(&self) {
        for entry in self.timers.iter() {
            entry.value().abort();
        }
        self.timers.clear();
        self.levels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn double_vote_inside_cooldown_is_rejected() {
        let gate = VoteGate::new(Duration::from_millis(300));
        let session = Uuid::new_v4();
        let start = Instant::now();

        assert!(gate.admit(session, "a", start));
        assert!(!gate.admit(session, "a", start + Duration::from_millis(100)));
        assert!(gate.admit(session, "a", start + Duration::from_millis(400)));
    }

    #[test]
    fn cooldown_is_keyed_per_song_and_session() {
        let gate = VoteGate::new(Duration::from_millis(300));
        let session = Uuid::new_v4();
        let other_session = Uuid::new_v4();
        let now = Instant::now();

        assert!(gate.admit(session, "a", now));
        // A different song from the same session is unaffected.
        assert!(gate.admit(session, "b", now));
        // The same song from a different session is unaffected.
        assert!(gate.admit(other_session, "a", now));
    }

    #[test]
    fn in_flight_markers_round_trip() {
        let gate = VoteGate::new(Duration::from_millis(300));
        let session = Uuid::new_v4();

        assert!(!gate.is_in_flight(session, "a"));
        gate.mark_in_flight(session, "a");
        assert!(gate.is_in_flight(session, "a"));
        gate.clear_in_flight(session, "a");
        assert!(!gate.is_in_flight(session, "a"));
    }

    #[test]
    fn echo_absorption_retires_one_marker_per_event() {
        let gate = VoteGate::new(Duration::from_millis(300));
        let session = Uuid::new_v4();
        let other_session = Uuid::new_v4();
        gate.mark_in_flight(session, "a");
        gate.mark_in_flight(other_session, "a");

        assert!(gate.absorb_echo("a"));
        assert!(gate.absorb_echo("a"));
        // A third echo belongs to someone else's vote.
        assert!(!gate.absorb_echo("a"));

        gate.mark_in_flight(session, "b");
        gate.reset_in_flight();
        assert!(!gate.absorb_echo("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn click_level_decays_back_to_zero() {
        let meter = Arc::new(ClickMeter::new(
            Duration::from_millis(1200),
            Duration::from_millis(250),
        ));
        let steps = Arc::new(Mutex::new(Vec::new()));

        let sink = steps.clone();
        let level = meter.bump("a", move |_, level| sink.lock().unwrap().push(level));
        assert_eq!(level, 1);
        assert_eq!(meter.level("a"), 1);

        sleep(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;

        assert_eq!(meter.level("a"), 0);
        assert_eq!(steps.lock().unwrap().as_slice(), &[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_clicks_stack_and_decay_stepwise() {
        let meter = Arc::new(ClickMeter::new(
            Duration::from_millis(1200),
            Duration::from_millis(250),
        ));
        let steps = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..3 {
            let sink = steps.clone();
            meter.bump("a", move |_, level| sink.lock().unwrap().push(level));
        }
        assert_eq!(meter.level("a"), 3);

        // Only the last bump's timer survives; it walks 3 → 2 → 1 → 0.
        sleep(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(meter.level("a"), 0);
        assert_eq!(steps.lock().unwrap().as_slice(), &[2, 1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn a_new_click_during_decay_rearms_the_timer() {
        let meter = Arc::new(ClickMeter::new(
            Duration::from_millis(1200),
            Duration::from_millis(250),
        ));

        meter.bump("a", |_, _| {});
        sleep(Duration::from_millis(600)).await;
        // Second click before the quiet delay elapsed: decay restarts.
        meter.bump("a", |_, _| {});
        sleep(Duration::from_millis(900)).await;
        tokio::task::yield_now().await;
        // 900ms after the second click the quiet delay (1200ms) has not
        // elapsed, so nothing decayed yet.
        assert_eq!(meter.level("a"), 2);

        sleep(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;
        assert_eq!(meter.level("a"), 0);
    }
}
