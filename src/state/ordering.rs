//! Session-deterministic tie-break ordering.
//!
//! Songs with equal vote counts must keep a fixed relative order for the
//! lifetime of one session, so repeated re-renders of the same data never
//! look like rank changes. Each song id is mapped to a pseudo-random key
//! derived from a per-session seed; ties sort by that key.

/// Knuth MMIX linear-congruential constants. The exact constants are not a
/// compatibility requirement, only the determinism contract is.
const LCG_MULTIPLIER: u64 = 6364136223846793005;
const LCG_INCREMENT: u64 = 1442695040888963407;

fn lcg_step(state: u64) -> u64 {
    state.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT)
}

/// Seed fixing the tie-break permutation for the lifetime of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSeed(u64);

impl SessionSeed {
    /// Draw a fresh seed for this session.
    pub fn generate() -> Self {
        Self(rand::random())
    }

    /// Rebuild a seed from a stored value, reproducing the same permutation.
    pub fn from_value(value: u64) -> Self {
        Self(value)
    }

    /// Raw seed value, suitable for persisting.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Deterministic pseudo-random sort key for a song id under this seed.
    ///
    /// `lcg_step` is a bijection on `u64`, so two ids of equal length can
    /// never collide; unequal-length collisions are vanishingly unlikely.
    pub fn tiebreak(&self, id: &str) -> u64 {
        let mut state = lcg_step(self.0 ^ id.len() as u64);
        for byte in id.bytes() {
            state = lcg_step(state ^ u64::from(byte));
        }
        lcg_step(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_keys() {
        let seed = SessionSeed::from_value(42);
        let again = SessionSeed::from_value(42);
        for id in ["a", "b", "some-song", "song-0042"] {
            assert_eq!(seed.tiebreak(id), again.tiebreak(id));
        }
    }

    #[test]
    fn different_ids_get_different_keys() {
        let seed = SessionSeed::from_value(7);
        assert_ne!(seed.tiebreak("a"), seed.tiebreak("b"));
        assert_ne!(seed.tiebreak("song-1"), seed.tiebreak("song-2"));
    }

    #[test]
    fn ordering_is_stable_across_renders() {
        let seed = SessionSeed::from_value(1234);
        let mut first: Vec<&str> = vec!["e", "a", "d", "b", "c"];
        let mut second: Vec<&str> = vec!["c", "b", "a", "e", "d"];
        first.sort_by_key(|id| seed.tiebreak(id));
        second.sort_by_key(|id| seed.tiebreak(id));
        assert_eq!(first, second);
    }

    #[test]
    fn generated_seed_round_trips() {
        let seed = SessionSeed::generate();
        let restored = SessionSeed::from_value(seed.value());
        assert_eq!(seed.tiebreak("x"), restored.tiebreak("x"));
    }
}
