//! Property tests for core invariants.
//!
//! Uses proptest to verify:
//! 1. Score bounds: every in-pitch location scores within [0, 1]
//! 2. Distance monotonicity on the goal's centre line
//! 3. Sealing round-trips under the same key and fails under another
//! 4. Location bounds are enforced on construction

use gravity_core::domain::{Location, PITCH_LENGTH, PITCH_WIDTH};
use gravity_core::scoring::{LogisticXg, ShotScorer};
use gravity_core::store::{Vault, VaultError};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_location() -> impl Strategy<Value = Location> {
    (0.0..=PITCH_LENGTH, 0.0..=PITCH_WIDTH).prop_map(|(x, y)| {
        Location::new(x, y).expect("strategy stays on the pitch")
    })
}

fn arb_key() -> impl Strategy<Value = [u8; 32]> {
    any::<[u8; 32]>()
}

// ── 1. Score Bounds ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn score_is_a_probability(loc in arb_location()) {
        let p = LogisticXg::default().score(&loc);
        prop_assert!(p.is_finite());
        prop_assert!((0.0..=1.0).contains(&p), "score {} at {:?}", p, loc);
    }
}

// ── 2. Distance Monotonicity ─────────────────────────────────────────

proptest! {
    /// Moving straight towards the goal along y = 40 never lowers the score.
    #[test]
    fn closer_on_centre_line_scores_higher(a in 60.0..119.0_f64, step in 0.5..1.0_f64) {
        let model = LogisticXg::default();
        let far = Location::new(a, 40.0).unwrap();
        let near = Location::new((a + step).min(PITCH_LENGTH), 40.0).unwrap();
        prop_assert!(model.score(&near) >= model.score(&far));
    }
}

// ── 3. Sealing ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn seal_open_roundtrip(key in arb_key(), data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let vault = Vault::from_key_bytes(&key).unwrap();
        let blob = vault.seal(&data).unwrap();
        prop_assert_eq!(vault.open(&blob).unwrap(), data);
    }

    #[test]
    fn different_key_fails(
        key_a in arb_key(),
        key_b in arb_key(),
        data in proptest::collection::vec(any::<u8>(), 1..512),
    ) {
        prop_assume!(key_a != key_b);
        let blob = Vault::from_key_bytes(&key_a).unwrap().seal(&data).unwrap();
        let other = Vault::from_key_bytes(&key_b).unwrap();
        prop_assert_eq!(other.open(&blob), Err(VaultError::Decrypt));
    }
}

// ── 4. Location Bounds ───────────────────────────────────────────────

proptest! {
    #[test]
    fn off_pitch_locations_are_rejected(x in 120.001..1000.0_f64, y in -1000.0..-0.001_f64) {
        prop_assert!(Location::new(x, 40.0).is_err());
        prop_assert!(Location::new(60.0, y).is_err());
    }
}
