//! Players and ratings.
//!
//! A player is a username plus a rating that lives for the whole server
//! process. The registry grows monotonically: names are never removed, so a
//! rating survives logout and reconnection.

use std::collections::HashMap;

/// Rating assigned to a player on first login.
pub const INITIAL_RATING: i32 = 1500;

/// Elo K-factor.
const RATING_K: f64 = 32.0;

/// Result of a finished game, relative to the argument order of
/// [`PlayerRegistry::post_result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Draw,
    Player1Won,
    Player2Won,
}

#[derive(Debug)]
pub struct Player {
    name: String,
    rating: i32,
}

impl Player {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rating(&self) -> i32 {
        self.rating
    }
}

/// Directory of every player ever seen, keyed by exact name.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<String, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a player by name, creating one at the initial rating if this
    /// is the first login under that name.
    pub fn register(&mut self, name: &str) -> &Player {
        self.players
            .entry(name.to_string())
            .or_insert_with(|| Player {
                name: name.to_string(),
                rating: INITIAL_RATING,
            })
    }

    pub fn rating(&self, name: &str) -> Option<i32> {
        self.players.get(name).map(|p| p.rating)
    }

    /// Update both ratings after a finished game.
    ///
    /// Standard Elo with K = 32: expected scores from the 400-point
    /// logistic curve, deltas rounded to the nearest integer. Does nothing
    /// if either name is unknown.
    pub fn post_result(&mut self, p1: &str, p2: &str, outcome: MatchOutcome) {
        let (Some(r1), Some(r2)) = (self.rating(p1), self.rating(p2)) else {
            return;
        };

        let (s1, s2) = match outcome {
            MatchOutcome::Draw => (0.5, 0.5),
            MatchOutcome::Player1Won => (1.0, 0.0),
            MatchOutcome::Player2Won => (0.0, 1.0),
        };

        let e1 = 1.0 / (1.0 + 10f64.powf(f64::from(r2 - r1) / 400.0));
        let e2 = 1.0 / (1.0 + 10f64.powf(f64::from(r1 - r2) / 400.0));

        if let Some(p) = self.players.get_mut(p1) {
            p.rating = r1 + (RATING_K * (s1 - e1)).round() as i32;
        }
        if let Some(p) = self.players.get_mut(p2) {
            p.rating = r2 + (RATING_K * (s2 - e2)).round() as i32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{INITIAL_RATING, MatchOutcome, PlayerRegistry};

    #[test]
    fn register_is_idempotent_and_keeps_the_rating() {
        let mut reg = PlayerRegistry::new();
        assert_eq!(reg.register("alice").rating(), INITIAL_RATING);

        reg.post_result("alice", "bob", MatchOutcome::Player1Won);
        // bob is unknown, nothing happened
        assert_eq!(reg.rating("alice"), Some(INITIAL_RATING));

        reg.register("bob");
        reg.post_result("alice", "bob", MatchOutcome::Player1Won);
        let after = reg.rating("alice").unwrap();
        assert!(after > INITIAL_RATING);

        // A later register under the same name returns the updated player.
        assert_eq!(reg.register("alice").rating(), after);
    }

    #[test]
    fn equal_ratings_win_transfers_sixteen_points() {
        let mut reg = PlayerRegistry::new();
        reg.register("alice");
        reg.register("bob");

        reg.post_result("alice", "bob", MatchOutcome::Player2Won);
        assert_eq!(reg.rating("alice"), Some(INITIAL_RATING - 16));
        assert_eq!(reg.rating("bob"), Some(INITIAL_RATING + 16));
    }

    #[test]
    fn draw_between_equal_ratings_changes_nothing() {
        let mut reg = PlayerRegistry::new();
        reg.register("alice");
        reg.register("bob");

        reg.post_result("alice", "bob", MatchOutcome::Draw);
        assert_eq!(reg.rating("alice"), Some(INITIAL_RATING));
        assert_eq!(reg.rating("bob"), Some(INITIAL_RATING));
    }

    #[test]
    fn opposite_results_round_trip_within_one_point() {
        let mut reg = PlayerRegistry::new();
        reg.register("alice");
        reg.register("bob");

        reg.post_result("alice", "bob", MatchOutcome::Player1Won);
        reg.post_result("alice", "bob", MatchOutcome::Player2Won);

        let a = reg.rating("alice").unwrap();
        let b = reg.rating("bob").unwrap();
        assert!((a - INITIAL_RATING).abs() <= 1, "alice drifted to {a}");
        assert!((b - INITIAL_RATING).abs() <= 1, "bob drifted to {b}");
    }

    #[test]
    fn underdog_gains_more_than_the_favorite_would() {
        let mut reg = PlayerRegistry::new();
        reg.register("alice");
        reg.register("bob");

        // Make alice the favorite first.
        for _ in 0..5 {
            reg.post_result("alice", "bob", MatchOutcome::Player1Won);
        }
        let (a0, b0) = (reg.rating("alice").unwrap(), reg.rating("bob").unwrap());
        assert!(a0 > b0);

        // An upset now moves more than 16 points.
        reg.post_result("alice", "bob", MatchOutcome::Player2Won);
        let gained = reg.rating("bob").unwrap() - b0;
        assert!(gained > 16, "underdog gained only {gained}");
    }
}
