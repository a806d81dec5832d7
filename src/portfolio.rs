use crate::rating::RatingBook;
use crate::{Points, CASH};
use std::collections::HashMap;

/// team name (or the distinguished `cash` key) -> signed share quantity.
pub type Positions = HashMap<String, f64>;

/// Linear combination of positions and per-team scores, with `cash` added
/// directly rather than multiplied through a team lookup.
pub struct PortfolioValuer;

impl PortfolioValuer {
    /// unknown positions (failing equivalence-class resolution) are skipped
    /// rather than erroring — the caller is responsible for logging, since
    /// this function only returns a value.
    pub fn value(positions: &Positions, scores: &HashMap<String, Points>, ratings: &RatingBook) -> f64 {
        let mut total = 0.0;
        for (key, quantity) in positions {
            if key == CASH {
                total += quantity;
                continue;
            }
            let resolved = ratings.try_resolve(key);
            if let Some(score) = scores.get(resolved) {
                total += quantity * score;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::ScoreEngine;
    use crate::state::fixtures::symmetric_four;

    #[test]
    fn cash_pass_through() {
        let state = symmetric_four();
        let scores = ScoreEngine::expected_scores(&state).unwrap();
        let mut positions = Positions::new();
        positions.insert("A".to_string(), 10.0);
        positions.insert(CASH.to_string(), 500.0);
        let value = PortfolioValuer::value(&positions, &scores, state.ratings());
        assert!((value - 507.5).abs() < 1e-9);

        positions.insert(CASH.to_string(), 600.0);
        let value = PortfolioValuer::value(&positions, &scores, state.ratings());
        assert!((value - 607.5).abs() < 1e-9);
    }

    #[test]
    fn unknown_position_is_skipped_not_errored() {
        let state = symmetric_four();
        let scores = ScoreEngine::expected_scores(&state).unwrap();
        let mut positions = Positions::new();
        positions.insert("Ghost Team".to_string(), 100.0);
        let value = PortfolioValuer::value(&positions, &scores, state.ratings());
        assert_eq!(value, 0.0);
    }

    #[test]
    fn cash_neutrality_holds_across_arbitrary_positions() {
        let state = symmetric_four();
        let scores = ScoreEngine::expected_scores(&state).unwrap();
        let mut positions = Positions::new();
        positions.insert("C".to_string(), -3.0);
        let before = PortfolioValuer::value(&positions, &scores, state.ratings());
        positions.insert(CASH.to_string(), 42.0);
        let after = PortfolioValuer::value(&positions, &scores, state.ratings());
        assert!((after - before - 42.0).abs() < 1e-9);
    }
}
