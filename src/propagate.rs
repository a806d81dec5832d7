use crate::error::EngineError;
use crate::state::TournamentState;
use crate::winprob::win_probability;
use crate::Probability;
use rayon::prelude::*;
use std::collections::HashMap;

/// slot-occupancy distribution: team name -> probability that team occupies
/// the slot once every game below it has resolved.
pub type Occupancy = HashMap<String, Probability>;

/// Computes, for every internal bracket node up to the final, the
/// distribution over which team occupies that slot. The core algorithm
/// every other component is built on top of.
pub struct Propagator;

impl Propagator {
    /// a play-in slot's stored probabilities are a prior; an override on the
    /// pair (as set by a forced-win what-if) takes precedence, same as any
    /// other matchup. Single-team slots are always deterministic.
    fn leaf_occupancy(state: &TournamentState, slot: &crate::bracket::Slot) -> Occupancy {
        if slot.len() == 2 {
            let mut teams = slot.iter();
            let (a, p_a) = teams.next().expect("checked len == 2");
            let (b, _) = teams.next().expect("checked len == 2");
            if let Some(p_override) = state.overrides().get(a, b) {
                let mut occupancy = Occupancy::new();
                occupancy.insert(a.to_string(), p_override);
                occupancy.insert(b.to_string(), 1.0 - p_override);
                return occupancy;
            }
            let mut occupancy = Occupancy::new();
            occupancy.insert(a.to_string(), p_a);
            occupancy.insert(b.to_string(), 1.0 - p_a);
            occupancy
        } else {
            slot.iter().map(|(t, p)| (t.to_string(), p)).collect()
        }
    }

    /// `rounds[0]` is the bracket's first-round slots verbatim; `rounds[r]`
    /// for `r >= 1` has half as many slots as `rounds[r-1]`, each formed by
    /// combining a left/right child pair. Rounds are necessarily sequential
    /// (round r depends on round r-1); the slots within a round are
    /// independent and fan out across a work-stealing pool.
    pub fn propagate(state: &TournamentState) -> Result<Vec<Vec<Occupancy>>, EngineError> {
        let bracket = state.bracket();
        let total_rounds = bracket.rounds();
        let mut rounds: Vec<Vec<Occupancy>> = Vec::with_capacity(total_rounds as usize + 1);

        let first: Vec<Occupancy> = bracket
            .slots()
            .iter()
            .map(|slot| Self::leaf_occupancy(state, slot))
            .collect();
        rounds.push(first);

        for _ in 1..=total_rounds {
            let previous = rounds.last().expect("at least one round pushed above");
            let next_len = previous.len() / 2;
            let next: Vec<Occupancy> = (0..next_len)
                .into_par_iter()
                .map(|i| Self::combine(state, &previous[i * 2], &previous[i * 2 + 1]))
                .collect::<Result<Vec<_>, EngineError>>()?;
            rounds.push(next);
        }
        Ok(rounds)
    }

    /// combines two child occupancy maps into the parent slot's: each pair
    /// `(T, U)` from the left and right children contributes
    /// `left[T] * right[U] * p(T beats U)` to T's mass and the complement to
    /// U's, accumulated in double precision without rescaling.
    fn combine(state: &TournamentState, left: &Occupancy, right: &Occupancy) -> Result<Occupancy, EngineError> {
        let mut slot = Occupancy::new();
        for (t, &p_t) in left {
            if p_t <= 0.0 {
                continue;
            }
            let rating_t = state.ratings().rating_of(t)?;
            for (u, &p_u) in right {
                if p_u <= 0.0 {
                    continue;
                }
                let rating_u = state.ratings().rating_of(u)?;
                let p_win = win_probability(t, rating_t, u, rating_u, state.overrides(), state.forfeit())?;
                *slot.entry(t.clone()).or_insert(0.0) += p_t * p_u * p_win;
                *slot.entry(u.clone()).or_insert(0.0) += p_t * p_u * (1.0 - p_win);
            }
        }
        Ok(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fixtures::{sixty_four_with_play_in, symmetric_four};

    #[test]
    fn mass_conserved_every_round() {
        let state = symmetric_four();
        let rounds = Propagator::propagate(&state).unwrap();
        for round in &rounds {
            for slot in round {
                let total: Probability = slot.values().sum();
                assert!((total - 1.0).abs() < 1e-9, "round total {total}");
            }
        }
    }

    #[test]
    fn symmetric_bracket_final_is_uniform() {
        let state = symmetric_four();
        let rounds = Propagator::propagate(&state).unwrap();
        let final_round = rounds.last().unwrap();
        assert_eq!(final_round.len(), 1);
        for p in final_round[0].values() {
            assert!((p - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn play_in_override_forces_occupant() {
        let state = sixty_four_with_play_in().with_override("X", "Y", 1.0);
        let rounds = Propagator::propagate(&state).unwrap();
        let x = rounds[0][12].get("X").copied().unwrap_or(0.0);
        let y = rounds[0][12].get("Y").copied().unwrap_or(0.0);
        assert!((x - 1.0).abs() < 1e-12);
        assert!(y.abs() < 1e-12);
    }

    #[test]
    fn play_in_mass_is_conserved_in_sixty_four() {
        let state = sixty_four_with_play_in();
        let rounds = Propagator::propagate(&state).unwrap();
        for round in &rounds {
            for slot in round {
                let total: Probability = slot.values().sum();
                assert!((total - 1.0).abs() < 1e-9);
            }
        }
    }
}
