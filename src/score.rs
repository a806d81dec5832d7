use crate::error::EngineError;
use crate::propagate::Propagator;
use crate::state::TournamentState;
use crate::Points;
use rayon::prelude::*;
use std::collections::HashMap;

/// Reduces `Propagator`'s per-round occupancy distributions into per-team
/// expected scores, and a batched API for evaluating many override
/// scenarios in parallel.
pub struct ScoreEngine;

impl ScoreEngine {
    /// for each round `r` (1-indexed into the scoring vector), for each slot
    /// occupancy map in `rounds[r]`, add `occupancy[team] * scoring[r-1]` to
    /// `team`'s running total. Teams absent from a slot contribute 0.
    pub fn expected_scores(state: &TournamentState) -> Result<HashMap<String, Points>, EngineError> {
        let rounds = Propagator::propagate(state)?;
        let scoring = state.scoring();
        let mut scores = HashMap::new();
        for (r, slots) in rounds.iter().skip(1).enumerate() {
            let points = scoring[r];
            for slot in slots {
                for (team, p) in slot {
                    *scores.entry(team.clone()).or_insert(0.0) += p * points;
                }
            }
        }
        Ok(scores)
    }

    /// evaluates `expected_scores` for the state with each override set in
    /// `overrides_list` applied in turn, fanning out across scenarios. The
    /// output preserves the input order.
    pub fn batch_expected_scores(
        state: &TournamentState,
        overrides_list: &[Vec<(String, String, f64)>],
    ) -> Result<Vec<HashMap<String, Points>>, EngineError> {
        overrides_list
            .par_iter()
            .map(|overrides| {
                let mut derived = state.clone();
                for (team1, team2, p) in overrides {
                    derived = derived.with_override(team1, team2, *p);
                }
                Self::expected_scores(&derived)
            })
            .collect()
    }
}
