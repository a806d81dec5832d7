use crate::error::EngineError;
use crate::portfolio::{Positions, PortfolioValuer};
use crate::propagate::Propagator;
use crate::score::ScoreEngine;
use crate::state::TournamentState;
use crate::winprob::win_probability;
use crate::Points;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

/// a candidate team for a target bracket slot, with the portfolio swing
/// conditional on that team actually arriving there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotCandidate {
    pub team: String,
    pub probability: f64,
    pub portfolio_delta: f64,
}

/// how one team's expected score moved between a game's win- and
/// loss-scenarios, and what that means in dollar terms for a held position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamImpact {
    pub team: String,
    pub held_position: f64,
    pub delta_per_share: f64,
    pub delta_total: f64,
}

/// raw and probability-adjusted swing for one fully-determined upcoming
/// game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameImportance {
    pub team1: String,
    pub team2: String,
    pub probability: f64,
    pub raw_importance: f64,
    pub adjusted_importance: f64,
}

const SLOT_PROBABILITY_FLOOR: f64 = 1e-3;
const SETTLED_THRESHOLD: f64 = 0.9999;

/// Builds every sensitivity report: per-team rating deltas, per-game
/// deltas, per-slot candidate reports, and game-importance rankings.
pub struct SensitivityEngine;

impl SensitivityEngine {
    /// two derived states — `team`'s offense bumped by `+eps`/defense by
    /// `-eps`, and the mirrored opposite adjustment — reduced to their
    /// respective expected-score maps.
    pub fn get_team_delta(
        state: &TournamentState,
        team: &str,
        eps: f64,
    ) -> Result<(HashMap<String, Points>, HashMap<String, Points>), EngineError> {
        let plus = state.with_team_adjustment(team, eps)?;
        let minus = state.with_team_adjustment(team, -eps)?;
        Ok((
            ScoreEngine::expected_scores(&plus)?,
            ScoreEngine::expected_scores(&minus)?,
        ))
    }

    pub fn get_team_portfolio_delta(
        state: &TournamentState,
        positions: &Positions,
        team: &str,
        eps: f64,
    ) -> Result<f64, EngineError> {
        let (plus, minus) = Self::get_team_delta(state, team, eps)?;
        let v_plus = PortfolioValuer::value(positions, &plus, state.ratings());
        let v_minus = PortfolioValuer::value(positions, &minus, state.ratings());
        Ok(v_plus - v_minus)
    }

    /// per-team score differences between the `+eps`/`-eps` states, for
    /// every team that appears in either map.
    pub fn get_team_pairwise_deltas(
        state: &TournamentState,
        team: &str,
        eps: f64,
    ) -> Result<HashMap<String, f64>, EngineError> {
        let (plus, minus) = Self::get_team_delta(state, team, eps)?;
        let mut teams: Vec<&String> = plus.keys().chain(minus.keys()).collect();
        teams.sort();
        teams.dedup();
        Ok(teams
            .into_iter()
            .map(|t| {
                let p = plus.get(t).copied().unwrap_or(0.0);
                let m = minus.get(t).copied().unwrap_or(0.0);
                (t.clone(), p - m)
            })
            .collect())
    }

    /// portfolio delta for every bracket team, fanned out in parallel.
    pub fn get_all_team_deltas(
        state: &TournamentState,
        positions: &Positions,
        eps: f64,
    ) -> Result<HashMap<String, f64>, EngineError> {
        let teams: Vec<String> = state.ratings().teams().map(str::to_string).collect();
        teams
            .par_iter()
            .map(|team| {
                Self::get_team_portfolio_delta(state, positions, team, eps)
                    .map(|delta| (team.clone(), delta))
            })
            .collect()
    }

    /// `(win_value, loss_value, team_impacts)` for a specific matchup: the
    /// portfolio value if `team1` beats `team2`, if `team2` beats `team1`,
    /// and every team whose expected score moved between the two.
    pub fn game_delta(
        state: &TournamentState,
        positions: &Positions,
        team1: &str,
        team2: &str,
    ) -> Result<(f64, f64, Vec<TeamImpact>), EngineError> {
        let win_state = state.with_override(team1, team2, 1.0);
        let loss_state = state.with_override(team1, team2, 0.0);
        let win_scores = ScoreEngine::expected_scores(&win_state)?;
        let loss_scores = ScoreEngine::expected_scores(&loss_state)?;
        let win_value = PortfolioValuer::value(positions, &win_scores, state.ratings());
        let loss_value = PortfolioValuer::value(positions, &loss_scores, state.ratings());

        let mut teams: Vec<&String> = win_scores.keys().chain(loss_scores.keys()).collect();
        teams.sort();
        teams.dedup();
        let impacts = teams
            .into_iter()
            .filter_map(|team| {
                let w = win_scores.get(team).copied().unwrap_or(0.0);
                let l = loss_scores.get(team).copied().unwrap_or(0.0);
                let delta = w - l;
                if delta.abs() <= 1e-12 {
                    return None;
                }
                let held = positions.get(team).copied().unwrap_or(0.0);
                Some(TeamImpact {
                    team: team.clone(),
                    held_position: held,
                    delta_per_share: delta,
                    delta_total: delta * held,
                })
            })
            .collect();
        Ok((win_value, loss_value, impacts))
    }

    /// the minimum path of forced-win overrides that deterministically
    /// places `team` in `rounds[round][position]`: a play-in win (if
    /// `team`'s own first-round slot has two entries) plus a forced win
    /// against every possible opponent in the sibling sub-bracket at each
    /// level up to `round`.
    ///
    /// A team can only reach the one `(round, position)` target implied by
    /// its own first-round index; any other target returns an empty path.
    pub fn compute_path(
        state: &TournamentState,
        team: &str,
        round: usize,
        position: usize,
    ) -> Vec<(String, String, f64)> {
        let bracket = state.bracket();
        let Some(start) = bracket.start_index(team) else {
            return Vec::new();
        };
        if start >> round != position {
            return Vec::new();
        }

        let mut path = Vec::new();
        let start_slot = bracket.slot(start);
        if start_slot.len() == 2 {
            for opponent in start_slot.teams() {
                if opponent != team {
                    path.push((team.to_string(), opponent.to_string(), 1.0));
                }
            }
        }
        for r in 1..=round {
            let node_index = start >> (r - 1);
            let sibling_index = node_index ^ 1;
            let block_size = 1usize << (r - 1);
            let lo = sibling_index * block_size;
            for slot_index in lo..lo + block_size {
                for opponent in bracket.slot(slot_index).teams() {
                    path.push((team.to_string(), opponent.to_string(), 1.0));
                }
            }
        }
        path
    }

    /// every candidate team for `rounds[round][position]` above the
    /// probability floor, with the portfolio delta conditional on that team
    /// actually arriving, sorted by probability descending.
    pub fn slot_candidates(
        state: &TournamentState,
        positions: &Positions,
        round: usize,
        position: usize,
    ) -> Result<Vec<SlotCandidate>, EngineError> {
        let rounds = Propagator::propagate(state)?;
        let occupancy = &rounds[round][position];

        let mut candidates: Vec<(String, f64)> = occupancy
            .iter()
            .filter(|(_, &p)| p >= SLOT_PROBABILITY_FLOOR)
            .map(|(team, &p)| (team.clone(), p))
            .collect();
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).expect("probabilities are not NaN"));

        let paths: Vec<Vec<(String, String, f64)>> = candidates
            .iter()
            .map(|(team, _)| Self::compute_path(state, team, round, position))
            .collect();
        let scenario_scores = ScoreEngine::batch_expected_scores(state, &paths)?;
        let current_scores = ScoreEngine::expected_scores(state)?;
        let current_value = PortfolioValuer::value(positions, &current_scores, state.ratings());

        Ok(candidates
            .into_iter()
            .zip(scenario_scores)
            .map(|((team, probability), scores)| {
                let value = PortfolioValuer::value(positions, &scores, state.ratings());
                SlotCandidate {
                    team,
                    probability,
                    portfolio_delta: value - current_value,
                }
            })
            .collect())
    }

    /// every upcoming game where both feeder slots have settled (occupancy
    /// >= `SETTLED_THRESHOLD`) but the parent slot has not, ranked by raw and
    /// probability-adjusted swing.
    pub fn game_importance(
        state: &TournamentState,
        positions: &Positions,
    ) -> Result<Vec<GameImportance>, EngineError> {
        let rounds = Propagator::propagate(state)?;
        let current_scores = ScoreEngine::expected_scores(state)?;
        let ev = PortfolioValuer::value(positions, &current_scores, state.ratings());

        let mut games = Vec::new();
        for round_index in 1..rounds.len() {
            let parent_round = &rounds[round_index];
            let child_round = &rounds[round_index - 1];
            for (i, parent_slot) in parent_round.iter().enumerate() {
                if parent_slot.values().any(|&p| p >= SETTLED_THRESHOLD) {
                    continue;
                }
                let left_settled = child_round[i * 2]
                    .iter()
                    .find(|(_, &p)| p >= SETTLED_THRESHOLD);
                let right_settled = child_round[i * 2 + 1]
                    .iter()
                    .find(|(_, &p)| p >= SETTLED_THRESHOLD);
                if let (Some((team1, _)), Some((team2, _))) = (left_settled, right_settled) {
                    games.push((team1.clone(), team2.clone()));
                }
            }
        }

        let scenarios: Vec<Vec<(String, String, f64)>> = games
            .iter()
            .flat_map(|(team1, team2)| {
                [
                    vec![(team1.clone(), team2.clone(), 1.0)],
                    vec![(team1.clone(), team2.clone(), 0.0)],
                ]
            })
            .collect();
        let batch = ScoreEngine::batch_expected_scores(state, &scenarios)?;

        games
            .into_iter()
            .enumerate()
            .map(|(i, (team1, team2))| {
                let value_plus = PortfolioValuer::value(positions, &batch[i * 2], state.ratings());
                let value_minus =
                    PortfolioValuer::value(positions, &batch[i * 2 + 1], state.ratings());
                let delta_plus = value_plus - ev;
                let delta_minus = value_minus - ev;

                let rating1 = state.ratings().rating_of(&team1)?;
                let rating2 = state.ratings().rating_of(&team2)?;
                let p = win_probability(&team1, rating1, &team2, rating2, state.overrides(), state.forfeit())?;

                Ok(GameImportance {
                    team1,
                    team2,
                    probability: p,
                    raw_importance: (delta_plus - delta_minus).abs(),
                    adjusted_importance: delta_plus.abs() * p * p + delta_minus.abs() * (1.0 - p) * (1.0 - p),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fixtures::{sixty_four_with_play_in, symmetric_four};

    #[test]
    fn game_delta_is_symmetric_and_directional() {
        let state = symmetric_four();
        let mut positions = Positions::new();
        positions.insert("A".to_string(), 10.0);
        positions.insert("B".to_string(), 5.0);

        let current_scores = ScoreEngine::expected_scores(&state).unwrap();
        let current_value = PortfolioValuer::value(&positions, &current_scores, state.ratings());
        let (win_value, loss_value, impacts) =
            SensitivityEngine::game_delta(&state, &positions, "A", "B").unwrap();

        assert!(win_value > current_value);
        assert!(current_value > loss_value);
        assert!((win_value - loss_value).abs() > 0.0);

        let a_impact = impacts.iter().find(|i| i.team == "A").unwrap();
        let b_impact = impacts.iter().find(|i| i.team == "B").unwrap();
        assert!(a_impact.delta_per_share > 0.0);
        assert!(b_impact.delta_per_share < 0.0);
    }

    #[test]
    fn slot_path_forces_team_into_target_slot() {
        let state = sixty_four_with_play_in();
        let path = SensitivityEngine::compute_path(&state, "X", 1, 6);
        assert!(path.contains(&("X".to_string(), "Y".to_string(), 1.0)));

        let mut derived = state;
        for (t1, t2, p) in &path {
            derived = derived.with_override(t1, t2, *p);
        }
        let rounds = Propagator::propagate(&derived).unwrap();
        assert!(rounds[1][6]["X"] >= 0.9999);
    }

    #[test]
    fn impossible_target_returns_empty_path() {
        let state = sixty_four_with_play_in();
        let path = SensitivityEngine::compute_path(&state, "X", 1, 0);
        assert!(path.is_empty());
    }

    #[test]
    fn get_all_team_deltas_covers_every_team() {
        let state = symmetric_four();
        let mut positions = Positions::new();
        positions.insert("A".to_string(), 1.0);
        let deltas = SensitivityEngine::get_all_team_deltas(&state, &positions, 0.1).unwrap();
        assert_eq!(deltas.len(), 4);
    }

    #[test]
    fn game_importance_finds_settled_semifinal_in_four_team_bracket() {
        let state = symmetric_four();
        let positions = Positions::new();
        let games = SensitivityEngine::game_importance(&state, &positions).unwrap();
        assert!(games.iter().any(|g| {
            (g.team1 == "A" && g.team2 == "B") || (g.team1 == "B" && g.team2 == "A")
        }));
    }
}
