use crate::distribution::Distribution;
use crate::error::EngineError;
use crate::market::MarketAdapter;
use crate::portfolio::{Positions, PortfolioValuer};
use crate::propagate::{Occupancy, Propagator};
use crate::rating::TeamRating;
use crate::score::ScoreEngine;
use crate::sensitivity::{GameImportance, SensitivityEngine, SlotCandidate, TeamImpact};
use crate::state::TournamentState;
use crate::CASH;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[cfg(feature = "database")]
use crate::store::Store;

/// one node of the rendered bracket tree, keyed by a stable id so a client
/// can lay out edges without re-deriving bracket arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BracketNode {
    pub id: String,
    pub round: u32,
    pub position: usize,
    pub occupancy: Occupancy,
    pub parent_id: Option<String>,
    pub left_child_id: Option<String>,
    pub right_child_id: Option<String>,
}

/// `{ev, cash, total}`, the shape `value()` hands back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioValue {
    pub ev: f64,
    pub cash: f64,
    pub total: f64,
}

fn node_id(round: u32, position: usize, final_round: u32) -> String {
    if round == final_round {
        format!("finals-R{round}")
    } else {
        format!("R{round}-P{position}")
    }
}

/// Composition root: a shared, lock-guarded `TournamentState` plus the
/// external market adapter and (behind the `database` feature) the
/// persisted store the engine reloads from. Every method here is the async
/// surface a request handler calls into — the analytical work underneath
/// stays synchronous and CPU-bound.
pub struct TournamentDesk {
    state: RwLock<TournamentState>,
    market: Box<dyn MarketAdapter>,
    #[cfg(feature = "database")]
    store: Store,
}

impl TournamentDesk {
    #[cfg(not(feature = "database"))]
    pub fn new(state: TournamentState, market: Box<dyn MarketAdapter>) -> Self {
        Self {
            state: RwLock::new(state),
            market,
        }
    }

    #[cfg(feature = "database")]
    pub fn new(state: TournamentState, market: Box<dyn MarketAdapter>, store: Store) -> Self {
        Self {
            state: RwLock::new(state),
            market,
            store,
        }
    }

    pub async fn teams(&self) -> Vec<String> {
        self.state.read().await.ratings().teams().map(str::to_string).collect()
    }

    pub async fn team(&self, name: &str) -> Result<TeamRating, EngineError> {
        self.state.read().await.ratings().rating_of(name)
    }

    pub async fn scores(&self) -> Result<HashMap<String, f64>, EngineError> {
        ScoreEngine::expected_scores(&*self.state.read().await)
    }

    pub async fn bracket_tree(&self) -> Result<HashMap<String, BracketNode>, EngineError> {
        let state = self.state.read().await;
        let rounds = Propagator::propagate(&state)?;
        let final_round = (rounds.len() - 1) as u32;
        let mut nodes = HashMap::new();
        for (round, slots) in rounds.iter().enumerate() {
            let round = round as u32;
            for (position, occupancy) in slots.iter().enumerate() {
                let id = node_id(round, position, final_round);
                let parent_id = (round < final_round).then(|| node_id(round + 1, position / 2, final_round));
                let (left_child_id, right_child_id) = if round == 0 {
                    (None, None)
                } else {
                    (
                        Some(node_id(round - 1, position * 2, final_round)),
                        Some(node_id(round - 1, position * 2 + 1, final_round)),
                    )
                };
                nodes.insert(
                    id.clone(),
                    BracketNode {
                        id,
                        round,
                        position,
                        occupancy: occupancy.clone(),
                        parent_id,
                        left_child_id,
                        right_child_id,
                    },
                );
            }
        }
        Ok(nodes)
    }

    pub async fn completed_games(&self) -> Vec<(String, String)> {
        self.state
            .read()
            .await
            .completed_games()
            .iter()
            .map(|g| (g.winner.clone(), g.loser.clone()))
            .collect()
    }

    pub async fn add_completed_game(&self, winner: &str, loser: &str) -> Result<(), EngineError> {
        let mut state = self.state.write().await;
        *state = state.add_completed_game(winner, loser)?;
        #[cfg(feature = "database")]
        {
            let _ = self.store.record_completed_game(winner, loser, None).await;
        }
        Ok(())
    }

    pub async fn remove_completed_game(&self, winner: &str, loser: &str) {
        let mut state = self.state.write().await;
        *state = state.remove_completed_game(winner, loser);
        #[cfg(feature = "database")]
        {
            let _ = self.store.remove_completed_game(winner, loser).await;
        }
    }

    pub async fn positions(&self) -> Result<Positions, EngineError> {
        self.market.positions().await
    }

    pub async fn value(&self) -> Result<PortfolioValue, EngineError> {
        let positions = self.positions().await?;
        let state = self.state.read().await;
        let scores = ScoreEngine::expected_scores(&state)?;
        let total = PortfolioValuer::value(&positions, &scores, state.ratings());
        let cash = positions.get(CASH).copied().unwrap_or(0.0);
        let ev = total - cash;
        Ok(PortfolioValue { ev, cash, total })
    }

    pub async fn distribution(&self, n: u64, seed: u64, bins: usize) -> Result<Distribution, EngineError> {
        let positions = self.positions().await?;
        let state = self.state.read().await;
        Distribution::compute(&state, &positions, n, seed, bins)
    }

    pub async fn deltas(&self, eps: f64) -> Result<HashMap<String, f64>, EngineError> {
        let positions = self.positions().await?;
        let state = self.state.read().await;
        SensitivityEngine::get_all_team_deltas(&state, &positions, eps)
    }

    pub async fn team_impact(&self, team: &str, eps: f64) -> Result<f64, EngineError> {
        let positions = self.positions().await?;
        let state = self.state.read().await;
        SensitivityEngine::get_team_portfolio_delta(&state, &positions, team, eps)
    }

    pub async fn game_impact(&self, team1: &str, team2: &str) -> Result<(f64, f64, Vec<TeamImpact>), EngineError> {
        let positions = self.positions().await?;
        let state = self.state.read().await;
        SensitivityEngine::game_delta(&state, &positions, team1, team2)
    }

    pub async fn game_importance(&self) -> Result<Vec<GameImportance>, EngineError> {
        let positions = self.positions().await?;
        let state = self.state.read().await;
        SensitivityEngine::game_importance(&state, &positions)
    }

    pub async fn slot_candidates(&self, round: usize, position: usize) -> Result<Vec<SlotCandidate>, EngineError> {
        let positions = self.positions().await?;
        let state = self.state.read().await;
        SensitivityEngine::slot_candidates(&state, &positions, round, position)
    }

    pub async fn compute_path(&self, team: &str, round: usize, position: usize) -> Vec<(String, String, f64)> {
        let state = self.state.read().await;
        SensitivityEngine::compute_path(&state, team, round, position)
    }

    /// folds outcomes and rating adjustments into the shared state without
    /// persisting them — a read-your-writes preview for the caller to
    /// confirm before it becomes a real what-if entry in the store.
    pub async fn what_if(
        &self,
        outcomes: &[(String, String, f64)],
        adjustments: &[(String, f64)],
    ) -> Result<HashMap<String, f64>, EngineError> {
        let state = self.state.read().await;
        let derived = state.apply_what_if(outcomes, adjustments)?;
        ScoreEngine::expected_scores(&derived)
    }
}
