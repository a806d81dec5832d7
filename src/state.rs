use crate::bracket::Bracket;
use crate::error::EngineError;
use crate::overrides::OverrideTable;
use crate::rating::RatingBook;
use crate::Points;
use std::sync::Arc;

/// a played game: `winner` beat `loser`. Uniqueness on the `(winner, loser)`
/// pair is enforced by `TournamentState::add_completed_game`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedGame {
    pub winner: String,
    pub loser: String,
}

/// Immutable composition of everything a query needs: bracket, ratings,
/// overrides, scoring vector, forfeit probability, and the completed-game
/// ledger. Every "modification" returns a new state; fields are cheap to
/// share because `Bracket`, `RatingBook`, and `OverrideTable` are
/// `Arc`-backed internally.
#[derive(Debug, Clone)]
pub struct TournamentState {
    bracket: Bracket,
    ratings: RatingBook,
    overrides: OverrideTable,
    scoring: Arc<Vec<Points>>,
    forfeit: f64,
    completed: Arc<Vec<CompletedGame>>,
}

impl TournamentState {
    pub fn new(
        bracket: Bracket,
        ratings: RatingBook,
        overrides: OverrideTable,
        scoring: Vec<Points>,
        forfeit: f64,
    ) -> Result<Self, EngineError> {
        if !(0.0..1.0).contains(&forfeit) {
            return Err(EngineError::InvalidConfig(format!(
                "forfeit probability {forfeit} not in [0,1)"
            )));
        }
        let rounds = bracket.rounds() as usize;
        if scoring.len() != rounds {
            return Err(EngineError::InvalidConfig(format!(
                "scoring vector has {} entries, bracket has {rounds} rounds",
                scoring.len()
            )));
        }
        Ok(Self {
            bracket,
            ratings,
            overrides,
            scoring: Arc::new(scoring),
            forfeit,
            completed: Arc::new(Vec::new()),
        })
    }

    pub fn bracket(&self) -> &Bracket {
        &self.bracket
    }

    pub fn ratings(&self) -> &RatingBook {
        &self.ratings
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    pub fn scoring(&self) -> &[Points] {
        &self.scoring
    }

    pub fn forfeit(&self) -> f64 {
        self.forfeit
    }

    pub fn completed_games(&self) -> &[CompletedGame] {
        &self.completed
    }

    pub fn is_eliminated(&self, team: &str) -> bool {
        self.completed.iter().any(|g| g.loser == team)
    }

    /// `with_override`: a new state with the pair override set. Normalization
    /// to `min(team1,team2)` happens inside `OverrideTable`.
    pub fn with_override(&self, team1: &str, team2: &str, p: f64) -> Self {
        let mut next = self.clone();
        next.overrides = self.overrides.with_override(team1, team2, p);
        next
    }

    /// `with_team_adjustment`: a new state with `team`'s rating shifted by
    /// `(+delta offense, -delta defense)`.
    pub fn with_team_adjustment(&self, team: &str, delta: f64) -> Result<Self, EngineError> {
        let canon = self.ratings.resolve(team)?.to_string();
        let bumped = self.ratings.rating_of(&canon)?.bump(delta);
        let mut next = self.clone();
        next.ratings = self.ratings.with_rating(&canon, bumped);
        Ok(next)
    }

    pub fn add_completed_game(&self, winner: &str, loser: &str) -> Result<Self, EngineError> {
        if self
            .completed
            .iter()
            .any(|g| g.winner == winner && g.loser == loser)
        {
            return Err(EngineError::InvalidConfig(format!(
                "game ({winner}, {loser}) already recorded"
            )));
        }
        let mut completed = (*self.completed).clone();
        completed.push(CompletedGame {
            winner: winner.to_string(),
            loser: loser.to_string(),
        });
        let mut next = self.clone();
        next.completed = Arc::new(completed);
        next.overrides = next.overrides.with_override(winner, loser, 1.0);
        Ok(next)
    }

    pub fn remove_completed_game(&self, winner: &str, loser: &str) -> Self {
        let completed: Vec<CompletedGame> = self
            .completed
            .iter()
            .filter(|g| !(g.winner == winner && g.loser == loser))
            .cloned()
            .collect();
        let mut next = self.clone();
        next.overrides = next.overrides.without_pair(winner, loser);
        next.completed = Arc::new(completed);
        next
    }

    /// Folds a list of outcome overrides and rating adjustments into a
    /// single derived state. Any outcome override whose team1 or team2 is
    /// already eliminated (loser of a completed game) is silently dropped;
    /// rating adjustments always apply.
    pub fn apply_what_if(
        &self,
        outcomes: &[(String, String, f64)],
        adjustments: &[(String, f64)],
    ) -> Result<Self, EngineError> {
        let mut next = self.clone();
        for (team1, team2, p) in outcomes {
            if self.is_eliminated(team1) || self.is_eliminated(team2) {
                continue;
            }
            next = next.with_override(team1, team2, *p);
        }
        for (team, delta) in adjustments {
            next = next.with_team_adjustment(team, *delta)?;
        }
        Ok(next)
    }
}

#[cfg(test)]
pub mod fixtures {
    use super::*;
    use crate::bracket::Slot;
    use crate::rating::TeamRating;
    use std::collections::HashMap;

    /// four teams, identical ratings, matches the symmetric worked example.
    pub fn symmetric_four() -> TournamentState {
        let mut ratings = HashMap::new();
        for team in ["A", "B", "C", "D"] {
            ratings.insert(team.to_string(), TeamRating::new(0.0, 0.0, 67.7));
        }
        let book = RatingBook::load(ratings, vec![]).unwrap();
        let bracket = Bracket::new(vec![
            Slot::deterministic("A"),
            Slot::deterministic("B"),
            Slot::deterministic("C"),
            Slot::deterministic("D"),
        ])
        .unwrap();
        TournamentState::new(bracket, book, OverrideTable::new(), vec![1.0, 1.0], 0.0).unwrap()
    }

    /// 64-team bracket with a play-in at first-round slot 12 (`{X: 0.6, Y: 0.4}`).
    pub fn sixty_four_with_play_in() -> TournamentState {
        let mut ratings = HashMap::new();
        let mut slots = Vec::with_capacity(64);
        for i in 0..64 {
            if i == 12 {
                ratings.insert("X".to_string(), TeamRating::new(0.2, -0.2, 68.0));
                ratings.insert("Y".to_string(), TeamRating::new(-0.1, 0.1, 67.0));
                slots.push(Slot::play_in("X", 0.6, "Y"));
            } else {
                let name = format!("Team{i}");
                ratings.insert(name.clone(), TeamRating::new(0.0, 0.0, 67.7));
                slots.push(Slot::deterministic(name));
            }
        }
        let book = RatingBook::load(ratings, vec![]).unwrap();
        let bracket = Bracket::new(slots).unwrap();
        let scoring = vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0];
        TournamentState::new(bracket, book, OverrideTable::new(), scoring, 0.0).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::symmetric_four;

    #[test]
    fn with_override_does_not_mutate_original() {
        let state = symmetric_four();
        let overridden = state.with_override("A", "B", 1.0);
        assert!(state.overrides().get("A", "B").is_none());
        assert_eq!(overridden.overrides().get("A", "B"), Some(1.0));
    }

    #[test]
    fn completed_game_sets_forced_override_and_is_unique() {
        let state = symmetric_four().add_completed_game("A", "B").unwrap();
        assert_eq!(state.overrides().get("A", "B"), Some(1.0));
        assert!(state.is_eliminated("B"));
        assert!(state.add_completed_game("A", "B").is_err());
    }

    #[test]
    fn what_if_drops_overrides_for_eliminated_teams() {
        let state = symmetric_four().add_completed_game("A", "B").unwrap();
        let derived = state
            .apply_what_if(&[("B".into(), "C".into(), 1.0)], &[])
            .unwrap();
        assert!(derived.overrides().get("B", "C").is_none());
    }
}
