use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// a named, persistent bundle of what-if overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// singleton: at most one scenario is active at a time. `None` means the
/// ad-hoc scope is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveScenario(pub Option<i64>);

/// the scope a `WhatIfOverride` applies in: every query (`Permanent`), one
/// named scenario, or the unnamed ad-hoc scope used when no scenario is
/// active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    Permanent,
    Scenario(i64),
    AdHoc,
}

/// a single what-if entry: either a forced game outcome or a rating
/// adjustment, scoped to `Scope`. Game outcomes are normalized so
/// `team1 <= team2` alphabetically, flipping `probability` as needed — the
/// same normalization `OverrideTable` applies internally.
#[derive(Debug, Clone, PartialEq)]
pub enum WhatIfOverride {
    GameOutcome {
        team1: String,
        team2: String,
        probability: f64,
        scope: Scope,
    },
    RatingAdjustment {
        team: String,
        delta: f64,
        scope: Scope,
    },
}

impl WhatIfOverride {
    pub fn game_outcome(team1: &str, team2: &str, probability: f64, scope: Scope) -> Self {
        let (team1, team2, probability) = if team1 <= team2 {
            (team1.to_string(), team2.to_string(), probability)
        } else {
            (team2.to_string(), team1.to_string(), 1.0 - probability)
        };
        Self::GameOutcome {
            team1,
            team2,
            probability,
            scope,
        }
    }

    pub fn rating_adjustment(team: &str, delta: f64, scope: Scope) -> Self {
        Self::RatingAdjustment {
            team: team.to_string(),
            delta,
            scope,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Self::GameOutcome { scope, .. } => *scope,
            Self::RatingAdjustment { scope, .. } => *scope,
        }
    }
}

/// in-memory scenario CRUD; the persisted equivalent lives in `store`
/// behind the `database` feature and is reloaded into one of these at
/// well-defined reload points.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRegistry {
    scenarios: Vec<Scenario>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, id: i64, name: &str, description: Option<String>) -> Result<(), EngineError> {
        if self.scenarios.iter().any(|s| s.name == name) {
            return Err(EngineError::ConflictingName(name.to_string()));
        }
        self.scenarios.push(Scenario {
            id,
            name: name.to_string(),
            description,
        });
        Ok(())
    }

    /// removes the scenario; callers are responsible for cascading the
    /// delete to the scenario's overrides in the persistent store.
    pub fn delete(&mut self, id: i64) -> Result<Scenario, EngineError> {
        let index = self
            .scenarios
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("scenario {id}")))?;
        Ok(self.scenarios.remove(index))
    }

    pub fn get(&self, id: i64) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn list(&self) -> &[Scenario] {
        &self.scenarios
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_collision_on_create_is_rejected() {
        let mut registry = ScenarioRegistry::new();
        registry.create(1, "march-madness", None).unwrap();
        assert!(matches!(
            registry.create(2, "march-madness", None),
            Err(EngineError::ConflictingName(_))
        ));
    }

    #[test]
    fn delete_missing_scenario_is_not_found() {
        let mut registry = ScenarioRegistry::new();
        assert!(matches!(registry.delete(99), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn game_outcome_normalizes_team_order() {
        let by_ba = WhatIfOverride::game_outcome("B", "A", 0.3, Scope::AdHoc);
        match by_ba {
            WhatIfOverride::GameOutcome { team1, team2, probability, .. } => {
                assert_eq!(team1, "A");
                assert_eq!(team2, "B");
                assert!((probability - 0.7).abs() < 1e-12);
            }
            _ => panic!("expected GameOutcome"),
        }
    }
}
