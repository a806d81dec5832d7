use crate::error::EngineError;
use crate::Probability;
use std::collections::HashMap;
use std::sync::Arc;

/// One node of the bracket tree. First-round slots are the leaves; each
/// slot carries an occupancy distribution over the teams that could end up
/// there. A slot with one entry is deterministic; a slot with two entries
/// is a play-in game.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot(HashMap<String, Probability>);

impl Slot {
    pub fn deterministic(team: impl Into<String>) -> Self {
        let mut map = HashMap::new();
        map.insert(team.into(), 1.0);
        Self(map)
    }

    pub fn play_in(team_a: impl Into<String>, p_a: Probability, team_b: impl Into<String>) -> Self {
        let mut map = HashMap::new();
        map.insert(team_a.into(), p_a);
        map.insert(team_b.into(), 1.0 - p_a);
        Self(map)
    }

    pub fn get(&self, team: &str) -> Probability {
        self.0.get(team).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Probability)> {
        self.0.iter().map(|(t, p)| (t.as_str(), *p))
    }

    pub fn teams(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.0.is_empty() || self.0.len() > 2 {
            return Err(EngineError::MalformedBracket(format!(
                "slot must have 1 or 2 teams, got {}",
                self.0.len()
            )));
        }
        let total: Probability = self.0.values().sum();
        if (total - 1.0).abs() > 1e-9 {
            return Err(EngineError::MalformedBracket(format!(
                "slot probabilities sum to {total}, expected 1.0"
            )));
        }
        Ok(())
    }
}

impl From<HashMap<String, Probability>> for Slot {
    fn from(map: HashMap<String, Probability>) -> Self {
        Self(map)
    }
}

/// Ordered sequence of first-round slots. Length must be a power of two;
/// the bracket is built once at load and never mutated in place — every
/// downstream transformation works on a `TournamentState`, not the bracket
/// directly.
#[derive(Debug, Clone)]
pub struct Bracket {
    slots: Arc<Vec<Slot>>,
}

impl Bracket {
    pub fn new(slots: Vec<Slot>) -> Result<Self, EngineError> {
        let len = slots.len();
        if len == 0 || (len & (len - 1)) != 0 {
            return Err(EngineError::MalformedBracket(format!(
                "bracket length {len} is not a power of two"
            )));
        }
        for slot in &slots {
            slot.validate()?;
        }
        Ok(Self {
            slots: Arc::new(slots),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// number of rounds above the leaves; `log2(len)`.
    pub fn rounds(&self) -> u32 {
        self.slots.len().trailing_zeros()
    }

    pub fn slot(&self, index: usize) -> &Slot {
        &self.slots[index]
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// first-round index of the slot a team starts in, if any.
    pub fn start_index(&self, team: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.get(team) > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two() {
        let slots = vec![Slot::deterministic("A"), Slot::deterministic("B"), Slot::deterministic("C")];
        assert!(matches!(Bracket::new(slots), Err(EngineError::MalformedBracket(_))));
    }

    #[test]
    fn accepts_play_in_slot() {
        let slots = vec![
            Slot::play_in("X", 0.6, "Y"),
            Slot::deterministic("Z"),
        ];
        let bracket = Bracket::new(slots).unwrap();
        assert_eq!(bracket.rounds(), 1);
    }

    #[test]
    fn rejects_slot_not_summing_to_one() {
        let mut map = HashMap::new();
        map.insert("X".to_string(), 0.6);
        map.insert("Y".to_string(), 0.6);
        let slots = vec![Slot::from(map), Slot::deterministic("Z")];
        assert!(matches!(Bracket::new(slots), Err(EngineError::MalformedBracket(_))));
    }

    #[test]
    fn start_index_finds_team() {
        let slots = vec![Slot::deterministic("A"), Slot::deterministic("B")];
        let bracket = Bracket::new(slots).unwrap();
        assert_eq!(bracket.start_index("B"), Some(1));
        assert_eq!(bracket.start_index("Q"), None);
    }
}
