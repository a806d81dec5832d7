use crate::Probability;
use std::collections::HashMap;
use std::sync::Arc;

fn normalize(team1: &str, team2: &str, p: Probability) -> ((String, String), Probability) {
    if team1 <= team2 {
        ((team1.to_string(), team2.to_string()), p)
    } else {
        ((team2.to_string(), team1.to_string()), 1.0 - p)
    }
}

/// Symmetric map from an unordered pair of team names to a fixed win
/// probability for the pair. Storing `(A,B)->p` and retrieving `(B,A)`
/// yields `1-p`; keys are normalized alphabetically so the two write
/// orders collide onto the same entry.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    entries: Arc<HashMap<(String, String), Probability>>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// functional update: a new table with one pair overridden, sharing the
    /// rest of the map. Last writer wins on repeated, contradictory sets for
    /// the same pair (no normalization across the whole set is attempted).
    pub fn with_override(&self, team1: &str, team2: &str, p: Probability) -> Self {
        let (key, p) = normalize(team1, team2, p);
        let mut entries = (*self.entries).clone();
        entries.insert(key, p);
        Self {
            entries: Arc::new(entries),
        }
    }

    /// probability that `team1` beats `team2`, if overridden.
    pub fn get(&self, team1: &str, team2: &str) -> Option<Probability> {
        let (key, flip) = if team1 <= team2 {
            ((team1.to_string(), team2.to_string()), false)
        } else {
            ((team2.to_string(), team1.to_string()), true)
        };
        self.entries.get(&key).map(|p| if flip { 1.0 - p } else { *p })
    }

    /// drop an entry for a pair whose teams are already eliminated, without
    /// touching any other entry.
    pub fn without_pair(&self, team1: &str, team2: &str) -> Self {
        let (key, _) = normalize(team1, team2, 0.0);
        if !self.entries.contains_key(&key) {
            return self.clone();
        }
        let mut entries = (*self.entries).clone();
        entries.remove(&key);
        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn contains_either(&self, team: &str) -> bool {
        self.entries.keys().any(|(a, b)| a == team || b == team)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
