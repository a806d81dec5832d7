use crate::error::EngineError;
use std::collections::HashMap;
use std::sync::Arc;

/// A team's rating record in standardized units: offense and defense are
/// unit-less deviations centered near 0; tempo is positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamRating {
    pub offense: f64,
    pub defense: f64,
    pub tempo: f64,
}

impl TeamRating {
    pub fn new(offense: f64, defense: f64, tempo: f64) -> Self {
        Self {
            offense,
            defense,
            tempo,
        }
    }

    /// the symmetric "strength" bump used by `SensitivityEngine::get_team_delta`:
    /// offense up by `delta`, defense down by `delta`.
    pub fn bump(&self, delta: f64) -> Self {
        Self {
            offense: self.offense + delta,
            defense: self.defense - delta,
            tempo: self.tempo,
        }
    }
}

/// Immutable map from canonical team name to rating, plus the alias index
/// that collapses equivalent names onto one canonical record.
///
/// Cheap to clone: both maps live behind an `Arc`, so a functional update
/// that leaves the book untouched shares it structurally.
#[derive(Debug, Clone)]
pub struct RatingBook {
    ratings: Arc<HashMap<String, TeamRating>>,
    canonical: Arc<HashMap<String, String>>,
}

impl RatingBook {
    /// Build a rating book from canonical ratings and alias classes.
    ///
    /// Each class's first entry is canonical; every alias (including the
    /// canonical name itself) must appear in exactly one class, matching
    /// `team_names.py::_build_lookup`'s uniqueness check.
    pub fn load(
        ratings: HashMap<String, TeamRating>,
        classes: Vec<Vec<String>>,
    ) -> Result<Self, EngineError> {
        let mut canonical = HashMap::new();
        for class in &classes {
            let Some(canon) = class.first() else {
                continue;
            };
            for name in class {
                if canonical.insert(name.clone(), canon.clone()).is_some() {
                    return Err(EngineError::InvalidConfig(format!(
                        "team name {name:?} appears in multiple equivalence classes"
                    )));
                }
            }
        }
        for name in ratings.keys() {
            canonical.entry(name.clone()).or_insert_with(|| name.clone());
        }
        Ok(Self {
            ratings: Arc::new(ratings),
            canonical: Arc::new(canonical),
        })
    }

    /// Resolve any known alias to the canonical name backing a rating,
    /// failing with `UnknownTeam` if it cannot be resolved.
    pub fn resolve(&self, name: &str) -> Result<&str, EngineError> {
        if self.ratings.contains_key(name) {
            return Ok(self.ratings.get_key_value(name).expect("checked above").0);
        }
        match self.canonical.get(name) {
            Some(canon) if self.ratings.contains_key(canon.as_str()) => Ok(self
                .ratings
                .get_key_value(canon.as_str())
                .expect("checked above")
                .0),
            _ => Err(EngineError::UnknownTeam(name.to_string())),
        }
    }

    /// Like `resolve`, but falls back to the input name instead of failing —
    /// used at the Position/Portfolio boundary where an unknown position is
    /// skipped rather than rejected.
    pub fn try_resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.resolve(name).unwrap_or(name)
    }

    pub fn get(&self, canonical_name: &str) -> Option<TeamRating> {
        self.ratings.get(canonical_name).copied()
    }

    pub fn rating_of(&self, name: &str) -> Result<TeamRating, EngineError> {
        let canon = self.resolve(name)?;
        Ok(self.ratings[canon])
    }

    pub fn teams(&self) -> impl Iterator<Item = &str> {
        self.ratings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Functional update: a new book with one team's rating replaced,
    /// sharing the alias index.
    pub fn with_rating(&self, canonical_name: &str, rating: TeamRating) -> Self {
        let mut ratings = (*self.ratings).clone();
        ratings.insert(canonical_name.to_string(), rating);
        Self {
            ratings: Arc::new(ratings),
            canonical: Arc::clone(&self.canonical),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> RatingBook {
        let mut ratings = HashMap::new();
        ratings.insert("Duke".into(), TeamRating::new(1.0, -1.0, 68.0));
        ratings.insert("Houston".into(), TeamRating::new(0.5, 0.5, 64.0));
        let classes = vec![vec!["Duke".into(), "Blue Devils".into()]];
        RatingBook::load(ratings, classes).unwrap()
    }

    #[test]
    fn resolves_alias_to_canonical() {
        let book = book();
        assert_eq!(book.resolve("Blue Devils").unwrap(), "Duke");
    }

    #[test]
    fn resolve_unknown_fails() {
        let book = book();
        assert!(matches!(
            book.resolve("Gonzaga"),
            Err(EngineError::UnknownTeam(_))
        ));
    }

    #[test]
    fn try_resolve_falls_back() {
        let book = book();
        assert_eq!(book.try_resolve("Gonzaga"), "Gonzaga");
    }

    #[test]
    fn duplicate_alias_is_invalid_config() {
        let ratings = HashMap::new();
        let classes = vec![
            vec!["Duke".into(), "Blue Devils".into()],
            vec!["Houston".into(), "Blue Devils".into()],
        ];
        assert!(matches!(
            RatingBook::load(ratings, classes),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn with_rating_does_not_mutate_original() {
        let book = book();
        let bumped = book.with_rating("Duke", TeamRating::new(2.0, -2.0, 68.0));
        assert_eq!(book.get("Duke").unwrap().offense, 1.0);
        assert_eq!(bumped.get("Duke").unwrap().offense, 2.0);
    }
}
