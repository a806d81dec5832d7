use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashMap;
use tourneydesk::bracket::{Bracket, Slot};
use tourneydesk::overrides::OverrideTable;
use tourneydesk::propagate::Propagator;
use tourneydesk::rating::{RatingBook, TeamRating};
use tourneydesk::score::ScoreEngine;
use tourneydesk::state::TournamentState;

fn sixty_four_team_state() -> TournamentState {
    let mut ratings = HashMap::new();
    let mut slots = Vec::with_capacity(64);
    for i in 0..64 {
        let name = format!("Team{i}");
        let offense = (i % 7) as f64 * 0.1 - 0.3;
        let defense = (i % 5) as f64 * 0.1 - 0.2;
        ratings.insert(name.clone(), TeamRating::new(offense, defense, 67.0 + (i % 3) as f64));
        slots.push(Slot::deterministic(name));
    }
    let book = RatingBook::load(ratings, vec![]).expect("valid ratings");
    let bracket = Bracket::new(slots).expect("power-of-two bracket");
    let scoring = vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0];
    TournamentState::new(bracket, book, OverrideTable::new(), scoring, 0.0).expect("valid state")
}

fn bench_propagation(c: &mut Criterion) {
    let state = sixty_four_team_state();
    c.bench_function("propagate_64_team_bracket", |b| {
        b.iter(|| Propagator::propagate(black_box(&state)).unwrap())
    });
}

fn bench_expected_scores(c: &mut Criterion) {
    let state = sixty_four_team_state();
    c.bench_function("expected_scores_64_team_bracket", |b| {
        b.iter(|| ScoreEngine::expected_scores(black_box(&state)).unwrap())
    });
}

criterion_group!(benches, bench_propagation, bench_expected_scores);
criterion_main!(benches);
