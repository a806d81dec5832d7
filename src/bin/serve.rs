use std::collections::HashMap;
use std::sync::Arc;
use tourneydesk::api::TournamentDesk;
use tourneydesk::bracket::{Bracket, Slot};
use tourneydesk::config::Cli;
use tourneydesk::market::{MarketAdapter, MockMarket};
use tourneydesk::overrides::OverrideTable;
use tourneydesk::portfolio::Positions;
use tourneydesk::rating::{RatingBook, TeamRating};
use tourneydesk::state::TournamentState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tourneydesk::init();
    let cli = Cli::load();
    log::info!("starting tournament desk with {} worker(s)", cli.worker_count());

    let state = placeholder_state(cli.forfeit_probability)?;
    let market: Box<dyn MarketAdapter> = Box::new(MockMarket::new(Positions::new()));

    #[cfg(feature = "database")]
    let desk = {
        let database_url = cli
            .database_url
            .clone()
            .unwrap_or_else(|| "postgres://localhost/tourneydesk".to_string());
        let store = tourneydesk::store::Store::connect(&database_url).await?;
        Arc::new(TournamentDesk::new(state, market, store))
    };
    #[cfg(not(feature = "database"))]
    let desk = Arc::new(TournamentDesk::new(state, market));

    tourneydesk::server::run(desk, &cli.bind).await?;
    Ok(())
}

// TODO: replace with the real bracket/ratings/overrides loader once the
// file formats land; that parsing is explicitly outside the engine's scope
// here, so this just gets the server up with a one-game bracket.
fn placeholder_state(forfeit_probability: f64) -> anyhow::Result<TournamentState> {
    let mut ratings = HashMap::new();
    ratings.insert("Home".to_string(), TeamRating::new(0.0, 0.0, 67.7));
    ratings.insert("Away".to_string(), TeamRating::new(0.0, 0.0, 67.7));
    let book = RatingBook::load(ratings, vec![])?;
    let bracket = Bracket::new(vec![Slot::deterministic("Home"), Slot::deterministic("Away")])?;
    Ok(TournamentState::new(
        bracket,
        book,
        OverrideTable::new(),
        vec![1.0],
        forfeit_probability,
    )?)
}
