use crate::error::EngineError;
use crate::scenario::Scope;
use anyhow::Context;
use const_format::formatcp;
use std::sync::Arc;
use tokio_postgres::{Client, NoTls};

const SCHEMA: &str = formatcp!(
    "
    CREATE TABLE IF NOT EXISTS completed_games (
        winner      TEXT NOT NULL,
        loser       TEXT NOT NULL,
        round       INTEGER,
        recorded_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (winner, loser)
    );
    CREATE TABLE IF NOT EXISTS scenarios (
        id          BIGSERIAL PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        description TEXT,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    CREATE TABLE IF NOT EXISTS active_scenario (
        singleton   BOOLEAN PRIMARY KEY DEFAULT true,
        scenario_id BIGINT REFERENCES scenarios(id),
        CHECK (singleton)
    );
    CREATE TABLE IF NOT EXISTS whatif_game_outcomes (
        team1        TEXT NOT NULL,
        team2        TEXT NOT NULL,
        probability  DOUBLE PRECISION NOT NULL,
        is_permanent BOOLEAN NOT NULL,
        scenario_id  BIGINT REFERENCES scenarios(id),
        UNIQUE (team1, team2, is_permanent, scenario_id)
    );
    CREATE TABLE IF NOT EXISTS whatif_rating_adjustments (
        team         TEXT NOT NULL,
        adjustment   DOUBLE PRECISION NOT NULL,
        is_permanent BOOLEAN NOT NULL,
        scenario_id  BIGINT REFERENCES scenarios(id),
        UNIQUE (team, is_permanent, scenario_id)
    );
    CREATE TABLE IF NOT EXISTS rating_snapshot (
        team    TEXT PRIMARY KEY,
        offense DOUBLE PRECISION NOT NULL,
        defense DOUBLE PRECISION NOT NULL,
        tempo   DOUBLE PRECISION NOT NULL
    );
    "
);

fn scope_columns(scope: Scope) -> (bool, Option<i64>) {
    match scope {
        Scope::Permanent => (true, None),
        Scope::Scenario(id) => (false, Some(id)),
        Scope::AdHoc => (false, None),
    }
}

/// the durable side of completed games, scenarios, and what-if overrides.
/// The engine reloads from here at explicit reload points — there is no
/// in-engine locking; every write is one atomic statement.
pub struct Store {
    client: Arc<Client>,
}

impl Store {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .context("connecting to postgres")?;
        tokio::spawn(async move {
            if let Err(error) = connection.await {
                log::error!("postgres connection closed: {error}");
            }
        });
        client.batch_execute(SCHEMA).await.context("applying schema")?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub async fn record_completed_game(&self, winner: &str, loser: &str, round: Option<i32>) -> anyhow::Result<()> {
        self.client
            .execute(
                "INSERT INTO completed_games (winner, loser, round) VALUES ($1, $2, $3)
                 ON CONFLICT (winner, loser) DO NOTHING",
                &[&winner, &loser, &round],
            )
            .await?;
        Ok(())
    }

    pub async fn remove_completed_game(&self, winner: &str, loser: &str) -> anyhow::Result<()> {
        self.client
            .execute(
                "DELETE FROM completed_games WHERE winner = $1 AND loser = $2",
                &[&winner, &loser],
            )
            .await?;
        Ok(())
    }

    pub async fn completed_games(&self) -> anyhow::Result<Vec<(String, String)>> {
        let rows = self
            .client
            .query("SELECT winner, loser FROM completed_games", &[])
            .await?;
        Ok(rows.into_iter().map(|row| (row.get(0), row.get(1))).collect())
    }

    pub async fn create_scenario(&self, name: &str, description: Option<&str>) -> Result<i64, EngineError> {
        let row = self
            .client
            .query_one(
                "INSERT INTO scenarios (name, description) VALUES ($1, $2) RETURNING id",
                &[&name, &description],
            )
            .await
            .map_err(|error| {
                if error.to_string().contains("unique") {
                    EngineError::ConflictingName(name.to_string())
                } else {
                    EngineError::NotFound(error.to_string())
                }
            })?;
        Ok(row.get(0))
    }

    /// deletes the scenario and cascades to its overrides.
    pub async fn delete_scenario(&self, id: i64) -> anyhow::Result<()> {
        self.client
            .execute("DELETE FROM whatif_game_outcomes WHERE scenario_id = $1", &[&id])
            .await?;
        self.client
            .execute("DELETE FROM whatif_rating_adjustments WHERE scenario_id = $1", &[&id])
            .await?;
        self.client.execute("DELETE FROM scenarios WHERE id = $1", &[&id]).await?;
        Ok(())
    }

    pub async fn set_active_scenario(&self, id: Option<i64>) -> anyhow::Result<()> {
        self.client
            .execute(
                "INSERT INTO active_scenario (singleton, scenario_id) VALUES (true, $1)
                 ON CONFLICT (singleton) DO UPDATE SET scenario_id = excluded.scenario_id",
                &[&id],
            )
            .await?;
        Ok(())
    }

    pub async fn active_scenario(&self) -> anyhow::Result<Option<i64>> {
        let row = self
            .client
            .query_opt("SELECT scenario_id FROM active_scenario WHERE singleton", &[])
            .await?;
        Ok(row.and_then(|row| row.get(0)))
    }

    pub async fn upsert_game_outcome(
        &self,
        team1: &str,
        team2: &str,
        probability: f64,
        scope: Scope,
    ) -> anyhow::Result<()> {
        let (is_permanent, scenario_id) = scope_columns(scope);
        self.client
            .execute(
                "INSERT INTO whatif_game_outcomes (team1, team2, probability, is_permanent, scenario_id)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (team1, team2, is_permanent, scenario_id)
                 DO UPDATE SET probability = excluded.probability",
                &[&team1, &team2, &probability, &is_permanent, &scenario_id],
            )
            .await?;
        Ok(())
    }

    pub async fn upsert_rating_adjustment(&self, team: &str, delta: f64, scope: Scope) -> anyhow::Result<()> {
        let (is_permanent, scenario_id) = scope_columns(scope);
        self.client
            .execute(
                "INSERT INTO whatif_rating_adjustments (team, adjustment, is_permanent, scenario_id)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (team, is_permanent, scenario_id)
                 DO UPDATE SET adjustment = excluded.adjustment",
                &[&team, &delta, &is_permanent, &scenario_id],
            )
            .await?;
        Ok(())
    }

    pub async fn clear_ad_hoc(&self) -> anyhow::Result<()> {
        self.client
            .execute(
                "DELETE FROM whatif_game_outcomes WHERE NOT is_permanent AND scenario_id IS NULL",
                &[],
            )
            .await?;
        self.client
            .execute(
                "DELETE FROM whatif_rating_adjustments WHERE NOT is_permanent AND scenario_id IS NULL",
                &[],
            )
            .await?;
        Ok(())
    }
}
