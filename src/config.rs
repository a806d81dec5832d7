use clap::Parser;

/// process configuration: CLI flags that fall back to environment
/// variables.
#[derive(Debug, Clone, Parser)]
#[command(name = "serve", about = "Bracket propagation and sensitivity engine server")]
pub struct Cli {
    #[arg(long, env = "TOURNEYDESK_BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "FORFEIT_PROBABILITY", default_value_t = 0.0)]
    pub forfeit_probability: f64,

    /// matches the original's `USE_MOCK_DATA` toggle for the external
    /// market adapter.
    #[arg(long, env = "USE_MOCK_MARKET", default_value_t = true)]
    pub use_mock_market: bool,

    #[arg(long, env = "SIMULATION_WORKERS")]
    pub simulation_workers: Option<usize>,
}

impl Cli {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn worker_count(&self) -> usize {
        self.simulation_workers.unwrap_or_else(num_cpus::get)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_from_bare_binary_name() {
        let cli = Cli::parse_from(["serve"]);
        assert_eq!(cli.bind, "127.0.0.1:8080");
        assert!(cli.use_mock_market);
        assert_eq!(cli.forfeit_probability, 0.0);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from(["serve", "--bind", "0.0.0.0:9000", "--forfeit-probability", "0.02"]);
        assert_eq!(cli.bind, "0.0.0.0:9000");
        assert_eq!(cli.forfeit_probability, 0.02);
    }
}
