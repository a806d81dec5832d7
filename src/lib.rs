pub mod bracket;
pub mod distribution;
pub mod error;
pub mod market;
pub mod overrides;
pub mod portfolio;
pub mod propagate;
pub mod rating;
pub mod scenario;
pub mod score;
pub mod sensitivity;
pub mod simulate;
pub mod state;
pub mod winprob;

#[cfg(feature = "database")]
pub mod store;

#[cfg(feature = "server")]
pub mod api;

#[cfg(feature = "server")]
pub mod config;

#[cfg(feature = "server")]
pub mod server;

pub use error::EngineError;

/// Expected points, ratings deviations, and probabilities are all plain f64s.
/// The engine never needs anything more exotic than double precision:
/// accumulate in double precision, never rescale.
pub type Probability = f64;
pub type Rating = f64;
pub type Points = f64;

/// round-point vectors for the "standard" and "Calcutta" scorings.
pub const STANDARD_SCORING: &[Points] = &[1.0, 2.0, 4.0, 8.0, 16.0, 32.0];
pub const CALCUTTA_SCORING: &[Points] = &[1.0, 3.0, 6.0, 12.0, 24.0, 48.0];

/// the pseudo-team key for the cash position.
pub const CASH: &str = "cash";

/// initialize combined term+file logging: a debug-level file log plus an
/// info-level terminal log.
#[cfg(feature = "server")]
pub fn init() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves forward")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{time}.log")).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}
