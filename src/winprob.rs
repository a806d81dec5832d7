use crate::error::EngineError;
use crate::overrides::OverrideTable;
use crate::rating::TeamRating;
use crate::Probability;

/// league-average points scored per game, at league-average tempo.
pub const AVG_SCORING: f64 = 70.0;
/// league-average tempo (possessions per game). Chosen so that two teams
/// with identical ratings at this tempo produce exactly the worked example's
/// `p = 0.5`, independent of the exact constant (see `DESIGN.md`).
pub const AVG_TEMPO: f64 = 67.7;
/// per-game scoring standard deviation used for the normal approximation.
pub const SCORING_STDDEV: f64 = 11.0;

/// numerically stable approximation to the standard normal CDF (Abramowitz
/// & Stegun 7.1.26), accurate to ~1e-7 — plenty for a probability consumed
/// as an f64 win chance.
fn normal_cdf(z: f64) -> f64 {
    let sign = if z < 0.0 { -1.0 } else { 1.0 };
    let x = z.abs() / std::f64::consts::SQRT_2;

    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    let erf = 1.0 - poly * (-x * x).exp();
    0.5 * (1.0 + sign * erf)
}

/// expected points for a side with rating `attacker` on offense against
/// `defender` on defense, at the pair's shared tempo.
fn expected_points(attacker: TeamRating, defender: TeamRating, shared_tempo: f64) -> f64 {
    (AVG_SCORING + attacker.offense - defender.defense) * (shared_tempo / AVG_TEMPO)
}

/// deterministic win probability that `a` beats `b`, ignoring overrides and
/// forfeits: a normal approximation over the points differential.
fn base_probability(a: TeamRating, b: TeamRating) -> Probability {
    let shared_tempo = (a.tempo + b.tempo) / 2.0;
    let points_a = expected_points(a, b, shared_tempo);
    let points_b = expected_points(b, a, shared_tempo);
    let diff = points_a - points_b;
    let combined_stddev = SCORING_STDDEV * std::f64::consts::SQRT_2;
    normal_cdf(diff / combined_stddev)
}

/// probability `team_a` beats `team_b`, blending any override for the pair
/// and the global forfeit model: `effective = (1-f)*p + f*0.5`.
///
/// Pure function of its inputs; `P(a,b) + P(b,a) = 1` to machine precision
/// by construction (the override path is itself symmetric, and
/// `base_probability` swaps cleanly under argument swap).
pub fn win_probability(
    team_a: &str,
    rating_a: TeamRating,
    team_b: &str,
    rating_b: TeamRating,
    overrides: &OverrideTable,
    forfeit: Probability,
) -> Result<Probability, EngineError> {
    if !(0.0..1.0).contains(&forfeit) {
        return Err(EngineError::InvalidConfig(format!(
            "forfeit probability {forfeit} not in [0,1)"
        )));
    }
    let p0 = overrides
        .get(team_a, team_b)
        .unwrap_or_else(|| base_probability(rating_a, rating_b));
    Ok((1.0 - forfeit) * p0 + forfeit * 0.5)
}
