use crate::error::EngineError;
use crate::portfolio::{Positions, PortfolioValuer};
use crate::score::ScoreEngine;
use crate::simulate::Simulator;
use crate::state::TournamentState;

const PERCENTILE_POINTS: &[u8] = &[1, 5, 10, 25, 50, 75, 90, 95, 99];

/// uniform-width bucket over `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

/// Monte Carlo distribution of portfolio value: the analytic expected
/// value (from `ScoreEngine`), the simulated min/max, a named percentile
/// ladder, and a uniform-width histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub expected_value: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: Vec<(u8, f64)>,
    pub histogram: Vec<HistogramBin>,
}

impl Distribution {
    pub fn compute(
        state: &TournamentState,
        positions: &Positions,
        n: u64,
        seed: u64,
        bins: usize,
    ) -> Result<Self, EngineError> {
        let analytic_scores = ScoreEngine::expected_scores(state)?;
        let expected_value = PortfolioValuer::value(positions, &analytic_scores, state.ratings());

        let simulations = Simulator::run_simulations(state, n, seed)?;
        let mut values: Vec<f64> = simulations
            .iter()
            .map(|scores| PortfolioValuer::value(positions, scores, state.ratings()))
            .collect();
        values.sort_by(|a, b| a.partial_cmp(b).expect("portfolio values are not NaN"));

        let min = *values.first().unwrap_or(&expected_value);
        let max = *values.last().unwrap_or(&expected_value);
        let percentiles = PERCENTILE_POINTS
            .iter()
            .map(|&pct| (pct, Self::percentile(&values, pct)))
            .collect();
        let histogram = Self::histogram(&values, min, max, bins.max(1));

        Ok(Self {
            expected_value,
            min,
            max,
            percentiles,
            histogram,
        })
    }

    /// nearest-rank percentile over the sorted sample.
    fn percentile(sorted: &[f64], pct: u8) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }
        let rank = ((pct as f64 / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        sorted[rank.min(sorted.len() - 1)]
    }

    fn histogram(sorted: &[f64], min: f64, max: f64, bins: usize) -> Vec<HistogramBin> {
        let width = if (max - min).abs() < 1e-12 {
            1.0
        } else {
            (max - min) / bins as f64
        };
        let mut counts = vec![0u64; bins];
        for &value in sorted {
            let index = if width <= 0.0 {
                0
            } else {
                (((value - min) / width) as usize).min(bins - 1)
            };
            counts[index] += 1;
        }
        (0..bins)
            .map(|i| HistogramBin {
                lower: min + width * i as f64,
                upper: min + width * (i + 1) as f64,
                count: counts[i],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fixtures::symmetric_four;

    #[test]
    fn histogram_counts_sum_to_sample_size() {
        let state = symmetric_four();
        let positions = Positions::new();
        let dist = Distribution::compute(&state, &positions, 500, 7, 10).unwrap();
        let total: u64 = dist.histogram.iter().map(|b| b.count).sum();
        assert_eq!(total, 500);
    }

    #[test]
    fn percentiles_are_monotonic() {
        let state = symmetric_four();
        let mut positions = Positions::new();
        positions.insert("A".to_string(), 1.0);
        let dist = Distribution::compute(&state, &positions, 500, 7, 10).unwrap();
        for window in dist.percentiles.windows(2) {
            assert!(window[0].1 <= window[1].1 + 1e-12);
        }
    }

    #[test]
    fn max_is_counted_in_last_bin() {
        let state = symmetric_four();
        let positions = Positions::new();
        let dist = Distribution::compute(&state, &positions, 300, 7, 4).unwrap();
        assert!(dist.histogram.last().unwrap().count > 0 || dist.min == dist.max);
    }
}
