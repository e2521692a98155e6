use crate::common::traits::CrashPointSource;
use crate::config::OddsConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Crash point generator with a heavy-tailed distribution and a house edge
///
/// `r < house_edge` crashes instantly at 1.00x. Otherwise the crash point is
/// `0.9 / (1 - r)`, occasionally boosted, and clamped to
/// `[min_crash, max_crash]`.
pub struct CrashPointGenerator<R = StdRng> {
    rng: R,
    odds: OddsConfig,
}

impl CrashPointGenerator<StdRng> {
    /// Generator backed by OS entropy
    pub fn from_entropy(odds: OddsConfig) -> Self {
        Self::new(StdRng::from_entropy(), odds)
    }

    /// Reproducible generator for replays and tests
    pub fn with_seed(seed: u64, odds: OddsConfig) -> Self {
        Self::new(StdRng::seed_from_u64(seed), odds)
    }
}

impl<R: Rng> CrashPointGenerator<R> {
    pub fn new(rng: R, odds: OddsConfig) -> Self {
        Self { rng, odds }
    }

    /// Draw the crash multiplier for one round
    pub fn generate(&mut self) -> f64 {
        let r: f64 = self.rng.gen();
        if r < self.odds.house_edge {
            return 1.0;
        }

        let mut base = 0.9 / (1.0 - r);

        if self.rng.gen::<f64>() < self.odds.boost_chance {
            let u: f64 = self.rng.gen();
            base *= 1.0 + u * self.odds.boost_scale;
        }

        base.clamp(self.odds.min_crash, self.odds.max_crash)
    }

    pub fn odds(&self) -> &OddsConfig {
        &self.odds
    }
}

impl<R: Rng + Send> CrashPointSource for CrashPointGenerator<R> {
    fn next_crash_point(&mut self) -> f64 {
        self.generate()
    }
}

/// Replays a fixed list of crash points, then repeats the last one
///
/// Falls back to 1.0 when constructed empty.
#[derive(Debug, Clone)]
pub struct ScriptedCrashPoints {
    points: VecDeque<f64>,
    last: f64,
}

impl ScriptedCrashPoints {
    pub fn new(points: impl IntoIterator<Item = f64>) -> Self {
        Self {
            points: points.into_iter().collect(),
            last: 1.0,
        }
    }
}

impl CrashPointSource for ScriptedCrashPoints {
    fn next_crash_point(&mut self) -> f64 {
        if let Some(point) = self.points.pop_front() {
            self.last = point.max(1.0);
        }
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crash_point_bounds() {
        let mut generator = CrashPointGenerator::with_seed(7, OddsConfig::default());

        for _ in 0..10_000 {
            let point = generator.generate();
            assert!(point >= 1.0, "crash point {} below 1.0", point);
            assert!(point <= 200.0, "crash point {} above 200.0", point);
            assert!(point == 1.0 || point >= 1.01, "crash point {} inside (1.0, 1.01)", point);
        }
    }

    #[test]
    fn test_house_edge_frequency() {
        let mut generator = CrashPointGenerator::with_seed(42, OddsConfig::default());
        let samples = 20_000;

        let instant = (0..samples).filter(|_| generator.generate() == 1.0).count();
        let frequency = instant as f64 / samples as f64;

        assert!(
            (frequency - 0.05).abs() <= 0.01,
            "instant crash frequency {} outside 0.05 ± 0.01",
            frequency
        );
    }

    #[test]
    fn test_seeded_generators_agree() {
        let mut a = CrashPointGenerator::with_seed(99, OddsConfig::default());
        let mut b = CrashPointGenerator::with_seed(99, OddsConfig::default());

        let first: Vec<f64> = (0..50).map(|_| a.generate()).collect();
        let second: Vec<f64> = (0..50).map(|_| b.generate()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_house_edge_never_instant() {
        let odds = OddsConfig {
            house_edge: 0.0,
            ..Default::default()
        };
        let mut generator = CrashPointGenerator::with_seed(1, odds);

        assert!((0..5_000).all(|_| generator.generate() >= 1.01));
    }

    #[test]
    fn test_outliers_are_clamped() {
        let odds = OddsConfig {
            house_edge: 0.0,
            boost_chance: 1.0,
            boost_scale: 1_000.0,
            ..Default::default()
        };
        let mut generator = CrashPointGenerator::with_seed(3, odds);

        let max = (0..5_000).map(|_| generator.generate()).fold(0.0, f64::max);
        assert_eq!(max, 200.0);
    }

    #[test]
    fn test_scripted_points_repeat_last() {
        let mut source = ScriptedCrashPoints::new([2.5, 1.0, 3.0]);
        assert_eq!(source.next_crash_point(), 2.5);
        assert_eq!(source.next_crash_point(), 1.0);
        assert_eq!(source.next_crash_point(), 3.0);
        assert_eq!(source.next_crash_point(), 3.0);
    }
}
