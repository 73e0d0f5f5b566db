//! Response-time statistics over successful samples.
//!
//! Percentiles use the nearest-rank rule: with `n` sorted samples the p-th
//! percentile is `sorted[ceil(p * n / 100) - 1]`. No interpolation is applied,
//! so results are always one of the observed samples and reproducible across
//! runs that observed the same values.

/// Summary of a set of response times, all in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResponseTimeStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    pub p99: f64,
}

impl ResponseTimeStats {
    /// Compute statistics from unsorted samples
    ///
    /// An empty sample set yields all zeros; a single sample is returned for every
    /// statistic.
    pub fn from_samples(samples: &[f64]) -> Self {
        match samples {
            [] => Self::default(),
            [only] => Self {
                avg: *only,
                min: *only,
                max: *only,
                p95: *only,
                p99: *only,
            },
            _ => {
                let mut sorted = samples.to_vec();
                sorted.sort_by(f64::total_cmp);
                Self {
                    avg: mean(&sorted),
                    min: sorted[0],
                    max: sorted[sorted.len() - 1],
                    p95: percentile(&sorted, 95),
                    p99: percentile(&sorted, 99),
                }
            }
        }
    }
}

/// Nearest-rank percentile of an already sorted slice
pub fn percentile(sorted: &[f64], percent: u32) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let percent = percent.min(100) as usize;
    // ceil(percent * n / 100) in integers avoids 0.95 * n rounding drift
    let rank = (percent * n).div_ceil(100).max(1);
    sorted[rank.min(n) - 1]
}

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percentage of `part` over `total`, 0 when `total` is 0
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_samples() {
        assert_eq!(ResponseTimeStats::from_samples(&[]), ResponseTimeStats::default());
    }

    #[test]
    fn test_single_sample() {
        let stats = ResponseTimeStats::from_samples(&[0.25]);
        assert_eq!(stats.avg, 0.25);
        assert_eq!(stats.min, 0.25);
        assert_eq!(stats.max, 0.25);
        assert_eq!(stats.p95, 0.25);
        assert_eq!(stats.p99, 0.25);
    }

    #[test]
    fn test_three_samples() {
        let stats = ResponseTimeStats::from_samples(&[0.030, 0.010, 0.020]);
        assert!((stats.avg - 0.020).abs() < 1e-12);
        assert_eq!(stats.min, 0.010);
        assert_eq!(stats.max, 0.030);
        // ceil(0.95 * 3) = 3, ceil(0.99 * 3) = 3
        assert_eq!(stats.p95, 0.030);
        assert_eq!(stats.p99, 0.030);
    }

    #[test]
    fn test_nearest_rank_hundred_samples() {
        let sorted: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(percentile(&sorted, 95), 95.0);
        assert_eq!(percentile(&sorted, 99), 99.0);
        assert_eq!(percentile(&sorted, 100), 100.0);
    }

    #[test]
    fn test_nearest_rank_twenty_samples() {
        // 0.95 * 20 is exactly rank 19, no float drift to rank 20
        let sorted: Vec<f64> = (1..=20).map(f64::from).collect();
        assert_eq!(percentile(&sorted, 95), 19.0);
        assert_eq!(percentile(&sorted, 99), 20.0);
    }

    #[test]
    fn test_percentile_zero_clamps_to_first() {
        assert_eq!(percentile(&[1.0, 2.0, 3.0], 0), 1.0);
        assert_eq!(percentile(&[], 95), 0.0);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(2, 5), 40.0);
        assert_eq!(percentage(5, 5), 100.0);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }

    proptest! {
        #[test]
        fn prop_stats_are_ordered(samples in prop::collection::vec(0.0001f64..30.0, 2..500)) {
            let stats = ResponseTimeStats::from_samples(&samples);
            prop_assert!(stats.min <= stats.avg + 1e-9);
            prop_assert!(stats.avg <= stats.max + 1e-9);
            prop_assert!(stats.min <= stats.p95);
            prop_assert!(stats.p95 <= stats.p99);
            prop_assert!(stats.p99 <= stats.max);
        }

        #[test]
        fn prop_percentile_is_an_observed_sample(
            samples in prop::collection::vec(0.0001f64..30.0, 1..200),
            percent in 0u32..=100,
        ) {
            let mut sorted = samples.clone();
            sorted.sort_by(f64::total_cmp);
            let value = percentile(&sorted, percent);
            prop_assert!(samples.contains(&value));
        }
    }
}
