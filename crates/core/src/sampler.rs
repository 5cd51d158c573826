//! Viewport sampling math.
//!
//! Every center carries an immutable `ranking` drawn uniformly from `[0, 1)`.
//! Keeping only rows with `ranking <= f` where `f = min(1, N / C)` yields a
//! Bernoulli sample of expected size `N` out of `C` matching rows. Because
//! rankings never change, a slightly different viewport keeps most of the
//! previously returned centers.

/// Default cap on centers returned for one viewport.
pub const DEFAULT_RESULT_LIMIT: i64 = 200;

/// Default age after which a center without updates drops off the map.
pub const DEFAULT_FRESHNESS_WEEKS: i32 = 4;

/// Sampling fraction for `count` matching rows and a cap of `limit`.
///
/// Returns `None` when nothing matches, so callers can skip the row query.
pub fn sampling_fraction(limit: i64, count: i64) -> Option<f64> {
    if count <= 0 {
        return None;
    }
    let fraction = limit.max(0) as f64 / count as f64;
    Some(fraction.min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_count_has_no_fraction() {
        assert_eq!(sampling_fraction(200, 0), None);
    }

    #[test]
    fn small_counts_return_everything() {
        assert_eq!(sampling_fraction(200, 150), Some(1.0));
        assert_eq!(sampling_fraction(200, 200), Some(1.0));
    }

    #[test]
    fn large_counts_scale_down() {
        assert_eq!(sampling_fraction(200, 1000), Some(0.2));
    }

    #[test]
    fn uniform_rankings_yield_about_limit_rows() {
        let rankings: Vec<f64> = (0..1000).map(|_| rand::random::<f64>()).collect();
        let f = sampling_fraction(200, rankings.len() as i64).unwrap();
        let kept = rankings.iter().filter(|r| **r <= f).count();
        assert!((120..=280).contains(&kept), "kept {kept}");
    }

    #[test]
    fn larger_fraction_keeps_previous_sample() {
        let rankings: Vec<f64> = (0..500).map(|_| rand::random::<f64>()).collect();
        let narrow = sampling_fraction(200, 1000).unwrap();
        let wide = sampling_fraction(200, 500).unwrap();
        for r in rankings.iter().filter(|r| **r <= narrow) {
            assert!(*r <= wide);
        }
    }
}
