//! Derived views computed on demand from stored records (spec §4.5). Every
//! view streams the relevant index rather than materializing the store.

pub mod cardinality;
pub mod service_catalog;
pub mod service_map;

/// Percentile over raw samples via linear interpolation between the two
/// nearest order statistics (spec §4.5: used when no histogram is present).
pub fn percentile_from_samples(sorted: &[f64], rank: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = rank * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Percentile over an explicit-bounds histogram (spec §4.5: "linear-within-
/// bucket on sorted cumulative counts"). `bounds.len() == bucket_counts.len() - 1`;
/// the last bucket is `(last_bound, +Inf)`.
pub fn percentile_from_histogram(bucket_counts: &[u64], bounds: &[f64], rank: f64) -> f64 {
    let total: u64 = bucket_counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let target = rank * total as f64;
    let mut cumulative = 0u64;
    for (i, &count) in bucket_counts.iter().enumerate() {
        let next_cumulative = cumulative + count;
        if next_cumulative as f64 >= target {
            let lower_bound = if i == 0 { 0.0 } else { bounds[i - 1] };
            let upper_bound = bounds.get(i).copied().unwrap_or_else(|| lower_bound * 2.0 + 1.0);
            if count == 0 {
                return lower_bound;
            }
            let frac = (target - cumulative as f64) / count as f64;
            return lower_bound + (upper_bound - lower_bound) * frac;
        }
        cumulative = next_cumulative;
    }
    bounds.last().copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_percentile_uniform_distribution() {
        let sorted: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        assert!((percentile_from_samples(&sorted, 0.5) - 50.0).abs() < 1.0);
        assert!((percentile_from_samples(&sorted, 0.95) - 95.0).abs() < 1.0);
    }

    #[test]
    fn histogram_percentile_interpolates_within_crossing_bucket() {
        // buckets: (-inf,10]=50, (10,20]=50 ; bounds=[10,20]
        let counts = vec![50u64, 50u64];
        let bounds = vec![10.0, 20.0];
        let p50 = percentile_from_histogram(&counts, &bounds, 0.5);
        assert!((p50 - 10.0).abs() < 0.5);
    }
}
