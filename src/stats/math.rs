//! Small numeric helpers for the statistics engine. Everything takes plain
//! f64 slices and returns Option so empty or too-small samples stay explicit.

/// Quantile with linear interpolation between the two nearest ranks.
/// `sorted` must be ascending; q in [0, 1].
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let n = sorted.len();
    if n == 1 {
        return Some(sorted[0]);
    }
    let h = q * (n - 1) as f64;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = h - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn mean(data: &[f64]) -> Option<f64> {
    let count = data.len() as f64;
    if count > 0.0 {
        let sum: f64 = data.iter().sum();
        Some(sum / count)
    } else {
        None
    }
}

/// Sample standard deviation (n - 1 in the denominator). Undefined below
/// two values.
pub fn sample_std(data: &[f64]) -> Option<f64> {
    let n = data.len();
    if n < 2 {
        return None;
    }
    let data_mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = data_mean - *value;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1) as f64;
    Some(variance.sqrt())
}

/// The unique most-frequent value, or None when the top frequency is shared.
/// Ties are never broken arbitrarily.
pub fn unique_mode(sorted: &[f64]) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let mut best_value = sorted[0];
    let mut best_run = 0usize;
    let mut best_tied = false;

    let mut run_value = sorted[0];
    let mut run = 0usize;
    for &v in sorted {
        if v == run_value {
            run += 1;
        } else {
            if run > best_run {
                best_value = run_value;
                best_run = run;
                best_tied = false;
            } else if run == best_run {
                best_tied = true;
            }
            run_value = v;
            run = 1;
        }
    }
    if run > best_run {
        best_value = run_value;
        best_run = run;
        best_tied = false;
    } else if run == best_run {
        best_tied = true;
    }

    if best_tied {
        None
    } else {
        Some(best_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates_between_ranks() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&data, 0.0), Some(1.0));
        assert_eq!(quantile(&data, 1.0), Some(4.0));
        assert_eq!(quantile(&data, 0.5), Some(2.5));
        assert_eq!(quantile(&data, 0.25), Some(1.75));
    }

    #[test]
    fn quantile_empty_is_none() {
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn sample_std_needs_two_values() {
        assert_eq!(sample_std(&[3.0]), None);
        let s = sample_std(&[2.0, 4.0]).unwrap();
        assert!((s - std::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn unique_mode_picks_single_winner() {
        assert_eq!(unique_mode(&[1.0, 2.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(unique_mode(&[5.0, 5.0, 5.0]), Some(5.0));
    }

    #[test]
    fn tied_mode_is_none() {
        assert_eq!(unique_mode(&[1.0, 1.0, 2.0, 2.0]), None);
        assert_eq!(unique_mode(&[1.0, 2.0, 3.0]), None);
    }
}
