//! Least-squares trend projection over a time series.
//!
//! Deliberately a straight line, not a statistical model: the projection has
//! to stay explainable to end users in one sentence ("recent trend, extended
//! forward").

use chrono::Days;

use crate::aggregate::TimeSeriesPoint;

/// Minimum series length before any projection is attempted.
const MIN_POINTS: usize = 8;

/// Fits an ordinary least-squares line over the trailing `trailing_window`
/// points (index as x) and extends it `horizon` daily points past the end of
/// the series. Projected values are clamped non-negative and rounded to the
/// nearest integer.
///
/// Series shorter than 8 points are refused: returns an empty vec rather
/// than an approximation nobody should trust.
pub fn forecast(
    series: &[TimeSeriesPoint],
    trailing_window: usize,
    horizon: usize,
) -> Vec<TimeSeriesPoint> {
    if series.len() < MIN_POINTS || horizon == 0 {
        return Vec::new();
    }

    let n = trailing_window.clamp(2, series.len());
    let tail = &series[series.len() - n..];

    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let ys: Vec<f64> = tail.iter().map(|p| p.value).collect();

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let num: f64 = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let mut den: f64 = xs.iter().map(|x| (x - mean_x) * (x - mean_x)).sum();
    if den == 0.0 {
        den = 1.0;
    }
    let slope = num / den;
    let intercept = mean_y - slope * mean_x;

    let last_date = series[series.len() - 1].date;

    (0..horizon)
        .map(|k| {
            let projected = intercept + slope * (n + k) as f64;
            TimeSeriesPoint {
                date: last_date
                    .checked_add_days(Days::new(k as u64 + 1))
                    .unwrap_or(last_date),
                value: projected.max(0.0).round(),
                sample_count: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> Vec<TimeSeriesPoint> {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| TimeSeriesPoint {
                date: start.checked_add_days(Days::new(i as u64)).unwrap(),
                value: *v,
                sample_count: None,
            })
            .collect()
    }

    #[test]
    fn test_refuses_short_series() {
        let s = series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert!(forecast(&s, 28, 8).is_empty());
    }

    #[test]
    fn test_eight_points_yield_exactly_horizon_points() {
        let s = series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let f = forecast(&s, 28, 8);
        assert_eq!(f.len(), 8);
        for p in &f {
            assert!(p.value >= 0.0);
        }
    }

    #[test]
    fn test_extends_a_linear_trend_exactly() {
        // y = 2x over 10 points; next point is 2*10 = 20
        let vals: Vec<f64> = (0..10).map(|i| (i * 2) as f64).collect();
        let s = series(&vals);
        let f = forecast(&s, 10, 3);
        assert_eq!(f[0].value, 20.0);
        assert_eq!(f[1].value, 22.0);
        assert_eq!(f[2].value, 24.0);
        assert_eq!(f[0].date.to_string(), "2025-06-11");
    }

    #[test]
    fn test_downward_trend_clamps_at_zero() {
        let vals: Vec<f64> = (0..10).map(|i| (18 - i * 2) as f64).collect();
        let s = series(&vals);
        let f = forecast(&s, 10, 4);
        // the fitted line continues to -2 but projections must not go negative
        assert_eq!(f[0].value, 0.0);
        assert!(f.iter().all(|p| p.value >= 0.0));
    }

    #[test]
    fn test_flat_series_projects_flat() {
        let s = series(&[5.0; 12]);
        let f = forecast(&s, 28, 2);
        assert_eq!(f[0].value, 5.0);
        assert_eq!(f[1].value, 5.0);
    }

    #[test]
    fn test_trailing_window_limits_fit() {
        // Old points are noise; last 4 points are exactly linear
        let mut vals = vec![100.0, 0.0, 100.0, 0.0, 100.0, 0.0];
        vals.extend([10.0, 12.0, 14.0, 16.0]);
        let s = series(&vals);
        let f = forecast(&s, 4, 1);
        assert_eq!(f[0].value, 18.0);
    }
}
