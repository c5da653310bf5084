use std::fmt;

use ndarray::ArrayView2;

/// Median and interquartile range of one 2D array.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub label: String,
    pub median: f64,
    pub p25: f64,
    pub p75: f64,
}

impl Summary {
    pub fn of(label: impl Into<String>, data: ArrayView2<'_, f32>) -> Self {
        let sorted = sorted_values(data.iter().copied());
        Self {
            label: label.into(),
            median: percentile(sorted.as_deref(), 50.0),
            p25: percentile(sorted.as_deref(), 25.0),
            p75: percentile(sorted.as_deref(), 75.0),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Median={:.4}, IQR=({:.4} to {:.4})",
            self.label, self.median, self.p25, self.p75
        )
    }
}

/// Sorted copy of `values`, or `None` if any of them is NaN.
pub fn sorted_values(values: impl Iterator<Item = f32>) -> Option<Vec<f32>> {
    let mut data: Vec<f32> = values.collect();
    if data.iter().any(|v| v.is_nan()) {
        return None;
    }
    data.sort_by(f32::total_cmp);
    Some(data)
}

/// Percentile `q` (0..=100) of sorted data, interpolating linearly between
/// the two closest ranks. NaN for empty or NaN-containing input.
pub fn percentile(sorted: Option<&[f32]>, q: f64) -> f64 {
    let Some(data) = sorted else {
        return f64::NAN;
    };
    if data.is_empty() {
        return f64::NAN;
    }

    let rank = q / 100.0 * (data.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(data.len() - 1);
    let frac = rank - lo as f64;

    let a = data[lo] as f64;
    let b = data[hi] as f64;
    if frac == 0.0 { a } else { a + frac * (b - a) }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;

    #[test]
    fn test_odd_length_median() {
        let data = array![[5.0f32, 1.0, 3.0]];
        let summary = Summary::of("x", data.view());
        assert_eq!(summary.median, 3.0);
        assert_eq!(summary.p25, 2.0);
        assert_eq!(summary.p75, 4.0);
    }

    #[test]
    fn test_even_length_median_interpolates() {
        let data = array![[1.0f32, 2.0], [3.0, 4.0]];
        let summary = Summary::of("x", data.view());
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.p25, 1.75);
        assert_eq!(summary.p75, 3.25);
    }

    #[test]
    fn test_median_is_order_independent() {
        let values: Vec<f32> = (0..35).map(|i| ((i * 17) % 35) as f32 * 0.3 - 2.0).collect();
        let mut shuffled = values.clone();
        shuffled.reverse();
        shuffled.rotate_left(11);

        let a = Summary::of("a", Array2::from_shape_vec((5, 7), values).unwrap().view());
        let b = Summary::of("a", Array2::from_shape_vec((7, 5), shuffled).unwrap().view());
        assert_eq!(a, b);
        // 35 distinct values 0.3 * k - 2.0, k = 0..35, median at k = 17
        assert!((a.median - (0.3 * 17.0 - 2.0)).abs() < 1e-5);
    }

    #[test]
    fn test_format() {
        let summary = Summary {
            label: "Difference".to_string(),
            median: 0.5,
            p25: 0.125,
            p75: 1.0 / 3.0,
        };
        assert_eq!(
            summary.to_string(),
            "Difference: Median=0.5000, IQR=(0.1250 to 0.3333)"
        );
    }

    #[test]
    fn test_empty_and_nan_give_nan() {
        let empty = Array2::<f32>::zeros((0, 3));
        assert!(Summary::of("e", empty.view()).median.is_nan());

        let with_nan = array![[1.0f32, f32::NAN, 3.0]];
        let summary = Summary::of("n", with_nan.view());
        assert!(summary.median.is_nan());
        assert!(summary.p25.is_nan());
    }

    #[test]
    fn test_percentile_extremes() {
        let sorted = sorted_values([4.0f32, -1.0, 9.0].into_iter());
        assert_eq!(percentile(sorted.as_deref(), 0.0), -1.0);
        assert_eq!(percentile(sorted.as_deref(), 100.0), 9.0);
    }
}
