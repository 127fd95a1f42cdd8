use super::Metric;
use itertools::izip;

/**
The Pearson product-moment correlation between two slices, computed over complete pairs only: a pair is skipped when either value is missing (NaN).

Returns `None` when fewer than two complete pairs exist or when either slice has zero variance over the complete pairs, since the correlation is undefined in both cases.
*/
pub struct PearsonCorrelation;

impl<'a> Metric<'a> for PearsonCorrelation {
	type Input = (&'a [f64], &'a [f64]);
	type Output = Option<f64>;

	fn compute(input: Self::Input) -> Self::Output {
		let (x, y) = input;
		let mut n = 0u64;
		let mut sum_x = 0.0;
		let mut sum_y = 0.0;
		for (x, y) in izip!(x.iter(), y.iter()) {
			if x.is_nan() || y.is_nan() {
				continue;
			}
			n += 1;
			sum_x += x;
			sum_y += y;
		}
		if n < 2 {
			return None;
		}
		let mean_x = sum_x / n as f64;
		let mean_y = sum_y / n as f64;
		let mut covariance = 0.0;
		let mut variance_x = 0.0;
		let mut variance_y = 0.0;
		for (x, y) in izip!(x.iter(), y.iter()) {
			if x.is_nan() || y.is_nan() {
				continue;
			}
			covariance += (x - mean_x) * (y - mean_y);
			variance_x += (x - mean_x) * (x - mean_x);
			variance_y += (y - mean_y) * (y - mean_y);
		}
		if variance_x == 0.0 || variance_y == 0.0 {
			return None;
		}
		Some(covariance / (variance_x.sqrt() * variance_y.sqrt()))
	}
}

#[test]
fn test_perfect_positive_correlation() {
	let r = PearsonCorrelation::compute((&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0])).unwrap();
	assert!((r - 1.0).abs() < 1e-12);
}

#[test]
fn test_symmetry() {
	let x = [22.1, 27.4, 30.2, 25.0];
	let y = [1200.0, 3500.0, 5000.0, 2100.0];
	let r_xy = PearsonCorrelation::compute((&x, &y)).unwrap();
	let r_yx = PearsonCorrelation::compute((&y, &x)).unwrap();
	assert!((r_xy - r_yx).abs() < 1e-12);
}

#[test]
fn test_skips_incomplete_pairs() {
	let x = [1.0, f64::NAN, 3.0, 4.0];
	let y = [2.0, 100.0, 6.0, 8.0];
	let r = PearsonCorrelation::compute((&x, &y)).unwrap();
	assert!((r - 1.0).abs() < 1e-12);
}

#[test]
fn test_undefined_correlation() {
	// fewer than two complete pairs
	assert!(PearsonCorrelation::compute((&[1.0], &[2.0])).is_none());
	// zero variance
	assert!(PearsonCorrelation::compute((&[1.0, 1.0, 1.0], &[2.0, 3.0, 4.0])).is_none());
}
