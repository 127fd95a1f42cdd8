use statrs::distribution::{ContinuousCDF, Normal};

/// One point of a quantile-quantile plot of standardized residuals against the standard normal.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct QqPoint {
	pub theoretical: f64,
	pub sample: f64,
}

/**
Compute quantile-quantile plot data for a set of residuals.

The residuals are standardized to zero mean and unit sample standard deviation and sorted. The theoretical quantiles use the Blom plotting positions `(i + 1 - 0.375) / (n + 0.25)`. If the residuals have zero variance or there are fewer than two of them, this returns an empty vec.
*/
pub fn qq_points(residuals: &[f64]) -> Vec<QqPoint> {
	let n = residuals.len();
	if n < 2 {
		return Vec::new();
	}
	let mean = residuals.iter().sum::<f64>() / n as f64;
	let variance = residuals
		.iter()
		.map(|r| (r - mean) * (r - mean))
		.sum::<f64>()
		/ (n - 1) as f64;
	if variance == 0.0 {
		return Vec::new();
	}
	let std = variance.sqrt();
	let mut standardized: Vec<f64> = residuals.iter().map(|r| (r - mean) / std).collect();
	standardized.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
	let normal = match Normal::new(0.0, 1.0) {
		Ok(normal) => normal,
		Err(_) => return Vec::new(),
	};
	standardized
		.iter()
		.enumerate()
		.map(|(i, sample)| QqPoint {
			theoretical: normal.inverse_cdf((i as f64 + 1.0 - 0.375) / (n as f64 + 0.25)),
			sample: *sample,
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	#[test]
	fn test_qq_points_are_sorted_and_standardized() {
		let residuals = vec![3.0, -1.0, 0.5, 2.0, -2.5, 1.0];
		let points = qq_points(&residuals);
		assert_eq!(points.len(), residuals.len());
		for window in points.windows(2) {
			assert!(window[0].sample <= window[1].sample);
			assert!(window[0].theoretical < window[1].theoretical);
		}
		let sample_mean: f64 =
			points.iter().map(|p| p.sample).sum::<f64>() / points.len() as f64;
		assert_abs_diff_eq!(sample_mean, 0.0, epsilon = 1e-12);
	}

	#[test]
	fn test_qq_points_theoretical_symmetry() {
		let residuals = vec![-2.0, -1.0, 0.0, 1.0, 2.0];
		let points = qq_points(&residuals);
		let n = points.len();
		for i in 0..n / 2 {
			assert_abs_diff_eq!(
				points[i].theoretical,
				-points[n - 1 - i].theoretical,
				epsilon = 1e-9
			);
		}
	}

	#[test]
	fn test_qq_points_degenerate_inputs() {
		assert!(qq_points(&[]).is_empty());
		assert!(qq_points(&[1.0]).is_empty());
		assert!(qq_points(&[2.0, 2.0, 2.0]).is_empty());
	}
}
