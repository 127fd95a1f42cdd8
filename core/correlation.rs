use anyhow::{format_err, Result};
use oncorisk_metrics::{Metric, PearsonCorrelation};

/// The Pearson correlation between two columns, together with the number of complete pairs it was computed over.
#[derive(Clone, Debug, serde::Serialize)]
pub struct CorrelationResult {
	pub column_a: String,
	pub column_b: String,
	pub r: f64,
	pub n_pairs: usize,
}

/// Compute the Pearson correlation between two columns over complete pairs. Fewer than two complete pairs, or zero variance in either column, is an error naming the columns involved.
pub fn compute_correlation(
	column_a: &str,
	column_b: &str,
	a: &[f64],
	b: &[f64],
) -> Result<CorrelationResult> {
	let n_pairs = a
		.iter()
		.zip(b.iter())
		.filter(|(a, b)| !a.is_nan() && !b.is_nan())
		.count();
	let r = PearsonCorrelation::compute((a, b)).ok_or_else(|| {
		format_err!(
			"correlation between \"{}\" and \"{}\" is undefined: {} complete pairs",
			column_a,
			column_b,
			n_pairs,
		)
	})?;
	Ok(CorrelationResult {
		column_a: column_a.to_owned(),
		column_b: column_b.to_owned(),
		r,
		n_pairs,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	#[test]
	fn test_positive_correlation() {
		let a = vec![1.0, 2.0, 3.0, 4.0];
		let b = vec![2.0, 4.1, 5.9, 8.0];
		let result = compute_correlation("bmi", "deaths", &a, &b).unwrap();
		assert!(result.r > 0.99);
		assert_eq!(result.n_pairs, 4);
	}

	#[test]
	fn test_incomplete_pairs_are_skipped() {
		let a = vec![1.0, f64::NAN, 3.0, 4.0];
		let b = vec![2.0, 4.0, 6.0, 8.0];
		let result = compute_correlation("bmi", "deaths", &a, &b).unwrap();
		assert_abs_diff_eq!(result.r, 1.0, epsilon = 1e-12);
		assert_eq!(result.n_pairs, 3);
	}

	#[test]
	fn test_undefined_correlation_names_the_columns() {
		let a = vec![1.0, f64::NAN];
		let b = vec![2.0, 4.0];
		let error = compute_correlation("bmi", "deaths", &a, &b).unwrap_err();
		let message = error.to_string();
		assert!(message.contains("bmi"));
		assert!(message.contains("deaths"));
		assert!(message.contains("1 complete pairs"));
	}
}
