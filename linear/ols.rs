use crate::LinearError;
use ndarray::prelude::*;
use statrs::distribution::{ContinuousCDF, StudentsT};

#[derive(Clone, Debug)]
pub struct OlsOptions {
	pub fit_intercept: bool,
	pub compute_inference: bool,
}

impl Default for OlsOptions {
	fn default() -> Self {
		Self {
			fit_intercept: true,
			compute_inference: true,
		}
	}
}

/// A fitted ordinary least squares model. `term_names` aligns with `coefficients`; when an intercept is fitted it is the first term.
#[derive(Clone, Debug, serde::Serialize)]
pub struct OlsModel {
	pub term_names: Vec<String>,
	pub coefficients: Vec<f64>,
	pub std_errors: Option<Vec<f64>>,
	pub t_values: Option<Vec<f64>>,
	pub p_values: Option<Vec<f64>>,
	pub r_squared: f64,
	pub adj_r_squared: f64,
	/// AIC = n * ln(RSS / n) + 2k, where k counts the fitted coefficients.
	pub aic: f64,
	pub fitted: Vec<f64>,
	pub residuals: Vec<f64>,
	pub n_observations: usize,
}

/**
Fit an ordinary least squares regression of `y` on the columns of `x` by solving the normal equations. `term_names` must have one entry per column of `x`.

Perfectly collinear predictors make XᵀX singular; this is surfaced as [`LinearError::PerfectCollinearity`](../enum.LinearError.html) rather than corrected automatically.
*/
pub fn fit_ols(
	y: &[f64],
	x: ArrayView2<f64>,
	term_names: &[String],
	options: &OlsOptions,
) -> Result<OlsModel, LinearError> {
	if y.is_empty() {
		return Err(LinearError::EmptyInput { field: "y" });
	}
	let n = y.len();
	if x.nrows() != n {
		return Err(LinearError::DimensionMismatch {
			y_len: n,
			x_rows: x.nrows(),
		});
	}
	// Assemble the design matrix, prepending an intercept column if requested.
	let n_terms = if options.fit_intercept {
		x.ncols() + 1
	} else {
		x.ncols()
	};
	if n <= n_terms {
		return Err(LinearError::InsufficientData {
			rows: n,
			cols: n_terms,
		});
	}
	let mut design = Array2::<f64>::zeros((n, n_terms));
	let offset = if options.fit_intercept {
		design.column_mut(0).fill(1.0);
		1
	} else {
		0
	};
	for (j, column) in x.axis_iter(Axis(1)).enumerate() {
		design.column_mut(offset + j).assign(&column);
	}
	let mut all_term_names = Vec::with_capacity(n_terms);
	if options.fit_intercept {
		all_term_names.push("(Intercept)".to_owned());
	}
	all_term_names.extend(term_names.iter().cloned());

	// Solve the normal equations (XᵀX)β = Xᵀy.
	let y_array = Array1::from(y.to_vec());
	let xtx = design.t().dot(&design);
	let xtx_inverse = invert(&xtx)?;
	let xty = design.t().dot(&y_array);
	let coefficients = xtx_inverse.dot(&xty);

	let fitted = design.dot(&coefficients);
	let residuals = &y_array - &fitted;
	let rss = residuals.iter().map(|r| r * r).sum::<f64>();
	let tss = if options.fit_intercept {
		let mean = y_array.sum() / n as f64;
		y_array.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
	} else {
		y_array.iter().map(|v| v * v).sum::<f64>()
	};
	let r_squared = 1.0 - rss / tss;
	let df_residual = (n - n_terms) as f64;
	let adj_r_squared = 1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / df_residual;
	let aic = n as f64 * (rss / n as f64).ln() + 2.0 * n_terms as f64;

	let (std_errors, t_values, p_values) = if options.compute_inference {
		let sigma_squared = rss / df_residual;
		let std_errors: Vec<f64> = (0..n_terms)
			.map(|j| (sigma_squared * xtx_inverse[[j, j]]).sqrt())
			.collect();
		let t_values: Vec<f64> = coefficients
			.iter()
			.zip(std_errors.iter())
			.map(|(coefficient, std_error)| coefficient / std_error)
			.collect();
		let t_distribution = StudentsT::new(0.0, 1.0, df_residual).ok();
		let p_values: Vec<f64> = t_values
			.iter()
			.map(|t| match &t_distribution {
				Some(distribution) => 2.0 * (1.0 - distribution.cdf(t.abs())),
				None => f64::NAN,
			})
			.collect();
		(Some(std_errors), Some(t_values), Some(p_values))
	} else {
		(None, None, None)
	};

	Ok(OlsModel {
		term_names: all_term_names,
		coefficients: coefficients.to_vec(),
		std_errors,
		t_values,
		p_values,
		r_squared,
		adj_r_squared,
		aic,
		fitted: fitted.to_vec(),
		residuals: residuals.to_vec(),
		n_observations: n,
	})
}

/// Invert a symmetric positive (semi-)definite matrix by Gauss-Jordan elimination with partial pivoting. A vanishing pivot means the matrix is singular, which for a normal-equations matrix means the predictors are perfectly collinear.
fn invert(matrix: &Array2<f64>) -> Result<Array2<f64>, LinearError> {
	let p = matrix.nrows();
	// Augment with the identity and reduce in place.
	let mut a = matrix.clone();
	let mut inverse = Array2::<f64>::eye(p);
	let scale = matrix
		.iter()
		.fold(0.0f64, |max, value| max.max(value.abs()))
		.max(1.0);
	for pivot in 0..p {
		let mut pivot_row = pivot;
		let mut pivot_value = a[[pivot, pivot]].abs();
		for row in pivot + 1..p {
			if a[[row, pivot]].abs() > pivot_value {
				pivot_row = row;
				pivot_value = a[[row, pivot]].abs();
			}
		}
		if pivot_value < 1e-12 * scale {
			return Err(LinearError::PerfectCollinearity);
		}
		if pivot_row != pivot {
			for col in 0..p {
				a.swap([pivot, col], [pivot_row, col]);
				inverse.swap([pivot, col], [pivot_row, col]);
			}
		}
		let divisor = a[[pivot, pivot]];
		for col in 0..p {
			a[[pivot, col]] /= divisor;
			inverse[[pivot, col]] /= divisor;
		}
		for row in 0..p {
			if row == pivot {
				continue;
			}
			let factor = a[[row, pivot]];
			if factor == 0.0 {
				continue;
			}
			for col in 0..p {
				a[[row, col]] -= factor * a[[pivot, col]];
				inverse[[row, col]] -= factor * inverse[[pivot, col]];
			}
		}
	}
	Ok(inverse)
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	#[test]
	fn test_simple_fit() {
		// y = 2x + 1
		let x = Array2::from_shape_vec((5, 1), vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
		let y = vec![3.0, 5.0, 7.0, 9.0, 11.0];
		let model = fit_ols(&y, x.view(), &["x".to_owned()], &OlsOptions::default()).unwrap();
		assert_abs_diff_eq!(model.coefficients[0], 1.0, epsilon = 1e-8);
		assert_abs_diff_eq!(model.coefficients[1], 2.0, epsilon = 1e-8);
		assert!(model.r_squared > 0.999);
	}

	#[test]
	fn test_residuals_sum_to_zero_with_intercept() {
		let x = Array2::from_shape_vec(
			(6, 2),
			vec![
				1.0, 3.0, 2.0, 1.0, 3.0, 4.0, 4.0, 2.0, 5.0, 8.0, 6.0, 3.0,
			],
		)
		.unwrap();
		let y = vec![2.5, 3.0, 9.0, 4.0, 16.0, 7.5];
		let names = vec!["a".to_owned(), "b".to_owned()];
		let model = fit_ols(&y, x.view(), &names, &OlsOptions::default()).unwrap();
		let residual_sum: f64 = model.residuals.iter().sum();
		assert_abs_diff_eq!(residual_sum, 0.0, epsilon = 1e-8);
	}

	#[test]
	fn test_inference_detects_strong_signal() {
		let x_values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
		let y: Vec<f64> = x_values.iter().map(|x| 2.0 * x + 0.05 * (x % 3.0)).collect();
		let x = Array2::from_shape_vec((10, 1), x_values).unwrap();
		let model = fit_ols(&y, x.view(), &["x".to_owned()], &OlsOptions::default()).unwrap();
		let p_values = model.p_values.unwrap();
		// the slope term
		assert!(p_values[1] < 0.05);
	}

	#[test]
	fn test_perfect_collinearity() {
		// the second column is twice the first
		let x = Array2::from_shape_vec(
			(5, 2),
			vec![1.0, 2.0, 2.0, 4.0, 3.0, 6.0, 4.0, 8.0, 5.0, 10.0],
		)
		.unwrap();
		let y = vec![1.0, 2.0, 3.0, 4.0, 5.0];
		let names = vec!["a".to_owned(), "b".to_owned()];
		let result = fit_ols(&y, x.view(), &names, &OlsOptions::default());
		assert!(matches!(result, Err(LinearError::PerfectCollinearity)));
	}

	#[test]
	fn test_insufficient_data() {
		let x = Array2::from_shape_vec((2, 1), vec![1.0, 2.0]).unwrap();
		let y = vec![1.0, 2.0];
		let result = fit_ols(&y, x.view(), &["x".to_owned()], &OlsOptions::default());
		assert!(matches!(result, Err(LinearError::InsufficientData { .. })));
	}
}
