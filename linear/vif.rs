use crate::ols::{fit_ols, OlsOptions};
use crate::LinearError;
use ndarray::prelude::*;

/**
Compute the variance inflation factor for each column of `x`.

Each column is regressed on all of the others and the VIF is `1 / (1 - R²)` of that auxiliary regression. A column that the others predict perfectly gets `f64::INFINITY`.
*/
pub fn compute_vif(x: ArrayView2<f64>) -> Result<Vec<f64>, LinearError> {
	let n_cols = x.ncols();
	if n_cols == 0 {
		return Err(LinearError::EmptyInput { field: "x" });
	}
	if n_cols == 1 {
		return Ok(vec![1.0]);
	}
	let options = OlsOptions {
		fit_intercept: true,
		compute_inference: false,
	};
	let mut vifs = Vec::with_capacity(n_cols);
	for target_index in 0..n_cols {
		let y: Vec<f64> = x.column(target_index).to_vec();
		let mut others = Array2::<f64>::zeros((x.nrows(), n_cols - 1));
		let mut other_index = 0;
		for col_index in 0..n_cols {
			if col_index == target_index {
				continue;
			}
			others.column_mut(other_index).assign(&x.column(col_index));
			other_index += 1;
		}
		let names: Vec<String> = (0..n_cols - 1).map(|i| format!("x{}", i)).collect();
		let vif = match fit_ols(&y, others.view(), &names, &options) {
			Ok(model) if model.r_squared >= 0.9999 => f64::INFINITY,
			Ok(model) => 1.0 / (1.0 - model.r_squared),
			Err(LinearError::PerfectCollinearity) => f64::INFINITY,
			Err(error) => return Err(error),
		};
		vifs.push(vif);
	}
	Ok(vifs)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_independent_columns_have_low_vif() {
		let x = Array2::from_shape_vec(
			(6, 2),
			vec![
				1.0, 5.0, 2.0, 1.0, 3.0, 4.0, 4.0, 2.0, 5.0, 6.0, 6.0, 3.0,
			],
		)
		.unwrap();
		let vifs = compute_vif(x.view()).unwrap();
		assert_eq!(vifs.len(), 2);
		for vif in vifs {
			assert!(vif >= 1.0);
			assert!(vif < 5.0);
		}
	}

	#[test]
	fn test_collinear_columns_have_infinite_vif() {
		let x = Array2::from_shape_vec(
			(5, 2),
			vec![1.0, 2.0, 2.0, 4.0, 3.0, 6.0, 4.0, 8.0, 5.0, 10.0],
		)
		.unwrap();
		let vifs = compute_vif(x.view()).unwrap();
		assert!(vifs[0].is_infinite());
		assert!(vifs[1].is_infinite());
	}

	#[test]
	fn test_single_column() {
		let x = Array2::from_shape_vec((3, 1), vec![1.0, 2.0, 3.0]).unwrap();
		let vifs = compute_vif(x.view()).unwrap();
		assert_eq!(vifs, vec![1.0]);
	}
}
