/*!
This crate implements ordinary least squares regression with inference statistics (standard errors, t statistics, p-values), the AIC, variance-inflation factors for collinearity diagnosis, and residual/quantile-quantile diagnostic data.
*/

mod diagnostics;
mod ols;
mod vif;

pub use self::diagnostics::{qq_points, QqPoint};
pub use self::ols::{fit_ols, OlsModel, OlsOptions};
pub use self::vif::compute_vif;

#[derive(Debug, thiserror::Error)]
pub enum LinearError {
	#[error("insufficient data: {rows} rows for {cols} coefficients (need rows > coefficients)")]
	InsufficientData { rows: usize, cols: usize },

	#[error("dimension mismatch: y has {y_len} values, x has {x_rows} rows")]
	DimensionMismatch { y_len: usize, x_rows: usize },

	#[error("the predictors are perfectly collinear, so the coefficients are undefined")]
	PerfectCollinearity,

	#[error("empty input: {field} cannot be empty")]
	EmptyInput { field: &'static str },
}
