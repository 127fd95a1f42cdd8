use super::{merge_mean_m2, StreamingMetric};
use num_traits::ToPrimitive;

/// Streaming regression metrics: MSE, RMSE, MAE, and R². The variance of the labels is tracked so that R² and the baseline (predict-the-mean) errors can be computed in the same pass.
#[derive(Default)]
pub struct RegressionMetrics {
	mean_variance: Option<LabelMeanVariance>,
	absolute_error: f64,
	squared_error: f64,
}

#[derive(Debug)]
struct LabelMeanVariance {
	n: u64,
	mean: f64,
	m2: f64,
}

pub struct RegressionMetricsInput<'a> {
	pub predictions: &'a [f64],
	pub labels: &'a [f64],
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct RegressionMetricsOutput {
	pub mse: f64,
	pub rmse: f64,
	pub mae: f64,
	pub r2: f64,
	pub baseline_mse: f64,
	pub baseline_rmse: f64,
}

impl<'a> StreamingMetric<'a> for RegressionMetrics {
	type Input = RegressionMetricsInput<'a>;
	type Output = RegressionMetricsOutput;

	fn update(&mut self, input: RegressionMetricsInput) {
		let RegressionMetricsInput {
			predictions,
			labels,
		} = input;
		for (prediction, label) in predictions.iter().zip(labels.iter()) {
			match &mut self.mean_variance {
				Some(mean_variance) => {
					let (mean, m2) = merge_mean_m2(
						mean_variance.n,
						mean_variance.mean,
						mean_variance.m2,
						1,
						*label,
						0.0,
					);
					mean_variance.n += 1;
					mean_variance.mean = mean;
					mean_variance.m2 = m2;
				}
				None => {
					self.mean_variance = Some(LabelMeanVariance {
						n: 1,
						mean: *label,
						m2: 0.0,
					})
				}
			}
			let error = prediction - label;
			self.absolute_error += error.abs();
			self.squared_error += error * error;
		}
	}

	fn merge(&mut self, other: Self) {
		match &mut self.mean_variance {
			Some(mean_variance) => {
				if let Some(other) = other.mean_variance {
					let (mean, m2) = merge_mean_m2(
						mean_variance.n,
						mean_variance.mean,
						mean_variance.m2,
						other.n,
						other.mean,
						other.m2,
					);
					mean_variance.mean = mean;
					mean_variance.m2 = m2;
					mean_variance.n += other.n;
				}
			}
			None => {
				self.mean_variance = other.mean_variance;
			}
		}
		self.absolute_error += other.absolute_error;
		self.squared_error += other.squared_error;
	}

	fn finalize(self) -> Self::Output {
		let (n, variance) = match self.mean_variance {
			Some(m) => (m.n.to_f64().unwrap(), m.m2 / m.n.to_f64().unwrap()),
			None => (0.0, f64::NAN),
		};
		let mae = self.absolute_error / n;
		let mse = self.squared_error / n;
		let rmse = mse.sqrt();
		let r2 = 1.0 - self.squared_error / (variance * n);
		let baseline_mse = variance;
		let baseline_rmse = baseline_mse.sqrt();
		RegressionMetricsOutput {
			mae,
			mse,
			rmse,
			r2,
			baseline_mse,
			baseline_rmse,
		}
	}
}

#[test]
fn test_regression_metrics() {
	use approx::assert_abs_diff_eq;
	let mut metrics = RegressionMetrics::default();
	metrics.update(RegressionMetricsInput {
		predictions: &[1.0, 2.0, 3.0, 4.0],
		labels: &[2.0, 2.0, 4.0, 4.0],
	});
	let output = metrics.finalize();
	assert_abs_diff_eq!(output.mae, 0.5);
	assert_abs_diff_eq!(output.mse, 0.5);
	assert_abs_diff_eq!(output.rmse, 0.5f64.sqrt(), epsilon = 1e-12);
	// label variance is 1.0, so r2 = 1 - 2.0 / 4.0
	assert_abs_diff_eq!(output.r2, 0.5, epsilon = 1e-12);
}

#[test]
fn test_perfect_predictions() {
	let mut metrics = RegressionMetrics::default();
	metrics.update(RegressionMetricsInput {
		predictions: &[1.0, 2.0, 3.0],
		labels: &[1.0, 2.0, 3.0],
	});
	let output = metrics.finalize();
	assert_eq!(output.mse, 0.0);
	assert_eq!(output.r2, 1.0);
}
