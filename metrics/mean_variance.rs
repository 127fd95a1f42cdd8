//! https://en.wikipedia.org/wiki/Algorithms_for_calculating_variance#Parallel_algorithm

use super::StreamingMetric;
use num_traits::ToPrimitive;

/// Combine two separate means and m2 values into a single mean and m2. This is what makes the computation mergeable across threads.
pub fn merge_mean_m2(
	n_a: u64,
	mean_a: f64,
	m2_a: f64,
	n_b: u64,
	mean_b: f64,
	m2_b: f64,
) -> (f64, f64) {
	let n_a = n_a.to_f64().unwrap();
	let n_b = n_b.to_f64().unwrap();
	(
		(((n_a * mean_a) + (n_b * mean_b)) / (n_a + n_b)),
		m2_a + m2_b + (mean_b - mean_a) * (mean_b - mean_a) * (n_a * n_b / (n_a + n_b)),
	)
}

pub fn m2_to_variance(m2: f64, n: u64) -> f64 {
	m2 / n.to_f64().unwrap()
}

/// A streaming mean and variance computed with Welford's algorithm.
#[derive(Clone, Debug, Default)]
pub struct MeanVariance {
	pub n: u64,
	pub mean: f64,
	pub m2: f64,
}

#[derive(Clone, Debug)]
pub struct MeanVarianceOutput {
	pub n: u64,
	pub mean: f64,
	/// The population variance, m2 / n.
	pub variance: f64,
	/// The sample variance, m2 / (n - 1). `None` when fewer than two values were observed, in which case the sample variance is undefined.
	pub sample_variance: Option<f64>,
}

impl MeanVariance {
	pub fn compute(values: impl IntoIterator<Item = f64>) -> MeanVarianceOutput {
		let mut mean_variance = MeanVariance::default();
		for value in values {
			mean_variance.update(value);
		}
		mean_variance.finalize()
	}
}

impl<'a> StreamingMetric<'a> for MeanVariance {
	type Input = f64;
	type Output = MeanVarianceOutput;

	fn update(&mut self, input: Self::Input) {
		if self.n == 0 {
			self.n = 1;
			self.mean = input;
			self.m2 = 0.0;
		} else {
			let (mean, m2) = merge_mean_m2(self.n, self.mean, self.m2, 1, input, 0.0);
			self.n += 1;
			self.mean = mean;
			self.m2 = m2;
		}
	}

	fn merge(&mut self, other: Self) {
		if other.n == 0 {
			return;
		}
		if self.n == 0 {
			*self = other;
			return;
		}
		let (mean, m2) = merge_mean_m2(self.n, self.mean, self.m2, other.n, other.mean, other.m2);
		self.mean = mean;
		self.m2 = m2;
		self.n += other.n;
	}

	fn finalize(self) -> Self::Output {
		let variance = if self.n == 0 {
			f64::NAN
		} else {
			m2_to_variance(self.m2, self.n)
		};
		let sample_variance = if self.n >= 2 {
			Some(self.m2 / (self.n - 1).to_f64().unwrap())
		} else {
			None
		};
		MeanVarianceOutput {
			n: self.n,
			mean: if self.n == 0 { f64::NAN } else { self.mean },
			variance,
			sample_variance,
		}
	}
}

#[test]
fn test_mean_variance() {
	use approx::assert_abs_diff_eq;
	let output = MeanVariance::compute(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
	assert_eq!(output.n, 8);
	assert_abs_diff_eq!(output.mean, 5.0, epsilon = 1e-12);
	assert_abs_diff_eq!(output.variance, 4.0, epsilon = 1e-12);
	assert_abs_diff_eq!(output.sample_variance.unwrap(), 32.0 / 7.0, epsilon = 1e-12);
}

#[test]
fn test_merge_matches_sequential() {
	use approx::assert_abs_diff_eq;
	let values = vec![1.5, 2.5, 3.5, 10.0, -4.0, 0.25];
	let sequential = MeanVariance::compute(values.clone());
	let mut a = MeanVariance::default();
	let mut b = MeanVariance::default();
	for value in &values[..3] {
		a.update(*value);
	}
	for value in &values[3..] {
		b.update(*value);
	}
	a.merge(b);
	let merged = a.finalize();
	assert_abs_diff_eq!(merged.mean, sequential.mean, epsilon = 1e-12);
	assert_abs_diff_eq!(merged.variance, sequential.variance, epsilon = 1e-12);
}

#[test]
fn test_single_value_has_no_sample_variance() {
	let output = MeanVariance::compute(vec![3.0]);
	assert_eq!(output.n, 1);
	assert!(output.sample_variance.is_none());
}
