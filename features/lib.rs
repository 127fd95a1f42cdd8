/*!
This crate implements the feature engineering used by the oncorisk ML pipeline. A [`FeatureGroup`](enum.FeatureGroup.html) describes how to transform one column from the input data into one or more columns in the output feature matrix. Parameters are fitted from the training partition only and then applied unchanged to any partition.
*/

use itertools::izip;
use ndarray::prelude::*;
use oncorisk_metrics::MeanVariance;
use std::num::NonZeroUsize;

#[derive(Clone, Debug)]
pub enum FeatureGroup {
	Normalized(NormalizedFeatureGroup),
	OneHotEncoded(OneHotEncodedFeatureGroup),
}

/// A `NormalizedFeatureGroup` transforms a number column to zero mean and unit variance, `feature_value = (value - mean) / std`. Missing values and zero-variance columns map to 0.0.
#[derive(Clone, Debug)]
pub struct NormalizedFeatureGroup {
	pub source_column_name: String,
	pub mean: f64,
	pub variance: f64,
}

/// A `OneHotEncodedFeatureGroup` creates one indicator feature per option of a categorical column. Options never observed while fitting are dropped, because their indicator would have zero variance.
#[derive(Clone, Debug)]
pub struct OneHotEncodedFeatureGroup {
	pub source_column_name: String,
	/// The options kept after fitting.
	pub options: Vec<String>,
	/// The zero-based index into the source column's full option list for each kept option.
	pub option_indices: Vec<usize>,
}

/// One column of input data for feature computation.
pub enum FeatureColumn<'a> {
	Number(&'a [f64]),
	Enum(&'a [Option<NonZeroUsize>]),
}

impl NormalizedFeatureGroup {
	pub fn fit(source_column_name: String, values: &[f64]) -> Self {
		let mean_variance = MeanVariance::compute(values.iter().cloned().filter(|v| !v.is_nan()));
		Self {
			source_column_name,
			mean: mean_variance.mean,
			variance: mean_variance.variance,
		}
	}

	pub fn compute_array_f64(&self, mut features: ArrayViewMut2<f64>, values: &[f64]) {
		// Set the feature values to the normalized source column values.
		for (feature, value) in izip!(features.iter_mut(), values.iter()) {
			*feature = if value.is_nan() || self.variance == 0.0 {
				0.0
			} else {
				(*value - self.mean) / f64::sqrt(self.variance)
			};
		}
	}
}

impl OneHotEncodedFeatureGroup {
	pub fn fit(
		source_column_name: String,
		options: &[String],
		values: &[Option<NonZeroUsize>],
	) -> Self {
		let mut counts = vec![0usize; options.len()];
		for value in values.iter().flatten() {
			counts[value.get() - 1] += 1;
		}
		let mut kept_options = Vec::new();
		let mut option_indices = Vec::new();
		for (index, (option, count)) in izip!(options.iter(), counts.iter()).enumerate() {
			if *count > 0 {
				kept_options.push(option.clone());
				option_indices.push(index);
			}
		}
		Self {
			source_column_name,
			options: kept_options,
			option_indices,
		}
	}

	/// Return one name per produced feature, e.g. `continent=Europe`.
	pub fn feature_names(&self) -> Vec<String> {
		self.options
			.iter()
			.map(|option| format!("{}={}", self.source_column_name, option))
			.collect()
	}

	pub fn compute_array_f64(
		&self,
		mut features: ArrayViewMut2<f64>,
		values: &[Option<NonZeroUsize>],
	) {
		features.fill(0.0);
		for (mut features, value) in izip!(features.axis_iter_mut(Axis(0)), values.iter()) {
			if let Some(value) = value {
				if let Some(position) = self
					.option_indices
					.iter()
					.position(|index| *index == value.get() - 1)
				{
					features[position] = 1.0;
				}
			}
		}
	}
}

impl FeatureGroup {
	/// Return the number of features this feature group will produce.
	pub fn n_features(&self) -> usize {
		match self {
			FeatureGroup::Normalized(_) => 1,
			FeatureGroup::OneHotEncoded(s) => s.options.len(),
		}
	}

	/// Return one name per produced feature, e.g. `bmi` or `continent=Europe`.
	pub fn feature_names(&self) -> Vec<String> {
		match self {
			FeatureGroup::Normalized(s) => vec![s.source_column_name.clone()],
			FeatureGroup::OneHotEncoded(s) => s
				.options
				.iter()
				.map(|option| format!("{}={}", s.source_column_name, option))
				.collect(),
		}
	}
}

/// Compute the feature matrix for a set of feature groups. `columns[i]` must be the source column for `feature_groups[i]`.
pub fn compute_features(
	feature_groups: &[FeatureGroup],
	columns: &[FeatureColumn],
	n_rows: usize,
) -> Array2<f64> {
	let n_features = feature_groups
		.iter()
		.map(|feature_group| feature_group.n_features())
		.sum::<usize>();
	let mut features = Array2::zeros((n_rows, n_features));
	let mut feature_index = 0;
	for (feature_group, column) in izip!(feature_groups.iter(), columns.iter()) {
		let n = feature_group.n_features();
		let slice = features.slice_mut(s![.., feature_index..feature_index + n]);
		match (feature_group, column) {
			(FeatureGroup::Normalized(feature_group), FeatureColumn::Number(values)) => {
				feature_group.compute_array_f64(slice, values);
			}
			(FeatureGroup::OneHotEncoded(feature_group), FeatureColumn::Enum(values)) => {
				feature_group.compute_array_f64(slice, values);
			}
			_ => unreachable!(),
		}
		feature_index += n;
	}
	features
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	#[test]
	fn test_normalized() {
		let values = vec![0.0, 2.0, 4.0, 6.0];
		let feature_group = NormalizedFeatureGroup::fit("x".to_owned(), &values);
		assert_abs_diff_eq!(feature_group.mean, 3.0, epsilon = 1e-12);
		assert_abs_diff_eq!(feature_group.variance, 5.0, epsilon = 1e-12);
		let mut features = Array2::zeros((4, 1));
		feature_group.compute_array_f64(features.view_mut(), &values);
		assert_abs_diff_eq!(features[[0, 0]], -3.0 / 5.0f64.sqrt(), epsilon = 1e-12);
		assert_abs_diff_eq!(features[[3, 0]], 3.0 / 5.0f64.sqrt(), epsilon = 1e-12);
	}

	#[test]
	fn test_one_hot_drops_unseen_options() {
		let options = vec!["Africa".to_owned(), "Asia".to_owned(), "Europe".to_owned()];
		let values = vec![
			NonZeroUsize::new(1),
			NonZeroUsize::new(3),
			NonZeroUsize::new(3),
		];
		let feature_group = OneHotEncodedFeatureGroup::fit("continent".to_owned(), &options, &values);
		// "Asia" never occurs, so its indicator is dropped.
		assert_eq!(feature_group.options, vec!["Africa".to_owned(), "Europe".to_owned()]);
		assert_eq!(
			feature_group.feature_names(),
			vec!["continent=Africa".to_owned(), "continent=Europe".to_owned()]
		);
		let mut features = Array2::zeros((3, 2));
		feature_group.compute_array_f64(features.view_mut(), &values);
		assert_eq!(features.row(0).to_vec(), vec![1.0, 0.0]);
		assert_eq!(features.row(1).to_vec(), vec![0.0, 1.0]);
	}

	#[test]
	fn test_compute_features() {
		let bmi = vec![20.0, 30.0];
		let codes = vec![NonZeroUsize::new(1), NonZeroUsize::new(2)];
		let options = vec!["Africa".to_owned(), "Europe".to_owned()];
		let feature_groups = vec![
			FeatureGroup::Normalized(NormalizedFeatureGroup::fit("bmi".to_owned(), &bmi)),
			FeatureGroup::OneHotEncoded(OneHotEncodedFeatureGroup::fit(
				"continent".to_owned(),
				&options,
				&codes,
			)),
		];
		let columns = vec![FeatureColumn::Number(&bmi), FeatureColumn::Enum(&codes)];
		let features = compute_features(&feature_groups, &columns, 2);
		assert_eq!(features.dim(), (2, 3));
		assert_abs_diff_eq!(features[[0, 0]], -1.0);
		assert_eq!(features[[0, 1]], 1.0);
		assert_eq!(features[[1, 2]], 1.0);
	}
}
