use crate::config::Config;
use crate::prepare::AnalysisDataset;
use anyhow::{bail, Result};
use ndarray::prelude::*;
use oncorisk_features::{
	compute_features, FeatureColumn, FeatureGroup, NormalizedFeatureGroup,
	OneHotEncodedFeatureGroup,
};
use oncorisk_metrics::{
	RegressionMetrics, RegressionMetricsInput, RegressionMetricsOutput, StreamingMetric,
};
use oncorisk_tree::{compute_feature_importances, Regressor, TrainOptions};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;

/// The stages of the ML pipeline, in order. Errors from the pipeline name the stage they occurred in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
pub enum Stage {
	Split,
	Preprocess,
	Tune,
	SelectBest,
	Refit,
	Evaluate,
}

impl std::fmt::Display for Stage {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let name = match self {
			Stage::Split => "split",
			Stage::Preprocess => "preprocess",
			Stage::Tune => "tune",
			Stage::SelectBest => "select best",
			Stage::Refit => "refit",
			Stage::Evaluate => "evaluate",
		};
		write!(f, "{}", name)
	}
}

/// One hyperparameter combination drawn by the random search.
#[derive(Clone, Debug, serde::Serialize)]
pub struct TrialParams {
	pub max_depth: usize,
	pub learning_rate: f64,
	pub min_gain_to_split: f64,
	pub max_features: usize,
	pub subsample: f64,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct TrialResult {
	pub params: TrialParams,
	/// The RMSE averaged over the cross validation folds. This is what selection ranks by.
	pub mean_rmse: f64,
	/// The R² averaged over the cross validation folds.
	pub mean_r2: f64,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct FeatureImportance {
	pub feature_name: String,
	pub importance: f64,
}

/// Everything the ML pipeline produced: the split, every trial with its cross validated RMSE, the selected trial, the held-out test metrics, and the top feature importances of the refit model.
#[derive(Clone, Debug, serde::Serialize)]
pub struct PipelineReport {
	pub n_train: usize,
	pub n_test: usize,
	pub train_indices: Vec<usize>,
	pub test_indices: Vec<usize>,
	pub feature_names: Vec<String>,
	pub trials: Vec<TrialResult>,
	pub best_trial_index: usize,
	pub test_metrics: RegressionMetricsOutput,
	/// The top feature importances of the refit model, sorted descending, at most ten.
	pub feature_importances: Vec<FeatureImportance>,
}

/**
Run the full ML pipeline on a prepared dataset.

The pipeline shuffles the rows with the configured seed and holds out a test partition, fits the preprocessing on the training partition only, runs a random hyperparameter search where each trial is scored by k-fold cross validation on the training partition, refits the best trial on the whole training partition, and evaluates that one model on the test partition.

Results are deterministic for a given dataset and config: each trial trains with a seed derived from the run seed and the trial index, so the parallel search produces the same result as a sequential one.
*/
pub fn run_pipeline(dataset: &AnalysisDataset, config: &Config) -> Result<PipelineReport> {
	// Split.
	let n_rows = dataset.n_rows();
	let mut rng = Xoshiro256Plus::seed_from_u64(config.seed);
	let mut indices: Vec<usize> = (0..n_rows).collect();
	indices.shuffle(&mut rng);
	let n_test = (n_rows as f64 * config.test_fraction).round() as usize;
	if n_test == 0 || n_test >= n_rows {
		bail!(
			"the {} stage failed: {} rows cannot be split with test fraction {}",
			Stage::Split,
			n_rows,
			config.test_fraction,
		);
	}
	let test_indices = indices[..n_test].to_vec();
	let train_indices = indices[n_test..].to_vec();
	let n_train = train_indices.len();
	if config.cv_folds < 2 || config.cv_folds > n_train {
		bail!(
			"the {} stage failed: cannot cross validate {} training rows with {} folds",
			Stage::Split,
			n_train,
			config.cv_folds,
		);
	}

	// Preprocess. The recipe is fit on the training partition only and then applied to both partitions.
	let train_bmi = gather(&dataset.bmi, &train_indices);
	let train_smokers = gather(&dataset.smokers_percent, &train_indices);
	let train_continent = gather(&dataset.continent, &train_indices);
	let train_labels = gather(&dataset.prostate_deaths, &train_indices);
	let test_bmi = gather(&dataset.bmi, &test_indices);
	let test_smokers = gather(&dataset.smokers_percent, &test_indices);
	let test_continent = gather(&dataset.continent, &test_indices);
	let test_labels = gather(&dataset.prostate_deaths, &test_indices);
	let mut feature_groups = Vec::new();
	let mut train_columns = Vec::new();
	let mut test_columns = Vec::new();
	let number_columns: [(&str, &[f64], &[f64]); 2] = [
		("bmi", &train_bmi, &test_bmi),
		("smokers_percent", &train_smokers, &test_smokers),
	];
	for (name, train_values, test_values) in number_columns {
		let feature_group = NormalizedFeatureGroup::fit(name.to_owned(), train_values);
		// A zero variance predictor carries no information and would normalize to a constant.
		if feature_group.variance == 0.0 {
			log::warn!("dropping zero variance predictor \"{}\"", name);
			continue;
		}
		feature_groups.push(FeatureGroup::Normalized(feature_group));
		train_columns.push(FeatureColumn::Number(train_values));
		test_columns.push(FeatureColumn::Number(test_values));
	}
	feature_groups.push(FeatureGroup::OneHotEncoded(OneHotEncodedFeatureGroup::fit(
		"continent".to_owned(),
		&dataset.continent_options,
		&train_continent,
	)));
	train_columns.push(FeatureColumn::Enum(&train_continent));
	test_columns.push(FeatureColumn::Enum(&test_continent));
	let feature_names: Vec<String> = feature_groups
		.iter()
		.flat_map(|feature_group| feature_group.feature_names())
		.collect();
	let n_features = feature_names.len();
	if n_features == 0 {
		bail!("the {} stage failed: no features", Stage::Preprocess);
	}
	let train_features = compute_features(&feature_groups, &train_columns, n_train);
	let test_features = compute_features(&feature_groups, &test_columns, n_test);

	// Tune. Draw every trial's params up front so the rng state does not depend on the parallel schedule.
	if config.search_trials == 0 {
		bail!(
			"the {} stage failed: at least one search trial is required",
			Stage::Tune,
		);
	}
	let trial_params: Vec<TrialParams> = (0..config.search_trials)
		.map(|_| sample_trial_params(&mut rng, n_features))
		.collect();
	let folds = assign_folds(n_train, config.cv_folds, &mut rng);
	let trials: Vec<TrialResult> = trial_params
		.into_par_iter()
		.enumerate()
		.map(|(trial_index, params)| {
			let seed = derive_seed(config.seed, trial_index);
			let (mean_rmse, mean_r2) =
				cross_validate(train_features.view(), &train_labels, &folds, &params, config, seed)?;
			Ok(TrialResult {
				params,
				mean_rmse,
				mean_r2,
			})
		})
		.collect::<Result<Vec<_>>>()?;

	// Select the best trial, strictly by lowest mean RMSE, so the earliest trial wins ties.
	let mut best_trial_index: Option<usize> = None;
	for (trial_index, trial) in trials.iter().enumerate() {
		if !trial.mean_rmse.is_finite() {
			continue;
		}
		match best_trial_index {
			Some(best) if trials[best].mean_rmse <= trial.mean_rmse => {}
			_ => best_trial_index = Some(trial_index),
		}
	}
	let best_trial_index = match best_trial_index {
		Some(index) => index,
		None => bail!(
			"the {} stage failed: no trial produced a finite validation RMSE",
			Stage::SelectBest,
		),
	};

	// Refit the selected params on the whole training partition.
	let best_params = &trials[best_trial_index].params;
	let regressor = train_regressor(
		train_features.view(),
		&train_labels,
		best_params,
		config,
		config.seed,
	)
	.map_err(|error| {
		anyhow::format_err!("the {} stage failed: {}", Stage::Refit, error)
	})?;

	// Evaluate once on the held-out test partition.
	let predictions = regressor.predict(test_features.view());
	let mut metrics = RegressionMetrics::default();
	metrics.update(RegressionMetricsInput {
		predictions: &predictions,
		labels: &test_labels,
	});
	let test_metrics = metrics.finalize();

	let mut feature_importances: Vec<FeatureImportance> =
		compute_feature_importances(&regressor)
			.into_iter()
			.zip(feature_names.iter())
			.map(|(importance, feature_name)| FeatureImportance {
				feature_name: feature_name.clone(),
				importance,
			})
			.collect();
	feature_importances.sort_by(|a, b| {
		b.importance
			.partial_cmp(&a.importance)
			.unwrap_or(std::cmp::Ordering::Equal)
	});
	feature_importances.truncate(10);

	Ok(PipelineReport {
		n_train,
		n_test,
		train_indices,
		test_indices,
		feature_names,
		trials,
		best_trial_index,
		test_metrics,
		feature_importances,
	})
}

fn sample_trial_params(rng: &mut Xoshiro256Plus, n_features: usize) -> TrialParams {
	TrialParams {
		max_depth: rng.gen_range(2..=8),
		// Log-uniform between 0.01 and about 0.32.
		learning_rate: 10.0f64.powf(rng.gen_range(-2.0..-0.5)),
		min_gain_to_split: rng.gen_range(0.0..16.0),
		max_features: rng.gen_range(1..=n_features),
		subsample: rng.gen_range(0.5..1.0),
	}
}

/// Assign each training row to a cross validation fold. The first `n % k` folds get one extra row.
fn assign_folds(n_train: usize, cv_folds: usize, rng: &mut Xoshiro256Plus) -> Vec<Vec<usize>> {
	let mut order: Vec<usize> = (0..n_train).collect();
	order.shuffle(rng);
	let base = n_train / cv_folds;
	let remainder = n_train % cv_folds;
	let mut folds = Vec::with_capacity(cv_folds);
	let mut start = 0;
	for fold_index in 0..cv_folds {
		let size = base + if fold_index < remainder { 1 } else { 0 };
		folds.push(order[start..start + size].to_vec());
		start += size;
	}
	folds
}

fn derive_seed(seed: u64, trial_index: usize) -> u64 {
	seed ^ (trial_index as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

/// Score one hyperparameter combination by k-fold cross validation, returning the mean validation RMSE and R².
fn cross_validate(
	features: ArrayView2<f64>,
	labels: &[f64],
	folds: &[Vec<usize>],
	params: &TrialParams,
	config: &Config,
	seed: u64,
) -> Result<(f64, f64)> {
	let mut rmse_sum = 0.0;
	let mut r2_sum = 0.0;
	for (fold_index, validation_rows) in folds.iter().enumerate() {
		let train_rows: Vec<usize> = folds
			.iter()
			.enumerate()
			.filter(|(other_index, _)| *other_index != fold_index)
			.flat_map(|(_, fold)| fold.iter().cloned())
			.collect();
		let fold_features = features.select(Axis(0), &train_rows);
		let fold_labels = gather(labels, &train_rows);
		let regressor = train_regressor(
			fold_features.view(),
			&fold_labels,
			params,
			config,
			seed.wrapping_add(fold_index as u64),
		)
		.map_err(|error| {
			anyhow::format_err!("the {} stage failed: {}", Stage::Tune, error)
		})?;
		let validation_features = features.select(Axis(0), validation_rows);
		let validation_labels = gather(labels, validation_rows);
		let predictions = regressor.predict(validation_features.view());
		let mut metrics = RegressionMetrics::default();
		metrics.update(RegressionMetricsInput {
			predictions: &predictions,
			labels: &validation_labels,
		});
		let output = metrics.finalize();
		rmse_sum += output.rmse;
		r2_sum += output.r2;
	}
	let k = folds.len() as f64;
	Ok((rmse_sum / k, r2_sum / k))
}

fn train_regressor(
	features: ArrayView2<f64>,
	labels: &[f64],
	params: &TrialParams,
	config: &Config,
	seed: u64,
) -> Result<Regressor, oncorisk_tree::TreeError> {
	let options = TrainOptions {
		max_rounds: config.max_rounds,
		max_depth: params.max_depth,
		learning_rate: params.learning_rate,
		min_gain_to_split: params.min_gain_to_split,
		min_examples_per_node: 2,
		max_features: Some(params.max_features),
		subsample: params.subsample,
		seed,
	};
	Regressor::train(features, labels, &options)
}

fn gather<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
	indices.iter().map(|index| values[*index].clone()).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::prepare::AnalysisDataset;
	use std::num::NonZeroUsize;

	fn synthetic_dataset(n: usize) -> AnalysisDataset {
		let continents = ["Africa", "Asia", "Europe"];
		let mut bmi = Vec::with_capacity(n);
		let mut smokers = Vec::with_capacity(n);
		let mut continent = Vec::with_capacity(n);
		let mut deaths = Vec::with_capacity(n);
		for i in 0..n {
			let b = 20.0 + (i % 13) as f64;
			let s = 5.0 + ((i * 7) % 31) as f64;
			let c = i % continents.len();
			bmi.push(b);
			smokers.push(s);
			continent.push(NonZeroUsize::new(c + 1));
			deaths.push(200.0 * b + 40.0 * s + 1000.0 * c as f64 + (i % 5) as f64);
		}
		AnalysisDataset {
			year: 2008,
			country: (0..n).map(|i| format!("country {}", i)).collect(),
			continent_options: continents.iter().map(|c| c.to_string()).collect(),
			continent,
			bmi,
			smokers_percent: smokers,
			prostate_deaths: deaths,
			n_source_rows: n,
			n_year_rows: n,
			n_dropped_rows: 0,
		}
	}

	fn test_config() -> Config {
		Config {
			search_trials: 4,
			cv_folds: 3,
			max_rounds: 40,
			..Config::default()
		}
	}

	#[test]
	fn test_split_sizes_and_disjointness() {
		let dataset = synthetic_dataset(50);
		let report = run_pipeline(&dataset, &test_config()).unwrap();
		assert_eq!(report.n_test, 10);
		assert_eq!(report.n_train, 40);
		let mut all: Vec<usize> = report
			.train_indices
			.iter()
			.chain(report.test_indices.iter())
			.cloned()
			.collect();
		all.sort_unstable();
		assert_eq!(all, (0..50).collect::<Vec<usize>>());
	}

	#[test]
	fn test_deterministic_for_seed() {
		let dataset = synthetic_dataset(50);
		let config = test_config();
		let report_a = run_pipeline(&dataset, &config).unwrap();
		let report_b = run_pipeline(&dataset, &config).unwrap();
		assert_eq!(report_a.train_indices, report_b.train_indices);
		assert_eq!(report_a.best_trial_index, report_b.best_trial_index);
		assert_eq!(report_a.test_metrics.rmse, report_b.test_metrics.rmse);
		let rmses_a: Vec<f64> = report_a.trials.iter().map(|t| t.mean_rmse).collect();
		let rmses_b: Vec<f64> = report_b.trials.iter().map(|t| t.mean_rmse).collect();
		assert_eq!(rmses_a, rmses_b);
	}

	#[test]
	fn test_best_trial_has_lowest_rmse() {
		let dataset = synthetic_dataset(50);
		let report = run_pipeline(&dataset, &test_config()).unwrap();
		let best_rmse = report.trials[report.best_trial_index].mean_rmse;
		for trial in report.trials.iter() {
			if trial.mean_rmse.is_finite() {
				assert!(best_rmse <= trial.mean_rmse);
			}
		}
	}

	#[test]
	fn test_zero_trials_fails_in_tune() {
		let dataset = synthetic_dataset(50);
		let config = Config {
			search_trials: 0,
			..test_config()
		};
		let error = run_pipeline(&dataset, &config).unwrap_err();
		assert!(error.to_string().contains("tune"));
	}

	#[test]
	fn test_importances_are_sorted_and_capped() {
		let dataset = synthetic_dataset(50);
		let report = run_pipeline(&dataset, &test_config()).unwrap();
		assert!(report.feature_importances.len() <= 10);
		for window in report.feature_importances.windows(2) {
			assert!(window[0].importance >= window[1].importance);
		}
	}

	#[test]
	fn test_too_few_rows_fails_in_split() {
		let dataset = synthetic_dataset(2);
		let error = run_pipeline(&dataset, &test_config()).unwrap_err();
		assert!(error.to_string().contains("split"));
	}
}
