use crate::prepare::AnalysisDataset;
use anyhow::{Context, Result};
use ndarray::prelude::*;
use oncorisk_linear::{compute_vif, fit_ols, qq_points, OlsModel, OlsOptions, QqPoint};

/// An ordinary least squares analysis of the death counts: the fitted model with inference statistics, collinearity diagnostics for each predictor, and quantile-quantile data for the residuals.
#[derive(Clone, Debug, serde::Serialize)]
pub struct LinearAnalysis {
	pub model: OlsModel,
	pub vif: Vec<VifEntry>,
	pub qq: Vec<QqPoint>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct VifEntry {
	pub term: String,
	pub vif: f64,
}

/**
Regress the death counts on bmi, the smoking rate, and continent indicators.

The continent enters as dummy variables against a reference level, which is the first option in the sorted option list. Predictors are left on their original scale so the coefficients read in natural units.
*/
pub fn analyze(dataset: &AnalysisDataset) -> Result<LinearAnalysis> {
	let n_rows = dataset.n_rows();
	let n_continents = dataset.continent_options.len();
	let n_dummies = n_continents.saturating_sub(1);
	let mut x = Array2::<f64>::zeros((n_rows, 2 + n_dummies));
	let mut term_names = vec!["bmi".to_owned(), "smokers_percent".to_owned()];
	for row in 0..n_rows {
		x[[row, 0]] = dataset.bmi[row];
		x[[row, 1]] = dataset.smokers_percent[row];
		if let Some(code) = dataset.continent[row] {
			// The first option is the reference level and gets no column.
			let index = code.get() - 1;
			if index > 0 {
				x[[row, 2 + index - 1]] = 1.0;
			}
		}
	}
	for option in dataset.continent_options.iter().skip(1) {
		term_names.push(format!("continent={}", option));
	}

	let model = fit_ols(
		&dataset.prostate_deaths,
		x.view(),
		&term_names,
		&OlsOptions::default(),
	)
	.context("failed to fit the linear model")?;
	let vif = compute_vif(x.view())
		.context("failed to compute variance inflation factors")?
		.into_iter()
		.zip(term_names.iter())
		.map(|(vif, term)| VifEntry {
			term: term.clone(),
			vif,
		})
		.collect();
	let qq = qq_points(&model.residuals);
	Ok(LinearAnalysis { model, vif, qq })
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;
	use std::num::NonZeroUsize;

	fn synthetic_dataset() -> AnalysisDataset {
		// deaths = 100 * bmi + 10 * smokers + 500 for Europe, with small noise
		let bmi = vec![20.0, 22.0, 24.0, 26.0, 28.0, 30.0, 21.0, 23.0, 25.0, 27.0];
		let smokers = vec![30.0, 12.0, 25.0, 8.0, 15.0, 33.0, 20.0, 10.0, 27.0, 18.0];
		let continent: Vec<Option<NonZeroUsize>> = [1, 2, 1, 2, 1, 2, 1, 2, 1, 2]
			.iter()
			.map(|code| NonZeroUsize::new(*code))
			.collect();
		let noise = [0.3, -0.2, 0.1, -0.4, 0.2, 0.0, -0.1, 0.4, -0.3, 0.1];
		let deaths: Vec<f64> = (0..10)
			.map(|i| {
				let europe = if continent[i] == NonZeroUsize::new(2) {
					500.0
				} else {
					0.0
				};
				100.0 * bmi[i] + 10.0 * smokers[i] + europe + noise[i]
			})
			.collect();
		AnalysisDataset {
			year: 2008,
			country: (0..10).map(|i| format!("country {}", i)).collect(),
			continent_options: vec!["Africa".to_owned(), "Europe".to_owned()],
			continent,
			bmi,
			smokers_percent: smokers,
			prostate_deaths: deaths,
			n_source_rows: 10,
			n_year_rows: 10,
			n_dropped_rows: 0,
		}
	}

	#[test]
	fn test_recovers_coefficients() {
		let dataset = synthetic_dataset();
		let analysis = analyze(&dataset).unwrap();
		let model = &analysis.model;
		assert_eq!(
			model.term_names,
			vec![
				"(Intercept)".to_owned(),
				"bmi".to_owned(),
				"smokers_percent".to_owned(),
				"continent=Europe".to_owned(),
			]
		);
		assert_abs_diff_eq!(model.coefficients[1], 100.0, epsilon = 1.0);
		assert_abs_diff_eq!(model.coefficients[2], 10.0, epsilon = 1.0);
		assert_abs_diff_eq!(model.coefficients[3], 500.0, epsilon = 5.0);
		assert!(model.r_squared > 0.999);
	}

	#[test]
	fn test_diagnostics_are_present() {
		let dataset = synthetic_dataset();
		let analysis = analyze(&dataset).unwrap();
		assert_eq!(analysis.vif.len(), 3);
		assert!(analysis.vif.iter().all(|entry| entry.vif >= 1.0));
		assert_eq!(analysis.qq.len(), dataset.n_rows());
	}
}
