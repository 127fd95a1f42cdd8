/*!
This crate implements the oncorisk analysis workflow. [`run`](fn.run.html) loads a country-year table of bmi, smoking rates, and prostate cancer death counts, restricts it to one year, and produces descriptive statistics, a correlation analysis, an ordinary least squares model with diagnostics, a tuned gradient boosted tree model evaluated on held-out data, and an executive summary table.
*/

pub mod config;
pub mod correlation;
pub mod linear_model;
pub mod pipeline;
pub mod prepare;
pub mod stats;
pub mod summary;

pub use self::config::Config;
pub use self::correlation::CorrelationResult;
pub use self::linear_model::LinearAnalysis;
pub use self::pipeline::PipelineReport;
pub use self::prepare::AnalysisDataset;
pub use self::stats::{ColumnStats, Histogram};
pub use self::summary::SummaryRow;

use anyhow::{format_err, Result};
use oncorisk_dataframe::{DataFrame, FromCsvOptions};
use std::path::Path;

/// Everything one analysis run produces.
#[derive(Debug, serde::Serialize)]
pub struct Report {
	pub year: usize,
	pub n_rows: usize,
	pub n_year_rows: usize,
	pub n_dropped_rows: usize,
	pub column_stats: Vec<ColumnStats>,
	pub histograms: Vec<Histogram>,
	pub correlations: Vec<CorrelationResult>,
	pub linear: LinearAnalysis,
	pub pipeline: PipelineReport,
	pub summary: Vec<SummaryRow>,
}

/// Run the whole workflow on a csv file.
pub fn run(file_path: &Path, config: &Config) -> Result<Report> {
	log::info!("loading {}", file_path.display());
	let dataframe = DataFrame::from_path(file_path, FromCsvOptions::default())?;
	run_with_dataframe(&dataframe, config)
}

pub fn run_with_dataframe(dataframe: &DataFrame, config: &Config) -> Result<Report> {
	let dataset = prepare::prepare(dataframe, config)?;
	log::info!(
		"prepared {} rows for {}, dropped {} of {}",
		dataset.n_rows(),
		dataset.year,
		dataset.n_dropped_rows,
		dataset.n_year_rows,
	);

	let columns = &config.columns;
	let bmi_stats = column_stats(&columns.bmi, &dataset.bmi)?;
	let smokers_stats = column_stats(&columns.smokers_percent, &dataset.smokers_percent)?;
	let deaths_stats = column_stats(&columns.prostate_deaths, &dataset.prostate_deaths)?;
	let mut histograms = Vec::new();
	for (name, values, bin_width) in [
		(&columns.bmi, &dataset.bmi, config.histograms.bmi_bin_width),
		(
			&columns.smokers_percent,
			&dataset.smokers_percent,
			config.histograms.smokers_bin_width,
		),
		(
			&columns.prostate_deaths,
			&dataset.prostate_deaths,
			config.histograms.deaths_bin_width,
		),
	] {
		let histogram = stats::compute_histogram(name, values, bin_width)
			.ok_or_else(|| format_err!("cannot compute a histogram for column \"{}\"", name))?;
		histograms.push(histogram);
	}

	let correlations = vec![
		correlation::compute_correlation(
			&columns.bmi,
			&columns.prostate_deaths,
			&dataset.bmi,
			&dataset.prostate_deaths,
		)?,
		correlation::compute_correlation(
			&columns.smokers_percent,
			&columns.prostate_deaths,
			&dataset.smokers_percent,
			&dataset.prostate_deaths,
		)?,
		correlation::compute_correlation(
			&columns.bmi,
			&columns.smokers_percent,
			&dataset.bmi,
			&dataset.smokers_percent,
		)?,
	];
	log::info!(
		"correlation {} vs {}: r = {:.3}",
		correlations[0].column_a,
		correlations[0].column_b,
		correlations[0].r,
	);

	log::info!("fitting the linear model");
	let linear = linear_model::analyze(&dataset)?;

	log::info!(
		"running the ML pipeline, {} trials with {}-fold cross validation",
		config.search_trials,
		config.cv_folds,
	);
	let pipeline = pipeline::run_pipeline(&dataset, config)?;
	log::info!(
		"test RMSE {:.1}, R\u{b2} {:.3}",
		pipeline.test_metrics.rmse,
		pipeline.test_metrics.r2,
	);

	let summary = summary::build_summary(
		&dataset,
		&bmi_stats,
		&deaths_stats,
		&correlations,
		&linear,
		&pipeline,
	);

	Ok(Report {
		year: dataset.year,
		n_rows: dataset.n_rows(),
		n_year_rows: dataset.n_year_rows,
		n_dropped_rows: dataset.n_dropped_rows,
		column_stats: vec![bmi_stats, smokers_stats, deaths_stats],
		histograms,
		correlations,
		linear,
		pipeline,
		summary,
	})
}

fn column_stats(name: &str, values: &[f64]) -> Result<ColumnStats> {
	stats::compute_column_stats(name, values)
		.ok_or_else(|| format_err!("column \"{}\" has no values to summarize", name))
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	fn load(csv: &str) -> DataFrame {
		DataFrame::from_csv(
			&mut csv::Reader::from_reader(std::io::Cursor::new(csv.to_owned())),
			FromCsvOptions::default(),
		)
		.unwrap()
	}

	#[test]
	fn test_small_scenario_statistics() {
		// Death counts arrive in mixed formats and the off-year row is excluded.
		let csv = "\
country,continent,year,bmi,smokers_percent,prostate_cancer_deaths
A,Africa,2008,22.1,12.0,\"1,200\"
B,Europe,2008,27.4,25.0,3.5k
C,Europe,2008,30.2,30.0,5000
D,Europe,2007,30.0,40.0,9000
";
		let dataframe = load(csv);
		let config = Config::default();
		let dataset = prepare::prepare(&dataframe, &config).unwrap();
		assert_eq!(dataset.prostate_deaths, vec![1200.0, 3500.0, 5000.0]);
		let bmi_stats = stats::compute_column_stats("bmi", &dataset.bmi).unwrap();
		assert_eq!(bmi_stats.count, 3);
		assert_abs_diff_eq!(bmi_stats.mean, 26.566666666666666, epsilon = 1e-12);
		let correlation = correlation::compute_correlation(
			"bmi",
			"prostate_cancer_deaths",
			&dataset.bmi,
			&dataset.prostate_deaths,
		)
		.unwrap();
		assert!(correlation.r > 0.9);
		assert_eq!(correlation.n_pairs, 3);
	}

	#[test]
	fn test_run_with_dataframe_end_to_end() {
		let mut csv = String::from(
			"country,continent,year,bmi,smokers_percent,prostate_cancer_deaths\n",
		);
		let continents = ["Africa", "Asia", "Europe"];
		for i in 0..60 {
			let bmi = 20.0 + (i % 13) as f64;
			let smokers = 5.0 + ((i * 7) % 31) as f64;
			let continent = continents[i % 3];
			let deaths = 200.0 * bmi + 40.0 * smokers + 1000.0 * (i % 3) as f64;
			csv.push_str(&format!(
				"country {},{},2008,{},{},{}\n",
				i, continent, bmi, smokers, deaths,
			));
		}
		let dataframe = load(&csv);
		let config = Config {
			search_trials: 3,
			cv_folds: 3,
			max_rounds: 30,
			..Config::default()
		};
		let report = run_with_dataframe(&dataframe, &config).unwrap();
		assert_eq!(report.n_rows, 60);
		assert_eq!(report.pipeline.n_test, 12);
		assert_eq!(report.column_stats.len(), 3);
		assert_eq!(report.histograms.len(), 3);
		assert_eq!(report.correlations.len(), 3);
		assert!(report.summary.len() >= 6);
		// The whole report serializes, which is what the cli's json output relies on.
		let json = serde_json::to_string(&report).unwrap();
		assert!(json.contains("\"summary\""));
	}
}
