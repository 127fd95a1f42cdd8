//! This module contains the main entrypoint to the oncorisk cli.

use anyhow::Result;
use clap::Clap;
use colored::Colorize;
use oncorisk_core::{Config, Report};
use std::path::PathBuf;

#[derive(Clap)]
#[clap(
	about = "Analyze the relationship between national bmi, smoking rates, and prostate cancer deaths.",
	setting = clap::AppSettings::DisableHelpSubcommand,
)]
struct Options {
	#[clap(short, long, about = "the path to your .csv file")]
	file: PathBuf,
	#[clap(short, long, about = "the path to a config file")]
	config: Option<PathBuf>,
	#[clap(long, about = "the year of data to analyze")]
	year: Option<usize>,
	#[clap(long, about = "the rng seed")]
	seed: Option<u64>,
	#[clap(long, about = "the number of random search trials")]
	trials: Option<usize>,
	#[clap(long, about = "the number of cross validation folds")]
	folds: Option<usize>,
	#[clap(long, about = "print the full report as json")]
	json: bool,
}

fn main() {
	env_logger::init();
	let options = Options::parse();
	if let Err(error) = run(options) {
		eprintln!("{}: {}", "error".red().bold(), error);
		std::process::exit(1);
	}
}

fn run(options: Options) -> Result<()> {
	let mut config = Config::load(options.config.as_deref())?;
	if let Some(year) = options.year {
		config.target_year = year;
	}
	if let Some(seed) = options.seed {
		config.seed = seed;
	}
	if let Some(trials) = options.trials {
		config.search_trials = trials;
	}
	if let Some(folds) = options.folds {
		config.cv_folds = folds;
	}
	let report = oncorisk_core::run(&options.file, &config)?;
	if options.json {
		println!("{}", serde_json::to_string_pretty(&report)?);
	} else {
		print_report(&report);
	}
	Ok(())
}

fn print_report(report: &Report) {
	println!(
		"{}",
		format!(
			"oncorisk report for {} ({} countries, {} rows dropped)",
			report.year, report.n_rows, report.n_dropped_rows,
		)
		.bold()
	);

	println!("\n{}", "descriptive statistics".bold());
	println!(
		"{:<24} {:>8} {:>12} {:>12} {:>12} {:>12}",
		"column", "count", "mean", "std", "min", "max",
	);
	for stats in report.column_stats.iter() {
		let std = stats
			.std
			.map(|std| format!("{:.2}", std))
			.unwrap_or_else(|| "-".to_owned());
		println!(
			"{:<24} {:>8} {:>12.2} {:>12} {:>12.2} {:>12.2}",
			stats.column_name, stats.count, stats.mean, std, stats.min, stats.max,
		);
	}

	println!("\n{}", "histograms".bold());
	for histogram in report.histograms.iter() {
		println!("{} (bin width {})", histogram.column_name, histogram.bin_width);
		for bin in histogram.bins.iter() {
			if bin.count == 0 {
				continue;
			}
			println!(
				"  [{:>10.1}, {:>10.1}) {:>5} {}",
				bin.lower,
				bin.upper,
				bin.count,
				"#".repeat(bin.count),
			);
		}
	}

	println!("\n{}", "correlations".bold());
	for correlation in report.correlations.iter() {
		println!(
			"{} vs {}: r = {:.3} ({} pairs)",
			correlation.column_a, correlation.column_b, correlation.r, correlation.n_pairs,
		);
	}

	println!("\n{}", "linear model".bold());
	println!(
		"{:<24} {:>12} {:>12} {:>8} {:>10}",
		"term", "coefficient", "std error", "t", "p",
	);
	let model = &report.linear.model;
	for (index, term) in model.term_names.iter().enumerate() {
		let std_error = column_or_dash(&model.std_errors, index, 4);
		let t = column_or_dash(&model.t_values, index, 2);
		let p = column_or_dash(&model.p_values, index, 4);
		println!(
			"{:<24} {:>12.4} {:>12} {:>8} {:>10}",
			term, model.coefficients[index], std_error, t, p,
		);
	}
	println!(
		"R\u{b2} = {:.4}, adjusted R\u{b2} = {:.4}, AIC = {:.1}",
		model.r_squared, model.adj_r_squared, model.aic,
	);
	println!("variance inflation factors:");
	for entry in report.linear.vif.iter() {
		println!("  {:<24} {:.2}", entry.term, entry.vif);
	}

	println!("\n{}", "model selection".bold());
	let pipeline = &report.pipeline;
	println!(
		"{:<6} {:>6} {:>10} {:>9} {:>13} {:>10} {:>12} {:>8}",
		"trial", "depth", "lr", "min gain", "max features", "subsample", "cv RMSE", "cv R\u{b2}",
	);
	for (index, trial) in pipeline.trials.iter().enumerate() {
		let marker = if index == pipeline.best_trial_index {
			"*"
		} else {
			" "
		};
		println!(
			"{}{:<5} {:>6} {:>10.4} {:>9.2} {:>13} {:>10.2} {:>12.1} {:>8.3}",
			marker,
			index,
			trial.params.max_depth,
			trial.params.learning_rate,
			trial.params.min_gain_to_split,
			trial.params.max_features,
			trial.params.subsample,
			trial.mean_rmse,
			trial.mean_r2,
		);
	}
	println!(
		"test metrics over {} held-out countries: RMSE {:.1}, R\u{b2} {:.4}, MAE {:.1}",
		pipeline.n_test, pipeline.test_metrics.rmse, pipeline.test_metrics.r2, pipeline.test_metrics.mae,
	);
	println!("feature importances:");
	for importance in pipeline.feature_importances.iter() {
		println!(
			"  {:<24} {:>6.1}%",
			importance.feature_name,
			importance.importance * 100.0,
		);
	}

	println!("\n{}", "summary".bold());
	for row in report.summary.iter() {
		println!("{:<24} {}", row.step, row.finding);
	}
}

fn column_or_dash(values: &Option<Vec<f64>>, index: usize, decimals: usize) -> String {
	match values {
		Some(values) => format!("{:.*}", decimals, values[index]),
		None => "-".to_owned(),
	}
}
