use anyhow::{Context, Result};
use std::path::Path;

/// Settings for an analysis run. Every field has a default, so an empty YAML file is a valid config.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct Config {
	/// The single year of data to analyze.
	#[serde(default = "default_target_year")]
	pub target_year: usize,
	#[serde(default = "default_test_fraction")]
	pub test_fraction: f64,
	#[serde(default = "default_cv_folds")]
	pub cv_folds: usize,
	/// The number of random search trials for hyperparameter tuning.
	#[serde(default = "default_search_trials")]
	pub search_trials: usize,
	#[serde(default = "default_seed")]
	pub seed: u64,
	/// The number of boosting rounds for each trained ensemble.
	#[serde(default = "default_max_rounds")]
	pub max_rounds: usize,
	#[serde(default)]
	pub histograms: HistogramConfig,
	#[serde(default)]
	pub columns: ColumnsConfig,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct HistogramConfig {
	#[serde(default = "default_bmi_bin_width")]
	pub bmi_bin_width: f64,
	#[serde(default = "default_deaths_bin_width")]
	pub deaths_bin_width: f64,
	#[serde(default = "default_smokers_bin_width")]
	pub smokers_bin_width: f64,
}

/// The names of the columns in the input csv.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct ColumnsConfig {
	#[serde(default = "default_country_column")]
	pub country: String,
	#[serde(default = "default_continent_column")]
	pub continent: String,
	#[serde(default = "default_year_column")]
	pub year: String,
	#[serde(default = "default_bmi_column")]
	pub bmi: String,
	#[serde(default = "default_smokers_column")]
	pub smokers_percent: String,
	#[serde(default = "default_deaths_column")]
	pub prostate_deaths: String,
}

impl Config {
	/// Load a config from a YAML file, or return the defaults if `path` is `None`.
	pub fn load(path: Option<&Path>) -> Result<Config> {
		match path {
			Some(path) => {
				let file = std::fs::File::open(path)
					.with_context(|| format!("failed to open config file {}", path.display()))?;
				let config = serde_yaml::from_reader(file)
					.with_context(|| format!("failed to parse config file {}", path.display()))?;
				Ok(config)
			}
			None => Ok(Config::default()),
		}
	}
}

impl Default for Config {
	fn default() -> Self {
		Config {
			target_year: default_target_year(),
			test_fraction: default_test_fraction(),
			cv_folds: default_cv_folds(),
			search_trials: default_search_trials(),
			seed: default_seed(),
			max_rounds: default_max_rounds(),
			histograms: HistogramConfig::default(),
			columns: ColumnsConfig::default(),
		}
	}
}

impl Default for HistogramConfig {
	fn default() -> Self {
		HistogramConfig {
			bmi_bin_width: default_bmi_bin_width(),
			deaths_bin_width: default_deaths_bin_width(),
			smokers_bin_width: default_smokers_bin_width(),
		}
	}
}

impl Default for ColumnsConfig {
	fn default() -> Self {
		ColumnsConfig {
			country: default_country_column(),
			continent: default_continent_column(),
			year: default_year_column(),
			bmi: default_bmi_column(),
			smokers_percent: default_smokers_column(),
			prostate_deaths: default_deaths_column(),
		}
	}
}

fn default_target_year() -> usize {
	2008
}
fn default_test_fraction() -> f64 {
	0.2
}
fn default_cv_folds() -> usize {
	5
}
fn default_search_trials() -> usize {
	20
}
fn default_seed() -> u64 {
	42
}
fn default_max_rounds() -> usize {
	300
}
fn default_bmi_bin_width() -> f64 {
	1.0
}
fn default_deaths_bin_width() -> f64 {
	5000.0
}
fn default_smokers_bin_width() -> f64 {
	5.0
}
fn default_country_column() -> String {
	"country".to_owned()
}
fn default_continent_column() -> String {
	"continent".to_owned()
}
fn default_year_column() -> String {
	"year".to_owned()
}
fn default_bmi_column() -> String {
	"bmi".to_owned()
}
fn default_smokers_column() -> String {
	"smokers_percent".to_owned()
}
fn default_deaths_column() -> String {
	"prostate_cancer_deaths".to_owned()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_yaml_gives_defaults() {
		let config: Config = serde_yaml::from_str("{}").unwrap();
		assert_eq!(config.target_year, 2008);
		assert_eq!(config.cv_folds, 5);
		assert_eq!(config.search_trials, 20);
		assert_eq!(config.seed, 42);
		assert_eq!(config.columns.prostate_deaths, "prostate_cancer_deaths");
	}

	#[test]
	fn test_partial_yaml_overrides() {
		let yaml = "target_year: 2010\ncolumns:\n  bmi: body_mass_index\n";
		let config: Config = serde_yaml::from_str(yaml).unwrap();
		assert_eq!(config.target_year, 2010);
		assert_eq!(config.columns.bmi, "body_mass_index");
		assert_eq!(config.columns.year, "year");
		assert_eq!(config.test_fraction, 0.2);
	}
}
