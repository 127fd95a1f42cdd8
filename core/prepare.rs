use crate::config::Config;
use anyhow::{bail, format_err, Result};
use oncorisk_dataframe::{Column, DataFrame};
use std::num::NonZeroUsize;

/// The cleaned per-country data for a single year, ready for analysis. `continent` values index into `continent_options` offset by one, matching the enum column convention, and are always present after preparation.
#[derive(Clone, Debug)]
pub struct AnalysisDataset {
	pub year: usize,
	pub country: Vec<String>,
	pub continent_options: Vec<String>,
	pub continent: Vec<Option<NonZeroUsize>>,
	pub bmi: Vec<f64>,
	pub smokers_percent: Vec<f64>,
	pub prostate_deaths: Vec<f64>,
	/// The number of rows in the source table, all years included.
	pub n_source_rows: usize,
	/// The number of source rows matching the target year.
	pub n_year_rows: usize,
	/// The number of target-year rows dropped for missing or unparseable values.
	pub n_dropped_rows: usize,
}

impl AnalysisDataset {
	pub fn n_rows(&self) -> usize {
		self.country.len()
	}
}

/**
Parse a death count written the way the source table writes them. A trailing `k` or `K` multiplies by one thousand and is handled before anything else, so `"15.4k"` is 15400 and `"3,2k"` is 32000. Commas are treated as thousands separators and removed.
*/
pub fn parse_count(text: &str) -> Option<f64> {
	let text = text.trim();
	let (digits, multiplier) = if text.ends_with('k') || text.ends_with('K') {
		(&text[..text.len() - 1], 1000.0)
	} else {
		(text, 1.0)
	};
	let cleaned: String = digits.chars().filter(|c| *c != ',').collect();
	let value = cleaned.trim().parse::<f64>().ok()?;
	if value.is_finite() {
		Some(value * multiplier)
	} else {
		None
	}
}

/// Filter a loaded table to the target year, coerce the death counts to numbers, and drop rows with missing values in any analysis column.
pub fn prepare(dataframe: &DataFrame, config: &Config) -> Result<AnalysisDataset> {
	let columns = &config.columns;
	let year = number_values(dataframe, &columns.year)?;
	let bmi = number_values(dataframe, &columns.bmi)?;
	let smokers_percent = number_values(dataframe, &columns.smokers_percent)?;
	let prostate_deaths = count_values(dataframe, &columns.prostate_deaths)?;
	let country = string_values(dataframe, &columns.country)?;
	let continent = string_values(dataframe, &columns.continent)?;

	let n_source_rows = dataframe.nrows();
	let target_year = config.target_year as f64;
	let mut n_year_rows = 0;
	let mut kept_country = Vec::new();
	let mut kept_continent = Vec::new();
	let mut kept_bmi = Vec::new();
	let mut kept_smokers = Vec::new();
	let mut kept_deaths = Vec::new();
	for row in 0..n_source_rows {
		if year[row] != target_year {
			continue;
		}
		n_year_rows += 1;
		let continent_value = match continent[row] {
			Some(value) => value,
			None => continue,
		};
		let country_value = match country[row] {
			Some(value) => value,
			None => continue,
		};
		let deaths_value = match prostate_deaths[row] {
			Some(value) => value,
			None => continue,
		};
		if bmi[row].is_nan() || smokers_percent[row].is_nan() {
			continue;
		}
		kept_country.push(country_value.to_owned());
		kept_continent.push(continent_value.to_owned());
		kept_bmi.push(bmi[row]);
		kept_smokers.push(smokers_percent[row]);
		kept_deaths.push(deaths_value);
	}
	if kept_country.is_empty() {
		bail!(
			"no usable rows for year {}: {} source rows, {} in the target year",
			config.target_year,
			n_source_rows,
			n_year_rows,
		);
	}
	let n_dropped_rows = n_year_rows - kept_country.len();

	// Encode the continents against a sorted option list so the encoding does not depend on row order.
	let mut continent_options: Vec<String> = kept_continent.clone();
	continent_options.sort();
	continent_options.dedup();
	let continent_codes = kept_continent
		.iter()
		.map(|value| {
			continent_options
				.iter()
				.position(|option| option == value)
				.and_then(|position| NonZeroUsize::new(position + 1))
		})
		.collect();

	Ok(AnalysisDataset {
		year: config.target_year,
		country: kept_country,
		continent_options,
		continent: continent_codes,
		bmi: kept_bmi,
		smokers_percent: kept_smokers,
		prostate_deaths: kept_deaths,
		n_source_rows,
		n_year_rows,
		n_dropped_rows,
	})
}

fn find_column<'a>(dataframe: &'a DataFrame, name: &str) -> Result<&'a Column> {
	dataframe
		.column(name)
		.ok_or_else(|| format_err!("the input table has no column named \"{}\"", name))
}

fn number_values(dataframe: &DataFrame, name: &str) -> Result<Vec<f64>> {
	let column = find_column(dataframe, name)?;
	match column {
		Column::Number(column) => Ok(column.data.clone()),
		_ => bail!("column \"{}\" must contain numbers", name),
	}
}

/// Extract one optional string per row from a text or enum column.
fn string_values<'a>(dataframe: &'a DataFrame, name: &str) -> Result<Vec<Option<&'a str>>> {
	let column = find_column(dataframe, name)?;
	match column {
		Column::Text(column) => Ok(column
			.data
			.iter()
			.map(|value| {
				let value = value.trim();
				if value.is_empty() {
					None
				} else {
					Some(value)
				}
			})
			.collect()),
		Column::Enum(column) => Ok(column
			.data
			.iter()
			.map(|value| column.option(*value))
			.collect()),
		_ => bail!("column \"{}\" must contain text or categorical values", name),
	}
}

/// Extract one optional count per row, coercing text like `"15.4k"` or `"3,200"`. A column already inferred as numbers passes through, with NaN treated as missing.
fn count_values(dataframe: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
	let column = find_column(dataframe, name)?;
	match column {
		Column::Number(column) => Ok(column
			.data
			.iter()
			.map(|value| if value.is_nan() { None } else { Some(*value) })
			.collect()),
		Column::Text(column) => Ok(column
			.data
			.iter()
			.map(|value| parse_count(value))
			.collect()),
		Column::Enum(column) => Ok(column
			.data
			.iter()
			.map(|value| column.option(*value).and_then(parse_count))
			.collect()),
		_ => bail!("column \"{}\" has no usable values", name),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use oncorisk_dataframe::FromCsvOptions;

	#[test]
	fn test_parse_count() {
		assert_eq!(parse_count("15.4k"), Some(15400.0));
		assert_eq!(parse_count("15.4K"), Some(15400.0));
		assert_eq!(parse_count("3,200"), Some(3200.0));
		assert_eq!(parse_count("3,2k"), Some(32000.0));
		assert_eq!(parse_count(" 150 "), Some(150.0));
		assert_eq!(parse_count("0"), Some(0.0));
		assert_eq!(parse_count(""), None);
		assert_eq!(parse_count("k"), None);
		assert_eq!(parse_count("unknown"), None);
	}

	fn load(csv: &str) -> DataFrame {
		DataFrame::from_csv(
			&mut csv::Reader::from_reader(std::io::Cursor::new(csv.to_owned())),
			FromCsvOptions::default(),
		)
		.unwrap()
	}

	#[test]
	fn test_prepare_filters_and_coerces() {
		let csv = "\
country,continent,year,bmi,smokers_percent,prostate_cancer_deaths
Kenya,Africa,2008,22.0,10.0,1.2k
France,Europe,2008,25.5,30.0,\"8,900\"
Spain,Europe,2007,26.0,28.0,5000
Chad,Africa,2008,21.0,,400
Peru,South America,2008,24.0,20.0,n/a
";
		let dataframe = load(csv);
		let config = Config::default();
		let dataset = prepare(&dataframe, &config).unwrap();
		assert_eq!(dataset.n_source_rows, 5);
		assert_eq!(dataset.n_year_rows, 4);
		assert_eq!(dataset.n_dropped_rows, 2);
		assert_eq!(dataset.country, vec!["Kenya".to_owned(), "France".to_owned()]);
		assert_eq!(dataset.prostate_deaths, vec![1200.0, 8900.0]);
		assert_eq!(
			dataset.continent_options,
			vec!["Africa".to_owned(), "Europe".to_owned()]
		);
		assert_eq!(
			dataset.continent_options[dataset.continent[1].unwrap().get() - 1],
			"Europe"
		);
	}

	#[test]
	fn test_prepare_errors_when_year_absent() {
		let csv = "\
country,continent,year,bmi,smokers_percent,prostate_cancer_deaths
Kenya,Africa,1999,22.0,10.0,1.2k
";
		let dataframe = load(csv);
		let config = Config::default();
		let error = prepare(&dataframe, &config).unwrap_err();
		assert!(error.to_string().contains("no usable rows"));
	}

	#[test]
	fn test_prepare_errors_on_missing_column() {
		let csv = "country,year\nKenya,2008\n";
		let dataframe = load(csv);
		let config = Config::default();
		assert!(prepare(&dataframe, &config).is_err());
	}
}
