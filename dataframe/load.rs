use super::*;
use anyhow::Result;
use std::{
	collections::{BTreeMap, BTreeSet},
	path::Path,
};

#[derive(Clone)]
pub struct FromCsvOptions<'a> {
	/// Column types that should not be inferred. Columns absent from this map get their types inferred from the data.
	pub column_types: Option<BTreeMap<String, ColumnType>>,
	pub infer_options: InferOptions,
	pub invalid_values: &'a [&'a str],
}

impl<'a> Default for FromCsvOptions<'a> {
	fn default() -> Self {
		Self {
			column_types: None,
			infer_options: InferOptions::default(),
			invalid_values: DEFAULT_INVALID_VALUES,
		}
	}
}

#[derive(Clone, Debug)]
pub struct InferOptions {
	/// A column whose values all parse as finite numbers is a number column. Otherwise, it is an enum column if it has no more than this many unique values, and a text column if it has more.
	pub enum_max_unique_values: usize,
}

impl Default for InferOptions {
	fn default() -> Self {
		Self {
			enum_max_unique_values: 100,
		}
	}
}

/// These values are the default values that are considered invalid.
const DEFAULT_INVALID_VALUES: &[&str] = &[
	"", "null", "NULL", "n/a", "N/A", "nan", "-nan", "NaN", "-NaN", "?",
];

impl DataFrame {
	pub fn from_path(path: &Path, options: FromCsvOptions) -> Result<Self> {
		Self::from_csv(&mut csv::Reader::from_path(path)?, options)
	}

	pub fn from_csv<R>(reader: &mut csv::Reader<R>, options: FromCsvOptions) -> Result<Self>
	where
		R: std::io::Read + std::io::Seek,
	{
		let column_names: Vec<String> = reader
			.headers()?
			.into_iter()
			.map(|column_name| column_name.to_owned())
			.collect();
		let start_position = reader.position().clone();

		enum ColumnTypeOrInferStats<'a> {
			ColumnType(ColumnType),
			InferStats(InferStats<'a>),
		}

		// Retrieve any column types present in the options and set up infer stats for the rest.
		let mut column_types: Vec<ColumnTypeOrInferStats> = column_names
			.iter()
			.map(|column_name| {
				options
					.column_types
					.as_ref()
					.and_then(|column_types| column_types.get(column_name))
					.map(|column_type| ColumnTypeOrInferStats::ColumnType(column_type.clone()))
					.unwrap_or_else(|| {
						ColumnTypeOrInferStats::InferStats(InferStats::new(
							&options.infer_options,
							options.invalid_values,
						))
					})
			})
			.collect();

		// Passing over the csv to infer column types is only necessary if one or more columns did not have its type specified.
		let needs_infer = column_types
			.iter()
			.any(|column_type| matches!(column_type, ColumnTypeOrInferStats::InferStats(_)));
		if needs_infer {
			let mut record = csv::StringRecord::new();
			while reader.read_record(&mut record)? {
				for (index, column_type) in column_types.iter_mut().enumerate() {
					if let ColumnTypeOrInferStats::InferStats(infer_stats) = column_type {
						infer_stats.update(record.get(index).unwrap_or(""));
					}
				}
			}
			// After inference, return back to the beginning of the csv to load the values.
			reader.seek(start_position)?;
		}
		let column_types: Vec<ColumnType> = column_types
			.into_iter()
			.map(|column_type| match column_type {
				ColumnTypeOrInferStats::ColumnType(column_type) => column_type,
				ColumnTypeOrInferStats::InferStats(infer_stats) => infer_stats.finalize(),
			})
			.collect();

		// Read each csv record and insert the values into the columns of the dataframe.
		let mut dataframe = Self::new(column_names, column_types);
		let mut record = csv::StringRecord::new();
		while reader.read_record(&mut record)? {
			for (index, column) in dataframe.columns.iter_mut().enumerate() {
				let value = record.get(index).unwrap_or("");
				match column {
					Column::Unknown(column) => {
						column.len += 1;
					}
					Column::Number(column) => {
						let value = if options.invalid_values.contains(&value) {
							f64::NAN
						} else {
							match lexical::parse::<f64, _>(value) {
								Ok(value) if value.is_finite() => value,
								_ => f64::NAN,
							}
						};
						column.data.push(value);
					}
					Column::Enum(column) => {
						let value = column
							.options
							.iter()
							.position(|option| option == value)
							.map(|position| NonZeroUsize::new(position + 1).unwrap());
						column.data.push(value);
					}
					Column::Text(column) => {
						column.data.push(value.to_owned());
					}
				}
			}
		}
		Ok(dataframe)
	}
}

struct InferStats<'a> {
	invalid_values: &'a [&'a str],
	enum_max_unique_values: usize,
	valid_count: usize,
	all_numbers: bool,
	/// Unique valid values seen so far. `None` once the count exceeds `enum_max_unique_values`.
	unique_values: Option<BTreeSet<String>>,
}

impl<'a> InferStats<'a> {
	fn new(infer_options: &InferOptions, invalid_values: &'a [&'a str]) -> Self {
		Self {
			invalid_values,
			enum_max_unique_values: infer_options.enum_max_unique_values,
			valid_count: 0,
			all_numbers: true,
			unique_values: Some(BTreeSet::new()),
		}
	}

	fn update(&mut self, value: &str) {
		if self.invalid_values.contains(&value) {
			return;
		}
		self.valid_count += 1;
		if self.all_numbers {
			self.all_numbers = matches!(
				lexical::parse::<f64, _>(value),
				Ok(value) if value.is_finite()
			);
		}
		if let Some(unique_values) = self.unique_values.as_mut() {
			if !unique_values.contains(value) {
				unique_values.insert(value.to_owned());
				if unique_values.len() > self.enum_max_unique_values {
					self.unique_values = None;
				}
			}
		}
	}

	fn finalize(self) -> ColumnType {
		if self.valid_count == 0 {
			return ColumnType::Unknown;
		}
		if self.all_numbers {
			return ColumnType::Number;
		}
		match self.unique_values {
			Some(unique_values) => ColumnType::Enum {
				options: unique_values.into_iter().collect(),
			},
			None => ColumnType::Text,
		}
	}
}

#[test]
fn test_infer() {
	let csv = r#"bmi,continent,deaths
22.5,Africa,1.2k
27.1,Europe,3200
?,Europe,150
"#;
	let df = DataFrame::from_csv(
		&mut csv::Reader::from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions::default(),
	)
	.unwrap();
	let bmi = df.columns[0].as_number().unwrap();
	assert_eq!(bmi.data[0], 22.5);
	assert_eq!(bmi.data[1], 27.1);
	assert!(bmi.data[2].is_nan());
	let continent = df.columns[1].as_enum().unwrap();
	assert_eq!(continent.options, vec!["Africa".to_owned(), "Europe".to_owned()]);
	assert_eq!(continent.option(continent.data[0]), Some("Africa"));
	assert_eq!(continent.option(continent.data[1]), Some("Europe"));
	// "1.2k" does not parse as a number, so the column is inferred as an enum.
	assert!(df.columns[2].as_enum().is_some());
}

#[test]
fn test_column_types() {
	let csv = r#"year,deaths
2008,1.2k
2008,3200
"#;
	let mut column_types = BTreeMap::new();
	column_types.insert("deaths".to_owned(), ColumnType::Text);
	let df = DataFrame::from_csv(
		&mut csv::Reader::from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions {
			column_types: Some(column_types),
			..Default::default()
		},
	)
	.unwrap();
	assert_eq!(df.nrows(), 2);
	assert_eq!(df.columns[0].as_number().unwrap().data, vec![2008.0, 2008.0]);
	let deaths = df.columns[1].as_text().unwrap();
	assert_eq!(deaths.data, vec!["1.2k".to_owned(), "3200".to_owned()]);
}

#[test]
fn test_all_invalid_column() {
	let csv = "a,b\n?,1\nn/a,2\n";
	let df = DataFrame::from_csv(
		&mut csv::Reader::from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions::default(),
	)
	.unwrap();
	match &df.columns[0] {
		Column::Unknown(column) => assert_eq!(column.len, 2),
		_ => panic!("expected an unknown column"),
	}
}
