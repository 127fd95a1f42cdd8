use oncorisk_metrics::MeanVariance;

/// Descriptive statistics for one number column. `std` is the sample standard deviation, absent when fewer than two values are present.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ColumnStats {
	pub column_name: String,
	pub count: usize,
	pub mean: f64,
	pub std: Option<f64>,
	pub min: f64,
	pub max: f64,
}

/// A fixed-bin-width histogram. Bin edges are aligned to multiples of the bin width, so two histograms of the same column with the same width always share edges.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Histogram {
	pub column_name: String,
	pub bin_width: f64,
	pub bins: Vec<HistogramBin>,
}

/// One histogram bin covering `[lower, upper)`, except the last bin, which also includes its upper edge.
#[derive(Clone, Debug, serde::Serialize)]
pub struct HistogramBin {
	pub lower: f64,
	pub upper: f64,
	pub count: usize,
}

/// Compute descriptive statistics for a column, ignoring NaN values. Returns `None` when no finite values remain.
pub fn compute_column_stats(column_name: &str, values: &[f64]) -> Option<ColumnStats> {
	let finite: Vec<f64> = values.iter().cloned().filter(|v| v.is_finite()).collect();
	if finite.is_empty() {
		return None;
	}
	let mean_variance = MeanVariance::compute(finite.iter().cloned());
	let min = finite.iter().cloned().fold(f64::INFINITY, f64::min);
	let max = finite.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
	Some(ColumnStats {
		column_name: column_name.to_owned(),
		count: finite.len(),
		mean: mean_variance.mean,
		std: mean_variance.sample_variance.map(f64::sqrt),
		min,
		max,
	})
}

/// Compute a fixed-bin-width histogram of the finite values of a column. Returns `None` when no finite values remain or `bin_width` is not positive.
pub fn compute_histogram(column_name: &str, values: &[f64], bin_width: f64) -> Option<Histogram> {
	if !(bin_width > 0.0) {
		return None;
	}
	let finite: Vec<f64> = values.iter().cloned().filter(|v| v.is_finite()).collect();
	if finite.is_empty() {
		return None;
	}
	let min = finite.iter().cloned().fold(f64::INFINITY, f64::min);
	let max = finite.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
	let first_bin = (min / bin_width).floor() as i64;
	let last_bin = (max / bin_width).floor() as i64;
	let n_bins = (last_bin - first_bin + 1) as usize;
	let mut bins: Vec<HistogramBin> = (0..n_bins)
		.map(|index| {
			let lower = (first_bin + index as i64) as f64 * bin_width;
			HistogramBin {
				lower,
				upper: lower + bin_width,
				count: 0,
			}
		})
		.collect();
	for value in finite {
		let mut index = ((value / bin_width).floor() as i64 - first_bin) as usize;
		// The maximum lands exactly on the last edge when it is a multiple of the width.
		if index >= n_bins {
			index = n_bins - 1;
		}
		bins[index].count += 1;
	}
	Some(Histogram {
		column_name: column_name.to_owned(),
		bin_width,
		bins,
	})
}
