use crate::correlation::CorrelationResult;
use crate::linear_model::LinearAnalysis;
use crate::pipeline::PipelineReport;
use crate::prepare::AnalysisDataset;
use crate::stats::ColumnStats;

/// One row of the executive summary table.
#[derive(Clone, Debug, serde::Serialize)]
pub struct SummaryRow {
	pub step: String,
	pub finding: String,
}

/// Format a count with thousands separators, rounding to the nearest integer.
pub fn format_thousands(value: f64) -> String {
	let rounded = value.round() as i64;
	let digits = rounded.abs().to_string();
	let mut formatted = String::with_capacity(digits.len() + digits.len() / 3 + 1);
	if rounded < 0 {
		formatted.push('-');
	}
	let leading = digits.len() % 3;
	for (index, c) in digits.chars().enumerate() {
		if index != 0 && index % 3 == leading % 3 {
			formatted.push(',');
		}
		formatted.push(c);
	}
	formatted
}

/// Format a p-value the way reports write them: small values as a bound, everything else to three decimals.
pub fn format_p_value(p: f64) -> String {
	if p < 0.001 {
		"p < 0.001".to_owned()
	} else {
		format!("p = {:.3}", p)
	}
}

/// Assemble the executive summary table, one row per analysis step.
pub fn build_summary(
	dataset: &AnalysisDataset,
	bmi_stats: &ColumnStats,
	deaths_stats: &ColumnStats,
	correlations: &[CorrelationResult],
	linear: &LinearAnalysis,
	pipeline: &PipelineReport,
) -> Vec<SummaryRow> {
	let mut rows = Vec::new();
	rows.push(SummaryRow {
		step: "data".to_owned(),
		finding: format!(
			"{} countries analyzed for {}, {} of {} rows dropped",
			dataset.n_rows(),
			dataset.year,
			dataset.n_dropped_rows,
			dataset.n_year_rows,
		),
	});
	rows.push(SummaryRow {
		step: "descriptive statistics".to_owned(),
		finding: format!(
			"mean bmi {:.1}, mean annual deaths {}",
			bmi_stats.mean,
			format_thousands(deaths_stats.mean),
		),
	});
	for correlation in correlations {
		rows.push(SummaryRow {
			step: "correlation".to_owned(),
			finding: format!(
				"{} vs {}: r = {:.2} over {} pairs",
				correlation.column_a, correlation.column_b, correlation.r, correlation.n_pairs,
			),
		});
	}
	let bmi_term = linear
		.model
		.term_names
		.iter()
		.position(|name| name == "bmi");
	let bmi_p = bmi_term
		.and_then(|index| linear.model.p_values.as_ref().map(|p| p[index]))
		.map(format_p_value)
		.unwrap_or_else(|| "p unavailable".to_owned());
	rows.push(SummaryRow {
		step: "linear model".to_owned(),
		finding: format!(
			"R\u{b2} = {:.2}, AIC = {:.0}, bmi {}",
			linear.model.r_squared, linear.model.aic, bmi_p,
		),
	});
	let best = &pipeline.trials[pipeline.best_trial_index];
	rows.push(SummaryRow {
		step: "model selection".to_owned(),
		finding: format!(
			"best of {} trials: depth {}, learning rate {:.3}, cv RMSE {}",
			pipeline.trials.len(),
			best.params.max_depth,
			best.params.learning_rate,
			format_thousands(best.mean_rmse),
		),
	});
	rows.push(SummaryRow {
		step: "test performance".to_owned(),
		finding: format!(
			"test RMSE {}, R\u{b2} = {:.2}",
			format_thousands(pipeline.test_metrics.rmse),
			pipeline.test_metrics.r2,
		),
	});
	if let Some(top) = pipeline.feature_importances.first() {
		rows.push(SummaryRow {
			step: "top predictor".to_owned(),
			finding: format!(
				"{} ({:.0}% of splits)",
				top.feature_name,
				top.importance * 100.0,
			),
		});
	}
	rows
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_format_thousands() {
		assert_eq!(format_thousands(0.0), "0");
		assert_eq!(format_thousands(999.0), "999");
		assert_eq!(format_thousands(15400.0), "15,400");
		assert_eq!(format_thousands(1234567.4), "1,234,567");
		assert_eq!(format_thousands(-5000.0), "-5,000");
	}

	#[test]
	fn test_format_p_value() {
		assert_eq!(format_p_value(0.0002), "p < 0.001");
		assert_eq!(format_p_value(0.04), "p = 0.040");
		assert_eq!(format_p_value(0.5), "p = 0.500");
	}
}
