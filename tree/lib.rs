/*!
This crate implements gradient boosted decision trees for regression. Training produces a [`Regressor`](struct.Regressor.html) that is an ensemble of trees fit to the residuals of its predecessors, starting from the mean of the labels.
*/

mod feature_importances;
mod regressor;
mod tree;

pub use self::feature_importances::compute_feature_importances;
pub use self::regressor::{Regressor, TrainOptions};
pub use self::tree::{BranchNode, LeafNode, Node, Tree};

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
	#[error("training requires at least {min} examples, got {got}")]
	NotEnoughExamples { min: usize, got: usize },

	#[error("dimension mismatch: features have {feature_rows} rows, labels have {label_len} values")]
	DimensionMismatch {
		feature_rows: usize,
		label_len: usize,
	},

	#[error("invalid train option: {0}")]
	InvalidOption(&'static str),
}
