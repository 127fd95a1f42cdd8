use crate::regressor::Regressor;
use crate::tree::Node;

/// Compute feature importances as the normalized number of times each feature is used to split, across every tree in the ensemble. The importances sum to 1.0, or are all 0.0 for an ensemble with no splits.
pub fn compute_feature_importances(regressor: &Regressor) -> Vec<f64> {
	let mut split_counts = vec![0usize; regressor.n_features];
	for tree in regressor.trees.iter() {
		for node in tree.nodes.iter() {
			if let Node::Branch(branch) = node {
				split_counts[branch.feature_index] += 1;
			}
		}
	}
	let total = split_counts.iter().sum::<usize>();
	if total == 0 {
		return vec![0.0; regressor.n_features];
	}
	split_counts
		.into_iter()
		.map(|count| count as f64 / total as f64)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::regressor::TrainOptions;
	use approx::assert_abs_diff_eq;
	use ndarray::prelude::*;

	#[test]
	fn test_informative_feature_dominates() {
		// The first feature determines the label, the second is constant.
		let mut features = Array2::zeros((8, 2));
		for i in 0..8 {
			features[[i, 0]] = i as f64;
			features[[i, 1]] = 1.0;
		}
		let labels = vec![1.0, 1.0, 1.0, 1.0, 5.0, 5.0, 5.0, 5.0];
		let options = TrainOptions {
			max_rounds: 10,
			max_depth: 2,
			..Default::default()
		};
		let regressor = Regressor::train(features.view(), &labels, &options).unwrap();
		let importances = compute_feature_importances(&regressor);
		assert_eq!(importances.len(), 2);
		assert_abs_diff_eq!(importances[0], 1.0);
		assert_abs_diff_eq!(importances[1], 0.0);
		assert_abs_diff_eq!(importances.iter().sum::<f64>(), 1.0);
	}

	#[test]
	fn test_no_splits_yields_zeros() {
		let features = Array2::from_shape_vec((6, 1), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
		let labels = vec![3.0; 6];
		let regressor =
			Regressor::train(features.view(), &labels, &TrainOptions::default()).unwrap();
		let importances = compute_feature_importances(&regressor);
		assert_eq!(importances, vec![0.0]);
	}
}
