use crate::tree::{BranchNode, LeafNode, Node, Tree};
use crate::TreeError;
use ndarray::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TrainOptions {
	/// The number of boosting rounds, which is the maximum number of trees.
	pub max_rounds: usize,
	/// The maximum depth of each tree. A depth of 1 allows a single split.
	pub max_depth: usize,
	pub learning_rate: f64,
	/// The minimum reduction in sum of squared residuals required to split a node.
	pub min_gain_to_split: f64,
	/// The minimum number of training examples each child of a split must receive.
	pub min_examples_per_node: usize,
	/// The number of features considered at each split. `None` considers all of them.
	pub max_features: Option<usize>,
	/// The fraction of training examples sampled without replacement for each round.
	pub subsample: f64,
	pub seed: u64,
}

impl Default for TrainOptions {
	fn default() -> Self {
		Self {
			max_rounds: 100,
			max_depth: 4,
			learning_rate: 0.1,
			min_gain_to_split: 0.0,
			min_examples_per_node: 2,
			max_features: None,
			subsample: 1.0,
			seed: 0,
		}
	}
}

/// A gradient boosted ensemble of regression trees. The prediction for an example is `bias` plus the sum of the leaf values of every tree.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Regressor {
	pub bias: f64,
	pub trees: Vec<Tree>,
	pub n_features: usize,
}

impl Regressor {
	/// Train a regressor on `features` and `labels`. Training is deterministic for a given seed.
	pub fn train(
		features: ArrayView2<f64>,
		labels: &[f64],
		options: &TrainOptions,
	) -> Result<Regressor, TreeError> {
		let n_examples = features.nrows();
		let n_features = features.ncols();
		if labels.len() != n_examples {
			return Err(TreeError::DimensionMismatch {
				feature_rows: n_examples,
				label_len: labels.len(),
			});
		}
		let min_examples = 2 * options.min_examples_per_node.max(1);
		if n_examples < min_examples {
			return Err(TreeError::NotEnoughExamples {
				min: min_examples,
				got: n_examples,
			});
		}
		if options.learning_rate <= 0.0 {
			return Err(TreeError::InvalidOption("learning_rate must be positive"));
		}
		if options.subsample <= 0.0 || options.subsample > 1.0 {
			return Err(TreeError::InvalidOption("subsample must be in (0, 1]"));
		}
		if options.max_depth == 0 {
			return Err(TreeError::InvalidOption("max_depth must be at least 1"));
		}
		if let Some(max_features) = options.max_features {
			if max_features == 0 || max_features > n_features {
				return Err(TreeError::InvalidOption(
					"max_features must be in 1..=n_features",
				));
			}
		}
		let mut rng = Xoshiro256Plus::seed_from_u64(options.seed);
		let bias = labels.iter().sum::<f64>() / n_examples as f64;
		let mut predictions = vec![bias; n_examples];
		let mut trees = Vec::with_capacity(options.max_rounds);
		let mut all_indices: Vec<usize> = (0..n_examples).collect();
		let n_sampled = ((n_examples as f64 * options.subsample).floor() as usize)
			.max(min_examples)
			.min(n_examples);
		for _ in 0..options.max_rounds {
			let residuals: Vec<f64> = labels
				.iter()
				.zip(predictions.iter())
				.map(|(label, prediction)| label - prediction)
				.collect();
			let round_indices: Vec<usize> = if n_sampled < n_examples {
				all_indices.shuffle(&mut rng);
				let mut sampled = all_indices[..n_sampled].to_vec();
				sampled.sort_unstable();
				sampled
			} else {
				all_indices.clone()
			};
			let mut nodes = Vec::new();
			build_node(
				features,
				&residuals,
				round_indices,
				1,
				options,
				&mut rng,
				&mut nodes,
			);
			let tree = Tree { nodes };
			// A tree that is a single zero-valued leaf contributes nothing.
			if let [Node::Leaf(leaf)] = tree.nodes.as_slice() {
				if leaf.value == 0.0 {
					break;
				}
			}
			for (example, prediction) in features.axis_iter(Axis(0)).zip(predictions.iter_mut()) {
				*prediction += tree.predict(example);
			}
			trees.push(tree);
		}
		Ok(Regressor {
			bias,
			trees,
			n_features,
		})
	}

	pub fn predict(&self, features: ArrayView2<f64>) -> Vec<f64> {
		features
			.axis_iter(Axis(0))
			.map(|example| {
				self.bias
					+ self
						.trees
						.iter()
						.map(|tree| tree.predict(example))
						.sum::<f64>()
			})
			.collect()
	}
}

struct Split {
	feature_index: usize,
	split_value: f64,
	gain: f64,
	n_left: usize,
}

/// Recursively grow one node of a tree and append it to `nodes`, returning its index.
fn build_node(
	features: ArrayView2<f64>,
	residuals: &[f64],
	indices: Vec<usize>,
	depth: usize,
	options: &TrainOptions,
	rng: &mut Xoshiro256Plus,
	nodes: &mut Vec<Node>,
) -> usize {
	let n = indices.len();
	let sum: f64 = indices.iter().map(|i| residuals[*i]).sum();
	let mean = sum / n as f64;
	let make_leaf = |nodes: &mut Vec<Node>| {
		let node_index = nodes.len();
		nodes.push(Node::Leaf(LeafNode {
			value: options.learning_rate * mean,
		}));
		node_index
	};
	if depth > options.max_depth || n < 2 * options.min_examples_per_node {
		return make_leaf(nodes);
	}
	let candidate_features = sample_features(features.ncols(), options.max_features, rng);
	let best_split = candidate_features
		.into_iter()
		.filter_map(|feature_index| {
			find_best_split(features, residuals, &indices, feature_index, options)
		})
		.fold(None::<Split>, |best, split| match best {
			Some(best) if best.gain >= split.gain => Some(best),
			_ => Some(split),
		});
	let split = match best_split {
		Some(split) if split.gain > 0.0 && split.gain >= options.min_gain_to_split => split,
		_ => return make_leaf(nodes),
	};
	let mut left_indices = Vec::with_capacity(split.n_left);
	let mut right_indices = Vec::with_capacity(n - split.n_left);
	for index in indices {
		if features[[index, split.feature_index]] <= split.split_value {
			left_indices.push(index);
		} else {
			right_indices.push(index);
		}
	}
	let node_index = nodes.len();
	nodes.push(Node::Branch(BranchNode {
		feature_index: split.feature_index,
		split_value: split.split_value,
		left_child_index: 0,
		right_child_index: 0,
	}));
	let left_child_index = build_node(
		features,
		residuals,
		left_indices,
		depth + 1,
		options,
		rng,
		nodes,
	);
	let right_child_index = build_node(
		features,
		residuals,
		right_indices,
		depth + 1,
		options,
		rng,
		nodes,
	);
	if let Node::Branch(branch) = &mut nodes[node_index] {
		branch.left_child_index = left_child_index;
		branch.right_child_index = right_child_index;
	}
	node_index
}

/// Find the split of `feature_index` that most reduces the sum of squared residuals, scanning examples in feature-value order.
fn find_best_split(
	features: ArrayView2<f64>,
	residuals: &[f64],
	indices: &[usize],
	feature_index: usize,
	options: &TrainOptions,
) -> Option<Split> {
	let n = indices.len();
	let mut sorted: Vec<(f64, f64)> = indices
		.iter()
		.map(|i| (features[[*i, feature_index]], residuals[*i]))
		.collect();
	sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
	let sum_total: f64 = sorted.iter().map(|(_, r)| r).sum();
	let score_total = sum_total * sum_total / n as f64;
	let mut sum_left = 0.0;
	let mut best: Option<Split> = None;
	for i in 0..n - 1 {
		sum_left += sorted[i].1;
		let n_left = i + 1;
		let n_right = n - n_left;
		if n_left < options.min_examples_per_node {
			continue;
		}
		if n_right < options.min_examples_per_node {
			break;
		}
		// No split point between identical feature values.
		if sorted[i].0 == sorted[i + 1].0 {
			continue;
		}
		let sum_right = sum_total - sum_left;
		let gain = sum_left * sum_left / n_left as f64 + sum_right * sum_right / n_right as f64
			- score_total;
		let is_better = match &best {
			Some(best) => gain > best.gain,
			None => true,
		};
		if is_better {
			best = Some(Split {
				feature_index,
				split_value: (sorted[i].0 + sorted[i + 1].0) / 2.0,
				gain,
				n_left,
			});
		}
	}
	best
}

fn sample_features(
	n_features: usize,
	max_features: Option<usize>,
	rng: &mut Xoshiro256Plus,
) -> Vec<usize> {
	match max_features {
		Some(max_features) if max_features < n_features => {
			let mut feature_indices: Vec<usize> = (0..n_features).collect();
			feature_indices.shuffle(rng);
			let mut sampled = feature_indices[..max_features].to_vec();
			sampled.sort_unstable();
			sampled
		}
		_ => (0..n_features).collect(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	fn step_data() -> (Array2<f64>, Vec<f64>) {
		let features = Array2::from_shape_vec(
			(8, 1),
			vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
		)
		.unwrap();
		let labels = vec![1.0, 1.0, 1.0, 1.0, 5.0, 5.0, 5.0, 5.0];
		(features, labels)
	}

	#[test]
	fn test_learns_step_function() {
		let (features, labels) = step_data();
		let options = TrainOptions {
			max_rounds: 50,
			max_depth: 2,
			learning_rate: 0.3,
			..Default::default()
		};
		let model = Regressor::train(features.view(), &labels, &options).unwrap();
		let predictions = model.predict(features.view());
		for (prediction, label) in predictions.iter().zip(labels.iter()) {
			assert_abs_diff_eq!(prediction, label, epsilon = 0.05);
		}
	}

	#[test]
	fn test_bias_is_label_mean() {
		let (features, labels) = step_data();
		let options = TrainOptions {
			max_rounds: 1,
			..Default::default()
		};
		let model = Regressor::train(features.view(), &labels, &options).unwrap();
		assert_abs_diff_eq!(model.bias, 3.0);
	}

	#[test]
	fn test_deterministic_for_seed() {
		let (features, labels) = step_data();
		let options = TrainOptions {
			max_rounds: 20,
			max_depth: 3,
			subsample: 0.75,
			max_features: Some(1),
			seed: 7,
			..Default::default()
		};
		let model_a = Regressor::train(features.view(), &labels, &options).unwrap();
		let model_b = Regressor::train(features.view(), &labels, &options).unwrap();
		assert_eq!(
			model_a.predict(features.view()),
			model_b.predict(features.view())
		);
	}

	#[test]
	fn test_constant_labels_stop_early() {
		let features =
			Array2::from_shape_vec((6, 1), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
		let labels = vec![2.0; 6];
		let options = TrainOptions {
			max_rounds: 10,
			..Default::default()
		};
		let model = Regressor::train(features.view(), &labels, &options).unwrap();
		assert!(model.trees.is_empty());
		assert_eq!(model.predict(features.view()), vec![2.0; 6]);
	}

	#[test]
	fn test_rejects_bad_options() {
		let (features, labels) = step_data();
		let options = TrainOptions {
			subsample: 0.0,
			..Default::default()
		};
		let result = Regressor::train(features.view(), &labels, &options);
		assert!(matches!(result, Err(TreeError::InvalidOption(_))));
	}

	#[test]
	fn test_rejects_tiny_datasets() {
		let features = Array2::from_shape_vec((2, 1), vec![1.0, 2.0]).unwrap();
		let labels = vec![1.0, 2.0];
		let result = Regressor::train(features.view(), &labels, &TrainOptions::default());
		assert!(matches!(result, Err(TreeError::NotEnoughExamples { .. })));
	}
}
