use ndarray::prelude::*;

/// A single decision tree. Nodes are laid out in a `Vec` and branches refer to their children by index. The root is at index 0.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Tree {
	pub nodes: Vec<Node>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum Node {
	Branch(BranchNode),
	Leaf(LeafNode),
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct BranchNode {
	pub feature_index: usize,
	/// Examples with feature value <= `split_value` go left.
	pub split_value: f64,
	pub left_child_index: usize,
	pub right_child_index: usize,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LeafNode {
	/// The value to add to the prediction. The learning rate is already folded in.
	pub value: f64,
}

impl Tree {
	pub fn predict(&self, example: ArrayView1<f64>) -> f64 {
		let mut node_index = 0;
		loop {
			match &self.nodes[node_index] {
				Node::Leaf(leaf) => return leaf.value,
				Node::Branch(branch) => {
					node_index = if example[branch.feature_index] <= branch.split_value {
						branch.left_child_index
					} else {
						branch.right_child_index
					};
				}
			}
		}
	}
}
