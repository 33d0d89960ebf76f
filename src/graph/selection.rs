//! Which nodes the user has picked.

use std::collections::HashSet;

use super::subgraph::VisibleSubgraph;
use super::types::NodeId;

/// Selected node ids in the order they were selected. Rendering only; the
/// layout never reads it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
	ids: Vec<NodeId>,
}

impl Selection {
	/// Whether `id` is selected.
	pub fn contains(&self, id: &str) -> bool {
		self.ids.iter().any(|s| s == id)
	}

	/// Add `id` if absent, remove it if present. Returns whether it is now
	/// selected.
	pub fn toggle(&mut self, id: &str) -> bool {
		if let Some(pos) = self.ids.iter().position(|s| s == id) {
			self.ids.remove(pos);
			false
		} else {
			self.ids.push(id.to_owned());
			true
		}
	}

	/// Returns whether anything was selected.
	pub fn clear(&mut self) -> bool {
		let had = !self.ids.is_empty();
		self.ids.clear();
		had
	}

	/// True when nothing is selected.
	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	/// Selected ids, oldest first.
	pub fn ids(&self) -> &[NodeId] {
		&self.ids
	}

	/// Most recently selected id, shown by the details panel.
	pub fn primary(&self) -> Option<&str> {
		self.ids.last().map(String::as_str)
	}

	/// Selected ids plus their visible neighbors.
	pub fn highlighted<'a>(&'a self, graph: &'a VisibleSubgraph) -> HashSet<&'a str> {
		let mut out: HashSet<&str> = self.ids.iter().map(String::as_str).collect();
		for id in &self.ids {
			out.extend(graph.neighbors(id));
		}
		out
	}
}
