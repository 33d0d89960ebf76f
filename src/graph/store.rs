//! Read-only access to the complete backing graph.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::{debug, warn};

use super::error::GraphError;
use super::types::{Expansion, GraphData, GraphEdge, GraphNode};

/// Immutable, id-indexed view of the full graph. Never mutated after
/// construction; the visible subgraph only holds shared references into it.
#[derive(Debug, Default)]
pub struct GraphStore {
	nodes: Vec<Rc<GraphNode>>,
	edges: Vec<Rc<GraphEdge>>,
	node_index: HashMap<String, usize>,
	incident: HashMap<String, Vec<usize>>,
}

/// Outside filter producing the set for `replace_from_external_filter`.
#[derive(Clone, Debug, Default)]
pub struct GraphFilter {
	/// Keep only these groups. `None` keeps all.
	pub groups: Option<HashSet<String>>,
	/// Keep only edges of these relationship types. Never hides nodes.
	pub edge_kinds: Option<HashSet<String>>,
	/// Case-insensitive match against id, label and description.
	pub text: Option<String>,
}

impl GraphFilter {
	fn keeps_node(&self, node: &GraphNode) -> bool {
		if let Some(groups) = &self.groups {
			if !groups.contains(&node.group) {
				return false;
			}
		}
		match self.text.as_deref().map(str::trim) {
			None | Some("") => true,
			Some(text) => {
				let needle = text.to_lowercase();
				node.id.to_lowercase().contains(&needle)
					|| node.display_label().to_lowercase().contains(&needle)
					|| node
						.description
						.as_deref()
						.is_some_and(|d| d.to_lowercase().contains(&needle))
			}
		}
	}

	fn keeps_edge(&self, edge: &GraphEdge) -> bool {
		self.edge_kinds
			.as_ref()
			.is_none_or(|kinds| kinds.contains(&edge.kind))
	}
}

impl GraphStore {
	/// Index a snapshot. Duplicate node ids keep the first record; self-loops,
	/// dangling edges and duplicate edge ids are dropped.
	pub fn from_data(data: GraphData) -> Self {
		let mut store = Self::default();

		for node in data.nodes {
			if store.node_index.contains_key(&node.id) {
				warn!("duplicate node id {:?} ignored", node.id);
				continue;
			}
			store.node_index.insert(node.id.clone(), store.nodes.len());
			store.nodes.push(Rc::new(node));
		}

		let mut edge_ids = HashSet::new();
		for mut edge in data.edges {
			if edge.id.is_empty() {
				edge.id = edge.derived_id();
			}
			if edge.is_self_loop() {
				warn!("self-referential edge {:?} dropped", edge.id);
				continue;
			}
			if !store.node_index.contains_key(&edge.source)
				|| !store.node_index.contains_key(&edge.target)
			{
				warn!("dangling edge {:?} dropped", edge.id);
				continue;
			}
			if !edge_ids.insert(edge.id.clone()) {
				warn!("duplicate edge id {:?} ignored", edge.id);
				continue;
			}
			let idx = store.edges.len();
			store.incident.entry(edge.source.clone()).or_default().push(idx);
			store.incident.entry(edge.target.clone()).or_default().push(idx);
			store.edges.push(Rc::new(edge));
		}

		debug!(
			"graph store: {} nodes, {} edges",
			store.nodes.len(),
			store.edges.len()
		);
		store
	}

	/// Parse a JSON snapshot (`{nodes, edges}`).
	pub fn from_json(json: &str) -> Result<Self, GraphError> {
		let data: GraphData = serde_json::from_str(json).map_err(GraphError::Snapshot)?;
		Ok(Self::from_data(data))
	}

	/// Record for `id`.
	pub fn node(&self, id: &str) -> Option<&Rc<GraphNode>> {
		self.node_index.get(id).map(|&i| &self.nodes[i])
	}

	/// All nodes in snapshot order.
	pub fn nodes(&self) -> &[Rc<GraphNode>] {
		&self.nodes
	}

	/// All valid edges in snapshot order.
	pub fn edges(&self) -> &[Rc<GraphEdge>] {
		&self.edges
	}

	/// Node count.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// True when the store has no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Nodes without incoming edges, in snapshot order. A graph made only of
	/// cycles falls back to its first node.
	pub fn roots(&self) -> Vec<Rc<GraphNode>> {
		let targets: HashSet<&str> = self.edges.iter().map(|e| e.target.as_str()).collect();
		let roots: Vec<_> = self
			.nodes
			.iter()
			.filter(|n| !targets.contains(n.id.as_str()))
			.cloned()
			.collect();
		if roots.is_empty() {
			self.nodes.first().cloned().into_iter().collect()
		} else {
			roots
		}
	}

	/// Edges touching `id`, or `None` when `id` is not in the store.
	pub fn incident_edges(&self, id: &str) -> Option<Vec<Rc<GraphEdge>>> {
		self.node_index.get(id)?;
		Some(
			self.incident
				.get(id)
				.map(|idxs| idxs.iter().map(|&i| self.edges[i].clone()).collect())
				.unwrap_or_default(),
		)
	}

	/// Opposite endpoints of every incident edge, deduplicated, in edge order.
	pub fn children(&self, id: &str) -> Option<Vec<Rc<GraphNode>>> {
		let edges = self.incident_edges(id)?;
		let mut seen = HashSet::new();
		Some(
			edges
				.iter()
				.filter_map(|e| e.other_end(id))
				.filter(|other| seen.insert(*other))
				.filter_map(|other| self.node(other).cloned())
				.collect(),
		)
	}

	/// Children and incident edges of `id` in one query.
	pub fn expansion(&self, id: &str) -> Option<Expansion> {
		Some(Expansion {
			nodes: self.children(id)?,
			edges: self.incident_edges(id)?,
		})
	}

	/// Nodes passing `filter` and the edges between them.
	pub fn filtered(&self, filter: &GraphFilter) -> (Vec<Rc<GraphNode>>, Vec<Rc<GraphEdge>>) {
		let nodes: Vec<_> = self
			.nodes
			.iter()
			.filter(|n| filter.keeps_node(n))
			.cloned()
			.collect();
		let kept: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
		let edges = self
			.edges
			.iter()
			.filter(|e| filter.keeps_edge(e))
			.filter(|e| kept.contains(e.source.as_str()) && kept.contains(e.target.as_str()))
			.cloned()
			.collect();
		(nodes, edges)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> GraphStore {
		GraphStore::from_data(GraphData {
			nodes: vec![
				GraphNode::new("A", "Service"),
				GraphNode::new("B", "Service"),
				GraphNode::new("C", "Ticket").with_label("Outage"),
				GraphNode::new("D", "User"),
				GraphNode::new("A", "Duplicate"),
			],
			edges: vec![
				GraphEdge::new("e1", "A", "C", "HAS"),
				GraphEdge::new("e2", "A", "D", "OWNED_BY"),
				GraphEdge::new("loop", "A", "A", "SELF"),
				GraphEdge::new("dangling", "A", "Z", "HAS"),
				GraphEdge::new("e1", "B", "C", "HAS"),
				GraphEdge::new("", "D", "C", "CREATED"),
			],
		})
	}

	#[test]
	fn drops_malformed_records() {
		let store = sample();
		assert_eq!(store.len(), 4);
		assert_eq!(store.node("A").unwrap().group, "Service");
		let ids: Vec<_> = store.edges().iter().map(|e| e.id.as_str()).collect();
		assert_eq!(ids, ["e1", "e2", "D-CREATED-C"]);
	}

	#[test]
	fn roots_have_no_incoming_edges() {
		let store = sample();
		let roots: Vec<_> = store.roots().iter().map(|n| n.id.clone()).collect();
		assert_eq!(roots, ["A", "B"]);
	}

	#[test]
	fn cyclic_graph_roots_at_first_node() {
		let store = GraphStore::from_data(GraphData {
			nodes: vec![GraphNode::new("x", "G"), GraphNode::new("y", "G")],
			edges: vec![
				GraphEdge::new("xy", "x", "y", "R"),
				GraphEdge::new("yx", "y", "x", "R"),
			],
		});
		let roots: Vec<_> = store.roots().iter().map(|n| n.id.clone()).collect();
		assert_eq!(roots, ["x"]);
	}

	#[test]
	fn children_follow_both_directions() {
		let store = sample();
		let children: Vec<_> = store.children("C").unwrap().iter().map(|n| n.id.clone()).collect();
		assert_eq!(children, ["A", "D"]);
		assert!(store.children("B").unwrap().is_empty());
		assert!(store.expansion("missing").is_none());
	}

	#[test]
	fn filter_by_group_and_text() {
		let store = sample();
		let filter = GraphFilter {
			groups: Some(["Service".to_string(), "Ticket".to_string()].into()),
			..Default::default()
		};
		let (nodes, edges) = store.filtered(&filter);
		assert_eq!(nodes.len(), 3);
		assert_eq!(edges.len(), 1);

		let filter = GraphFilter {
			text: Some("outage".into()),
			..Default::default()
		};
		let (nodes, edges) = store.filtered(&filter);
		assert_eq!(nodes.len(), 1);
		assert!(edges.is_empty());
	}

	#[test]
	fn edge_kind_filter_keeps_nodes() {
		let store = sample();
		let filter = GraphFilter {
			edge_kinds: Some(["HAS".to_string()].into()),
			..Default::default()
		};
		let (nodes, edges) = store.filtered(&filter);
		assert_eq!(nodes.len(), 4);
		assert_eq!(edges.len(), 1);
	}

	#[test]
	fn parse_error_is_reported() {
		assert!(matches!(
			GraphStore::from_json("{not json"),
			Err(GraphError::Snapshot(_))
		));
	}
}
