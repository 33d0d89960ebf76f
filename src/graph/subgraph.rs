//! The visible subgraph and the materializer that grows it.

use std::collections::{HashMap, HashSet};
use std::f64::consts::{PI, TAU};
use std::rc::Rc;

use log::{debug, warn};
use rand::Rng;

use super::types::{Expansion, GraphEdge, GraphNode, NodeId};
use super::viewport::Bounds;

/// A node laid out by the simulation.
#[derive(Clone, Debug)]
pub struct VisibleNode {
	/// Shared store record.
	pub data: Rc<GraphNode>,
	/// Graph-space position.
	pub x: f64,
	/// Graph-space position.
	pub y: f64,
	/// Velocity carried between ticks.
	pub vx: f64,
	/// Velocity carried between ticks.
	pub vy: f64,
	/// Position is driven by a drag, not by forces.
	pub pinned: bool,
}

impl VisibleNode {
	fn at(data: Rc<GraphNode>, x: f64, y: f64) -> Self {
		Self {
			data,
			x,
			y,
			vx: 0.0,
			vy: 0.0,
			pinned: false,
		}
	}

	/// Node id.
	pub fn id(&self) -> &str {
		&self.data.id
	}
}

/// An edge whose endpoints are both visible. `source`/`target` index into
/// the visible node list.
#[derive(Clone, Debug)]
pub struct VisibleEdge {
	/// Shared store record.
	pub data: Rc<GraphEdge>,
	/// Index of the source in [`VisibleSubgraph::nodes`].
	pub source: usize,
	/// Index of the target in [`VisibleSubgraph::nodes`].
	pub target: usize,
}

/// Node and edge sets currently laid out and rendered. Ids are unique and
/// every edge has both endpoints present.
#[derive(Clone, Debug, Default)]
pub struct VisibleSubgraph {
	nodes: Vec<VisibleNode>,
	edges: Vec<VisibleEdge>,
	node_index: HashMap<NodeId, usize>,
	edge_ids: HashSet<String>,
}

impl VisibleSubgraph {
	/// Visible nodes in insertion order.
	pub fn nodes(&self) -> &[VisibleNode] {
		&self.nodes
	}

	/// Mutable access for the simulation and drags.
	pub fn nodes_mut(&mut self) -> &mut [VisibleNode] {
		&mut self.nodes
	}

	/// Visible edges in insertion order.
	pub fn edges(&self) -> &[VisibleEdge] {
		&self.edges
	}

	/// Mutable positions alongside the (immutable) edge list.
	pub fn split_mut(&mut self) -> (&mut [VisibleNode], &[VisibleEdge]) {
		(&mut self.nodes, &self.edges)
	}

	/// Node count.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// True when nothing is visible.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Whether node `id` is visible.
	pub fn contains_node(&self, id: &str) -> bool {
		self.node_index.contains_key(id)
	}

	/// Whether edge `id` is visible.
	pub fn contains_edge(&self, id: &str) -> bool {
		self.edge_ids.contains(id)
	}

	/// Visible node `id`.
	pub fn node(&self, id: &str) -> Option<&VisibleNode> {
		self.node_index.get(id).map(|&i| &self.nodes[i])
	}

	/// Mutable visible node `id`.
	pub fn node_mut(&mut self, id: &str) -> Option<&mut VisibleNode> {
		self.node_index.get(id).map(|&i| &mut self.nodes[i])
	}

	/// Ids of nodes sharing a visible edge with `id`.
	pub fn neighbors(&self, id: &str) -> HashSet<&str> {
		let Some(&idx) = self.node_index.get(id) else {
			return HashSet::new();
		};
		self.edges
			.iter()
			.filter_map(|e| {
				if e.source == idx {
					Some(self.nodes[e.target].id())
				} else if e.target == idx {
					Some(self.nodes[e.source].id())
				} else {
					None
				}
			})
			.collect()
	}

	/// Box around every visible position.
	pub fn bounds(&self) -> Option<Bounds> {
		Bounds::from_points(self.nodes.iter().map(|n| (n.x, n.y)))
	}

	fn clear(&mut self) {
		self.nodes.clear();
		self.edges.clear();
		self.node_index.clear();
		self.edge_ids.clear();
	}

	fn push_node(&mut self, node: VisibleNode) -> bool {
		if self.node_index.contains_key(node.id()) {
			return false;
		}
		self.node_index.insert(node.data.id.clone(), self.nodes.len());
		self.nodes.push(node);
		true
	}

	/// Admit `edge` if it is new, not a self-loop, and both ends are visible.
	fn push_edge(&mut self, edge: Rc<GraphEdge>) -> bool {
		if self.edge_ids.contains(&edge.id) {
			return false;
		}
		if edge.is_self_loop() {
			warn!("self-referential edge {:?} discarded", edge.id);
			return false;
		}
		let (Some(&source), Some(&target)) = (
			self.node_index.get(&edge.source),
			self.node_index.get(&edge.target),
		) else {
			warn!("edge {:?} has an endpoint outside the view, discarded", edge.id);
			return false;
		};
		self.edge_ids.insert(edge.id.clone());
		self.edges.push(VisibleEdge {
			data: edge,
			source,
			target,
		});
		true
	}
}

/// Proof that an expansion was requested against a given subgraph generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpandTicket {
	node: NodeId,
	generation: u64,
}

impl ExpandTicket {
	/// The node being expanded.
	pub fn node(&self) -> &str {
		&self.node
	}
}

/// What an expansion did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpandOutcome {
	/// Children merged in; counts are newly admitted records.
	Merged {
		/// Nodes newly shown.
		nodes: usize,
		/// Edges newly shown.
		edges: usize,
	},
	/// The node had already been expanded.
	AlreadyExpanded,
	/// A fetch for this node is still outstanding.
	Pending,
	/// The node is not in the visible subgraph.
	NotVisible,
	/// The backing store does not know the node.
	Unknown,
	/// The subgraph was reset while the fetch was outstanding.
	Stale,
}

/// Owns the visible subgraph, the expansion state and the generation counter
/// used to discard late expansion results.
#[derive(Debug, Default)]
pub struct Materializer {
	visible: VisibleSubgraph,
	expanded: HashSet<NodeId>,
	pending: HashSet<NodeId>,
	generation: u64,
}

/// Place `count` nodes evenly on a circle around `center`.
fn circle_position(i: usize, count: usize, center: (f64, f64), radius: f64) -> (f64, f64) {
	let angle = (i as f64) * 2.0 * PI / count.max(1) as f64;
	(
		center.0 + radius * angle.cos(),
		center.1 + radius * angle.sin(),
	)
}

impl Materializer {
	/// What is currently shown.
	pub fn visible(&self) -> &VisibleSubgraph {
		&self.visible
	}

	/// Mutable view, for the layout and for drags.
	pub fn visible_mut(&mut self) -> &mut VisibleSubgraph {
		&mut self.visible
	}

	/// Whether `id` has been expanded since the last reset.
	pub fn is_expanded(&self, id: &str) -> bool {
		self.expanded.contains(id)
	}

	/// Every expanded node id.
	pub fn expanded(&self) -> &HashSet<NodeId> {
		&self.expanded
	}

	/// Bumped on every reset. Tickets from older generations are stale.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	fn reset(&mut self) {
		self.visible.clear();
		self.expanded.clear();
		self.pending.clear();
		self.generation += 1;
	}

	/// Replace the view with `roots` and no edges.
	pub fn initialize(
		&mut self,
		roots: impl IntoIterator<Item = Rc<GraphNode>>,
		center: (f64, f64),
		radius: f64,
	) {
		self.reset();
		let mut seen = HashSet::new();
		let roots: Vec<_> = roots.into_iter().filter(|n| seen.insert(n.id.clone())).collect();
		let count = roots.len();
		for (i, node) in roots.into_iter().enumerate() {
			let (x, y) = circle_position(i, count, center, radius);
			self.visible.push_node(VisibleNode::at(node, x, y));
		}
		debug!("subgraph initialized with {count} roots");
	}

	/// Wholesale replacement from an outside filter. Expansion state is
	/// cleared; nodes already on screen keep their position.
	pub fn replace_from_external_filter(
		&mut self,
		nodes: impl IntoIterator<Item = Rc<GraphNode>>,
		edges: impl IntoIterator<Item = Rc<GraphEdge>>,
		center: (f64, f64),
		radius: f64,
	) {
		let previous: HashMap<NodeId, (f64, f64)> = self
			.visible
			.nodes
			.iter()
			.map(|n| (n.data.id.clone(), (n.x, n.y)))
			.collect();
		self.reset();

		let mut seen = HashSet::new();
		let nodes: Vec<_> = nodes.into_iter().filter(|n| seen.insert(n.id.clone())).collect();
		let count = nodes.len();
		for (i, node) in nodes.into_iter().enumerate() {
			let (x, y) = previous
				.get(&node.id)
				.copied()
				.unwrap_or_else(|| circle_position(i, count, center, radius));
			self.visible.push_node(VisibleNode::at(node, x, y));
		}
		for edge in edges {
			self.visible.push_edge(edge);
		}
		debug!(
			"subgraph replaced: {} nodes, {} edges",
			self.visible.nodes.len(),
			self.visible.edges.len()
		);
	}

	/// Start an expansion of `id`. The returned ticket must be handed back to
	/// [`Materializer::complete_expand`] with the fetched children.
	pub fn request_expand(&mut self, id: &str) -> Result<ExpandTicket, ExpandOutcome> {
		if self.expanded.contains(id) {
			return Err(ExpandOutcome::AlreadyExpanded);
		}
		if !self.visible.contains_node(id) {
			return Err(ExpandOutcome::NotVisible);
		}
		if !self.pending.insert(id.to_owned()) {
			return Err(ExpandOutcome::Pending);
		}
		Ok(ExpandTicket {
			node: id.to_owned(),
			generation: self.generation,
		})
	}

	/// Drop an outstanding request without marking the node expanded.
	pub fn abandon(&mut self, ticket: ExpandTicket) {
		if ticket.generation == self.generation {
			self.pending.remove(&ticket.node);
		}
	}

	/// Merge fetched children for `ticket`. Children already visible and
	/// edges already visible are skipped; new children spawn near the parent.
	pub fn complete_expand<R: Rng>(
		&mut self,
		ticket: ExpandTicket,
		expansion: Expansion,
		rng: &mut R,
		jitter: f64,
	) -> ExpandOutcome {
		if ticket.generation != self.generation {
			debug!("discarding stale expansion of {:?}", ticket.node);
			return ExpandOutcome::Stale;
		}
		self.pending.remove(&ticket.node);
		let Some(parent) = self.visible.node(&ticket.node) else {
			return ExpandOutcome::NotVisible;
		};
		let (px, py) = (parent.x, parent.y);
		self.expanded.insert(ticket.node.clone());

		let mut added_nodes = 0;
		for child in expansion.nodes {
			if self.visible.contains_node(&child.id) {
				continue;
			}
			let angle = rng.random_range(0.0..TAU);
			let r = jitter * rng.random::<f64>();
			let node = VisibleNode::at(child, px + r * angle.cos(), py + r * angle.sin());
			if self.visible.push_node(node) {
				added_nodes += 1;
			}
		}

		let mut added_edges = 0;
		for edge in expansion.edges {
			if edge.other_end(&ticket.node).is_none() {
				warn!(
					"edge {:?} does not touch {:?}, discarded",
					edge.id, ticket.node
				);
				continue;
			}
			if self.visible.push_edge(edge) {
				added_edges += 1;
			}
		}

		debug!(
			"expanded {:?}: +{added_nodes} nodes, +{added_edges} edges",
			ticket.node
		);
		ExpandOutcome::Merged {
			nodes: added_nodes,
			edges: added_edges,
		}
	}
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	use super::*;

	fn node(id: &str) -> Rc<GraphNode> {
		Rc::new(GraphNode::new(id, "G"))
	}

	fn edge(id: &str, s: &str, t: &str) -> Rc<GraphEdge> {
		Rc::new(GraphEdge::new(id, s, t, "R"))
	}

	fn ids(sub: &VisibleSubgraph) -> Vec<&str> {
		sub.nodes().iter().map(VisibleNode::id).collect()
	}

	#[test]
	fn initialize_dedups_roots() {
		let mut m = Materializer::default();
		m.initialize([node("A"), node("B"), node("A")], (0.0, 0.0), 100.0);
		assert_eq!(ids(m.visible()), ["A", "B"]);
		assert!(m.visible().edges().is_empty());
	}

	#[test]
	fn children_spawn_near_parent() {
		let mut m = Materializer::default();
		let mut rng = StdRng::seed_from_u64(7);
		m.initialize([node("A")], (500.0, 500.0), 100.0);
		let ticket = m.request_expand("A").unwrap();
		let expansion = Expansion {
			nodes: vec![node("C"), node("D")],
			edges: vec![edge("e1", "A", "C"), edge("e2", "A", "D")],
		};
		let outcome = m.complete_expand(ticket, expansion, &mut rng, 30.0);
		assert_eq!(outcome, ExpandOutcome::Merged { nodes: 2, edges: 2 });

		let parent = m.visible().node("A").unwrap();
		for child in ["C", "D"] {
			let c = m.visible().node(child).unwrap();
			let d = ((c.x - parent.x).powi(2) + (c.y - parent.y).powi(2)).sqrt();
			assert!(d <= 30.0, "{child} spawned {d} away");
		}
	}

	#[test]
	fn malformed_edges_are_discarded() {
		let mut m = Materializer::default();
		let mut rng = StdRng::seed_from_u64(1);
		m.initialize([node("A"), node("B")], (0.0, 0.0), 100.0);
		let ticket = m.request_expand("A").unwrap();
		let expansion = Expansion {
			nodes: vec![node("C")],
			edges: vec![
				edge("loop", "A", "A"),
				edge("ghost", "A", "Z"),
				edge("other", "B", "C"),
				edge("ok", "C", "A"),
			],
		};
		let outcome = m.complete_expand(ticket, expansion, &mut rng, 30.0);
		assert_eq!(outcome, ExpandOutcome::Merged { nodes: 1, edges: 1 });
		assert!(m.visible().contains_edge("ok"));
	}

	#[test]
	fn second_request_while_pending() {
		let mut m = Materializer::default();
		m.initialize([node("A")], (0.0, 0.0), 100.0);
		let _ticket = m.request_expand("A").unwrap();
		assert_eq!(m.request_expand("A"), Err(ExpandOutcome::Pending));
		assert_eq!(m.request_expand("B"), Err(ExpandOutcome::NotVisible));
	}

	#[test]
	fn reset_makes_ticket_stale() {
		let mut m = Materializer::default();
		let mut rng = StdRng::seed_from_u64(1);
		m.initialize([node("A")], (0.0, 0.0), 100.0);
		let ticket = m.request_expand("A").unwrap();
		m.initialize([node("A")], (0.0, 0.0), 100.0);
		let expansion = Expansion {
			nodes: vec![node("C")],
			edges: vec![edge("e1", "A", "C")],
		};
		assert_eq!(
			m.complete_expand(ticket, expansion, &mut rng, 30.0),
			ExpandOutcome::Stale
		);
		assert_eq!(m.visible().len(), 1);
		assert!(!m.is_expanded("A"));
	}

	#[test]
	fn replace_keeps_positions_and_clears_expansion() {
		let mut m = Materializer::default();
		let mut rng = StdRng::seed_from_u64(3);
		m.initialize([node("A")], (0.0, 0.0), 100.0);
		let ticket = m.request_expand("A").unwrap();
		m.complete_expand(
			ticket,
			Expansion {
				nodes: vec![node("B")],
				edges: vec![edge("e", "A", "B")],
			},
			&mut rng,
			30.0,
		);
		let b = m.visible().node("B").map(|n| (n.x, n.y)).unwrap();

		m.replace_from_external_filter(
			[node("B"), node("C"), node("B")],
			[edge("bc", "B", "C"), edge("ab", "A", "B")],
			(0.0, 0.0),
			100.0,
		);
		assert_eq!(ids(m.visible()), ["B", "C"]);
		assert_eq!(m.visible().edges().len(), 1);
		assert_eq!(m.visible().node("B").map(|n| (n.x, n.y)), Some(b));
		assert!(m.expanded().is_empty());
	}

	#[test]
	fn neighbors_and_bounds() {
		let mut m = Materializer::default();
		m.replace_from_external_filter(
			[node("A"), node("B"), node("C")],
			[edge("ab", "A", "B")],
			(0.0, 0.0),
			10.0,
		);
		let n = m.visible().neighbors("A");
		assert!(n.contains("B"));
		assert_eq!(n.len(), 1);
		let b = m.visible().bounds().unwrap();
		assert!((b.max_x - 10.0).abs() < 1e-9);
	}
}
