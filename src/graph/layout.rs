//! Force-directed layout over the visible subgraph.
//!
//! A cooling simulation: every force is scaled by `alpha`, which decays
//! toward `alpha_target` each tick. Once it drops below `alpha_min` the
//! layout goes idle and ticks are free until something re-heats it.

use log::trace;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::subgraph::{VisibleEdge, VisibleNode, VisibleSubgraph};

const ALPHA_MAX: f64 = 1.0;

/// Tuning for the simulation. Values are engine configuration, not derived
/// from the data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	/// Below this alpha the layout is idle.
	pub alpha_min: f64,
	/// Fraction of the gap to `alpha_target` closed per tick.
	pub alpha_decay: f64,
	/// Fraction of velocity lost per tick.
	pub velocity_decay: f64,
	/// Rest length of every edge spring.
	pub link_distance: f64,
	/// Spring stiffness, `0..=1`.
	pub link_strength: f64,
	/// Strength of the pairwise inverse-square push.
	pub repulsion: f64,
	/// Repulsion is computed as if nodes were at least this far apart.
	pub repulsion_distance_min: f64,
	/// Pull toward the layout center.
	pub centering: f64,
	/// Visual radius; collisions keep centers `2 * node_radius` apart.
	pub node_radius: f64,
	/// How much of an overlap is resolved per tick.
	pub collision_strength: f64,
	/// Alpha target held while a node is dragged.
	pub drag_alpha_target: f64,
	/// Radius of the circle roots are placed on.
	pub spawn_radius: f64,
	/// Max distance between a parent and its freshly revealed children.
	pub spawn_jitter: f64,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		let alpha_min: f64 = 0.001;
		Self {
			alpha_min,
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			velocity_decay: 0.4,
			link_distance: 60.0,
			link_strength: 0.7,
			repulsion: 300.0,
			repulsion_distance_min: 1.0,
			centering: 0.05,
			node_radius: 8.0,
			collision_strength: 0.7,
			drag_alpha_target: 0.3,
			spawn_radius: 100.0,
			spawn_jitter: 30.0,
		}
	}
}

/// Whether [`ForceLayout::tick`] still moves nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutState {
	/// Cooled down; ticks do nothing.
	Idle,
	/// Still settling.
	Running,
}

/// Cooling force simulation over a [`VisibleSubgraph`].
#[derive(Clone, Debug)]
pub struct ForceLayout {
	config: LayoutConfig,
	alpha: f64,
	alpha_target: f64,
	center: (f64, f64),
}

fn jiggle<R: Rng>(rng: &mut R) -> f64 {
	(rng.random::<f64>() - 0.5) * 1e-6
}

impl ForceLayout {
	/// Idle layout pulling toward `center`.
	pub fn new(config: LayoutConfig, center: (f64, f64)) -> Self {
		Self {
			config,
			alpha: 0.0,
			alpha_target: 0.0,
			center,
		}
	}

	/// Tuning in use.
	pub fn config(&self) -> &LayoutConfig {
		&self.config
	}

	/// Current energy.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Point the centering force pulls toward, in graph space.
	pub fn center(&self) -> (f64, f64) {
		self.center
	}

	/// Move the centering target.
	pub fn set_center(&mut self, center: (f64, f64)) {
		self.center = center;
	}

	/// Reset energy to its maximum.
	pub fn reheat(&mut self) {
		self.alpha = ALPHA_MAX;
	}

	/// Level alpha decays toward. Non-zero keeps the layout running.
	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target.clamp(0.0, ALPHA_MAX);
	}

	/// Drop straight to idle.
	pub fn stop(&mut self) {
		self.alpha = 0.0;
		self.alpha_target = 0.0;
	}

	/// Running while alpha or its target is above `alpha_min`.
	pub fn state(&self) -> LayoutState {
		if self.alpha >= self.config.alpha_min || self.alpha_target >= self.config.alpha_min {
			LayoutState::Running
		} else {
			LayoutState::Idle
		}
	}

	/// Advance one step. Returns the state after the step.
	pub fn tick<R: Rng>(&mut self, graph: &mut VisibleSubgraph, rng: &mut R) -> LayoutState {
		if self.state() == LayoutState::Idle {
			return LayoutState::Idle;
		}
		let (nodes, edges) = graph.split_mut();
		match nodes.len() {
			0 => {
				self.alpha = 0.0;
				return LayoutState::Idle;
			}
			1 => {
				let only = &mut nodes[0];
				if !only.pinned {
					(only.x, only.y) = self.center;
				}
				only.vx = 0.0;
				only.vy = 0.0;
				self.alpha = 0.0;
				return self.state();
			}
			_ => {}
		}

		let alpha = self.alpha;
		self.apply_links(nodes, edges, alpha, rng);
		self.apply_repulsion(nodes, alpha, rng);
		self.apply_centering(nodes, alpha);
		self.apply_collision(nodes, rng);
		self.integrate(nodes);

		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
		if self.alpha < self.config.alpha_min && self.alpha_target < self.config.alpha_min {
			self.alpha = 0.0;
		}
		trace!("layout tick: alpha={:.4}", self.alpha);
		self.state()
	}

	fn apply_links<R: Rng>(
		&self,
		nodes: &mut [VisibleNode],
		edges: &[VisibleEdge],
		alpha: f64,
		rng: &mut R,
	) {
		for edge in edges {
			let (s, t) = (&nodes[edge.source], &nodes[edge.target]);
			let mut dx = t.x + t.vx - s.x - s.vx;
			let mut dy = t.y + t.vy - s.y - s.vy;
			if dx == 0.0 && dy == 0.0 {
				dx = jiggle(rng);
				dy = jiggle(rng);
			}
			let l = dx.hypot(dy);
			let f = (l - self.config.link_distance) / l * alpha * self.config.link_strength;
			let (fx, fy) = (dx * f * 0.5, dy * f * 0.5);

			let t = &mut nodes[edge.target];
			t.vx -= fx;
			t.vy -= fy;
			let s = &mut nodes[edge.source];
			s.vx += fx;
			s.vy += fy;
		}
	}

	fn apply_repulsion<R: Rng>(&self, nodes: &mut [VisibleNode], alpha: f64, rng: &mut R) {
		let min2 = self.config.repulsion_distance_min.powi(2);
		for i in 0..nodes.len() {
			for j in (i + 1)..nodes.len() {
				let mut dx = nodes[j].x - nodes[i].x;
				let mut dy = nodes[j].y - nodes[i].y;
				if dx == 0.0 && dy == 0.0 {
					dx = jiggle(rng);
					dy = jiggle(rng);
				}
				let d2 = (dx * dx + dy * dy).max(min2);
				let w = self.config.repulsion * alpha / d2;
				nodes[i].vx -= dx * w;
				nodes[i].vy -= dy * w;
				nodes[j].vx += dx * w;
				nodes[j].vy += dy * w;
			}
		}
	}

	fn apply_centering(&self, nodes: &mut [VisibleNode], alpha: f64) {
		let (cx, cy) = self.center;
		let k = self.config.centering * alpha;
		for node in nodes.iter_mut() {
			node.vx += (cx - node.x) * k;
			node.vy += (cy - node.y) * k;
		}
	}

	/// Push overlapping pairs apart. A pinned node does not yield, so the
	/// other node takes the whole correction.
	fn apply_collision<R: Rng>(&self, nodes: &mut [VisibleNode], rng: &mut R) {
		let r = self.config.node_radius * 2.0;
		for i in 0..nodes.len() {
			for j in (i + 1)..nodes.len() {
				let (a, b) = (&nodes[i], &nodes[j]);
				let mut dx = b.x + b.vx - a.x - a.vx;
				let mut dy = b.y + b.vy - a.y - a.vy;
				if dx == 0.0 && dy == 0.0 {
					dx = jiggle(rng);
					dy = jiggle(rng);
				}
				let d = dx.hypot(dy);
				if d >= r {
					continue;
				}
				let push = (r - d) / d * self.config.collision_strength;
				let (wa, wb) = match (a.pinned, b.pinned) {
					(true, true) => continue,
					(true, false) => (0.0, 1.0),
					(false, true) => (1.0, 0.0),
					(false, false) => (0.5, 0.5),
				};
				nodes[i].vx -= dx * push * wa;
				nodes[i].vy -= dy * push * wa;
				nodes[j].vx += dx * push * wb;
				nodes[j].vy += dy * push * wb;
			}
		}
	}

	/// Pinned nodes are skipped: their dragged position is authoritative.
	fn integrate(&self, nodes: &mut [VisibleNode]) {
		let keep = 1.0 - self.config.velocity_decay;
		for node in nodes.iter_mut() {
			if node.pinned {
				node.vx = 0.0;
				node.vy = 0.0;
				continue;
			}
			node.vx *= keep;
			node.vy *= keep;
			node.x += node.vx;
			node.y += node.vy;
		}
	}
}

#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use rand::SeedableRng;
	use rand::rngs::StdRng;

	use super::*;
	use crate::graph::subgraph::Materializer;
	use crate::graph::types::{GraphEdge, GraphNode};

	fn subgraph(ids: &[&str], links: &[(&str, &str)]) -> Materializer {
		let mut m = Materializer::default();
		m.replace_from_external_filter(
			ids.iter().map(|id| Rc::new(GraphNode::new(*id, "G"))),
			links
				.iter()
				.map(|(s, t)| Rc::new(GraphEdge::new(format!("{s}{t}"), *s, *t, "R"))),
			(0.0, 0.0),
			100.0,
		);
		m
	}

	fn place(m: &mut Materializer, id: &str, x: f64, y: f64) {
		let n = m.visible_mut().node_mut(id).unwrap();
		(n.x, n.y) = (x, y);
	}

	fn distance(m: &Materializer, a: &str, b: &str) -> f64 {
		let (a, b) = (m.visible().node(a).unwrap(), m.visible().node(b).unwrap());
		(a.x - b.x).hypot(a.y - b.y)
	}

	fn running(center: (f64, f64)) -> ForceLayout {
		let mut layout = ForceLayout::new(LayoutConfig::default(), center);
		layout.reheat();
		layout
	}

	#[test]
	fn idle_until_reheated() {
		let mut m = subgraph(&["a", "b"], &[]);
		let mut layout = ForceLayout::new(LayoutConfig::default(), (0.0, 0.0));
		let mut rng = StdRng::seed_from_u64(0);
		let before = m.visible().node("a").map(|n| (n.x, n.y));
		assert_eq!(layout.tick(m.visible_mut(), &mut rng), LayoutState::Idle);
		assert_eq!(m.visible().node("a").map(|n| (n.x, n.y)), before);
	}

	#[test]
	fn empty_subgraph_does_nothing() {
		let mut m = Materializer::default();
		let mut layout = running((0.0, 0.0));
		let mut rng = StdRng::seed_from_u64(0);
		assert_eq!(layout.tick(m.visible_mut(), &mut rng), LayoutState::Idle);
		assert_eq!(layout.alpha(), 0.0);
	}

	#[test]
	fn single_node_settles_at_center() {
		let mut m = subgraph(&["solo"], &[]);
		let mut layout = running((320.0, 240.0));
		let mut rng = StdRng::seed_from_u64(0);
		assert_eq!(layout.tick(m.visible_mut(), &mut rng), LayoutState::Idle);
		let n = m.visible().node("solo").unwrap();
		assert_eq!((n.x, n.y), (320.0, 240.0));
	}

	#[test]
	fn spring_pulls_toward_rest_length() {
		let mut m = subgraph(&["a", "b"], &[("a", "b")]);
		place(&mut m, "a", -200.0, 0.0);
		place(&mut m, "b", 200.0, 0.0);
		let mut layout = running((0.0, 0.0));
		let mut rng = StdRng::seed_from_u64(0);
		for _ in 0..400 {
			layout.tick(m.visible_mut(), &mut rng);
		}
		let d = distance(&m, "a", "b");
		assert!(d < 120.0 && d > 30.0, "settled at {d}");
	}

	#[test]
	fn repulsion_separates_unlinked_nodes() {
		let mut m = subgraph(&["a", "b"], &[]);
		place(&mut m, "a", -1.0, 0.0);
		place(&mut m, "b", 1.0, 0.0);
		let mut layout = running((0.0, 0.0));
		let mut rng = StdRng::seed_from_u64(0);
		for _ in 0..20 {
			layout.tick(m.visible_mut(), &mut rng);
		}
		assert!(distance(&m, "a", "b") > 16.0);
	}

	#[test]
	fn coincident_nodes_are_separated() {
		let mut m = subgraph(&["a", "b", "c"], &[]);
		for id in ["a", "b", "c"] {
			place(&mut m, id, 5.0, 5.0);
		}
		let mut layout = running((5.0, 5.0));
		let mut rng = StdRng::seed_from_u64(9);
		for _ in 0..50 {
			layout.tick(m.visible_mut(), &mut rng);
		}
		assert!(distance(&m, "a", "b") > 1.0);
		assert!(distance(&m, "b", "c") > 1.0);
	}

	#[test]
	fn pinned_node_holds_position() {
		let mut m = subgraph(&["a", "b", "c"], &[("a", "b"), ("a", "c")]);
		place(&mut m, "a", 42.0, -17.0);
		m.visible_mut().node_mut("a").unwrap().pinned = true;
		let mut layout = running((0.0, 0.0));
		let mut rng = StdRng::seed_from_u64(0);
		for _ in 0..100 {
			layout.tick(m.visible_mut(), &mut rng);
		}
		let a = m.visible().node("a").unwrap();
		assert_eq!((a.x, a.y), (42.0, -17.0));
		assert!(distance(&m, "a", "b") > 10.0);
	}

	#[test]
	fn converges_and_halts() {
		let mut m = subgraph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")]);
		let mut layout = running((0.0, 0.0));
		let mut rng = StdRng::seed_from_u64(0);
		let ticks = (1..=400)
			.find(|_| layout.tick(m.visible_mut(), &mut rng) == LayoutState::Idle)
			.expect("layout never went idle");
		assert!(ticks <= 310, "took {ticks} ticks");
		assert_eq!(layout.alpha(), 0.0);
	}

	#[test]
	fn alpha_target_keeps_running() {
		let mut m = subgraph(&["a", "b"], &[]);
		let mut layout = running((0.0, 0.0));
		layout.set_alpha_target(0.3);
		let mut rng = StdRng::seed_from_u64(0);
		for _ in 0..1000 {
			assert_eq!(layout.tick(m.visible_mut(), &mut rng), LayoutState::Running);
		}
		layout.set_alpha_target(0.0);
		let halted = (0..400).any(|_| layout.tick(m.visible_mut(), &mut rng) == LayoutState::Idle);
		assert!(halted);
	}
}
