//! Pointer gestures turned into engine intents.
//!
//! The handler knows nothing about the subgraph: the caller resolves which
//! node (if any) is under the pointer and applies the returned [`Intent`]s.
//! Times are milliseconds on any monotonic clock.

use serde::{Deserialize, Serialize};

use super::types::NodeId;

/// Thresholds separating clicks, double clicks and drags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
	/// Max pointer travel, in screen pixels, for a press to count as a click.
	pub click_distance: f64,
	/// Max press duration for a click.
	pub click_max_ms: f64,
	/// Window in which a second click on the same node expands it.
	pub double_click_ms: f64,
}

impl Default for InteractionConfig {
	fn default() -> Self {
		Self {
			click_distance: 4.0,
			click_max_ms: 300.0,
			double_click_ms: 300.0,
		}
	}
}

/// What the engine should do in response to pointer input.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
	/// Pin the node and re-heat the layout.
	Pin(NodeId),
	/// Move a pinned node to graph coordinates.
	MoveNode {
		/// The dragged node.
		id: NodeId,
		/// Graph-space x.
		x: f64,
		/// Graph-space y.
		y: f64,
	},
	/// Hand the node back to the simulation.
	Release(NodeId),
	/// Pan the viewport by a screen delta.
	Pan {
		/// Horizontal delta in screen pixels.
		dx: f64,
		/// Vertical delta in screen pixels.
		dy: f64,
	},
	/// Flip selection of the node.
	ToggleSelection(NodeId),
	/// Empty the selection.
	ClearSelection,
	/// Reveal the node's children.
	Expand(NodeId),
}

#[derive(Clone, Debug, Default, PartialEq)]
enum Gesture {
	#[default]
	Idle,
	Dragging {
		node: NodeId,
		start: (f64, f64),
		node_start: (f64, f64),
		down_at: f64,
		travel: f64,
	},
	Panning {
		last: (f64, f64),
		down_at: f64,
		travel: f64,
	},
}

#[derive(Clone, Debug, PartialEq)]
struct PendingClick {
	node: NodeId,
	at: f64,
}

/// Turns raw pointer events into [`Intent`]s.
#[derive(Clone, Debug, Default)]
pub struct InteractionHandler {
	config: InteractionConfig,
	gesture: Gesture,
	pending: Option<PendingClick>,
}

impl InteractionHandler {
	/// Idle handler with `config` thresholds.
	pub fn new(config: InteractionConfig) -> Self {
		Self {
			config,
			..Self::default()
		}
	}

	/// Node currently held by a drag.
	pub fn dragged(&self) -> Option<&str> {
		match &self.gesture {
			Gesture::Dragging { node, .. } => Some(node),
			_ => None,
		}
	}

	/// True while the background is being dragged.
	pub fn is_panning(&self) -> bool {
		matches!(self.gesture, Gesture::Panning { .. })
	}

	/// `hit` is the node under the pointer with its graph position.
	pub fn pointer_down(
		&mut self,
		hit: Option<(NodeId, (f64, f64))>,
		screen: (f64, f64),
		now: f64,
	) -> Vec<Intent> {
		let mut out = self.cancel();
		match hit {
			Some((node, node_start)) => {
				out.push(Intent::Pin(node.clone()));
				self.gesture = Gesture::Dragging {
					node,
					start: screen,
					node_start,
					down_at: now,
					travel: 0.0,
				};
			}
			None => {
				self.gesture = Gesture::Panning {
					last: screen,
					down_at: now,
					travel: 0.0,
				};
			}
		}
		out
	}

	/// `scale` is the current viewport scale, used to map screen deltas into
	/// graph space.
	pub fn pointer_move(&mut self, screen: (f64, f64), scale: f64) -> Vec<Intent> {
		match &mut self.gesture {
			Gesture::Idle => Vec::new(),
			Gesture::Dragging {
				node,
				start,
				node_start,
				travel,
				..
			} => {
				let (dx, dy) = (screen.0 - start.0, screen.1 - start.1);
				*travel = travel.max(dx.hypot(dy));
				vec![Intent::MoveNode {
					id: node.clone(),
					x: node_start.0 + dx / scale,
					y: node_start.1 + dy / scale,
				}]
			}
			Gesture::Panning { last, travel, .. } => {
				let (dx, dy) = (screen.0 - last.0, screen.1 - last.1);
				*last = screen;
				*travel += dx.hypot(dy);
				vec![Intent::Pan { dx, dy }]
			}
		}
	}

	/// Ends the gesture. A short press with little travel counts as a click.
	pub fn pointer_up(&mut self, now: f64) -> Vec<Intent> {
		match std::mem::take(&mut self.gesture) {
			Gesture::Idle => Vec::new(),
			Gesture::Dragging {
				node,
				down_at,
				travel,
				..
			} => {
				let mut out = vec![Intent::Release(node.clone())];
				if self.is_click(down_at, travel, now) {
					out.extend(self.node_click(node, now));
				}
				out
			}
			Gesture::Panning {
				down_at, travel, ..
			} => {
				if self.is_click(down_at, travel, now) {
					self.pending = None;
					vec![Intent::ClearSelection]
				} else {
					Vec::new()
				}
			}
		}
	}

	/// Flush a deferred single click once the double-click window has passed.
	pub fn poll(&mut self, now: f64) -> Vec<Intent> {
		let due = self
			.pending
			.as_ref()
			.is_some_and(|p| now - p.at > self.config.double_click_ms);
		if !due {
			return Vec::new();
		}
		self.pending
			.take()
			.map(|p| Intent::ToggleSelection(p.node))
			.into_iter()
			.collect()
	}

	/// Abort the current gesture, releasing any dragged node.
	pub fn cancel(&mut self) -> Vec<Intent> {
		match std::mem::take(&mut self.gesture) {
			Gesture::Dragging { node, .. } => vec![Intent::Release(node)],
			_ => Vec::new(),
		}
	}

	/// Forget everything, including a deferred click, e.g. when the subgraph
	/// is replaced.
	pub fn reset(&mut self) -> Vec<Intent> {
		self.pending = None;
		self.cancel()
	}

	fn is_click(&self, down_at: f64, travel: f64, now: f64) -> bool {
		travel <= self.config.click_distance && now - down_at <= self.config.click_max_ms
	}

	fn node_click(&mut self, node: NodeId, now: f64) -> Vec<Intent> {
		match self.pending.take() {
			Some(p) if p.node == node && now - p.at <= self.config.double_click_ms => {
				vec![Intent::Expand(node)]
			}
			previous => {
				self.pending = Some(PendingClick { node, at: now });
				previous
					.map(|p| Intent::ToggleSelection(p.node))
					.into_iter()
					.collect()
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn handler() -> InteractionHandler {
		InteractionHandler::new(InteractionConfig::default())
	}

	fn click(h: &mut InteractionHandler, node: Option<&str>, now: f64) -> Vec<Intent> {
		let hit = node.map(|id| (id.to_string(), (0.0, 0.0)));
		let mut out = h.pointer_down(hit, (10.0, 10.0), now);
		out.extend(h.pointer_up(now + 50.0));
		out
	}

	#[test]
	fn single_click_is_deferred() {
		let mut h = handler();
		let out = click(&mut h, Some("a"), 0.0);
		assert_eq!(out, [Intent::Pin("a".into()), Intent::Release("a".into())]);
		assert!(h.poll(200.0).is_empty());
		assert_eq!(h.poll(400.0), [Intent::ToggleSelection("a".into())]);
		assert!(h.poll(800.0).is_empty());
	}

	#[test]
	fn double_click_expands_without_selecting() {
		let mut h = handler();
		click(&mut h, Some("a"), 0.0);
		let out = click(&mut h, Some("a"), 150.0);
		assert!(out.contains(&Intent::Expand("a".into())));
		assert!(!out.iter().any(|i| matches!(i, Intent::ToggleSelection(_))));
		assert!(h.poll(1000.0).is_empty());
	}

	#[test]
	fn click_on_other_node_flushes_pending() {
		let mut h = handler();
		click(&mut h, Some("a"), 0.0);
		let out = click(&mut h, Some("b"), 100.0);
		assert!(out.contains(&Intent::ToggleSelection("a".into())));
		assert_eq!(h.poll(500.0), [Intent::ToggleSelection("b".into())]);
	}

	#[test]
	fn background_click_clears() {
		let mut h = handler();
		click(&mut h, Some("a"), 0.0);
		let out = click(&mut h, None, 100.0);
		assert_eq!(out, [Intent::ClearSelection]);
		assert!(h.poll(1000.0).is_empty());
	}

	#[test]
	fn drag_moves_node_in_graph_space() {
		let mut h = handler();
		let out = h.pointer_down(Some(("a".into(), (100.0, 50.0))), (10.0, 10.0), 0.0);
		assert_eq!(out, [Intent::Pin("a".into())]);
		assert_eq!(h.dragged(), Some("a"));
		let out = h.pointer_move((30.0, 50.0), 2.0);
		assert_eq!(
			out,
			[Intent::MoveNode {
				id: "a".into(),
				x: 110.0,
				y: 70.0
			}]
		);
		let out = h.pointer_up(100.0);
		assert_eq!(out, [Intent::Release("a".into())]);
		assert!(h.poll(1000.0).is_empty());
	}

	#[test]
	fn slow_press_is_not_a_click() {
		let mut h = handler();
		h.pointer_down(None, (0.0, 0.0), 0.0);
		assert!(h.pointer_up(1000.0).is_empty());
	}

	#[test]
	fn background_drag_pans() {
		let mut h = handler();
		h.pointer_down(None, (0.0, 0.0), 0.0);
		assert!(h.is_panning());
		assert_eq!(h.pointer_move((5.0, -3.0), 1.0), [Intent::Pan { dx: 5.0, dy: -3.0 }]);
		assert_eq!(h.pointer_move((15.0, -3.0), 1.0), [Intent::Pan { dx: 10.0, dy: 0.0 }]);
		assert!(h.pointer_up(50.0).is_empty());
	}

	#[test]
	fn cancel_releases_drag() {
		let mut h = handler();
		h.pointer_down(Some(("a".into(), (0.0, 0.0))), (0.0, 0.0), 0.0);
		assert_eq!(h.cancel(), [Intent::Release("a".into())]);
		assert!(h.pointer_up(10.0).is_empty());
	}
}
