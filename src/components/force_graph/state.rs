use std::collections::HashSet;
use std::rc::Rc;

use crate::graph::{EngineConfig, GraphEngine, GraphStore, NodeId, Palette};

/// Longest frame step fed to the hover animation, in seconds.
const MAX_FRAME_DT: f64 = 0.1;

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<NodeId>,
	pub neighbors: HashSet<NodeId>,
	pub highlight_t: f64,
	pub prev_node: Option<NodeId>,
	pub prev_neighbors: HashSet<NodeId>,
	delay_t: f64,
}

/// Everything the canvas needs between frames: the engine plus purely
/// visual state (hover fade, edge flow animation).
pub struct ForceGraphState {
	pub engine: GraphEngine,
	pub palette: Palette,
	pub hover: HoverState,
	pub flow_time: f64,
	last_frame: Option<f64>,
}

impl ForceGraphState {
	pub fn new(
		store: Rc<GraphStore>,
		config: EngineConfig,
		palette: Palette,
		width: f64,
		height: f64,
	) -> Self {
		Self {
			engine: GraphEngine::create(store, config, width, height),
			palette,
			hover: HoverState::default(),
			flow_time: 0.0,
			last_frame: None,
		}
	}

	pub fn node_radius(&self) -> f64 {
		self.engine.config().layout.node_radius
	}

	pub fn set_hover(&mut self, node: Option<NodeId>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// keep the old highlight around while it fades out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.neighbors = node
			.as_deref()
			.map(|id| {
				self.engine
					.visible()
					.neighbors(id)
					.into_iter()
					.map(str::to_owned)
					.collect()
			})
			.unwrap_or_default();
		if node.is_some() && !was_hovering {
			self.hover.delay_t = 0.0;
		}
		self.hover.node = node;
	}

	pub fn is_highlighted(&self, id: &str) -> bool {
		self.hover.node.as_deref() == Some(id)
			|| self.hover.neighbors.contains(id)
			|| self.hover.prev_node.as_deref() == Some(id)
			|| self.hover.prev_neighbors.contains(id)
	}

	pub fn is_hovered(&self, id: &str) -> bool {
		self.hover.node.as_deref() == Some(id) || self.hover.prev_node.as_deref() == Some(id)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	/// Advance one animation frame; `now` is the frame timestamp in ms.
	pub fn frame(&mut self, now: f64) {
		let dt = self
			.last_frame
			.map_or(0.016, |last| ((now - last) / 1000.0).clamp(0.0, MAX_FRAME_DT));
		self.last_frame = Some(now);

		self.engine.tick(now);
		self.flow_time += dt;

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.engine.resize(width, height);
	}
}
