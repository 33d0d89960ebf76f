//! An explicitly owned graph view: store, visible subgraph, layout, viewport,
//! selection and pointer handling, driven by `tick` once per frame.

use std::collections::HashSet;
use std::rc::Rc;

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::config::EngineConfig;
use super::interaction::{Intent, InteractionHandler};
use super::layout::{ForceLayout, LayoutState};
use super::selection::Selection;
use super::store::{GraphFilter, GraphStore};
use super::subgraph::{ExpandOutcome, ExpandTicket, Materializer, VisibleNode, VisibleSubgraph};
use super::types::{Expansion, GraphEdge, GraphNode, NodeId};
use super::viewport::{FitOutcome, Viewport, ViewportCommand};

/// Extra world-space radius around a node that still counts as a hit.
const HIT_SLOP: f64 = 4.0;

/// Notifications for collaborators outside the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
	/// The primary selection changed; `None` when nothing is selected.
	SelectionChanged(Option<NodeId>),
	/// An expansion was merged.
	Expanded {
		/// The expanded node.
		node: NodeId,
		/// Nodes newly shown.
		nodes: usize,
		/// Edges newly shown.
		edges: usize,
	},
}

/// One interactive view over a [`GraphStore`]. Owns everything that changes
/// while the user explores; the store itself is shared and read-only.
pub struct GraphEngine {
	store: Rc<GraphStore>,
	config: EngineConfig,
	materializer: Materializer,
	layout: ForceLayout,
	viewport: Viewport,
	selection: Selection,
	interaction: InteractionHandler,
	rng: StdRng,
	events: Vec<EngineEvent>,
	alive: bool,
}

impl GraphEngine {
	/// New engine showing the store's root nodes in a `width`×`height` view.
	pub fn create(store: Rc<GraphStore>, config: EngineConfig, width: f64, height: f64) -> Self {
		let viewport = Viewport::new(width, height, config.viewport.clone());
		let layout = ForceLayout::new(config.layout.clone(), viewport.screen_center());
		let mut engine = Self {
			store,
			materializer: Materializer::default(),
			layout,
			viewport,
			selection: Selection::default(),
			interaction: InteractionHandler::new(config.interaction.clone()),
			rng: StdRng::seed_from_u64(config.seed),
			config,
			events: Vec::new(),
			alive: true,
		};
		engine.restart();
		info!(
			"graph engine created: {} nodes in store, {} visible",
			engine.store.len(),
			engine.visible().len()
		);
		engine
	}

	/// Tear down. Outstanding expansions are discarded on arrival and every
	/// later call is a no-op.
	pub fn destroy(&mut self) {
		if !self.alive {
			return;
		}
		self.interaction.reset();
		self.materializer.replace_from_external_filter(
			std::iter::empty::<Rc<GraphNode>>(),
			std::iter::empty::<Rc<GraphEdge>>(),
			(0.0, 0.0),
			0.0,
		);
		self.selection.clear();
		self.layout.stop();
		self.events.clear();
		self.alive = false;
		debug!("graph engine destroyed");
	}

	/// False once [`GraphEngine::destroy`] has run.
	pub fn is_alive(&self) -> bool {
		self.alive
	}

	/// The backing store.
	pub fn store(&self) -> &GraphStore {
		&self.store
	}

	/// Configuration the engine was created with.
	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Nodes and edges currently shown.
	pub fn visible(&self) -> &VisibleSubgraph {
		self.materializer.visible()
	}

	/// Whether `id` has been expanded since the last reset.
	pub fn is_expanded(&self, id: &str) -> bool {
		self.materializer.is_expanded(id)
	}

	/// Every expanded node id.
	pub fn expanded(&self) -> &HashSet<NodeId> {
		self.materializer.expanded()
	}

	/// Current selection.
	pub fn selection(&self) -> &Selection {
		&self.selection
	}

	/// Current pan/zoom state.
	pub fn viewport(&self) -> &Viewport {
		&self.viewport
	}

	/// The force simulation.
	pub fn layout(&self) -> &ForceLayout {
		&self.layout
	}

	/// Whether the simulation still has energy.
	pub fn layout_state(&self) -> LayoutState {
		self.layout.state()
	}

	/// Node held by an active drag.
	pub fn dragged(&self) -> Option<&str> {
		self.interaction.dragged()
	}

	/// Selected nodes and their neighbors.
	pub fn highlighted(&self) -> HashSet<&str> {
		self.selection.highlighted(self.materializer.visible())
	}

	/// Drain pending notifications.
	pub fn take_events(&mut self) -> Vec<EngineEvent> {
		std::mem::take(&mut self.events)
	}

	fn spawn_center(&self) -> (f64, f64) {
		self.layout.center()
	}

	fn clear_selection(&mut self) {
		if self.selection.clear() {
			self.events.push(EngineEvent::SelectionChanged(None));
		}
	}

	/// Wipe gesture, expansion and selection state before a wholesale change.
	fn before_reset(&mut self) {
		let intents = self.interaction.reset();
		self.apply_intents(intents);
		self.clear_selection();
	}

	/// Replace the view with `roots`.
	pub fn initialize(&mut self, roots: impl IntoIterator<Item = Rc<GraphNode>>) {
		if !self.alive {
			return;
		}
		self.before_reset();
		let center = self.spawn_center();
		self.materializer
			.initialize(roots, center, self.config.layout.spawn_radius);
		self.layout.reheat();
	}

	/// Back to the store's root nodes.
	pub fn restart(&mut self) {
		let roots = self.store.roots();
		self.initialize(roots);
	}

	/// Replace the view with an externally filtered set.
	pub fn replace_from_external_filter(
		&mut self,
		nodes: impl IntoIterator<Item = Rc<GraphNode>>,
		edges: impl IntoIterator<Item = Rc<GraphEdge>>,
	) {
		if !self.alive {
			return;
		}
		self.before_reset();
		let center = self.spawn_center();
		self.materializer.replace_from_external_filter(
			nodes,
			edges,
			center,
			self.config.layout.spawn_radius,
		);
		self.layout.reheat();
	}

	/// Show what `filter` keeps from the full store.
	pub fn apply_filter(&mut self, filter: &GraphFilter) {
		let (nodes, edges) = self.store.filtered(filter);
		self.replace_from_external_filter(nodes, edges);
	}

	/// Reveal the children of `id` from the local store.
	pub fn expand(&mut self, id: &str) -> ExpandOutcome {
		let ticket = match self.request_expand(id) {
			Ok(ticket) => ticket,
			Err(outcome) => return outcome,
		};
		match self.store.expansion(id) {
			Some(expansion) => self.complete_expand(ticket, expansion),
			None => {
				debug!("expand: {id:?} is not in the store");
				self.materializer.abandon(ticket);
				ExpandOutcome::Unknown
			}
		}
	}

	/// First half of an expansion whose children are fetched elsewhere.
	pub fn request_expand(&mut self, id: &str) -> Result<ExpandTicket, ExpandOutcome> {
		if !self.alive {
			return Err(ExpandOutcome::Stale);
		}
		self.materializer.request_expand(id)
	}

	/// Merge fetched children. Results for a reset or destroyed view are
	/// dropped.
	pub fn complete_expand(&mut self, ticket: ExpandTicket, expansion: Expansion) -> ExpandOutcome {
		if !self.alive {
			return ExpandOutcome::Stale;
		}
		let node = ticket.node().to_owned();
		let outcome = self.materializer.complete_expand(
			ticket,
			expansion,
			&mut self.rng,
			self.config.layout.spawn_jitter,
		);
		if let ExpandOutcome::Merged { nodes, edges } = outcome {
			self.layout.reheat();
			self.events.push(EngineEvent::Expanded { node, nodes, edges });
		}
		outcome
	}

	/// One frame: flush deferred clicks, then advance the layout.
	pub fn tick(&mut self, now: f64) -> LayoutState {
		if !self.alive {
			return LayoutState::Idle;
		}
		let intents = self.interaction.poll(now);
		self.apply_intents(intents);
		self.layout
			.tick(self.materializer.visible_mut(), &mut self.rng)
	}

	/// Topmost node under a screen position.
	pub fn node_at(&self, sx: f64, sy: f64) -> Option<&VisibleNode> {
		let (gx, gy) = self.viewport.screen_to_graph(sx, sy);
		let reach = self.config.layout.node_radius + HIT_SLOP;
		self.visible()
			.nodes()
			.iter()
			.rev()
			.find(|n| (n.x - gx).hypot(n.y - gy) < reach)
	}

	/// Pointer pressed at a screen position. `now` is in milliseconds.
	pub fn pointer_down(&mut self, sx: f64, sy: f64, now: f64) {
		if !self.alive {
			return;
		}
		let hit = self
			.node_at(sx, sy)
			.map(|n| (n.data.id.clone(), (n.x, n.y)));
		let intents = self.interaction.pointer_down(hit, (sx, sy), now);
		self.apply_intents(intents);
	}

	/// Pointer moved to a screen position.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if !self.alive {
			return;
		}
		let intents = self
			.interaction
			.pointer_move((sx, sy), self.viewport.transform.scale);
		self.apply_intents(intents);
	}

	/// Pointer released.
	pub fn pointer_up(&mut self, now: f64) {
		if !self.alive {
			return;
		}
		let intents = self.interaction.pointer_up(now);
		self.apply_intents(intents);
	}

	/// Pointer left the canvas: drop any drag or pan.
	pub fn pointer_leave(&mut self) {
		if !self.alive {
			return;
		}
		let intents = self.interaction.cancel();
		self.apply_intents(intents);
	}

	/// Wheel zoom anchored at the pointer.
	pub fn wheel(&mut self, sx: f64, sy: f64, delta_y: f64) {
		if !self.alive || delta_y == 0.0 {
			return;
		}
		let step = self.viewport.config().zoom_step;
		let factor = if delta_y > 0.0 { 1.0 / step } else { step };
		self.viewport.zoom_by(factor, Some((sx, sy)));
	}

	/// Apply a toolbar command.
	pub fn command(&mut self, command: ViewportCommand) {
		if !self.alive {
			return;
		}
		let bounds = self.visible().bounds();
		self.viewport.apply(command, bounds);
	}

	/// Fit every visible node into view. `None` when nothing is visible.
	pub fn fit_to_content(&mut self) -> Option<FitOutcome> {
		if !self.alive {
			return None;
		}
		let bounds = self.visible().bounds()?;
		Some(self.viewport.fit_to_content(bounds))
	}

	/// The canvas changed size; the layout center follows.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.viewport.resize(width, height);
		self.layout.set_center(self.viewport.screen_center());
	}

	fn apply_intents(&mut self, intents: Vec<Intent>) {
		for intent in intents {
			self.apply_intent(intent);
		}
	}

	fn apply_intent(&mut self, intent: Intent) {
		match intent {
			Intent::Pin(id) => {
				if let Some(node) = self.materializer.visible_mut().node_mut(&id) {
					node.pinned = true;
					self.layout.reheat();
					self.layout
						.set_alpha_target(self.config.layout.drag_alpha_target);
				}
			}
			Intent::MoveNode { id, x, y } => {
				if let Some(node) = self.materializer.visible_mut().node_mut(&id) {
					(node.x, node.y) = (x, y);
				}
			}
			Intent::Release(id) => {
				if let Some(node) = self.materializer.visible_mut().node_mut(&id) {
					node.pinned = false;
				}
				self.layout.set_alpha_target(0.0);
			}
			Intent::Pan { dx, dy } => self.viewport.pan(dx, dy),
			Intent::ToggleSelection(id) => {
				if self.visible().contains_node(&id) {
					self.selection.toggle(&id);
					let primary = self.selection.primary().map(str::to_owned);
					self.events.push(EngineEvent::SelectionChanged(primary));
				}
			}
			Intent::ClearSelection => self.clear_selection(),
			Intent::Expand(id) => {
				let outcome = self.expand(&id);
				debug!("double-click expand {id:?}: {outcome:?}");
			}
		}
	}
}
