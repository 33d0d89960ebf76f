//! Interactive graph engine: a pure-data core that any renderer can read.
//!
//! [`GraphEngine`] owns one view over a [`GraphStore`]. Roots are shown
//! first; double-clicking a node merges its neighbors in. Positions come from
//! a cooling force simulation advanced by [`GraphEngine::tick`].

mod config;
mod engine;
mod error;
mod interaction;
mod layout;
mod palette;
mod selection;
mod store;
mod subgraph;
mod types;
mod viewport;

pub use config::EngineConfig;
pub use engine::{EngineEvent, GraphEngine};
pub use error::GraphError;
pub use interaction::{Intent, InteractionConfig, InteractionHandler};
pub use layout::{ForceLayout, LayoutConfig, LayoutState};
pub use palette::Palette;
pub use selection::Selection;
pub use store::{GraphFilter, GraphStore};
pub use subgraph::{
	ExpandOutcome, ExpandTicket, Materializer, VisibleEdge, VisibleNode, VisibleSubgraph,
};
pub use types::{Expansion, GraphData, GraphEdge, GraphNode, NodeId};
pub use viewport::{Bounds, FitOutcome, ViewTransform, Viewport, ViewportCommand, ViewportConfig};
