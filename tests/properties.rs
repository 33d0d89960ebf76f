use std::collections::HashSet;
use std::rc::Rc;

use kg_explorer::graph::{
	Bounds, EngineConfig, GraphData, GraphEdge, GraphEngine, GraphNode, GraphStore, Viewport,
	ViewportConfig, VisibleSubgraph,
};
use proptest::prelude::*;

/// Random graph over `n` nodes; edge endpoints are node indices and may
/// repeat, loop or dangle.
fn arb_graph() -> impl Strategy<Value = GraphData> {
	(1_usize..12).prop_flat_map(|n| {
		prop::collection::vec((0..n + 2, 0..n + 2, 0_u8..3), 0..30).prop_map(move |links| {
			GraphData {
				nodes: (0..n)
					.map(|i| GraphNode::new(format!("n{i}"), format!("g{}", i % 3)))
					.collect(),
				edges: links
					.into_iter()
					.enumerate()
					.map(|(i, (s, t, kind))| {
						// every fourth edge reuses an earlier id
						let id = if i % 4 == 3 {
							format!("e{}", i - 1)
						} else {
							format!("e{i}")
						};
						GraphEdge::new(id, format!("n{s}"), format!("n{t}"), format!("K{kind}"))
					})
					.collect(),
			}
		})
	})
}

fn assert_well_formed(graph: &VisibleSubgraph) {
	let mut node_ids = HashSet::new();
	for node in graph.nodes() {
		assert!(node_ids.insert(node.id()), "duplicate node {}", node.id());
	}
	let mut edge_ids = HashSet::new();
	for edge in graph.edges() {
		assert!(edge_ids.insert(edge.data.id.as_str()), "duplicate edge {}", edge.data.id);
		assert_ne!(edge.data.source, edge.data.target);
		assert_eq!(graph.nodes()[edge.source].id(), edge.data.source);
		assert_eq!(graph.nodes()[edge.target].id(), edge.data.target);
	}
}

proptest! {
	#[test]
	fn expansion_sequences_stay_well_formed(
		data in arb_graph(),
		picks in prop::collection::vec(0_usize..14, 0..20),
	) {
		let store = Rc::new(GraphStore::from_data(data));
		let mut engine = GraphEngine::create(store, EngineConfig::default(), 800.0, 600.0);
		for pick in picks {
			engine.expand(&format!("n{pick}"));
			engine.tick(0.0);
			assert_well_formed(engine.visible());
		}
	}

	#[test]
	fn repeated_expansion_is_idempotent(data in arb_graph(), pick in 0_usize..12) {
		let store = Rc::new(GraphStore::from_data(data));
		let mut engine = GraphEngine::create(store, EngineConfig::default(), 800.0, 600.0);
		let id = format!("n{pick}");
		engine.expand(&id);
		let (nodes, edges) = (engine.visible().len(), engine.visible().edges().len());
		engine.expand(&id);
		prop_assert_eq!(engine.visible().len(), nodes);
		prop_assert_eq!(engine.visible().edges().len(), edges);
	}

	#[test]
	fn fit_contains_every_point(
		points in prop::collection::vec((-5000.0_f64..5000.0, -5000.0_f64..5000.0), 2..40),
		width in 200.0_f64..2000.0,
		height in 200.0_f64..2000.0,
	) {
		let bounds = Bounds::from_points(points.iter().copied()).expect("non-empty");
		prop_assume!(!bounds.is_degenerate());
		// stay inside the zoom range so clamping cannot push content out
		let scale = (width / bounds.width()).min(height / bounds.height()) * 0.9;
		prop_assume!((0.1..=10.0).contains(&scale));

		let config = ViewportConfig::default();
		let margin = config.fit_margin;
		let mut viewport = Viewport::new(width, height, config);
		viewport.fit_to_content(bounds);
		let inset = |extent: f64| {
			(extent * (1.0 - margin) / 2.0 - 1e-6)..=(extent * (1.0 + margin) / 2.0 + 1e-6)
		};
		for (x, y) in points {
			let (sx, sy) = viewport.graph_to_screen(x, y);
			prop_assert!(inset(width).contains(&sx));
			prop_assert!(inset(height).contains(&sy));
		}
	}
}
