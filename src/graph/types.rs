//! Node and edge records as supplied by the backing graph source.

use std::collections::HashSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier shared by nodes and edges.
pub type NodeId = String;

fn unknown_group() -> String {
	"Unknown".into()
}

/// A node of the backing graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNode")]
pub struct GraphNode {
	/// Unique within the store.
	pub id: NodeId,
	/// Display name, falls back to `id`.
	pub label: Option<String>,
	/// Category tag, used for color and filtering only.
	pub group: String,
	/// Free text shown in the details panel.
	pub description: Option<String>,
	/// Opaque metadata.
	pub properties: Map<String, Value>,
}

/// Display fields the REST endpoint nests under `data`.
#[derive(Default, Deserialize)]
#[serde(default)]
struct RawNodeData {
	label: Option<String>,
	#[serde(rename = "type")]
	group: Option<String>,
	description: Option<String>,
}

/// Accepts both the flat snapshot shape and `{id, data: {label, type,
/// description}}`. Top-level fields win over nested ones.
#[derive(Deserialize)]
struct RawNode {
	id: NodeId,
	#[serde(default)]
	label: Option<String>,
	#[serde(default, alias = "type")]
	group: Option<String>,
	#[serde(default)]
	description: Option<String>,
	#[serde(default)]
	properties: Map<String, Value>,
	#[serde(default)]
	data: RawNodeData,
}

impl From<RawNode> for GraphNode {
	fn from(raw: RawNode) -> Self {
		let data = raw.data;
		Self {
			id: raw.id,
			label: raw.label.or(data.label),
			group: raw.group.or(data.group).unwrap_or_else(unknown_group),
			description: raw
				.description
				.or(data.description)
				.filter(|d| !d.is_empty()),
			properties: raw.properties,
		}
	}
}

impl GraphNode {
	/// Shorthand for a node with an id and a group.
	pub fn new(id: impl Into<NodeId>, group: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			label: None,
			group: group.into(),
			description: None,
			properties: Map::new(),
		}
	}

	/// Builder-style label setter.
	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	/// Label to draw next to the node.
	pub fn display_label(&self) -> &str {
		self.label.as_deref().unwrap_or(&self.id)
	}
}

/// A directed, typed relationship.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEdge")]
pub struct GraphEdge {
	/// Unique within the store. Empty ids are derived from the endpoints.
	pub id: String,
	/// Source node id.
	pub source: NodeId,
	/// Target node id.
	pub target: NodeId,
	/// Relationship label, display only.
	#[serde(rename = "type")]
	pub kind: String,
}

/// The REST endpoint sends the relationship as `label` and a renderer hint
/// (`"step"`) as `type`; snapshots only carry `type`.
#[derive(Deserialize)]
struct RawEdge {
	#[serde(default)]
	id: String,
	source: NodeId,
	target: NodeId,
	#[serde(default, rename = "type")]
	kind: Option<String>,
	#[serde(default)]
	label: Option<String>,
}

impl From<RawEdge> for GraphEdge {
	fn from(raw: RawEdge) -> Self {
		Self {
			id: raw.id,
			source: raw.source,
			target: raw.target,
			kind: raw.label.or(raw.kind).unwrap_or_default(),
		}
	}
}

impl GraphEdge {
	/// Edge with an explicit id.
	pub fn new(
		id: impl Into<String>,
		source: impl Into<NodeId>,
		target: impl Into<NodeId>,
		kind: impl Into<String>,
	) -> Self {
		Self {
			id: id.into(),
			source: source.into(),
			target: target.into(),
			kind: kind.into(),
		}
	}

	/// The id the REST endpoint assigns: `source-type-target`.
	pub fn derived_id(&self) -> String {
		format!("{}-{}-{}", self.source, self.kind, self.target)
	}

	/// Self-referential edges are data errors.
	pub fn is_self_loop(&self) -> bool {
		self.source == self.target
	}

	/// The endpoint opposite `id`, if `id` is an endpoint at all.
	pub fn other_end(&self, id: &str) -> Option<&str> {
		if self.source == id {
			Some(&self.target)
		} else if self.target == id {
			Some(&self.source)
		} else {
			None
		}
	}
}

/// Full graph snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
	/// All nodes.
	#[serde(default)]
	pub nodes: Vec<GraphNode>,
	/// All edges.
	#[serde(default, alias = "links")]
	pub edges: Vec<GraphEdge>,
}

impl GraphData {
	/// Distinct node groups, first occurrence first.
	pub fn groups(&self) -> Vec<String> {
		let mut seen = HashSet::new();
		self.nodes
			.iter()
			.filter(|n| seen.insert(n.group.as_str()))
			.map(|n| n.group.clone())
			.collect()
	}
}

/// What a children query returns for one node.
#[derive(Clone, Debug, Default)]
pub struct Expansion {
	/// Child records.
	pub nodes: Vec<Rc<GraphNode>>,
	/// Edges touching the expanded node.
	pub edges: Vec<Rc<GraphEdge>>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn snapshot_accepts_endpoint_field_names() {
		let json = r#"{
			"nodes": [
				{"id": "svc", "type": "Service"},
				{"id": "t1", "label": "Ticket 1", "group": "Ticket", "properties": {"prio": 2}}
			],
			"links": [{"source": "t1", "target": "svc", "label": "AFFECTS"}]
		}"#;
		let data: GraphData = serde_json::from_str(json).unwrap();
		assert_eq!(data.nodes[0].group, "Service");
		assert_eq!(data.nodes[0].display_label(), "svc");
		assert_eq!(data.nodes[1].display_label(), "Ticket 1");
		assert_eq!(data.edges[0].kind, "AFFECTS");
		assert_eq!(data.edges[0].derived_id(), "t1-AFFECTS-svc");
	}

	#[test]
	fn snapshot_accepts_rest_endpoint_shape() {
		let json = r#"{
			"nodes": [
				{"id": "svc-auth", "position": {"x": 0, "y": 0},
				 "data": {"label": "Auth Service", "type": "Service", "description": ""}},
				{"id": "tkt-1", "position": {"x": 150, "y": 0},
				 "data": {"label": "Login failures", "type": "Ticket", "description": "Cannot sign in"}}
			],
			"edges": [
				{"id": "tkt-1-AFFECTS-svc-auth", "source": "tkt-1", "target": "svc-auth",
				 "label": "AFFECTS", "type": "step"}
			]
		}"#;
		let data: GraphData = serde_json::from_str(json).unwrap();
		assert_eq!(data.nodes[0].display_label(), "Auth Service");
		assert_eq!(data.nodes[0].group, "Service");
		assert_eq!(data.nodes[0].description, None);
		assert_eq!(data.nodes[1].group, "Ticket");
		assert_eq!(data.nodes[1].description.as_deref(), Some("Cannot sign in"));
		assert_eq!(data.edges[0].kind, "AFFECTS");
		assert_eq!(data.edges[0].id, "tkt-1-AFFECTS-svc-auth");
	}

	#[test]
	fn top_level_fields_win_over_nested_data() {
		let node: GraphNode =
			serde_json::from_str(r#"{"id": "x", "group": "A", "data": {"type": "B", "label": "L"}}"#)
				.unwrap();
		assert_eq!(node.group, "A");
		assert_eq!(node.display_label(), "L");
	}

	#[test]
	fn groups_in_first_seen_order() {
		let data = GraphData {
			nodes: vec![
				GraphNode::new("a", "Service"),
				GraphNode::new("b", "Ticket"),
				GraphNode::new("c", "Service"),
				GraphNode::new("d", "User"),
			],
			edges: Vec::new(),
		};
		assert_eq!(data.groups(), ["Service", "Ticket", "User"]);
	}

	#[test]
	fn missing_group_is_unknown() {
		let node: GraphNode = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
		assert_eq!(node.group, "Unknown");
	}

	#[test]
	fn other_end() {
		let e = GraphEdge::new("e", "a", "b", "REL");
		assert_eq!(e.other_end("a"), Some("b"));
		assert_eq!(e.other_end("b"), Some("a"));
		assert_eq!(e.other_end("c"), None);
	}
}
