use std::collections::HashSet;

use leptos::ev;
use leptos::prelude::*;
use log::{error, info};

use crate::components::force_graph::ForceGraphCanvas;
use crate::graph::{GraphData, GraphError, GraphFilter, Palette, ViewportCommand};

/// Bundled snapshot of the service-desk ontology.
const ONTOLOGY: &str = include_str!("../../assets/ontology.json");

fn load_ontology() -> Result<GraphData, GraphError> {
	serde_json::from_str(ONTOLOGY).map_err(GraphError::Snapshot)
}

fn property_text(value: &serde_json::Value) -> String {
	value
		.as_str()
		.map(str::to_owned)
		.unwrap_or_else(|| value.to_string())
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let ontology = load_ontology();
	match &ontology {
		Ok(data) => info!(
			"ontology loaded: {} nodes, {} edges",
			data.nodes.len(),
			data.edges.len()
		),
		Err(err) => error!("ontology snapshot rejected: {err}"),
	}

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>{ontology.map(|data| view! { <Explorer data /> })}</ErrorBoundary>
	}
}

#[component]
fn Explorer(data: GraphData) -> impl IntoView {
	let groups = data.groups();
	let nodes = StoredValue::new(data.nodes.clone());
	let graph_data = Signal::derive(move || data.clone());
	let palette = Palette::default();

	let command = RwSignal::new(None::<ViewportCommand>);
	let hidden = RwSignal::new(HashSet::<String>::new());
	let search = RwSignal::new(String::new());
	let restarts = RwSignal::new(0_u32);
	let selected = RwSignal::new(None::<String>);

	// no hidden group and no search text means "start over from the roots"
	let all_groups = groups.clone();
	let filter = Signal::derive(move || {
		restarts.track();
		let hidden = hidden.get();
		let text = search.get();
		if hidden.is_empty() && text.trim().is_empty() {
			return None;
		}
		Some(GraphFilter {
			groups: Some(
				all_groups
					.iter()
					.filter(|g| !hidden.contains(*g))
					.cloned()
					.collect(),
			),
			edge_kinds: None,
			text: Some(text),
		})
	});

	let on_select = Callback::new(move |id: Option<String>| selected.set(id));
	let send = move |cmd: ViewportCommand| move |_: ev::MouseEvent| command.set(Some(cmd));
	let restart = move |_| {
		hidden.set(HashSet::new());
		search.set(String::new());
		restarts.update(|n| *n += 1);
	};

	let toggles = groups
		.into_iter()
		.map(|group| {
			let color = palette.color(&group).to_owned();
			let (toggled, checked) = (group.clone(), group.clone());
			let toggle = move |_| {
				hidden.update(|h| {
					if !h.remove(&toggled) {
						h.insert(toggled.clone());
					}
				})
			};
			view! {
				<label class="group-toggle">
					<input
						type="checkbox"
						prop:checked=move || !hidden.with(|h| h.contains(&checked))
						on:change=toggle
					/>
					<span class="swatch" style=format!("background: {color};") />
					{group}
				</label>
			}
		})
		.collect_view();

	let details = move || {
		let id = selected.get()?;
		let node = nodes.with_value(|ns| ns.iter().find(|n| n.id == id).cloned())?;
		Some(view! {
			<aside class="details-panel">
				<h2>{node.display_label().to_owned()}</h2>
				<p class="details-group">{node.group.clone()}</p>
				{node.description.clone().map(|d| view! { <p>{d}</p> })}
				<dl>
					{node
						.properties
						.iter()
						.map(|(k, v)| view! {
							<dt>{k.clone()}</dt>
							<dd>{property_text(v)}</dd>
						})
						.collect_view()}
				</dl>
			</aside>
		})
	};

	view! {
		<div class="fullscreen-graph">
			<ForceGraphCanvas
				data=graph_data
				fullscreen=true
				palette=palette.clone()
				on_select=on_select
				command=Signal::derive(move || command.get())
				filter=filter
			/>
			<div class="graph-overlay">
				<h1>"Knowledge Graph"</h1>
				<p class="subtitle">
					"Click to select. Double-click to expand. Drag nodes to reposition. Scroll to zoom."
				</p>
				<div class="toolbar">
					<button on:click=send(ViewportCommand::ZoomIn)>"Zoom in"</button>
					<button on:click=send(ViewportCommand::ZoomOut)>"Zoom out"</button>
					<button on:click=send(ViewportCommand::Reset)>"Reset"</button>
					<button on:click=send(ViewportCommand::Fit)>"Fit"</button>
					<button on:click=restart>"Restart"</button>
				</div>
				<input
					type="search"
					placeholder="Search nodes"
					prop:value=move || search.get()
					on:input=move |ev| search.set(event_target_value(&ev))
				/>
				<div class="group-filters">{toggles}</div>
			</div>
			{details}
		</div>
	}
}
