use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::ForceGraphState;
use crate::graph::{
	EngineConfig, EngineEvent, GraphData, GraphFilter, GraphStore, Palette, ViewportCommand,
};

type SharedState = Rc<RefCell<Option<ForceGraphState>>>;

/// Forward queued engine events to the page. Runs outside the state borrow so
/// callbacks may touch signals freely.
fn dispatch_events(state: &SharedState, on_select: Option<Callback<Option<String>>>) {
	let events = match state.borrow_mut().as_mut() {
		Some(s) => s.engine.take_events(),
		None => return,
	};
	for event in events {
		match event {
			EngineEvent::SelectionChanged(id) => {
				if let Some(cb) = on_select {
					cb.run(id);
				}
			}
			EngineEvent::Expanded { node, nodes, edges } => {
				debug!("{node} expanded: +{nodes} nodes, +{edges} edges");
			}
		}
	}
}

fn pointer_position(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Knowledge-graph canvas: click selects, double-click expands, drag moves a
/// node, drag on the background pans, wheel zooms.
#[component]
pub fn ForceGraphCanvas(
	#[prop(into)] data: Signal<GraphData>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
	#[prop(optional)] config: Option<EngineConfig>,
	#[prop(optional)] palette: Option<Palette>,
	/// Called with the primary selection whenever it changes.
	#[prop(optional)]
	on_select: Option<Callback<Option<String>>>,
	/// Toolbar commands; every set is applied once.
	#[prop(optional, into)]
	command: MaybeProp<ViewportCommand>,
	/// Outside filter; `None` restarts from the root nodes.
	#[prop(optional, into)]
	filter: MaybeProp<GraphFilter>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: SharedState = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());
	let config = config.unwrap_or_default();
	let palette = palette.unwrap_or_default();

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let window_size = |win: &Window| {
			(
				win.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0),
				win.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0),
			)
		};

		let (w, h) = if fullscreen {
			window_size(&window)
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = match canvas.get_context("2d") {
			Ok(Some(ctx)) => match ctx.dyn_into() {
				Ok(ctx) => ctx,
				Err(_) => return,
			},
			_ => {
				warn!("2d canvas context unavailable");
				return;
			}
		};

		let store = Rc::new(GraphStore::from_data(data.get()));
		{
			let mut slot = state_init.borrow_mut();
			if let Some(old) = slot.as_mut() {
				old.engine.destroy();
			}
			*slot = Some(ForceGraphState::new(
				store,
				config.clone(),
				palette.clone(),
				w,
				h,
			));
		}

		if fullscreen && resize_cb_init.borrow().is_none() {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = window_size(&win);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		if animate_init.borrow().is_some() {
			return;
		}
		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move |now: f64| {
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.frame(now);
				render::render(s, &ctx);
			}
			dispatch_events(&state_anim, on_select);
			if let (Some(win), Some(cb)) = (web_sys::window(), animate_inner.borrow().as_ref()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_cmd = state.clone();
	Effect::new(move |_| {
		if let Some(cmd) = command.get() {
			if let Some(ref mut s) = *state_cmd.borrow_mut() {
				s.engine.command(cmd);
			}
		}
	});

	let state_filter = state.clone();
	Effect::new(move |_| {
		let filter = filter.get();
		if let Some(ref mut s) = *state_filter.borrow_mut() {
			match filter {
				Some(f) => s.engine.apply_filter(&f),
				None => s.engine.restart(),
			}
			s.set_hover(None);
		}
		dispatch_events(&state_filter, on_select);
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.engine.pointer_down(x, y, ev.time_stamp());
		}
		dispatch_events(&state_md, on_select);
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			if s.engine.dragged().is_none() {
				let hovered = s.engine.node_at(x, y).map(|n| n.data.id.clone());
				s.set_hover(hovered);
			}
			s.engine.pointer_move(x, y);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		if let Some(ref mut s) = *state_mu.borrow_mut() {
			s.engine.pointer_up(ev.time_stamp());
		}
		dispatch_events(&state_mu, on_select);
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.engine.pointer_leave();
			s.set_hover(None);
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			s.engine.wheel(x, y, ev.delta_y());
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
