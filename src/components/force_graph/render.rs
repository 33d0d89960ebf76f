use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::ForceGraphState;

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let viewport = state.engine.viewport();
	let t = viewport.transform;
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, viewport.width, viewport.height);
	ctx.save();
	let _ = ctx.translate(t.translate_x, t.translate_y);
	let _ = ctx.scale(t.scale, t.scale);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn draw_edges(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let k = state.engine.viewport().transform.scale;
	let node_radius = state.node_radius();
	let (line_width, dash, gap, arrow_size) = (1.5 / k, 8.0 / k, 4.0 / k, 8.0 / k);
	let dash_offset = -(state.flow_time * 30.0) % (dash + gap);
	let t = ease_out_cubic(state.hover.highlight_t);
	let visible = state.engine.visible();
	let selected = state.engine.highlighted();

	for edge in visible.edges() {
		let (n1, n2) = (&visible.nodes()[edge.source], &visible.nodes()[edge.target]);
		let (x1, y1, x2, y2) = (n1.x, n1.y, n2.x, n2.y);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}

		let is_highlighted = state.is_highlighted(n1.id()) && state.is_highlighted(n2.id());
		let is_selected = selected.contains(n1.id()) && selected.contains(n2.id());

		// t=0: every edge at base alpha; t=1: hovered edges brighten, the rest dim
		let (edge_alpha, arrow_alpha, width) = if is_highlighted || is_selected {
			(0.6 + 0.3 * t, 0.8 + 0.1 * t, line_width * (1.0 + 0.3 * t))
		} else {
			(0.6 - 0.45 * t, 0.8 - 0.45 * t, line_width * (1.0 - 0.3 * t))
		};

		ctx.set_stroke_style_str(&format!("rgba(100, 180, 255, {})", edge_alpha));
		ctx.set_line_width(width);
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(dash),
			&JsValue::from_f64(gap),
		));
		ctx.set_line_dash_offset(dash_offset);

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(x1 + ux * node_radius, y1 + uy * node_radius);
		ctx.line_to(
			x2 - ux * (node_radius + arrow_size),
			y2 - uy * (node_radius + arrow_size),
		);
		ctx.stroke();

		let _ = ctx.set_line_dash(&js_sys::Array::new());
		ctx.set_fill_style_str(&format!("rgba(100, 180, 255, {})", arrow_alpha));
		let (tip_x, tip_y) = (x2 - ux * node_radius, y2 - uy * node_radius);
		let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();

		if is_selected && !edge.data.kind.is_empty() {
			ctx.set_fill_style_str("rgba(200, 220, 255, 0.8)");
			ctx.set_font(&format!("{}px sans-serif", 9.0 / k.max(0.5)));
			let _ = ctx.fill_text(&edge.data.kind, (x1 + x2) / 2.0, (y1 + y2) / 2.0);
		}
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let (has_highlight, t, k) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
		state.engine.viewport().transform.scale,
	);
	let node_radius = state.node_radius();
	let selection = state.engine.selection();
	let visible = state.engine.visible();

	for node in visible.nodes() {
		let id = node.id();
		if has_highlight && state.is_highlighted(id) {
			continue;
		}
		let (x, y) = (node.x, node.y);
		let (alpha, radius) = (1.0 - 0.7 * t, node_radius * (1.0 - 0.15 * t));

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(state.palette.color(&node.data.group));
		ctx.fill();
		ctx.set_global_alpha(1.0);

		if selection.contains(id) {
			draw_selection_ring(ctx, x, y, radius, k);
		}
		if state.engine.is_expanded(id) {
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius * 0.35, 0.0, 2.0 * PI);
			ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha * 0.6));
			ctx.fill();
		}

		ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha * 0.8));
		ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
		let _ = ctx.fill_text(node.data.display_label(), x + radius + 3.0, y + 3.0);
	}

	if !has_highlight {
		return;
	}

	for node in visible.nodes() {
		let id = node.id();
		if !state.is_highlighted(id) {
			continue;
		}
		let (x, y) = (node.x, node.y);
		let is_hovered = state.is_hovered(id);
		let is_neighbor =
			state.hover.neighbors.contains(id) || state.hover.prev_neighbors.contains(id);

		let (radius, glow_radius) = if is_hovered {
			(
				node_radius * (1.0 + 0.35 * t),
				node_radius * (1.8 + 1.2 * t),
			)
		} else if is_neighbor {
			(node_radius * (1.0 + 0.2 * t), node_radius * (1.4 + 0.6 * t))
		} else {
			(node_radius, 0.0)
		};

		if glow_radius > 0.0 && t > 0.01 {
			if let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius) {
				let alpha = if is_hovered { 0.35 * t } else { 0.2 * t };
				let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", alpha));
				let _ = gradient
					.add_color_stop(0.6, &format!("rgba(200, 220, 255, {})", alpha * 0.3));
				let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
				ctx.begin_path();
				let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}

		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(state.palette.color(&node.data.group));
		ctx.fill();

		if selection.contains(id) {
			draw_selection_ring(ctx, x, y, radius, k);
		}
		if is_hovered && t > 0.01 {
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius + 2.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.7 * t));
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		ctx.set_fill_style_str("white");
		ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
		let _ = ctx.fill_text(node.data.display_label(), x + radius + 3.0, y + 3.0);
	}
}

fn draw_selection_ring(ctx: &CanvasRenderingContext2d, x: f64, y: f64, radius: f64, k: f64) {
	ctx.begin_path();
	let _ = ctx.arc(x, y, radius + 3.0 / k, 0.0, 2.0 * PI);
	ctx.set_stroke_style_str("#ffd166");
	ctx.set_line_width(2.0 / k);
	ctx.stroke();
}
