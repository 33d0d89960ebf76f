//! Pan/zoom transform, independent of the simulation.
//!
//! Screen coordinates are `graph * scale + translate`. Nothing here touches
//! node positions.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::error::GraphError;

const DEGENERATE_EXTENT: f64 = 1e-6;

/// Axis-aligned box around a set of graph-space points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
	/// Left edge.
	pub min_x: f64,
	/// Top edge.
	pub min_y: f64,
	/// Right edge.
	pub max_x: f64,
	/// Bottom edge.
	pub max_y: f64,
}

impl Bounds {
	/// Smallest box containing every point, `None` for no points.
	pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
		points.into_iter().fold(None, |acc, (x, y)| {
			Some(match acc {
				None => Self {
					min_x: x,
					min_y: y,
					max_x: x,
					max_y: y,
				},
				Some(b) => Self {
					min_x: b.min_x.min(x),
					min_y: b.min_y.min(y),
					max_x: b.max_x.max(x),
					max_y: b.max_y.max(y),
				},
			})
		})
	}

	/// Horizontal extent.
	pub fn width(&self) -> f64 {
		self.max_x - self.min_x
	}

	/// Vertical extent.
	pub fn height(&self) -> f64 {
		self.max_y - self.min_y
	}

	/// Midpoint.
	pub fn center(&self) -> (f64, f64) {
		(
			(self.min_x + self.max_x) / 2.0,
			(self.min_y + self.max_y) / 2.0,
		)
	}

	/// Zero width or zero height.
	pub fn is_degenerate(&self) -> bool {
		self.width() < DEGENERATE_EXTENT || self.height() < DEGENERATE_EXTENT
	}
}

/// Zoom limits and toolbar step sizes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
	/// Smallest allowed scale.
	pub min_scale: f64,
	/// Largest allowed scale.
	pub max_scale: f64,
	/// Factor applied by one zoom-in / zoom-out command.
	pub zoom_step: f64,
	/// Fraction of the viewport that fitted content may occupy.
	pub fit_margin: f64,
	/// Scale used when content cannot be fitted.
	pub default_scale: f64,
}

impl Default for ViewportConfig {
	fn default() -> Self {
		Self {
			min_scale: 0.1,
			max_scale: 10.0,
			zoom_step: 1.2,
			fit_margin: 0.9,
			default_scale: 1.0,
		}
	}
}

impl ViewportConfig {
	/// Reject limits that would make zooming or fitting meaningless.
	pub fn validate(&self) -> Result<(), GraphError> {
		let positive = |name: &'static str, value: f64| {
			if value.is_finite() && value > 0.0 {
				Ok(())
			} else {
				Err(GraphError::InvalidConfig(format!(
					"viewport.{name} must be a positive number, got {value}"
				)))
			}
		};
		positive("min_scale", self.min_scale)?;
		positive("max_scale", self.max_scale)?;
		positive("zoom_step", self.zoom_step)?;
		positive("fit_margin", self.fit_margin)?;
		positive("default_scale", self.default_scale)?;
		if self.min_scale > self.max_scale {
			return Err(GraphError::InvalidConfig(format!(
				"viewport.min_scale {} exceeds max_scale {}",
				self.min_scale, self.max_scale
			)));
		}
		if self.fit_margin > 1.0 {
			return Err(GraphError::InvalidConfig(format!(
				"viewport.fit_margin {} exceeds 1",
				self.fit_margin
			)));
		}
		Ok(())
	}
}

/// Commands an external toolbar can send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewportCommand {
	/// Zoom in one step about the viewport center.
	ZoomIn,
	/// Zoom out one step about the viewport center.
	ZoomOut,
	/// Back to the identity transform.
	Reset,
	/// Scale and center the visible nodes.
	Fit,
}

/// Result of `fit_to_content`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitOutcome {
	/// Content scaled and centered.
	Fitted,
	/// Bounds were degenerate; content centered at the default scale.
	Fallback,
}

/// Maps graph space to screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal offset in screen pixels.
	pub translate_x: f64,
	/// Vertical offset in screen pixels.
	pub translate_y: f64,
	/// Screen pixels per graph unit.
	pub scale: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			translate_x: 0.0,
			translate_y: 0.0,
			scale: 1.0,
		}
	}
}

/// Owns the transform and the viewport size in screen pixels.
#[derive(Clone, Debug)]
pub struct Viewport {
	/// Current transform.
	pub transform: ViewTransform,
	/// Viewport width in screen pixels.
	pub width: f64,
	/// Viewport height in screen pixels.
	pub height: f64,
	config: ViewportConfig,
}

impl Viewport {
	/// Viewport of `width`×`height` screen pixels at the identity transform.
	/// An invalid `config` is replaced by the defaults.
	pub fn new(width: f64, height: f64, config: ViewportConfig) -> Self {
		let config = match config.validate() {
			Ok(()) => config,
			Err(err) => {
				warn!("{err}; using default viewport limits");
				ViewportConfig::default()
			}
		};
		Self {
			transform: ViewTransform::default(),
			width,
			height,
			config,
		}
	}

	/// Limits in use; an invalid config passed to `new` shows up here as the defaults.
	pub fn config(&self) -> &ViewportConfig {
		&self.config
	}

	/// The canvas changed size. The transform is kept.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	/// Center of the viewport in screen pixels.
	pub fn screen_center(&self) -> (f64, f64) {
		(self.width / 2.0, self.height / 2.0)
	}

	/// Inverse of [`Viewport::graph_to_screen`].
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		let t = &self.transform;
		((sx - t.translate_x) / t.scale, (sy - t.translate_y) / t.scale)
	}

	/// Where a graph-space point lands on screen.
	pub fn graph_to_screen(&self, gx: f64, gy: f64) -> (f64, f64) {
		let t = &self.transform;
		(gx * t.scale + t.translate_x, gy * t.scale + t.translate_y)
	}

	fn clamp_scale(&self, scale: f64) -> f64 {
		scale.clamp(self.config.min_scale, self.config.max_scale)
	}

	/// Multiply the scale, keeping `pivot` (screen pixels) fixed on screen.
	/// Pivots on the viewport center when none is given.
	pub fn zoom_by(&mut self, factor: f64, pivot: Option<(f64, f64)>) {
		if !(factor.is_finite() && factor > 0.0) {
			return;
		}
		let scale = self.transform.scale * factor;
		self.zoom_to(scale, pivot);
	}

	/// Replace the scale, clamped to the configured range.
	pub fn zoom_to(&mut self, scale: f64, pivot: Option<(f64, f64)>) {
		if !scale.is_finite() {
			return;
		}
		let (px, py) = pivot.unwrap_or_else(|| self.screen_center());
		let new_k = self.clamp_scale(scale);
		let ratio = new_k / self.transform.scale;
		let t = &mut self.transform;
		t.translate_x = px - (px - t.translate_x) * ratio;
		t.translate_y = py - (py - t.translate_y) * ratio;
		t.scale = new_k;
	}

	/// Translate by a delta in screen pixels.
	pub fn pan(&mut self, dx: f64, dy: f64) {
		self.transform.translate_x += dx;
		self.transform.translate_y += dy;
	}

	/// Back to identity.
	pub fn reset(&mut self) {
		self.transform = ViewTransform::default();
	}

	/// Scale and center `bounds` inside the viewport.
	pub fn fit_to_content(&mut self, bounds: Bounds) -> FitOutcome {
		let (cx, cy) = bounds.center();
		let (outcome, scale) = if bounds.is_degenerate() {
			warn!("fit requested for degenerate bounds {bounds:?}, using default scale");
			(
				FitOutcome::Fallback,
				self.clamp_scale(self.config.default_scale),
			)
		} else {
			let fit = (self.width / bounds.width()).min(self.height / bounds.height())
				* self.config.fit_margin;
			(FitOutcome::Fitted, self.clamp_scale(fit))
		};

		let (sx, sy) = self.screen_center();
		self.transform = ViewTransform {
			translate_x: sx - cx * scale,
			translate_y: sy - cy * scale,
			scale,
		};
		debug!("viewport fitted: {:?}", self.transform);
		outcome
	}

	/// Apply a toolbar command. `Fit` needs content bounds; without any it
	/// leaves the transform untouched.
	pub fn apply(&mut self, command: ViewportCommand, content: Option<Bounds>) {
		match command {
			ViewportCommand::ZoomIn => self.zoom_by(self.config.zoom_step, None),
			ViewportCommand::ZoomOut => self.zoom_by(1.0 / self.config.zoom_step, None),
			ViewportCommand::Reset => self.reset(),
			ViewportCommand::Fit => {
				if let Some(bounds) = content {
					self.fit_to_content(bounds);
				}
			}
		}
	}
}
