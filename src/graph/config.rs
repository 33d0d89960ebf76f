//! Engine-wide configuration.

use serde::{Deserialize, Serialize};

use super::error::GraphError;
use super::interaction::InteractionConfig;
use super::layout::LayoutConfig;
use super::viewport::ViewportConfig;

/// Everything an engine instance is tuned with. Missing fields take their
/// defaults, so `{}` is a valid config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	/// Force simulation tuning.
	pub layout: LayoutConfig,
	/// Zoom limits and fit margin.
	pub viewport: ViewportConfig,
	/// Click and double-click thresholds.
	pub interaction: InteractionConfig,
	/// Seed for initial placement and jiggle. Same seed, same layout.
	pub seed: u64,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			layout: LayoutConfig::default(),
			viewport: ViewportConfig::default(),
			interaction: InteractionConfig::default(),
			seed: 0x5eed,
		}
	}
}

impl EngineConfig {
	/// Parse a JSON config; missing fields take their defaults and the
	/// viewport limits are validated.
	pub fn from_json(json: &str) -> Result<Self, GraphError> {
		let config: Self = serde_json::from_str(json).map_err(GraphError::Config)?;
		config.viewport.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_config_fills_defaults() {
		let config =
			EngineConfig::from_json(r#"{"seed": 7, "layout": {"link_distance": 90.0}}"#).unwrap();
		assert_eq!(config.seed, 7);
		assert_eq!(config.layout.link_distance, 90.0);
		assert_eq!(config.layout.repulsion, LayoutConfig::default().repulsion);
		assert_eq!(config.viewport, ViewportConfig::default());
	}

	#[test]
	fn inverted_zoom_range_is_an_error() {
		assert!(matches!(
			EngineConfig::from_json(r#"{"viewport": {"min_scale": 5.0, "max_scale": 1.0}}"#),
			Err(GraphError::InvalidConfig(_))
		));
		assert!(matches!(
			EngineConfig::from_json(r#"{"viewport": {"fit_margin": 0.0}}"#),
			Err(GraphError::InvalidConfig(_))
		));
	}

	#[test]
	fn bad_config_is_an_error() {
		assert!(matches!(
			EngineConfig::from_json(r#"{"seed": "x"}"#),
			Err(GraphError::Config(_))
		));
	}
}
