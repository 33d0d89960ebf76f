//! Category colors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Group → color lookup used by rendering. Layout never consults it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
	/// Explicit colors for known groups.
	pub overrides: HashMap<String, String>,
}

impl Palette {
	/// Pin `group` to a color.
	pub fn with_override(mut self, group: impl Into<String>, color: impl Into<String>) -> Self {
		self.overrides.insert(group.into(), color.into());
		self
	}

	/// Color for `group`: the override if any, otherwise a categorical color
	/// chosen by a stable hash of the name.
	pub fn color(&self, group: &str) -> &str {
		if let Some(color) = self.overrides.get(group) {
			return color;
		}
		// FNV-1a, stable across runs and platforms
		let hash = group
			.bytes()
			.fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
				(h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
			});
		COLORS[(hash % COLORS.len() as u64) as usize]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stable_and_overridable() {
		let palette = Palette::default();
		assert_eq!(palette.color("Service"), palette.color("Service"));
		assert!(COLORS.contains(&palette.color("Ticket")));

		let palette = palette.with_override("Service", "#ffffff");
		assert_eq!(palette.color("Service"), "#ffffff");
	}
}
