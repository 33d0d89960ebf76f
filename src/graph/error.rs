//! Error type for parsing snapshots and configuration.

use thiserror::Error;

/// Failures at the parsing boundary. Everything past it recovers locally.
#[derive(Debug, Error)]
pub enum GraphError {
	/// The graph snapshot was not valid JSON or had the wrong shape.
	#[error("invalid graph snapshot: {0}")]
	Snapshot(#[source] serde_json::Error),
	/// The engine configuration could not be parsed.
	#[error("invalid engine config: {0}")]
	Config(#[source] serde_json::Error),
	/// The engine configuration parsed but holds unusable values.
	#[error("invalid engine config: {0}")]
	InvalidConfig(String),
}
