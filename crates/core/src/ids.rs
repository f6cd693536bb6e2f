//! Identifier newtypes for the session graph.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// Durable identifier of a tab's sync node. Survives browser restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabNodeId(pub i32);

impl TabNodeId {
	/// Converts a wire value, rejecting the negative "invalid" sentinel.
	pub fn from_wire(raw: i32) -> Option<Self> {
		(raw >= 0).then_some(Self(raw))
	}
}

impl Display for TabNodeId {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		write!(f, "node:{}", self.0)
	}
}

/// Per-process tab identifier. Rebound after restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i32);

impl Display for TabId {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		write!(f, "tab:{}", self.0)
	}
}

/// Window identifier, unique within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub i32);

impl Display for WindowId {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		write!(f, "window:{}", self.0)
	}
}
