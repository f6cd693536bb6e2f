//! Change records exchanged with the change sink.

use serde::{Deserialize, Serialize};

use crate::specifics::SessionSpecifics;

/// Operation carried by a change record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
	Add,
	Update,
	Delete,
}

/// Which entity a change record addresses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
	SessionHeader,
	Tab,
}

/// Addressing key of a record: the session plus, for tabs, the node id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct ChangeKey {
	pub session_tag: String,
	pub tab_node_id: Option<i32>,
}

impl ChangeKey {
	/// Renders the stable client tag used by the transport to address the node.
	///
	/// Headers use the bare session tag; tab nodes append the node id.
	pub fn client_tag(&self) -> String {
		match self.tab_node_id {
			Some(node) => format!("{} {}", self.session_tag, node),
			None => self.session_tag.clone(),
		}
	}
}

/// One add/update/delete operation on a session record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncChange {
	pub op: ChangeOp,
	pub specifics: SessionSpecifics,
	/// Modification time of the record in milliseconds since the Unix epoch.
	#[serde(default)]
	pub modified_time_ms: i64,
}

impl SyncChange {
	pub fn new(op: ChangeOp, specifics: SessionSpecifics, modified_time_ms: i64) -> Self {
		Self {
			op,
			specifics,
			modified_time_ms,
		}
	}

	/// Deletion of the tab node `tab_node_id` in `session_tag`.
	pub fn delete_tab_node(session_tag: impl Into<String>, tab_node_id: i32) -> Self {
		Self::new(ChangeOp::Delete, SessionSpecifics::tab_node_placeholder(session_tag, tab_node_id), 0)
	}

	/// Deletion of the header of `session_tag`.
	pub fn delete_header(session_tag: impl Into<String>) -> Self {
		Self::new(
			ChangeOp::Delete,
			SessionSpecifics {
				session_tag: session_tag.into(),
				..Default::default()
			},
			0,
		)
	}

	/// Records with a node id address a tab node, everything else the header.
	pub fn kind(&self) -> EntityKind {
		if self.specifics.header.is_none() && (self.specifics.tab_node_id.is_some() || self.specifics.tab.is_some()) {
			EntityKind::Tab
		} else {
			EntityKind::SessionHeader
		}
	}

	pub fn key(&self) -> ChangeKey {
		ChangeKey {
			session_tag: self.specifics.session_tag.clone(),
			tab_node_id: match self.kind() {
				EntityKind::Tab => self.specifics.tab_node_id,
				EntityKind::SessionHeader => None,
			},
		}
	}

	pub fn client_tag(&self) -> String {
		self.key().client_tag()
	}

	/// Opaque payload handed to the transport.
	pub fn payload(&self) -> serde_json::Result<Vec<u8>> {
		serde_json::to_vec(&self.specifics)
	}
}
