//! Classification of inbound records before they touch the tracker.

use std::collections::BTreeSet;

use tabsync_protocol::{ChangeOp, EntityKind, SessionHeader, SessionTabSpecifics, SyncChange};

use crate::error::RecordError;
use crate::ids::{TabId, TabNodeId, WindowId};

/// A remote record that passed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum RemoteRecord<'a> {
	Header(&'a SessionHeader),
	Tab {
		node: TabNodeId,
		tab_id: TabId,
		specifics: &'a SessionTabSpecifics,
	},
	/// A node the remote side allocated but has not filled yet.
	TabNode(TabNodeId),
	DeleteHeader,
	DeleteTab(TabNodeId),
}

/// Checks one record for identity and placement problems.
pub fn validate_change(change: &SyncChange) -> Result<(), RecordError> {
	classify(change).map(|_| ())
}

pub(crate) fn classify(change: &SyncChange) -> Result<RemoteRecord<'_>, RecordError> {
	let specifics = &change.specifics;
	let session_tag = &specifics.session_tag;
	if session_tag.trim().is_empty() {
		return Err(RecordError::MissingSessionTag);
	}
	if specifics.header.is_some() && specifics.tab.is_some() {
		return Err(RecordError::AmbiguousRecord {
			session_tag: session_tag.clone(),
		});
	}

	let node = || {
		specifics
			.tab_node_id
			.and_then(TabNodeId::from_wire)
			.ok_or_else(|| RecordError::MissingTabNodeId {
				session_tag: session_tag.clone(),
			})
	};

	if change.op == ChangeOp::Delete {
		return match change.kind() {
			EntityKind::SessionHeader => Ok(RemoteRecord::DeleteHeader),
			EntityKind::Tab => node().map(RemoteRecord::DeleteTab),
		};
	}

	if let Some(header) = &specifics.header {
		validate_header(session_tag, header)?;
		return Ok(RemoteRecord::Header(header));
	}

	if specifics.tab_node_id.is_none() && specifics.tab.is_none() {
		return Err(RecordError::EmptyRecord {
			session_tag: session_tag.clone(),
		});
	}

	let node = node()?;
	let Some(tab) = &specifics.tab else {
		return Ok(RemoteRecord::TabNode(node));
	};
	let Some(tab_id) = tab.tab_id else {
		return Err(RecordError::MissingTabId {
			session_tag: session_tag.clone(),
			tab_node_id: node.0,
		});
	};
	if tab.window_id.is_none() {
		return Err(RecordError::MissingWindowId {
			session_tag: session_tag.clone(),
			tab_node_id: node.0,
		});
	}
	Ok(RemoteRecord::Tab {
		node,
		tab_id: TabId(tab_id),
		specifics: tab,
	})
}

/// Rejects headers that name a window twice or place a tab in two slots.
fn validate_header(session_tag: &str, header: &SessionHeader) -> Result<(), RecordError> {
	let mut windows = BTreeSet::new();
	let mut tabs = BTreeSet::new();
	for window in &header.windows {
		let Some(window_id) = window.window_id else {
			return Err(RecordError::HeaderWindowWithoutId {
				session_tag: session_tag.to_string(),
			});
		};
		if !windows.insert(WindowId(window_id)) {
			return Err(RecordError::DuplicateWindow {
				session_tag: session_tag.to_string(),
				window_id,
			});
		}
		for tab_id in &window.tabs {
			if !tabs.insert(*tab_id) {
				return Err(RecordError::DuplicateTab {
					session_tag: session_tag.to_string(),
					tab_id: *tab_id,
				});
			}
		}
	}
	Ok(())
}
