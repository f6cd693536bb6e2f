//! Stable sync node ids backing the local device's tabs.
//!
//! Every local tab is stored in its own sync node. Node ids survive browser
//! restarts while tab ids do not, so the pool tracks each known node in
//! exactly one of three states:
//!
//! * **associated**: bound to a live tab id
//! * **unassociated**: restored from storage at startup, not yet matched to a tab
//! * **free**: available for the next tab that needs a node
//!
//! Node ids are never reused for a different purpose once handed out; freed
//! nodes are recycled, and when too many pile up the surplus is deleted in a
//! single batch (high watermark → low watermark).

use std::collections::{BTreeMap, BTreeSet};

use tabsync_protocol::{ChangeOp, SessionSpecifics, SyncChange};
use tracing::{debug, error, warn};

use crate::config::{FREE_NODES_HIGH_WATERMARK, FREE_NODES_LOW_WATERMARK};
use crate::ids::{TabId, TabNodeId};

/// Pool of tab node ids for one local session tag.
#[derive(Debug, Clone)]
pub struct TabNodePool {
	machine_tag: String,
	associated: BTreeMap<TabNodeId, TabId>,
	unassociated: BTreeSet<TabNodeId>,
	free: BTreeSet<TabNodeId>,
	max_used_tab_node_id: Option<TabNodeId>,
	high_watermark: usize,
	low_watermark: usize,
}

impl TabNodePool {
	pub fn new(machine_tag: impl Into<String>) -> Self {
		Self::with_watermarks(machine_tag, FREE_NODES_HIGH_WATERMARK, FREE_NODES_LOW_WATERMARK)
	}

	pub fn with_watermarks(machine_tag: impl Into<String>, high_watermark: usize, low_watermark: usize) -> Self {
		debug_assert!(low_watermark <= high_watermark);
		Self {
			machine_tag: machine_tag.into(),
			associated: BTreeMap::new(),
			unassociated: BTreeSet::new(),
			free: BTreeSet::new(),
			max_used_tab_node_id: None,
			high_watermark,
			low_watermark,
		}
	}

	/// Registers a node found in storage as unassociated.
	pub fn add_tab_node(&mut self, node: TabNodeId) {
		if self.is_tracked(node) {
			contract_violation(node, "add_tab_node on an already tracked node");
			return;
		}
		self.unassociated.insert(node);
		self.bump_max_used(node);
	}

	/// Binds a free or unassociated node to `tab_id`.
	pub fn associate_tab_node(&mut self, node: TabNodeId, tab_id: TabId) {
		if self.associated.contains_key(&node) {
			contract_violation(node, "associate_tab_node on an associated node");
			return;
		}
		if !self.unassociated.remove(&node) && !self.free.remove(&node) {
			contract_violation(node, "associate_tab_node on an untracked node");
			return;
		}
		debug!(target = "tabsync.pool", %node, %tab_id, "associated tab node");
		self.associated.insert(node, tab_id);
	}

	/// Binds an unassociated (or already associated) node straight to `tab_id`,
	/// bypassing the free set.
	pub fn reassociate_tab_node(&mut self, node: TabNodeId, tab_id: TabId) {
		if !self.unassociated.remove(&node) && !self.associated.contains_key(&node) {
			contract_violation(node, "reassociate_tab_node on a free or untracked node");
			return;
		}
		debug!(target = "tabsync.pool", %node, %tab_id, "reassociated tab node");
		self.associated.insert(node, tab_id);
	}

	/// Returns a free node id, allocating (and announcing) a new one if needed.
	/// New ids continue past the highest id seen; once that reaches
	/// `i32::MAX` the lowest untracked id is handed out instead.
	///
	/// Repeated calls without an association in between return the same id.
	pub fn get_free_tab_node(&mut self, changes: &mut Vec<SyncChange>) -> TabNodeId {
		if let Some(node) = self.free.first() {
			return *node;
		}

		let next = match self.max_used_tab_node_id {
			None => Some(TabNodeId(0)),
			Some(max) => max.0.checked_add(1).map(TabNodeId),
		};
		let node = next.unwrap_or_else(|| self.lowest_untracked());
		self.bump_max_used(node);
		self.free.insert(node);
		changes.push(SyncChange::new(ChangeOp::Add, SessionSpecifics::tab_node_placeholder(&self.machine_tag, node.0), 0));
		debug!(target = "tabsync.pool", %node, "allocated tab node");
		node
	}

	/// Returns an associated node to the free set, trimming the free set when
	/// it crosses the high watermark.
	pub fn free_tab_node(&mut self, node: TabNodeId, changes: &mut Vec<SyncChange>) {
		if self.associated.remove(&node).is_none() {
			contract_violation(node, "free_tab_node on a node that is not associated");
			return;
		}
		self.free_internal(node, changes);
	}

	/// Frees every node that was never reclaimed since startup.
	pub fn delete_unassociated_tab_nodes(&mut self, changes: &mut Vec<SyncChange>) {
		for node in std::mem::take(&mut self.unassociated) {
			self.free_internal(node, changes);
		}
	}

	pub fn is_unassociated_tab_node(&self, node: TabNodeId) -> bool {
		self.unassociated.contains(&node)
	}

	pub fn tab_id_from_tab_node_id(&self, node: TabNodeId) -> Option<TabId> {
		self.associated.get(&node).copied()
	}

	/// Number of nodes tracked in any state.
	pub fn capacity(&self) -> usize {
		self.associated.len() + self.unassociated.len() + self.free.len()
	}

	/// True when no free node is available.
	pub fn is_empty(&self) -> bool {
		self.free.is_empty()
	}

	/// True when no node is associated with a tab.
	pub fn is_full(&self) -> bool {
		self.associated.is_empty()
	}

	pub fn free_node_count(&self) -> usize {
		self.free.len()
	}

	pub fn max_used_tab_node_id(&self) -> Option<TabNodeId> {
		self.max_used_tab_node_id
	}

	pub fn is_tracked(&self, node: TabNodeId) -> bool {
		self.associated.contains_key(&node) || self.unassociated.contains(&node) || self.free.contains(&node)
	}

	/// Drops all tracked nodes and resets the allocation high mark.
	pub fn clear(&mut self) {
		self.associated.clear();
		self.unassociated.clear();
		self.free.clear();
		self.max_used_tab_node_id = None;
	}

	fn free_internal(&mut self, node: TabNodeId, changes: &mut Vec<SyncChange>) {
		debug_assert!(!self.free.contains(&node));
		self.free.insert(node);
		if self.free.len() <= self.high_watermark {
			return;
		}

		let mut evicted = 0usize;
		while self.free.len() > self.low_watermark {
			let Some(victim) = self.free.pop_first() else {
				break;
			};
			changes.push(SyncChange::delete_tab_node(&self.machine_tag, victim.0));
			evicted += 1;
		}
		debug!(target = "tabsync.pool", evicted, remaining = self.free.len(), "trimmed free tab nodes");
	}

	/// Smallest id in no state. Only needed once ids above the high mark run out.
	fn lowest_untracked(&self) -> TabNodeId {
		let node = (0..=i32::MAX)
			.map(TabNodeId)
			.find(|node| !self.is_tracked(*node))
			.unwrap_or(TabNodeId(0));
		warn!(target = "tabsync.pool", %node, max = ?self.max_used_tab_node_id, "tab node ids exhausted, reusing a gap");
		node
	}

	fn bump_max_used(&mut self, node: TabNodeId) {
		if self.max_used_tab_node_id.is_none_or(|max| node > max) {
			self.max_used_tab_node_id = Some(node);
		}
	}
}

/// Reports a broken call contract. Panics in debug builds; release builds
/// log and leave the pool untouched.
#[track_caller]
fn contract_violation(node: TabNodeId, message: &str) {
	error!(target = "tabsync.pool", %node, "{message}");
	debug_assert!(false, "tab node pool contract violated for {node}: {message}");
}
