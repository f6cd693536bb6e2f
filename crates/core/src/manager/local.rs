//! Association of live browser state with the local session.

use tabsync_protocol::{ChangeOp, SessionSpecifics, SyncChange};
use tracing::{debug, warn};
use url::Url;

use super::{SessionsSyncManager, now_ms};
use crate::ids::{TabId, TabNodeId, WindowId};
use crate::live::{LiveTab, LiveWindowSource};
use crate::observer::SessionEvent;
use crate::tracker::SessionTab;

/// Schemes that never leave the device.
const LOCAL_ONLY_SCHEMES: &[&str] = &["chrome", "chrome-native", "chrome-untrusted", "file", "about"];

/// True for parseable URLs whose scheme is worth showing on other devices.
pub fn should_sync_url(url: &str) -> bool {
	match Url::parse(url) {
		Ok(parsed) => !LOCAL_ONLY_SCHEMES.contains(&parsed.scheme()),
		Err(_) => false,
	}
}

/// A tab syncs once it has left the initial blank page and some entry in
/// its history has a syncable URL.
pub fn should_sync_tab(tab: &dyn LiveTab) -> bool {
	if tab.is_initial_blank_navigation() || tab.entry_count() == 0 {
		return false;
	}
	(0..tab.entry_count()).any(|index| tab.effective_entry_at(index).is_some_and(|entry| should_sync_url(&entry.virtual_url)))
}

/// Copies the live tab's navigation window around its current entry.
///
/// At most `max_navigations` entries before the current one and fewer than
/// `max_navigations` after it are kept. Entries without a parseable URL are
/// dropped and the current index is rebased onto what remains.
fn set_session_tab_from_live(session_tab: &mut SessionTab, tab: &dyn LiveTab, max_navigations: usize, now: i64) {
	let count = tab.entry_count();
	let current = tab.current_entry_index().min(count.saturating_sub(1));
	let first = current.saturating_sub(max_navigations);
	let end = current.saturating_add(max_navigations).min(count);

	let mut navigations = Vec::with_capacity(end.saturating_sub(first));
	let mut current_position = None;
	for index in first..end {
		let Some(entry) = tab.effective_entry_at(index) else {
			continue;
		};
		if Url::parse(&entry.virtual_url).is_err() {
			continue;
		}
		if index == current {
			current_position = Some(navigations.len());
		}
		navigations.push(entry.to_navigation());
	}

	session_tab.current_navigation_index = match current_position {
		Some(position) => position,
		None => (current - first).min(navigations.len().saturating_sub(1)),
	};
	session_tab.navigations = navigations;
	session_tab.pinned = tab.is_pinned();
	session_tab.extension_app_id = tab.extension_app_id().map(str::to_string);
	session_tab.timestamp_ms = now;
}

impl SessionsSyncManager {
	/// Full pass over every live window: claims what is open, sweeps what
	/// closed, frees the nodes of closed tabs and rewrites the local header.
	pub fn associate_windows(&mut self, source: &dyn LiveWindowSource) {
		if !self.syncing {
			debug!(target = "tabsync.manager", "not syncing; skipping window association");
			return;
		}
		let mut changes = Vec::new();
		self.associate_windows_into(source, ChangeOp::Update, &mut changes);
		self.flush(changes);
	}

	/// Re-syncs a single tab after its content changed. Anything that
	/// affects placement falls back to a full pass.
	pub fn on_local_tab_modified(&mut self, source: &dyn LiveWindowSource, tab_id: TabId) {
		if !self.syncing {
			return;
		}
		let tag = self.local_session_tag.clone();
		let placed = self
			.tracker
			.lookup_session(&tag)
			.and_then(|session| session.tab(tab_id))
			.is_some();

		let tab = match source.find_tab(tab_id) {
			Some(tab) if should_sync_tab(tab) => tab,
			Some(_) if !self.local_tab_map.contains_key(&tab_id) => return,
			_ => {
				debug!(target = "tabsync.manager", %tab_id, "tab closed or no longer syncable; full pass");
				return self.associate_windows(source);
			}
		};
		if !placed || !self.local_tab_map.contains_key(&tab_id) {
			debug!(target = "tabsync.manager", %tab_id, "tab not yet placed; full pass");
			return self.associate_windows(source);
		}

		let now = now_ms();
		let mut changes = Vec::new();
		self.associate_tab(tab, None, now, &mut changes);
		self.tracker.update_session_modified_time(&tag, now);
		self.flush(changes);
	}

	/// Registers a local tab node found in the store at startup. Records
	/// with a negative node id are deleted; duplicates are skipped.
	pub(super) fn restore_local_tab_node(&mut self, specifics: &SessionSpecifics, changes: &mut Vec<SyncChange>) {
		let Some(raw) = specifics.tab_node_id else {
			warn!(target = "tabsync.manager", "skipping local tab record without a node id");
			return;
		};
		let Some(node) = TabNodeId::from_wire(raw) else {
			warn!(target = "tabsync.manager", tab_node_id = raw, "deleting local tab record with an invalid node id");
			changes.push(SyncChange::delete_tab_node(&self.local_session_tag, raw));
			return;
		};
		if self.local_tab_pool.is_tracked(node) {
			warn!(target = "tabsync.manager", %node, "skipping duplicate local tab node");
			return;
		}
		self.local_tab_pool.add_tab_node(node);
	}

	pub(super) fn associate_windows_into(&mut self, source: &dyn LiveWindowSource, header_op: ChangeOp, changes: &mut Vec<SyncChange>) {
		let tag = self.local_session_tag.clone();
		let now = now_ms();

		self.tracker.reset_session_tracking(&tag);
		for window in source.windows() {
			if !window.window_type().is_syncable() {
				continue;
			}
			let window_id = window.session_id();
			let mut placed = 0usize;
			for index in 0..window.tab_count() {
				let Some(tab) = window.live_tab_at(index) else {
					continue;
				};
				if !should_sync_tab(tab) {
					continue;
				}
				self.associate_tab(tab, Some((window_id, placed)), now, changes);
				placed += 1;
			}
			if placed == 0 {
				continue;
			}
			let synced = self.tracker.put_window_in_session(&tag, window_id);
			synced.window_type = window.window_type();
			synced.selected_tab_index = window.selected_index().min(placed - 1);
			synced.app_name = window.app_name().map(str::to_string);
			synced.timestamp_ms = now;
		}

		for tab in self.tracker.cleanup_session(&tag) {
			if let Some(node) = self.local_tab_map.remove(&tab.tab_id()) {
				debug!(target = "tabsync.manager", tab_id = %tab.tab_id(), %node, "local tab closed; freeing node");
				self.local_tab_pool.free_tab_node(node, changes);
			}
		}
		self.local_tab_pool.delete_unassociated_tab_nodes(changes);

		{
			let session = self.tracker.get_session(&tag);
			session.session_name = self.config.session_name.clone();
			session.device_type = self.config.device_type;
		}
		self.tracker.update_session_modified_time(&tag, now);
		if let Some(session) = self.tracker.lookup_session(&tag) {
			changes.push(SyncChange::new(header_op, SessionSpecifics::header(&tag, session.to_header()), now));
		}

		self.observers.notify(&SessionEvent::LocalSessionAssociated { session_tag: tag });
	}

	/// Binds the live tab to a node, refreshes its content and emits its
	/// record. `placement` puts it at a position in the tab strip first.
	fn associate_tab(
		&mut self,
		tab: &dyn LiveTab,
		placement: Option<(WindowId, usize)>,
		now: i64,
		changes: &mut Vec<SyncChange>,
	) {
		let tag = self.local_session_tag.clone();
		let tab_id = tab.session_id();

		let node = match self.local_tab_map.get(&tab_id) {
			Some(node) => *node,
			None => {
				let node = match tab.sync_id() {
					Some(sync_id) if self.local_tab_pool.is_unassociated_tab_node(sync_id) => {
						debug!(target = "tabsync.manager", %tab_id, node = %sync_id, "reclaimed restored tab node");
						self.local_tab_pool.reassociate_tab_node(sync_id, tab_id);
						sync_id
					}
					_ => {
						let node = self.local_tab_pool.get_free_tab_node(changes);
						self.local_tab_pool.associate_tab_node(node, tab_id);
						node
					}
				};
				self.local_tab_map.insert(tab_id, node);
				node
			}
		};

		self.tracker.get_tab(&tag, tab_id, node);
		if let Some((window_id, index)) = placement {
			self.tracker.put_tab_in_window(&tag, window_id, tab_id, index);
		}

		let max_navigations = self.config.max_sync_navigation_count;
		let session_tab = self.tracker.get_tab(&tag, tab_id, node);
		if let Some((_, index)) = placement {
			session_tab.tab_visual_index = i32::try_from(index).unwrap_or(i32::MAX);
		}
		set_session_tab_from_live(session_tab, tab, max_navigations, now);

		let specifics = SessionSpecifics::tab(&tag, node.0, session_tab.to_specifics());
		changes.push(SyncChange::new(ChangeOp::Update, specifics, now));
	}
}
