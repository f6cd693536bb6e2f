//! In-memory graph of every known session and its mark-and-sweep lifecycle.
//!
//! The tracker exclusively owns all sessions, windows and tabs, nested
//! strictly (session → window → tab). Tabs that are known but not currently
//! placed in any window live in a separate holding area keyed by
//! `(session_tag, tab_id)`.
//!
//! A reconciliation pass over a session is
//! `reset_session_tracking` → `put_window_in_session` / `put_tab_in_window` /
//! `get_tab` → `cleanup_session`. The pass is not reentrant per session: a
//! second pass over the same tag must not start before the first is swept.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::ids::{TabId, TabNodeId, WindowId};

mod session;

pub use session::{Ownership, SessionTab, SyncedSession, SyncedWindow};
pub(crate) use session::clamp_index;

#[cfg(test)]
mod tests;

/// Filter for [`SyncedSessionTracker::lookup_all_foreign_sessions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLookup {
	/// Every foreign session.
	Raw,
	/// Foreign sessions with at least one tab that has navigations.
	Presentable,
}

#[derive(Debug)]
struct TrackedSession {
	session: SyncedSession,
	tab_node_ids: BTreeSet<TabNodeId>,
}

impl TrackedSession {
	fn new(session_tag: &str) -> Self {
		Self {
			session: SyncedSession::new(session_tag),
			tab_node_ids: BTreeSet::new(),
		}
	}
}

/// Where a tab currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TabSlot {
	Unmapped,
	Window(WindowId, usize),
}

/// Owner of all local and foreign session entities.
#[derive(Debug, Default)]
pub struct SyncedSessionTracker {
	local_session_tag: Option<String>,
	sessions: BTreeMap<String, TrackedSession>,
	unmapped_tabs: BTreeMap<(String, TabId), SessionTab>,
}

impl SyncedSessionTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_local_session_tag(&mut self, tag: impl Into<String>) {
		self.local_session_tag = Some(tag.into());
	}

	pub fn local_session_tag(&self) -> Option<&str> {
		self.local_session_tag.as_deref()
	}

	pub fn is_local(&self, tag: &str) -> bool {
		self.local_session_tag.as_deref() == Some(tag)
	}

	/// Gets or creates the session for `tag`.
	pub fn get_session(&mut self, tag: &str) -> &mut SyncedSession {
		&mut self.tracked_mut(tag).session
	}

	pub fn lookup_session(&self, tag: &str) -> Option<&SyncedSession> {
		self.sessions.get(tag).map(|tracked| &tracked.session)
	}

	pub fn lookup_local_session(&self) -> Option<&SyncedSession> {
		self.local_session_tag.as_deref().and_then(|tag| self.lookup_session(tag))
	}

	/// Removes a session with all its windows, tabs and held tabs.
	pub fn delete_session(&mut self, tag: &str) -> bool {
		self.unmapped_tabs.retain(|(session_tag, _), _| session_tag != tag);
		let existed = self.sessions.remove(tag).is_some();
		if existed {
			debug!(target = "tabsync.tracker", session_tag = tag, "deleted session");
		}
		existed
	}

	/// All sessions except the local one.
	pub fn lookup_all_foreign_sessions(&self, filter: SessionLookup) -> Vec<&SyncedSession> {
		self.sessions
			.iter()
			.filter(|(tag, _)| !self.is_local(tag))
			.map(|(_, tracked)| &tracked.session)
			.filter(|session| filter == SessionLookup::Raw || session.is_presentable())
			.collect()
	}

	pub fn lookup_session_windows(&self, tag: &str) -> Option<Vec<&SyncedWindow>> {
		self.lookup_session(tag).map(|session| session.windows().collect())
	}

	/// Finds a tab by id, whether placed in a window or held unmapped.
	pub fn lookup_session_tab(&self, tag: &str, tab_id: TabId) -> Option<&SessionTab> {
		self.lookup_session(tag)
			.and_then(|session| session.tab(tab_id))
			.or_else(|| self.unmapped_tabs.get(&(tag.to_string(), tab_id)))
	}

	/// Node ids known for `tag`, including ones of tabs no longer placed.
	pub fn lookup_tab_node_ids(&self, tag: &str) -> BTreeSet<TabNodeId> {
		self.sessions
			.get(tag)
			.map(|tracked| tracked.tab_node_ids.clone())
			.unwrap_or_default()
	}

	/// Ensures the window exists and claims it for the current pass.
	///
	/// The first claim of a window in a pass fixes its position among the
	/// session's windows.
	pub fn put_window_in_session(&mut self, tag: &str, window_id: WindowId) -> &mut SyncedWindow {
		let session = &mut self.tracked_mut(tag).session;
		let claimed = session
			.windows
			.get(&window_id)
			.is_some_and(|window| window.ownership == Ownership::Owned);
		let placement = (!claimed).then(|| session.claim_placement());
		let window = session.windows.entry(window_id).or_insert_with(|| SyncedWindow::new(window_id));
		if let Some(placement) = placement {
			window.placement = placement;
		}
		window.ownership = Ownership::Owned;
		window
	}

	/// Places the tab at `index` in the window's tab strip and claims both.
	///
	/// The tab is detached from wherever it was first (holding area, another
	/// window, or another slot of the same window). Indices past the end append.
	pub fn put_tab_in_window(&mut self, tag: &str, window_id: WindowId, tab_id: TabId, index: usize) {
		let mut tab = self.detach_tab(tag, tab_id).unwrap_or_else(|| SessionTab::new(tab_id));
		tab.window_id = Some(window_id);
		tab.ownership = Ownership::Owned;

		let window = self.put_window_in_session(tag, window_id);
		let at = index.min(window.tabs.len());
		window.tabs.insert(at, tab);
	}

	/// Gets or creates the tab `tab_id` backed by `node`.
	///
	/// Node ids are durable; only the tab id binding moves. A tab already
	/// stored under `node` with another id is rebound to `tab_id`. If `tab_id`
	/// is currently held by a tab of a different node, that tab is evicted and
	/// `tab_id` binds to `node`, taking over the evicted tab's window slot when
	/// `node` has no tab yet. New tabs otherwise start out in the holding area
	/// until `put_tab_in_window` places them.
	pub fn get_tab(&mut self, tag: &str, tab_id: TabId, node: TabNodeId) -> &mut SessionTab {
		self.tracked_mut(tag).tab_node_ids.insert(node);

		let slot = match self.locate_tab(tag, tab_id) {
			Some(slot) if self.bound_elsewhere(tag, tab_id, slot, node) => {
				let vacated = self.evict_tab(tag, tab_id, slot, node);
				self.bind_node(tag, tab_id, node, vacated)
			}
			Some(slot) => {
				self.adopt_node(tag, tab_id, slot, node);
				self.locate_tab(tag, tab_id).unwrap_or(TabSlot::Unmapped)
			}
			None => self.bind_node(tag, tab_id, node, None),
		};

		let tab = slot_mut(&mut self.sessions, &mut self.unmapped_tabs, tag, tab_id, slot);
		tab.ownership = Ownership::Owned;
		tab
	}

	/// Starts a mark phase: everything in the session becomes unowned.
	pub fn reset_session_tracking(&mut self, tag: &str) {
		if let Some(tracked) = self.sessions.get_mut(tag) {
			tracked.session.next_placement = 0;
			for window in tracked.session.windows.values_mut() {
				window.ownership = Ownership::Unowned;
				for tab in &mut window.tabs {
					tab.ownership = Ownership::Unowned;
				}
			}
		}
		for ((session_tag, _), tab) in self.unmapped_tabs.iter_mut() {
			if session_tag == tag {
				tab.ownership = Ownership::Unowned;
			}
		}
	}

	/// Sweep phase: deletes every window and tab left unowned and returns the
	/// deleted tabs. Owned tabs of a deleted window move to the holding area.
	pub fn cleanup_session(&mut self, tag: &str) -> Vec<SessionTab> {
		let is_local = self.is_local(tag);
		let mut swept = Vec::new();
		let mut orphaned = Vec::new();

		if let Some(tracked) = self.sessions.get_mut(tag) {
			tracked.session.windows.retain(|_, window| {
				let (keep, drop): (Vec<_>, Vec<_>) = std::mem::take(&mut window.tabs)
					.into_iter()
					.partition(|tab| tab.ownership == Ownership::Owned);
				swept.extend(drop);
				if window.ownership == Ownership::Owned {
					window.tabs = keep;
					true
				} else {
					orphaned.extend(keep);
					false
				}
			});
		}

		let stale: Vec<_> = self
			.unmapped_tabs
			.iter()
			.filter(|((session_tag, _), tab)| session_tag == tag && tab.ownership == Ownership::Unowned)
			.map(|(key, _)| key.clone())
			.collect();
		for key in stale {
			if let Some(tab) = self.unmapped_tabs.remove(&key) {
				swept.push(tab);
			}
		}

		for mut tab in orphaned {
			tab.window_id = None;
			self.unmapped_tabs.insert((tag.to_string(), tab.tab_id), tab);
		}

		if is_local {
			if let Some(tracked) = self.sessions.get_mut(tag) {
				for node in swept.iter().filter_map(SessionTab::tab_node_id) {
					tracked.tab_node_ids.remove(&node);
				}
			}
		}

		if !swept.is_empty() {
			debug!(target = "tabsync.tracker", session_tag = tag, swept = swept.len(), "swept unowned tabs");
		}
		swept
	}

	/// Records a node id of `tag` that carries no tab yet.
	pub fn on_tab_node_seen(&mut self, tag: &str, node: TabNodeId) {
		self.tracked_mut(tag).tab_node_ids.insert(node);
	}

	/// Forgets a foreign node id that the remote side deleted.
	pub fn delete_foreign_tab(&mut self, tag: &str, node: TabNodeId) {
		debug_assert!(!self.is_local(tag), "delete_foreign_tab called for the local session");
		if let Some(tracked) = self.sessions.get_mut(tag) {
			tracked.tab_node_ids.remove(&node);
		}
	}

	/// Raises the session's modified time to at least `time_ms` and to its
	/// newest window or tab timestamp.
	pub fn update_session_modified_time(&mut self, tag: &str, time_ms: i64) {
		if let Some(tracked) = self.sessions.get_mut(tag) {
			let session = &mut tracked.session;
			session.modified_time_ms = session.modified_time_ms.max(time_ms);
			session.refresh_modified_time();
		}
	}

	/// Tabs of `tag` waiting in the holding area.
	pub fn unmapped_tab_ids(&self, tag: &str) -> Vec<TabId> {
		self.unmapped_tabs
			.keys()
			.filter(|(session_tag, _)| session_tag == tag)
			.map(|(_, tab_id)| *tab_id)
			.collect()
	}

	/// Releases everything, including the local session tag.
	pub fn clear(&mut self) {
		self.sessions.clear();
		self.unmapped_tabs.clear();
		self.local_session_tag = None;
	}

	fn tracked_mut(&mut self, tag: &str) -> &mut TrackedSession {
		self.sessions
			.entry(tag.to_string())
			.or_insert_with(|| TrackedSession::new(tag))
	}

	fn locate_tab(&self, tag: &str, tab_id: TabId) -> Option<TabSlot> {
		if self.unmapped_tabs.contains_key(&(tag.to_string(), tab_id)) {
			return Some(TabSlot::Unmapped);
		}
		let session = &self.sessions.get(tag)?.session;
		session.windows.values().find_map(|window| {
			window
				.tabs
				.iter()
				.position(|tab| tab.tab_id == tab_id)
				.map(|index| TabSlot::Window(window.window_id, index))
		})
	}

	fn locate_node(&self, tag: &str, node: TabNodeId) -> Option<(TabId, TabSlot)> {
		let held = self
			.unmapped_tabs
			.iter()
			.find(|((session_tag, _), tab)| session_tag == tag && tab.tab_node_id == Some(node))
			.map(|((_, tab_id), _)| (*tab_id, TabSlot::Unmapped));
		if held.is_some() {
			return held;
		}
		let session = &self.sessions.get(tag)?.session;
		session.windows.values().find_map(|window| {
			window
				.tabs
				.iter()
				.position(|tab| tab.tab_node_id == Some(node))
				.map(|index| (window.tabs[index].tab_id, TabSlot::Window(window.window_id, index)))
		})
	}

	fn detach_tab(&mut self, tag: &str, tab_id: TabId) -> Option<SessionTab> {
		match self.locate_tab(tag, tab_id)? {
			TabSlot::Unmapped => self.unmapped_tabs.remove(&(tag.to_string(), tab_id)),
			TabSlot::Window(window_id, index) => {
				let window = self.sessions.get_mut(tag)?.session.windows.get_mut(&window_id)?;
				Some(window.tabs.remove(index))
			}
		}
	}

	/// True when the tab at `slot` is already backed by a node other than `node`.
	fn bound_elsewhere(&mut self, tag: &str, tab_id: TabId, slot: TabSlot, node: TabNodeId) -> bool {
		let current = slot_mut(&mut self.sessions, &mut self.unmapped_tabs, tag, tab_id, slot).tab_node_id;
		current.is_some_and(|existing| existing != node)
	}

	/// Removes the tab holding `tab_id` so the id can move to `node`. The
	/// evicted node stays in the session's node set. Returns the window slot
	/// it vacated.
	fn evict_tab(&mut self, tag: &str, tab_id: TabId, slot: TabSlot, node: TabNodeId) -> Option<(WindowId, usize)> {
		let evicted = self.detach_tab(tag, tab_id);
		debug!(
			target = "tabsync.tracker",
			session_tag = tag,
			%tab_id,
			evicted = ?evicted.as_ref().and_then(SessionTab::tab_node_id),
			%node,
			"tab id moved to another node"
		);
		match slot {
			TabSlot::Window(window_id, index) => Some((window_id, index)),
			TabSlot::Unmapped => None,
		}
	}

	/// Binds `tab_id` to the tab of `node`, rebinding an existing tab of that
	/// node or creating one. A new tab goes to `vacated` when that window
	/// still exists, else to the holding area.
	fn bind_node(&mut self, tag: &str, tab_id: TabId, node: TabNodeId, vacated: Option<(WindowId, usize)>) -> TabSlot {
		if let Some((old_id, slot)) = self.locate_node(tag, node) {
			return self.rebind_tab(tag, old_id, tab_id, slot);
		}

		let mut tab = SessionTab::new(tab_id);
		tab.tab_node_id = Some(node);
		if let Some((window_id, index)) = vacated {
			let window = self
				.sessions
				.get_mut(tag)
				.and_then(|tracked| tracked.session.windows.get_mut(&window_id));
			if let Some(window) = window {
				let at = index.min(window.tabs.len());
				tab.window_id = Some(window_id);
				window.tabs.insert(at, tab);
				return TabSlot::Window(window_id, at);
			}
		}
		self.unmapped_tabs.insert((tag.to_string(), tab_id), tab);
		TabSlot::Unmapped
	}

	/// Gives a node-less tab its node id. Any other tab still holding that
	/// node is a stale copy of the same sync node and is dropped.
	fn adopt_node(&mut self, tag: &str, tab_id: TabId, slot: TabSlot, node: TabNodeId) {
		let current = slot_mut(&mut self.sessions, &mut self.unmapped_tabs, tag, tab_id, slot).tab_node_id;
		if current.is_some() {
			return;
		}
		if let Some((stale_id, _)) = self.locate_node(tag, node) {
			debug!(target = "tabsync.tracker", session_tag = tag, %stale_id, %node, "dropping stale tab holding node");
			self.detach_tab(tag, stale_id);
		}
		// Slot may have shifted if the stale tab sat before it in the same window.
		let slot = self.locate_tab(tag, tab_id).unwrap_or(TabSlot::Unmapped);
		slot_mut(&mut self.sessions, &mut self.unmapped_tabs, tag, tab_id, slot).tab_node_id = Some(node);
	}

	fn rebind_tab(&mut self, tag: &str, old_id: TabId, new_id: TabId, slot: TabSlot) -> TabSlot {
		debug!(target = "tabsync.tracker", session_tag = tag, %old_id, %new_id, "rebinding tab id");
		match slot {
			TabSlot::Unmapped => {
				if let Some(mut tab) = self.unmapped_tabs.remove(&(tag.to_string(), old_id)) {
					tab.tab_id = new_id;
					self.unmapped_tabs.insert((tag.to_string(), new_id), tab);
				}
			}
			TabSlot::Window(..) => {
				slot_mut(&mut self.sessions, &mut self.unmapped_tabs, tag, old_id, slot).tab_id = new_id;
			}
		}
		slot
	}
}

/// Resolves a slot to the tab it names, falling back to the holding area.
fn slot_mut<'a>(
	sessions: &'a mut BTreeMap<String, TrackedSession>,
	unmapped_tabs: &'a mut BTreeMap<(String, TabId), SessionTab>,
	tag: &str,
	tab_id: TabId,
	slot: TabSlot,
) -> &'a mut SessionTab {
	if let TabSlot::Window(window_id, index) = slot {
		let placed = sessions
			.get_mut(tag)
			.and_then(|tracked| tracked.session.windows.get_mut(&window_id))
			.and_then(|window| window.tabs.get_mut(index));
		if let Some(tab) = placed {
			return tab;
		}
	}
	unmapped_tabs
		.entry((tag.to_string(), tab_id))
		.or_insert_with(|| SessionTab::new(tab_id))
}
