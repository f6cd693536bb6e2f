//! Session, window and tab entities owned by the tracker.

use std::collections::BTreeMap;

use tabsync_protocol::{DeviceType, SessionHeader, SessionTabSpecifics, SessionWindowSpecifics, TabNavigation, WindowType};

use crate::ids::{TabId, TabNodeId, WindowId};

/// Mark state of an entity during a reconciliation pass.
///
/// `reset_session_tracking` flips everything to `Unowned`; the `put_*` and
/// `get_tab` calls of the pass flip what they touch back to `Owned`;
/// `cleanup_session` deletes whatever is still `Unowned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ownership {
	#[default]
	Owned,
	Unowned,
}

/// One tab of a session, local or foreign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTab {
	pub(crate) tab_id: TabId,
	pub(crate) tab_node_id: Option<TabNodeId>,
	pub window_id: Option<WindowId>,
	pub tab_visual_index: i32,
	pub current_navigation_index: usize,
	pub pinned: bool,
	pub extension_app_id: Option<String>,
	pub navigations: Vec<TabNavigation>,
	pub timestamp_ms: i64,
	pub(crate) ownership: Ownership,
}

impl SessionTab {
	pub(crate) fn new(tab_id: TabId) -> Self {
		Self {
			tab_id,
			tab_node_id: None,
			window_id: None,
			tab_visual_index: 0,
			current_navigation_index: 0,
			pinned: false,
			extension_app_id: None,
			navigations: Vec::new(),
			timestamp_ms: 0,
			ownership: Ownership::Owned,
		}
	}

	pub fn tab_id(&self) -> TabId {
		self.tab_id
	}

	/// Sync node backing this tab. Fixed once assigned.
	pub fn tab_node_id(&self) -> Option<TabNodeId> {
		self.tab_node_id
	}

	pub fn ownership(&self) -> Ownership {
		self.ownership
	}

	/// True when the tab has at least one navigation worth showing.
	pub fn has_syncable_content(&self) -> bool {
		!self.navigations.is_empty()
	}

	pub fn current_navigation(&self) -> Option<&TabNavigation> {
		self.navigations.get(self.current_navigation_index)
	}

	/// Overwrites content fields from a tab record. Indices out of range are clamped.
	pub fn apply_specifics(&mut self, specifics: &SessionTabSpecifics, modified_time_ms: i64) {
		self.tab_visual_index = specifics.tab_visual_index;
		self.pinned = specifics.pinned;
		self.extension_app_id = specifics.extension_app_id.clone();
		self.navigations = specifics.navigations.clone();
		self.current_navigation_index = clamp_index(specifics.current_navigation_index, self.navigations.len());
		self.timestamp_ms = modified_time_ms;
		if self.window_id.is_none() {
			self.window_id = specifics.window_id.map(WindowId);
		}
	}

	pub fn to_specifics(&self) -> SessionTabSpecifics {
		SessionTabSpecifics {
			tab_id: Some(self.tab_id.0),
			window_id: self.window_id.map(|id| id.0),
			tab_visual_index: self.tab_visual_index,
			current_navigation_index: i32::try_from(self.current_navigation_index).unwrap_or(i32::MAX),
			pinned: self.pinned,
			extension_app_id: self.extension_app_id.clone(),
			navigations: self.navigations.clone(),
		}
	}
}

/// One window of a session. `tabs` is kept in tab-strip order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedWindow {
	pub window_id: WindowId,
	pub selected_tab_index: usize,
	pub window_type: WindowType,
	pub timestamp_ms: i64,
	pub app_name: Option<String>,
	pub(crate) tabs: Vec<SessionTab>,
	pub(crate) ownership: Ownership,
	/// Order in which the current pass claimed the window.
	pub(crate) placement: u64,
}

impl SyncedWindow {
	pub(crate) fn new(window_id: WindowId) -> Self {
		Self {
			window_id,
			selected_tab_index: 0,
			window_type: WindowType::Tabbed,
			timestamp_ms: 0,
			app_name: None,
			tabs: Vec::new(),
			ownership: Ownership::Owned,
			placement: 0,
		}
	}

	pub fn tabs(&self) -> &[SessionTab] {
		&self.tabs
	}

	pub fn tab_ids(&self) -> Vec<TabId> {
		self.tabs.iter().map(|tab| tab.tab_id).collect()
	}

	pub fn tab(&self, tab_id: TabId) -> Option<&SessionTab> {
		self.tabs.iter().find(|tab| tab.tab_id == tab_id)
	}

	pub fn ownership(&self) -> Ownership {
		self.ownership
	}

	pub fn to_specifics(&self) -> SessionWindowSpecifics {
		SessionWindowSpecifics {
			window_id: Some(self.window_id.0),
			selected_tab_index: i32::try_from(self.selected_tab_index).unwrap_or(i32::MAX),
			browser_type: self.window_type,
			app_name: self.app_name.clone(),
			tabs: self.tabs.iter().map(|tab| tab.tab_id.0).collect(),
		}
	}
}

/// Everything known about one device's open windows and tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedSession {
	pub session_tag: String,
	pub session_name: String,
	pub device_type: DeviceType,
	pub modified_time_ms: i64,
	pub(crate) windows: BTreeMap<WindowId, SyncedWindow>,
	pub(crate) next_placement: u64,
}

impl SyncedSession {
	pub(crate) fn new(session_tag: &str) -> Self {
		Self {
			session_tag: session_tag.to_string(),
			session_name: String::new(),
			device_type: DeviceType::Other,
			modified_time_ms: 0,
			windows: BTreeMap::new(),
			next_placement: 0,
		}
	}

	/// Windows in the order the last pass placed them.
	pub fn windows(&self) -> impl Iterator<Item = &SyncedWindow> {
		let mut windows: Vec<_> = self.windows.values().collect();
		windows.sort_by_key(|window| window.placement);
		windows.into_iter()
	}

	pub fn window(&self, window_id: WindowId) -> Option<&SyncedWindow> {
		self.windows.get(&window_id)
	}

	pub fn tab(&self, tab_id: TabId) -> Option<&SessionTab> {
		self.windows.values().find_map(|window| window.tab(tab_id))
	}

	pub fn tab_count(&self) -> usize {
		self.windows.values().map(|window| window.tabs.len()).sum()
	}

	/// A session is worth showing when some window holds a tab with content.
	pub fn is_presentable(&self) -> bool {
		self.windows
			.values()
			.any(|window| window.tabs.iter().any(SessionTab::has_syncable_content))
	}

	pub fn to_header(&self) -> SessionHeader {
		SessionHeader {
			client_name: self.session_name.clone(),
			device_type: self.device_type,
			windows: self.windows().map(SyncedWindow::to_specifics).collect(),
		}
	}

	pub(crate) fn claim_placement(&mut self) -> u64 {
		let placement = self.next_placement;
		self.next_placement += 1;
		placement
	}

	/// Raises `modified_time_ms` to the newest window or tab timestamp.
	pub(crate) fn refresh_modified_time(&mut self) {
		let newest = self
			.windows
			.values()
			.flat_map(|window| std::iter::once(window.timestamp_ms).chain(window.tabs.iter().map(|tab| tab.timestamp_ms)))
			.max()
			.unwrap_or(0);
		self.modified_time_ms = self.modified_time_ms.max(newest);
	}
}

/// Clamps a wire index into `[0, len)`, or 0 for an empty list.
pub(crate) fn clamp_index(index: i32, len: usize) -> usize {
	if len == 0 {
		return 0;
	}
	usize::try_from(index).unwrap_or(0).min(len - 1)
}
