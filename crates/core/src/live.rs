//! Accessors for the browser's current in-memory window and tab state.
//!
//! The sync manager only ever reads live state through these traits. The
//! serde snapshot types at the bottom implement them for replayed scenarios
//! and tests.

use serde::{Deserialize, Serialize};
use tabsync_protocol::{TabNavigation, WindowType};

use crate::ids::{TabId, TabNodeId, WindowId};

/// One entry of a live tab's back/forward list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEntry {
	pub virtual_url: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub referrer: Option<String>,
	#[serde(default)]
	pub unique_id: i32,
	#[serde(default)]
	pub timestamp_ms: i64,
	#[serde(default)]
	pub http_status_code: Option<u16>,
}

impl NavigationEntry {
	pub fn new(virtual_url: impl Into<String>) -> Self {
		Self {
			virtual_url: virtual_url.into(),
			..Default::default()
		}
	}

	pub fn to_navigation(&self) -> TabNavigation {
		TabNavigation {
			virtual_url: self.virtual_url.clone(),
			title: self.title.clone(),
			referrer: self.referrer.clone(),
			unique_id: self.unique_id,
			timestamp_ms: self.timestamp_ms,
			http_status_code: self.http_status_code,
		}
	}
}

/// Read access to a live tab.
pub trait LiveTab {
	fn session_id(&self) -> TabId;

	/// Node id the tab was restored with from a previous run, if any.
	fn sync_id(&self) -> Option<TabNodeId>;

	fn entry_count(&self) -> usize;

	fn current_entry_index(&self) -> usize;

	fn pending_entry_index(&self) -> Option<usize>;

	fn entry_at_index(&self, index: usize) -> Option<&NavigationEntry>;

	fn pending_entry(&self) -> Option<&NavigationEntry>;

	fn is_initial_blank_navigation(&self) -> bool;

	fn is_pinned(&self) -> bool {
		false
	}

	fn extension_app_id(&self) -> Option<&str> {
		None
	}

	/// Entry at `index`, with the pending entry taking the place of the
	/// committed one it is about to replace.
	fn effective_entry_at(&self, index: usize) -> Option<&NavigationEntry> {
		if self.pending_entry_index() == Some(index) {
			self.pending_entry()
		} else {
			self.entry_at_index(index)
		}
	}
}

/// Read access to a live browser window.
pub trait LiveWindow {
	fn session_id(&self) -> WindowId;

	fn window_type(&self) -> WindowType;

	fn tab_count(&self) -> usize;

	fn live_tab_at(&self, index: usize) -> Option<&dyn LiveTab>;

	fn selected_index(&self) -> usize;

	fn app_name(&self) -> Option<&str>;
}

/// Enumerates the browser's live windows.
pub trait LiveWindowSource {
	fn windows(&self) -> Vec<&dyn LiveWindow>;

	fn find_tab(&self, tab_id: TabId) -> Option<&dyn LiveTab> {
		for window in self.windows() {
			for index in 0..window.tab_count() {
				if let Some(tab) = window.live_tab_at(index) {
					if tab.session_id() == tab_id {
						return Some(tab);
					}
				}
			}
		}
		None
	}
}

/// Serializable stand-in for a live tab.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
	pub tab_id: TabId,
	#[serde(default)]
	pub sync_id: Option<TabNodeId>,
	#[serde(default)]
	pub entries: Vec<NavigationEntry>,
	#[serde(default)]
	pub current_entry_index: usize,
	#[serde(default)]
	pub pending_entry_index: Option<usize>,
	#[serde(default)]
	pub pending_entry: Option<NavigationEntry>,
	#[serde(default)]
	pub initial_blank: bool,
	#[serde(default)]
	pub pinned: bool,
	#[serde(default)]
	pub extension_app_id: Option<String>,
}

impl TabSnapshot {
	/// A tab whose history is `urls`, positioned on the last one.
	pub fn with_urls(tab_id: i32, urls: &[&str]) -> Self {
		Self {
			tab_id: TabId(tab_id),
			sync_id: None,
			entries: urls.iter().map(|url| NavigationEntry::new(*url)).collect(),
			current_entry_index: urls.len().saturating_sub(1),
			pending_entry_index: None,
			pending_entry: None,
			initial_blank: false,
			pinned: false,
			extension_app_id: None,
		}
	}

	pub fn restored_from(mut self, node: i32) -> Self {
		self.sync_id = Some(TabNodeId(node));
		self
	}

	pub fn navigate(&mut self, url: &str) {
		self.entries.truncate(self.current_entry_index + 1);
		self.entries.push(NavigationEntry::new(url));
		self.current_entry_index = self.entries.len() - 1;
	}
}

impl LiveTab for TabSnapshot {
	fn session_id(&self) -> TabId {
		self.tab_id
	}

	fn sync_id(&self) -> Option<TabNodeId> {
		self.sync_id
	}

	fn entry_count(&self) -> usize {
		self.entries.len()
	}

	fn current_entry_index(&self) -> usize {
		self.current_entry_index
	}

	fn pending_entry_index(&self) -> Option<usize> {
		self.pending_entry_index
	}

	fn entry_at_index(&self, index: usize) -> Option<&NavigationEntry> {
		self.entries.get(index)
	}

	fn pending_entry(&self) -> Option<&NavigationEntry> {
		self.pending_entry.as_ref()
	}

	fn is_initial_blank_navigation(&self) -> bool {
		self.initial_blank
	}

	fn is_pinned(&self) -> bool {
		self.pinned
	}

	fn extension_app_id(&self) -> Option<&str> {
		self.extension_app_id.as_deref()
	}
}

/// Serializable stand-in for a live window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
	pub window_id: WindowId,
	#[serde(default)]
	pub window_type: WindowType,
	#[serde(default)]
	pub selected_index: usize,
	#[serde(default)]
	pub app_name: Option<String>,
	#[serde(default)]
	pub tabs: Vec<TabSnapshot>,
}

impl WindowSnapshot {
	pub fn new(window_id: i32, tabs: Vec<TabSnapshot>) -> Self {
		Self {
			window_id: WindowId(window_id),
			window_type: WindowType::Tabbed,
			selected_index: 0,
			app_name: None,
			tabs,
		}
	}
}

impl LiveWindow for WindowSnapshot {
	fn session_id(&self) -> WindowId {
		self.window_id
	}

	fn window_type(&self) -> WindowType {
		self.window_type
	}

	fn tab_count(&self) -> usize {
		self.tabs.len()
	}

	fn live_tab_at(&self, index: usize) -> Option<&dyn LiveTab> {
		self.tabs.get(index).map(|tab| tab as &dyn LiveTab)
	}

	fn selected_index(&self) -> usize {
		self.selected_index
	}

	fn app_name(&self) -> Option<&str> {
		self.app_name.as_deref()
	}
}

/// Serializable stand-in for the whole browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BrowserSnapshot {
	#[serde(default)]
	pub windows: Vec<WindowSnapshot>,
}

impl BrowserSnapshot {
	pub fn new(windows: Vec<WindowSnapshot>) -> Self {
		Self { windows }
	}

	pub fn window_mut(&mut self, window_id: i32) -> Option<&mut WindowSnapshot> {
		self.windows.iter_mut().find(|window| window.window_id == WindowId(window_id))
	}

	pub fn tab_mut(&mut self, tab_id: i32) -> Option<&mut TabSnapshot> {
		self.windows
			.iter_mut()
			.flat_map(|window| window.tabs.iter_mut())
			.find(|tab| tab.tab_id == TabId(tab_id))
	}

	/// Removes a tab from whichever window holds it.
	pub fn close_tab(&mut self, tab_id: i32) -> Option<TabSnapshot> {
		self.windows.iter_mut().find_map(|window| {
			let index = window.tabs.iter().position(|tab| tab.tab_id == TabId(tab_id))?;
			Some(window.tabs.remove(index))
		})
	}
}

impl LiveWindowSource for BrowserSnapshot {
	fn windows(&self) -> Vec<&dyn LiveWindow> {
		self.windows.iter().map(|window| window as &dyn LiveWindow).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pending_entry_replaces_committed_entry() {
		let mut tab = TabSnapshot::with_urls(1, &["https://a.example/", "https://b.example/"]);
		tab.pending_entry_index = Some(1);
		tab.pending_entry = Some(NavigationEntry::new("https://c.example/"));

		assert_eq!(tab.effective_entry_at(0).map(|e| e.virtual_url.as_str()), Some("https://a.example/"));
		assert_eq!(tab.effective_entry_at(1).map(|e| e.virtual_url.as_str()), Some("https://c.example/"));
	}

	#[test]
	fn find_tab_searches_every_window() {
		let browser = BrowserSnapshot::new(vec![
			WindowSnapshot::new(1, vec![TabSnapshot::with_urls(10, &["https://a.example/"])]),
			WindowSnapshot::new(2, vec![TabSnapshot::with_urls(20, &["https://b.example/"])]),
		]);
		assert_eq!(browser.find_tab(TabId(20)).map(|tab| tab.session_id()), Some(TabId(20)));
		assert!(browser.find_tab(TabId(30)).is_none());
	}

	#[test]
	fn navigate_drops_forward_history() {
		let mut tab = TabSnapshot::with_urls(1, &["https://a.example/", "https://b.example/"]);
		tab.current_entry_index = 0;
		tab.navigate("https://c.example/");
		assert_eq!(tab.entries.len(), 2);
		assert_eq!(tab.current_entry_index, 1);
		assert_eq!(tab.entries[1].virtual_url, "https://c.example/");
	}

	#[test]
	fn snapshot_decodes_from_camel_case_json() {
		let browser: BrowserSnapshot = serde_json::from_str(
			r#"{"windows":[{"windowId":3,"windowType":"popup","tabs":[{"tabId":5,"syncId":2,"entries":[{"virtualUrl":"https://a.example/"}]}]}]}"#,
		)
		.unwrap();
		let window = &browser.windows[0];
		assert_eq!(window.window_id, WindowId(3));
		assert_eq!(window.window_type, WindowType::Popup);
		assert_eq!(window.tabs[0].sync_id, Some(TabNodeId(2)));
	}
}
