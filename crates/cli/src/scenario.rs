//! Scenario files: a starting browser, stored records, and a script of
//! local and remote events to replay through the sync owner.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tabsync::{BrowserSnapshot, SyncConfig, TabSnapshot, WindowSnapshot};
use tabsync_protocol::SyncChange;

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
	#[serde(default)]
	pub config: Option<SyncConfig>,
	#[serde(default)]
	pub browser: BrowserSnapshot,
	/// Records already in the store when syncing starts.
	#[serde(default)]
	pub initial: Vec<SyncChange>,
	#[serde(default)]
	pub steps: Vec<Step>,
}

/// One scripted event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
	/// A batch of remote changes.
	Remote { changes: Vec<SyncChange> },
	/// The tab navigates to a new page.
	Navigate { tab_id: i32, url: String },
	OpenTab {
		window_id: i32,
		tab: TabSnapshot,
	},
	CloseTab { tab_id: i32 },
	/// A full association pass.
	Associate,
	DeleteForeignSession { session_tag: String },
	GarbageCollect { now_ms: i64 },
}

impl Step {
	pub fn name(&self) -> &'static str {
		match self {
			Step::Remote { .. } => "remote",
			Step::Navigate { .. } => "navigate",
			Step::OpenTab { .. } => "openTab",
			Step::CloseTab { .. } => "closeTab",
			Step::Associate => "associate",
			Step::DeleteForeignSession { .. } => "deleteForeignSession",
			Step::GarbageCollect { .. } => "garbageCollect",
		}
	}
}

impl Scenario {
	pub fn load(path: &Path) -> Result<Self> {
		let content = read(path)?;
		serde_json::from_str(&content).map_err(|source| CliError::Parse {
			path: path.to_path_buf(),
			source,
		})
	}
}

/// Reads a JSON array of change records.
pub fn load_batch(path: &Path) -> Result<Vec<SyncChange>> {
	let content = read(path)?;
	serde_json::from_str(&content).map_err(|source| CliError::Parse {
		path: path.to_path_buf(),
		source,
	})
}

fn read(path: &Path) -> Result<String> {
	fs::read_to_string(path).map_err(|source| CliError::Read {
		path: path.to_path_buf(),
		source,
	})
}

/// Adds `tab` to the end of window `window_id`, creating the window if needed.
pub fn open_tab(browser: &mut BrowserSnapshot, window_id: i32, tab: TabSnapshot) {
	match browser.window_mut(window_id) {
		Some(window) => window.tabs.push(tab),
		None => browser.windows.push(WindowSnapshot::new(window_id, vec![tab])),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn steps_decode_from_tagged_json() {
		let scenario: Scenario = serde_json::from_str(
			r#"{
				"browser": {"windows": [{"windowId": 1, "tabs": [{"tabId": 10, "entries": [{"virtualUrl": "https://a.example/"}]}]}]},
				"steps": [
					{"type": "navigate", "tabId": 10, "url": "https://b.example/"},
					{"type": "openTab", "windowId": 2, "tab": {"tabId": 11}},
					{"type": "associate"},
					{"type": "garbageCollect", "nowMs": 5}
				]
			}"#,
		)
		.unwrap();

		assert_eq!(scenario.browser.windows.len(), 1);
		let names: Vec<_> = scenario.steps.iter().map(Step::name).collect();
		assert_eq!(names, vec!["navigate", "openTab", "associate", "garbageCollect"]);
		assert!(matches!(&scenario.steps[0], Step::Navigate { tab_id: 10, url } if url == "https://b.example/"));
	}

	#[test]
	fn open_tab_creates_missing_window() {
		let mut browser = BrowserSnapshot::default();
		open_tab(&mut browser, 3, TabSnapshot::with_urls(1, &["https://a.example/"]));
		open_tab(&mut browser, 3, TabSnapshot::with_urls(2, &["https://b.example/"]));
		assert_eq!(browser.windows.len(), 1);
		assert_eq!(browser.windows[0].tabs.len(), 2);
	}

	#[test]
	fn missing_file_is_a_read_error() {
		let dir = tempfile::tempdir().unwrap();
		let err = Scenario::load(&dir.path().join("absent.json")).unwrap_err();
		assert!(matches!(err, CliError::Read { .. }));
	}
}
