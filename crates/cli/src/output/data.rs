use serde::{Deserialize, Serialize};
use tabsync::{SessionEvent, SessionTab, SyncedSession, SyncedWindow};
use tabsync_protocol::{DeviceType, SyncChange, WindowType};

/// Result data for the replay command.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayData {
	pub local_session_tag: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub local_session: Option<SessionSummary>,
	pub foreign_sessions: Vec<SessionSummary>,
	pub emitted: Vec<SyncChange>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub events: Vec<String>,
}

/// One session as shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
	pub session_tag: String,
	pub session_name: String,
	pub device_type: DeviceType,
	pub modified_time_ms: i64,
	pub windows: Vec<WindowSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
	pub window_id: i32,
	pub window_type: WindowType,
	pub selected_tab_index: usize,
	pub tabs: Vec<TabSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSummary {
	pub tab_id: i32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tab_node_id: Option<i32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub title: String,
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub pinned: bool,
}

impl From<&SessionTab> for TabSummary {
	fn from(tab: &SessionTab) -> Self {
		let current = tab.current_navigation();
		Self {
			tab_id: tab.tab_id().0,
			tab_node_id: tab.tab_node_id().map(|node| node.0),
			url: current.map(|nav| nav.virtual_url.clone()),
			title: current.map(|nav| nav.title.clone()).unwrap_or_default(),
			pinned: tab.pinned,
		}
	}
}

impl From<&SyncedWindow> for WindowSummary {
	fn from(window: &SyncedWindow) -> Self {
		Self {
			window_id: window.window_id.0,
			window_type: window.window_type,
			selected_tab_index: window.selected_tab_index,
			tabs: window.tabs().iter().map(TabSummary::from).collect(),
		}
	}
}

impl From<&SyncedSession> for SessionSummary {
	fn from(session: &SyncedSession) -> Self {
		Self {
			session_tag: session.session_tag.clone(),
			session_name: session.session_name.clone(),
			device_type: session.device_type,
			modified_time_ms: session.modified_time_ms,
			windows: session.windows().map(WindowSummary::from).collect(),
		}
	}
}

/// Renders an observer event as a short log line.
pub fn describe_event(event: &SessionEvent) -> String {
	match event {
		SessionEvent::ForeignSessionUpdated { session_tag } => format!("foreign session updated: {session_tag}"),
		SessionEvent::ForeignSessionDeleted { session_tag } => format!("foreign session deleted: {session_tag}"),
		SessionEvent::LocalSessionAssociated { session_tag } => format!("local session associated: {session_tag}"),
	}
}

/// Result data for the validate command. Only printed when every record passed.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateData {
	pub total: usize,
	pub valid: usize,
}
