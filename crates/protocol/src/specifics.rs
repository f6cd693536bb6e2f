//! Session record payloads.

use serde::{Deserialize, Serialize};

/// Kind of device a session belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
	Win,
	Mac,
	Linux,
	#[serde(rename = "chromeos")]
	ChromeOs,
	Phone,
	Tablet,
	#[default]
	Other,
}

/// Browser window flavor. Only tabbed and popup windows are synced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
	#[default]
	Tabbed,
	Popup,
	App,
	Devtools,
}

impl WindowType {
	pub fn is_syncable(self) -> bool {
		matches!(self, Self::Tabbed | Self::Popup)
	}
}

/// One entry in a tab's back/forward list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TabNavigation {
	#[serde(default)]
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

/// Window entry inside a session header. `tabs` lists tab ids in tab-strip order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionWindowSpecifics {
	#[serde(default)]
	pub window_id: Option<i32>,
	#[serde(default)]
	pub selected_tab_index: i32,
	#[serde(default)]
	pub browser_type: WindowType,
	#[serde(default)]
	pub app_name: Option<String>,
	#[serde(default)]
	pub tabs: Vec<i32>,
}

/// Session-level record describing the device and its window layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionHeader {
	#[serde(default)]
	pub client_name: String,
	#[serde(default)]
	pub device_type: DeviceType,
	#[serde(default)]
	pub windows: Vec<SessionWindowSpecifics>,
}

/// Tab-level record stored in a tab node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionTabSpecifics {
	#[serde(default)]
	pub tab_id: Option<i32>,
	#[serde(default)]
	pub window_id: Option<i32>,
	#[serde(default)]
	pub tab_visual_index: i32,
	#[serde(default)]
	pub current_navigation_index: i32,
	#[serde(default)]
	pub pinned: bool,
	#[serde(default)]
	pub extension_app_id: Option<String>,
	#[serde(default)]
	pub navigations: Vec<TabNavigation>,
}

/// A single sync record: either a session header or a tab node.
///
/// Tab node records without a `tab` payload are placeholders written when a
/// node id is first allocated, so the node can be found again after a crash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionSpecifics {
	#[serde(default)]
	pub session_tag: String,
	#[serde(default)]
	pub tab_node_id: Option<i32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub header: Option<SessionHeader>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tab: Option<SessionTabSpecifics>,
}

impl SessionSpecifics {
	pub fn header(session_tag: impl Into<String>, header: SessionHeader) -> Self {
		Self {
			session_tag: session_tag.into(),
			tab_node_id: None,
			header: Some(header),
			tab: None,
		}
	}

	pub fn tab(session_tag: impl Into<String>, tab_node_id: i32, tab: SessionTabSpecifics) -> Self {
		Self {
			session_tag: session_tag.into(),
			tab_node_id: Some(tab_node_id),
			header: None,
			tab: Some(tab),
		}
	}

	/// Minimal tab node record carrying only the session tag and node id.
	pub fn tab_node_placeholder(session_tag: impl Into<String>, tab_node_id: i32) -> Self {
		Self {
			session_tag: session_tag.into(),
			tab_node_id: Some(tab_node_id),
			header: None,
			tab: None,
		}
	}

	pub fn is_header(&self) -> bool {
		self.header.is_some()
	}
}
