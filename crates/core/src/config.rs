//! Tunables for the tab node pool and the sync manager.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tabsync_protocol::DeviceType;

use crate::error::{Result, SyncError};

/// Free-node count above which free nodes are deleted in bulk.
pub const FREE_NODES_HIGH_WATERMARK: usize = 100;
/// Free-node count that bulk deletion trims down to.
pub const FREE_NODES_LOW_WATERMARK: usize = 25;
/// Navigations synced on either side of the current entry.
pub const MAX_SYNC_NAVIGATION_COUNT: usize = 6;
/// Foreign sessions untouched for longer than this are garbage collected.
pub const STALE_SESSION_THRESHOLD_DAYS: u32 = 14;

/// Configuration for one local device session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
	/// Stable tag of the local session. Generated at startup when absent.
	pub local_session_tag: Option<String>,
	pub session_name: String,
	pub device_type: DeviceType,
	pub free_nodes_high_watermark: usize,
	pub free_nodes_low_watermark: usize,
	pub max_sync_navigation_count: usize,
	pub stale_session_threshold_days: u32,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			local_session_tag: None,
			session_name: "tabsync".to_string(),
			device_type: DeviceType::Other,
			free_nodes_high_watermark: FREE_NODES_HIGH_WATERMARK,
			free_nodes_low_watermark: FREE_NODES_LOW_WATERMARK,
			max_sync_navigation_count: MAX_SYNC_NAVIGATION_COUNT,
			stale_session_threshold_days: STALE_SESSION_THRESHOLD_DAYS,
		}
	}
}

impl SyncConfig {
	/// Loads and validates a JSON config file. Missing fields take defaults.
	pub fn load(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path)?;
		let config: Self = serde_json::from_str(&content)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.free_nodes_high_watermark == 0 {
			return Err(SyncError::InvalidConfig("freeNodesHighWatermark must be positive".into()));
		}
		if self.free_nodes_low_watermark > self.free_nodes_high_watermark {
			return Err(SyncError::InvalidConfig(format!(
				"freeNodesLowWatermark ({}) exceeds freeNodesHighWatermark ({})",
				self.free_nodes_low_watermark, self.free_nodes_high_watermark
			)));
		}
		if let Some(tag) = &self.local_session_tag {
			if tag.trim().is_empty() {
				return Err(SyncError::InvalidConfig("localSessionTag must not be blank".into()));
			}
		}
		Ok(())
	}

	pub(crate) fn stale_session_threshold_ms(&self) -> i64 {
		i64::from(self.stale_session_threshold_days) * 24 * 60 * 60 * 1000
	}
}
