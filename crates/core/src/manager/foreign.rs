use std::collections::BTreeSet;

use tabsync_protocol::{SessionHeader, SyncChange};
use tracing::{debug, warn};

use super::validate::{RemoteRecord, classify};
use super::{ProcessReport, SessionsSyncManager, TouchedSessions, dedup_touched};
use crate::ids::{TabId, WindowId};
use crate::tracker::clamp_index;

impl SessionsSyncManager {
	/// Folds foreign records into the tracker in delivery order. Later
	/// records for the same key overwrite earlier ones.
	pub(super) fn apply_remote_records(&mut self, records: Vec<SyncChange>, report: &mut ProcessReport) -> TouchedSessions {
		let mut touched = BTreeSet::new();
		let mut deleted = BTreeSet::new();

		for change in &records {
			let record = match classify(change) {
				Ok(record) => record,
				Err(err) => {
					warn!(target = "tabsync.manager", error = %err, "rejected remote record");
					report.rejected.push(err);
					continue;
				}
			};
			let session_tag = change.specifics.session_tag.as_str();
			let modified = change.modified_time_ms;

			match record {
				RemoteRecord::Header(header) => {
					self.apply_foreign_header(session_tag, header, modified);
					deleted.remove(session_tag);
					touched.insert(session_tag.to_string());
				}
				RemoteRecord::Tab { node, tab_id, specifics } => {
					let tab = self.tracker.get_tab(session_tag, tab_id, node);
					tab.apply_specifics(specifics, modified);
					self.tracker.update_session_modified_time(session_tag, modified);
					deleted.remove(session_tag);
					touched.insert(session_tag.to_string());
				}
				RemoteRecord::TabNode(node) => {
					if deleted.contains(session_tag) {
						debug!(target = "tabsync.manager", session_tag, %node, "ignoring node of a session deleted in this batch");
					} else {
						self.tracker.on_tab_node_seen(session_tag, node);
						touched.insert(session_tag.to_string());
					}
				}
				RemoteRecord::DeleteHeader => {
					if self.tracker.delete_session(session_tag) {
						deleted.insert(session_tag.to_string());
						touched.insert(session_tag.to_string());
					}
				}
				RemoteRecord::DeleteTab(node) => {
					if self.tracker.lookup_session(session_tag).is_some() {
						self.tracker.delete_foreign_tab(session_tag, node);
						touched.insert(session_tag.to_string());
					}
				}
			}
			report.applied += 1;
		}

		dedup_touched(touched, &deleted)
	}

	/// Rebuilds a foreign session's window layout from its header. Windows
	/// and tabs the header no longer lists are swept; tabs it lists but that
	/// have no record yet are created empty.
	fn apply_foreign_header(&mut self, session_tag: &str, header: &SessionHeader, modified_time_ms: i64) {
		{
			let session = self.tracker.get_session(session_tag);
			session.session_name = header.client_name.clone();
			session.device_type = header.device_type;
		}

		self.tracker.reset_session_tracking(session_tag);
		for window in &header.windows {
			let Some(raw_window_id) = window.window_id else {
				continue;
			};
			if window.tabs.is_empty() {
				debug!(target = "tabsync.manager", session_tag, window_id = raw_window_id, "skipping empty foreign window");
				continue;
			}
			let window_id = WindowId(raw_window_id);
			{
				let synced = self.tracker.put_window_in_session(session_tag, window_id);
				synced.window_type = window.browser_type;
				synced.app_name = window.app_name.clone();
				synced.selected_tab_index = clamp_index(window.selected_tab_index, window.tabs.len());
				synced.timestamp_ms = modified_time_ms;
			}
			for (index, tab_id) in window.tabs.iter().enumerate() {
				self.tracker.put_tab_in_window(session_tag, window_id, TabId(*tab_id), index);
			}
		}
		let swept = self.tracker.cleanup_session(session_tag);
		self.tracker.update_session_modified_time(session_tag, modified_time_ms);

		debug!(
			target = "tabsync.manager",
			session_tag,
			windows = header.windows.len(),
			swept = swept.len(),
			"applied foreign header"
		);
	}
}
