//! Reconciliation of live browser state and remote records.
//!
//! [`SessionsSyncManager`] owns the session tracker and the local tab node
//! pool. Local passes read the browser through [`LiveWindowSource`] and emit
//! outbound records to a [`ChangeSink`]; remote batches are validated record
//! by record and folded into the tracker.
//!
//! The manager is single-threaded. Wrap it in a
//! [`SyncOwner`](crate::owner::SyncOwner) to drive it from async code.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tabsync_protocol::{ChangeOp, EntityKind, SessionSpecifics, SyncChange};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::credentials::{AccessToken, CredentialProvider};
use crate::error::{CredentialError, RecordError, Result};
use crate::ids::{TabId, TabNodeId};
use crate::live::LiveWindowSource;
use crate::observer::{ObserverList, SessionEvent};
use crate::sink::ChangeSink;
use crate::tab_node_pool::TabNodePool;
use crate::tracker::{SessionLookup, SessionTab, SyncedSession, SyncedSessionTracker, SyncedWindow};

mod foreign;
mod local;
mod validate;

pub use local::{should_sync_tab, should_sync_url};
pub use validate::validate_change;


/// Prefix of generated local session tags.
const SESSION_TAG_PREFIX: &str = "session_sync";

/// Outcome of applying a batch of remote records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
	pub applied: usize,
	/// Records addressed to the local session, which only this device writes.
	pub ignored: usize,
	pub rejected: Vec<RecordError>,
}

impl ProcessReport {
	pub fn is_clean(&self) -> bool {
		self.rejected.is_empty()
	}

	fn merge(&mut self, other: ProcessReport) {
		self.applied += other.applied;
		self.ignored += other.ignored;
		self.rejected.extend(other.rejected);
	}
}

/// Two-way reconciler between the local browser and the sync store.
pub struct SessionsSyncManager {
	config: SyncConfig,
	local_session_tag: String,
	tracker: SyncedSessionTracker,
	local_tab_pool: TabNodePool,
	local_tab_map: HashMap<TabId, TabNodeId>,
	sink: Box<dyn ChangeSink>,
	credentials: Option<Arc<dyn CredentialProvider>>,
	access_token: Option<AccessToken>,
	observers: ObserverList,
	syncing: bool,
}

impl std::fmt::Debug for SessionsSyncManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionsSyncManager")
			.field("local_session_tag", &self.local_session_tag)
			.field("syncing", &self.syncing)
			.field("local_tabs", &self.local_tab_map.len())
			.field("pool_capacity", &self.local_tab_pool.capacity())
			.finish()
	}
}

impl SessionsSyncManager {
	pub fn new(config: SyncConfig, sink: Box<dyn ChangeSink>) -> Result<Self> {
		config.validate()?;
		let local_session_tag = config
			.local_session_tag
			.clone()
			.unwrap_or_else(|| format!("{SESSION_TAG_PREFIX}{}", Uuid::new_v4()));
		let local_tab_pool = TabNodePool::with_watermarks(
			&local_session_tag,
			config.free_nodes_high_watermark,
			config.free_nodes_low_watermark,
		);
		let mut tracker = SyncedSessionTracker::new();
		tracker.set_local_session_tag(&local_session_tag);

		Ok(Self {
			config,
			local_session_tag,
			tracker,
			local_tab_pool,
			local_tab_map: HashMap::new(),
			sink,
			credentials: None,
			access_token: None,
			observers: ObserverList::new(),
			syncing: false,
		})
	}

	pub fn with_credential_provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
		self.credentials = Some(provider);
		self
	}

	pub fn config(&self) -> &SyncConfig {
		&self.config
	}

	pub fn local_session_tag(&self) -> &str {
		&self.local_session_tag
	}

	pub fn is_syncing(&self) -> bool {
		self.syncing
	}

	pub fn tracker(&self) -> &SyncedSessionTracker {
		&self.tracker
	}

	pub fn local_tab_pool(&self) -> &TabNodePool {
		&self.local_tab_pool
	}

	/// Node backing a live local tab, if it has been associated.
	pub fn local_tab_node(&self, tab_id: TabId) -> Option<TabNodeId> {
		self.local_tab_map.get(&tab_id).copied()
	}

	pub fn observers(&self) -> &ObserverList {
		&self.observers
	}

	/// Starts syncing: restores the local node pool from `initial`, ingests
	/// every foreign record, then associates the live browser state.
	///
	/// `initial` holds the records already in the store; their `op` is
	/// ignored. Bad foreign records are reported and skipped.
	pub fn merge_data_and_start_syncing(
		&mut self,
		initial: Vec<SyncChange>,
		source: &dyn LiveWindowSource,
	) -> ProcessReport {
		let mut changes = Vec::new();
		let mut foreign = Vec::new();
		let mut found_local_header = false;

		for record in initial {
			if record.specifics.session_tag != self.local_session_tag {
				foreign.push(SyncChange { op: ChangeOp::Add, ..record });
				continue;
			}
			if record.specifics.is_header() {
				found_local_header = true;
				continue;
			}
			self.restore_local_tab_node(&record.specifics, &mut changes);
		}

		let mut report = ProcessReport::default();
		let touched = self.apply_remote_records(foreign, &mut report);

		self.syncing = true;
		info!(
			target = "tabsync.manager",
			session_tag = %self.local_session_tag,
			restored_nodes = self.local_tab_pool.capacity(),
			foreign_sessions = touched.len(),
			rejected = report.rejected.len(),
			"merged initial sync data"
		);

		let header_op = if found_local_header { ChangeOp::Update } else { ChangeOp::Add };
		self.associate_windows_into(source, header_op, &mut changes);
		self.flush(changes);

		self.notify_touched(touched);
		report
	}

	/// Applies a batch of remote changes. Bad records are skipped and
	/// reported; the rest of the batch still applies.
	pub fn process_sync_changes(&mut self, changes: Vec<SyncChange>) -> ProcessReport {
		let mut report = ProcessReport::default();
		let mut local_header_deleted = false;
		let mut remote = Vec::with_capacity(changes.len());

		for change in changes {
			if change.specifics.session_tag == self.local_session_tag {
				if change.op == ChangeOp::Delete && change.kind() == EntityKind::SessionHeader {
					local_header_deleted = true;
				} else {
					debug!(target = "tabsync.manager", op = ?change.op, "ignoring remote write to local session");
				}
				report.ignored += 1;
				continue;
			}
			remote.push(change);
		}

		let mut batch = ProcessReport::default();
		let touched = self.apply_remote_records(remote, &mut batch);
		report.merge(batch);

		if local_header_deleted && self.syncing {
			warn!(target = "tabsync.manager", session_tag = %self.local_session_tag, "local header deleted remotely; rewriting");
			let changes = self.local_session_records(ChangeOp::Add);
			self.flush(changes);
		}

		self.notify_touched(touched);
		report
	}

	/// Presentable foreign sessions, most recently modified first.
	pub fn get_all_foreign_sessions(&self) -> Vec<&SyncedSession> {
		let mut sessions = self.tracker.lookup_all_foreign_sessions(SessionLookup::Presentable);
		sessions.sort_by(|a, b| b.modified_time_ms.cmp(&a.modified_time_ms).then_with(|| a.session_tag.cmp(&b.session_tag)));
		sessions
	}

	pub fn get_foreign_session(&self, session_tag: &str) -> Option<Vec<&SyncedWindow>> {
		if self.tracker.is_local(session_tag) {
			return None;
		}
		self.tracker.lookup_session_windows(session_tag)
	}

	pub fn get_foreign_tab(&self, session_tag: &str, tab_id: TabId) -> Option<&SessionTab> {
		if self.tracker.is_local(session_tag) {
			return None;
		}
		self.tracker.lookup_session_tab(session_tag, tab_id)
	}

	pub fn get_local_session(&self) -> Option<&SyncedSession> {
		self.tracker.lookup_local_session()
	}

	/// Drops a foreign session and deletes its records from the store.
	pub fn delete_foreign_session(&mut self, session_tag: &str) -> bool {
		let mut changes = Vec::new();
		let deleted = self.delete_foreign_session_into(session_tag, &mut changes);
		self.flush(changes);
		if deleted {
			self.observers.notify(&SessionEvent::ForeignSessionDeleted {
				session_tag: session_tag.to_string(),
			});
		}
		deleted
	}

	/// Deletes foreign sessions not modified within the stale threshold.
	/// Returns the tags that were removed.
	pub fn garbage_collect_stale_sessions(&mut self, now_ms: i64) -> Vec<String> {
		let threshold = self.config.stale_session_threshold_ms();
		let stale: Vec<String> = self
			.tracker
			.lookup_all_foreign_sessions(SessionLookup::Raw)
			.into_iter()
			.filter(|session| now_ms.saturating_sub(session.modified_time_ms) > threshold)
			.map(|session| session.session_tag.clone())
			.collect();

		let mut changes = Vec::new();
		for session_tag in &stale {
			self.delete_foreign_session_into(session_tag, &mut changes);
		}
		self.flush(changes);

		if !stale.is_empty() {
			info!(target = "tabsync.manager", collected = stale.len(), "garbage collected stale sessions");
		}
		for session_tag in &stale {
			self.observers.notify(&SessionEvent::ForeignSessionDeleted {
				session_tag: session_tag.clone(),
			});
		}
		stale
	}

	/// Forgets all tracked state. The local tag is kept for the next merge.
	pub fn stop_syncing(&mut self) {
		info!(target = "tabsync.manager", session_tag = %self.local_session_tag, "stopped syncing");
		self.syncing = false;
		self.tracker.clear();
		self.tracker.set_local_session_tag(&self.local_session_tag);
		self.local_tab_pool.clear();
		self.local_tab_map.clear();
		self.access_token = None;
	}

	pub fn credential_provider(&self) -> Option<Arc<dyn CredentialProvider>> {
		self.credentials.clone()
	}

	pub fn access_token(&self) -> Option<&AccessToken> {
		self.access_token.as_ref()
	}

	/// Stores the outcome of a token fetch. Failures keep the previous token.
	pub fn set_access_token(&mut self, result: std::result::Result<AccessToken, CredentialError>) {
		match result {
			Ok(token) => {
				debug!(target = "tabsync.manager", expires_at_ms = token.expires_at_ms, "access token refreshed");
				self.access_token = Some(token);
			}
			Err(err) => warn!(target = "tabsync.manager", error = %err, "access token fetch failed"),
		}
	}

	fn delete_foreign_session_into(&mut self, session_tag: &str, changes: &mut Vec<SyncChange>) -> bool {
		if self.tracker.is_local(session_tag) {
			warn!(target = "tabsync.manager", session_tag, "refusing to delete the local session");
			return false;
		}
		let nodes = self.tracker.lookup_tab_node_ids(session_tag);
		if !self.tracker.delete_session(session_tag) {
			return false;
		}
		changes.push(SyncChange::delete_header(session_tag));
		changes.extend(nodes.into_iter().map(|node| SyncChange::delete_tab_node(session_tag, node.0)));
		true
	}

	/// Local header plus every local tab record, for rewriting the store.
	fn local_session_records(&mut self, header_op: ChangeOp) -> Vec<SyncChange> {
		let now = now_ms();
		let tag = self.local_session_tag.clone();
		self.tracker.update_session_modified_time(&tag, now);
		let Some(session) = self.tracker.lookup_session(&tag) else {
			return Vec::new();
		};

		let mut changes = vec![SyncChange::new(header_op, SessionSpecifics::header(&tag, session.to_header()), now)];
		for tab in session.windows().flat_map(SyncedWindow::tabs) {
			if let Some(node) = tab.tab_node_id() {
				changes.push(SyncChange::new(ChangeOp::Add, SessionSpecifics::tab(&tag, node.0, tab.to_specifics()), now));
			}
		}
		changes
	}

	fn notify_touched(&self, touched: TouchedSessions) {
		for (session_tag, deleted) in touched {
			let event = if deleted {
				SessionEvent::ForeignSessionDeleted { session_tag }
			} else {
				SessionEvent::ForeignSessionUpdated { session_tag }
			};
			self.observers.notify(&event);
		}
	}

	fn flush(&mut self, changes: Vec<SyncChange>) {
		if changes.is_empty() {
			return;
		}
		if !self.syncing {
			debug!(target = "tabsync.manager", dropped = changes.len(), "not syncing; dropping outbound changes");
			return;
		}
		debug!(target = "tabsync.manager", count = changes.len(), "emitting changes");
		self.sink.process_changes(changes);
	}
}

/// Tags touched by a remote batch, with whether the session was deleted.
type TouchedSessions = Vec<(String, bool)>;

pub(crate) fn now_ms() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
		.unwrap_or(0)
}

fn dedup_touched(touched: BTreeSet<String>, deleted: &BTreeSet<String>) -> TouchedSessions {
	touched
		.into_iter()
		.map(|tag| {
			let gone = deleted.contains(&tag);
			(tag, gone)
		})
		.collect()
}
