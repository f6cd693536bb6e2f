//! Single owner task for a [`SessionsSyncManager`].
//!
//! All manager operations run on one tokio task, one command at a time, in
//! the order they were queued:
//!
//! 1. A caller sends a command through [`SyncOwnerHandle`]
//! 2. Commands that return data carry a oneshot sender
//! 3. The owner loop applies the command to the manager and replies
//!
//! Token fetches are the only suspending work. The owner spawns them
//! separately and folds the result back in as a queued command, so remote
//! batches and local events keep flowing while a fetch is outstanding.

use tabsync_protocol::SyncChange;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::credentials::AccessToken;
use crate::error::{CredentialError, Result, SyncError};
use crate::ids::TabId;
use crate::live::LiveWindowSource;
use crate::manager::{ProcessReport, SessionsSyncManager};
use crate::tracker::SyncedSession;

type SourceUpdate<S> = Box<dyn FnOnce(&mut S) + Send>;

enum Command<S> {
	Merge {
		initial: Vec<SyncChange>,
		reply: oneshot::Sender<ProcessReport>,
	},
	AssociateWindows,
	LocalTabModified(TabId),
	UpdateSource(SourceUpdate<S>),
	RemoteChanges {
		changes: Vec<SyncChange>,
		reply: oneshot::Sender<ProcessReport>,
	},
	ForeignSessions {
		reply: oneshot::Sender<Vec<SyncedSession>>,
	},
	LocalSession {
		reply: oneshot::Sender<Option<SyncedSession>>,
	},
	DeleteForeignSession {
		session_tag: String,
		reply: oneshot::Sender<bool>,
	},
	GarbageCollect {
		now_ms: i64,
		reply: oneshot::Sender<Vec<String>>,
	},
	RefreshAccessToken {
		scopes: Vec<String>,
	},
	TokenFetched(std::result::Result<AccessToken, CredentialError>),
	AccessToken {
		reply: oneshot::Sender<Option<AccessToken>>,
	},
	Flush {
		reply: oneshot::Sender<()>,
	},
	Shutdown,
}

/// Spawns and runs the owner loop.
pub struct SyncOwner<S> {
	manager: SessionsSyncManager,
	source: S,
	rx: mpsc::UnboundedReceiver<Command<S>>,
	tx: mpsc::WeakUnboundedSender<Command<S>>,
}

impl<S> SyncOwner<S>
where
	S: LiveWindowSource + Send + 'static,
{
	/// Moves the manager and the live source onto a new task. The join
	/// handle yields both back once the owner shuts down.
	pub fn spawn(manager: SessionsSyncManager, source: S) -> (SyncOwnerHandle<S>, JoinHandle<(SessionsSyncManager, S)>) {
		let (tx, rx) = mpsc::unbounded_channel();
		let owner = Self {
			manager,
			source,
			rx,
			tx: tx.downgrade(),
		};
		let task = tokio::spawn(owner.run());
		(SyncOwnerHandle { tx }, task)
	}

	async fn run(mut self) -> (SessionsSyncManager, S) {
		info!(target = "tabsync.owner", session_tag = %self.manager.local_session_tag(), "sync owner started");
		while let Some(command) = self.rx.recv().await {
			if !self.handle(command) {
				break;
			}
		}
		info!(target = "tabsync.owner", "sync owner stopped");
		(self.manager, self.source)
	}

	/// Applies one command. Returns false on shutdown.
	fn handle(&mut self, command: Command<S>) -> bool {
		match command {
			Command::Merge { initial, reply } => {
				let report = self.manager.merge_data_and_start_syncing(initial, &self.source);
				let _ = reply.send(report);
			}
			Command::AssociateWindows => self.manager.associate_windows(&self.source),
			Command::LocalTabModified(tab_id) => self.manager.on_local_tab_modified(&self.source, tab_id),
			Command::UpdateSource(update) => update(&mut self.source),
			Command::RemoteChanges { changes, reply } => {
				let report = self.manager.process_sync_changes(changes);
				let _ = reply.send(report);
			}
			Command::ForeignSessions { reply } => {
				let sessions = self.manager.get_all_foreign_sessions().into_iter().cloned().collect();
				let _ = reply.send(sessions);
			}
			Command::LocalSession { reply } => {
				let _ = reply.send(self.manager.get_local_session().cloned());
			}
			Command::DeleteForeignSession { session_tag, reply } => {
				let _ = reply.send(self.manager.delete_foreign_session(&session_tag));
			}
			Command::GarbageCollect { now_ms, reply } => {
				let _ = reply.send(self.manager.garbage_collect_stale_sessions(now_ms));
			}
			Command::RefreshAccessToken { scopes } => self.spawn_token_fetch(scopes),
			Command::TokenFetched(result) => self.manager.set_access_token(result),
			Command::AccessToken { reply } => {
				let _ = reply.send(self.manager.access_token().cloned());
			}
			Command::Flush { reply } => {
				let _ = reply.send(());
			}
			Command::Shutdown => {
				self.manager.stop_syncing();
				return false;
			}
		}
		true
	}

	fn spawn_token_fetch(&self, scopes: Vec<String>) {
		let Some(provider) = self.manager.credential_provider() else {
			warn!(target = "tabsync.owner", "no credential provider configured");
			return;
		};
		let Some(tx) = self.tx.upgrade() else {
			return;
		};
		debug!(target = "tabsync.owner", scopes = scopes.len(), "fetching access token");
		tokio::spawn(async move {
			let result = provider.access_token(&scopes).await;
			let _ = tx.send(Command::TokenFetched(result));
		});
	}
}

/// Cloneable front end of a running [`SyncOwner`].
pub struct SyncOwnerHandle<S> {
	tx: mpsc::UnboundedSender<Command<S>>,
}

impl<S> Clone for SyncOwnerHandle<S> {
	fn clone(&self) -> Self {
		Self { tx: self.tx.clone() }
	}
}

impl<S> std::fmt::Debug for SyncOwnerHandle<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SyncOwnerHandle").field("closed", &self.tx.is_closed()).finish()
	}
}

impl<S> SyncOwnerHandle<S> {
	fn send(&self, command: Command<S>) -> Result<()> {
		self.tx.send(command).map_err(|_| SyncError::OwnerClosed)
	}

	async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command<S>) -> Result<T> {
		let (reply, rx) = oneshot::channel();
		self.send(command(reply))?;
		rx.await.map_err(|_| SyncError::OwnerClosed)
	}

	pub async fn merge_data_and_start_syncing(&self, initial: Vec<SyncChange>) -> Result<ProcessReport> {
		self.request(|reply| Command::Merge { initial, reply }).await
	}

	pub fn associate_windows(&self) -> Result<()> {
		self.send(Command::AssociateWindows)
	}

	pub fn local_tab_modified(&self, tab_id: TabId) -> Result<()> {
		self.send(Command::LocalTabModified(tab_id))
	}

	/// Mutates the live source on the owner task, ahead of any later command.
	pub fn update_source(&self, update: impl FnOnce(&mut S) + Send + 'static) -> Result<()> {
		self.send(Command::UpdateSource(Box::new(update)))
	}

	pub async fn process_remote_changes(&self, changes: Vec<SyncChange>) -> Result<ProcessReport> {
		self.request(|reply| Command::RemoteChanges { changes, reply }).await
	}

	pub async fn foreign_sessions(&self) -> Result<Vec<SyncedSession>> {
		self.request(|reply| Command::ForeignSessions { reply }).await
	}

	pub async fn local_session(&self) -> Result<Option<SyncedSession>> {
		self.request(|reply| Command::LocalSession { reply }).await
	}

	pub async fn delete_foreign_session(&self, session_tag: impl Into<String>) -> Result<bool> {
		let session_tag = session_tag.into();
		self.request(|reply| Command::DeleteForeignSession { session_tag, reply }).await
	}

	pub async fn garbage_collect(&self, now_ms: i64) -> Result<Vec<String>> {
		self.request(|reply| Command::GarbageCollect { now_ms, reply }).await
	}

	pub fn refresh_access_token(&self, scopes: Vec<String>) -> Result<()> {
		self.send(Command::RefreshAccessToken { scopes })
	}

	pub async fn access_token(&self) -> Result<Option<AccessToken>> {
		self.request(|reply| Command::AccessToken { reply }).await
	}

	/// Resolves once every command queued before it has been applied.
	pub async fn flush(&self) -> Result<()> {
		self.request(|reply| Command::Flush { reply }).await
	}

	pub fn shutdown(&self) -> Result<()> {
		self.send(Command::Shutdown)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::time::Duration;

	use async_trait::async_trait;
	use tabsync_protocol::{ChangeOp, SessionHeader, SessionSpecifics};

	use super::*;
	use crate::config::SyncConfig;
	use crate::credentials::{CredentialProvider, StaticCredentialProvider, SYNC_SCOPE};
	use crate::live::{BrowserSnapshot, TabSnapshot, WindowSnapshot};
	use crate::sink::RecordingChangeSink;

	fn spawn_owner(sink: &RecordingChangeSink) -> (SyncOwnerHandle<BrowserSnapshot>, JoinHandle<(SessionsSyncManager, BrowserSnapshot)>) {
		let config = SyncConfig {
			local_session_tag: Some("local".into()),
			..Default::default()
		};
		let manager = SessionsSyncManager::new(config, Box::new(sink.clone())).unwrap();
		let browser = BrowserSnapshot::new(vec![WindowSnapshot::new(
			1,
			vec![TabSnapshot::with_urls(10, &["https://a.example/"])],
		)]);
		SyncOwner::spawn(manager, browser)
	}

	#[tokio::test]
	async fn commands_apply_in_queue_order() {
		let sink = RecordingChangeSink::new();
		let (handle, task) = spawn_owner(&sink);

		handle.merge_data_and_start_syncing(Vec::new()).await.unwrap();
		handle
			.update_source(|browser| browser.windows[0].tabs.push(TabSnapshot::with_urls(11, &["https://b.example/"])))
			.unwrap();
		handle.associate_windows().unwrap();
		handle.flush().await.unwrap();

		let header = sink
			.snapshot()
			.into_iter()
			.rev()
			.find_map(|change| change.specifics.header)
			.unwrap();
		assert_eq!(header.windows[0].tabs, vec![10, 11]);
		let local = handle.local_session().await.unwrap().unwrap();
		assert_eq!(local.session_tag, "local");

		handle.shutdown().unwrap();
		let (manager, browser) = task.await.unwrap();
		assert!(!manager.is_syncing());
		assert_eq!(browser.windows[0].tabs.len(), 2);
	}

	#[tokio::test]
	async fn remote_batches_reach_the_tracker() {
		let sink = RecordingChangeSink::new();
		let (handle, _task) = spawn_owner(&sink);
		handle.merge_data_and_start_syncing(Vec::new()).await.unwrap();

		let header = SessionHeader {
			windows: vec![tabsync_protocol::SessionWindowSpecifics {
				window_id: Some(1),
				tabs: vec![5],
				..Default::default()
			}],
			..Default::default()
		};
		let tab = tabsync_protocol::SessionTabSpecifics {
			tab_id: Some(5),
			window_id: Some(1),
			navigations: vec![tabsync_protocol::TabNavigation {
				virtual_url: "https://x.example/".into(),
				..Default::default()
			}],
			..Default::default()
		};
		let report = handle
			.process_remote_changes(vec![
				SyncChange::new(ChangeOp::Update, SessionSpecifics::header("phone", header), 10),
				SyncChange::new(ChangeOp::Update, SessionSpecifics::tab("phone", 0, tab), 10),
			])
			.await
			.unwrap();
		assert_eq!(report.applied, 2);

		let sessions = handle.foreign_sessions().await.unwrap();
		assert_eq!(sessions.len(), 1);
		assert_eq!(sessions[0].session_tag, "phone");

		assert!(handle.delete_foreign_session("phone").await.unwrap());
		assert!(handle.foreign_sessions().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn closed_owner_reports_error() {
		let sink = RecordingChangeSink::new();
		let (handle, task) = spawn_owner(&sink);
		handle.shutdown().unwrap();
		task.await.unwrap();

		assert!(matches!(handle.flush().await, Err(SyncError::OwnerClosed)));
		assert!(matches!(handle.associate_windows(), Err(SyncError::OwnerClosed)));
	}

	struct SlowProvider;

	#[async_trait]
	impl CredentialProvider for SlowProvider {
		async fn access_token(&self, _scopes: &[String]) -> std::result::Result<AccessToken, CredentialError> {
			tokio::time::sleep(Duration::from_millis(50)).await;
			Ok(AccessToken {
				token: "slow".into(),
				expires_at_ms: i64::MAX,
			})
		}
	}

	#[tokio::test]
	async fn token_fetch_does_not_block_other_commands() {
		let sink = RecordingChangeSink::new();
		let config = SyncConfig {
			local_session_tag: Some("local".into()),
			..Default::default()
		};
		let manager = SessionsSyncManager::new(config, Box::new(sink.clone()))
			.unwrap()
			.with_credential_provider(Arc::new(SlowProvider));
		let (handle, _task) = SyncOwner::spawn(manager, BrowserSnapshot::default());

		handle.refresh_access_token(vec![SYNC_SCOPE.to_string()]).unwrap();
		handle.merge_data_and_start_syncing(Vec::new()).await.unwrap();
		assert_eq!(handle.access_token().await.unwrap(), None);

		let mut token = None;
		for _ in 0..50 {
			token = handle.access_token().await.unwrap();
			if token.is_some() {
				break;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
		assert_eq!(token.map(|token| token.token), Some("slow".to_string()));
	}

	#[tokio::test]
	async fn failed_fetch_leaves_no_token() {
		let sink = RecordingChangeSink::new();
		let config = SyncConfig::default();
		let manager = SessionsSyncManager::new(config, Box::new(sink))
			.unwrap()
			.with_credential_provider(Arc::new(StaticCredentialProvider::signed_out()));
		let (handle, _task) = SyncOwner::spawn(manager, BrowserSnapshot::default());

		handle.refresh_access_token(vec![SYNC_SCOPE.to_string()]).unwrap();
		tokio::time::sleep(Duration::from_millis(20)).await;
		assert_eq!(handle.access_token().await.unwrap(), None);
	}
}
