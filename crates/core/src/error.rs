//! Error types for session reconciliation.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors surfaced by the sync manager, its owner task and configuration.
#[derive(Debug, Error)]
pub enum SyncError {
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	#[error("credential fetch failed: {0}")]
	Credential(#[from] CredentialError),

	#[error("sync owner task has shut down")]
	OwnerClosed,

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}

/// Why a single remote record was rejected.
///
/// Rejections are per record; the rest of the batch is still applied.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
	#[error("record has no session tag")]
	MissingSessionTag,

	#[error("tab record in session {session_tag} has no valid tab node id")]
	MissingTabNodeId { session_tag: String },

	#[error("tab record {tab_node_id} in session {session_tag} has no tab id")]
	MissingTabId { session_tag: String, tab_node_id: i32 },

	#[error("tab record {tab_node_id} in session {session_tag} has no window id")]
	MissingWindowId { session_tag: String, tab_node_id: i32 },

	#[error("header of session {session_tag} lists a window without an id")]
	HeaderWindowWithoutId { session_tag: String },

	#[error("header of session {session_tag} lists window {window_id} more than once")]
	DuplicateWindow { session_tag: String, window_id: i32 },

	#[error("header of session {session_tag} places tab {tab_id} more than once")]
	DuplicateTab { session_tag: String, tab_id: i32 },

	#[error("record in session {session_tag} carries both a header and a tab")]
	AmbiguousRecord { session_tag: String },

	#[error("record in session {session_tag} carries neither a header nor a tab node")]
	EmptyRecord { session_tag: String },
}

/// Failures reported by a [`CredentialProvider`](crate::credentials::CredentialProvider).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
	#[error("no signed-in account")]
	NotSignedIn,

	#[error("token request was rejected: {0}")]
	Rejected(String),

	#[error("credential service unavailable: {0}")]
	Unavailable(String),
}
