use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tabsync::RecordError;

/// Bumped whenever the envelope or a payload changes shape.
pub const SCHEMA_VERSION: u32 = 2;

/// What every command prints: its payload or its failure, plus the records
/// the sync manager refused along the way.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T> {
	pub schema_version: u32,
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub inputs: Option<CommandInputs>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	pub duration_ms: u64,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub rejected: Vec<RejectedRecord>,
}

/// Files a command read.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommandInputs {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub scenario: Option<PathBuf>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub batch: Option<PathBuf>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	InvalidConfig,
	InvalidInput,
	InvalidRecords,
	IoError,
	SyncError,
	InternalError,
}

impl ErrorCode {
	pub fn as_str(self) -> &'static str {
		match self {
			ErrorCode::InvalidConfig => "INVALID_CONFIG",
			ErrorCode::InvalidInput => "INVALID_INPUT",
			ErrorCode::InvalidRecords => "INVALID_RECORDS",
			ErrorCode::IoError => "IO_ERROR",
			ErrorCode::SyncError => "SYNC_ERROR",
			ErrorCode::InternalError => "INTERNAL_ERROR",
		}
	}
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A change record the sync manager refused.
///
/// `index` and `client_tag` are only known when the record came from a batch
/// file; remote records rejected during a replay carry the session tag the
/// error names, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRecord {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub index: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub client_tag: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_tag: Option<String>,
	pub reason: RejectReason,
	pub message: String,
}

impl RejectedRecord {
	/// Attaches the record's position in its batch.
	pub fn at(mut self, index: usize, client_tag: impl Into<String>) -> Self {
		self.index = Some(index);
		self.client_tag = Some(client_tag.into());
		self
	}
}

impl From<&RecordError> for RejectedRecord {
	fn from(err: &RecordError) -> Self {
		let session_tag = match err {
			RecordError::MissingSessionTag => None,
			RecordError::MissingTabNodeId { session_tag }
			| RecordError::MissingTabId { session_tag, .. }
			| RecordError::MissingWindowId { session_tag, .. }
			| RecordError::HeaderWindowWithoutId { session_tag }
			| RecordError::DuplicateWindow { session_tag, .. }
			| RecordError::DuplicateTab { session_tag, .. }
			| RecordError::AmbiguousRecord { session_tag }
			| RecordError::EmptyRecord { session_tag } => Some(session_tag.clone()),
		};
		Self {
			index: None,
			client_tag: None,
			session_tag,
			reason: RejectReason::from(err),
			message: err.to_string(),
		}
	}
}

/// Machine-readable kind of a [`RecordError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
	MissingSessionTag,
	MissingTabNodeId,
	MissingTabId,
	MissingWindowId,
	HeaderWindowWithoutId,
	DuplicateWindow,
	DuplicateTab,
	AmbiguousRecord,
	EmptyRecord,
}

impl From<&RecordError> for RejectReason {
	fn from(err: &RecordError) -> Self {
		match err {
			RecordError::MissingSessionTag => RejectReason::MissingSessionTag,
			RecordError::MissingTabNodeId { .. } => RejectReason::MissingTabNodeId,
			RecordError::MissingTabId { .. } => RejectReason::MissingTabId,
			RecordError::MissingWindowId { .. } => RejectReason::MissingWindowId,
			RecordError::HeaderWindowWithoutId { .. } => RejectReason::HeaderWindowWithoutId,
			RecordError::DuplicateWindow { .. } => RejectReason::DuplicateWindow,
			RecordError::DuplicateTab { .. } => RejectReason::DuplicateTab,
			RecordError::AmbiguousRecord { .. } => RejectReason::AmbiguousRecord,
			RecordError::EmptyRecord { .. } => RejectReason::EmptyRecord,
		}
	}
}
