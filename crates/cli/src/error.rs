use std::path::PathBuf;

use serde_json::json;
use tabsync::SyncError;
use thiserror::Error;

use crate::output::{ErrorCode, RejectedRecord};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("failed to read {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse {path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("{} of {total} records are invalid", invalid.len())]
	InvalidRecords { total: usize, invalid: Vec<RejectedRecord> },

	#[error(transparent)]
	Sync(#[from] SyncError),

	#[error("sync owner task failed: {0}")]
	Join(#[from] tokio::task::JoinError),
}

impl CliError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CliError::Read { .. } => ErrorCode::IoError,
			CliError::Parse { .. } => ErrorCode::InvalidInput,
			CliError::InvalidRecords { .. } => ErrorCode::InvalidRecords,
			CliError::Sync(SyncError::InvalidConfig(_)) => ErrorCode::InvalidConfig,
			CliError::Sync(SyncError::Io(_)) => ErrorCode::IoError,
			CliError::Sync(SyncError::Serialization(_)) => ErrorCode::InvalidConfig,
			CliError::Sync(_) => ErrorCode::SyncError,
			CliError::Join(_) => ErrorCode::InternalError,
		}
	}

	/// Records behind an `InvalidRecords` failure.
	pub fn rejected(&self) -> &[RejectedRecord] {
		match self {
			CliError::InvalidRecords { invalid, .. } => invalid,
			_ => &[],
		}
	}

	pub fn details(&self) -> Option<serde_json::Value> {
		match self {
			CliError::InvalidRecords { total, invalid } => Some(json!({ "total": total, "invalid": invalid.len() })),
			_ => None,
		}
	}
}
