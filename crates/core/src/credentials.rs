//! Access-token hand-off for the sync transport.
//!
//! Fetching a token is the one operation that may suspend, so it never runs
//! on the owner task directly: the owner spawns the fetch and receives the
//! result back as a message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CredentialError;

/// OAuth scope requested for session sync traffic.
pub const SYNC_SCOPE: &str = "https://www.googleapis.com/auth/chromesync";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
	pub token: String,
	pub expires_at_ms: i64,
}

impl AccessToken {
	pub fn is_expired(&self, now_ms: i64) -> bool {
		now_ms >= self.expires_at_ms
	}
}

/// Source of access tokens for the signed-in account.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
	async fn access_token(&self, scopes: &[String]) -> Result<AccessToken, CredentialError>;
}

/// Hands out a fixed token, or fails as not signed in.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
	token: Option<AccessToken>,
}

impl StaticCredentialProvider {
	pub fn new(token: AccessToken) -> Self {
		Self { token: Some(token) }
	}

	pub fn signed_out() -> Self {
		Self::default()
	}
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
	async fn access_token(&self, scopes: &[String]) -> Result<AccessToken, CredentialError> {
		if scopes.is_empty() {
			return Err(CredentialError::Rejected("no scopes requested".into()));
		}
		self.token.clone().ok_or(CredentialError::NotSignedIn)
	}
}
