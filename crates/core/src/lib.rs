// tabsync: synced session tracking and tab-node reconciliation
//
// Keeps the local device's open windows and tabs mirrored into sync records,
// and folds other devices' records into a browsable graph of foreign sessions.

pub mod config;
pub mod credentials;
pub mod error;
pub mod ids;
pub mod live;
pub mod manager;
pub mod observer;
pub mod owner;
pub mod sink;
pub mod tab_node_pool;
pub mod tracker;

pub use config::SyncConfig;
pub use credentials::{AccessToken, CredentialProvider, StaticCredentialProvider};
pub use error::{CredentialError, RecordError, Result, SyncError};
pub use ids::{TabId, TabNodeId, WindowId};
pub use live::{BrowserSnapshot, LiveTab, LiveWindow, LiveWindowSource, NavigationEntry, TabSnapshot, WindowSnapshot};
pub use manager::{ProcessReport, SessionsSyncManager, should_sync_tab, should_sync_url, validate_change};
pub use observer::{ObserverHandle, ObserverList, SessionEvent};
pub use owner::{SyncOwner, SyncOwnerHandle};
pub use sink::{ChangeSink, NoopChangeSink, RecordingChangeSink};
pub use tab_node_pool::TabNodePool;
pub use tracker::{Ownership, SessionLookup, SessionTab, SyncedSession, SyncedSessionTracker, SyncedWindow};
