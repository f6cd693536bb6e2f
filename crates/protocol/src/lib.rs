//! Wire types for synced session records.
//!
//! This crate contains the serde-serializable types exchanged with the sync
//! transport. These types represent the "protocol layer" - the shapes of
//! session data as they are persisted and delivered in change batches.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization, key derivation and payload encoding
//! * Permissive: Identity fields are optional so malformed remote records still decode
//!   and can be rejected individually by the reconciliation layer
//! * Stable: Changes only when the record format changes
//!
//! The entity graph and reconciliation logic are built on top of these types
//! in `tabsync-core`.

pub mod change;
pub mod specifics;

pub use change::*;
pub use specifics::*;

/// Sentinel used on the wire for an absent tab node id.
pub const INVALID_TAB_NODE_ID: i32 = -1;
