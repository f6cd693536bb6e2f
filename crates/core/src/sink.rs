//! Outbound side of the sync engine.

use std::sync::Arc;

use parking_lot::Mutex;
use tabsync_protocol::SyncChange;

/// Receives batches of outbound change records.
///
/// Batches are handed over in the order they were produced; records inside a
/// batch keep the order the manager emitted them in.
pub trait ChangeSink: Send {
	fn process_changes(&mut self, changes: Vec<SyncChange>);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChangeSink;

impl ChangeSink for NoopChangeSink {
	fn process_changes(&mut self, _changes: Vec<SyncChange>) {}
}

/// Buffers every record; clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct RecordingChangeSink {
	records: Arc<Mutex<Vec<SyncChange>>>,
}

impl RecordingChangeSink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Drains and returns everything recorded so far.
	pub fn take(&self) -> Vec<SyncChange> {
		std::mem::take(&mut *self.records.lock())
	}

	pub fn snapshot(&self) -> Vec<SyncChange> {
		self.records.lock().clone()
	}

	pub fn len(&self) -> usize {
		self.records.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.lock().is_empty()
	}
}

impl ChangeSink for RecordingChangeSink {
	fn process_changes(&mut self, changes: Vec<SyncChange>) {
		self.records.lock().extend(changes);
	}
}

impl<F> ChangeSink for F
where
	F: FnMut(Vec<SyncChange>) + Send,
{
	fn process_changes(&mut self, changes: Vec<SyncChange>) {
		self(changes)
	}
}
