//! Change notifications for session consumers.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// What changed in the tracked session graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
	ForeignSessionUpdated { session_tag: String },
	ForeignSessionDeleted { session_tag: String },
	LocalSessionAssociated { session_tag: String },
}

type Callback = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
	next_id: u64,
	entries: Vec<(u64, Callback)>,
}

/// Registered observers. Clones share the same registration list.
///
/// Callbacks may subscribe or unsubscribe (themselves included) while a
/// notification is being delivered. Delivery walks a copy of the list taken
/// when it starts; an observer removed mid-delivery is skipped from then on,
/// one added mid-delivery first hears the next event.
#[derive(Clone, Default)]
pub struct ObserverList {
	registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for ObserverList {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ObserverList").field("len", &self.len()).finish()
	}
}

impl ObserverList {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe<F>(&self, callback: F) -> ObserverHandle
	where
		F: Fn(&SessionEvent) + Send + Sync + 'static,
	{
		let mut registry = self.registry.lock();
		let id = registry.next_id;
		registry.next_id += 1;
		registry.entries.push((id, Arc::new(callback)));
		ObserverHandle {
			id,
			registry: Arc::downgrade(&self.registry),
		}
	}

	pub fn len(&self) -> usize {
		self.registry.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn notify(&self, event: &SessionEvent) {
		let snapshot: Vec<(u64, Callback)> = self.registry.lock().entries.clone();
		for (id, callback) in snapshot {
			let still_registered = self.registry.lock().entries.iter().any(|(entry, _)| *entry == id);
			if still_registered {
				callback(event);
			}
		}
	}
}

/// Registration token returned by [`ObserverList::subscribe`].
#[derive(Debug, Clone)]
pub struct ObserverHandle {
	id: u64,
	registry: Weak<Mutex<Registry>>,
}

impl ObserverHandle {
	/// Removes the observer. Returns false if it was already gone.
	pub fn unsubscribe(&self) -> bool {
		let Some(registry) = self.registry.upgrade() else {
			return false;
		};
		let mut registry = registry.lock();
		let before = registry.entries.len();
		registry.entries.retain(|(entry, _)| *entry != self.id);
		registry.entries.len() != before
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	fn updated(tag: &str) -> SessionEvent {
		SessionEvent::ForeignSessionUpdated { session_tag: tag.into() }
	}

	#[test]
	fn every_observer_hears_each_event() {
		let list = ObserverList::new();
		let hits = Arc::new(AtomicUsize::new(0));
		for _ in 0..3 {
			let hits = hits.clone();
			list.subscribe(move |_| {
				hits.fetch_add(1, Ordering::SeqCst);
			});
		}
		list.notify(&updated("a"));
		assert_eq!(hits.load(Ordering::SeqCst), 3);
	}

	#[test]
	fn observer_can_unsubscribe_itself_during_delivery() {
		let list = ObserverList::new();
		let hits = Arc::new(AtomicUsize::new(0));
		let slot: Arc<Mutex<Option<ObserverHandle>>> = Arc::default();

		let handle = {
			let hits = hits.clone();
			let slot = slot.clone();
			list.subscribe(move |_| {
				hits.fetch_add(1, Ordering::SeqCst);
				if let Some(handle) = slot.lock().take() {
					handle.unsubscribe();
				}
			})
		};
		*slot.lock() = Some(handle);

		list.notify(&updated("a"));
		list.notify(&updated("b"));
		assert_eq!(hits.load(Ordering::SeqCst), 1);
		assert!(list.is_empty());
	}

	#[test]
	fn observer_removed_mid_delivery_is_skipped() {
		let list = ObserverList::new();
		let late_hits = Arc::new(AtomicUsize::new(0));
		let victim: Arc<Mutex<Option<ObserverHandle>>> = Arc::default();

		{
			let victim = victim.clone();
			list.subscribe(move |_| {
				if let Some(handle) = victim.lock().as_ref() {
					handle.unsubscribe();
				}
			});
		}
		let handle = {
			let late_hits = late_hits.clone();
			list.subscribe(move |_| {
				late_hits.fetch_add(1, Ordering::SeqCst);
			})
		};
		*victim.lock() = Some(handle);

		list.notify(&updated("a"));
		assert_eq!(late_hits.load(Ordering::SeqCst), 0);
		assert_eq!(list.len(), 1);
	}

	#[test]
	fn unsubscribe_after_list_dropped_is_harmless() {
		let list = ObserverList::new();
		let handle = list.subscribe(|_| {});
		assert!(handle.unsubscribe());
		assert!(!handle.unsubscribe());
		drop(list);
		assert!(!handle.unsubscribe());
	}
}
