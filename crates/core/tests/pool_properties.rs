//! Property-based tests for the tab node pool and the tracker sweep.
//!
//! - every tracked node is in exactly one state; capacity adds up
//! - the free set never ends an operation above the high watermark
//! - newly announced node ids strictly increase and are never reused
//! - open tabs never share a node
//! - a sweep removes exactly the unclaimed tabs and keeps strip order

use std::collections::BTreeSet;

use proptest::prelude::*;
use tabsync::{SyncedSessionTracker, TabId, TabNodeId, TabNodePool, WindowId};
use tabsync_protocol::{ChangeOp, SyncChange};

#[derive(Debug, Clone)]
enum PoolOp {
	Open,
	Close(usize),
}

fn arb_pool_op() -> impl Strategy<Value = PoolOp> {
	prop_oneof![
		3 => Just(PoolOp::Open),
		2 => any::<usize>().prop_map(PoolOp::Close),
	]
}

fn announced(changes: &[SyncChange], op: ChangeOp) -> Vec<i32> {
	changes
		.iter()
		.filter(|change| change.op == op)
		.filter_map(|change| change.specifics.tab_node_id)
		.collect()
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(128))]

	#[test]
	fn pool_states_stay_consistent(
		ops in prop::collection::vec(arb_pool_op(), 1..400),
		high in 1usize..12,
		low_fraction in 0usize..=100,
	) {
		let low = high * low_fraction / 100;
		let mut pool = TabNodePool::with_watermarks("device", high, low);
		let mut open: Vec<(TabId, TabNodeId)> = Vec::new();
		let mut next_tab = 0;
		let mut max_announced = -1;
		let mut deleted = BTreeSet::new();

		for op in ops {
			let mut changes = Vec::new();
			match op {
				PoolOp::Open => {
					let node = pool.get_free_tab_node(&mut changes);
					let tab = TabId(next_tab);
					next_tab += 1;
					pool.associate_tab_node(node, tab);
					open.push((tab, node));
				}
				PoolOp::Close(pick) => {
					if open.is_empty() {
						continue;
					}
					let (_, node) = open.remove(pick % open.len());
					pool.free_tab_node(node, &mut changes);
				}
			}

			for id in announced(&changes, ChangeOp::Add) {
				prop_assert!(id > max_announced, "node {} announced after {}", id, max_announced);
				prop_assert!(!deleted.contains(&id), "deleted node {} reused", id);
				max_announced = id;
			}
			deleted.extend(announced(&changes, ChangeOp::Delete));

			prop_assert!(pool.free_node_count() <= high);
			prop_assert_eq!(pool.capacity(), open.len() + pool.free_node_count());
			let nodes: BTreeSet<_> = open.iter().map(|(_, node)| *node).collect();
			prop_assert_eq!(nodes.len(), open.len());
			for (tab, node) in &open {
				prop_assert_eq!(pool.tab_id_from_tab_node_id(*node), Some(*tab));
				prop_assert!(!deleted.contains(&node.0));
			}
		}
	}

	#[test]
	fn sweep_removes_exactly_unclaimed_tabs(
		layout in prop::collection::vec(1usize..6, 1..5),
		keep_mask in prop::collection::vec(any::<bool>(), 25),
	) {
		let mut tracker = SyncedSessionTracker::new();
		let mut windows: Vec<(WindowId, Vec<TabId>)> = Vec::new();
		let mut next = 0;
		for (w, count) in layout.iter().enumerate() {
			let window_id = WindowId(w as i32);
			let mut tabs = Vec::new();
			for index in 0..*count {
				let tab_id = TabId(next);
				tracker.get_tab("foreign", tab_id, TabNodeId(next));
				tracker.put_tab_in_window("foreign", window_id, tab_id, index);
				tabs.push(tab_id);
				next += 1;
			}
			windows.push((window_id, tabs));
		}

		tracker.reset_session_tracking("foreign");
		let mut expected_kept = Vec::new();
		let mut expected_swept = BTreeSet::new();
		for (window_id, tabs) in &windows {
			tracker.put_window_in_session("foreign", *window_id);
			let mut kept = Vec::new();
			for tab_id in tabs {
				if keep_mask[tab_id.0 as usize % keep_mask.len()] {
					tracker.put_tab_in_window("foreign", *window_id, *tab_id, kept.len());
					kept.push(*tab_id);
				} else {
					expected_swept.insert(*tab_id);
				}
			}
			expected_kept.push((*window_id, kept));
		}

		let swept: BTreeSet<_> = tracker.cleanup_session("foreign").iter().map(|tab| tab.tab_id()).collect();
		prop_assert_eq!(swept, expected_swept);

		let session = tracker.lookup_session("foreign").unwrap();
		for (window_id, kept) in expected_kept {
			let window = session.window(window_id).unwrap();
			prop_assert_eq!(window.tab_ids(), kept);
		}
		prop_assert!(tracker.unmapped_tab_ids("foreign").is_empty());
	}
}
