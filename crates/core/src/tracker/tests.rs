use tabsync_protocol::TabNavigation;

use super::*;

const LOCAL: &str = "local-tag";
const FOREIGN: &str = "foreign-tag";

fn navigation(url: &str) -> TabNavigation {
	TabNavigation {
		virtual_url: url.to_string(),
		title: url.to_string(),
		..Default::default()
	}
}

/// Builds window 1 of `tag` holding tabs 10, 11, 12 backed by nodes 0, 1, 2.
fn three_tab_window(tracker: &mut SyncedSessionTracker, tag: &str) {
	tracker.put_window_in_session(tag, WindowId(1));
	for (index, raw) in [10, 11, 12].into_iter().enumerate() {
		tracker.get_tab(tag, TabId(raw), TabNodeId(raw - 10));
		tracker.put_tab_in_window(tag, WindowId(1), TabId(raw), index);
	}
}

fn window_tab_ids(tracker: &SyncedSessionTracker, tag: &str, window_id: WindowId) -> Vec<TabId> {
	tracker
		.lookup_session(tag)
		.and_then(|session| session.window(window_id))
		.map(SyncedWindow::tab_ids)
		.unwrap_or_default()
}

#[test]
fn get_session_creates_on_first_reference() {
	let mut tracker = SyncedSessionTracker::new();
	assert!(tracker.lookup_session(FOREIGN).is_none());

	tracker.get_session(FOREIGN).session_name = "phone".into();
	assert_eq!(tracker.lookup_session(FOREIGN).map(|s| s.session_name.as_str()), Some("phone"));
	assert_eq!(tracker.lookup_session_windows(FOREIGN).map(|w| w.len()), Some(0));
	assert!(tracker.lookup_session_windows("missing").is_none());
}

#[test]
fn local_session_is_excluded_from_foreign_lookups() {
	let mut tracker = SyncedSessionTracker::new();
	assert!(tracker.lookup_local_session().is_none());

	tracker.set_local_session_tag(LOCAL);
	tracker.get_session(LOCAL);
	tracker.get_session(FOREIGN);

	assert_eq!(tracker.lookup_local_session().map(|s| s.session_tag.as_str()), Some(LOCAL));
	let foreign: Vec<&str> = tracker
		.lookup_all_foreign_sessions(SessionLookup::Raw)
		.into_iter()
		.map(|s| s.session_tag.as_str())
		.collect();
	assert_eq!(foreign, vec![FOREIGN]);
}

#[test]
fn sweep_drops_tabs_not_reclaimed_and_keeps_order() {
	let mut tracker = SyncedSessionTracker::new();
	three_tab_window(&mut tracker, FOREIGN);

	tracker.reset_session_tracking(FOREIGN);
	tracker.put_window_in_session(FOREIGN, WindowId(1));
	tracker.put_tab_in_window(FOREIGN, WindowId(1), TabId(10), 0);
	tracker.put_tab_in_window(FOREIGN, WindowId(1), TabId(12), 1);
	let swept = tracker.cleanup_session(FOREIGN);

	assert_eq!(window_tab_ids(&tracker, FOREIGN, WindowId(1)), vec![TabId(10), TabId(12)]);
	assert_eq!(swept.len(), 1);
	assert_eq!(swept[0].tab_id(), TabId(11));
	assert!(tracker.lookup_session_tab(FOREIGN, TabId(11)).is_none());
}

#[test]
fn reclaiming_everything_leaves_structure_identical() {
	let mut tracker = SyncedSessionTracker::new();
	three_tab_window(&mut tracker, FOREIGN);
	tracker.put_window_in_session(FOREIGN, WindowId(2));
	tracker.put_tab_in_window(FOREIGN, WindowId(2), TabId(20), 0);
	let before = tracker.lookup_session(FOREIGN).cloned();

	tracker.reset_session_tracking(FOREIGN);
	for window in [1, 2] {
		tracker.put_window_in_session(FOREIGN, WindowId(window));
	}
	for (index, raw) in [10, 11, 12].into_iter().enumerate() {
		tracker.put_tab_in_window(FOREIGN, WindowId(1), TabId(raw), index);
	}
	tracker.put_tab_in_window(FOREIGN, WindowId(2), TabId(20), 0);
	let swept = tracker.cleanup_session(FOREIGN);

	assert!(swept.is_empty());
	assert_eq!(tracker.lookup_session(FOREIGN).cloned(), before);
}

#[test]
fn unclaimed_window_is_removed_with_its_tabs() {
	let mut tracker = SyncedSessionTracker::new();
	three_tab_window(&mut tracker, FOREIGN);
	tracker.put_window_in_session(FOREIGN, WindowId(2));
	tracker.put_tab_in_window(FOREIGN, WindowId(2), TabId(20), 0);

	tracker.reset_session_tracking(FOREIGN);
	tracker.put_window_in_session(FOREIGN, WindowId(2));
	tracker.put_tab_in_window(FOREIGN, WindowId(2), TabId(20), 0);
	let swept = tracker.cleanup_session(FOREIGN);

	assert_eq!(swept.len(), 3);
	let windows = tracker.lookup_session_windows(FOREIGN).unwrap();
	assert_eq!(windows.len(), 1);
	assert_eq!(windows[0].window_id, WindowId(2));
}

#[test]
fn owned_tab_of_swept_window_moves_to_holding_area() {
	let mut tracker = SyncedSessionTracker::new();
	three_tab_window(&mut tracker, FOREIGN);

	tracker.reset_session_tracking(FOREIGN);
	tracker.get_tab(FOREIGN, TabId(11), TabNodeId(1));
	tracker.cleanup_session(FOREIGN);

	assert!(tracker.lookup_session_windows(FOREIGN).unwrap().is_empty());
	assert_eq!(tracker.unmapped_tab_ids(FOREIGN), vec![TabId(11)]);
	let held = tracker.lookup_session_tab(FOREIGN, TabId(11)).unwrap();
	assert_eq!(held.window_id, None);
	assert_eq!(held.tab_node_id(), Some(TabNodeId(1)));
}

#[test]
fn tab_moves_between_windows() {
	let mut tracker = SyncedSessionTracker::new();
	three_tab_window(&mut tracker, FOREIGN);

	tracker.put_tab_in_window(FOREIGN, WindowId(2), TabId(11), 0);

	assert_eq!(window_tab_ids(&tracker, FOREIGN, WindowId(1)), vec![TabId(10), TabId(12)]);
	assert_eq!(window_tab_ids(&tracker, FOREIGN, WindowId(2)), vec![TabId(11)]);
	assert_eq!(tracker.lookup_session_tab(FOREIGN, TabId(11)).unwrap().window_id, Some(WindowId(2)));
}

#[test]
fn new_tabs_start_unmapped_until_placed() {
	let mut tracker = SyncedSessionTracker::new();
	tracker.get_tab(FOREIGN, TabId(5), TabNodeId(3)).navigations.push(navigation("https://a.example/"));
	assert_eq!(tracker.unmapped_tab_ids(FOREIGN), vec![TabId(5)]);

	tracker.put_tab_in_window(FOREIGN, WindowId(9), TabId(5), 0);
	assert!(tracker.unmapped_tab_ids(FOREIGN).is_empty());
	let placed = tracker.lookup_session_tab(FOREIGN, TabId(5)).unwrap();
	assert_eq!(placed.navigations.len(), 1);
	assert_eq!(placed.window_id, Some(WindowId(9)));
}

#[test]
fn get_tab_is_get_or_create() {
	let mut tracker = SyncedSessionTracker::new();
	tracker.get_tab(FOREIGN, TabId(5), TabNodeId(3)).pinned = true;
	assert!(tracker.get_tab(FOREIGN, TabId(5), TabNodeId(3)).pinned);
	assert_eq!(tracker.unmapped_tab_ids(FOREIGN).len(), 1);
}

#[test]
fn get_tab_rebinds_tab_id_of_known_node() {
	let mut tracker = SyncedSessionTracker::new();
	three_tab_window(&mut tracker, FOREIGN);

	let tab = tracker.get_tab(FOREIGN, TabId(99), TabNodeId(1));
	assert_eq!(tab.tab_id(), TabId(99));
	assert_eq!(tab.tab_node_id(), Some(TabNodeId(1)));
	assert_eq!(window_tab_ids(&tracker, FOREIGN, WindowId(1)), vec![TabId(10), TabId(99), TabId(12)]);
	assert!(tracker.lookup_session_tab(FOREIGN, TabId(11)).is_none());
}

#[test]
fn tab_id_moves_to_new_node_and_evicts_old_holder() {
	let mut tracker = SyncedSessionTracker::new();
	three_tab_window(&mut tracker, FOREIGN);
	tracker.get_tab(FOREIGN, TabId(11), TabNodeId(1)).pinned = true;

	let tab = tracker.get_tab(FOREIGN, TabId(11), TabNodeId(8));
	assert_eq!(tab.tab_node_id(), Some(TabNodeId(8)));
	assert!(!tab.pinned);
	assert_eq!(window_tab_ids(&tracker, FOREIGN, WindowId(1)), vec![TabId(10), TabId(11), TabId(12)]);
	assert!(tracker.lookup_tab_node_ids(FOREIGN).contains(&TabNodeId(1)));

	// The evicted node comes back under a new id with its own entity.
	let tab = tracker.get_tab(FOREIGN, TabId(20), TabNodeId(1));
	assert_eq!(tab.tab_node_id(), Some(TabNodeId(1)));
	assert_eq!(tracker.unmapped_tab_ids(FOREIGN), vec![TabId(20)]);
}

#[test]
fn tab_id_moves_onto_existing_tab_of_node() {
	let mut tracker = SyncedSessionTracker::new();
	three_tab_window(&mut tracker, FOREIGN);

	let tab = tracker.get_tab(FOREIGN, TabId(10), TabNodeId(2));
	assert_eq!(tab.tab_node_id(), Some(TabNodeId(2)));
	assert_eq!(window_tab_ids(&tracker, FOREIGN, WindowId(1)), vec![TabId(11), TabId(10)]);
}

#[test]
fn placed_placeholder_adopts_node_and_replaces_stale_holder() {
	let mut tracker = SyncedSessionTracker::new();
	tracker.get_tab(FOREIGN, TabId(1), TabNodeId(4));
	tracker.put_tab_in_window(FOREIGN, WindowId(1), TabId(2), 0);

	tracker.get_tab(FOREIGN, TabId(2), TabNodeId(4));

	assert!(tracker.lookup_session_tab(FOREIGN, TabId(1)).is_none());
	let tab = tracker.lookup_session_tab(FOREIGN, TabId(2)).unwrap();
	assert_eq!(tab.tab_node_id(), Some(TabNodeId(4)));
	assert_eq!(window_tab_ids(&tracker, FOREIGN, WindowId(1)), vec![TabId(2)]);
}

#[test]
fn presentable_filter_requires_a_navigation() {
	let mut tracker = SyncedSessionTracker::new();
	tracker.put_window_in_session(FOREIGN, WindowId(1));
	tracker.get_tab(FOREIGN, TabId(1), TabNodeId(0));
	tracker.put_tab_in_window(FOREIGN, WindowId(1), TabId(1), 0);

	assert_eq!(tracker.lookup_all_foreign_sessions(SessionLookup::Raw).len(), 1);
	assert!(tracker.lookup_all_foreign_sessions(SessionLookup::Presentable).is_empty());

	tracker
		.get_tab(FOREIGN, TabId(1), TabNodeId(0))
		.navigations
		.push(navigation("https://example.com/"));
	let presentable = tracker.lookup_all_foreign_sessions(SessionLookup::Presentable);
	assert_eq!(presentable.len(), 1);
	assert_eq!(presentable[0].session_tag, FOREIGN);
}

#[test]
fn local_session_is_not_foreign() {
	let mut tracker = SyncedSessionTracker::new();
	tracker.set_local_session_tag(LOCAL);
	tracker.get_session(LOCAL);
	tracker.get_session(FOREIGN);

	let foreign = tracker.lookup_all_foreign_sessions(SessionLookup::Raw);
	assert_eq!(foreign.len(), 1);
	assert_eq!(foreign[0].session_tag, FOREIGN);
}

#[test]
fn foreign_node_ids_outlive_sweeps_until_deleted() {
	let mut tracker = SyncedSessionTracker::new();
	three_tab_window(&mut tracker, FOREIGN);

	tracker.reset_session_tracking(FOREIGN);
	tracker.cleanup_session(FOREIGN);
	assert_eq!(tracker.lookup_tab_node_ids(FOREIGN).len(), 3);

	tracker.delete_foreign_tab(FOREIGN, TabNodeId(1));
	let remaining: Vec<_> = tracker.lookup_tab_node_ids(FOREIGN).into_iter().collect();
	assert_eq!(remaining, vec![TabNodeId(0), TabNodeId(2)]);
}

#[test]
fn local_sweep_forgets_node_ids() {
	let mut tracker = SyncedSessionTracker::new();
	tracker.set_local_session_tag(LOCAL);
	three_tab_window(&mut tracker, LOCAL);

	tracker.reset_session_tracking(LOCAL);
	tracker.put_window_in_session(LOCAL, WindowId(1));
	tracker.put_tab_in_window(LOCAL, WindowId(1), TabId(10), 0);
	tracker.cleanup_session(LOCAL);

	let nodes: Vec<_> = tracker.lookup_tab_node_ids(LOCAL).into_iter().collect();
	assert_eq!(nodes, vec![TabNodeId(0)]);
}

#[test]
fn delete_session_reports_existence_and_drops_held_tabs() {
	let mut tracker = SyncedSessionTracker::new();
	tracker.get_tab(FOREIGN, TabId(1), TabNodeId(0));

	assert!(tracker.delete_session(FOREIGN));
	assert!(!tracker.delete_session(FOREIGN));
	assert!(tracker.unmapped_tab_ids(FOREIGN).is_empty());
	assert!(tracker.lookup_tab_node_ids(FOREIGN).is_empty());
}

#[test]
fn modified_time_is_max_merged() {
	let mut tracker = SyncedSessionTracker::new();
	tracker.put_window_in_session(FOREIGN, WindowId(1)).timestamp_ms = 40;
	tracker.update_session_modified_time(FOREIGN, 10);
	assert_eq!(tracker.lookup_session(FOREIGN).unwrap().modified_time_ms, 40);
	tracker.update_session_modified_time(FOREIGN, 90);
	assert_eq!(tracker.lookup_session(FOREIGN).unwrap().modified_time_ms, 90);
}

#[test]
fn clear_releases_everything() {
	let mut tracker = SyncedSessionTracker::new();
	tracker.set_local_session_tag(LOCAL);
	three_tab_window(&mut tracker, LOCAL);
	tracker.get_tab(FOREIGN, TabId(1), TabNodeId(0));

	tracker.clear();
	assert!(tracker.local_session_tag().is_none());
	assert!(tracker.lookup_session(LOCAL).is_none());
	assert!(tracker.unmapped_tab_ids(FOREIGN).is_empty());
}

#[test]
fn header_lists_windows_in_pass_order() {
	let mut tracker = SyncedSessionTracker::new();
	let header_windows = |tracker: &SyncedSessionTracker| -> Vec<Option<i32>> {
		tracker
			.lookup_session(FOREIGN)
			.map(|session| session.to_header().windows.into_iter().map(|w| w.window_id).collect())
			.unwrap_or_default()
	};

	tracker.reset_session_tracking(FOREIGN);
	tracker.put_window_in_session(FOREIGN, WindowId(5));
	tracker.put_window_in_session(FOREIGN, WindowId(2));
	tracker.put_window_in_session(FOREIGN, WindowId(5));
	tracker.cleanup_session(FOREIGN);
	assert_eq!(header_windows(&tracker), vec![Some(5), Some(2)]);

	tracker.reset_session_tracking(FOREIGN);
	tracker.put_window_in_session(FOREIGN, WindowId(2));
	tracker.put_window_in_session(FOREIGN, WindowId(5));
	tracker.cleanup_session(FOREIGN);
	assert_eq!(header_windows(&tracker), vec![Some(2), Some(5)]);
	let listed: Vec<WindowId> = tracker
		.lookup_session_windows(FOREIGN)
		.unwrap_or_default()
		.into_iter()
		.map(|window| window.window_id)
		.collect();
	assert_eq!(listed, vec![WindowId(2), WindowId(5)]);
}
