use std::io::{self, Write};

use tabsync::SyncConfig;

use crate::output::data::{ReplayData, SessionSummary, ValidateData};

/// Plain-text rendering of a command payload for `--format text`.
pub trait TextReport {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()>;
}

impl TextReport for () {
	fn write_text(&self, _out: &mut dyn Write) -> io::Result<()> {
		Ok(())
	}
}

impl TextReport for ReplayData {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		match &self.local_session {
			Some(session) => write_session(out, "local", session)?,
			None => writeln!(out, "local {} (not syncing)", self.local_session_tag)?,
		}
		for session in &self.foreign_sessions {
			write_session(out, "foreign", session)?;
		}
		writeln!(out, "{} records emitted", self.emitted.len())?;
		for event in &self.events {
			writeln!(out, "event: {event}")?;
		}
		Ok(())
	}
}

fn write_session(out: &mut dyn Write, side: &str, session: &SessionSummary) -> io::Result<()> {
	writeln!(
		out,
		"{side} {} \"{}\" ({:?}, modified {})",
		session.session_tag, session.session_name, session.device_type, session.modified_time_ms
	)?;
	for window in &session.windows {
		writeln!(out, "  window {} ({:?})", window.window_id, window.window_type)?;
		for (index, tab) in window.tabs.iter().enumerate() {
			let marker = if index == window.selected_tab_index { '*' } else { ' ' };
			let node = tab.tab_node_id.map(|node| format!(" node {node}")).unwrap_or_default();
			writeln!(out, "   {marker}[{}{node}] {}", tab.tab_id, tab.url.as_deref().unwrap_or("-"))?;
		}
	}
	Ok(())
}

impl TextReport for ValidateData {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "{} of {} records valid", self.valid, self.total)
	}
}

impl TextReport for SyncConfig {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "localSessionTag = {}", self.local_session_tag.as_deref().unwrap_or("(generated)"))?;
		writeln!(out, "sessionName = {}", self.session_name)?;
		writeln!(out, "deviceType = {:?}", self.device_type)?;
		writeln!(out, "freeNodesHighWatermark = {}", self.free_nodes_high_watermark)?;
		writeln!(out, "freeNodesLowWatermark = {}", self.free_nodes_low_watermark)?;
		writeln!(out, "maxSyncNavigationCount = {}", self.max_sync_navigation_count)?;
		writeln!(out, "staleSessionThresholdDays = {}", self.stale_session_threshold_days)
	}
}
