use std::path::Path;

use tabsync::{RecordError, RecordingChangeSink, SessionsSyncManager, SyncOwner, TabId};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::commands::CommandContext;
use crate::error::Result;
use crate::output::{CommandInputs, RejectedRecord, ReplayData, ResultBuilder, SessionSummary, describe_event, print_result};
use crate::scenario::{Scenario, Step, open_tab};

pub async fn execute(scenario_path: &Path, session_name: Option<String>, ctx: &CommandContext) -> Result<()> {
	let scenario = Scenario::load(scenario_path)?;
	let mut config = ctx.load_config(scenario.config.clone())?;
	if let Some(name) = session_name {
		config.session_name = name;
	}

	let (data, rejected) = replay(scenario, config).await?;
	let result = ResultBuilder::new("replay")
		.inputs(CommandInputs {
			scenario: Some(scenario_path.to_path_buf()),
			config: ctx.config_path.clone(),
			..Default::default()
		})
		.data(data)
		.rejected(rejected.iter().map(RejectedRecord::from))
		.build();
	print_result(&result, ctx.format);
	Ok(())
}

/// Runs the scenario through a sync owner and collects what it produced,
/// along with every remote record the manager refused.
pub async fn replay(scenario: Scenario, config: tabsync::SyncConfig) -> Result<(ReplayData, Vec<RecordError>)> {
	let sink = RecordingChangeSink::new();
	let manager = SessionsSyncManager::new(config, Box::new(sink.clone()))?;
	let local_session_tag = manager.local_session_tag().to_string();

	let (event_tx, mut event_rx) = mpsc::unbounded_channel();
	manager.observers().subscribe(move |event| {
		let _ = event_tx.send(event.clone());
	});

	let (handle, task) = SyncOwner::spawn(manager, scenario.browser);
	let mut rejected = Vec::new();

	let report = handle.merge_data_and_start_syncing(scenario.initial).await?;
	rejected.extend(report.rejected);

	for (index, step) in scenario.steps.into_iter().enumerate() {
		debug!(target = "tabsync.cli", step = index, kind = step.name(), "replaying step");
		match step {
			Step::Remote { changes } => {
				let report = handle.process_remote_changes(changes).await?;
				rejected.extend(report.rejected);
			}
			Step::Navigate { tab_id, url } => {
				handle.update_source(move |browser| {
					if let Some(tab) = browser.tab_mut(tab_id) {
						tab.navigate(&url);
					}
				})?;
				handle.local_tab_modified(TabId(tab_id))?;
			}
			Step::OpenTab { window_id, tab } => {
				handle.update_source(move |browser| open_tab(browser, window_id, tab))?;
				handle.associate_windows()?;
			}
			Step::CloseTab { tab_id } => {
				handle.update_source(move |browser| {
					browser.close_tab(tab_id);
				})?;
				handle.local_tab_modified(TabId(tab_id))?;
			}
			Step::Associate => handle.associate_windows()?,
			Step::DeleteForeignSession { session_tag } => {
				handle.delete_foreign_session(session_tag).await?;
			}
			Step::GarbageCollect { now_ms } => {
				let collected = handle.garbage_collect(now_ms).await?;
				debug!(target = "tabsync.cli", collected = collected.len(), "garbage collected");
			}
		}
	}

	handle.flush().await?;
	let foreign_sessions: Vec<SessionSummary> = handle.foreign_sessions().await?.iter().map(SessionSummary::from).collect();
	let local_session = handle.local_session().await?.as_ref().map(SessionSummary::from);
	let emitted = sink.take();
	handle.shutdown()?;
	task.await?;

	let mut events = Vec::new();
	while let Ok(event) = event_rx.try_recv() {
		events.push(describe_event(&event));
	}

	info!(
		target = "tabsync.cli",
		emitted = emitted.len(),
		foreign = foreign_sessions.len(),
		rejected = rejected.len(),
		"replay finished"
	);
	let data = ReplayData {
		local_session_tag,
		local_session,
		foreign_sessions,
		emitted,
		events,
	};
	Ok((data, rejected))
}
