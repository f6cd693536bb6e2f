use std::path::Path;

use tabsync::validate_change;
use tracing::debug;

use crate::commands::CommandContext;
use crate::error::{CliError, Result};
use crate::output::{CommandInputs, RejectedRecord, ResultBuilder, ValidateData, print_result};
use crate::scenario::load_batch;

pub fn execute(batch_path: &Path, ctx: &CommandContext) -> Result<()> {
	let batch = load_batch(batch_path)?;
	let total = batch.len();

	let invalid: Vec<RejectedRecord> = batch
		.iter()
		.enumerate()
		.filter_map(|(index, change)| {
			validate_change(change)
				.err()
				.map(|err| RejectedRecord::from(&err).at(index, change.client_tag()))
		})
		.collect();
	debug!(target = "tabsync.cli", total, invalid = invalid.len(), "validated batch");

	if !invalid.is_empty() {
		return Err(CliError::InvalidRecords { total, invalid });
	}

	let result = ResultBuilder::new("validate")
		.inputs(CommandInputs {
			batch: Some(batch_path.to_path_buf()),
			..Default::default()
		})
		.data(ValidateData { total, valid: total })
		.build();
	print_result(&result, ctx.format);
	Ok(())
}
