use std::io::{self, Write};
use std::time::Instant;

use serde::Serialize;

use crate::output::format::OutputFormat;
use crate::output::model::{CommandError, CommandInputs, CommandResult, ErrorCode, RejectedRecord, SCHEMA_VERSION};
use crate::output::text::TextReport;

/// Assembles a [`CommandResult`] and times the command while doing so.
pub struct ResultBuilder<T> {
	command: String,
	inputs: Option<CommandInputs>,
	data: Option<T>,
	error: Option<CommandError>,
	rejected: Vec<RejectedRecord>,
	start_time: Instant,
}

impl<T> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			inputs: None,
			data: None,
			error: None,
			rejected: Vec::new(),
			start_time: Instant::now(),
		}
	}

	pub fn inputs(mut self, inputs: CommandInputs) -> Self {
		self.inputs = Some(inputs);
		self
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, code: ErrorCode, message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
		self.error = Some(CommandError {
			code,
			message: message.into(),
			details,
		});
		self
	}

	/// Records refused by the sync manager. On their own they do not fail
	/// the command.
	pub fn rejected(mut self, records: impl IntoIterator<Item = RejectedRecord>) -> Self {
		self.rejected.extend(records);
		self
	}

	pub fn build(self) -> CommandResult<T> {
		CommandResult {
			schema_version: SCHEMA_VERSION,
			ok: self.error.is_none() && self.data.is_some(),
			command: self.command,
			inputs: self.inputs,
			data: self.data,
			error: self.error,
			duration_ms: u64::try_from(self.start_time.elapsed().as_millis()).unwrap_or(u64::MAX),
			rejected: self.rejected,
		}
	}
}

/// Writes a command result to stdout in the requested format.
pub fn print_result<T: Serialize + TextReport>(result: &CommandResult<T>, format: OutputFormat) {
	let rendered = match format {
		OutputFormat::Json => serde_json::to_string_pretty(result).map(|json| json + "\n").map_err(io::Error::other),
		OutputFormat::Ndjson => serde_json::to_string(result).map(|json| json + "\n").map_err(io::Error::other),
		OutputFormat::Text => render_text(result),
	};
	if let Ok(rendered) = rendered {
		let _ = io::stdout().lock().write_all(rendered.as_bytes());
	}
}

pub(crate) fn render_text<T: TextReport>(result: &CommandResult<T>) -> io::Result<String> {
	let mut out = Vec::new();
	if let Some(data) = &result.data {
		data.write_text(&mut out)?;
	}
	if let Some(error) = &result.error {
		writeln!(out, "error [{}]: {}", error.code, error.message)?;
	}
	for record in &result.rejected {
		match (record.index, &record.client_tag) {
			(Some(index), Some(tag)) => writeln!(out, "rejected #{index} {tag}: {}", record.message)?,
			_ => writeln!(out, "rejected: {}", record.message)?,
		}
	}
	writeln!(out, "{} finished in {}ms", result.command, result.duration_ms)?;
	Ok(String::from_utf8_lossy(&out).into_owned())
}
