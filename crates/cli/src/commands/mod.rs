mod config;
mod replay;
mod validate;

use std::path::PathBuf;

use tabsync::SyncConfig;

use crate::cli::Commands;
use crate::error::Result;
use crate::output::OutputFormat;

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
	pub format: OutputFormat,
	pub config_path: Option<PathBuf>,
}

impl CommandContext {
	/// Config file if one was given, else `fallback`, else defaults.
	pub fn load_config(&self, fallback: Option<SyncConfig>) -> Result<SyncConfig> {
		let config = match &self.config_path {
			Some(path) => SyncConfig::load(path)?,
			None => fallback.unwrap_or_default(),
		};
		config.validate()?;
		Ok(config)
	}
}

pub async fn dispatch(command: Commands, ctx: &CommandContext) -> Result<()> {
	match command {
		Commands::Replay { scenario, session_name } => replay::execute(&scenario, session_name, ctx).await,
		Commands::Validate { batch } => validate::execute(&batch, ctx),
		Commands::Config => config::execute(ctx),
	}
}
