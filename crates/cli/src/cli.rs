use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "tabsync")]
#[command(about = "Replay and inspect synced tab session scenarios")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short, long, global = true, value_enum, default_value = "json")]
	pub format: OutputFormat,

	/// Sync configuration file (JSON)
	#[arg(short, long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Replay a scenario file through the sync manager
	Replay {
		/// Scenario file (JSON)
		scenario: PathBuf,

		/// Override the local session name
		#[arg(long)]
		session_name: Option<String>,
	},

	/// Check a batch of change records without applying it
	Validate {
		/// Batch file holding a JSON array of change records
		batch: PathBuf,
	},

	/// Print the effective configuration
	Config,
}
