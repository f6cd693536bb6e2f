use clap::Parser;
use tabsync_cli::cli::{Cli, Commands};
use tabsync_cli::commands::{self, CommandContext};
use tabsync_cli::logging;
use tabsync_cli::output::{ResultBuilder, print_result};
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let ctx = CommandContext {
		format: cli.format,
		config_path: cli.config,
	};
	let name = command_name(&cli.command);

	if let Err(err) = commands::dispatch(cli.command, &ctx).await {
		error!(target = "tabsync", error = %err, "command failed");
		let result = ResultBuilder::<()>::new(name)
			.error(err.code(), err.to_string(), err.details())
			.rejected(err.rejected().iter().cloned())
			.build();
		print_result(&result, ctx.format);
		std::process::exit(1);
	}
}

fn command_name(command: &Commands) -> &'static str {
	match command {
		Commands::Replay { .. } => "replay",
		Commands::Validate { .. } => "validate",
		Commands::Config => "config",
	}
}
