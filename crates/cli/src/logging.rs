use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the stderr subscriber. `RUST_LOG` wins over `-v` when set.
pub fn init_logging(verbose: u8) {
	let default = match verbose {
		0 => "warn",
		1 => "info,tabsync=info",
		_ => "debug",
	};
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(true);
	let _ = Registry::default().with(env_filter).with(fmt_layer).try_init();
}
