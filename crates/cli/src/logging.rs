use std::io;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber. `RUST_LOG` overrides the verbosity flag.
pub fn init_logging(verbose: u8) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

	let _ = tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_writer(io::stderr).with_target(true))
		.try_init();
}

fn default_directives(verbose: u8) -> &'static str {
	match verbose {
		0 => "warn,solarbridge=info",
		1 => "info",
		2 => "debug",
		_ => "trace",
	}
}
