use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::error::ErrorKind;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "solarbridge")]
#[command(about = "FusionSolar to Home Assistant bridge - keeps a portal session alive and publishes readings")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = ArgAction::Count)]
	pub verbose: u8,

	#[command(flatten)]
	pub portal: PortalArgs,

	/// Defaults to `run`
	#[command(subcommand)]
	pub command: Option<Commands>,
}

/// Portal account, station, and browser settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct PortalArgs {
	/// Persisted session file (JSON array of cookies)
	#[arg(long, global = true, env = "FUSIONSOLAR_COOKIE_FILE", default_value = "cookies.json", value_name = "FILE")]
	pub cookie_file: PathBuf,

	/// Station identifier, e.g. NE=123456789
	#[arg(long, global = true, env = "STATION_DN", default_value = "NE=XXXXXXXXXXXX")]
	pub station_dn: String,

	/// Portal account name
	#[arg(long, global = true, env = "FUSIONSOLAR_USERNAME")]
	pub username: Option<String>,

	/// Portal account password
	#[arg(long, global = true, env = "FUSIONSOLAR_PASSWORD", hide_env_values = true)]
	pub password: Option<String>,

	/// Run the login browser without a window
	#[arg(long, global = true, env = "HEADLESS", default_value_t = true, action = ArgAction::Set, value_parser = BoolishValueParser::new(), value_name = "BOOL")]
	pub headless: bool,

	/// Interactive portal origin (login page and Referer)
	#[arg(long, global = true, env = "FUSIONSOLAR_PORTAL_URL", default_value = solarbridge::portal::DEFAULT_PORTAL_URL, value_parser = parse_origin)]
	pub portal_url: String,

	/// Business API origin
	#[arg(long, global = true, env = "FUSIONSOLAR_API_URL", default_value = solarbridge::portal::DEFAULT_API_URL, value_parser = parse_origin)]
	pub api_url: String,

	/// Chromium executable; discovered on PATH when omitted
	#[arg(long = "chrome", global = true, env = "CHROME_PATH", value_name = "PATH")]
	pub chrome: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Poll the station on an interval and publish every snapshot
	Run(RunArgs),

	/// Fetch one snapshot and print it
	Fetch {
		/// Print the raw energy-flow payload instead of the metric summary
		#[arg(long)]
		json: bool,
	},

	/// Force an interactive login and persist the new session
	Login,

	/// Delete the persisted session file
	Logout,

	/// Summarise the persisted session (names, domains, expiry; never values)
	Show,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
	/// Minutes between polls
	#[arg(long, env = "POLL_INTERVAL_MINUTES", default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
	pub interval_minutes: u64,

	/// MQTT broker host; MQTT publishing is disabled when unset
	#[arg(long, env = "MQTT_HOST")]
	pub mqtt_host: Option<String>,

	#[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
	pub mqtt_port: u16,

	#[arg(long, env = "MQTT_USERNAME")]
	pub mqtt_username: Option<String>,

	#[arg(long, env = "MQTT_PASSWORD", hide_env_values = true)]
	pub mqtt_password: Option<String>,

	/// Log the full energy-flow payload every cycle
	#[arg(long, env = "DEBUG", default_value_t = false, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true", value_parser = BoolishValueParser::new(), value_name = "BOOL")]
	pub dump: bool,
}

impl Cli {
	pub fn command_name(&self) -> &'static str {
		match self.command {
			None | Some(Commands::Run(_)) => "run",
			Some(Commands::Fetch { .. }) => "fetch",
			Some(Commands::Login) => "login",
			Some(Commands::Logout) => "logout",
			Some(Commands::Show) => "show",
		}
	}
}

impl RunArgs {
	/// Run settings from environment variables and defaults alone.
	pub fn from_env() -> Result<Self, clap::Error> {
		match Cli::try_parse_from(["solarbridge", "run"])?.command {
			Some(Commands::Run(args)) => Ok(args),
			_ => Err(Cli::command().error(ErrorKind::MissingSubcommand, "run settings unavailable")),
		}
	}
}

/// Accepts an `http(s)` origin and strips any trailing slash.
fn parse_origin(raw: &str) -> Result<String, String> {
	let url = Url::parse(raw).map_err(|err| format!("invalid URL: {err}"))?;
	if !matches!(url.scheme(), "http" | "https") {
		return Err(format!("unsupported scheme {}", url.scheme()));
	}
	if url.host_str().is_none() {
		return Err("URL has no host".to_string());
	}
	Ok(raw.trim_end_matches('/').to_string())
}
