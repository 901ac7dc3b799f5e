//! Command-line plumbing shared by the quill binaries.

use std::path::PathBuf;

use clap::{
	Args,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use tracing_subscriber::EnvFilter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const FALLBACK_LOG_FILTER: &str = "info";

#[derive(Debug, Args)]
pub struct ConfigArgs {
	/// Path to the TOML configuration file.
	#[arg(long = "config", short = 'c', value_name = "FILE")]
	pub path: PathBuf,
}

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Magenta.on_default() | Effects::BOLD)
		.usage(AnsiColor::Magenta.on_default() | Effects::BOLD)
		.literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

/// Installs the global fmt subscriber. An unparseable directive falls back to `info`.
pub fn init_tracing(directive: &str) {
	let (filter, rejected) = match EnvFilter::try_new(directive) {
		Ok(filter) => (filter, None),
		Err(err) => (EnvFilter::new(FALLBACK_LOG_FILTER), Some(err)),
	};

	tracing_subscriber::fmt().with_env_filter(filter).init();

	if let Some(err) = rejected {
		tracing::warn!(error = %err, directive, "Invalid log filter. Falling back to info.");
	}
}
