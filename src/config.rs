use std::{net::IpAddr, str::FromStr};

use tracing::Level;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{name} must be {expected}, got {value:?}")]
	Invalid {
		name: &'static str,
		expected: &'static str,
		value: String,
	},
}

/// Runtime configuration, read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
	/// Without a database, posts are kept in memory and lost on exit.
	pub database_url: Option<String>,
	pub host: IpAddr,
	pub port: u16,
	pub log_level: Level,
	/// Export traces and metrics over OTLP.
	pub otlp: bool,
	/// Seeds a user with this name when running in memory.
	pub demo_user: Option<String>,
}

impl Config {
	pub fn from_env() -> Result<Self, Error> {
		dotenvy::dotenv().ok();

		Self::from_lookup(|name| std::env::var(name).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
		let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

		Ok(Self {
			database_url: var("DATABASE_URL"),
			host: parse(&var, "HOST", "an IP address", IpAddr::from([127, 0, 0, 1]))?,
			port: parse(&var, "PORT", "a port number", 3000)?,
			log_level: parse(&var, "LOG_LEVEL", "a log level", Level::INFO)?,
			otlp: var("OTEL_EXPORTER_OTLP_ENDPOINT").is_some(),
			demo_user: var("DEMO_USER"),
		})
	}
}

fn parse<T: FromStr>(
	var: impl Fn(&str) -> Option<String>,
	name: &'static str,
	expected: &'static str,
	default: T,
) -> Result<T, Error> {
	match var(name) {
		Some(value) => value.parse().map_err(|_| Error::Invalid {
			name,
			expected,
			value,
		}),
		None => Ok(default),
	}
}
