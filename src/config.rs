use std::{net::IpAddr, str::FromStr};

use cookie::SameSite;

use crate::{
	password::HashParams,
	session::{SessionConfig, MAX_TTL_SECONDS},
};

#[derive(Debug, thiserror::Error)]
#[error("{name} must be {expected}, got {value:?}")]
pub struct ConfigError {
	pub name: &'static str,
	pub expected: &'static str,
	pub value: String,
}

/// Process configuration, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
	/// Postgres connection string. Without one, an in-memory store is used.
	pub database_url: Option<String>,
	pub host: IpAddr,
	pub port: u16,
	pub session: SessionConfig,
	pub hash: HashParams,
	/// Whether spans are exported over OTLP in addition to stdout.
	pub otlp: bool,
}

impl Config {
	/// Loads `.env` if present, then reads the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		dotenvy::dotenv().ok();

		Self::from_lookup(|name| std::env::var(name).ok())
	}

	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &'static str| lookup(name).filter(|value| !value.is_empty());
		let defaults = HashParams::default();
		let session = SessionConfig::default();

		Ok(Self {
			database_url: var("DATABASE_URL"),
			host: parse(&var, "HOST", "an ip address", "127.0.0.1".parse().ok())?,
			port: parse(&var, "PORT", "a port number", Some(3000))?,
			session: SessionConfig {
				cookie_name: var("SESSION_COOKIE_NAME").unwrap_or(session.cookie_name),
				ttl_seconds: parse_ttl(&var, session.ttl_seconds)?,
				cleanup_seconds: parse(
					&var,
					"SESSION_CLEANUP_SECONDS",
					"a positive number of seconds",
					Some(session.cleanup_seconds),
				)?,
				secure: parse(&var, "SESSION_COOKIE_SECURE", "true or false", Some(session.secure))?,
				same_site: match var("SESSION_COOKIE_SAME_SITE") {
					None => session.same_site,
					Some(value) => parse_same_site(&value).ok_or(ConfigError {
						name: "SESSION_COOKIE_SAME_SITE",
						expected: "one of strict, lax, none",
						value,
					})?,
				},
			},
			hash: HashParams {
				memory_cost: parse(&var, "ARGON2_MEMORY_COST", "a number", Some(defaults.memory_cost))?,
				time_cost: parse(&var, "ARGON2_TIME_COST", "a number", Some(defaults.time_cost))?,
				parallelism: parse(&var, "ARGON2_PARALLELISM", "a number", Some(defaults.parallelism))?,
				output_len: parse(&var, "ARGON2_OUTPUT_LEN", "a number", Some(defaults.output_len))?,
			},
			otlp: var("OTEL_EXPORTER_OTLP_ENDPOINT").is_some(),
		})
	}
}

fn parse<T, F>(
	var: &F,
	name: &'static str,
	expected: &'static str,
	default: Option<T>,
) -> Result<T, ConfigError>
where
	T: FromStr,
	F: Fn(&'static str) -> Option<String>,
{
	match var(name) {
		Some(value) => value.trim().parse().map_err(|_| ConfigError {
			name,
			expected,
			value,
		}),
		None => default.ok_or(ConfigError {
			name,
			expected,
			value: String::new(),
		}),
	}
}

fn parse_ttl<F>(var: &F, default: i64) -> Result<i64, ConfigError>
where
	F: Fn(&'static str) -> Option<String>,
{
	const NAME: &str = "SESSION_TTL_SECONDS";
	const EXPECTED: &str = "a positive number of seconds, at most ten years";

	let ttl = parse(var, NAME, EXPECTED, Some(default))?;

	if (1..=MAX_TTL_SECONDS).contains(&ttl) {
		Ok(ttl)
	} else {
		Err(ConfigError {
			name: NAME,
			expected: EXPECTED,
			value: ttl.to_string(),
		})
	}
}

fn parse_same_site(value: &str) -> Option<SameSite> {
	match value.to_ascii_lowercase().as_str() {
		"strict" => Some(SameSite::Strict),
		"lax" => Some(SameSite::Lax),
		"none" => Some(SameSite::None),
		_ => None,
	}
}

#[cfg(test)]
mod test {
	use std::collections::HashMap;

	use super::*;

	fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
		let vars = vars
			.iter()
			.map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
			.collect::<HashMap<_, _>>();

		Config::from_lookup(|name| vars.get(name).cloned())
	}

	#[test]
	fn test_defaults() {
		let config = config(&[]).unwrap();

		assert_eq!(config.database_url, None);
		assert_eq!(config.port, 3000);
		assert_eq!(config.host.to_string(), "127.0.0.1");
		assert_eq!(config.session.cookie_name, "session");
		assert_eq!(config.session.ttl_seconds, 60 * 60 * 24 * 30);
		assert_eq!(config.session.same_site, SameSite::Lax);
		assert!(config.session.secure);
		assert_eq!(config.hash, HashParams::default());
		assert!(!config.otlp);
	}

	#[test]
	fn test_overrides() {
		let config = config(&[
			("DATABASE_URL", "postgres://localhost/feed"),
			("PORT", "8080"),
			("SESSION_TTL_SECONDS", "60"),
			("SESSION_COOKIE_SAME_SITE", "Strict"),
			("SESSION_COOKIE_SECURE", "false"),
			("ARGON2_MEMORY_COST", "65536"),
			("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"),
		])
		.unwrap();

		assert_eq!(
			config.database_url.as_deref(),
			Some("postgres://localhost/feed")
		);
		assert_eq!(config.port, 8080);
		assert_eq!(config.session.ttl_seconds, 60);
		assert_eq!(config.session.same_site, SameSite::Strict);
		assert!(!config.session.secure);
		assert_eq!(config.hash.memory_cost, 65536);
		assert!(config.otlp);
	}

	#[test]
	fn test_session_ttl_bounds() {
		for ttl in ["0", "-5", "100000000000000000", "315360001"] {
			let error = config(&[("SESSION_TTL_SECONDS", ttl)]).unwrap_err();

			assert_eq!(error.name, "SESSION_TTL_SECONDS");
		}

		let config = config(&[("SESSION_TTL_SECONDS", "315360000")]).unwrap();

		assert_eq!(config.session.ttl_seconds, MAX_TTL_SECONDS);
	}

	#[test]
	fn test_empty_values_use_defaults() {
		let config = config(&[("DATABASE_URL", ""), ("PORT", "")]).unwrap();

		assert_eq!(config.database_url, None);
		assert_eq!(config.port, 3000);
	}

	#[test]
	fn test_invalid_values() {
		let error = config(&[("PORT", "eighty")]).unwrap_err();

		assert_eq!(error.name, "PORT");
		assert_eq!(error.value, "eighty");

		let error = config(&[("SESSION_COOKIE_SAME_SITE", "sometimes")]).unwrap_err();

		assert_eq!(error.name, "SESSION_COOKIE_SAME_SITE");
	}
}
