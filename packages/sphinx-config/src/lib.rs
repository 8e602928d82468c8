mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, DEFAULT_DISCRIMINATOR, DEFAULT_PORT, QueryDefaults, Server};

use std::{fs, path::Path, str::FromStr};

pub const PROTOCOLS: [&str; 2] = ["1.19", "1.7"];
pub const MATCH_MODES: [&str; 7] =
	["all", "any", "phrase", "boolean", "extended", "fullscan", "extended2"];
pub const RANK_MODES: [&str; 4] = ["proximity_bm25", "bm25", "none", "wordcount"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn from_env() -> Result<Config> {
	let mut cfg = Config::default();

	apply_env(&mut cfg, |name| std::env::var(name).ok())?;
	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn apply_env<F>(cfg: &mut Config, lookup: F) -> Result<()>
where
	F: Fn(&str) -> Option<String>,
{
	if let Some(host) = lookup("SPHINX_SERVER") {
		cfg.server.host = host;
	}
	if let Some(port) = parse_env(&lookup, "SPHINX_PORT")? {
		cfg.server.port = port;
	}
	if let Some(protocol) = lookup("SPHINX_PROTOCOL") {
		cfg.server.protocol = protocol;
	}
	if let Some(retries) = parse_env(&lookup, "SPHINX_CONNECT_RETRIES")? {
		cfg.server.connect_retries = retries;
	}
	if let Some(delay) = parse_env(&lookup, "SPHINX_CONNECT_RETRY_DELAY_MS")? {
		cfg.server.connect_retry_delay_ms = delay;
	}
	if let Some(retries) = parse_env(&lookup, "SPHINX_RETRIES")? {
		cfg.query.agent_retries = retries;
	}
	if let Some(delay) = parse_env(&lookup, "SPHINX_RETRIES_DELAY")? {
		cfg.query.agent_retry_delay_ms = delay;
	}

	Ok(())
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.server.host.is_empty() {
		return Err(Error::Validation { message: "server.host must be non-empty.".to_string() });
	}
	if cfg.server.port == 0 {
		return Err(Error::Validation {
			message: "server.port must be greater than zero.".to_string(),
		});
	}
	if !PROTOCOLS.contains(&cfg.server.protocol.as_str()) {
		return Err(Error::Validation {
			message: "server.protocol must be one of 1.19 or 1.7.".to_string(),
		});
	}
	if !MATCH_MODES.contains(&cfg.query.match_mode.as_str()) {
		return Err(Error::Validation {
			message: format!("query.match_mode must be one of {}.", MATCH_MODES.join(", ")),
		});
	}
	if !RANK_MODES.contains(&cfg.query.rank_mode.as_str()) {
		return Err(Error::Validation {
			message: format!("query.rank_mode must be one of {}.", RANK_MODES.join(", ")),
		});
	}
	if cfg.query.weights.is_empty() && cfg.query.field_weights.is_empty() {
		return Err(Error::Validation {
			message: "query.weights must be non-empty when query.field_weights is empty."
				.to_string(),
		});
	}
	if cfg.query.field_weights.keys().any(|field| field.is_empty()) {
		return Err(Error::Validation {
			message: "query.field_weights keys must be non-empty.".to_string(),
		});
	}
	if cfg.query.max_matches == 0 {
		return Err(Error::Validation {
			message: "query.max_matches must be greater than zero.".to_string(),
		});
	}
	if cfg.query.limit > cfg.query.max_matches {
		return Err(Error::Validation {
			message: "query.limit must be less than or equal to query.max_matches.".to_string(),
		});
	}
	if cfg.query.discriminator.is_empty() {
		return Err(Error::Validation {
			message: "query.discriminator must be non-empty.".to_string(),
		});
	}
	if cfg.server.protocol == "1.7" {
		if !cfg.query.field_weights.is_empty() {
			return Err(Error::Validation {
				message: "query.field_weights requires server.protocol 1.19.".to_string(),
			});
		}
		if !matches!(cfg.query.match_mode.as_str(), "all" | "any" | "phrase" | "boolean" | "extended")
		{
			return Err(Error::Validation {
				message: "query.match_mode is not available with server.protocol 1.7.".to_string(),
			});
		}
		if cfg.query.rank_mode != "proximity_bm25" {
			return Err(Error::Validation {
				message: "query.rank_mode must be proximity_bm25 with server.protocol 1.7."
					.to_string(),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.server.host = cfg.server.host.trim().to_string();
	cfg.server.protocol = cfg.server.protocol.trim().to_string();
	cfg.query.match_mode = cfg.query.match_mode.trim().to_ascii_lowercase();
	cfg.query.rank_mode = cfg.query.rank_mode.trim().to_ascii_lowercase();
	cfg.query.discriminator = cfg.query.discriminator.trim().to_string();
}

fn parse_env<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
	F: Fn(&str) -> Option<String>,
	T: FromStr,
{
	let Some(value) = lookup(name) else {
		return Ok(None);
	};

	let parsed = value.trim().parse::<T>();

	match parsed {
		Ok(parsed) => Ok(Some(parsed)),
		Err(_) => Err(Error::Env { name: name.to_string(), value }),
	}
}
