use std::collections::BTreeMap;

use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 3312;
pub const DEFAULT_DISCRIMINATOR: &str = "content_type";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	pub server: Server,
	pub query: QueryDefaults,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Server {
	pub host: String,
	pub port: u16,
	pub connect_retries: u32,
	pub connect_retry_delay_ms: u64,
	pub protocol: String,
}
impl Default for Server {
	fn default() -> Self {
		Self {
			host: "localhost".to_string(),
			port: DEFAULT_PORT,
			connect_retries: 3,
			connect_retry_delay_ms: 1_000,
			protocol: "1.19".to_string(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QueryDefaults {
	pub match_mode: String,
	pub rank_mode: String,
	pub weights: Vec<u32>,
	/// Named field weights. When non-empty they replace the positional `weights`.
	pub field_weights: BTreeMap<String, u32>,
	pub limit: u32,
	pub max_matches: u32,
	pub agent_retries: u32,
	pub agent_retry_delay_ms: u32,
	pub discriminator: String,
}
impl Default for QueryDefaults {
	fn default() -> Self {
		Self {
			match_mode: "all".to_string(),
			rank_mode: "proximity_bm25".to_string(),
			weights: vec![1, 100],
			field_weights: BTreeMap::new(),
			limit: 20,
			max_matches: 1_000,
			agent_retries: 0,
			agent_retry_delay_ms: 5,
			discriminator: DEFAULT_DISCRIMINATOR.to_string(),
		}
	}
}
