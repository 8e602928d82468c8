use std::{
	collections::HashMap,
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use sphinx_config::{Config, Error};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let table = root
		.as_table_mut()
		.and_then(|root| root.get_mut(section))
		.and_then(Value::as_table_mut)
		.expect("Sample config must include the requested section.");

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render sample config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("sphinx_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> sphinx_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = sphinx_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_validation(payload: String, needle: &str) {
	let err = load_payload(payload).expect_err("Expected validation error.");
	let message = err.to_string();

	assert!(matches!(err, Error::Validation { .. }), "Unexpected error: {err:?}");
	assert!(message.contains(needle), "Unexpected error message: {message}");
}

#[test]
fn sample_config_loads() {
	let cfg = load_payload(SAMPLE_CONFIG_TOML.to_string()).expect("Sample config must load.");

	assert_eq!(cfg.server.host, "search.internal");
	assert_eq!(cfg.server.port, 9312);
	assert_eq!(cfg.server.connect_retries, 2);
	assert_eq!(cfg.query.match_mode, "extended");
	assert_eq!(cfg.query.field_weights.get("title"), Some(&10));
	assert_eq!(cfg.query.max_matches, 500);
}

#[test]
fn empty_file_falls_back_to_defaults() {
	let cfg = load_payload(String::new()).expect("Empty config must load.");

	assert_eq!(cfg.server.host, "localhost");
	assert_eq!(cfg.server.port, sphinx_config::DEFAULT_PORT);
	assert_eq!(cfg.server.protocol, "1.19");
	assert_eq!(cfg.query.weights, vec![1, 100]);
	assert_eq!(cfg.query.limit, 20);
	assert_eq!(cfg.query.max_matches, 1_000);
	assert_eq!(cfg.query.discriminator, "content_type");
}

#[test]
fn default_config_is_valid() {
	sphinx_config::validate(&Config::default()).expect("Default config must be valid.");
}

#[test]
fn modes_are_normalized_before_validation() {
	let cfg = load_payload(sample_with("query", "rank_mode", Value::String(" BM25 ".to_string())))
		.expect("Mixed-case rank mode must load.");

	assert_eq!(cfg.query.rank_mode, "bm25");
}

#[test]
fn missing_file_reports_path() {
	let path = env::temp_dir().join("sphinx_config_missing_file.toml");
	let err = sphinx_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
}

#[test]
fn malformed_file_is_a_parse_error() {
	let err = load_payload("[server\nhost = ".to_string()).expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }));
}

#[test]
fn port_must_be_non_zero() {
	expect_validation(sample_with("server", "port", Value::Integer(0)), "server.port");
}

#[test]
fn host_must_be_non_empty() {
	expect_validation(sample_with("server", "host", Value::String("  ".to_string())), "server.host");
}

#[test]
fn protocol_must_be_known() {
	expect_validation(
		sample_with("server", "protocol", Value::String("2.0".to_string())),
		"server.protocol",
	);
}

#[test]
fn match_mode_must_be_known() {
	expect_validation(
		sample_with("query", "match_mode", Value::String("fuzzy".to_string())),
		"query.match_mode",
	);
}

#[test]
fn limit_cannot_exceed_max_matches() {
	expect_validation(sample_with("query", "limit", Value::Integer(501)), "query.limit");
}

#[test]
fn max_matches_must_be_positive() {
	expect_validation(sample_with("query", "max_matches", Value::Integer(0)), "query.max_matches");
}

#[test]
fn legacy_protocol_rejects_field_weights() {
	expect_validation(
		sample_with("server", "protocol", Value::String("1.7".to_string())),
		"query.field_weights requires server.protocol 1.19.",
	);
}

#[test]
fn env_overrides_server_and_retries() {
	let vars = HashMap::from([
		("SPHINX_SERVER", "10.0.0.5"),
		("SPHINX_PORT", "9306"),
		("SPHINX_RETRIES", "4"),
		("SPHINX_RETRIES_DELAY", "20"),
		("SPHINX_CONNECT_RETRIES", "5"),
	]);
	let mut cfg = Config::default();

	sphinx_config::apply_env(&mut cfg, |name| vars.get(name).map(|value| value.to_string()))
		.expect("Env overrides must apply.");

	assert_eq!(cfg.server.host, "10.0.0.5");
	assert_eq!(cfg.server.port, 9306);
	assert_eq!(cfg.server.connect_retries, 5);
	assert_eq!(cfg.query.agent_retries, 4);
	assert_eq!(cfg.query.agent_retry_delay_ms, 20);
}

#[test]
fn env_rejects_unparsable_port() {
	let mut cfg = Config::default();
	let err = sphinx_config::apply_env(&mut cfg, |name| {
		(name == "SPHINX_PORT").then(|| "not-a-port".to_string())
	})
	.expect_err("Expected env error.");

	assert!(matches!(err, Error::Env { ref name, .. } if name == "SPHINX_PORT"));
	assert_eq!(cfg.server.port, sphinx_config::DEFAULT_PORT);
}
