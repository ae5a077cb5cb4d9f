use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use recsync_config::{Config, Error, InteractionSource};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let table = root
		.as_table_mut()
		.expect("Template config must be a table.")
		.get_mut(section)
		.and_then(Value::as_table_mut)
		.expect("Template config must include the requested section.");

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn sample_toml_without(section: &str, key: &str) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let table = root
		.as_table_mut()
		.expect("Template config must be a table.")
		.get_mut(section)
		.and_then(Value::as_table_mut)
		.expect("Template config must include the requested section.");

	table.remove(key);

	toml::to_string(&root).expect("Failed to render template config.")
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

	path.push(format!("recsync_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String, vars: &[(&str, &str)]) -> recsync_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = recsync_config::load_with_env(&path, |name| {
		vars.iter().find(|(key, _)| *key == name).map(|(_, value)| value.to_string())
	});

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn base_config() -> Config {
	load_payload(SAMPLE_CONFIG_TEMPLATE_TOML.to_string(), &[])
		.expect("Template config must be valid.")
}

#[test]
fn template_config_loads_and_trims_store_url() {
	let cfg = base_config();

	assert_eq!(cfg.store.url, "https://store.example.test");
	assert_eq!(cfg.store.rest_path, "/rest/v1");
	assert_eq!(cfg.train.source, InteractionSource::Store);
	assert_eq!(cfg.train.batch_size, 500);
}

#[test]
fn bearer_token_defaults_to_api_key() {
	let cfg = base_config();

	assert!(cfg.store.bearer_token.is_none());
	assert_eq!(cfg.store.bearer_token(), "service-key");
}

#[test]
fn missing_store_url_is_a_configuration_error() {
	let payload = sample_toml_without("store", "url");
	let err = load_payload(payload, &[]).expect_err("Expected missing store.url error.");

	assert!(
		matches!(err, Error::MissingSetting { name: "store.url", env: "STORE_URL" }),
		"Unexpected error: {err}"
	);
}

#[test]
fn missing_api_key_is_a_configuration_error() {
	let payload = sample_toml_with("store", "api_key", Value::String("   ".to_string()));
	let err = load_payload(payload, &[]).expect_err("Expected missing store.api_key error.");

	assert!(err.to_string().contains("store.api_key"), "Unexpected error: {err}");
	assert!(err.to_string().contains("STORE_API_KEY"), "Unexpected error: {err}");
}

#[test]
fn environment_overrides_store_credentials() {
	let payload = sample_toml_without("store", "url");
	let cfg = load_payload(
		payload,
		&[
			("STORE_URL", "http://127.0.0.1:54321/"),
			("STORE_API_KEY", "from-env"),
			("STORE_BEARER_TOKEN", "bearer-env"),
		],
	)
	.expect("Environment must satisfy the missing settings.");

	assert_eq!(cfg.store.url, "http://127.0.0.1:54321");
	assert_eq!(cfg.store.api_key, "from-env");
	assert_eq!(cfg.store.bearer_token(), "bearer-env");
}

#[test]
fn blank_environment_values_do_not_override() {
	let cfg = load_payload(SAMPLE_CONFIG_TEMPLATE_TOML.to_string(), &[("STORE_API_KEY", "  ")])
		.expect("Template config must be valid.");

	assert_eq!(cfg.store.api_key, "service-key");
}

#[test]
fn prior_weight_must_be_positive() {
	let payload = sample_toml_with("train", "prior_weight", Value::Float(0.0));
	let err = load_payload(payload, &[]).expect_err("Expected prior_weight validation error.");

	assert!(
		err.to_string()
			.contains("train.prior_weight must be a finite number greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn batch_size_must_not_be_below_floor() {
	let mut cfg = base_config();

	cfg.ingest.batch_size = 4;
	cfg.ingest.min_batch_size = 8;

	let err = recsync_config::validate(&cfg).expect_err("Expected batch size validation error.");

	assert!(
		err.to_string().contains("ingest.batch_size must be at least ingest.min_batch_size."),
		"Unexpected error: {err}"
	);
}

#[test]
fn top_n_must_be_positive() {
	let mut cfg = base_config();

	cfg.train.top_n = 0;

	let err = recsync_config::validate(&cfg).expect_err("Expected top_n validation error.");

	assert!(
		err.to_string().contains("train.top_n must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn omitted_sections_use_documented_defaults() {
	let payload = "\
[store]
url = \"https://store.example.test\"
api_key = \"k\"
"
	.to_string();
	let cfg = load_payload(payload, &[]).expect("Minimal config must be valid.");

	assert_eq!(cfg.train.prior_weight, recsync_config::PRIOR_WEIGHT);
	assert_eq!(cfg.train.prior_mean, recsync_config::PRIOR_MEAN);
	assert_eq!(cfg.train.top_n, recsync_config::TOP_N);
	assert_eq!(cfg.ingest.require_timestamp, recsync_config::REQUIRE_TIMESTAMP);
	assert_eq!(cfg.conflict_keys.interactions, "user_id,item_id");
	assert_eq!(cfg.tables.raw_ratings, "raw_ratings");
	assert_eq!(cfg.conflict_keys.raw_ratings, "user_id,item_id");
	assert_eq!(cfg.store.page_size, recsync_config::DEFAULT_PAGE_SIZE);
}

#[test]
fn unreadable_path_reports_read_error() {
	let path = env::temp_dir().join("recsync_config_test_missing_file.toml");
	let err = recsync_config::load_with_env(&path, |_| None)
		.expect_err("Expected read error for a missing file.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error: {err}");
}
