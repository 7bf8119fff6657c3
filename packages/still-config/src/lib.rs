mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	CHAT_TYPES, Config, Graph, LlmProviderConfig, Pipeline, Postgres, Providers, Service, Storage,
};

use std::{env, fs, net::SocketAddr, path::Path};

pub const ENV_PG_DSN: &str = "STILL_PG_DSN";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_LLM_API_BASE: &str = "STILL_LLM_API_BASE";
pub const ENV_LLM_API_KEY: &str = "STILL_LLM_API_KEY";

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg = parse(&raw, path)?;

	apply_overrides(&mut cfg, |key| env::var(key).ok());
	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn parse(raw: &str, path: &Path) -> Result<Config> {
	toml::from_str(raw).map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })
}

/// Applies environment overrides on top of the parsed file.
///
/// `lookup` is usually `std::env::var`; tests pass a closure over a fixed map.
pub fn apply_overrides<F>(cfg: &mut Config, lookup: F)
where
	F: Fn(&str) -> Option<String>,
{
	let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

	if let Some(dsn) = non_empty(ENV_PG_DSN).or_else(|| non_empty(ENV_DATABASE_URL)) {
		cfg.storage.postgres.dsn = dsn;
	}
	if let Some(api_base) = non_empty(ENV_LLM_API_BASE) {
		cfg.providers.summarizer.api_base = api_base.clone();
		cfg.providers.extractor.api_base = api_base;
	}
	if let Some(api_key) = non_empty(ENV_LLM_API_KEY) {
		cfg.providers.summarizer.api_key = api_key.clone();
		cfg.providers.extractor.api_key = api_key;
	}
}

pub fn validate(cfg: &Config) -> Result<()> {
	if let Some(addr) = &cfg.service.metrics_addr
		&& addr.parse::<SocketAddr>().is_err()
	{
		return Err(Error::Validation {
			message: "service.metrics_addr must be a socket address such as 127.0.0.1:9090."
				.to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	for (label, provider) in
		[("summarizer", &cfg.providers.summarizer), ("extractor", &cfg.providers.extractor)]
	{
		validate_provider(label, provider)?;
	}

	let pipeline = &cfg.pipeline;

	if pipeline.window_hours == 0 {
		return Err(Error::Validation {
			message: "pipeline.window_hours must be greater than zero.".to_string(),
		});
	}
	if pipeline.default_day_count == 0 {
		return Err(Error::Validation {
			message: "pipeline.default_day_count must be greater than zero.".to_string(),
		});
	}
	if pipeline.max_reply_chars == 0 {
		return Err(Error::Validation {
			message: "pipeline.max_reply_chars must be greater than zero.".to_string(),
		});
	}
	if pipeline.max_event_name_chars == 0 {
		return Err(Error::Validation {
			message: "pipeline.max_event_name_chars must be greater than zero.".to_string(),
		});
	}
	if !CHAT_TYPES.contains(&pipeline.default_chat_type.as_str()) {
		return Err(Error::Validation {
			message: "pipeline.default_chat_type must be one of user, channel, or group."
				.to_string(),
		});
	}

	Ok(())
}

fn validate_provider(label: &str, provider: &LlmProviderConfig) -> Result<()> {
	for (field, value) in [
		("provider_id", &provider.provider_id),
		("api_base", &provider.api_base),
		("api_key", &provider.api_key),
		("model", &provider.model),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("providers.{label}.{field} must be non-empty."),
			});
		}
	}

	if provider.timeout_ms == 0 {
		return Err(Error::Validation {
			message: format!("providers.{label}.timeout_ms must be greater than zero."),
		});
	}
	if !provider.temperature.is_finite() {
		return Err(Error::Validation {
			message: format!("providers.{label}.temperature must be a finite number."),
		});
	}
	if !(0.0..=2.0).contains(&provider.temperature) {
		return Err(Error::Validation {
			message: format!("providers.{label}.temperature must be in the range 0.0-2.0."),
		});
	}

	for (key, value) in &provider.default_headers {
		if !value.is_string() {
			return Err(Error::Validation {
				message: format!("providers.{label}.default_headers.{key} must be a string."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.metrics_addr = cfg
		.service
		.metrics_addr
		.take()
		.map(|addr| addr.trim().to_string())
		.filter(|addr| !addr.is_empty());
	cfg.storage.postgres.dsn = cfg.storage.postgres.dsn.trim().to_string();
	cfg.pipeline.default_chat_type = cfg.pipeline.default_chat_type.trim().to_lowercase();

	for provider in [&mut cfg.providers.summarizer, &mut cfg.providers.extractor] {
		provider.api_base = provider.api_base.trim().trim_end_matches('/').to_string();
		provider.api_key = provider.api_key.trim().to_string();
	}
}
