use serde::Deserialize;
use serde_json::{Map, Value};

pub const CHAT_TYPES: [&str; 3] = ["user", "channel", "group"];

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub pipeline: Pipeline,
	#[serde(default)]
	pub graph: Graph,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
	/// `host:port` for the Prometheus scrape endpoint. Unset keeps metrics in-process only.
	#[serde(default)]
	pub metrics_addr: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub summarizer: LlmProviderConfig,
	pub extractor: LlmProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Pipeline {
	/// Length of one distillation window.
	pub window_hours: u32,
	/// Days distilled when the caller does not ask for a specific count.
	pub default_day_count: u32,
	/// Upper bound on windows processed at once. Zero runs every requested day at once.
	pub max_concurrent_windows: u32,
	/// Deadline for a single window in milliseconds. Zero disables the deadline.
	pub window_timeout_ms: u64,
	/// Rune budget for the quoted body of a replied-to message.
	pub max_reply_chars: u32,
	/// Rune budget for an event name derived from its description.
	pub max_event_name_chars: u32,
	/// Used when the conversation type cannot be looked up.
	pub default_chat_type: String,
}
impl Default for Pipeline {
	fn default() -> Self {
		Self {
			window_hours: 24,
			default_day_count: 1,
			max_concurrent_windows: 0,
			window_timeout_ms: 0,
			max_reply_chars: 20,
			max_event_name_chars: 48,
			default_chat_type: "group".to_string(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Graph {
	pub enabled: bool,
}
impl Default for Graph {
	fn default() -> Self {
		Self { enabled: true }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}
