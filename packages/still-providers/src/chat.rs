use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

const MAX_ATTEMPTS: usize = 3;

/// Whether a reply with blank content counts as an answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlankReply {
	Reject,
	Accept,
}

pub fn system_message(content: &str) -> Value {
	serde_json::json!({ "role": "system", "content": content })
}

pub fn user_message(content: &str) -> Value {
	serde_json::json!({ "role": "user", "content": content })
}

/// Sends an OpenAI-compatible chat completion and returns the first choice's text.
///
/// Replies that arrive without usable content are retried; transport and HTTP status errors are
/// returned immediately. With [`BlankReply::Accept`] a blank reply is returned as an empty string.
pub async fn complete(
	cfg: &still_config::LlmProviderConfig,
	messages: &[Value],
	blank: BlankReply,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let mut last_err = None;

	for attempt in 1..=MAX_ATTEMPTS {
		let res = client
			.post(&url)
			.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;

		match parse_completion_text(&json, blank) {
			Ok(text) => return Ok(text),
			Err(err) => {
				tracing::warn!(
					provider_id = %cfg.provider_id,
					attempt,
					error = %err,
					"Completion reply had no usable content."
				);

				last_err = Some(err);
			},
		}
	}

	Err(last_err.unwrap_or_else(|| Error::InvalidResponse {
		message: "Completion response is missing content.".to_string(),
	}))
}

pub fn parse_completion_text(json: &Value, blank: BlankReply) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing choices[0].message.content.".to_string(),
		})?;
	let trimmed = content.trim();

	if trimmed.is_empty() && blank == BlankReply::Reject {
		return Err(Error::InvalidResponse {
			message: "Completion response content is empty.".to_string(),
		});
	}

	Ok(trimmed.to_string())
}
