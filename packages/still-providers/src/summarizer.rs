use crate::{
	Error, Result,
	chat::{self, BlankReply},
};

const SYSTEM_PROMPT: &str = "\
You condense chat transcripts. Each input line has the form \
`[YYYY-MM-DD HH:MM:SS] sender: message`, optionally followed by `(reply to: quote)`. \
Write a concise factual summary of what happened: who did what, what was decided, and which \
topics came up. Refer to people by the sender names exactly as they appear. Do not invent facts.";

/// Summarizes pre-rendered transcript lines in the order given.
pub async fn summarize(cfg: &still_config::LlmProviderConfig, lines: &[String]) -> Result<String> {
	if lines.is_empty() {
		return Err(Error::EmptyInput { message: "Summarization input is empty.".to_string() });
	}

	let transcript = lines.join("\n");
	let messages = [chat::system_message(SYSTEM_PROMPT), chat::user_message(&transcript)];

	tracing::debug!(provider_id = %cfg.provider_id, lines = lines.len(), "Requesting summary.");

	chat::complete(cfg, &messages, BlankReply::Reject).await
}
