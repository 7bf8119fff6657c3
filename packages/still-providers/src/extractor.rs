use crate::{
	Error, Result,
	chat::{self, BlankReply},
};

const SYSTEM_PROMPT: &str = "\
You turn a chat summary into event records. Output one record per line and nothing else. \
Each record has exactly three fields separated by semicolons: \
`participants;tags;description`. Participants is a comma-separated list of the people involved, \
using the names from the summary. Tags is a comma-separated list of short topic keywords. \
Description is one sentence describing the event and must not contain semicolons.";

/// Asks the extractor backend for `participants;tags;description` records and returns its raw reply.
///
/// Parsing is left to the caller so malformed records can be dropped one by one. A blank reply
/// means nothing worth recording happened and comes back as an empty string.
pub async fn extract(cfg: &still_config::LlmProviderConfig, summary: &str) -> Result<String> {
	let summary = summary.trim();

	if summary.is_empty() {
		return Err(Error::EmptyInput { message: "Extraction input is empty.".to_string() });
	}

	let messages = [chat::system_message(SYSTEM_PROMPT), chat::user_message(summary)];

	tracing::debug!(provider_id = %cfg.provider_id, chars = summary.len(), "Requesting extraction.");

	chat::complete(cfg, &messages, BlankReply::Accept).await
}
