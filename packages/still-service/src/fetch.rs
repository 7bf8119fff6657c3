use uuid::Uuid;

use crate::{
	Result, StillService,
	telemetry::{self, Item, Step, StepTimer},
};
use still_domain::{transcript, window::Window};
use still_storage::models::ChatMessage;

/// One window's messages, newest first, with their rendered transcript lines in the same order.
#[derive(Clone, Debug, Default)]
pub struct FetchedWindow {
	pub messages: Vec<ChatMessage>,
	pub lines: Vec<String>,
}
impl FetchedWindow {
	pub fn is_empty(&self) -> bool {
		self.messages.is_empty()
	}

	pub fn evidence_ids(&self) -> Vec<Uuid> {
		self.messages.iter().map(|message| message.id).collect()
	}

	/// Platform of the newest message.
	pub fn platform(&self) -> Option<&str> {
		self.messages.first().map(|message| message.platform.as_str())
	}
}

/// Renders messages as transcript lines, quoting reply targets found in the same batch.
pub fn render_transcript(messages: &[ChatMessage], max_reply_chars: usize) -> Vec<String> {
	let targets = transcript::resolve_reply_targets(
		messages,
		|message| message.platform_message_id.as_str(),
		|message| message.reply_to_id.as_deref(),
	);

	messages
		.iter()
		.zip(targets)
		.map(|(message, target)| {
			let quote =
				target.map(|idx| transcript::reply_quote(&messages[idx].content, max_reply_chars));

			transcript::render_line(
				message.platform_timestamp,
				&message.from_name,
				&message.content,
				quote.as_deref(),
			)
		})
		.collect()
}

impl StillService {
	pub async fn fetch_window(&self, chat_id: &str, window: &Window) -> Result<FetchedWindow> {
		let timer = StepTimer::start(Step::QueryMessages);
		let result =
			self.stores.messages.fetch_window(chat_id, window.start_ts(), window.end_ts()).await;

		timer.finish(result.is_ok());

		let mut messages = result?;

		// Empty bodies never reach the transcript.
		messages.retain(|message| !message.content.is_empty());

		let lines = render_transcript(&messages, self.cfg.pipeline.max_reply_chars as usize);

		telemetry::count(Item::MessagesFetched, messages.len());
		tracing::info!(
			chat_id,
			offset = window.offset,
			count = messages.len(),
			"Fetched window messages."
		);

		Ok(FetchedWindow { messages, lines })
	}
}
