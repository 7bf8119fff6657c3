use std::collections::HashMap;

use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::text;

const LINE_TIMESTAMP: &[BorrowedFormatItem<'static>] =
	format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// For every message, the index of the message it replies to within the same batch.
///
/// Lookups never leave `messages`; a reply whose target was not fetched resolves to `None`.
/// When several messages share an id the first one wins.
pub fn resolve_reply_targets<T, I, R>(messages: &[T], id_of: I, reply_to_of: R) -> Vec<Option<usize>>
where
	I: Fn(&T) -> &str,
	R: Fn(&T) -> Option<&str>,
{
	let mut by_id = HashMap::with_capacity(messages.len());

	for (idx, message) in messages.iter().enumerate() {
		let id = id_of(message);

		if !id.is_empty() {
			by_id.entry(id).or_insert(idx);
		}
	}

	messages
		.iter()
		.map(|message| {
			reply_to_of(message)
				.filter(|reply_to| !reply_to.is_empty())
				.and_then(|reply_to| by_id.get(reply_to).copied())
		})
		.collect()
}

pub fn reply_quote(body: &str, max_chars: usize) -> String {
	text::truncate_runes(body, max_chars)
}

/// Renders one message as `[YYYY-MM-DD HH:MM:SS] sender: body (reply to: quote)` in UTC.
pub fn render_line(timestamp: i64, sender: &str, body: &str, quote: Option<&str>) -> String {
	let ts = format_timestamp(timestamp);

	match quote {
		Some(quote) => format!("[{ts}] {sender}: {body} (reply to: {quote})"),
		None => format!("[{ts}] {sender}: {body}"),
	}
}

fn format_timestamp(timestamp: i64) -> String {
	OffsetDateTime::from_unix_timestamp(timestamp)
		.ok()
		.and_then(|ts| ts.format(LINE_TIMESTAMP).ok())
		.unwrap_or_else(|| timestamp.to_string())
}
