use std::fmt;

use crate::{Error, Result, StillService};
use still_storage::models::Conversation;

/// Which conversation a run distills.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversationSelector {
	ChatId(String),
	/// Zero-based position in the conversation list ordered by message count.
	Rank(usize),
}
impl fmt::Display for ConversationSelector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ChatId(chat_id) => write!(f, "chat {chat_id}"),
			Self::Rank(rank) => write!(f, "rank {rank}"),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationTarget {
	pub chat_id: String,
	pub chat_type: String,
}

impl StillService {
	pub async fn count_messages(&self) -> Result<i64> {
		self.stores.messages.count_non_empty().await
	}

	pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
		self.stores.chats.list_conversations().await
	}

	/// Resolves a selector to a chat id and its chat type.
	///
	/// A missing or failing chat-type lookup falls back to `pipeline.default_chat_type`.
	pub async fn resolve_conversation(
		&self,
		selector: &ConversationSelector,
	) -> Result<ConversationTarget> {
		let chat_id = match selector {
			ConversationSelector::ChatId(chat_id) => {
				let chat_id = chat_id.trim();

				if chat_id.is_empty() {
					return Err(Error::InvalidRequest {
						message: "Conversation id must not be empty.".to_string(),
					});
				}

				chat_id.to_string()
			},
			ConversationSelector::Rank(rank) => {
				let conversations = self.list_conversations().await?;
				let total = conversations.len();

				conversations.into_iter().nth(*rank).map(|c| c.in_chat_id).ok_or_else(|| {
					Error::NotFound {
						message: format!("No conversation at rank {rank}; {total} available."),
					}
				})?
			},
		};
		let chat_type = self.lookup_chat_type(&chat_id).await;

		Ok(ConversationTarget { chat_id, chat_type })
	}

	async fn lookup_chat_type(&self, chat_id: &str) -> String {
		let fallback = &self.cfg.pipeline.default_chat_type;

		match self.stores.chats.joined_chat(chat_id).await {
			Ok(Some(chat)) => chat.chat_type,
			Ok(None) => {
				tracing::warn!(
					chat_id,
					fallback = %fallback,
					"Joined chat not found. Using the default chat type."
				);

				fallback.clone()
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					chat_id,
					fallback = %fallback,
					"Failed to look up chat type. Using the default chat type."
				);

				fallback.clone()
			},
		}
	}
}
