use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ChatMessage {
	pub id: Uuid,
	pub platform: String,
	pub platform_message_id: String,
	pub from_id: String,
	pub from_name: String,
	pub from_user_uuid: Option<Uuid>,
	pub owner_account_id: Option<Uuid>,
	pub in_chat_id: String,
	pub in_chat_type: String,
	pub content: String,
	pub is_reply: bool,
	pub reply_to_name: String,
	pub reply_to_id: Option<String>,
	pub platform_timestamp: i64,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Identity {
	pub id: Uuid,
	pub platform: String,
	pub platform_user_id: String,
	pub username: String,
	pub display_name: String,
	pub profile_photo_url: String,
	pub alt_ids: Vec<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct JoinedChat {
	pub id: Uuid,
	pub platform: String,
	pub chat_id: String,
	pub chat_name: String,
	pub chat_type: String,
	pub dialog_date: i64,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Event {
	pub id: Uuid,
	pub platform: String,
	pub name: String,
	pub tags: Vec<String>,
	pub description: String,
	pub participants: Vec<String>,
	pub in_chat_id: String,
	pub in_chat_type: String,
	pub platform_timestamp: i64,
	pub evidence_message_ids: Vec<Uuid>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// Column values for an event upsert. The id is chosen by the caller.
#[derive(Clone, Debug)]
pub struct NewEvent {
	pub id: Uuid,
	pub platform: String,
	pub name: String,
	pub tags: Vec<String>,
	pub description: String,
	pub participants: Vec<String>,
	pub in_chat_id: String,
	pub in_chat_type: String,
	pub platform_timestamp: i64,
	pub evidence_message_ids: Vec<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct ChatMessageCount {
	pub in_chat_id: String,
	pub message_count: i64,
}

/// A conversation with its message count and, when known, its joined-chat metadata.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Conversation {
	pub in_chat_id: String,
	pub message_count: i64,
	pub chat_name: Option<String>,
	pub chat_type: Option<String>,
}
