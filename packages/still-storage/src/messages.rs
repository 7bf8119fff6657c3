use sqlx::PgExecutor;

use crate::{
	Result,
	models::{ChatMessage, ChatMessageCount, Conversation},
};

/// Non-empty messages of one conversation with `start <= ts < end`, newest first.
///
/// Ties on the timestamp are ordered by the platform message id, descending.
pub async fn fetch_window<'e, E>(
	executor: E,
	in_chat_id: &str,
	start_ts: i64,
	end_ts: i64,
) -> Result<Vec<ChatMessage>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, ChatMessage>(
		"\
SELECT
	id,
	platform,
	platform_message_id,
	from_id,
	from_name,
	from_user_uuid,
	owner_account_id,
	in_chat_id,
	in_chat_type,
	content,
	is_reply,
	reply_to_name,
	reply_to_id,
	platform_timestamp
FROM chat_messages
WHERE in_chat_id = $1
	AND platform_timestamp >= $2
	AND platform_timestamp < $3
	AND content <> ''
ORDER BY platform_timestamp DESC, platform_message_id DESC",
	)
	.bind(in_chat_id)
	.bind(start_ts)
	.bind(end_ts)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn count_non_empty<'e, E>(executor: E) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let count: i64 = sqlx::query_scalar("SELECT count(*) FROM chat_messages WHERE content <> ''")
		.fetch_one(executor)
		.await?;

	Ok(count)
}

/// Non-empty message counts per conversation, largest first, ties by conversation id.
pub async fn count_by_chat<'e, E>(executor: E) -> Result<Vec<ChatMessageCount>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, ChatMessageCount>(
		"\
SELECT in_chat_id, count(*) AS message_count
FROM chat_messages
WHERE content <> ''
GROUP BY in_chat_id
ORDER BY message_count DESC, in_chat_id ASC",
	)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

/// Same ordering as [`count_by_chat`], joined with the newest matching `joined_chats` row.
pub async fn list_conversations<'e, E>(executor: E) -> Result<Vec<Conversation>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, Conversation>(
		"\
WITH counts AS (
	SELECT in_chat_id, count(*) AS message_count
	FROM chat_messages
	WHERE content <> ''
	GROUP BY in_chat_id
)
SELECT c.in_chat_id, c.message_count, j.chat_name, j.chat_type
FROM counts c
LEFT JOIN LATERAL (
	SELECT chat_name, chat_type
	FROM joined_chats
	WHERE chat_id = c.in_chat_id
	ORDER BY updated_at DESC
	LIMIT 1
) j ON true
ORDER BY c.message_count DESC, c.in_chat_id ASC",
	)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

/// Stores a message unless one with the same platform, message id, chat and owner exists.
///
/// Returns whether a row was written.
pub async fn insert_message<'e, E>(executor: E, message: &ChatMessage) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
INSERT INTO chat_messages (
	id,
	platform,
	platform_message_id,
	from_id,
	from_name,
	from_user_uuid,
	owner_account_id,
	in_chat_id,
	in_chat_type,
	content,
	is_reply,
	reply_to_name,
	reply_to_id,
	platform_timestamp
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
ON CONFLICT DO NOTHING",
	)
	.bind(message.id)
	.bind(message.platform.as_str())
	.bind(message.platform_message_id.as_str())
	.bind(message.from_id.as_str())
	.bind(message.from_name.as_str())
	.bind(message.from_user_uuid)
	.bind(message.owner_account_id)
	.bind(message.in_chat_id.as_str())
	.bind(message.in_chat_type.as_str())
	.bind(message.content.as_str())
	.bind(message.is_reply)
	.bind(message.reply_to_name.as_str())
	.bind(message.reply_to_id.as_deref())
	.bind(message.platform_timestamp)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}
