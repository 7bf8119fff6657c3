use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{Error, Result, models::JoinedChat};

const CHAT_TYPES: [&str; 3] = ["user", "channel", "group"];

/// The most recently updated joined chat with this chat id, on any platform.
pub async fn get_joined_chat<'e, E>(executor: E, chat_id: &str) -> Result<Option<JoinedChat>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, JoinedChat>(
		"\
SELECT
	id,
	platform,
	chat_id,
	chat_name,
	chat_type,
	dialog_date,
	created_at,
	updated_at
FROM joined_chats
WHERE chat_id = $1
ORDER BY updated_at DESC
LIMIT 1",
	)
	.bind(chat_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn list_joined_chats<'e, E>(executor: E, platform: &str) -> Result<Vec<JoinedChat>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, JoinedChat>(
		"\
SELECT
	id,
	platform,
	chat_id,
	chat_name,
	chat_type,
	dialog_date,
	created_at,
	updated_at
FROM joined_chats
WHERE platform = $1
ORDER BY dialog_date DESC, chat_id ASC",
	)
	.bind(platform)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn upsert_joined_chat<'e, E>(
	executor: E,
	platform: &str,
	chat_id: &str,
	chat_name: &str,
	chat_type: &str,
	dialog_date: i64,
) -> Result<JoinedChat>
where
	E: PgExecutor<'e>,
{
	if !CHAT_TYPES.contains(&chat_type) {
		return Err(Error::InvalidArgument(format!("unknown chat type; chat_type={chat_type}")));
	}

	let row = sqlx::query_as::<_, JoinedChat>(
		"\
INSERT INTO joined_chats (id, platform, chat_id, chat_name, chat_type, dialog_date)
VALUES ($1, $2, $3, $4, $5, $6)
ON CONFLICT (platform, chat_id) DO UPDATE
SET
	chat_name = EXCLUDED.chat_name,
	chat_type = EXCLUDED.chat_type,
	dialog_date = EXCLUDED.dialog_date,
	updated_at = now()
RETURNING
	id,
	platform,
	chat_id,
	chat_name,
	chat_type,
	dialog_date,
	created_at,
	updated_at",
	)
	.bind(Uuid::new_v4())
	.bind(platform)
	.bind(chat_id)
	.bind(chat_name)
	.bind(chat_type)
	.bind(dialog_date)
	.fetch_one(executor)
	.await?;

	Ok(row)
}
