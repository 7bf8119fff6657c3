use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
	Error, Result,
	models::{Event, Identity, NewEvent},
};

/// Inserts the event or, when its id already exists, refreshes every attribute.
pub async fn upsert_event<'e, E>(executor: E, event: &NewEvent) -> Result<Event>
where
	E: PgExecutor<'e>,
{
	if event.description.trim().is_empty() {
		return Err(Error::InvalidArgument("event description must not be empty".to_string()));
	}

	let row = sqlx::query_as::<_, Event>(
		"\
INSERT INTO events (
	id,
	platform,
	name,
	tags,
	description,
	participants,
	in_chat_id,
	in_chat_type,
	platform_timestamp,
	evidence_message_ids
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (id) DO UPDATE
SET
	platform = EXCLUDED.platform,
	name = EXCLUDED.name,
	tags = EXCLUDED.tags,
	description = EXCLUDED.description,
	participants = EXCLUDED.participants,
	in_chat_id = EXCLUDED.in_chat_id,
	in_chat_type = EXCLUDED.in_chat_type,
	platform_timestamp = EXCLUDED.platform_timestamp,
	evidence_message_ids = EXCLUDED.evidence_message_ids,
	updated_at = now()
RETURNING
	id,
	platform,
	name,
	tags,
	description,
	participants,
	in_chat_id,
	in_chat_type,
	platform_timestamp,
	evidence_message_ids,
	created_at,
	updated_at",
	)
	.bind(event.id)
	.bind(event.platform.as_str())
	.bind(event.name.as_str())
	.bind(&event.tags)
	.bind(event.description.as_str())
	.bind(&event.participants)
	.bind(event.in_chat_id.as_str())
	.bind(event.in_chat_type.as_str())
	.bind(event.platform_timestamp)
	.bind(&event.evidence_message_ids)
	.fetch_one(executor)
	.await?;

	Ok(row)
}

/// Links an identity to an event. Linking the same pair twice is a no-op.
pub async fn link_identity<'e, E>(executor: E, event_id: Uuid, identity_id: Uuid) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO event_identities (event_id, identity_id)
VALUES ($1, $2)
ON CONFLICT (event_id, identity_id) DO NOTHING",
	)
	.bind(event_id)
	.bind(identity_id)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn get_event<'e, E>(executor: E, event_id: Uuid) -> Result<Event>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, Event>(
		"\
SELECT
	id,
	platform,
	name,
	tags,
	description,
	participants,
	in_chat_id,
	in_chat_type,
	platform_timestamp,
	evidence_message_ids,
	created_at,
	updated_at
FROM events
WHERE id = $1",
	)
	.bind(event_id)
	.fetch_optional(executor)
	.await?;

	row.ok_or_else(|| Error::NotFound(format!("event not found; event_id={event_id}")))
}

pub async fn list_event_identities<'e, E>(executor: E, event_id: Uuid) -> Result<Vec<Identity>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, Identity>(
		"\
SELECT
	i.id,
	i.platform,
	i.platform_user_id,
	i.username,
	i.display_name,
	i.profile_photo_url,
	i.alt_ids,
	i.created_at,
	i.updated_at
FROM event_identities ei
JOIN identities i ON i.id = ei.identity_id
WHERE ei.event_id = $1
ORDER BY i.platform_user_id ASC",
	)
	.bind(event_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

/// Events of one conversation, newest window first.
pub async fn list_events_for_chat<'e, E>(executor: E, in_chat_id: &str) -> Result<Vec<Event>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, Event>(
		"\
SELECT
	id,
	platform,
	name,
	tags,
	description,
	participants,
	in_chat_id,
	in_chat_type,
	platform_timestamp,
	evidence_message_ids,
	created_at,
	updated_at
FROM events
WHERE in_chat_id = $1
ORDER BY platform_timestamp DESC, created_at ASC, id ASC",
	)
	.bind(in_chat_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
