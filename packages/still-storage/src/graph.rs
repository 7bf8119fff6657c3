//! Property-graph projection stored as node and edge tables.
//!
//! Every write is a merge: nodes are created when absent and refreshed otherwise, edges are
//! created once. All values travel as bound parameters.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{Error, Result, models::Event};

pub async fn upsert_person(
	executor: &mut PgConnection,
	platform: &str,
	platform_user_id: &str,
	name: &str,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO graph_persons (platform, platform_user_id, name)
VALUES ($1, $2, $3)
ON CONFLICT (platform, platform_user_id) DO UPDATE
SET
	name = EXCLUDED.name,
	updated_at = now()",
	)
	.bind(platform)
	.bind(platform_user_id)
	.bind(name)
	.execute(&mut *executor)
	.await?;

	Ok(())
}

pub async fn upsert_event(executor: &mut PgConnection, event: &Event) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO graph_events (
	event_id,
	platform,
	name,
	description,
	tags,
	participants,
	in_chat_id,
	in_chat_type,
	platform_timestamp,
	evidence_message_ids
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (event_id) DO UPDATE
SET
	platform = EXCLUDED.platform,
	name = EXCLUDED.name,
	description = EXCLUDED.description,
	tags = EXCLUDED.tags,
	participants = EXCLUDED.participants,
	in_chat_id = EXCLUDED.in_chat_id,
	in_chat_type = EXCLUDED.in_chat_type,
	platform_timestamp = EXCLUDED.platform_timestamp,
	evidence_message_ids = EXCLUDED.evidence_message_ids,
	updated_at = now()",
	)
	.bind(event.id)
	.bind(event.platform.as_str())
	.bind(event.name.as_str())
	.bind(event.description.as_str())
	.bind(&event.tags)
	.bind(&event.participants)
	.bind(event.in_chat_id.as_str())
	.bind(event.in_chat_type.as_str())
	.bind(event.platform_timestamp)
	.bind(&event.evidence_message_ids)
	.execute(&mut *executor)
	.await?;

	Ok(())
}

pub async fn upsert_topic(executor: &mut PgConnection, name: &str) -> Result<()> {
	if name.trim().is_empty() {
		return Err(Error::InvalidArgument("graph topic name must not be empty".to_string()));
	}

	sqlx::query("INSERT INTO graph_topics (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
		.bind(name)
		.execute(&mut *executor)
		.await?;

	Ok(())
}

/// Merges `Person -CONTRIBUTED_TO-> Event`. Both nodes must already exist.
pub async fn link_person_event(
	executor: &mut PgConnection,
	platform: &str,
	platform_user_id: &str,
	event_id: Uuid,
) -> Result<()> {
	let inserted = sqlx::query(
		"\
INSERT INTO graph_contributed_to (platform, platform_user_id, event_id)
SELECT p.platform, p.platform_user_id, e.event_id
FROM graph_persons p
JOIN graph_events e ON e.event_id = $3
WHERE p.platform = $1 AND p.platform_user_id = $2
ON CONFLICT (platform, platform_user_id, event_id) DO NOTHING",
	)
	.bind(platform)
	.bind(platform_user_id)
	.bind(event_id)
	.execute(&mut *executor)
	.await?
	.rows_affected();

	if inserted > 0 {
		return Ok(());
	}

	let exists: bool = sqlx::query_scalar(
		"\
SELECT EXISTS (
	SELECT 1
	FROM graph_contributed_to
	WHERE platform = $1 AND platform_user_id = $2 AND event_id = $3
)",
	)
	.bind(platform)
	.bind(platform_user_id)
	.bind(event_id)
	.fetch_one(&mut *executor)
	.await?;

	if exists {
		Ok(())
	} else {
		Err(Error::NotFound(format!(
			"graph person or event not found; platform={platform} platform_user_id={platform_user_id} event_id={event_id}"
		)))
	}
}

/// Merges `Event -MENTIONS-> Topic`. Both nodes must already exist.
pub async fn link_event_topic(
	executor: &mut PgConnection,
	event_id: Uuid,
	topic: &str,
) -> Result<()> {
	let inserted = sqlx::query(
		"\
INSERT INTO graph_mentions (event_id, topic)
SELECT e.event_id, t.name
FROM graph_events e
JOIN graph_topics t ON t.name = $2
WHERE e.event_id = $1
ON CONFLICT (event_id, topic) DO NOTHING",
	)
	.bind(event_id)
	.bind(topic)
	.execute(&mut *executor)
	.await?
	.rows_affected();

	if inserted > 0 {
		return Ok(());
	}

	let exists: bool = sqlx::query_scalar(
		"SELECT EXISTS (SELECT 1 FROM graph_mentions WHERE event_id = $1 AND topic = $2)",
	)
	.bind(event_id)
	.bind(topic)
	.fetch_one(&mut *executor)
	.await?;

	if exists {
		Ok(())
	} else {
		Err(Error::NotFound(format!(
			"graph event or topic not found; event_id={event_id} topic={topic}"
		)))
	}
}

/// Topic names linked to an event, alphabetical.
pub async fn list_event_topics(executor: &mut PgConnection, event_id: Uuid) -> Result<Vec<String>> {
	let rows: Vec<String> = sqlx::query_scalar(
		"SELECT topic FROM graph_mentions WHERE event_id = $1 ORDER BY topic ASC",
	)
	.bind(event_id)
	.fetch_all(&mut *executor)
	.await?;

	Ok(rows)
}

/// `(platform, platform_user_id)` of every person who contributed to an event.
pub async fn list_event_contributors(
	executor: &mut PgConnection,
	event_id: Uuid,
) -> Result<Vec<(String, String)>> {
	let rows: Vec<(String, String)> = sqlx::query_as(
		"\
SELECT platform, platform_user_id
FROM graph_contributed_to
WHERE event_id = $1
ORDER BY platform ASC, platform_user_id ASC",
	)
	.bind(event_id)
	.fetch_all(&mut *executor)
	.await?;

	Ok(rows)
}
