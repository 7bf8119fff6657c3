use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{Error, Result, models::Identity};

/// Creates the identity for `(platform, platform_user_id)` or refreshes its display name.
///
/// The upsert is a single statement, so concurrent callers racing on the same key converge on one
/// row.
pub async fn upsert_identity<'e, E>(
	executor: E,
	platform: &str,
	platform_user_id: &str,
	display_name: &str,
) -> Result<Identity>
where
	E: PgExecutor<'e>,
{
	if platform.trim().is_empty() || platform_user_id.trim().is_empty() {
		return Err(Error::InvalidArgument(
			"identity platform and platform_user_id must not be empty".to_string(),
		));
	}

	let row = sqlx::query_as::<_, Identity>(
		"\
INSERT INTO identities (id, platform, platform_user_id, display_name)
VALUES ($1, $2, $3, $4)
ON CONFLICT (platform, platform_user_id) DO UPDATE
SET
	display_name = EXCLUDED.display_name,
	updated_at = now()
RETURNING
	id,
	platform,
	platform_user_id,
	username,
	display_name,
	profile_photo_url,
	alt_ids,
	created_at,
	updated_at",
	)
	.bind(Uuid::new_v4())
	.bind(platform)
	.bind(platform_user_id)
	.bind(display_name)
	.fetch_one(executor)
	.await?;

	Ok(row)
}

pub async fn get_identity<'e, E>(
	executor: E,
	platform: &str,
	platform_user_id: &str,
) -> Result<Option<Identity>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, Identity>(
		"\
SELECT
	id,
	platform,
	platform_user_id,
	username,
	display_name,
	profile_photo_url,
	alt_ids,
	created_at,
	updated_at
FROM identities
WHERE platform = $1 AND platform_user_id = $2",
	)
	.bind(platform)
	.bind(platform_user_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn count_identities<'e, E>(executor: E, platform: &str) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let count: i64 = sqlx::query_scalar("SELECT count(*) FROM identities WHERE platform = $1")
		.bind(platform)
		.fetch_one(executor)
		.await?;

	Ok(count)
}
