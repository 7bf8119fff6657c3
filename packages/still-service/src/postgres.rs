use uuid::Uuid;

use crate::{
	BoxFuture, ChatDirectory, EventStore, GraphStore, IdentityStore, MessageStore, Result,
};
use still_storage::{
	chats,
	db::Db,
	events, graph, identities, messages,
	models::{ChatMessage, Conversation, Event, Identity, JoinedChat, NewEvent},
};

/// Every store seam backed by one Postgres pool.
pub struct PgStores {
	db: Db,
}
impl PgStores {
	pub fn new(db: Db) -> Self {
		Self { db }
	}
}

impl MessageStore for PgStores {
	fn fetch_window<'a>(
		&'a self,
		chat_id: &'a str,
		start_ts: i64,
		end_ts: i64,
	) -> BoxFuture<'a, Result<Vec<ChatMessage>>> {
		Box::pin(async move {
			Ok(messages::fetch_window(&self.db.pool, chat_id, start_ts, end_ts).await?)
		})
	}

	fn count_non_empty<'a>(&'a self) -> BoxFuture<'a, Result<i64>> {
		Box::pin(async move { Ok(messages::count_non_empty(&self.db.pool).await?) })
	}
}

impl IdentityStore for PgStores {
	fn upsert_identity<'a>(
		&'a self,
		platform: &'a str,
		platform_user_id: &'a str,
		display_name: &'a str,
	) -> BoxFuture<'a, Result<Identity>> {
		Box::pin(async move {
			Ok(identities::upsert_identity(&self.db.pool, platform, platform_user_id, display_name)
				.await?)
		})
	}
}

impl EventStore for PgStores {
	fn upsert_event<'a>(&'a self, event: &'a NewEvent) -> BoxFuture<'a, Result<Event>> {
		Box::pin(async move { Ok(events::upsert_event(&self.db.pool, event).await?) })
	}

	fn link_identity<'a>(&'a self, event_id: Uuid, identity_id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(events::link_identity(&self.db.pool, event_id, identity_id).await?) })
	}
}

impl GraphStore for PgStores {
	fn upsert_person<'a>(
		&'a self,
		platform: &'a str,
		platform_user_id: &'a str,
		name: &'a str,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut conn = self.db.pool.acquire().await?;

			Ok(graph::upsert_person(&mut conn, platform, platform_user_id, name).await?)
		})
	}

	fn upsert_event<'a>(&'a self, event: &'a Event) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut conn = self.db.pool.acquire().await?;

			Ok(graph::upsert_event(&mut conn, event).await?)
		})
	}

	fn upsert_topic<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut conn = self.db.pool.acquire().await?;

			Ok(graph::upsert_topic(&mut conn, name).await?)
		})
	}

	fn link_person_event<'a>(
		&'a self,
		platform: &'a str,
		platform_user_id: &'a str,
		event_id: Uuid,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut conn = self.db.pool.acquire().await?;

			Ok(graph::link_person_event(&mut conn, platform, platform_user_id, event_id).await?)
		})
	}

	fn link_event_topic<'a>(&'a self, event_id: Uuid, topic: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut conn = self.db.pool.acquire().await?;

			Ok(graph::link_event_topic(&mut conn, event_id, topic).await?)
		})
	}
}

impl ChatDirectory for PgStores {
	fn list_conversations<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Conversation>>> {
		Box::pin(async move { Ok(messages::list_conversations(&self.db.pool).await?) })
	}

	fn joined_chat<'a>(&'a self, chat_id: &'a str) -> BoxFuture<'a, Result<Option<JoinedChat>>> {
		Box::pin(async move { Ok(chats::get_joined_chat(&self.db.pool, chat_id).await?) })
	}
}
