pub mod conversations;
pub mod distill;
pub mod fetch;
pub mod identity;
pub mod persist;
pub mod projection;
pub mod scheduler;
pub mod summary;
pub mod telemetry;

mod error;
mod postgres;

pub use conversations::{ConversationSelector, ConversationTarget};
pub use distill::{FailedStage, Stage, WindowDistillation, WindowFailure, WindowReport};
pub use error::{Error, Result};
pub use fetch::FetchedWindow;
pub use identity::{IdentityMap, Registration, ResolvedIdentity};
pub use persist::PersistedEvent;
pub use postgres::PgStores;
pub use scheduler::{RunReport, WindowOutcome};

use std::{future::Future, pin::Pin, sync::Arc};

use uuid::Uuid;

use still_config::{Config, LlmProviderConfig};
use still_providers::{extractor, summarizer};
use still_storage::{
	db::Db,
	models::{ChatMessage, Conversation, Event, Identity, JoinedChat, NewEvent},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait SummarizerProvider
where
	Self: Send + Sync,
{
	fn summarize<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		lines: &'a [String],
	) -> BoxFuture<'a, Result<String>>;
}

pub trait ExtractorProvider
where
	Self: Send + Sync,
{
	/// Returns the backend's raw `participants;tags;description` reply.
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		summary: &'a str,
	) -> BoxFuture<'a, Result<String>>;
}

pub trait MessageStore
where
	Self: Send + Sync,
{
	/// Non-empty messages with `start_ts <= ts < end_ts`, newest first.
	fn fetch_window<'a>(
		&'a self,
		chat_id: &'a str,
		start_ts: i64,
		end_ts: i64,
	) -> BoxFuture<'a, Result<Vec<ChatMessage>>>;

	fn count_non_empty<'a>(&'a self) -> BoxFuture<'a, Result<i64>>;
}

pub trait IdentityStore
where
	Self: Send + Sync,
{
	fn upsert_identity<'a>(
		&'a self,
		platform: &'a str,
		platform_user_id: &'a str,
		display_name: &'a str,
	) -> BoxFuture<'a, Result<Identity>>;
}

pub trait EventStore
where
	Self: Send + Sync,
{
	fn upsert_event<'a>(&'a self, event: &'a NewEvent) -> BoxFuture<'a, Result<Event>>;

	fn link_identity<'a>(&'a self, event_id: Uuid, identity_id: Uuid) -> BoxFuture<'a, Result<()>>;
}

/// Merge operations of the people/events/topics graph.
pub trait GraphStore
where
	Self: Send + Sync,
{
	fn upsert_person<'a>(
		&'a self,
		platform: &'a str,
		platform_user_id: &'a str,
		name: &'a str,
	) -> BoxFuture<'a, Result<()>>;

	fn upsert_event<'a>(&'a self, event: &'a Event) -> BoxFuture<'a, Result<()>>;

	fn upsert_topic<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>>;

	fn link_person_event<'a>(
		&'a self,
		platform: &'a str,
		platform_user_id: &'a str,
		event_id: Uuid,
	) -> BoxFuture<'a, Result<()>>;

	fn link_event_topic<'a>(&'a self, event_id: Uuid, topic: &'a str) -> BoxFuture<'a, Result<()>>;
}

pub trait ChatDirectory
where
	Self: Send + Sync,
{
	/// Conversations ordered by non-empty message count, descending, ties by chat id.
	fn list_conversations<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Conversation>>>;

	fn joined_chat<'a>(&'a self, chat_id: &'a str) -> BoxFuture<'a, Result<Option<JoinedChat>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub summarizer: Arc<dyn SummarizerProvider>,
	pub extractor: Arc<dyn ExtractorProvider>,
}
impl Providers {
	pub fn new(
		summarizer: Arc<dyn SummarizerProvider>,
		extractor: Arc<dyn ExtractorProvider>,
	) -> Self {
		Self { summarizer, extractor }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { summarizer: provider.clone(), extractor: provider }
	}
}

#[derive(Clone)]
pub struct Stores {
	pub messages: Arc<dyn MessageStore>,
	pub identities: Arc<dyn IdentityStore>,
	pub events: Arc<dyn EventStore>,
	pub graph: Arc<dyn GraphStore>,
	pub chats: Arc<dyn ChatDirectory>,
}
impl Stores {
	pub fn postgres(db: Db) -> Self {
		let stores = Arc::new(PgStores::new(db));

		Self {
			messages: stores.clone(),
			identities: stores.clone(),
			events: stores.clone(),
			graph: stores.clone(),
			chats: stores,
		}
	}
}

pub struct StillService {
	pub cfg: Config,
	pub stores: Stores,
	pub providers: Providers,
}
impl StillService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, stores: Stores::postgres(db), providers: Providers::default() }
	}

	pub fn with_parts(cfg: Config, stores: Stores, providers: Providers) -> Self {
		Self { cfg, stores, providers }
	}
}

struct DefaultProviders;
impl SummarizerProvider for DefaultProviders {
	fn summarize<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		lines: &'a [String],
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(summarizer::summarize(cfg, lines).await?) })
	}
}
impl ExtractorProvider for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		summary: &'a str,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(extractor::extract(cfg, summary).await?) })
	}
}
