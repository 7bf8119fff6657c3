use std::{
	collections::{HashMap, HashSet},
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Map;
use time::{OffsetDateTime, macros::datetime};
use uuid::Uuid;

use still_config::{
	Config, Graph, LlmProviderConfig, Pipeline, Postgres, Providers as ProviderConfigs, Service,
	Storage,
};
use still_domain::window::Window;
use still_service::{
	BoxFuture, ChatDirectory, ConversationSelector, ConversationTarget, Error, EventStore,
	ExtractorProvider, FailedStage, GraphStore, IdentityStore, MessageStore, Providers, Result,
	StillService, Stores, SummarizerProvider,
};
use still_storage::models::{ChatMessage, Conversation, Event, Identity, JoinedChat, NewEvent};

const ANCHOR: OffsetDateTime = datetime!(2024-03-10 00:00 UTC);
const DAY: i64 = 86_400;

fn provider_config() -> LlmProviderConfig {
	LlmProviderConfig {
		provider_id: "test".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: "test-key".to_string(),
		path: "/v1/chat/completions".to_string(),
		model: "test".to_string(),
		temperature: 0.0,
		timeout_ms: 1_000,
		default_headers: Map::new(),
	}
}

fn test_config() -> Config {
	Config {
		service: Service { log_level: "info".to_string(), metrics_addr: None },
		storage: Storage {
			postgres: Postgres { dsn: "postgres://unused".to_string(), pool_max_conns: 1 },
		},
		providers: ProviderConfigs { summarizer: provider_config(), extractor: provider_config() },
		pipeline: Pipeline::default(),
		graph: Graph { enabled: true },
	}
}

fn message(
	id: &str,
	ts: i64,
	(from_id, from_name): (&str, &str),
	body: &str,
	reply_to: Option<&str>,
) -> ChatMessage {
	ChatMessage {
		id: Uuid::new_v4(),
		platform: "telegram".to_string(),
		platform_message_id: id.to_string(),
		from_id: from_id.to_string(),
		from_name: from_name.to_string(),
		from_user_uuid: None,
		owner_account_id: None,
		in_chat_id: "chat-42".to_string(),
		in_chat_type: "group".to_string(),
		content: body.to_string(),
		is_reply: reply_to.is_some(),
		reply_to_name: String::new(),
		reply_to_id: reply_to.map(str::to_string),
		platform_timestamp: ts,
	}
}

fn alice_and_bob() -> Vec<ChatMessage> {
	let end = ANCHOR.unix_timestamp();

	vec![
		message("1", end - 3_600, ("100", "Alice"), "the deploy pipeline is red", None),
		message("2", end - 3_000, ("200", "Bob"), "looking", Some("1")),
		message("3", end - 600, ("100", "Alice"), "fixed, CI is green", None),
	]
}

fn target() -> ConversationTarget {
	ConversationTarget { chat_id: "chat-42".to_string(), chat_type: "group".to_string() }
}

fn window_zero() -> Window {
	Window::new(0, ANCHOR - time::Duration::DAY, ANCHOR)
}

#[derive(Default)]
struct GraphCalls {
	upsert_event: usize,
	upsert_person: usize,
	upsert_topic: usize,
	link_person_event: usize,
	link_event_topic: usize,
	persons: HashSet<(String, String)>,
	topics: HashSet<String>,
	contributed: HashSet<(String, Uuid)>,
	mentions: HashSet<(Uuid, String)>,
}

#[derive(Default)]
struct MemoryState {
	fetch_calls: usize,
	identities: HashMap<(String, String), Identity>,
	event_attempts: usize,
	events: HashMap<Uuid, Event>,
	links: HashSet<(Uuid, Uuid)>,
	graph: GraphCalls,
}

#[derive(Default)]
struct MemoryStore {
	messages: Vec<ChatMessage>,
	conversations: Vec<Conversation>,
	joined: Option<JoinedChat>,
	fail_fetch_for_start: Option<i64>,
	fail_identity_for: Option<String>,
	fail_event_for: Option<String>,
	state: Mutex<MemoryState>,
}
impl MemoryStore {
	fn with_messages(messages: Vec<ChatMessage>) -> Self {
		Self { messages, ..Default::default() }
	}

	fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}
}

fn storage_error(message: &str) -> Error {
	Error::Storage { message: message.to_string() }
}

impl MessageStore for MemoryStore {
	fn fetch_window<'a>(
		&'a self,
		chat_id: &'a str,
		start_ts: i64,
		end_ts: i64,
	) -> BoxFuture<'a, Result<Vec<ChatMessage>>> {
		self.state().fetch_calls += 1;

		let result = if self.fail_fetch_for_start == Some(start_ts) {
			Err(storage_error("connection reset"))
		} else {
			let mut rows: Vec<ChatMessage> = self
				.messages
				.iter()
				.filter(|m| m.in_chat_id == chat_id)
				.filter(|m| m.platform_timestamp >= start_ts && m.platform_timestamp < end_ts)
				.filter(|m| !m.content.is_empty())
				.cloned()
				.collect();

			rows.sort_by(|a, b| {
				b.platform_timestamp
					.cmp(&a.platform_timestamp)
					.then_with(|| b.platform_message_id.cmp(&a.platform_message_id))
			});

			Ok(rows)
		};

		Box::pin(async move { result })
	}

	fn count_non_empty<'a>(&'a self) -> BoxFuture<'a, Result<i64>> {
		let count = self.messages.iter().filter(|m| !m.content.is_empty()).count() as i64;

		Box::pin(async move { Ok(count) })
	}
}

impl IdentityStore for MemoryStore {
	fn upsert_identity<'a>(
		&'a self,
		platform: &'a str,
		platform_user_id: &'a str,
		display_name: &'a str,
	) -> BoxFuture<'a, Result<Identity>> {
		let result = if self.fail_identity_for.as_deref() == Some(platform_user_id) {
			Err(storage_error("identity write rejected"))
		} else {
			let mut state = self.state();
			let now = OffsetDateTime::now_utc();
			let identity = state
				.identities
				.entry((platform.to_string(), platform_user_id.to_string()))
				.or_insert_with(|| Identity {
					id: Uuid::new_v4(),
					platform: platform.to_string(),
					platform_user_id: platform_user_id.to_string(),
					username: String::new(),
					display_name: String::new(),
					profile_photo_url: String::new(),
					alt_ids: Vec::new(),
					created_at: now,
					updated_at: now,
				});

			identity.display_name = display_name.to_string();
			identity.updated_at = now;

			Ok(identity.clone())
		};

		Box::pin(async move { result })
	}
}

impl EventStore for MemoryStore {
	fn upsert_event<'a>(&'a self, event: &'a NewEvent) -> BoxFuture<'a, Result<Event>> {
		let mut state = self.state();

		state.event_attempts += 1;

		let result = if self.fail_event_for.as_deref() == Some(event.description.as_str()) {
			Err(storage_error("event write rejected"))
		} else {
			let now = OffsetDateTime::now_utc();
			let row = Event {
				id: event.id,
				platform: event.platform.clone(),
				name: event.name.clone(),
				tags: event.tags.clone(),
				description: event.description.clone(),
				participants: event.participants.clone(),
				in_chat_id: event.in_chat_id.clone(),
				in_chat_type: event.in_chat_type.clone(),
				platform_timestamp: event.platform_timestamp,
				evidence_message_ids: event.evidence_message_ids.clone(),
				created_at: now,
				updated_at: now,
			};

			state.events.insert(row.id, row.clone());

			Ok(row)
		};

		drop(state);

		Box::pin(async move { result })
	}

	fn link_identity<'a>(&'a self, event_id: Uuid, identity_id: Uuid) -> BoxFuture<'a, Result<()>> {
		self.state().links.insert((event_id, identity_id));

		Box::pin(async move { Ok(()) })
	}
}

impl GraphStore for MemoryStore {
	fn upsert_person<'a>(
		&'a self,
		platform: &'a str,
		platform_user_id: &'a str,
		_name: &'a str,
	) -> BoxFuture<'a, Result<()>> {
		let mut state = self.state();

		state.graph.upsert_person += 1;
		state.graph.persons.insert((platform.to_string(), platform_user_id.to_string()));

		drop(state);

		Box::pin(async move { Ok(()) })
	}

	fn upsert_event<'a>(&'a self, _event: &'a Event) -> BoxFuture<'a, Result<()>> {
		self.state().graph.upsert_event += 1;

		Box::pin(async move { Ok(()) })
	}

	fn upsert_topic<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>> {
		let mut state = self.state();

		state.graph.upsert_topic += 1;
		state.graph.topics.insert(name.to_string());

		drop(state);

		Box::pin(async move { Ok(()) })
	}

	fn link_person_event<'a>(
		&'a self,
		_platform: &'a str,
		platform_user_id: &'a str,
		event_id: Uuid,
	) -> BoxFuture<'a, Result<()>> {
		let mut state = self.state();

		state.graph.link_person_event += 1;
		state.graph.contributed.insert((platform_user_id.to_string(), event_id));

		drop(state);

		Box::pin(async move { Ok(()) })
	}

	fn link_event_topic<'a>(&'a self, event_id: Uuid, topic: &'a str) -> BoxFuture<'a, Result<()>> {
		let mut state = self.state();

		state.graph.link_event_topic += 1;
		state.graph.mentions.insert((event_id, topic.to_string()));

		drop(state);

		Box::pin(async move { Ok(()) })
	}
}

impl ChatDirectory for MemoryStore {
	fn list_conversations<'a>(&'a self) -> BoxFuture<'a, Result<Vec<Conversation>>> {
		let rows = self.conversations.clone();

		Box::pin(async move { Ok(rows) })
	}

	fn joined_chat<'a>(&'a self, chat_id: &'a str) -> BoxFuture<'a, Result<Option<JoinedChat>>> {
		let row = self.joined.clone().filter(|chat| chat.chat_id == chat_id);

		Box::pin(async move { Ok(row) })
	}
}

struct ScriptedSummarizer {
	reply: Result<String, String>,
	delay: Option<Duration>,
	calls: AtomicUsize,
	seen: Mutex<Vec<Vec<String>>>,
}
impl ScriptedSummarizer {
	fn replying(text: &str) -> Self {
		Self {
			reply: Ok(text.to_string()),
			delay: None,
			calls: AtomicUsize::new(0),
			seen: Mutex::default(),
		}
	}

	fn failing(message: &str) -> Self {
		Self { reply: Err(message.to_string()), ..Self::replying("") }
	}

	fn count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	fn last_input(&self) -> Vec<String> {
		self.seen.lock().unwrap_or_else(|err| err.into_inner()).last().cloned().unwrap_or_default()
	}
}
impl SummarizerProvider for ScriptedSummarizer {
	fn summarize<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		lines: &'a [String],
	) -> BoxFuture<'a, Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.seen.lock().unwrap_or_else(|err| err.into_inner()).push(lines.to_vec());

		let reply = self.reply.clone().map_err(|message| Error::Provider { message });
		let delay = self.delay;

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			reply
		})
	}
}

struct ScriptedExtractor {
	reply: Result<String, String>,
	calls: AtomicUsize,
}
impl ScriptedExtractor {
	fn replying(text: &str) -> Self {
		Self { reply: Ok(text.to_string()), calls: AtomicUsize::new(0) }
	}

	fn failing(message: &str) -> Self {
		Self { reply: Err(message.to_string()), calls: AtomicUsize::new(0) }
	}

	fn count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl ExtractorProvider for ScriptedExtractor {
	fn extract<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_summary: &'a str,
	) -> BoxFuture<'a, Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let reply = self.reply.clone().map_err(|message| Error::Provider { message });

		Box::pin(async move { reply })
	}
}

fn service(
	cfg: Config,
	store: &Arc<MemoryStore>,
	summarizer: &Arc<ScriptedSummarizer>,
	extractor: &Arc<ScriptedExtractor>,
) -> StillService {
	let stores = Stores {
		messages: store.clone(),
		identities: store.clone(),
		events: store.clone(),
		graph: store.clone(),
		chats: store.clone(),
	};

	StillService::with_parts(cfg, stores, Providers::new(summarizer.clone(), extractor.clone()))
}

#[tokio::test]
async fn chat_42_window_projects_people_event_and_topics() {
	let store = Arc::new(MemoryStore::with_messages(alice_and_bob()));
	let summarizer = Arc::new(ScriptedSummarizer::replying("Alice and Bob fixed the deploy."));
	let extractor =
		Arc::new(ScriptedExtractor::replying("Alice,Bob;infra,bug;fixed the deploy pipeline"));
	let svc = service(test_config(), &store, &summarizer, &extractor);
	let distilled =
		svc.distill_window(&target(), window_zero()).await.expect("Window must succeed.");

	assert_eq!(distilled.items.len(), 1);
	assert_eq!(distilled.events.len(), 1);
	assert_eq!(distilled.report.messages_fetched, 3);
	assert_eq!(distilled.report.identities_registered, 2);
	assert_eq!(distilled.report.graph_writes, 9);
	assert_eq!(distilled.report.graph_writes_failed, 0);

	let event = &distilled.events[0];

	assert_eq!(event.platform_timestamp, ANCHOR.unix_timestamp());
	assert_eq!(event.in_chat_id, "chat-42");
	assert_eq!(event.in_chat_type, "group");
	assert_eq!(event.evidence_message_ids.len(), 3);
	assert_eq!(event.tags, vec!["infra".to_string(), "bug".to_string()]);
	assert_eq!(event.participants, vec!["Alice".to_string(), "Bob".to_string()]);
	assert_eq!(event.description, "fixed the deploy pipeline");

	let state = store.state();

	assert_eq!(state.graph.upsert_event, 1);
	assert_eq!(state.graph.upsert_person, 2);
	assert_eq!(state.graph.upsert_topic, 2);
	assert_eq!(state.graph.link_person_event, 2);
	assert_eq!(state.graph.link_event_topic, 2);
	assert_eq!(state.graph.topics.len(), 2);
	assert_eq!(state.identities.len(), 2);
	assert_eq!(state.links.len(), 2);

	for identity in state.identities.values() {
		assert!(state.links.contains(&(event.id, identity.id)));
	}
}

#[tokio::test]
async fn rerunning_a_window_refreshes_instead_of_duplicating() {
	let store = Arc::new(MemoryStore::with_messages(alice_and_bob()));
	let summarizer = Arc::new(ScriptedSummarizer::replying("summary"));
	let extractor = Arc::new(ScriptedExtractor::replying("Alice;deploy;Alice fixed CI"));
	let svc = service(test_config(), &store, &summarizer, &extractor);
	let first = svc.distill_window(&target(), window_zero()).await.expect("First run failed.");
	let second = svc.distill_window(&target(), window_zero()).await.expect("Second run failed.");

	assert_eq!(first.events[0].id, second.events[0].id);

	let state = store.state();

	assert_eq!(state.events.len(), 1);
	assert_eq!(state.identities.len(), 2);
	assert_eq!(state.links.len(), 1);
	assert_eq!(state.graph.persons.len(), 1);
	assert_eq!(state.graph.contributed.len(), 1);
	assert_eq!(state.graph.mentions.len(), 1);
}

#[tokio::test]
async fn items_sharing_a_description_persist_as_separate_events() {
	let store = Arc::new(MemoryStore::with_messages(alice_and_bob()));
	let summarizer = Arc::new(ScriptedSummarizer::replying("summary"));
	let extractor =
		Arc::new(ScriptedExtractor::replying("Alice;infra;fixed it\nBob;billing;fixed it"));
	let svc = service(test_config(), &store, &summarizer, &extractor);
	let first = svc.distill_window(&target(), window_zero()).await.expect("First run failed.");
	let second = svc.distill_window(&target(), window_zero()).await.expect("Second run failed.");

	assert_eq!(first.items.len(), 2);
	assert_eq!(first.report.events_persisted, 2);
	assert_ne!(first.events[0].id, first.events[1].id);
	assert_eq!(
		first.events.iter().map(|event| event.id).collect::<Vec<_>>(),
		second.events.iter().map(|event| event.id).collect::<Vec<_>>()
	);

	let state = store.state();
	let infra = &state.events[&first.events[0].id];
	let billing = &state.events[&first.events[1].id];

	assert_eq!(state.events.len(), 2);
	assert_eq!(infra.tags, vec!["infra".to_string()]);
	assert_eq!(infra.participants, vec!["Alice".to_string()]);
	assert_eq!(billing.tags, vec!["billing".to_string()]);
	assert_eq!(billing.participants, vec!["Bob".to_string()]);
	assert_eq!(state.links.len(), 2);
	assert!(state.graph.mentions.contains(&(infra.id, "infra".to_string())));
	assert!(state.graph.mentions.contains(&(billing.id, "billing".to_string())));
	assert_eq!(state.graph.mentions.len(), 2);
}

#[tokio::test]
async fn failing_item_does_not_stop_its_siblings() {
	let store = Arc::new(MemoryStore {
		fail_event_for: Some("second thing".to_string()),
		..MemoryStore::with_messages(alice_and_bob())
	});
	let summarizer = Arc::new(ScriptedSummarizer::replying("summary"));
	let extractor = Arc::new(ScriptedExtractor::replying(
		"Alice;a;first thing\nBob;b;second thing\nAlice,Bob;c;third thing",
	));
	let svc = service(test_config(), &store, &summarizer, &extractor);
	let distilled =
		svc.distill_window(&target(), window_zero()).await.expect("Window must succeed.");

	assert_eq!(distilled.items.len(), 3);
	assert_eq!(distilled.report.events_persisted, 2);
	assert_eq!(distilled.report.events_failed, 1);
	assert_eq!(store.state().event_attempts, 3);
	assert_eq!(store.state().graph.upsert_event, 2);
}

#[tokio::test]
async fn unresolvable_participant_stays_in_the_event_only() {
	let store = Arc::new(MemoryStore {
		fail_identity_for: Some("200".to_string()),
		..MemoryStore::with_messages(alice_and_bob())
	});
	let summarizer = Arc::new(ScriptedSummarizer::replying("summary"));
	let extractor = Arc::new(ScriptedExtractor::replying("Alice,Bob,Carol;ops;pair debugging"));
	let svc = service(test_config(), &store, &summarizer, &extractor);
	let distilled =
		svc.distill_window(&target(), window_zero()).await.expect("Window must succeed.");

	assert_eq!(distilled.report.identities_registered, 1);
	assert_eq!(distilled.report.identities_failed, 1);
	assert_eq!(
		distilled.events[0].participants,
		vec!["Alice".to_string(), "Bob".to_string(), "Carol".to_string()]
	);

	let state = store.state();

	assert_eq!(state.links.len(), 1);
	assert_eq!(state.graph.upsert_person, 1);
	assert_eq!(state.graph.link_person_event, 1);
}

#[tokio::test]
async fn reply_quotes_stay_inside_the_window() {
	let end = ANCHOR.unix_timestamp();
	let mut messages = alice_and_bob();

	messages.push(message("0", end - DAY - 60, ("100", "Alice"), "yesterday's note", None));
	messages.push(message("4", end - 60, ("200", "Bob"), "re: yesterday", Some("0")));

	let store = Arc::new(MemoryStore::with_messages(messages));
	let summarizer = Arc::new(ScriptedSummarizer::replying("summary"));
	let extractor = Arc::new(ScriptedExtractor::replying(""));
	let svc = service(test_config(), &store, &summarizer, &extractor);

	svc.distill_window(&target(), window_zero()).await.expect("Window must succeed.");

	let lines = summarizer.last_input();

	assert_eq!(lines.len(), 4);
	assert!(lines[0].ends_with("Bob: re: yesterday"));
	assert!(lines[2].ends_with("Bob: looking (reply to: the deploy pipeline ...)"));
}

#[tokio::test]
async fn empty_window_fails_before_summarizing() {
	let store = Arc::new(MemoryStore::default());
	let summarizer = Arc::new(ScriptedSummarizer::replying("unused"));
	let extractor = Arc::new(ScriptedExtractor::replying("unused"));
	let svc = service(test_config(), &store, &summarizer, &extractor);
	let failure =
		svc.distill_window(&target(), window_zero()).await.expect_err("Window must fail.");

	assert_eq!(failure.stage, FailedStage::Summarizing);
	assert!(matches!(failure.error, Error::EmptyInput { .. }));
	assert_eq!(summarizer.count(), 0);
	assert_eq!(extractor.count(), 0);
}

#[tokio::test]
async fn fatal_stages_are_reported() {
	let summarizer_down = Arc::new(ScriptedSummarizer::failing("503"));
	let blank_summary = Arc::new(ScriptedSummarizer::replying("   "));
	let ok_summarizer = Arc::new(ScriptedSummarizer::replying("summary"));
	let ok_extractor = Arc::new(ScriptedExtractor::replying("Alice;x;y"));
	let extractor_down = Arc::new(ScriptedExtractor::failing("503"));
	let store = Arc::new(MemoryStore::with_messages(alice_and_bob()));
	let cases = [
		(&summarizer_down, &ok_extractor, FailedStage::Summarizing),
		(&blank_summary, &ok_extractor, FailedStage::Summarizing),
		(&ok_summarizer, &extractor_down, FailedStage::Extracting),
	];

	for (summarizer, extractor, stage) in cases {
		let svc = service(test_config(), &store, summarizer, extractor);
		let failure =
			svc.distill_window(&target(), window_zero()).await.expect_err("Window must fail.");

		assert_eq!(failure.stage, stage);
	}

	let broken_store = Arc::new(MemoryStore {
		fail_fetch_for_start: Some(window_zero().start_ts()),
		..Default::default()
	});
	let svc = service(test_config(), &broken_store, &ok_summarizer, &ok_extractor);
	let failure =
		svc.distill_window(&target(), window_zero()).await.expect_err("Window must fail.");

	assert_eq!(failure.stage, FailedStage::Fetching);
	assert_eq!(ok_extractor.count(), 0);
}

#[tokio::test]
async fn failed_window_does_not_cancel_the_run() {
	let store = Arc::new(MemoryStore {
		fail_fetch_for_start: Some(ANCHOR.unix_timestamp() - 3 * DAY),
		..MemoryStore::with_messages(alice_and_bob())
	});
	let summarizer = Arc::new(ScriptedSummarizer::replying("summary"));
	let extractor = Arc::new(ScriptedExtractor::replying("Alice;x;did a thing"));
	let mut cfg = test_config();

	cfg.pipeline.max_concurrent_windows = 2;

	let svc = service(cfg, &store, &summarizer, &extractor);
	let report = svc
		.run_at(&ConversationSelector::ChatId("chat-42".to_string()), 3, ANCHOR)
		.await
		.expect("Run must succeed.");

	assert_eq!(report.outcomes.len(), 3);
	assert_eq!(store.state().fetch_calls, 3);

	let offsets: Vec<u32> = report.outcomes.iter().map(|outcome| outcome.window.offset).collect();

	assert_eq!(offsets, vec![0, 1, 2]);
	assert_eq!(report.succeeded().count(), 1);

	let failed: Vec<(u32, FailedStage)> =
		report.failed().map(|(window, failure)| (window.offset, failure.stage)).collect();

	// Window 1 has no messages, window 2 cannot be fetched.
	assert_eq!(failed, vec![(1, FailedStage::Summarizing), (2, FailedStage::Fetching)]);
}

#[tokio::test]
async fn slow_window_times_out_alone() {
	let store = Arc::new(MemoryStore::with_messages(alice_and_bob()));
	let summarizer = Arc::new(ScriptedSummarizer {
		delay: Some(Duration::from_millis(500)),
		..ScriptedSummarizer::replying("summary")
	});
	let extractor = Arc::new(ScriptedExtractor::replying("Alice;x;y"));
	let mut cfg = test_config();

	cfg.pipeline.window_timeout_ms = 20;

	let svc = service(cfg, &store, &summarizer, &extractor);
	let report = svc
		.run_at(&ConversationSelector::ChatId("chat-42".to_string()), 2, ANCHOR)
		.await
		.expect("Run must succeed.");
	let stages: Vec<FailedStage> = report.failed().map(|(_, failure)| failure.stage).collect();

	// Window 0 is slow; window 1 is empty and fails before reaching the summarizer.
	assert_eq!(stages, vec![FailedStage::Timeout, FailedStage::Summarizing]);
	assert_eq!(extractor.count(), 0);
}

#[test]
fn timed_out_window_records_its_total_duration() {
	let recorder = PrometheusBuilder::new().build_recorder();
	let handle = recorder.handle();
	let runtime = tokio::runtime::Builder::new_current_thread()
		.enable_time()
		.build()
		.expect("Failed to build runtime.");
	let store = Arc::new(MemoryStore::with_messages(alice_and_bob()));
	let summarizer = Arc::new(ScriptedSummarizer {
		delay: Some(Duration::from_millis(500)),
		..ScriptedSummarizer::replying("summary")
	});
	let extractor = Arc::new(ScriptedExtractor::replying("Alice;x;y"));
	let mut cfg = test_config();

	cfg.pipeline.window_timeout_ms = 20;

	let svc = service(cfg, &store, &summarizer, &extractor);
	let selector = ConversationSelector::ChatId("chat-42".to_string());
	let report = metrics::with_local_recorder(&recorder, || {
		runtime.block_on(svc.run_at(&selector, 1, ANCHOR))
	})
	.expect("Run must succeed.");
	let stages: Vec<FailedStage> = report.failed().map(|(_, failure)| failure.stage).collect();

	assert_eq!(stages, vec![FailedStage::Timeout]);

	let rendered = handle.render();
	let total_errors = rendered.lines().find(|line| {
		line.starts_with("still_distill_duration_seconds_count")
			&& line.contains(r#"step="total""#)
			&& line.contains(r#"status="error""#)
	});

	assert_eq!(total_errors.and_then(|line| line.rsplit(' ').next()), Some("1"), "{rendered}");
}

#[tokio::test]
async fn graph_projection_can_be_disabled() {
	let store = Arc::new(MemoryStore::with_messages(alice_and_bob()));
	let summarizer = Arc::new(ScriptedSummarizer::replying("summary"));
	let extractor = Arc::new(ScriptedExtractor::replying("Alice,Bob;deploy;shipped"));
	let mut cfg = test_config();

	cfg.graph.enabled = false;

	let svc = service(cfg, &store, &summarizer, &extractor);
	let distilled =
		svc.distill_window(&target(), window_zero()).await.expect("Window must succeed.");

	assert_eq!(distilled.report.events_persisted, 1);
	assert_eq!(distilled.report.graph_writes, 0);
	assert_eq!(store.state().graph.upsert_event, 0);
	assert_eq!(store.state().links.len(), 2);
}

#[tokio::test]
async fn run_rejects_zero_or_unrepresentable_days_and_unknown_ranks() {
	let store = Arc::new(MemoryStore::default());
	let summarizer = Arc::new(ScriptedSummarizer::replying("summary"));
	let extractor = Arc::new(ScriptedExtractor::replying(""));
	let svc = service(test_config(), &store, &summarizer, &extractor);
	let zero = svc.run_at(&ConversationSelector::ChatId("chat-42".to_string()), 0, ANCHOR).await;

	assert!(matches!(zero, Err(Error::InvalidRequest { .. })));

	let too_far =
		svc.run_at(&ConversationSelector::ChatId("chat-42".to_string()), 5_000_000, ANCHOR).await;

	assert!(matches!(too_far, Err(Error::InvalidRequest { .. })));

	let missing = svc.run_at(&ConversationSelector::Rank(0), 1, ANCHOR).await;

	assert!(matches!(missing, Err(Error::NotFound { .. })));
	assert_eq!(store.state().fetch_calls, 0);
}

#[tokio::test]
async fn rank_selects_by_message_count_and_chat_type_falls_back() {
	let now = OffsetDateTime::now_utc();
	let store = Arc::new(MemoryStore {
		conversations: vec![
			Conversation {
				in_chat_id: "chat-42".to_string(),
				message_count: 10,
				chat_name: None,
				chat_type: None,
			},
			Conversation {
				in_chat_id: "chat-7".to_string(),
				message_count: 3,
				chat_name: Some("Ops".to_string()),
				chat_type: Some("channel".to_string()),
			},
		],
		joined: Some(JoinedChat {
			id: Uuid::new_v4(),
			platform: "telegram".to_string(),
			chat_id: "chat-7".to_string(),
			chat_name: "Ops".to_string(),
			chat_type: "channel".to_string(),
			dialog_date: 0,
			created_at: now,
			updated_at: now,
		}),
		..Default::default()
	});
	let summarizer = Arc::new(ScriptedSummarizer::replying("summary"));
	let extractor = Arc::new(ScriptedExtractor::replying(""));
	let svc = service(test_config(), &store, &summarizer, &extractor);
	let top = svc.resolve_conversation(&ConversationSelector::Rank(0)).await.expect("rank 0");
	let second = svc.resolve_conversation(&ConversationSelector::Rank(1)).await.expect("rank 1");

	assert_eq!(top, target());
	assert_eq!(
		second,
		ConversationTarget { chat_id: "chat-7".to_string(), chat_type: "channel".to_string() }
	);
}
