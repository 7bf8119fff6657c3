use std::fmt;

use crate::{
	ConversationTarget, Error, StillService,
	persist::EventContext,
	telemetry::{self, Item, Step, StepTimer},
};
use still_domain::{extraction::ExtractedItem, window::Window};
use still_storage::models::Event;

/// Progress of one window through the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
	Fetching,
	Resolving,
	Summarizing,
	Extracting,
	Persisting,
	Done,
}
impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Fetching => "fetching",
			Self::Resolving => "resolving",
			Self::Summarizing => "summarizing",
			Self::Extracting => "extracting",
			Self::Persisting => "persisting",
			Self::Done => "done",
		};

		f.write_str(name)
	}
}

/// The stages that end a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailedStage {
	Fetching,
	Summarizing,
	Extracting,
	Timeout,
}
impl fmt::Display for FailedStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Fetching => "fetching",
			Self::Summarizing => "summarizing",
			Self::Extracting => "extracting",
			Self::Timeout => "timeout",
		};

		f.write_str(name)
	}
}

#[derive(Debug, thiserror::Error)]
#[error("Window failed while {stage}: {error}")]
pub struct WindowFailure {
	pub stage: FailedStage,
	#[source]
	pub error: Error,
}
impl WindowFailure {
	pub fn new(stage: FailedStage, error: Error) -> Self {
		Self { stage, error }
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowReport {
	pub messages_fetched: usize,
	pub identities_registered: usize,
	pub identities_failed: usize,
	pub items_extracted: usize,
	pub events_persisted: usize,
	pub events_failed: usize,
	pub identity_links_failed: usize,
	pub graph_writes: usize,
	pub graph_writes_failed: usize,
}

#[derive(Clone, Debug)]
pub struct WindowDistillation {
	pub window: Window,
	/// Every extracted item, whether or not it was persisted.
	pub items: Vec<ExtractedItem>,
	pub events: Vec<Event>,
	pub report: WindowReport,
}

impl StillService {
	/// Runs one window end to end: fetch, register senders, summarize, extract, then persist and
	/// project each item.
	///
	/// Fetch, summarize and extract failures end the window. Everything after extraction fails per
	/// record and is reflected in the report only.
	pub async fn distill_window(
		&self,
		target: &ConversationTarget,
		window: Window,
	) -> Result<WindowDistillation, WindowFailure> {
		let total = StepTimer::start(Step::Total);
		let result = self.distill_window_inner(target, window).await;

		total.finish(result.is_ok());

		match &result {
			Ok(distillation) => tracing::info!(
				chat_id = %target.chat_id,
				offset = window.offset,
				start = %window.start,
				end = %window.end,
				items = distillation.items.len(),
				events = distillation.report.events_persisted,
				"Window distilled."
			),
			Err(failure) => {
				telemetry::count(Item::WindowsFailed, 1);
				tracing::error!(
					chat_id = %target.chat_id,
					offset = window.offset,
					start = %window.start,
					end = %window.end,
					stage = %failure.stage,
					error = %failure.error,
					"Window failed."
				);
			},
		}

		result
	}

	async fn distill_window_inner(
		&self,
		target: &ConversationTarget,
		window: Window,
	) -> Result<WindowDistillation, WindowFailure> {
		let mut report = WindowReport::default();

		tracing::debug!(offset = window.offset, stage = %Stage::Fetching, "Window stage.");

		let fetched = self
			.fetch_window(&target.chat_id, &window)
			.await
			.map_err(|err| WindowFailure::new(FailedStage::Fetching, err))?;

		report.messages_fetched = fetched.messages.len();

		tracing::debug!(offset = window.offset, stage = %Stage::Resolving, "Window stage.");

		let registration = self.register_identities(&fetched.messages).await;

		report.identities_registered = registration.registered;
		report.identities_failed = registration.failed;

		tracing::debug!(offset = window.offset, stage = %Stage::Summarizing, "Window stage.");

		let summary = self
			.summarize(&fetched.lines)
			.await
			.map_err(|err| WindowFailure::new(FailedStage::Summarizing, err))?;

		tracing::debug!(offset = window.offset, stage = %Stage::Extracting, "Window stage.");

		let items = self
			.extract(&summary)
			.await
			.map_err(|err| WindowFailure::new(FailedStage::Extracting, err))?;

		report.items_extracted = items.len();

		tracing::debug!(offset = window.offset, stage = %Stage::Persisting, "Window stage.");

		let evidence_ids = fetched.evidence_ids();
		let ctx = EventContext {
			window: &window,
			platform: fetched.platform().unwrap_or_default(),
			chat_id: &target.chat_id,
			chat_type: &target.chat_type,
			evidence_ids: &evidence_ids,
			identities: &registration.identities,
		};
		let mut events = Vec::with_capacity(items.len());

		for (idx, item) in items.iter().enumerate() {
			let occurrence = items[..idx].iter().filter(|earlier| *earlier == item).count();
			let persisted = match self.persist_item(item, occurrence, &ctx).await {
				Ok(persisted) => persisted,
				Err(err) => {
					tracing::warn!(
						error = %err,
						offset = window.offset,
						description = %item.description,
						"Failed to persist event."
					);

					report.events_failed += 1;

					continue;
				},
			};

			report.events_persisted += 1;
			report.identity_links_failed += persisted.link_failures;

			if self.cfg.graph.enabled {
				let projection = self.project_event(&persisted.event, &persisted.participants).await;

				report.graph_writes += projection.writes;
				report.graph_writes_failed += projection.failed;
			}

			events.push(persisted.event);
		}

		telemetry::count(Item::EventsPersisted, report.events_persisted);
		telemetry::count(Item::EventsFailed, report.events_failed);
		telemetry::count(Item::IdentityLinksFailed, report.identity_links_failed);
		telemetry::count(Item::GraphWritesFailed, report.graph_writes_failed);
		tracing::debug!(offset = window.offset, stage = %Stage::Done, "Window stage.");

		Ok(WindowDistillation { window, items, events, report })
	}
}
