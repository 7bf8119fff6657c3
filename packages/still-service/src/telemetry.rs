//! Distillation metrics, recorded through the `metrics` facade.
//!
//! Nothing is exported unless the binary installs a recorder.

use std::time::Instant;

use metrics::{counter, histogram};

pub const DURATION_SECONDS: &str = "still_distill_duration_seconds";
pub const ITEMS_TOTAL: &str = "still_distill_items_total";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
	QueryMessages,
	RegisterIdentities,
	Summarize,
	Extract,
	PersistEvent,
	ProjectGraph,
	Total,
}
impl Step {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::QueryMessages => "query_messages",
			Self::RegisterIdentities => "register_identities",
			Self::Summarize => "summarize",
			Self::Extract => "extract",
			Self::PersistEvent => "persist_event",
			Self::ProjectGraph => "project_graph",
			Self::Total => "total",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Item {
	MessagesFetched,
	IdentitiesRegistered,
	IdentitiesFailed,
	ItemsExtracted,
	EventsPersisted,
	EventsFailed,
	IdentityLinksFailed,
	GraphWritesFailed,
	WindowsFailed,
}
impl Item {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::MessagesFetched => "messages_fetched",
			Self::IdentitiesRegistered => "identities_registered",
			Self::IdentitiesFailed => "identities_failed",
			Self::ItemsExtracted => "items_extracted",
			Self::EventsPersisted => "events_persisted",
			Self::EventsFailed => "events_failed",
			Self::IdentityLinksFailed => "identity_links_failed",
			Self::GraphWritesFailed => "graph_writes_failed",
			Self::WindowsFailed => "windows_failed",
		}
	}
}

/// Measures one step from construction until [`StepTimer::finish`].
pub struct StepTimer {
	step: Step,
	started: Instant,
}
impl StepTimer {
	pub fn start(step: Step) -> Self {
		Self { step, started: Instant::now() }
	}

	pub fn finish(self, success: bool) {
		let status = if success { "success" } else { "error" };

		histogram!(DURATION_SECONDS, "step" => self.step.as_str(), "status" => status)
			.record(self.started.elapsed().as_secs_f64());
	}
}

pub fn count(item: Item, value: usize) {
	if value == 0 {
		return;
	}

	counter!(ITEMS_TOTAL, "type" => item.as_str()).increment(value as u64);
}
