use std::time::Duration;

use futures::{StreamExt, stream};
use time::OffsetDateTime;

use crate::{
	ConversationSelector, ConversationTarget, Error, FailedStage, Result, StillService,
	WindowDistillation, WindowFailure,
	telemetry::{self, Item, Step, StepTimer},
};
use still_domain::window::{self, Window};

#[derive(Debug)]
pub struct WindowOutcome {
	pub window: Window,
	pub result: Result<WindowDistillation, WindowFailure>,
}

#[derive(Debug)]
pub struct RunReport {
	pub target: ConversationTarget,
	/// One outcome per window, ordered by offset.
	pub outcomes: Vec<WindowOutcome>,
}
impl RunReport {
	pub fn succeeded(&self) -> impl Iterator<Item = &WindowDistillation> {
		self.outcomes.iter().filter_map(|outcome| outcome.result.as_ref().ok())
	}

	pub fn failed(&self) -> impl Iterator<Item = (&Window, &WindowFailure)> {
		self.outcomes
			.iter()
			.filter_map(|outcome| outcome.result.as_ref().err().map(|err| (&outcome.window, err)))
	}
}

impl StillService {
	/// Distills the last `day_count` whole days before now, one window per day.
	pub async fn run(&self, selector: &ConversationSelector, day_count: u32) -> Result<RunReport> {
		self.run_at(selector, day_count, OffsetDateTime::now_utc()).await
	}

	/// Like [`StillService::run`] with an explicit anchor for the most recent window's end.
	///
	/// Only invalid input or an unresolvable selector fail the run. Window failures are reported
	/// in the returned outcomes and never cancel sibling windows.
	pub async fn run_at(
		&self,
		selector: &ConversationSelector,
		day_count: u32,
		anchor: OffsetDateTime,
	) -> Result<RunReport> {
		if day_count == 0 {
			return Err(Error::InvalidRequest {
				message: "Day count must be greater than zero.".to_string(),
			});
		}

		let length = time::Duration::hours(i64::from(self.cfg.pipeline.window_hours));
		let Some(windows) = window::partition(anchor, day_count, length) else {
			return Err(Error::InvalidRequest {
				message: format!("Day count {day_count} reaches past the supported date range."),
			});
		};
		let target = self.resolve_conversation(selector).await?;
		let concurrency = match self.cfg.pipeline.max_concurrent_windows {
			0 => windows.len(),
			limit => limit as usize,
		};
		let deadline = match self.cfg.pipeline.window_timeout_ms {
			0 => None,
			ms => Some(Duration::from_millis(ms)),
		};

		tracing::info!(
			chat_id = %target.chat_id,
			chat_type = %target.chat_type,
			day_count,
			concurrency,
			"Starting distillation run."
		);

		let target_ref = &target;
		let mut outcomes: Vec<WindowOutcome> = stream::iter(windows)
			.map(|window| async move {
				let result = self.distill_with_deadline(target_ref, window, deadline).await;

				WindowOutcome { window, result }
			})
			.buffer_unordered(concurrency)
			.collect()
			.await;

		outcomes.sort_by_key(|outcome| outcome.window.offset);

		let failed = outcomes.iter().filter(|outcome| outcome.result.is_err()).count();

		tracing::info!(
			chat_id = %target.chat_id,
			windows = outcomes.len(),
			failed,
			"Distillation run finished."
		);

		Ok(RunReport { target, outcomes })
	}

	async fn distill_with_deadline(
		&self,
		target: &ConversationTarget,
		window: Window,
		deadline: Option<Duration>,
	) -> Result<WindowDistillation, WindowFailure> {
		let Some(deadline) = deadline else {
			return self.distill_window(target, window).await;
		};

		// Covers windows whose inner timer is dropped on timeout.
		let total = StepTimer::start(Step::Total);

		match tokio::time::timeout(deadline, self.distill_window(target, window)).await {
			Ok(result) => result,
			Err(_) => {
				total.finish(false);
				telemetry::count(Item::WindowsFailed, 1);
				tracing::error!(
					chat_id = %target.chat_id,
					offset = window.offset,
					start = %window.start,
					end = %window.end,
					timeout_ms = deadline.as_millis() as u64,
					"Window timed out."
				);

				Err(WindowFailure::new(
					FailedStage::Timeout,
					Error::Timeout {
						message: format!("Window {} exceeded {deadline:?}.", window.offset),
					},
				))
			},
		}
	}
}
