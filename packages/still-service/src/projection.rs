use crate::{
	ResolvedIdentity, StillService,
	telemetry::{Step, StepTimer},
};
use still_storage::models::Event;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProjectionReport {
	pub writes: usize,
	pub failed: usize,
}
impl ProjectionReport {
	fn record(&mut self, ok: bool) {
		self.writes += 1;

		if !ok {
			self.failed += 1;
		}
	}
}

impl StillService {
	/// Mirrors one event, its resolved participants and its tags into the graph.
	///
	/// Each write is independent: a failure is logged and counted, and only the links that depend
	/// on the failed node are skipped.
	pub async fn project_event(
		&self,
		event: &Event,
		participants: &[ResolvedIdentity],
	) -> ProjectionReport {
		let timer = StepTimer::start(Step::ProjectGraph);
		let graph = &self.stores.graph;
		let mut report = ProjectionReport::default();
		let event_ok = match graph.upsert_event(event).await {
			Ok(()) => true,
			Err(err) => {
				tracing::warn!(error = %err, event_id = %event.id, "Failed to merge event node.");

				false
			},
		};

		report.record(event_ok);

		for person in participants {
			let person_ok = match graph
				.upsert_person(&person.platform, &person.platform_user_id, &person.display_name)
				.await
			{
				Ok(()) => true,
				Err(err) => {
					tracing::warn!(
						error = %err,
						platform = %person.platform,
						platform_user_id = %person.platform_user_id,
						"Failed to merge person node."
					);

					false
				},
			};

			report.record(person_ok);

			if !(person_ok && event_ok) {
				continue;
			}

			let linked = graph
				.link_person_event(&person.platform, &person.platform_user_id, event.id)
				.await;

			if let Err(err) = &linked {
				tracing::warn!(
					error = %err,
					event_id = %event.id,
					platform_user_id = %person.platform_user_id,
					"Failed to merge CONTRIBUTED_TO relation."
				);
			}

			report.record(linked.is_ok());
		}

		for tag in &event.tags {
			let topic_ok = match graph.upsert_topic(tag).await {
				Ok(()) => true,
				Err(err) => {
					tracing::warn!(error = %err, topic = %tag, "Failed to merge topic node.");

					false
				},
			};

			report.record(topic_ok);

			if !(topic_ok && event_ok) {
				continue;
			}

			let linked = graph.link_event_topic(event.id, tag).await;

			if let Err(err) = &linked {
				tracing::warn!(
					error = %err,
					event_id = %event.id,
					topic = %tag,
					"Failed to merge MENTIONS relation."
				);
			}

			report.record(linked.is_ok());
		}

		timer.finish(report.failed == 0);

		report
	}
}
