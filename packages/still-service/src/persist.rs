use std::collections::HashSet;

use uuid::Uuid;

use crate::{
	IdentityMap, ResolvedIdentity, Result, StillService,
	telemetry::{Step, StepTimer},
};
use still_domain::{extraction::ExtractedItem, text, window::Window};
use still_storage::models::{Event, NewEvent};

/// Namespace for deterministic event ids.
pub const EVENT_NAMESPACE: Uuid = Uuid::from_u128(0x6d1f_3c2a_8b4e_5f70_9a1c_2e3d_4b5a_6c7e);

/// Where and when an extracted item happened, shared by every item of a window.
pub struct EventContext<'a> {
	pub window: &'a Window,
	pub platform: &'a str,
	pub chat_id: &'a str,
	pub chat_type: &'a str,
	pub evidence_ids: &'a [Uuid],
	pub identities: &'a IdentityMap,
}

#[derive(Clone, Debug)]
pub struct PersistedEvent {
	pub event: Event,
	/// Identities linked to the event, one entry per identity.
	pub participants: Vec<ResolvedIdentity>,
	pub link_failures: usize,
}

/// Stable id for an event extracted from one window of one conversation.
///
/// `occurrence` counts identical items earlier in the same window, so repeated records stay
/// distinct while a rerun with the same extraction maps every item back to its row.
pub fn event_id(
	platform: &str,
	chat_id: &str,
	window_end_ts: i64,
	item: &ExtractedItem,
	occurrence: usize,
) -> Uuid {
	let name = format!(
		"{platform}\n{chat_id}\n{window_end_ts}\n{}\n{}\n{}\n{occurrence}",
		item.participants.join(","),
		item.tags.join(","),
		item.description
	);

	Uuid::new_v5(&EVENT_NAMESPACE, name.as_bytes())
}

pub fn build_event(
	item: &ExtractedItem,
	occurrence: usize,
	ctx: &EventContext<'_>,
	max_name_chars: usize,
) -> NewEvent {
	let end_ts = ctx.window.end_ts();

	NewEvent {
		id: event_id(ctx.platform, ctx.chat_id, end_ts, item, occurrence),
		platform: ctx.platform.to_string(),
		name: text::truncate_runes(&item.description, max_name_chars),
		tags: item.tags.clone(),
		description: item.description.clone(),
		participants: item.participants.clone(),
		in_chat_id: ctx.chat_id.to_string(),
		in_chat_type: ctx.chat_type.to_string(),
		platform_timestamp: end_ts,
		evidence_message_ids: ctx.evidence_ids.to_vec(),
	}
}

impl StillService {
	/// Writes one event, then links each resolvable participant at most once.
	///
	/// Only the event write can fail the call. Link failures are logged and counted.
	pub async fn persist_item(
		&self,
		item: &ExtractedItem,
		occurrence: usize,
		ctx: &EventContext<'_>,
	) -> Result<PersistedEvent> {
		let timer = StepTimer::start(Step::PersistEvent);
		let draft =
			build_event(item, occurrence, ctx, self.cfg.pipeline.max_event_name_chars as usize);
		let result = self.stores.events.upsert_event(&draft).await;

		timer.finish(result.is_ok());

		let event = result?;
		let mut linked = HashSet::new();
		let mut participants = Vec::new();
		let mut link_failures = 0;

		for identity in ctx.identities.resolve_all(&item.participants) {
			if !linked.insert(identity.id) {
				continue;
			}

			match self.stores.events.link_identity(event.id, identity.id).await {
				Ok(()) => participants.push(identity),
				Err(err) => {
					tracing::warn!(
						error = %err,
						event_id = %event.id,
						identity_id = %identity.id,
						"Failed to link identity to event."
					);

					link_failures += 1;
				},
			}
		}

		let unresolved = item.participants.iter().filter(|name| ctx.identities.get(name).is_none());

		for name in unresolved {
			tracing::debug!(event_id = %event.id, participant = %name, "Participant has no identity.");
		}

		Ok(PersistedEvent { event, participants, link_failures })
	}
}
