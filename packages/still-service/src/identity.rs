use std::collections::HashMap;

use uuid::Uuid;

use crate::{
	StillService,
	telemetry::{self, Item, Step, StepTimer},
};
use still_storage::models::ChatMessage;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIdentity {
	pub id: Uuid,
	pub platform: String,
	pub platform_user_id: String,
	pub display_name: String,
}

/// Display name to identity, scoped to one window.
///
/// Participants are matched by display name only. When two senders used the same name in a
/// window, the one registered first (the most recently active) keeps it.
#[derive(Clone, Debug, Default)]
pub struct IdentityMap {
	by_name: HashMap<String, ResolvedIdentity>,
}
impl IdentityMap {
	pub fn get(&self, display_name: &str) -> Option<&ResolvedIdentity> {
		self.by_name.get(display_name)
	}

	pub fn len(&self) -> usize {
		self.by_name.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_name.is_empty()
	}

	pub fn insert(&mut self, display_name: &str, identity: ResolvedIdentity) {
		self.by_name.entry(display_name.to_string()).or_insert(identity);
	}

	/// Resolves names to distinct identities, in the order the names are given.
	pub fn resolve_all<'a, I>(&self, names: I) -> Vec<ResolvedIdentity>
	where
		I: IntoIterator<Item = &'a String>,
	{
		let mut out: Vec<ResolvedIdentity> = Vec::new();

		for name in names {
			if let Some(identity) = self.get(name)
				&& !out.iter().any(|existing| existing.id == identity.id)
			{
				out.push(identity.clone());
			}
		}

		out
	}
}

#[derive(Clone, Debug, Default)]
pub struct Registration {
	pub identities: IdentityMap,
	pub registered: usize,
	pub failed: usize,
}

struct Sender<'a> {
	platform: &'a str,
	platform_user_id: &'a str,
	newest_name: &'a str,
	names: Vec<&'a str>,
}

/// Distinct senders in first-seen order. With newest-first input the first name seen is the newest.
fn collect_senders(messages: &[ChatMessage]) -> Vec<Sender<'_>> {
	let mut senders: Vec<Sender<'_>> = Vec::new();
	let mut index: HashMap<(&str, &str), usize> = HashMap::new();

	for message in messages {
		let key = (message.platform.as_str(), message.from_id.as_str());
		let name = message.from_name.as_str();

		match index.get(&key) {
			Some(&idx) => {
				let sender = &mut senders[idx];

				if !sender.names.contains(&name) {
					sender.names.push(name);
				}
			},
			None => {
				index.insert(key, senders.len());
				senders.push(Sender {
					platform: key.0,
					platform_user_id: key.1,
					newest_name: name,
					names: vec![name],
				});
			},
		}
	}

	senders
}

impl StillService {
	/// Registers every distinct sender once. Failures leave that sender unresolvable.
	pub async fn register_identities(&self, messages: &[ChatMessage]) -> Registration {
		let timer = StepTimer::start(Step::RegisterIdentities);
		let mut registration = Registration::default();

		for sender in collect_senders(messages) {
			match self
				.stores
				.identities
				.upsert_identity(sender.platform, sender.platform_user_id, sender.newest_name)
				.await
			{
				Ok(identity) => {
					let resolved = ResolvedIdentity {
						id: identity.id,
						platform: identity.platform,
						platform_user_id: identity.platform_user_id,
						display_name: identity.display_name,
					};

					for name in &sender.names {
						registration.identities.insert(name, resolved.clone());
					}

					registration.registered += 1;
				},
				Err(err) => {
					tracing::warn!(
						error = %err,
						platform = sender.platform,
						from_id = sender.platform_user_id,
						from_name = sender.newest_name,
						"Failed to register identity."
					);

					registration.failed += 1;
				},
			}
		}

		timer.finish(registration.failed == 0);
		telemetry::count(Item::IdentitiesRegistered, registration.registered);
		telemetry::count(Item::IdentitiesFailed, registration.failed);

		registration
	}
}
