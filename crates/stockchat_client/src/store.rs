//! Append-only, id-deduplicated timeline for one room session.

use std::collections::HashSet;

use stockchat_domain::{ChatEvent, is_bot_message};

#[derive(Debug, Default, Clone)]
pub struct MessageStore {
	events: Vec<ChatEvent>,
	ids: HashSet<String>,
	revision: u64,
}

impl MessageStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append unless an event with the same id is already present.
	///
	/// Returns true when the event was added; `revision` changes only then.
	pub fn append(&mut self, event: ChatEvent) -> bool {
		if self.ids.contains(&event.id) {
			return false;
		}
		self.ids.insert(event.id.clone());
		self.events.push(event);
		self.revision = self.revision.wrapping_add(1);
		true
	}

	/// Bulk `append` in the given order. Returns how many were added.
	pub fn merge(&mut self, events: impl IntoIterator<Item = ChatEvent>) -> usize {
		let mut added = 0;
		for event in events {
			if self.append(event) {
				added += 1;
			}
		}
		added
	}

	/// Bumped on every membership change.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	/// Every stored event, temporary placeholders included.
	pub fn events(&self) -> &[ChatEvent] {
		&self.events
	}

	pub fn len(&self) -> usize {
		self.events.len()
	}

	pub fn is_empty(&self) -> bool {
		self.events.is_empty()
	}

	/// Events to render: append order, temporary ids removed.
	pub fn effective_timeline(&self) -> impl Iterator<Item = &ChatEvent> {
		self.events.iter().filter(|e| !e.is_temporary())
	}

	pub fn has_bot_message(&self) -> bool {
		self.events.iter().any(is_bot_message)
	}

	/// True when a bot event with exactly this content is already present.
	pub fn contains_bot_content(&self, content: &str) -> bool {
		self.events.iter().any(|e| is_bot_message(e) && e.content == content)
	}

	pub fn clear(&mut self) {
		self.events.clear();
		self.ids.clear();
		self.revision = self.revision.wrapping_add(1);
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;
	use stockchat_domain::{Author, UserRef};

	use super::*;

	fn ev(id: &str, content: &str) -> ChatEvent {
		ChatEvent {
			id: id.to_string(),
			content: content.to_string(),
			created_at: String::new(),
			author: Author::User(UserRef::new("alice")),
		}
	}

	#[test]
	fn append_dedups_by_id_only() {
		let mut s = MessageStore::new();
		assert!(s.append(ev("1", "hi")));
		assert!(!s.append(ev("1", "different content")));
		assert!(s.append(ev("2", "hi")));
		assert_eq!(s.len(), 2);
		assert_eq!(s.events()[0].content, "hi");
	}

	#[test]
	fn revision_tracks_membership_changes() {
		let mut s = MessageStore::new();
		let r0 = s.revision();
		s.append(ev("1", "a"));
		let r1 = s.revision();
		assert_ne!(r0, r1);
		s.append(ev("1", "a"));
		assert_eq!(s.revision(), r1);
	}

	#[test]
	fn effective_timeline_hides_temporary_entries() {
		let mut s = MessageStore::new();
		s.append(ev("temp-1", "sending"));
		s.append(ev("10", "sending"));
		let ids: Vec<_> = s.effective_timeline().map(|e| e.id.as_str()).collect();
		assert_eq!(ids, vec!["10"]);
	}

	#[test]
	fn bot_content_guard() {
		let mut s = MessageStore::new();
		s.append(ChatEvent {
			id: "bot-1".into(),
			content: "welcome bob".into(),
			created_at: String::new(),
			author: Author::Bot,
		});
		s.append(ev("2", "welcome carol"));
		assert!(s.has_bot_message());
		assert!(s.contains_bot_content("welcome bob"));
		assert!(!s.contains_bot_content("welcome carol"));
	}

	fn arb_events() -> impl Strategy<Value = Vec<ChatEvent>> {
		prop::collection::vec(("(temp-)?[0-9]{1,2}", "[a-z]{0,4}"), 0..40)
			.prop_map(|v| v.into_iter().map(|(id, c)| ev(&id, &c)).collect())
	}

	proptest! {
		#[test]
		fn double_append_is_idempotent(events in arb_events(), pick in any::<prop::sample::Index>()) {
			let mut once = MessageStore::new();
			once.merge(events.clone());
			let mut twice = once.clone();
			if !events.is_empty() {
				let e = pick.get(&events).clone();
				once.append(e.clone());
				twice.append(e.clone());
				twice.append(e);
			}
			prop_assert_eq!(once.events(), twice.events());
		}

		#[test]
		fn effective_timeline_preserves_first_seen_order(events in arb_events()) {
			let mut s = MessageStore::new();
			s.merge(events.clone());

			let mut seen = HashSet::new();
			let expected: Vec<_> = events
				.iter()
				.filter(|e| seen.insert(e.id.clone()))
				.filter(|e| !e.is_temporary())
				.map(|e| e.id.clone())
				.collect();
			let got: Vec<_> = s.effective_timeline().map(|e| e.id.clone()).collect();
			prop_assert_eq!(got, expected);
		}
	}
}
