use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

static BOT_MESSAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `{prefix}-{unix_ms}-{counter}-{5 base36 chars}`.
///
/// The process-wide counter keeps ids distinct within the same millisecond.
pub fn generate_bot_message_id(prefix: &str) -> String {
	let n = BOT_MESSAGE_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
	let ms = chrono::Utc::now().timestamp_millis();
	let mut rng = rand::rng();
	let suffix: String = (0..5)
		.filter_map(|_| char::from_digit(rng.random_range(0..36u32), 36))
		.collect();
	format!("{prefix}-{ms}-{n}-{suffix}")
}
