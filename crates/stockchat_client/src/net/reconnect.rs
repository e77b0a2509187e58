use std::time::Duration;

use tokio::time::Instant;

/// Fixed-delay reconnect schedule with an optional attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
	pub delay: Duration,
	/// `None` retries forever.
	pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
	fn default() -> Self {
		Self {
			delay: Duration::from_secs(3),
			max_attempts: None,
		}
	}
}

impl ReconnectPolicy {
	/// Delay before `attempt` (1-based), or `None` once the cap is exceeded.
	pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
		match self.max_attempts {
			Some(max) if attempt > max => None,
			_ => Some(self.delay),
		}
	}
}

pub fn schedule_reconnect(delay: Duration) -> (Instant, u64) {
	let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
	(Instant::now() + delay, ms)
}
