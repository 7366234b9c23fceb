//! Retry policy and backoff computation.
//!
//! The portal throttles aggressive clients per IP and per account, so the
//! scheduler backs off exponentially between scan cycles, with jitter to
//! avoid thundering along with every other bot watching the same calendar.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

/// Immutable retry configuration, constructed once per run.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "PolicyConfig")]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub max_duration: Duration,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub multiplier: f64,
	pub jitter: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		PolicyConfig::default().into()
	}
}

/// On-disk shape of the policy: plain integers, all optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", default)]
struct PolicyConfig {
	max_attempts: u32,
	max_duration_secs: u64,
	base_delay_ms: u64,
	max_delay_ms: u64,
	multiplier: f64,
	jitter_ms: u64,
}

impl Default for PolicyConfig {
	fn default() -> Self {
		Self {
			max_attempts: 500,
			max_duration_secs: 6 * 60 * 60,
			base_delay_ms: 2_000,
			max_delay_ms: 60_000,
			multiplier: 1.5,
			jitter_ms: 3_000,
		}
	}
}

impl From<PolicyConfig> for RetryPolicy {
	fn from(cfg: PolicyConfig) -> Self {
		Self {
			max_attempts: cfg.max_attempts,
			max_duration: Duration::from_secs(cfg.max_duration_secs),
			base_delay: Duration::from_millis(cfg.base_delay_ms),
			max_delay: Duration::from_millis(cfg.max_delay_ms),
			multiplier: cfg.multiplier,
			jitter: Duration::from_millis(cfg.jitter_ms),
		}
	}
}

impl RetryPolicy {
	/// Delay before the next cycle: `min(max_delay, base * multiplier^attempt)`
	/// plus a uniform random jitter in `[0, jitter]`.
	pub fn backoff_delay(&self, attempt: u32) -> Duration {
		let base = self.raw_delay(attempt);
		let jitter_ms = self.jitter.as_millis() as u64;
		if jitter_ms == 0 {
			return base;
		}
		base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
	}

	/// Backoff delay without the jitter term.
	pub fn raw_delay(&self, attempt: u32) -> Duration {
		let scaled = self.base_delay.as_millis() as f64 * self.multiplier.powi(attempt.min(64) as i32);
		let capped = scaled.min(self.max_delay.as_millis() as f64);
		Duration::from_millis(capped as u64)
	}
}
