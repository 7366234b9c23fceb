//! Scheduler behavior against scripted portal responses.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use prenota::{AttemptResult, BotError, Portal, Result, RetryPolicy, RetryScheduler, RunOutcome, SlotCandidate};
use tokio_util::sync::CancellationToken;

fn slot(booking_ref: &str) -> SlotCandidate {
	SlotCandidate {
		date: "2024-05-10".parse().unwrap(),
		time: "09:00:00".parse().unwrap(),
		office: "Consulate".into(),
		service: "Passport".into(),
		booking_ref: booking_ref.into(),
	}
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
	RetryPolicy {
		max_attempts,
		max_duration: Duration::from_secs(3600),
		base_delay: Duration::from_millis(10),
		max_delay: Duration::from_secs(1),
		multiplier: 1.0,
		jitter: Duration::ZERO,
	}
}

#[derive(Default)]
struct ScriptedPortal {
	auth_script: VecDeque<Result<()>>,
	scan_script: VecDeque<Result<Vec<SlotCandidate>>>,
	attempt_script: VecDeque<Result<AttemptResult>>,
	/// Returned whenever the scan script runs dry.
	default_scan: Vec<SlotCandidate>,
	auth_calls: u32,
	reauth_calls: u32,
	scan_calls: u32,
	attempt_calls: u32,
}

#[async_trait]
impl Portal for ScriptedPortal {
	async fn ensure_authenticated(&mut self) -> Result<()> {
		self.auth_calls += 1;
		self.auth_script.pop_front().unwrap_or(Ok(()))
	}

	async fn reauthenticate(&mut self) -> Result<()> {
		self.reauth_calls += 1;
		Ok(())
	}

	async fn scan(&mut self) -> Result<Vec<SlotCandidate>> {
		self.scan_calls += 1;
		self.scan_script.pop_front().unwrap_or_else(|| Ok(self.default_scan.clone()))
	}

	async fn attempt(&mut self, _slot: &SlotCandidate) -> Result<AttemptResult> {
		self.attempt_calls += 1;
		self.attempt_script.pop_front().unwrap_or(Ok(AttemptResult::SlotTaken))
	}
}

#[tokio::test(start_paused = true)]
async fn books_the_first_slot_that_appears() {
	let mut portal = ScriptedPortal::default();
	portal.scan_script = VecDeque::from([Ok(vec![]), Ok(vec![]), Ok(vec![slot("s1")])]);
	portal.attempt_script = VecDeque::from([Ok(AttemptResult::Success { confirmation: "OK-1".into() })]);

	let scheduler = RetryScheduler::new(fast_policy(100), CancellationToken::new());
	let outcome = scheduler.run(&mut portal).await;

	match outcome {
		RunOutcome::Booked { slot, confirmation } => {
			assert_eq!(confirmation, "OK-1");
			assert_eq!(slot.booking_ref, "s1");
		}
		other => panic!("expected Booked, got {other:?}"),
	}
	assert_eq!(portal.scan_calls, 3, "two empty scans then the hit");
	assert_eq!(portal.attempt_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn contested_slots_exhaust_without_fatal() {
	let mut portal = ScriptedPortal::default();
	// Every scan finds the same candidate; every attempt loses the race.
	portal.default_scan = vec![slot("contested")];

	let scheduler = RetryScheduler::new(fast_policy(4), CancellationToken::new());
	let outcome = scheduler.run(&mut portal).await;

	assert!(matches!(outcome, RunOutcome::Exhausted { attempts: 4 }));
	assert_eq!(portal.attempt_calls, 4);
}

#[tokio::test(start_paused = true)]
async fn invalid_credentials_never_reach_the_scanner() {
	let mut portal = ScriptedPortal::default();
	portal.auth_script = VecDeque::from([Err(BotError::InvalidCredentials)]);

	let scheduler = RetryScheduler::new(fast_policy(10), CancellationToken::new());
	let outcome = scheduler.run(&mut portal).await;

	assert!(matches!(outcome, RunOutcome::Fatal { error: BotError::InvalidCredentials }));
	assert_eq!(portal.scan_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn run_terminates_within_the_duration_bound() {
	let mut portal = ScriptedPortal::default();
	let policy = RetryPolicy {
		max_attempts: u32::MAX,
		max_duration: Duration::from_secs(10),
		base_delay: Duration::from_secs(3),
		max_delay: Duration::from_secs(3),
		multiplier: 1.0,
		jitter: Duration::ZERO,
	};
	let started = tokio::time::Instant::now();
	let scheduler = RetryScheduler::new(policy, CancellationToken::new());
	let outcome = scheduler.run(&mut portal).await;

	assert!(matches!(outcome, RunOutcome::Exhausted { .. }));
	// Liveness bound: max_duration plus at most one backoff interval.
	assert!(started.elapsed() <= Duration::from_secs(13));
}

#[tokio::test(start_paused = true)]
async fn one_expiry_is_absorbed_by_reauthentication() {
	let mut portal = ScriptedPortal::default();
	portal.scan_script = VecDeque::from([Err(BotError::SessionExpired), Ok(vec![slot("s1")])]);
	portal.attempt_script = VecDeque::from([Ok(AttemptResult::Success { confirmation: "OK-2".into() })]);

	let scheduler = RetryScheduler::new(fast_policy(10), CancellationToken::new());
	let outcome = scheduler.run(&mut portal).await;

	assert!(matches!(outcome, RunOutcome::Booked { .. }));
	assert_eq!(portal.reauth_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn consecutive_expiries_escalate_to_fatal() {
	let mut portal = ScriptedPortal::default();
	portal.scan_script = VecDeque::from([Err(BotError::SessionExpired), Err(BotError::SessionExpired)]);

	let scheduler = RetryScheduler::new(fast_policy(10), CancellationToken::new());
	let outcome = scheduler.run(&mut portal).await;

	assert!(matches!(outcome, RunOutcome::Fatal { .. }));
	assert_eq!(portal.reauth_calls, 1, "only the first expiry earns a reauthentication");
}

#[tokio::test(start_paused = true)]
async fn expiry_during_attempt_retries_the_same_candidate_once() {
	let mut portal = ScriptedPortal::default();
	portal.scan_script = VecDeque::from([Ok(vec![slot("s1")])]);
	portal.attempt_script = VecDeque::from([
		Err(BotError::SessionExpired),
		Ok(AttemptResult::Success { confirmation: "OK-3".into() }),
	]);

	let scheduler = RetryScheduler::new(fast_policy(10), CancellationToken::new());
	let outcome = scheduler.run(&mut portal).await;

	assert!(matches!(outcome, RunOutcome::Booked { .. }));
	assert_eq!(portal.attempt_calls, 2);
	assert_eq!(portal.reauth_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn transient_scan_failure_degrades_to_an_empty_cycle() {
	let mut portal = ScriptedPortal::default();
	portal.scan_script = VecDeque::from([
		Err(BotError::transient("calendar markup changed")),
		Ok(vec![slot("s1")]),
	]);
	portal.attempt_script = VecDeque::from([Ok(AttemptResult::Success { confirmation: "OK-4".into() })]);

	let scheduler = RetryScheduler::new(fast_policy(10), CancellationToken::new());
	let outcome = scheduler.run(&mut portal).await;

	assert!(matches!(outcome, RunOutcome::Booked { .. }));
	assert_eq!(portal.scan_calls, 2);
}

#[tokio::test(start_paused = true)]
async fn fatal_attempt_result_aborts_the_run() {
	let mut portal = ScriptedPortal::default();
	portal.scan_script = VecDeque::from([Ok(vec![slot("s1")])]);
	portal.attempt_script = VecDeque::from([Ok(AttemptResult::Fatal {
		reason: "portal returned an error page".into(),
	})]);

	let scheduler = RetryScheduler::new(fast_policy(10), CancellationToken::new());
	let outcome = scheduler.run(&mut portal).await;

	assert!(matches!(outcome, RunOutcome::Fatal { .. }));
}

#[tokio::test(start_paused = true)]
async fn pre_cancelled_run_stops_before_authenticating() {
	let mut portal = ScriptedPortal::default();
	let cancel = CancellationToken::new();
	cancel.cancel();

	let scheduler = RetryScheduler::new(fast_policy(10), cancel);
	let outcome = scheduler.run(&mut portal).await;

	assert!(matches!(outcome, RunOutcome::Cancelled));
	assert_eq!(portal.auth_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_backoff_is_honored() {
	let mut portal = ScriptedPortal::default();
	let policy = RetryPolicy {
		max_attempts: u32::MAX,
		max_duration: Duration::from_secs(3600),
		base_delay: Duration::from_secs(60),
		max_delay: Duration::from_secs(60),
		multiplier: 1.0,
		jitter: Duration::ZERO,
	};
	let cancel = CancellationToken::new();
	let canceller = cancel.clone();
	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_secs(5)).await;
		canceller.cancel();
	});

	let scheduler = RetryScheduler::new(policy, cancel);
	let outcome = scheduler.run(&mut portal).await;
	assert!(matches!(outcome, RunOutcome::Cancelled));
}
