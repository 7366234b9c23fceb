//! Claiming a discovered slot: the multi-step booking form.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::driver::PageDriver;
use crate::error::{BotError, Result};
use crate::portal;
use crate::types::{AttemptResult, SlotCandidate};

pub struct BookingAttempt {
	driver: Arc<dyn PageDriver>,
	/// Set when a submission may have reached the portal without a readable
	/// outcome. While set, every attempt consults the user area before
	/// touching the form again, so a lost response cannot double-book.
	pending_ambiguous: bool,
	/// Confirmation of a booking already claimed in this run. Once set the
	/// form is never submitted again; repeat attempts report it back.
	confirmed: Option<String>,
}

impl BookingAttempt {
	pub fn new(driver: Arc<dyn PageDriver>) -> Self {
		Self {
			driver,
			pending_ambiguous: false,
			confirmed: None,
		}
	}

	/// Claims `candidate`: select the slot cell, accept the terms, submit,
	/// read the outcome. The scanner has already navigated to the booking
	/// page; the candidate's cell is addressed by its opaque reference.
	pub async fn attempt(&mut self, candidate: &SlotCandidate) -> Result<AttemptResult> {
		if let Some(confirmation) = &self.confirmed {
			debug!(target = "prenota.book", "booking already confirmed in this run; not submitting again");
			return Ok(AttemptResult::Success { confirmation: confirmation.clone() });
		}
		if self.pending_ambiguous {
			// The flag only clears on a definitive probe answer; a failed
			// probe must not unlock a resubmission.
			match self.existing_booking().await? {
				Some(confirmation) => {
					self.pending_ambiguous = false;
					info!(target = "prenota.book", %confirmation, "previous ambiguous submission did book; recovered");
					return Ok(self.confirm(confirmation));
				}
				None => self.pending_ambiguous = false,
			}
		}

		let cell = portal::slot_selector(&candidate.booking_ref);
		if !self.driver.exists(&cell).await? {
			debug!(target = "prenota.book", slot = %candidate.booking_ref, "slot gone between scan and attempt");
			return Ok(AttemptResult::SlotTaken);
		}
		if let Err(err) = self.driver.click(&cell).await {
			// Nothing submitted yet; plain retry territory.
			return Ok(AttemptResult::Transient { reason: err.to_string() });
		}

		if self.driver.exists(portal::ACCEPT_TERMS).await? {
			self.driver.click(portal::ACCEPT_TERMS).await?;
		}
		if !self.driver.exists(portal::BOOK_SUBMIT).await? {
			return Ok(AttemptResult::Transient { reason: "booking form did not open".into() });
		}

		// From here on remote state may have mutated even when we cannot
		// read the response.
		if let Err(err) = self.driver.click(portal::BOOK_SUBMIT).await {
			warn!(target = "prenota.book", error = %err, "submission outcome unknown");
			self.pending_ambiguous = true;
			return Ok(AttemptResult::Transient { reason: err.to_string() });
		}

		self.read_outcome().await
	}

	async fn read_outcome(&mut self) -> Result<AttemptResult> {
		if !self.logged_in().await? {
			self.pending_ambiguous = true;
			return Err(BotError::SessionExpired);
		}

		if self.driver.exists(portal::CONFIRMATION_BOX).await? {
			let confirmation = self.first_text(portal::CONFIRMATION_CODE).await?;
			let confirmation = if confirmation.is_empty() { "confirmed".to_string() } else { confirmation };
			return Ok(self.confirm(confirmation));
		}

		if self.driver.exists(portal::POPUP_OK).await? {
			// Slot-race warning popup; dismiss and move on.
			let _ = self.driver.click(portal::POPUP_OK).await;
			return Ok(AttemptResult::SlotTaken);
		}

		// Unrecognized page after a live submission: check whether the
		// booking actually landed before declaring the state fatal.
		if let Some(confirmation) = self.existing_booking().await? {
			return Ok(self.confirm(confirmation));
		}
		Ok(AttemptResult::Fatal {
			reason: "unrecognized page state after booking submission".into(),
		})
	}

	fn confirm(&mut self, confirmation: String) -> AttemptResult {
		self.confirmed = Some(confirmation.clone());
		AttemptResult::Success { confirmation }
	}

	/// Fresh "do I already hold a booking" probe against the user area.
	async fn existing_booking(&self) -> Result<Option<String>> {
		self.driver.goto(portal::USER_AREA_URL).await?;
		if !self.logged_in().await? {
			return Err(BotError::SessionExpired);
		}
		if !self.driver.exists(portal::RESERVATION_ROW).await? {
			return Ok(None);
		}
		let code = self.first_text(portal::RESERVATION_CODE).await?;
		Ok(Some(if code.is_empty() { "recovered".to_string() } else { code }))
	}

	async fn first_text(&self, selector: &str) -> Result<String> {
		Ok(self.driver.texts(selector).await?.into_iter().next().unwrap_or_default())
	}

	async fn logged_in(&self) -> Result<bool> {
		let class = self.driver.attribute("body", "class").await?.unwrap_or_default();
		Ok(class.split_whitespace().any(|c| c == portal::LOGGED_IN_MARKER))
	}
}
