//! Availability scanning of the booking calendar.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::driver::PageDriver;
use crate::error::{BotError, Result};
use crate::portal;
use crate::types::SlotCandidate;

pub struct SlotScanner {
	driver: Arc<dyn PageDriver>,
	service_id: String,
}

impl SlotScanner {
	pub fn new(driver: Arc<dyn PageDriver>, service_id: impl Into<String>) -> Self {
		Self {
			driver,
			service_id: service_id.into(),
		}
	}

	/// Scans the booking page and returns candidates sorted ascending by
	/// (date, time); the earliest slot is the booking priority.
	///
	/// Results are recomputed from scratch on every call; availability is
	/// far too volatile to cache across cycles. An empty calendar returns
	/// an empty vector; markup the scanner cannot interpret is a transient
	/// error that the scheduler treats as an empty scan.
	pub async fn scan(&self) -> Result<Vec<SlotCandidate>> {
		self.driver.goto(&portal::booking_url(&self.service_id)).await?;

		if !self.logged_in().await? {
			return Err(BotError::SessionExpired);
		}

		// "All appointments for this service are currently booked."
		if self.driver.exists(portal::POPUP_OK).await? {
			let _ = self.driver.click(portal::POPUP_OK).await;
			debug!(target = "prenota.scan", "availability popup shown; no slots");
			return Ok(Vec::new());
		}

		if !self.driver.exists(portal::CALENDAR).await? {
			return Err(BotError::transient("booking calendar not found; maintenance page or markup change"));
		}

		let datetimes = self.driver.attributes(portal::SLOT_CELL, portal::SLOT_DATETIME_ATTR).await?;
		let refs = self.driver.attributes(portal::SLOT_CELL, portal::SLOT_REF_ATTR).await?;
		let office = self.first_text(portal::OFFICE_LABEL).await?;
		let service = self.first_text(portal::SERVICE_LABEL).await?;

		let mut slots = Vec::with_capacity(datetimes.len());
		for (datetime, booking_ref) in datetimes.into_iter().zip(refs) {
			let (Some(datetime), Some(booking_ref)) = (datetime, booking_ref) else {
				warn!(target = "prenota.scan", "slot cell missing datetime or ref attribute; skipping");
				continue;
			};
			let Ok(parsed) = NaiveDateTime::parse_from_str(&datetime, "%Y-%m-%dT%H:%M") else {
				warn!(target = "prenota.scan", %datetime, "unparseable slot datetime; skipping");
				continue;
			};
			slots.push(SlotCandidate {
				date: parsed.date(),
				time: parsed.time(),
				office: office.clone(),
				service: service.clone(),
				booking_ref,
			});
		}
		slots.sort();

		debug!(target = "prenota.scan", count = slots.len(), "scan complete");
		Ok(slots)
	}

	async fn first_text(&self, selector: &str) -> Result<String> {
		Ok(self.driver.texts(selector).await?.into_iter().next().unwrap_or_default())
	}

	async fn logged_in(&self) -> Result<bool> {
		let class = self.driver.attribute("body", "class").await?.unwrap_or_default();
		Ok(class.split_whitespace().any(|c| c == portal::LOGGED_IN_MARKER))
	}
}
