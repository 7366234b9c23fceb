//! UI language switching, applied before locale-sensitive scans.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::driver::PageDriver;
use crate::error::Result;
use crate::portal;
use crate::types::Locale;

const SWITCH_RETRIES: u32 = 3;

pub struct LocaleSwitcher {
	driver: Arc<dyn PageDriver>,
}

impl LocaleSwitcher {
	pub fn new(driver: Arc<dyn PageDriver>) -> Self {
		Self { driver }
	}

	/// Idempotently switches the portal to `target`.
	///
	/// A switch that keeps failing degrades gracefully: scanning in the
	/// current locale beats aborting the run, so after the retry bound the
	/// failure is logged and swallowed.
	pub async fn ensure(&self, target: Locale) -> Result<()> {
		for attempt in 1..=SWITCH_RETRIES {
			match self.try_switch(target).await {
				Ok(true) => return Ok(()),
				Ok(false) => {
					debug!(target = "prenota.locale", %target, attempt, "locale switch did not stick");
				}
				Err(err) if err.is_transient() => {
					debug!(target = "prenota.locale", %target, attempt, error = %err, "locale switch failed");
				}
				Err(err) => return Err(err),
			}
		}
		warn!(target = "prenota.locale", %target, "locale switch failed; continuing in current locale");
		Ok(())
	}

	/// One switch attempt; true when the target locale is active afterwards.
	async fn try_switch(&self, target: Locale) -> Result<bool> {
		if self.is_active(target).await? {
			return Ok(true);
		}
		let link = portal::locale_link_selector(target);
		if !self.driver.exists(&link).await? {
			// Language bar missing entirely, e.g. a maintenance page.
			return Ok(false);
		}
		self.driver.click(&link).await?;
		self.is_active(target).await
	}

	async fn is_active(&self, target: Locale) -> Result<bool> {
		let link = portal::locale_link_selector(target);
		let class = self.driver.attribute(&link, "class").await?.unwrap_or_default();
		Ok(class.split_whitespace().any(|c| c == "active"))
	}
}
