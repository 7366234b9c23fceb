//! chromiumoxide-backed implementation of [`PageDriver`].

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use tracing::trace;

use super::PageDriver;
use crate::error::{BotError, Result};

/// Drives a single CDP page. `Page` is internally reference counted, so the
/// driver can be cloned cheaply while still addressing the same tab.
#[derive(Clone)]
pub struct CdpDriver {
	page: Page,
}

impl CdpDriver {
	pub fn new(page: Page) -> Self {
		Self { page }
	}
}

#[async_trait]
impl PageDriver for CdpDriver {
	async fn goto(&self, url: &str) -> Result<()> {
		trace!(target = "prenota.driver", %url, "goto");
		self.page.goto(url).await.map(|_| ()).map_err(|e| BotError::Navigation {
			url: url.to_string(),
			source: anyhow::Error::new(e),
		})
	}

	async fn reload(&self) -> Result<()> {
		self.page.reload().await?;
		Ok(())
	}

	async fn exists(&self, selector: &str) -> Result<bool> {
		Ok(!self.page.find_elements(selector).await?.is_empty())
	}

	async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
		let elements = self.page.find_elements(selector).await?;
		match elements.first() {
			Some(element) => Ok(element.attribute(name).await?),
			None => Ok(None),
		}
	}

	async fn attributes(&self, selector: &str, name: &str) -> Result<Vec<Option<String>>> {
		let mut values = Vec::new();
		for element in self.page.find_elements(selector).await? {
			values.push(element.attribute(name).await?);
		}
		Ok(values)
	}

	async fn texts(&self, selector: &str) -> Result<Vec<String>> {
		let mut values = Vec::new();
		for element in self.page.find_elements(selector).await? {
			if let Some(text) = element.inner_text().await? {
				values.push(text);
			}
		}
		Ok(values)
	}

	async fn click(&self, selector: &str) -> Result<()> {
		let elements = self.page.find_elements(selector).await?;
		let element = elements
			.first()
			.ok_or_else(|| BotError::transient(format!("no element matches {selector}")))?;
		element.click().await?;
		Ok(())
	}

	async fn fill(&self, selector: &str, value: &str) -> Result<()> {
		let elements = self.page.find_elements(selector).await?;
		let element = elements
			.first()
			.ok_or_else(|| BotError::transient(format!("no element matches {selector}")))?;
		element.click().await?;
		element.type_str(value).await?;
		Ok(())
	}

	async fn cookie_snapshot(&self) -> Result<serde_json::Value> {
		let cookies = self.page.get_cookies().await?;
		Ok(serde_json::to_value(cookies)?)
	}

	async fn restore_cookies(&self, blob: &serde_json::Value) -> Result<()> {
		let cookies: Vec<CookieParam> = serde_json::from_value(blob.clone())?;
		self.page.set_cookies(cookies).await?;
		Ok(())
	}
}
