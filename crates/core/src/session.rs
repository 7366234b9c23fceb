//! Browser lifecycle: launch, single-page ownership, guaranteed teardown.

use std::path::PathBuf;
use std::sync::Arc;

use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::driver::{CdpDriver, PageDriver};
use crate::error::{BotError, Result};

/// Launch parameters for the browsing context.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
	/// Headful is the norm here: the manual CAPTCHA step needs a window.
	pub headless: bool,
	pub browser_path: Option<PathBuf>,
}

/// One browser process, one context, one page.
///
/// All portal traffic for a run is serialized through this page; the
/// stateful multi-step booking form makes concurrent requests on the same
/// session unsafe. Acquired once at run start and released on every exit
/// path so no browser process is leaked.
pub struct BrowserSession {
	browser: Browser,
	driver: Arc<CdpDriver>,
	event_loop: JoinHandle<()>,
}

impl BrowserSession {
	pub async fn launch(options: &LaunchOptions) -> Result<Self> {
		let mut builder = BrowserConfig::builder();
		if options.headless {
			builder = builder.arg("--headless=new");
		} else {
			builder = builder.with_head();
		}
		if let Some(path) = &options.browser_path {
			builder = builder.chrome_executable(path);
		}
		let config = builder.build().map_err(BotError::BrowserLaunch)?;

		debug!(target = "prenota.session", headless = options.headless, "launching browser");
		let (browser, mut handler) = Browser::launch(config)
			.await
			.map_err(|e| BotError::BrowserLaunch(e.to_string()))?;

		// The CDP handler must be polled for the connection to make progress.
		let event_loop = tokio::spawn(async move {
			while let Some(event) = handler.next().await {
				if event.is_err() {
					break;
				}
			}
		});

		let page = match browser.new_page("about:blank").await {
			Ok(page) => page,
			Err(err) => {
				event_loop.abort();
				return Err(BotError::BrowserLaunch(err.to_string()));
			}
		};

		Ok(Self {
			browser,
			driver: Arc::new(CdpDriver::new(page)),
			event_loop,
		})
	}

	/// Shared handle to the page driver for the engine components.
	pub fn driver(&self) -> Arc<dyn PageDriver> {
		self.driver.clone()
	}

	/// Closes the browser and stops the event loop. Failures are reported
	/// but never mask the run outcome.
	pub async fn close(mut self) -> Result<()> {
		if let Err(err) = self.browser.close().await {
			warn!(target = "prenota.session", error = %err, "browser close failed");
		}
		if let Err(err) = self.browser.wait().await {
			warn!(target = "prenota.session", error = %err, "browser did not exit cleanly");
		}
		self.event_loop.abort();
		Ok(())
	}
}
