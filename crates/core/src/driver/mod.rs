//! Navigation primitives over the live page.
//!
//! [`PageDriver`] is the seam between the engine and the browser: the real
//! implementation speaks CDP through chromiumoxide, tests script page state
//! in memory. All methods are element-count tolerant: a selector matching
//! nothing is data, not an error.

mod cdp;

pub use cdp::CdpDriver;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait PageDriver: Send + Sync {
	async fn goto(&self, url: &str) -> Result<()>;

	/// Reloads the current page, discarding any half-entered form state.
	async fn reload(&self) -> Result<()>;

	/// True when at least one element matches the selector.
	async fn exists(&self, selector: &str) -> Result<bool>;

	/// Attribute of the first matching element; `None` when the element or
	/// attribute is absent.
	async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>>;

	/// Attribute of every matching element, in document order.
	async fn attributes(&self, selector: &str, name: &str) -> Result<Vec<Option<String>>>;

	/// Inner text of every matching element, in document order.
	async fn texts(&self, selector: &str) -> Result<Vec<String>>;

	/// Clicks the first matching element; transient error when absent.
	async fn click(&self, selector: &str) -> Result<()>;

	/// Focuses the first matching element and types the value into it.
	async fn fill(&self, selector: &str, value: &str) -> Result<()>;

	/// Serialized cookie state of the browsing context. Opaque to callers.
	async fn cookie_snapshot(&self) -> Result<serde_json::Value>;

	/// Restores a previously captured cookie snapshot.
	async fn restore_cookies(&self, blob: &serde_json::Value) -> Result<()>;
}
