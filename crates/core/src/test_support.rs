//! Scripted [`PageDriver`] used by component tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::driver::PageDriver;
use crate::error::{BotError, Result};

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
	pub attrs: HashMap<String, String>,
	pub text: String,
}

impl FakeElement {
	pub fn with_attr(name: &str, value: &str) -> Self {
		let mut element = Self::default();
		element.attrs.insert(name.to_string(), value.to_string());
		element
	}

	pub fn with_text(text: &str) -> Self {
		Self { attrs: HashMap::new(), text: text.to_string() }
	}
}

/// Declarative page change applied when a selector is clicked.
#[derive(Debug, Default)]
pub struct ClickEffect {
	/// (selector, attribute, value) triples to set, creating elements as needed.
	pub set_attrs: Vec<(String, String, String)>,
	/// Selectors to remove entirely.
	pub remove: Vec<String>,
	/// Selectors to add as single empty elements.
	pub add: Vec<String>,
}

#[derive(Default)]
struct PageState {
	elements: HashMap<String, Vec<FakeElement>>,
	goto_log: Vec<String>,
	reloads: usize,
	click_log: Vec<String>,
	fill_log: Vec<(String, String)>,
	click_effects: HashMap<String, Vec<ClickEffect>>,
	cookies: serde_json::Value,
	restored: Vec<serde_json::Value>,
	fail_restore: bool,
}

#[derive(Default)]
pub struct FakeDriver {
	state: Mutex<PageState>,
}

impl FakeDriver {
	pub fn new() -> Self {
		let driver = Self::default();
		driver.state.lock().unwrap().cookies = json!([]);
		driver
	}

	pub fn add_element(&self, selector: &str, element: FakeElement) {
		self.state.lock().unwrap().elements.entry(selector.to_string()).or_default().push(element);
	}

	pub fn set_attr(&self, selector: &str, name: &str, value: &str) {
		let mut state = self.state.lock().unwrap();
		let elements = state.elements.entry(selector.to_string()).or_default();
		if elements.is_empty() {
			elements.push(FakeElement::default());
		}
		elements[0].attrs.insert(name.to_string(), value.to_string());
	}

	pub fn fail_restore(&self) {
		self.state.lock().unwrap().fail_restore = true;
	}

	/// Queues a page mutation applied the next time `selector` is clicked.
	pub fn on_click(&self, selector: &str, effect: ClickEffect) {
		self.state.lock().unwrap().click_effects.entry(selector.to_string()).or_default().push(effect);
	}

	pub fn goto_log(&self) -> Vec<String> {
		self.state.lock().unwrap().goto_log.clone()
	}

	pub fn reload_count(&self) -> usize {
		self.state.lock().unwrap().reloads
	}

	pub fn click_log(&self) -> Vec<String> {
		self.state.lock().unwrap().click_log.clone()
	}

	pub fn fill_log(&self) -> Vec<(String, String)> {
		self.state.lock().unwrap().fill_log.clone()
	}

	pub fn restored_blobs(&self) -> Vec<serde_json::Value> {
		self.state.lock().unwrap().restored.clone()
	}

	pub fn clicks_on(&self, selector: &str) -> usize {
		self.state.lock().unwrap().click_log.iter().filter(|s| s.as_str() == selector).count()
	}
}

fn apply_effect(state: &mut PageState, effect: ClickEffect) {
	for (selector, name, value) in effect.set_attrs {
		let elements = state.elements.entry(selector).or_default();
		if elements.is_empty() {
			elements.push(FakeElement::default());
		}
		elements[0].attrs.insert(name, value);
	}
	for selector in effect.remove {
		state.elements.remove(&selector);
	}
	for selector in effect.add {
		state.elements.entry(selector).or_default().push(FakeElement::default());
	}
}

#[async_trait]
impl PageDriver for FakeDriver {
	async fn goto(&self, url: &str) -> Result<()> {
		self.state.lock().unwrap().goto_log.push(url.to_string());
		Ok(())
	}

	async fn reload(&self) -> Result<()> {
		self.state.lock().unwrap().reloads += 1;
		Ok(())
	}

	async fn exists(&self, selector: &str) -> Result<bool> {
		let state = self.state.lock().unwrap();
		Ok(state.elements.get(selector).is_some_and(|els| !els.is_empty()))
	}

	async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
		let state = self.state.lock().unwrap();
		Ok(state
			.elements
			.get(selector)
			.and_then(|els| els.first())
			.and_then(|el| el.attrs.get(name).cloned()))
	}

	async fn attributes(&self, selector: &str, name: &str) -> Result<Vec<Option<String>>> {
		let state = self.state.lock().unwrap();
		Ok(state
			.elements
			.get(selector)
			.map(|els| els.iter().map(|el| el.attrs.get(name).cloned()).collect())
			.unwrap_or_default())
	}

	async fn texts(&self, selector: &str) -> Result<Vec<String>> {
		let state = self.state.lock().unwrap();
		Ok(state
			.elements
			.get(selector)
			.map(|els| els.iter().map(|el| el.text.clone()).collect())
			.unwrap_or_default())
	}

	async fn click(&self, selector: &str) -> Result<()> {
		let mut state = self.state.lock().unwrap();
		if !state.elements.get(selector).is_some_and(|els| !els.is_empty()) {
			return Err(BotError::transient(format!("no element matches {selector}")));
		}
		state.click_log.push(selector.to_string());
		let effect = state
			.click_effects
			.get_mut(selector)
			.filter(|effects| !effects.is_empty())
			.map(|effects| effects.remove(0));
		if let Some(effect) = effect {
			apply_effect(&mut state, effect);
		}
		Ok(())
	}

	async fn fill(&self, selector: &str, value: &str) -> Result<()> {
		let mut state = self.state.lock().unwrap();
		if !state.elements.get(selector).is_some_and(|els| !els.is_empty()) {
			return Err(BotError::transient(format!("no element matches {selector}")));
		}
		state.fill_log.push((selector.to_string(), value.to_string()));
		Ok(())
	}

	async fn cookie_snapshot(&self) -> Result<serde_json::Value> {
		Ok(self.state.lock().unwrap().cookies.clone())
	}

	async fn restore_cookies(&self, blob: &serde_json::Value) -> Result<()> {
		let mut state = self.state.lock().unwrap();
		if state.fail_restore {
			return Err(BotError::transient("cookie restore rejected"));
		}
		state.restored.push(blob.clone());
		Ok(())
	}
}
