//! Browser backend abstraction.
//!
//! This module provides a unified interface over the browsers the harness
//! can drive:
//! - `ChromeBackend` for headless Chrome over the DevTools Protocol
//! - `ScriptedBrowser` for tests, with programmable page behavior

use async_trait::async_trait;

use super::types::{BrowserResult, ScriptSource};

/// Launches isolated browser sessions.
///
/// Every call to [`launch`](BrowserBackend::launch) must produce a fresh
/// browser instance with a single blank page. Sessions never share state.
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    /// Start a browser and open a blank page
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>>;

    /// Backend identifier (e.g., "chrome", "scripted")
    fn name(&self) -> &str;
}

/// One browser instance with one page.
///
/// `close` consumes the session, so a session is closed at most once.
#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` in the page
    async fn navigate(&mut self, url: &str) -> BrowserResult<()>;

    /// Add a script tag and wait for it to load
    async fn inject_script(&mut self, script: &ScriptSource) -> BrowserResult<()>;

    /// Evaluate an expression in the page, awaiting a returned promise
    async fn evaluate_in_page(&mut self, expression: &str) -> BrowserResult<serde_json::Value>;

    /// Rendered text of the element with the given id
    async fn scrape_text(&mut self, element_id: &str) -> BrowserResult<String>;

    /// Shut down the browser
    async fn close(self: Box<Self>) -> BrowserResult<()>;
}
