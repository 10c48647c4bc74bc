//! Programmable in-memory browser for exercising the harness without Chrome.
//!
//! `ScriptedBrowser` mimics the page protocol closely enough to drive the
//! harness end to end:
//! - Navigation fails for URLs marked unreachable
//! - URL scripts fail for resources marked missing
//! - The suite run fails unless a `prepareSpec` script was injected
//! - The report element only exists after a suite run
//!
//! Every step is recorded per session, and launches, closes and the peak
//! number of simultaneously open sessions are counted.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::backend::{BrowserBackend, BrowserSession};
use super::types::{BrowserError, BrowserResult, ScriptSource};

/// Report rendered when no per-URL report was configured
pub const DEFAULT_REPORT: &str = "passes: 1\nfailures: 0\nduration: 1ms\n";

/// Page behavior shared by all sessions of one `ScriptedBrowser`
#[derive(Debug, Clone, Default)]
struct ScriptedConfig {
    unreachable: HashSet<String>,
    missing_resources: HashSet<String>,
    reports: HashMap<String, String>,
    hang_suite: bool,
    fail_suite: bool,
    time_out_suite: bool,
    missing_report: bool,
    fail_inline_injection: bool,
    fail_launch: bool,
    step_delay: Duration,
}

#[derive(Debug, Default)]
struct ScriptedStats {
    launches: AtomicUsize,
    closes: AtomicUsize,
    open: AtomicUsize,
    peak_open: AtomicUsize,
    steps: Mutex<Vec<(usize, String)>>,
}

impl ScriptedStats {
    fn record(&self, session: usize, step: impl Into<String>) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push((session, step.into()));
        }
    }
}

/// Test double implementing [`BrowserBackend`].
///
/// Clones share counters, so a test can keep one clone for inspection while
/// the harness owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBrowser {
    config: ScriptedConfig,
    stats: Arc<ScriptedStats>,
}

impl ScriptedBrowser {
    /// Browser where every page loads and renders [`DEFAULT_REPORT`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigation to `url` fails
    pub fn unreachable(mut self, url: impl Into<String>) -> Self {
        self.config.unreachable.insert(url.into());
        self
    }

    /// Loading the script at `url` fails
    pub fn missing_resource(mut self, url: impl Into<String>) -> Self {
        self.config.missing_resources.insert(url.into());
        self
    }

    /// Report text rendered after running the suite on `url`
    pub fn report(mut self, url: impl Into<String>, report: impl Into<String>) -> Self {
        self.config.reports.insert(url.into(), report.into());
        self
    }

    /// The suite run never completes
    pub fn hang_suite(mut self) -> Self {
        self.config.hang_suite = true;
        self
    }

    /// The suite run throws inside the page
    pub fn fail_suite(mut self) -> Self {
        self.config.fail_suite = true;
        self
    }

    /// The suite run is cancelled by the browser's own command timeout
    pub fn time_out_suite(mut self) -> Self {
        self.config.time_out_suite = true;
        self
    }

    /// The report element is absent even after the suite ran
    pub fn missing_report(mut self) -> Self {
        self.config.missing_report = true;
        self
    }

    /// Inline scripts fail to inject
    pub fn fail_inline_injection(mut self) -> Self {
        self.config.fail_inline_injection = true;
        self
    }

    /// Launching a browser fails
    pub fn fail_launch(mut self) -> Self {
        self.config.fail_launch = true;
        self
    }

    /// Sleep before each page operation, to interleave concurrent sessions
    pub fn step_delay(mut self, delay: Duration) -> Self {
        self.config.step_delay = delay;
        self
    }

    /// Number of sessions launched
    pub fn launches(&self) -> usize {
        self.stats.launches.load(Ordering::SeqCst)
    }

    /// Number of sessions closed
    pub fn closes(&self) -> usize {
        self.stats.closes.load(Ordering::SeqCst)
    }

    /// Largest number of sessions that were open at the same time
    pub fn peak_open(&self) -> usize {
        self.stats.peak_open.load(Ordering::SeqCst)
    }

    /// Steps recorded by one session, in order
    pub fn steps(&self, session: usize) -> Vec<String> {
        self.stats
            .steps
            .lock()
            .map(|steps| {
                steps
                    .iter()
                    .filter(|(id, _)| *id == session)
                    .map(|(_, step)| step.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl BrowserBackend for ScriptedBrowser {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        if self.config.fail_launch {
            return Err(BrowserError::Launch("scripted launch failure".to_string()));
        }

        let id = self.stats.launches.fetch_add(1, Ordering::SeqCst);
        let open = self.stats.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak_open.fetch_max(open, Ordering::SeqCst);
        self.stats.record(id, "launch");

        Ok(Box::new(ScriptedSession {
            id,
            config: self.config.clone(),
            stats: Arc::clone(&self.stats),
            url: None,
            spec_defined: false,
            suite_ran: false,
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedSession {
    id: usize,
    config: ScriptedConfig,
    stats: Arc<ScriptedStats>,
    url: Option<String>,
    spec_defined: bool,
    suite_ran: bool,
}

impl ScriptedSession {
    async fn pause(&self) {
        if !self.config.step_delay.is_zero() {
            tokio::time::sleep(self.config.step_delay).await;
        }
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.stats.record(self.id, format!("navigate {}", url));
        self.pause().await;

        if self.config.unreachable.contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        self.url = Some(url.to_string());
        Ok(())
    }

    async fn inject_script(&mut self, script: &ScriptSource) -> BrowserResult<()> {
        self.stats.record(self.id, format!("inject {}", script));
        self.pause().await;

        match script {
            ScriptSource::Url(url) if self.config.missing_resources.contains(url) => {
                Err(BrowserError::Injection {
                    resource: url.clone(),
                    message: "404 Not Found".to_string(),
                })
            }
            ScriptSource::Url(_) => Ok(()),
            ScriptSource::Content(_) if self.config.fail_inline_injection => Err(BrowserError::Injection {
                resource: script.to_string(),
                message: "SyntaxError: Unexpected token".to_string(),
            }),
            ScriptSource::Content(content) => {
                self.spec_defined |= content.contains("prepareSpec");
                Ok(())
            }
        }
    }

    async fn evaluate_in_page(&mut self, _expression: &str) -> BrowserResult<serde_json::Value> {
        self.stats.record(self.id, "run");
        self.pause().await;

        if self.config.hang_suite {
            std::future::pending::<()>().await;
        }
        if self.config.time_out_suite {
            return Err(BrowserError::Timeout);
        }
        if self.config.fail_suite {
            return Err(BrowserError::Script("Uncaught TypeError: mocha.run is not a function".to_string()));
        }
        if !self.spec_defined {
            return Err(BrowserError::Script(
                "ReferenceError: prepareSpec is not defined".to_string(),
            ));
        }
        self.suite_ran = true;
        Ok(serde_json::Value::Bool(true))
    }

    async fn scrape_text(&mut self, element_id: &str) -> BrowserResult<String> {
        self.stats.record(self.id, format!("scrape {}", element_id));
        self.pause().await;

        if !self.suite_ran || self.config.missing_report || element_id != "mocha" {
            return Err(BrowserError::ElementMissing(element_id.to_string()));
        }
        let report = self
            .url
            .as_ref()
            .and_then(|url| self.config.reports.get(url))
            .map(String::as_str)
            .unwrap_or(DEFAULT_REPORT);
        Ok(report.to_string())
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        self.stats.record(self.id, "close");
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        self.stats.open.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_session_protocol() {
        let browser = ScriptedBrowser::new().report("https://a.test/", "passes: 2\nfailures: 0\nduration: 3ms\n");
        let mut session = browser.launch().await.unwrap();

        session.navigate("https://a.test/").await.unwrap();
        assert!(matches!(
            session.scrape_text("mocha").await,
            Err(BrowserError::ElementMissing(_))
        ));
        assert!(session.evaluate_in_page("run()").await.is_err());

        session.inject_script(&ScriptSource::content(";var prepareSpec = () => {};")).await.unwrap();
        session.evaluate_in_page("run()").await.unwrap();
        assert_eq!(
            session.scrape_text("mocha").await.unwrap(),
            "passes: 2\nfailures: 0\nduration: 3ms\n"
        );

        session.close().await.unwrap();
        assert_eq!(browser.launches(), 1);
        assert_eq!(browser.closes(), 1);
        assert_eq!(browser.steps(0).first().map(String::as_str), Some("launch"));
        assert_eq!(browser.steps(0).last().map(String::as_str), Some("close"));
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let browser = ScriptedBrowser::new()
            .unreachable("https://gone.test/")
            .missing_resource("https://cdn.test/lib.js");
        let mut session = browser.launch().await.unwrap();

        assert!(session.navigate("https://gone.test/").await.is_err());
        assert!(session.inject_script(&ScriptSource::url("https://cdn.test/lib.js")).await.is_err());
        assert!(session.inject_script(&ScriptSource::url("https://cdn.test/other.js")).await.is_ok());
        session.close().await.unwrap();

        assert!(ScriptedBrowser::new().fail_launch().launch().await.is_err());
    }
}
