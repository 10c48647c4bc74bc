//! Headless Chrome backend over the DevTools Protocol.
//!
//! Each session launches its own Chrome process with a private profile
//! directory. The CDP handler runs on a spawned task for the lifetime of the
//! session and is aborted on close.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::backend::{BrowserBackend, BrowserSession};
use super::profile::BrowserProfile;
use super::types::{BrowserError, BrowserResult, ScriptSource};
use crate::config::{self, BrowserSettings};

/// Scheme of the page Chrome shows when a navigation fails
const CHROME_ERROR_SCHEME: &str = "chrome-error://";

/// Headroom of the protocol command timeout over the suite timeout
const SUITE_COMMAND_MARGIN: Duration = Duration::from_secs(5);

/// How long Chrome gets to exit after `close` before it is killed
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Chrome-backed [`BrowserBackend`]
#[derive(Debug, Clone)]
pub struct ChromeBackend {
    settings: BrowserSettings,
    suite_timeout: Duration,
}

impl ChromeBackend {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            suite_timeout: Duration::from_secs(config::DEFAULT_SUITE_TIMEOUT),
        }
    }

    /// Backend configured from the environment
    pub fn from_env() -> Self {
        let cfg = config::get();
        Self::new(cfg.browser.clone()).suite_timeout(cfg.harness.suite_timeout)
    }

    /// Longest suite run the harness will wait for.
    ///
    /// Every CDP command, including the one awaiting the suite, is cancelled
    /// by the protocol handler after the command timeout, so that timeout is
    /// kept above this value.
    pub fn suite_timeout(mut self, timeout: Duration) -> Self {
        self.suite_timeout = timeout;
        self
    }

    /// Timeout handed to the protocol handler for each command
    fn command_timeout(&self) -> Duration {
        self.settings
            .request_timeout
            .max(self.suite_timeout + SUITE_COMMAND_MARGIN)
    }

    fn browser_config(&self, profile: &BrowserProfile) -> BrowserResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(&profile.dir)
            .request_timeout(self.command_timeout())
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");

        if self.settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = self.settings.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(BrowserError::Launch)
    }
}

#[async_trait]
impl BrowserBackend for ChromeBackend {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        let profile = BrowserProfile::new(&self.settings.profile_dir);
        profile.init()?;
        let config = self.browser_config(&profile)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    debug!("CDP handler event loop ended");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                // The process is already running: shut it down before reporting
                if let Err(close_err) = shutdown(&mut browser).await {
                    warn!(error = %close_err, "failed to close browser after page creation error");
                }
                handler_task.abort();
                return Err(BrowserError::Launch(format!("failed to open page: {}", e)));
            }
        };

        debug!(profile = %profile.id, "chrome session started");

        Ok(Box::new(ChromeSession {
            browser,
            page,
            handler_task,
            profile,
            navigation_timeout: self.settings.request_timeout,
        }))
    }

    fn name(&self) -> &str {
        "chrome"
    }
}

/// One Chrome process with its page
struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    profile: BrowserProfile,
    navigation_timeout: Duration,
}

impl ChromeSession {
    async fn eval(page: &Page, expression: String) -> BrowserResult<serde_json::Value> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(BrowserError::Script)?;

        let result = page.evaluate_expression(params).await.map_err(|e| match e {
            CdpError::Timeout => BrowserError::Timeout,
            e => BrowserError::Script(e.to_string()),
        })?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        debug!(url, "navigating");
        let navigation_error = |message: String| BrowserError::Navigation {
            url: url.to_string(),
            message,
        };

        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(navigation_error(e.to_string())),
            Err(_) => {
                return Err(navigation_error(format!(
                    "timed out after {}s",
                    self.navigation_timeout.as_secs()
                )));
            }
        }

        // Chrome renders network failures as an internal error page instead
        // of failing the navigation command
        let location = Self::eval(&self.page, "document.location.href".to_string())
            .await
            .map_err(|e| navigation_error(e.to_string()))?;
        match location.as_str() {
            Some(href) if href.starts_with(CHROME_ERROR_SCHEME) => {
                Err(navigation_error(format!("chrome error page ({})", href)))
            }
            _ => Ok(()),
        }
    }

    async fn inject_script(&mut self, script: &ScriptSource) -> BrowserResult<()> {
        let expression = script_tag_expression(script).map_err(|e| BrowserError::Injection {
            resource: script.to_string(),
            message: e.to_string(),
        })?;

        Self::eval(&self.page, expression)
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Injection {
                resource: script.to_string(),
                message: e.to_string(),
            })
    }

    async fn evaluate_in_page(&mut self, expression: &str) -> BrowserResult<serde_json::Value> {
        Self::eval(&self.page, expression.to_string()).await
    }

    async fn scrape_text(&mut self, element_id: &str) -> BrowserResult<String> {
        let id = serde_json::to_string(element_id).map_err(|e| BrowserError::Script(e.to_string()))?;
        let expression = format!(
            "(() => {{ const el = document.getElementById({id}); return el ? el.innerText : null; }})()"
        );

        match Self::eval(&self.page, expression).await? {
            serde_json::Value::String(text) => Ok(text),
            _ => Err(BrowserError::ElementMissing(element_id.to_string())),
        }
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        let ChromeSession {
            mut browser,
            handler_task,
            profile,
            ..
        } = *self;

        let closed = shutdown(&mut browser).await;
        handler_task.abort();

        if let Err(e) = profile.cleanup() {
            warn!(profile = %profile.id, error = %e, "failed to remove browser profile");
        }
        debug!(profile = %profile.id, "chrome session closed");

        closed
    }
}

/// Ask Chrome to exit, killing the process when it does not exit in time.
///
/// Returns the outcome of the close request; the process is gone either way.
async fn shutdown(browser: &mut Browser) -> BrowserResult<()> {
    let closed = match tokio::time::timeout(CLOSE_GRACE, browser.close()).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(BrowserError::Close(e.to_string())),
        Err(_) => Err(BrowserError::Close(format!(
            "no reply to close within {}s",
            CLOSE_GRACE.as_secs()
        ))),
    };

    if closed.is_ok() {
        match tokio::time::timeout(CLOSE_GRACE, browser.wait()).await {
            Ok(Ok(_)) => return closed,
            Ok(Err(e)) => warn!(error = %e, "failed waiting for chrome to exit"),
            Err(_) => warn!("chrome did not exit after close"),
        }
    }

    if let Some(Err(e)) = browser.kill().await {
        warn!(error = %e, "failed to kill chrome");
    }
    closed
}

/// Expression that appends a `<script>` tag and resolves once it has loaded.
///
/// URL scripts reject on the element's `error` event so a 404 or network
/// failure surfaces as an evaluation exception.
fn script_tag_expression(script: &ScriptSource) -> serde_json::Result<String> {
    let expression = match script {
        ScriptSource::Url(url) => format!(
            "new Promise((resolve, reject) => {{ \
                const script = document.createElement('script'); \
                script.src = {src}; \
                script.onload = () => resolve(true); \
                script.onerror = () => reject(new Error('failed to load ' + script.src)); \
                (document.head || document.documentElement).appendChild(script); \
            }})",
            src = serde_json::to_string(url)?
        ),
        ScriptSource::Content(content) => format!(
            "(() => {{ \
                const script = document.createElement('script'); \
                script.type = 'text/javascript'; \
                script.text = {text}; \
                (document.head || document.documentElement).appendChild(script); \
                return true; \
            }})()",
            text = serde_json::to_string(content)?
        ),
    };
    Ok(expression)
}
