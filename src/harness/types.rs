use std::time::Duration;

use url::Url;

use crate::browser::BrowserError;
use crate::config;
use crate::specs::SpecError;

/// One grading attempt: a page and the spec to check it against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
    page_url: String,
    spec_name: String,
}

impl EvaluationRequest {
    /// Build a request; `page_url` must be an absolute URL
    pub fn new(page_url: impl Into<String>, spec_name: impl Into<String>) -> HarnessResult<Self> {
        let page_url = page_url.into();
        Url::parse(&page_url).map_err(|source| HarnessError::InvalidUrl {
            url: page_url.clone(),
            source,
        })?;

        Ok(Self {
            page_url,
            spec_name: spec_name.into(),
        })
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub fn spec_name(&self) -> &str {
        &self.spec_name
    }
}

/// Configuration for harness execution
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Assertion library injected first
    pub assertion_library_url: String,

    /// BDD test framework injected second
    pub test_framework_url: String,

    /// Bounded wait for the in-page suite to finish
    pub suite_timeout: Duration,

    /// Maximum number of browsers open at once
    pub max_concurrency: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::from_config(config::get())
    }
}

impl HarnessConfig {
    /// Configuration built from explicit settings
    pub fn from_config(cfg: &config::Config) -> Self {
        Self {
            assertion_library_url: cfg.resources.assertion_library_url.clone(),
            test_framework_url: cfg.resources.test_framework_url.clone(),
            suite_timeout: cfg.harness.suite_timeout,
            max_concurrency: cfg.harness.max_concurrency.max(1),
        }
    }

    pub fn suite_timeout(mut self, timeout: Duration) -> Self {
        self.suite_timeout = timeout;
        self
    }

    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that abort an evaluation.
///
/// Classified navigation and injection failures are not errors: they are
/// returned as [`EvaluationFailure`](crate::outcome::EvaluationFailure) values.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Page URL is not an absolute URL
    #[error("invalid page URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Browser could not be started
    #[error("browser launch failed: {0}")]
    Launch(#[source] BrowserError),

    /// Suite did not complete in time
    #[error("suite on {url} did not complete within {}s", .timeout.as_secs())]
    ExecutionTimeout { url: String, timeout: Duration },

    /// Suite run or report scrape failed inside the page
    #[error("suite execution on {url} failed: {source}")]
    Execution {
        url: String,
        #[source]
        source: BrowserError,
    },

    /// Spec registry could not be built
    #[error("spec registry error: {0}")]
    Spec(#[from] SpecError),
}
