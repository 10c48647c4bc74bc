use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::browser::{BrowserBackend, BrowserError, BrowserSession, ScriptSource};
use crate::harness::types::{EvaluationRequest, HarnessConfig, HarnessError, HarnessResult};
use crate::outcome::{EvaluationFailure, EvaluationResult, FailureReason};
use crate::report;
use crate::specs::SpecRegistry;

/// Id of the element the test runner renders its report into
pub const REPORT_ELEMENT_ID: &str = "mocha";

/// In-page procedure: create the report container, set up the runner in BDD
/// mode, register the spec's assertions and run them to completion.
const RUN_SUITE: &str = r#"(async () => {
    const container = document.createElement('div');
    container.setAttribute('id', 'mocha');
    document.querySelector('body').appendChild(container);
    mocha.setup('bdd');
    await prepareSpec();
    return await new Promise((resolve) => mocha.run((failures) => resolve(failures)));
})()"#;

/// How far the page protocol got before stopping
enum Progress {
    /// Suite ran and its report was scraped
    Report(String),
    /// Navigation or injection failed
    Failed(FailureReason),
}

/// Drives evaluations against a browser backend.
///
/// Clones share one concurrency limit.
#[derive(Clone)]
pub struct Harness {
    backend: Arc<dyn BrowserBackend>,
    specs: Arc<SpecRegistry>,
    config: HarnessConfig,
    permits: Arc<Semaphore>,
}

impl Harness {
    pub fn new(backend: Arc<dyn BrowserBackend>, specs: Arc<SpecRegistry>, config: HarnessConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        Self {
            backend,
            specs,
            config,
            permits,
        }
    }

    /// Grade one page.
    ///
    /// Returns `Ok(Some(_))` with an outcome or a classified failure,
    /// `Ok(None)` when the report could not be parsed, and `Err` when the
    /// browser could not start or the suite did not complete. The browser is
    /// closed exactly once on every path.
    pub async fn evaluate(&self, request: &EvaluationRequest) -> HarnessResult<Option<EvaluationResult>> {
        let span = info_span!(
            "evaluate",
            url = request.page_url(),
            spec = request.spec_name(),
            backend = self.backend.name()
        );

        self.evaluate_in_session(request).instrument(span).await
    }

    async fn evaluate_in_session(&self, request: &EvaluationRequest) -> HarnessResult<Option<EvaluationResult>> {
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("evaluation semaphore is never closed");

        let mut session = self.backend.launch().await.map_err(HarnessError::Launch)?;
        let progress = self.drive(session.as_mut(), request).await;

        if let Err(e) = session.close().await {
            warn!(error = %e, "browser did not close cleanly");
        }

        let url = request.page_url();
        match progress? {
            Progress::Report(text) => {
                let outcome = report::parse_report(url, &text);
                match &outcome {
                    Some(outcome) => info!(
                        passes = outcome.passes(),
                        failures = outcome.failures(),
                        duration = outcome.duration(),
                        "evaluation finished"
                    ),
                    None => warn!("report could not be parsed"),
                }
                Ok(outcome.map(EvaluationResult::from))
            }
            Progress::Failed(reason) => {
                warn!(error = %reason, "evaluation failed");
                Ok(Some(EvaluationFailure::new(url, reason).into()))
            }
        }
    }

    /// Grade many pages concurrently; results keep the request order
    pub async fn evaluate_all(
        &self,
        requests: &[EvaluationRequest],
    ) -> Vec<HarnessResult<Option<EvaluationResult>>> {
        join_all(requests.iter().map(|request| self.evaluate(request))).await
    }

    /// Navigate, inject, run and scrape, stopping at the first failure
    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        request: &EvaluationRequest,
    ) -> HarnessResult<Progress> {
        let url = request.page_url();

        if let Err(e) = session.navigate(url).await {
            debug!(error = %e, "navigation failed");
            return Ok(Progress::Failed(FailureReason::OriginUnreachable));
        }

        let libraries = [
            ScriptSource::url(&self.config.assertion_library_url),
            ScriptSource::url(&self.config.test_framework_url),
        ];
        for script in &libraries {
            if let Err(e) = session.inject_script(script).await {
                debug!(error = %e, "injection failed");
                return Ok(Progress::Failed(FailureReason::ResourceNotFound));
            }
        }

        let Some(spec) = self.specs.get(request.spec_name()) else {
            debug!("spec is not registered");
            return Ok(Progress::Failed(FailureReason::ResourceNotFound));
        };
        if let Err(e) = session.inject_script(&ScriptSource::content(spec.prepare_script())).await {
            debug!(error = %e, "spec injection failed");
            return Ok(Progress::Failed(FailureReason::ResourceNotFound));
        }

        let execution_error = |source| HarnessError::Execution {
            url: url.to_string(),
            source,
        };

        // The browser may cancel a long command itself; that is the same timeout
        let failures = match tokio::time::timeout(self.config.suite_timeout, session.evaluate_in_page(RUN_SUITE)).await {
            Ok(Ok(failures)) => failures,
            Ok(Err(BrowserError::Timeout)) | Err(_) => {
                return Err(HarnessError::ExecutionTimeout {
                    url: url.to_string(),
                    timeout: self.config.suite_timeout,
                });
            }
            Ok(Err(e)) => return Err(execution_error(e)),
        };
        debug!(%failures, "suite completed");

        let text = session
            .scrape_text(REPORT_ELEMENT_ID)
            .await
            .map_err(execution_error)?;
        Ok(Progress::Report(text))
    }
}
