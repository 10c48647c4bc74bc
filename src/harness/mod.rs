pub mod driver;
pub mod types;

pub use driver::{Harness, REPORT_ELEMENT_ID};
pub use types::{EvaluationRequest, HarnessConfig, HarnessError, HarnessResult};

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::browser::ChromeBackend;
use crate::config;
use crate::outcome::EvaluationResult;
use crate::specs::SpecRegistry;

static DEFAULT_HARNESS: OnceCell<Harness> = OnceCell::new();

/// Spec registry from the environment: built-in specs plus `PAGE_GRADER_SPEC_DIR`
pub fn registry_from_env() -> HarnessResult<SpecRegistry> {
    let registry = SpecRegistry::builtin();
    match &config::get().harness.spec_dir {
        Some(dir) => Ok(registry.with_dir(dir)?),
        None => Ok(registry),
    }
}

impl Harness {
    /// Chrome-backed harness configured from the environment
    pub fn from_env() -> HarnessResult<Self> {
        Ok(Self::new(
            Arc::new(ChromeBackend::from_env()),
            Arc::new(registry_from_env()?),
            HarnessConfig::default(),
        ))
    }
}

/// Grade `page_url` against the spec named `spec_name`.
///
/// Uses a process-wide Chrome harness built from the environment on first
/// call, so concurrent callers share one concurrency limit.
pub async fn evaluate(page_url: &str, spec_name: &str) -> HarnessResult<Option<EvaluationResult>> {
    let harness = DEFAULT_HARNESS.get_or_try_init(Harness::from_env)?;
    let request = EvaluationRequest::new(page_url, spec_name)?;
    harness.evaluate(&request).await
}
