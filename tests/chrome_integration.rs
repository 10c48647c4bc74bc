//! End-to-end tests against a real headless Chrome.
//!
//! These need a Chrome/Chromium install and network access to the default
//! script CDN, so they are ignored by default:
//!
//! ```sh
//! cargo test --test chrome_integration -- --ignored
//! ```

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;

use page_grader::config::Config;
use page_grader::outcome::{EvaluationResult, FailureReason};
use page_grader::specs::SpecRegistry;
use page_grader::{BrowserBackend, ChromeBackend, EvaluationRequest, Harness, HarnessConfig};

const CV_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Ada Lovelace - CV</title></head>
<body>
  <header><h1>Ada Lovelace</h1></header>
  <main>
    <section><h2>Experience</h2><ul><li>Analytical Engine notes</li></ul></section>
    <section><h2>Education</h2><p>Private tutoring</p></section>
    <img src="ada.png" alt="Portrait of Ada Lovelace">
  </main>
  <footer><a href="mailto:ada@example.com">Contact</a></footer>
</body>
</html>"#;

fn chrome_harness() -> Harness {
    let config = Config::defaults();
    Harness::new(
        Arc::new(ChromeBackend::new(config.browser.clone()).suite_timeout(config.harness.suite_timeout)),
        Arc::new(SpecRegistry::builtin()),
        HarnessConfig::from_config(&config),
    )
}

#[tokio::test]
#[ignore = "requires Chrome and network access"]
async fn test_chrome_grades_served_page() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/cv/");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body(CV_PAGE);
        })
        .await;

    let harness = chrome_harness();
    let request = EvaluationRequest::new(server.url("/cv/"), "cvTests").unwrap();

    match harness.evaluate(&request).await.unwrap() {
        Some(EvaluationResult::Outcome(outcome)) => {
            assert_eq!(outcome.url(), server.url("/cv/"));
            assert!(outcome.passes() + outcome.failures() > 0);
        }
        other => panic!("expected an outcome, got {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_chrome_reports_unreachable_origin() {
    let harness = chrome_harness();
    let request = EvaluationRequest::new("http://127.0.0.1:9/", "cvTests").unwrap();

    match harness.evaluate(&request).await.unwrap() {
        Some(EvaluationResult::Failure(failure)) => {
            assert_eq!(failure.error, FailureReason::OriginUnreachable);
        }
        other => panic!("expected a failure, got {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_chrome_session_teardown_is_bounded() {
    let config = Config::defaults();
    let backend = ChromeBackend::new(config.browser.clone());
    let mut session = backend.launch().await.unwrap();
    session.navigate("about:blank").await.unwrap();

    let closed = tokio::time::timeout(Duration::from_secs(15), session.close()).await;
    assert!(closed.is_ok(), "chrome teardown did not finish");
}
