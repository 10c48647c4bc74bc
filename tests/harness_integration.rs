//! Integration tests for the evaluation driver against the scripted browser

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use page_grader::outcome::{EvaluationResult, FailureReason, TestOutcome};
use page_grader::specs::{SpecDefinition, SpecRegistry};
use page_grader::{EvaluationRequest, Harness, HarnessConfig, HarnessError, ScriptedBrowser};

const CHAI: &str = "https://cdn.test/chai.js";
const MOCHA: &str = "https://cdn.test/mocha.js";
const PAGE: &str = "https://student.test/cv/";

fn test_config() -> HarnessConfig {
    HarnessConfig {
        assertion_library_url: CHAI.to_string(),
        test_framework_url: MOCHA.to_string(),
        suite_timeout: Duration::from_secs(30),
        max_concurrency: 4,
    }
}

fn registry() -> SpecRegistry {
    SpecRegistry::new().with_spec(SpecDefinition::new(
        "demo",
        "async function() { describe('page', () => { it('should load', () => {}); }); }",
    ))
}

fn harness(browser: &ScriptedBrowser, config: HarnessConfig) -> Harness {
    Harness::new(Arc::new(browser.clone()), Arc::new(registry()), config)
}

fn request(url: &str, spec: &str) -> EvaluationRequest {
    EvaluationRequest::new(url, spec).unwrap()
}

fn outcome(result: Option<EvaluationResult>) -> TestOutcome {
    match result {
        Some(EvaluationResult::Outcome(outcome)) => outcome,
        other => panic!("expected an outcome, got {:?}", other),
    }
}

fn failure(result: Option<EvaluationResult>) -> FailureReason {
    match result {
        Some(EvaluationResult::Failure(failure)) => failure.error,
        other => panic!("expected a failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_passing_page() {
    let browser = ScriptedBrowser::new().report(PAGE, "passes: 5\nfailures: 0\nduration: 0.12s\n");
    let harness = harness(&browser, test_config());

    let result = harness.evaluate(&request(PAGE, "demo")).await.unwrap();
    let outcome = outcome(result);

    assert_eq!(outcome.url(), PAGE);
    assert_eq!(outcome.passes(), 5);
    assert_eq!(outcome.failures(), 0);
    assert_eq!(outcome.duration(), "0.12s");
    assert_eq!(outcome.details(), None);
    assert!(outcome.is_success());
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_failing_page_lists_failed_assertions() {
    let report = "passes: 3\nfailures: 2\nduration: 0.4s\n\
        page\n\
        should have a title ‣\nAssertionError: expected undefined to exist\n\
        should have a footer ‣\nAssertionError: expected 0 to be above 0\n";
    let browser = ScriptedBrowser::new().report(PAGE, report);
    let harness = harness(&browser, test_config());

    let outcome = outcome(harness.evaluate(&request(PAGE, "demo")).await.unwrap());

    assert_eq!(outcome.passes(), 3);
    assert_eq!(outcome.failures(), 2);
    assert_eq!(
        outcome.details(),
        Some(&["should have a title".to_string(), "should have a footer".to_string()][..])
    );
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn test_unreachable_origin() {
    let browser = ScriptedBrowser::new().unreachable(PAGE);
    let harness = harness(&browser, test_config());

    let result = harness.evaluate(&request(PAGE, "demo")).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(
        json,
        serde_json::json!({ "url": PAGE, "error": "Origin Is Unreachable" })
    );
    assert_eq!(browser.closes(), 1);
    let navigate = format!("navigate {}", PAGE);
    assert_eq!(browser.steps(0), vec!["launch", navigate.as_str(), "close"]);
}

#[tokio::test]
async fn test_unknown_spec_is_resource_not_found() {
    let browser = ScriptedBrowser::new();
    let harness = harness(&browser, test_config());

    let result = harness.evaluate(&request(PAGE, "noSuchSpec")).await.unwrap();

    assert_eq!(failure(result), FailureReason::ResourceNotFound);
    assert_eq!(browser.closes(), 1);
    assert!(!browser.steps(0).iter().any(|step| step == "run"));
}

#[tokio::test]
async fn test_missing_library_is_resource_not_found() {
    let browser = ScriptedBrowser::new().missing_resource(MOCHA);
    let harness = harness(&browser, test_config());

    let result = harness.evaluate(&request(PAGE, "demo")).await.unwrap();

    assert_eq!(failure(result), FailureReason::ResourceNotFound);
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_protocol_step_order() {
    let browser = ScriptedBrowser::new();
    let harness = harness(&browser, test_config());

    harness.evaluate(&request(PAGE, "demo")).await.unwrap();

    let steps = browser.steps(0);
    assert_eq!(steps.len(), 8);
    assert_eq!(steps[0], "launch");
    assert_eq!(steps[1], format!("navigate {}", PAGE));
    assert_eq!(steps[2], format!("inject {}", CHAI));
    assert_eq!(steps[3], format!("inject {}", MOCHA));
    assert!(steps[4].starts_with("inject inline script"));
    assert_eq!(steps[5], "run");
    assert_eq!(steps[6], "scrape mocha");
    assert_eq!(steps[7], "close");
}

#[tokio::test(start_paused = true)]
async fn test_hanging_suite_times_out_and_closes() {
    let browser = ScriptedBrowser::new().hang_suite();
    let harness = harness(&browser, test_config().suite_timeout(Duration::from_secs(5)));

    let err = harness.evaluate(&request(PAGE, "demo")).await.unwrap_err();

    match err {
        HarnessError::ExecutionTimeout { url, timeout } => {
            assert_eq!(url, PAGE);
            assert_eq!(timeout, Duration::from_secs(5));
        }
        other => panic!("expected a timeout, got {:?}", other),
    }
    assert_eq!(browser.launches(), 1);
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_launch_failure_is_an_error() {
    let browser = ScriptedBrowser::new().fail_launch();
    let harness = harness(&browser, test_config());

    let err = harness.evaluate(&request(PAGE, "demo")).await.unwrap_err();

    assert!(matches!(err, HarnessError::Launch(_)));
    assert_eq!(browser.closes(), 0);
}

#[tokio::test]
async fn test_unparseable_report_is_absent() {
    let browser = ScriptedBrowser::new().report(PAGE, "Uncaught TypeError: mocha is not defined");
    let harness = harness(&browser, test_config());

    let result = harness.evaluate(&request(PAGE, "demo")).await.unwrap();

    assert!(result.is_none());
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_concurrent_evaluations_keep_their_urls() {
    let pages: Vec<String> = (0..6).map(|i| format!("https://student{}.test/", i)).collect();
    let mut browser = ScriptedBrowser::new()
        .step_delay(Duration::from_millis(5))
        .unreachable(pages[3].as_str());
    for (i, page) in pages.iter().enumerate() {
        browser = browser.report(page.as_str(), format!("passes: {}\nfailures: 0\nduration: 1ms\n", i));
    }
    let harness = harness(&browser, test_config().max_concurrency(2));

    let requests: Vec<EvaluationRequest> = pages.iter().map(|page| request(page, "demo")).collect();
    let results = harness.evaluate_all(&requests).await;

    assert_eq!(results.len(), pages.len());
    for (i, (page, result)) in pages.iter().zip(results).enumerate() {
        let result = result.unwrap().unwrap();
        assert_eq!(result.url(), page);
        match result {
            EvaluationResult::Outcome(outcome) => assert_eq!(outcome.passes(), i as u32),
            EvaluationResult::Failure(failure) => {
                assert_eq!(i, 3);
                assert_eq!(failure.error, FailureReason::OriginUnreachable);
            }
        }
    }

    assert_eq!(browser.launches(), 6);
    assert_eq!(browser.closes(), 6);
    assert!(browser.peak_open() <= 2, "peak open was {}", browser.peak_open());
}

#[tokio::test]
async fn test_builtin_specs_drive_the_suite() {
    let browser = ScriptedBrowser::new();
    let harness = Harness::new(
        Arc::new(browser.clone()),
        Arc::new(SpecRegistry::builtin()),
        test_config(),
    );

    let result = harness.evaluate(&request(PAGE, "cvTests")).await.unwrap();

    assert!(outcome(result).is_success());
}

#[tokio::test]
async fn test_failing_spec_injection_is_resource_not_found() {
    let browser = ScriptedBrowser::new().fail_inline_injection();
    let harness = harness(&browser, test_config());

    let result = harness.evaluate(&request(PAGE, "demo")).await.unwrap();

    assert_eq!(failure(result), FailureReason::ResourceNotFound);
    assert_eq!(browser.closes(), 1);
    assert!(!browser.steps(0).iter().any(|step| step == "run"));
}

#[tokio::test]
async fn test_suite_error_is_execution_error() {
    let browser = ScriptedBrowser::new().fail_suite();
    let harness = harness(&browser, test_config());

    let err = harness.evaluate(&request(PAGE, "demo")).await.unwrap_err();

    match err {
        HarnessError::Execution { url, .. } => assert_eq!(url, PAGE),
        other => panic!("expected an execution error, got {:?}", other),
    }
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn test_missing_report_element_is_execution_error() {
    let browser = ScriptedBrowser::new().missing_report();
    let harness = harness(&browser, test_config());

    let err = harness.evaluate(&request(PAGE, "demo")).await.unwrap_err();

    assert!(matches!(err, HarnessError::Execution { .. }), "got {:?}", err);
    assert_eq!(browser.closes(), 1);
    assert_eq!(browser.steps(0).last().map(String::as_str), Some("close"));
}

#[tokio::test]
async fn test_browser_command_timeout_is_execution_timeout() {
    let browser = ScriptedBrowser::new().time_out_suite();
    let harness = harness(&browser, test_config().suite_timeout(Duration::from_secs(120)));

    let err = harness.evaluate(&request(PAGE, "demo")).await.unwrap_err();

    match err {
        HarnessError::ExecutionTimeout { url, timeout } => {
            assert_eq!(url, PAGE);
            assert_eq!(timeout, Duration::from_secs(120));
        }
        other => panic!("expected a timeout, got {:?}", other),
    }
    assert_eq!(browser.closes(), 1);
}
