//! Page Grader - automated grading of student web pages in a headless browser.
//!
//! This crate provides:
//! - A browser session driver that loads a page, injects an assertion library,
//!   a BDD test framework and a named spec, then runs the suite in the page
//! - A report interpreter turning the runner's rendered text into results
//! - A registry of named, self-contained assertion suites
//! - A Chrome DevTools backend and a scripted backend for tests
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), page_grader::HarnessError> {
//! use page_grader::EvaluationResult;
//!
//! match page_grader::evaluate("https://student.github.io/cv/", "cvTests").await? {
//!     Some(EvaluationResult::Outcome(outcome)) => println!("{} passed", outcome.passes()),
//!     Some(EvaluationResult::Failure(failure)) => println!("{}", failure.error),
//!     None => println!("report could not be parsed"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod harness;
pub mod logging;
pub mod outcome;
pub mod report;
pub mod specs;

// Re-export harness types
pub use harness::{EvaluationRequest, Harness, HarnessConfig, HarnessError, HarnessResult, evaluate};

// Re-export result types
pub use outcome::{BatchReport, EvaluationFailure, EvaluationRecord, EvaluationResult, FailureReason, TestOutcome};

// Re-export browser backends
pub use browser::{BrowserBackend, BrowserError, BrowserSession, ChromeBackend, ScriptSource, ScriptedBrowser};

// Re-export spec registry
pub use specs::{SpecDefinition, SpecError, SpecRegistry};

pub use report::parse_report;
