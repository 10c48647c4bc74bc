//! Interpretation of the text report rendered by the in-page test runner.
//!
//! The runner's HTML reporter renders a stats block whose text reads
//! `passes: N\nfailures: N\nduration: T\n`, and one entry per failed test
//! whose title line ends in `‣` followed by the `AssertionError` message.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::outcome::TestOutcome;

/// Summary block: passes, failures, duration
static SUMMARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"passes: ([0-9]+)\nfailures: ([0-9]+)\nduration: (.+)\n")
        .expect("summary pattern is valid")
});

/// Title of a failed test, directly above its assertion error
static FAILURE_DETAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(should .*) ‣\nAssertionError").expect("failure detail pattern is valid")
});

/// Parse a scraped report into an outcome for `page_url`.
///
/// Returns `None` when the summary block is missing or malformed. Details are
/// collected whenever the failure count is not the literal string `"0"`.
pub fn parse_report(page_url: &str, report: &str) -> Option<TestOutcome> {
    let summary = SUMMARY.captures(report)?;
    let passes_text = &summary[1];
    let failures_text = &summary[2];
    let duration = &summary[3];

    let (Ok(passes), Ok(failures)) = (passes_text.parse::<u32>(), failures_text.parse::<u32>()) else {
        warn!(url = page_url, passes = passes_text, failures = failures_text, "report counts out of range");
        return None;
    };

    let details = (failures_text != "0").then(|| failure_details(report));

    match TestOutcome::new(page_url, passes, failures, duration, details) {
        Ok(outcome) => Some(outcome),
        Err(err) => {
            warn!(url = page_url, error = %err, "report summary is inconsistent");
            None
        }
    }
}

/// All failed-test descriptions in document order, markers stripped
pub fn failure_details(report: &str) -> Vec<String> {
    FAILURE_DETAIL
        .captures_iter(report)
        .map(|caps| caps[1].to_string())
        .collect()
}
