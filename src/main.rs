use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use page_grader::browser::{ChromeBackend, cleanup_stale_profiles};
use page_grader::config;
use page_grader::logging;
use page_grader::outcome::{BatchReport, EvaluationRecord, EvaluationResult};
use page_grader::report::parse_report;
use page_grader::specs::SpecRegistry;
use page_grader::{EvaluationRequest, Harness, HarnessConfig};

/// Profiles older than this are left over from crashed runs
const STALE_PROFILE_AGE: Duration = Duration::from_secs(60 * 60);

/// Page Grader - grade student web pages with in-browser test suites
#[derive(Parser, Debug)]
#[command(
    name = "page-grader",
    about = "Grade student web pages by running assertion suites in headless Chrome",
    after_help = "ENVIRONMENT VARIABLES:\n\
        PAGE_GRADER_CHROME_PATH              Chrome/Chromium executable\n\
        PAGE_GRADER_NO_SANDBOX               Launch Chrome with --no-sandbox (default: true)\n\
        PAGE_GRADER_REQUEST_TIMEOUT          Navigation/CDP timeout in seconds\n\
        PAGE_GRADER_PROFILE_DIR              Base directory for browser profiles\n\
        PAGE_GRADER_ASSERTION_LIBRARY_URL    Assertion library script URL\n\
        PAGE_GRADER_TEST_FRAMEWORK_URL       Test framework script URL\n\
        PAGE_GRADER_SUITE_TIMEOUT            Suite timeout in seconds\n\
        PAGE_GRADER_MAX_CONCURRENCY          Concurrent browsers\n\
        PAGE_GRADER_SPEC_DIR                 Directory with extra *.js specs"
)]
struct Args {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Grade one or more pages against a spec
    Evaluate {
        /// Spec name to run
        #[arg(short, long)]
        spec: String,

        /// Page URLs to grade
        #[arg(required = true)]
        urls: Vec<String>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,

        /// Maximum number of browsers running at once
        #[arg(short, long, env = "PAGE_GRADER_MAX_CONCURRENCY")]
        concurrency: Option<usize>,

        /// Seconds to wait for the suite to complete
        #[arg(short, long, env = "PAGE_GRADER_SUITE_TIMEOUT")]
        timeout: Option<u64>,

        /// Directory with additional *.js specs
        #[arg(long, env = "PAGE_GRADER_SPEC_DIR")]
        spec_dir: Option<PathBuf>,
    },

    /// List registered specs
    Specs {
        /// Directory with additional *.js specs
        #[arg(long, env = "PAGE_GRADER_SPEC_DIR")]
        spec_dir: Option<PathBuf>,
    },

    /// Interpret a saved report text file
    Parse {
        /// File holding the scraped report text
        file: PathBuf,

        /// URL to attribute the result to
        #[arg(long, default_value = "about:blank")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_cli(args.log_json);

    match args.command {
        Some(Commands::Evaluate {
            spec,
            urls,
            json,
            concurrency,
            timeout,
            spec_dir,
        }) => {
            let registry = load_registry(spec_dir.as_ref())?;
            if registry.get(&spec).is_none() {
                warn!(spec = %spec, "spec is not registered; every page will report Page Not Found");
            }

            let mut harness_config = HarnessConfig::default();
            if let Some(max) = concurrency {
                harness_config = harness_config.max_concurrency(max);
            }
            if let Some(secs) = timeout {
                harness_config = harness_config.suite_timeout(Duration::from_secs(secs));
            }

            let profile_dir = config::profile_dir();
            match cleanup_stale_profiles(&profile_dir, STALE_PROFILE_AGE) {
                Ok(0) => {}
                Ok(n) => info!(removed = n, "removed stale browser profiles"),
                Err(e) => warn!(error = %e, "failed to sweep stale browser profiles"),
            }

            let requests = urls
                .iter()
                .map(|url| EvaluationRequest::new(url.as_str(), spec.as_str()))
                .collect::<Result<Vec<_>, _>>()?;

            let harness = Harness::new(
                Arc::new(ChromeBackend::from_env().suite_timeout(harness_config.suite_timeout)),
                Arc::new(registry),
                harness_config,
            );
            let results = harness.evaluate_all(&requests).await;

            let records: Vec<EvaluationRecord> = requests
                .iter()
                .zip(results)
                .map(|(request, result)| match result {
                    Ok(result) => EvaluationRecord {
                        url: request.page_url().to_string(),
                        result,
                        fatal: None,
                    },
                    Err(e) => EvaluationRecord {
                        url: request.page_url().to_string(),
                        result: None,
                        fatal: Some(e.to_string()),
                    },
                })
                .collect();

            let report = BatchReport {
                spec,
                evaluated_at: chrono::Utc::now(),
                results: records,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }

        Some(Commands::Specs { spec_dir }) => {
            let registry = load_registry(spec_dir.as_ref())?;
            for name in registry.names() {
                println!("{}", name);
            }
        }

        Some(Commands::Parse { file, url }) => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read report {}", file.display()))?;
            match parse_report(&url, &text) {
                Some(outcome) => println!("{}", serde_json::to_string_pretty(&outcome)?),
                None => bail!("{} does not contain a test summary", file.display()),
            }
        }

        None => {
            println!("Page Grader - grade student web pages with in-browser test suites");
            println!();
            println!("Usage: page-grader <COMMAND>");
            println!();
            println!("Commands:");
            println!("  evaluate  Grade one or more pages against a spec");
            println!("  specs     List registered specs");
            println!("  parse     Interpret a saved report text file");
            println!();
            println!("Run with --help for more information.");
        }
    }

    Ok(())
}

/// Built-in specs plus those in `spec_dir`, if given
fn load_registry(spec_dir: Option<&PathBuf>) -> anyhow::Result<SpecRegistry> {
    let registry = SpecRegistry::builtin();
    match spec_dir {
        Some(dir) => registry
            .with_dir(dir)
            .with_context(|| format!("failed to load specs from {}", dir.display())),
        None => Ok(registry),
    }
}

fn print_report(report: &BatchReport) {
    println!("Spec: {}", report.spec);
    for record in &report.results {
        match (&record.result, &record.fatal) {
            (Some(EvaluationResult::Outcome(outcome)), _) => {
                let status = if outcome.is_success() { "PASS" } else { "FAIL" };
                println!(
                    "  {:<5} {}  passes: {}  failures: {}  duration: {}",
                    status,
                    record.url,
                    outcome.passes(),
                    outcome.failures(),
                    outcome.duration()
                );
                for detail in outcome.details().unwrap_or_default() {
                    println!("          - {}", detail);
                }
            }
            (Some(EvaluationResult::Failure(failure)), _) => {
                println!(
                    "  {:<5} {}  {} ({})",
                    "ERROR",
                    record.url,
                    failure.error,
                    failure.error.status_code()
                );
            }
            (None, Some(fatal)) => println!("  {:<5} {}  {}", "FATAL", record.url, fatal),
            (None, None) => println!("  {:<5} {}  report could not be parsed", "???", record.url),
        }
    }
}
