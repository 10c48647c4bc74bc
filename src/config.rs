//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for page-grader, supporting:
//! - Environment variables for all configurable values
//! - Defaults that work for a local Chrome install
//! - Builder-style overrides applied by the CLI
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PAGE_GRADER_CHROME_PATH` | Chrome/Chromium executable | auto-detected |
//! | `PAGE_GRADER_NO_SANDBOX` | Launch Chrome with `--no-sandbox` | `true` |
//! | `PAGE_GRADER_REQUEST_TIMEOUT` | CDP request and navigation timeout (seconds) | `30` |
//! | `PAGE_GRADER_PROFILE_DIR` | Base directory for per-evaluation profiles | `/tmp/page-grader` |
//! | `PAGE_GRADER_ASSERTION_LIBRARY_URL` | Assertion library injected into pages | chai 4.1.2 on unpkg |
//! | `PAGE_GRADER_TEST_FRAMEWORK_URL` | Test framework injected into pages | mocha 4.0.1 on unpkg |
//! | `PAGE_GRADER_SUITE_TIMEOUT` | Bounded wait for the in-page suite (seconds) | `30` |
//! | `PAGE_GRADER_MAX_CONCURRENCY` | Concurrent browser instances | `4` |
//! | `PAGE_GRADER_SPEC_DIR` | Directory with extra `*.js` specs | unset |
//!
//! # Example
//!
//! ```bash
//! export PAGE_GRADER_CHROME_PATH=/usr/bin/chromium
//! export PAGE_GRADER_MAX_CONCURRENCY=8
//! page-grader evaluate --spec cvTests https://student.github.io/cv/
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default assertion library injected before the suite
pub const DEFAULT_ASSERTION_LIBRARY_URL: &str = "https://unpkg.com/chai@4.1.2/chai.js";

/// Default BDD test framework injected before the suite
pub const DEFAULT_TEST_FRAMEWORK_URL: &str = "https://unpkg.com/mocha@4.0.1/mocha.js";

/// Default CDP request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Default bounded wait for suite completion (seconds)
pub const DEFAULT_SUITE_TIMEOUT: u64 = 30;

/// Default cap on concurrently running browsers
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Default base directory for browser profiles
pub const DEFAULT_PROFILE_DIR: &str = "/tmp/page-grader";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the Chrome executable
pub const ENV_CHROME_PATH: &str = "PAGE_GRADER_CHROME_PATH";

/// Environment variable toggling the Chrome sandbox
pub const ENV_NO_SANDBOX: &str = "PAGE_GRADER_NO_SANDBOX";

/// Environment variable for the CDP request timeout
pub const ENV_REQUEST_TIMEOUT: &str = "PAGE_GRADER_REQUEST_TIMEOUT";

/// Environment variable for the profile base directory
pub const ENV_PROFILE_DIR: &str = "PAGE_GRADER_PROFILE_DIR";

/// Environment variable for the assertion library URL
pub const ENV_ASSERTION_LIBRARY_URL: &str = "PAGE_GRADER_ASSERTION_LIBRARY_URL";

/// Environment variable for the test framework URL
pub const ENV_TEST_FRAMEWORK_URL: &str = "PAGE_GRADER_TEST_FRAMEWORK_URL";

/// Environment variable for the suite timeout
pub const ENV_SUITE_TIMEOUT: &str = "PAGE_GRADER_SUITE_TIMEOUT";

/// Environment variable for the concurrency cap
pub const ENV_MAX_CONCURRENCY: &str = "PAGE_GRADER_MAX_CONCURRENCY";

/// Environment variable for the extra spec directory
pub const ENV_SPEC_DIR: &str = "PAGE_GRADER_SPEC_DIR";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for page-grader
#[derive(Debug, Clone)]
pub struct Config {
    /// Browser launch settings
    pub browser: BrowserSettings,
    /// Libraries injected into every page
    pub resources: ResourceSettings,
    /// Evaluation scheduling settings
    pub harness: HarnessSettings,
}

/// Browser launch settings
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Explicit Chrome executable, auto-detected when `None`
    pub chrome_path: Option<PathBuf>,
    /// Pass `--no-sandbox` to Chrome
    pub no_sandbox: bool,
    /// CDP request timeout, also bounds navigation
    pub request_timeout: Duration,
    /// Base directory under which per-evaluation profiles are created
    pub profile_dir: PathBuf,
}

/// Remote script resources
#[derive(Debug, Clone)]
pub struct ResourceSettings {
    /// Assertion library URL
    pub assertion_library_url: String,
    /// Test framework URL
    pub test_framework_url: String,
}

/// Evaluation scheduling settings
#[derive(Debug, Clone)]
pub struct HarnessSettings {
    /// Bounded wait for the in-page suite
    pub suite_timeout: Duration,
    /// Maximum number of browsers running at once
    pub max_concurrency: usize,
    /// Directory with additional specs
    pub spec_dir: Option<PathBuf>,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            browser: BrowserSettings::from_env(),
            resources: ResourceSettings::from_env(),
            harness: HarnessSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            browser: BrowserSettings::defaults(),
            resources: ResourceSettings::defaults(),
            harness: HarnessSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl BrowserSettings {
    /// Create browser settings from environment variables
    pub fn from_env() -> Self {
        Self {
            chrome_path: env::var(ENV_CHROME_PATH).ok().map(PathBuf::from),
            no_sandbox: env::var(ENV_NO_SANDBOX)
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(true),
            request_timeout: Duration::from_secs(
                env::var(ENV_REQUEST_TIMEOUT)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            ),
            profile_dir: env::var(ENV_PROFILE_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_PROFILE_DIR)),
        }
    }

    /// Create browser settings with defaults
    pub fn defaults() -> Self {
        Self {
            chrome_path: None,
            no_sandbox: true,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            profile_dir: PathBuf::from(DEFAULT_PROFILE_DIR),
        }
    }
}

impl ResourceSettings {
    /// Create resource settings from environment variables
    pub fn from_env() -> Self {
        Self {
            assertion_library_url: env::var(ENV_ASSERTION_LIBRARY_URL)
                .unwrap_or_else(|_| DEFAULT_ASSERTION_LIBRARY_URL.to_string()),
            test_framework_url: env::var(ENV_TEST_FRAMEWORK_URL)
                .unwrap_or_else(|_| DEFAULT_TEST_FRAMEWORK_URL.to_string()),
        }
    }

    /// Create resource settings with defaults
    pub fn defaults() -> Self {
        Self {
            assertion_library_url: DEFAULT_ASSERTION_LIBRARY_URL.to_string(),
            test_framework_url: DEFAULT_TEST_FRAMEWORK_URL.to_string(),
        }
    }
}

impl HarnessSettings {
    /// Create harness settings from environment variables
    pub fn from_env() -> Self {
        Self {
            suite_timeout: Duration::from_secs(
                env::var(ENV_SUITE_TIMEOUT)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SUITE_TIMEOUT),
            ),
            max_concurrency: env::var(ENV_MAX_CONCURRENCY)
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(DEFAULT_MAX_CONCURRENCY),
            spec_dir: env::var(ENV_SPEC_DIR).ok().map(PathBuf::from),
        }
    }

    /// Create harness settings with defaults
    pub fn defaults() -> Self {
        Self {
            suite_timeout: Duration::from_secs(DEFAULT_SUITE_TIMEOUT),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            spec_dir: None,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a boolean flag value: "1"/"true"/"yes"/"on" and their negations
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get the profile base directory (convenience function)
pub fn profile_dir() -> PathBuf {
    get().browser.profile_dir.clone()
}
