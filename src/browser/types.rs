// Core types for browser automation

use std::fmt;

/// A script to add to the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// External script loaded by `src` URL
    Url(String),

    /// Inline script text
    Content(String),
}

impl ScriptSource {
    pub fn url(url: impl Into<String>) -> Self {
        ScriptSource::Url(url.into())
    }

    pub fn content(content: impl Into<String>) -> Self {
        ScriptSource::Content(content.into())
    }
}

impl fmt::Display for ScriptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptSource::Url(url) => write!(f, "{}", url),
            ScriptSource::Content(content) => write!(f, "inline script ({} bytes)", content.len()),
        }
    }
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// Error types for browser operations
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// Browser process or page could not be started
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// Profile directory could not be prepared
    #[error("browser profile error: {0}")]
    Profile(#[from] std::io::Error),

    /// Page did not load
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// Script tag failed to load or run
    #[error("failed to inject {resource}: {message}")]
    Injection { resource: String, message: String },

    /// In-page evaluation threw or the protocol call failed
    #[error("script evaluation failed: {0}")]
    Script(String),

    /// Protocol command was cancelled after the command timeout
    #[error("browser command timed out")]
    Timeout,

    /// Element with the requested id does not exist
    #[error("no element with id '{0}'")]
    ElementMissing(String),

    /// Browser did not shut down cleanly
    #[error("failed to close browser: {0}")]
    Close(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_source_display() {
        assert_eq!(
            ScriptSource::url("https://unpkg.com/chai@4.1.2/chai.js").to_string(),
            "https://unpkg.com/chai@4.1.2/chai.js"
        );
        assert_eq!(ScriptSource::content("var a;").to_string(), "inline script (6 bytes)");
    }
}
