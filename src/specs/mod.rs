//! Registry of named assertion suites.
//!
//! A spec is a JavaScript function expression. It is embedded verbatim into
//! the page as `var prepareSpec = <body>;`, so it must not close over anything
//! outside itself. When invoked inside the page it registers `describe`/`it`
//! blocks against the page's own DOM using the injected `chai` and `mocha`
//! globals.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Result type for spec registry operations
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors raised while building a registry
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    /// A spec file or directory could not be read
    #[error("failed to read spec {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A spec file holds no code
    #[error("spec file {} is empty", path.display())]
    Empty { path: PathBuf },
}

/// A named, self-contained test-definition function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDefinition {
    name: String,
    body: String,
}

impl SpecDefinition {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// JavaScript source of the function expression
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Inline script that defines the global `prepareSpec` procedure
    pub fn prepare_script(&self) -> String {
        format!(";var prepareSpec = {};", self.body.trim())
    }
}

/// Built-in specs, compiled into the binary
const BUILTIN_SPECS: &[(&str, &str)] = &[
    ("cvTests", include_str!("cv.js")),
    ("htmlBasics", include_str!("html_basics.js")),
];

/// Read-only mapping from spec name to definition.
///
/// Built once with the `with_*` constructors, then shared behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct SpecRegistry {
    specs: BTreeMap<String, SpecDefinition>,
}

impl SpecRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in specs
    pub fn builtin() -> Self {
        BUILTIN_SPECS
            .iter()
            .fold(Self::new(), |registry, (name, body)| {
                registry.with_spec(SpecDefinition::new(*name, *body))
            })
    }

    /// Add a spec, replacing any spec with the same name
    pub fn with_spec(mut self, spec: SpecDefinition) -> Self {
        self.specs.insert(spec.name.clone(), spec);
        self
    }

    /// Add every `*.js` file in `dir`, named after the file stem
    pub fn with_dir(mut self, dir: &Path) -> SpecResult<Self> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SpecError::Io { path, source }
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err(dir))? {
            let path = entry.map_err(io_err(dir))?.path();
            if path.is_file() && path.extension().map(|e| e == "js").unwrap_or(false) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            let body = fs::read_to_string(&path).map_err(io_err(&path))?;
            if body.trim().is_empty() {
                return Err(SpecError::Empty { path });
            }
            debug!(spec = %name, path = %path.display(), "loaded spec from directory");
            self = self.with_spec(SpecDefinition::new(name, body));
        }

        Ok(self)
    }

    /// Exact-name lookup
    pub fn get(&self, name: &str) -> Option<&SpecDefinition> {
        self.specs.get(name)
    }

    /// Registered spec names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
