pub mod backend;
pub mod chrome;
pub mod profile;
pub mod scripted;
pub mod types;

pub use backend::{BrowserBackend, BrowserSession};
pub use chrome::ChromeBackend;
pub use profile::{BrowserProfile, cleanup_stale_profiles};
pub use scripted::ScriptedBrowser;
pub use types::{BrowserError, BrowserResult, ScriptSource};
