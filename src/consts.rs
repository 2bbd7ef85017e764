//! Project-wide constants.

use std::path::PathBuf;

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Where the summarizer service listens when run locally.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// The one path every submission is posted to.
pub const SUMMARIZE_PATH: &str = "/summarize";

/// Prefix for every error rendered into the display.
pub const ERROR_PREFIX: &str = "Error: ";

/// Shown when the service answers with neither a summary nor an error.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Shown when the request never produced a decodable answer.
pub const REQUEST_FAILED: &str = "Request failed";

/// Form field names understood by the summarizer service.
pub const FIELD_FILE: &str = "file";
pub const FIELD_TEXT: &str = "text";
pub const FIELD_SUMMARY_TYPE: &str = "summary_type";

/// Values the service accepts for `summary_type`.
pub const SUMMARY_TYPES: &[&str] = &["quick", "detailed"];

/// Default database path: `~/.scribe/scribe.db`.
pub fn default_db_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".scribe").join("scribe.db"))
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
