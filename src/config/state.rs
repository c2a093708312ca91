// Application state module
// Immutable state shared by every connection task

use std::io;
use std::path::PathBuf;

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Canonicalized served root; every resolved file path must stay inside it
    pub root: PathBuf,
}

impl AppState {
    /// Create `AppState`, canonicalizing the served root.
    ///
    /// A missing or unreadable root directory is a startup error.
    pub fn new(config: Config) -> io::Result<Self> {
        let root = PathBuf::from(&config.content.root).canonicalize()?;
        Ok(Self { config, root })
    }
}
