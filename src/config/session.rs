//! Session Config

use std::path::PathBuf;

use clap::Args;

use crate::session::FileSessionStorage;

/// Session storage settings.
#[derive(Debug, Clone, Args)]
pub struct SessionConfig {
    /// File holding the cart, last location and profile email
    #[arg(long, env = "CHOPNOW_SESSION_FILE", default_value = ".chopnow/session.json")]
    pub session_file: PathBuf,
}

impl SessionConfig {
    /// File-backed storage at the configured path.
    #[must_use]
    pub fn storage(&self) -> FileSessionStorage {
        FileSessionStorage::new(&self.session_file)
    }
}
