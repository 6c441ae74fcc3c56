//! Durable token storage in a confy file next to the config.

use crate::{Result, APP_NAME};
use moodlift::TokenStore;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SESSION_FILE: &str = "session";

#[derive(Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

/// A token store backed by a file. Every `get` reads the file, so a logout
/// from another process shows up as an absent token.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// The session file in the standard OS config location.
    ///
    /// # Errors
    /// Returns an error if the OS config directory cannot be determined.
    pub fn new() -> Result<Self> {
        let path = confy::get_configuration_file_path(APP_NAME, Some(SESSION_FILE))?;
        Ok(Self::at(path))
    }

    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        if !self.path.exists() {
            return None;
        }
        match confy::load_path::<StoredSession>(&self.path) {
            Ok(stored) => stored.access_token.filter(|token| !token.is_empty()),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "unreadable session file");
                None
            }
        }
    }

    fn set(&self, token: &str) -> std::result::Result<(), moodlift::Error> {
        let stored = StoredSession {
            access_token: Some(token.to_string()),
        };
        confy::store_path(&self.path, stored)
            .map_err(|err| moodlift::Error::Storage(err.to_string()))?;
        debug!(path = %self.path.display(), "session stored");
        Ok(())
    }

    /// Deletes the session file. A file that cannot be deleted is overwritten
    /// with an empty session instead, which `get` reads as absent.
    fn clear(&self) {
        let err = match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "session cleared");
                return;
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => return,
            Err(err) => err,
        };
        warn!(path = %self.path.display(), error = %err, "cannot remove session, blanking it");
        if let Err(err) = confy::store_path(&self.path, StoredSession::default()) {
            warn!(path = %self.path.display(), error = %err, "failed to clear session");
        }
    }
}
