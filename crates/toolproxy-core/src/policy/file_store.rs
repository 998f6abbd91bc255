//! Directory-backed policy store

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::store::{PolicyError, PolicyResult, PolicyStore};
use super::user::UserPolicy;

const EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Reads `<directory>/<identity>.yml` (or `.yaml`) on every load
///
/// Each load reads the whole file before parsing, so a document replaced on
/// disk is observed either entirely old or entirely new.
#[derive(Debug, Clone)]
pub struct FilePolicyStore {
    directory: PathBuf,
}

impl FilePolicyStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Identities are used as file stems, so anything that could leave the
    /// policy directory has no document.
    fn is_valid_identity(identity: &str) -> bool {
        !identity.is_empty()
            && !identity.starts_with('.')
            && !identity.contains(['/', '\\', '\0'])
    }
}

#[async_trait]
impl PolicyStore for FilePolicyStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self, identity: &str) -> PolicyResult<Option<UserPolicy>> {
        if !Self::is_valid_identity(identity) {
            return Ok(None);
        }

        for ext in EXTENSIONS {
            let path = self.directory.join(format!("{}.{}", identity, ext));
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(PolicyError::Io {
                        identity: identity.to_string(),
                        source,
                    })
                }
            };
            let policy = UserPolicy::from_yaml(&content).map_err(|e| PolicyError::Malformed {
                identity: identity.to_string(),
                message: e.to_string(),
            })?;
            return Ok(Some(policy));
        }
        Ok(None)
    }
}
