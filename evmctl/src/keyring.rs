use std::fs;
use std::path::{Path, PathBuf};

use cosmrs::crypto::secp256k1::SigningKey;
use error_stack::{ensure, Result, ResultExt};
use thiserror::Error;
use tracing::debug;

use crate::report::ResultCompatExt;

const KEY_FILE_EXTENSION: &str = "key";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("invalid key name {0}")]
    InvalidName(String),
    #[error("failed to read key {0}")]
    Read(String),
    #[error("key {0} is not a hex encoded secp256k1 private key")]
    InvalidKey(String),
}

/// Keys stored as `<dir>/<name>.key`, each file holding a hex encoded private key.
#[derive(Debug, Clone)]
pub struct Keyring {
    dir: PathBuf,
}

impl Keyring {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn signing_key(&self, name: &str) -> Result<SigningKey, Error> {
        ensure!(
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
                && !name.starts_with('.'),
            Error::InvalidName(name.to_string())
        );

        let path = self.dir.join(format!("{name}.{KEY_FILE_EXTENSION}"));
        debug!(path = %path.display(), "loading key");

        let contents = fs::read_to_string(&path)
            .change_context(Error::Read(name.to_string()))
            .attach_printable_lazy(|| path.display().to_string())?;
        let contents = contents.trim();

        let bytes = hex::decode(contents.strip_prefix("0x").unwrap_or(contents))
            .change_context(Error::InvalidKey(name.to_string()))?;

        ResultCompatExt::change_context(
            SigningKey::from_slice(&bytes),
            Error::InvalidKey(name.to_string()),
        )
    }
}
