//! OAuth token persistence.
//!
//! The token is kept in a small TOML secrets file:
//!
//! ```toml
//! token = "y0_AgAAAAB..."
//! ```
//!
//! Keep this file private: the token grants full access to the account.

use std::{fmt, fs, io, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use veil::Redact;

use crate::error::{Error, Result};

/// An OAuth token for the catalog service.
///
/// `Debug` output is redacted so the token never ends up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Redact)]
#[redact(all)]
pub struct Token(String);

/// On-disk layout of the secrets file.
#[derive(Deserialize, Serialize)]
struct Secrets {
    token: String,
}

impl Token {
    /// Secrets files larger than this are rejected before reading.
    const MAX_FILE_SIZE: u64 = 1024;

    /// Loads the token from a TOML secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is too large, is not
    /// valid TOML, has no `token` key or holds an invalid token.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Prevent out-of-memory condition: the secrets file should be small.
        let file_size = fs::metadata(path)?.len();
        if file_size > Self::MAX_FILE_SIZE {
            return Err(Error::invalid_argument(format!(
                "{} is too large ({file_size} bytes)",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let secrets = toml::from_str::<Secrets>(&contents)?;
        secrets.token.parse()
    }

    /// Saves the token to a TOML secrets file, replacing its contents.
    ///
    /// On Unix the file is created with mode `0600`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string(&Secrets {
            token: self.0.clone(),
        })?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        io::Write::write_all(&mut file, contents.as_bytes())?;
        debug!("saved token to {}", path.display());

        Ok(())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        if token.is_empty() {
            return Err(Error::invalid_argument("token is empty"));
        }
        if token.contains(|chr: char| chr.is_whitespace() || chr.is_control()) {
            return Err(Error::invalid_argument(
                "token contains whitespace or control characters",
            ));
        }

        Ok(Self(token.to_owned()))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
