//! Plaintext credential files: one `username password` pair per line.

use snafu::{ResultExt, Snafu, ensure};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use zeroize::Zeroizing;

/// Errors that can occur while reading a credentials file.
#[derive(Debug, Snafu)]
pub enum Error {
    /// Failed to read the credentials file.
    #[snafu(display("Failed to read credentials file '{}'", path.display()))]
    FileRead {
        source: std::io::Error,
        path: PathBuf,
    },

    /// A line is not a single space-separated `username password` pair.
    #[snafu(display(
        "Line {line}: username and password must be separated by a single space"
    ))]
    MalformedLine { line: usize },

    /// Username cannot be empty.
    #[snafu(display("Line {line}: username cannot be empty"))]
    UsernameEmpty { line: usize },

    /// Username contains invalid character.
    #[snafu(display("Line {line}: username '{username}' contains invalid character ':'"))]
    UsernameInvalidCharacter { line: usize, username: String },

    /// Password cannot be empty.
    #[snafu(display("Line {line}: passwords must not be empty"))]
    PasswordEmpty { line: usize },

    /// The input holds no pairs at all.
    #[snafu(display("No username/password pairs found"))]
    NoEntries,
}

/// Username/password pairs read from a plaintext file.
///
/// Passwords are wiped from memory when dropped. A username that appears more
/// than once keeps the password from its last line.
#[derive(Default)]
pub struct Credentials {
    entries: BTreeMap<String, Zeroizing<String>>,
}

impl Credentials {
    /// Read and parse a credentials file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = Zeroizing::new(fs::read_to_string(path).context(FileReadSnafu { path })?);
        text.parse()
    }

    /// Number of distinct usernames.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(username, password)` pairs ordered by username.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(username, password)| (username.as_str(), password.as_str()))
    }
}

impl FromStr for Credentials {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut entries = BTreeMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            if raw.trim().is_empty() {
                continue;
            }

            let Some((username, password)) = raw.split_once(' ') else {
                return MalformedLineSnafu { line }.fail();
            };
            ensure!(!password.contains(' '), MalformedLineSnafu { line });

            let username = username.trim_matches(' ');
            let password = password.trim_matches(' ');
            ensure!(!username.is_empty(), UsernameEmptySnafu { line });
            ensure!(
                !username.contains(':'),
                UsernameInvalidCharacterSnafu { line, username }
            );
            ensure!(!password.is_empty(), PasswordEmptySnafu { line });

            entries.insert(username.to_string(), Zeroizing::new(password.to_string()));
        }

        ensure!(!entries.is_empty(), NoEntriesSnafu);
        tracing::debug!(count = entries.len(), "parsed credentials");
        Ok(Self { entries })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("usernames", &self.entries.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
