use crate::credentials::Credentials;
use crate::hash::{self, HashAlgorithm, hash_password, verify_password};
use rayon::prelude::*;
use snafu::{OptionExt, ResultExt, Snafu};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// Owner read/write only.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Errors that can occur during htpasswd file operations.
#[derive(Debug, Snafu)]
pub enum Error {
    /// User was not found in the htpasswd file.
    #[snafu(display("User '{username}' not found"))]
    UserNotFound { username: String },

    /// Username cannot be empty.
    #[snafu(display("Username cannot be empty"))]
    UsernameEmpty,

    /// Failed to open htpasswd file.
    #[snafu(display("Failed to open htpasswd file '{}'", path.display()))]
    FileOpen {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to read from htpasswd file.
    #[snafu(display("Failed to read htpasswd file '{}'", path.display()))]
    FileRead {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to save htpasswd file.
    #[snafu(display("Failed to save htpasswd file '{}'", path.display()))]
    FileSave {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to create parent directory.
    #[snafu(display("Failed to create parent directory '{}'", path.display()))]
    CreateDir {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to hash the password of a user.
    #[snafu(display("Failed to hash password for user '{username}'"))]
    Hash {
        source: hash::Error,
        username: String,
    },

    /// Failed to verify password.
    #[snafu(display("Failed to verify password"))]
    Verify { source: hash::Error },
}

/// An htpasswd file: `username:record` lines plus preserved comments.
#[derive(Debug)]
pub struct Htpasswd {
    entries: BTreeMap<String, String>,
    comments: Vec<String>,
}

impl Htpasswd {
    /// Hash every pair of a credentials file with the given algorithm.
    ///
    /// Passwords are hashed in parallel, each one independently. The first
    /// failure aborts the conversion.
    pub fn from_credentials(
        credentials: &Credentials,
        algorithm: HashAlgorithm,
    ) -> Result<Self, Error> {
        let pairs: Vec<(&str, &str)> = credentials.iter().collect();
        let entries = pairs
            .into_par_iter()
            .map(|(username, password)| -> Result<(String, String), Error> {
                let record = hash_password(password.as_bytes(), algorithm)
                    .context(HashSnafu { username })?;
                Ok((username.to_string(), record))
            })
            .collect::<Result<BTreeMap<_, _>, Error>>()?;

        tracing::info!(users = entries.len(), %algorithm, "hashed credentials");
        Ok(Self {
            entries,
            comments: Vec::new(),
        })
    }

    /// Open an existing htpasswd file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).context(FileOpenSnafu { path })?;
        let reader = BufReader::new(file);

        let mut entries = BTreeMap::new();
        let mut comments = Vec::new();

        for line in reader.lines() {
            let line = line.context(FileReadSnafu { path })?;
            let trimmed = line.trim();

            if trimmed.is_empty() {
                continue;
            }

            if trimmed.starts_with('#') {
                comments.push(trimmed.to_string());
                continue;
            }

            if let Some((username, record)) = trimmed.split_once(':') {
                snafu::ensure!(!username.is_empty(), UsernameEmptySnafu);
                entries.insert(username.to_string(), record.to_string());
            }
        }

        tracing::debug!(path = %path.display(), users = entries.len(), "opened htpasswd file");
        Ok(Self { entries, comments })
    }

    /// Write the file to `path`, replacing any previous content.
    ///
    /// On unix the file ends up readable and writable by its owner only.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).context(CreateDirSnafu { path: parent })?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(FILE_MODE);
        let mut file = options.open(path).context(FileSaveSnafu { path })?;

        // `mode` only applies on creation; existing files are tightened too.
        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(FILE_MODE))
            .context(FileSaveSnafu { path })?;

        for comment in &self.comments {
            writeln!(file, "{}", comment).context(FileSaveSnafu { path })?;
        }

        for (username, record) in &self.entries {
            writeln!(file, "{}:{}", username, record).context(FileSaveSnafu { path })?;
        }

        file.flush().context(FileSaveSnafu { path })?;
        tracing::debug!(path = %path.display(), users = self.entries.len(), "saved htpasswd file");
        Ok(())
    }

    /// Verify a user's password.
    pub fn verify_user(&self, username: &str, password: &str) -> Result<bool, Error> {
        let record = self.record(username).context(UserNotFoundSnafu { username })?;
        verify_password(password.as_bytes(), record).context(VerifySnafu)
    }

    /// The stored record of a user.
    pub fn record(&self, username: &str) -> Option<&str> {
        self.entries.get(username).map(String::as_str)
    }

    /// List all usernames, sorted.
    pub fn list_users(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Get the number of users.
    pub fn user_count(&self) -> usize {
        self.entries.len()
    }
}
