use crate::apr1_md5::{self, APR1_PREFIX, constant_time_eq};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha1::{Digest, Sha1};
use snafu::{ResultExt, Snafu};
use std::str::FromStr;

const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
const BCRYPT_PREFIX: &str = "$2";
const SHA1_PREFIX: &str = "{SHA}";

/// Errors that can occur while hashing or verifying passwords.
#[derive(Debug, Snafu)]
pub enum Error {
    /// The algorithm name is not recognised.
    #[snafu(display("Unknown hash algorithm: {name}"))]
    UnknownAlgorithm { name: String },

    /// The record does not start with a known algorithm prefix.
    #[snafu(display("Cannot determine hash algorithm"))]
    UnrecognizedRecord,

    /// APR1-MD5 hashing or verification failed.
    #[snafu(display("APR1-MD5 error"))]
    Apr1Md5 { source: apr1_md5::Error },

    /// Bcrypt hashing or verification failed.
    #[snafu(display("Bcrypt error"))]
    Bcrypt { source: bcrypt::BcryptError },

    /// The base64 payload of a SHA-1 record is malformed.
    #[snafu(display("Invalid SHA-1 record"))]
    Sha1Decode { source: base64::DecodeError },
}

/// Supported htpasswd hash algorithms.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// Apache APR1-MD5, `$apr1$salt$hash`.
    #[default]
    Apr1Md5,
    /// Unsalted SHA-1, `{SHA}base64`.
    Sha1,
    /// Bcrypt, `$2b$cost$...`.
    Bcrypt,
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md5" | "apr1" | "apr1-md5" => Ok(HashAlgorithm::Apr1Md5),
            "sha" | "sha1" => Ok(HashAlgorithm::Sha1),
            "bcrypt" => Ok(HashAlgorithm::Bcrypt),
            _ => UnknownAlgorithmSnafu { name: s }.fail(),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Apr1Md5 => write!(f, "md5"),
            HashAlgorithm::Sha1 => write!(f, "sha1"),
            HashAlgorithm::Bcrypt => write!(f, "bcrypt"),
        }
    }
}

impl HashAlgorithm {
    /// Hash a password into an htpasswd record with this algorithm.
    pub fn hash(self, password: &[u8]) -> Result<String, Error> {
        hash_password(password, self)
    }
}

/// Hash a password using the specified algorithm.
pub fn hash_password(password: &[u8], algorithm: HashAlgorithm) -> Result<String, Error> {
    tracing::trace!(%algorithm, "hashing password");
    match algorithm {
        HashAlgorithm::Apr1Md5 => apr1_md5::hash_apr1(password).context(Apr1Md5Snafu),
        HashAlgorithm::Sha1 => Ok(format!(
            "{SHA1_PREFIX}{}",
            STANDARD.encode(Sha1::digest(password))
        )),
        // bcrypt produces its own prefix like $2b$12$...
        HashAlgorithm::Bcrypt => bcrypt::hash(password, BCRYPT_COST).context(BcryptSnafu),
    }
}

/// Verify a password against an htpasswd record.
pub fn verify_password(password: &[u8], record: &str) -> Result<bool, Error> {
    let algorithm = detect_algorithm(record).ok_or(Error::UnrecognizedRecord)?;

    match algorithm {
        HashAlgorithm::Apr1Md5 => apr1_md5::verify(password, record).context(Apr1Md5Snafu),
        HashAlgorithm::Sha1 => {
            let encoded = &record[SHA1_PREFIX.len()..];
            let expected = STANDARD.decode(encoded.trim()).context(Sha1DecodeSnafu)?;
            Ok(constant_time_eq(&Sha1::digest(password), &expected))
        }
        // All bcrypt variants ($2a$, $2b$, $2y$) are compatible for verification
        HashAlgorithm::Bcrypt => bcrypt::verify(password, record).context(BcryptSnafu),
    }
}

/// Detect the hash algorithm from a record.
pub fn detect_algorithm(record: &str) -> Option<HashAlgorithm> {
    if record.starts_with(APR1_PREFIX) {
        Some(HashAlgorithm::Apr1Md5)
    } else if record.starts_with(SHA1_PREFIX) {
        Some(HashAlgorithm::Sha1)
    } else if record.starts_with(BCRYPT_PREFIX) {
        Some(HashAlgorithm::Bcrypt)
    } else {
        None
    }
}
