//! Apache APR1-MD5 password hashing.
//!
//! Records have the form `$apr1$<salt>$<hash>` and are accepted by Apache
//! `htpasswd`, nginx `auth_basic` and any other verifier of the APR variant of
//! MD5-crypt. The scheme is the one in APR's `apr_md5_encode()`
//! (`apr-util/crypto/apr_md5.c`), itself derived from FreeBSD's MD5 `crypt()`.
//!
//! A hash is computed in three steps:
//!
//! 1. [`generate_salt`] draws 8 alphanumeric characters from a [`SaltSource`].
//! 2. [`mix`] runs the seed digest and the 1000 MD5 rounds.
//! 3. [`format_record`] encodes the final digest with the `itoa64` alphabet.
//!
//! # Security Warning
//!
//! MD5 is cryptographically broken. This module exists for compatibility with
//! existing htpasswd consumers only and deliberately keeps every legacy quirk.

mod encode;
mod mix;
mod salt;

use snafu::{OptionExt, Snafu};

pub use encode::{ENCODED_LEN, encode_digest, format_record};
pub use mix::{Md5Digest, ROUNDS, mix};
pub use salt::{OsRandom, SALT_LEN, Salt, SaltSource, generate_salt};

/// APR1-MD5 record prefix.
pub const APR1_PREFIX: &str = "$apr1$";

/// Errors produced by APR1-MD5 hashing and verification.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The secure random source could not produce salt bytes.
    #[snafu(display("Secure random source failed to produce salt bytes"))]
    RandomSource { source: getrandom::Error },

    /// The string is not a well-formed APR1-MD5 record.
    #[snafu(display("Invalid APR1-MD5 record: {reason}"))]
    InvalidRecord { reason: &'static str },
}

/// Hash a password with a fresh salt from the operating system CSPRNG.
///
/// Returns the `$apr1$<salt>$<hash>` record. Empty passwords are hashed like
/// any other; callers that forbid them must check before calling.
pub fn hash_apr1(password: &[u8]) -> Result<String, Error> {
    hash_apr1_with(password, &mut OsRandom)
}

/// Hash a password with a salt drawn from the given source.
pub fn hash_apr1_with<S>(password: &[u8], source: &mut S) -> Result<String, Error>
where
    S: SaltSource + ?Sized,
{
    let salt = generate_salt(source)?;
    Ok(hash_with_salt(password, &salt))
}

/// Hash a password with an explicit salt.
///
/// This is pure: the same password and salt always give the same record.
pub fn hash_with_salt(password: &[u8], salt: &Salt) -> String {
    format_record(salt, &mix(password, salt))
}

/// Verify a password against an APR1-MD5 record.
///
/// The salt is taken from the record the way APR does it: everything after
/// the prefix up to the next `$`, at most 8 bytes.
pub fn verify(password: &[u8], record: &str) -> Result<bool, Error> {
    let rest = record.strip_prefix(APR1_PREFIX).context(InvalidRecordSnafu {
        reason: "missing $apr1$ prefix",
    })?;
    let salt = Salt::parse(rest)?;
    let computed = hash_with_salt(password, &salt);
    Ok(constant_time_eq(computed.as_bytes(), record.as_bytes()))
}

/// Compare two byte strings without short-circuiting on the first mismatch.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
