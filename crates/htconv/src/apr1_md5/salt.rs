use super::{Error, InvalidRecordSnafu, RandomSourceSnafu};
use snafu::{ResultExt, ensure};
use std::fmt;

/// Salt length in characters for APR1-MD5.
pub const SALT_LEN: usize = 8;

/// Alphabet for freshly generated salts.
const SALT_ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Largest multiple of 62 that fits in a byte. Random bytes at or above it
/// are discarded so that `byte % 62` stays uniform.
const ACCEPT_BELOW: u8 = 248;

/// A source of cryptographically secure random bytes.
pub trait SaltSource {
    /// Fill `dest` entirely with random bytes.
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), getrandom::Error>;
}

/// The operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl SaltSource for OsRandom {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), getrandom::Error> {
        getrandom::fill(dest)
    }
}

impl<S: SaltSource + ?Sized> SaltSource for &mut S {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), getrandom::Error> {
        (**self).fill(dest)
    }
}

/// An APR1 salt: at most [`SALT_LEN`] ASCII bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Salt {
    bytes: [u8; SALT_LEN],
    len: usize,
}

impl Salt {
    /// Take the salt from the part of a record that follows `$apr1$`.
    ///
    /// Reading stops at the first `$` and after [`SALT_LEN`] bytes, as in APR.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let text = text.split('$').next().unwrap_or_default().as_bytes();
        let kept = &text[..text.len().min(SALT_LEN)];
        ensure!(
            kept.is_ascii(),
            InvalidRecordSnafu {
                reason: "salt is not ASCII"
            }
        );

        let mut bytes = [0u8; SALT_LEN];
        bytes[..kept.len()].copy_from_slice(kept);
        Ok(Self {
            bytes,
            len: kept.len(),
        })
    }

    /// The salt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_bytes()
            .iter()
            .try_for_each(|&b| fmt::Write::write_char(f, char::from(b)))
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Salt").field(&self.to_string()).finish()
    }
}

/// Generate an 8-character salt over `0-9A-Za-z`.
///
/// Each character is sampled uniformly. A failing source aborts generation;
/// nothing is retried.
pub fn generate_salt<S>(source: &mut S) -> Result<Salt, Error>
where
    S: SaltSource + ?Sized,
{
    let mut bytes = [0u8; SALT_LEN];
    let mut filled = 0;
    let mut pool = [0u8; SALT_LEN * 2];

    while filled < SALT_LEN {
        source.fill(&mut pool).context(RandomSourceSnafu)?;
        for &b in pool.iter().filter(|&&b| b < ACCEPT_BELOW) {
            if filled == SALT_LEN {
                break;
            }
            bytes[filled] = SALT_ALPHABET[usize::from(b % 62)];
            filled += 1;
        }
    }

    Ok(Salt {
        bytes,
        len: SALT_LEN,
    })
}
