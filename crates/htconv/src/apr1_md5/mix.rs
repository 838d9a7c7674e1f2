use super::APR1_PREFIX;
use super::salt::Salt;
use md5::{Digest, Md5};

/// Number of MD5 rounds in the APR1 algorithm.
pub const ROUNDS: u32 = 1000;

/// A raw 16-byte MD5 digest.
pub type Md5Digest = [u8; 16];

/// What goes into the MD5 input of a single round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RoundShape {
    /// Odd rounds open with the password and close with the digest; even
    /// rounds do the reverse.
    password_first: bool,
    /// Skipped on rounds divisible by 3.
    with_salt: bool,
    /// Skipped on rounds divisible by 7.
    with_password: bool,
}

impl RoundShape {
    fn of(round: u32) -> Self {
        Self {
            password_first: round & 1 == 1,
            with_salt: round % 3 != 0,
            with_password: round % 7 != 0,
        }
    }
}

/// Compute the final APR1 digest of a password and salt.
///
/// This follows `apr_md5_encode()`:
///
/// 1. `initial = MD5(password + salt + password)`
/// 2. Build `password + "$apr1$" + salt`, followed by `initial` repeated over
///    each 16-byte chunk of the password length, then one byte per bit of the
///    password length (NUL for a set bit, the first password byte otherwise).
/// 3. Hash that buffer to get the starting digest.
/// 4. Run [`ROUNDS`] rounds, each hashing a mix of password, salt and the
///    previous digest.
pub fn mix(password: &[u8], salt: &Salt) -> Md5Digest {
    let seed = seed_digest(password, salt.as_bytes());
    run_rounds(seed, password, salt.as_bytes(), ROUNDS)
}

fn seed_digest(password: &[u8], salt: &[u8]) -> Md5Digest {
    let initial: Md5Digest = Md5::new()
        .chain_update(password)
        .chain_update(salt)
        .chain_update(password)
        .finalize()
        .into();

    let mut buf = Vec::with_capacity(2 * password.len() + APR1_PREFIX.len() + salt.len() + 8);
    buf.extend_from_slice(password);
    buf.extend_from_slice(APR1_PREFIX.as_bytes());
    buf.extend_from_slice(salt);

    let mut remaining = password.len();
    while remaining > 0 {
        let chunk_len = remaining.min(initial.len());
        buf.extend_from_slice(&initial[..chunk_len]);
        remaining -= chunk_len;
    }

    let mut n = password.len();
    while n > 0 {
        if n & 1 == 1 {
            buf.push(0);
        } else {
            buf.push(password[0]);
        }
        n >>= 1;
    }

    Md5::digest(&buf).into()
}

/// The round loop. Each round depends on the digest of the one before it.
fn run_rounds(mut bin: Md5Digest, password: &[u8], salt: &[u8], rounds: u32) -> Md5Digest {
    for round in 0..rounds {
        let shape = RoundShape::of(round);
        // Feeding the hasher piecewise is the same as hashing the
        // concatenated round buffer.
        let mut muddle = Md5::new();

        if shape.password_first {
            muddle.update(password);
        } else {
            muddle.update(bin);
        }
        if shape.with_salt {
            muddle.update(salt);
        }
        if shape.with_password {
            muddle.update(password);
        }
        if shape.password_first {
            muddle.update(bin);
        } else {
            muddle.update(password);
        }

        bin = muddle.finalize().into();
    }
    bin
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salt(text: &str) -> Salt {
        Salt::parse(text).unwrap()
    }

    #[test]
    fn test_round_shape_table() {
        let shape = |password_first, with_salt, with_password| RoundShape {
            password_first,
            with_salt,
            with_password,
        };
        assert_eq!(RoundShape::of(0), shape(false, false, false));
        assert_eq!(RoundShape::of(1), shape(true, true, true));
        assert_eq!(RoundShape::of(3), shape(true, false, true));
        assert_eq!(RoundShape::of(7), shape(true, true, false));
        assert_eq!(RoundShape::of(14), shape(false, true, false));
        assert_eq!(RoundShape::of(21), shape(true, false, false));
        assert_eq!(RoundShape::of(42), shape(false, false, false));
        assert_eq!(RoundShape::of(999), shape(true, false, true));
    }

    #[test]
    fn test_mix_is_deterministic() {
        let s = salt("xxxxxxxx");
        assert_eq!(mix(b"password", &s), mix(b"password", &s));
    }

    #[test]
    fn test_mix_runs_exactly_rounds() {
        let s = salt("xxxxxxxx");
        let seed = seed_digest(b"password", s.as_bytes());
        let full = mix(b"password", &s);
        assert_eq!(run_rounds(seed, b"password", s.as_bytes(), ROUNDS), full);
        assert_ne!(run_rounds(seed, b"password", s.as_bytes(), ROUNDS - 1), full);
        assert_ne!(run_rounds(seed, b"password", s.as_bytes(), ROUNDS + 1), full);
    }

    #[test]
    fn test_rounds_are_chained() {
        let s = salt("xxxxxxxx");
        let seed = seed_digest(b"password", s.as_bytes());
        let ten = run_rounds(seed, b"password", s.as_bytes(), 10);

        // Round 0 hashes the seed followed by the password only.
        let first: Md5Digest = Md5::new()
            .chain_update(seed)
            .chain_update(b"password")
            .finalize()
            .into();
        assert_eq!(run_rounds(seed, b"password", s.as_bytes(), 1), first);
        assert_ne!(ten, first);
    }

    #[test]
    fn test_seed_for_empty_password() {
        // Both buffer loops are skipped: only the prefix and salt are hashed.
        let s = salt("xxxxxxxx");
        let expected: Md5Digest = Md5::digest(b"$apr1$xxxxxxxx").into();
        assert_eq!(seed_digest(b"", s.as_bytes()), expected);
    }

    #[test]
    fn test_seed_buffer_for_short_password() {
        // len 2 = 0b10: one prefix of `initial`, then the first byte and a NUL.
        let s = salt("abcdefgh");
        let initial = Md5::digest(b"xyabcdefghxy");
        let mut buf = b"xy$apr1$abcdefgh".to_vec();
        buf.extend_from_slice(&initial[..2]);
        buf.push(b'x');
        buf.push(0);
        let expected: Md5Digest = Md5::digest(&buf).into();
        assert_eq!(seed_digest(b"xy", s.as_bytes()), expected);
    }

    #[test]
    fn test_seed_buffer_for_password_over_one_chunk() {
        // len 17 = 0b10001: all of `initial`, one more byte of it, then NUL,
        // first byte, first byte, first byte, NUL.
        let password = b"seventeen-bytes!!";
        let s = salt("abcdefgh");
        let initial = Md5::new()
            .chain_update(password)
            .chain_update(b"abcdefgh")
            .chain_update(password)
            .finalize();
        let mut buf = password.to_vec();
        buf.extend_from_slice(b"$apr1$abcdefgh");
        buf.extend_from_slice(&initial);
        buf.extend_from_slice(&initial[..1]);
        buf.extend_from_slice(&[0, b's', b's', b's', 0]);
        let expected: Md5Digest = Md5::digest(&buf).into();
        assert_eq!(seed_digest(password, s.as_bytes()), expected);
    }
}
