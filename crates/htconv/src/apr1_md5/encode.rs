use super::APR1_PREFIX;
use super::mix::Md5Digest;
use super::salt::Salt;

/// Custom base64 alphabet (itoa64) used by APR1-MD5.
///
/// Same as APR's `to64()` and crypt(3). Unlike standard base64 it starts
/// with `./` and puts digits before letters.
const ITOA64: &[u8; 64] = b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Length of the encoded digest in an APR1 record.
pub const ENCODED_LEN: usize = 22;

/// Digest byte triples, in output order. The fifth group takes byte 5 out of
/// sequence; that is how APR lays it out.
const GROUPS: [[usize; 3]; 5] = [[0, 6, 12], [1, 7, 13], [2, 8, 14], [3, 9, 15], [4, 10, 5]];

/// Append 4 characters for the 24 bits `a:b:c`, low 6 bits first.
fn to64(out: &mut String, a: u8, b: u8, c: u8) {
    let mut v = u32::from(a) << 16 | u32::from(b) << 8 | u32::from(c);
    for _ in 0..4 {
        out.push(char::from(ITOA64[(v & 0x3f) as usize]));
        v >>= 6;
    }
}

/// Encode a 16-byte digest into the 22-character APR1 hash.
pub fn encode_digest(digest: &Md5Digest) -> String {
    let mut out = String::with_capacity(ENCODED_LEN + 2);
    for [a, b, c] in GROUPS {
        to64(&mut out, digest[a], digest[b], digest[c]);
    }
    // Byte 11 only needs two characters; the other two are always `..`.
    to64(&mut out, 0, 0, digest[11]);
    out.truncate(ENCODED_LEN);
    out
}

/// Assemble the `$apr1$<salt>$<hash>` record.
pub fn format_record(salt: &Salt, digest: &Md5Digest) -> String {
    format!("{APR1_PREFIX}{salt}${}", encode_digest(digest))
}
