#![warn(missing_docs)]

//! Convert plaintext credential files into Apache htpasswd files.
//!
//! The heart of the crate is an APR1-MD5 implementation that produces
//! `$apr1$<salt>$<hash>` records byte-for-byte compatible with Apache
//! `htpasswd` and nginx. Plain SHA-1 (`{SHA}`) and bcrypt records are also
//! supported.
//!
//! # Example
//!
//! ```no_run
//! use htconv::{Credentials, HashAlgorithm, Htpasswd};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // One `username password` pair per line
//! let credentials = Credentials::open("users.txt")?;
//!
//! // Hash every password and write the htpasswd file
//! let htpasswd = Htpasswd::from_credentials(&credentials, HashAlgorithm::Apr1Md5)?;
//! htpasswd.save(".htpasswd")?;
//!
//! // Check a password against the result
//! assert!(htpasswd.verify_user("alice", "password123")?);
//! # Ok(())
//! # }
//! ```
//!
//! Single records can be produced directly:
//!
//! ```
//! let record = htconv::hash_apr1(b"password")?;
//! assert!(record.starts_with("$apr1$"));
//! assert!(htconv::apr1_md5::verify(b"password", &record)?);
//! # Ok::<(), htconv::Apr1Md5Error>(())
//! ```

pub mod apr1_md5;
mod credentials;
mod hash;
mod htpasswd;

pub use apr1_md5::{Error as Apr1Md5Error, hash_apr1};
pub use credentials::{Credentials, Error as CredentialsError};
pub use hash::{
    Error as HashError, HashAlgorithm, detect_algorithm, hash_password, verify_password,
};
pub use htpasswd::{Error as HtpasswdError, Htpasswd};
