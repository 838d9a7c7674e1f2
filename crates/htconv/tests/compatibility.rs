//! Cross-implementation compatibility tests
//!
//! These tests check our APR1-MD5 records against OpenSSL's `passwd -apr1`
//! and, when installed, Apache's htpasswd. Each test returns early when the
//! external tool is missing.

use htconv::apr1_md5::{self, APR1_PREFIX, Salt};
use htconv::{Credentials, HashAlgorithm, Htpasswd};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Check if the openssl binary is available
fn has_openssl() -> bool {
    Command::new("openssl")
        .arg("version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Check if Apache htpasswd is available
fn has_apache_htpasswd() -> bool {
    Path::new("/usr/bin/htpasswd").exists()
}

/// Run `openssl passwd -apr1` for a password and salt
fn openssl_apr1(password: &str, salt: &str) -> String {
    let output = Command::new("openssl")
        .args(["passwd", "-apr1", "-salt", salt, password])
        .output()
        .expect("Failed to run openssl");
    assert!(
        output.status.success(),
        "openssl failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim_end().to_string()
}

fn salt_of(record: &str) -> &str {
    let rest = record.strip_prefix(APR1_PREFIX).unwrap();
    rest.split_once('$').unwrap().0
}

const PASSWORDS: &[&str] = &[
    "a",
    "password",
    "testpass123",
    "exactly-16-bytes",
    "seventeen-bytes!!",
    "a-password-that-is-longer-than-thirty-two-bytes",
    "with spaces inside",
    "pässwörd",
];

//
// Test 1: Our records match OpenSSL's for the same salt
//

#[test]
fn test_generated_records_match_openssl() {
    if !has_openssl() {
        return;
    }

    for password in PASSWORDS {
        let record = htconv::hash_apr1(password.as_bytes()).unwrap();
        let expected = openssl_apr1(password, salt_of(&record));
        assert_eq!(record, expected, "password {password:?}");
    }
}

#[test]
fn test_itoa64_salts_match_openssl() {
    if !has_openssl() {
        return;
    }

    // Apache itself draws salts from the itoa64 alphabet.
    for salt in ["r31.....", "./abcXYZ", "xlWep/gn", "short"] {
        let ours = apr1_md5::hash_with_salt(b"myPassword", &Salt::parse(salt).unwrap());
        assert_eq!(ours, openssl_apr1("myPassword", salt), "salt {salt:?}");
    }
}

//
// Test 2: OpenSSL records verify with our library
//

#[test]
fn test_openssl_records_verify() {
    if !has_openssl() {
        return;
    }

    for password in PASSWORDS {
        let record = openssl_apr1(password, "Zz09AbYy");
        assert!(apr1_md5::verify(password.as_bytes(), &record).unwrap());
        assert!(!apr1_md5::verify(b"wrongpass", &record).unwrap());
    }
}

//
// Test 3: Apache htpasswd accepts our files and we accept its files
//

#[test]
fn test_our_file_with_apache_verify() {
    if !has_apache_htpasswd() {
        return;
    }

    let dir = TempDir::new().unwrap();
    let file_path = dir.path().join("test.htpasswd");

    let credentials: Credentials = "alice testpass123\nbob testpass456\n".parse().unwrap();
    Htpasswd::from_credentials(&credentials, HashAlgorithm::Apr1Md5)
        .unwrap()
        .save(&file_path)
        .unwrap();

    for (user, pass, expected) in [
        ("alice", "testpass123", true),
        ("bob", "testpass456", true),
        ("alice", "wrongpass", false),
    ] {
        let output = Command::new("/usr/bin/htpasswd")
            .args(["-vb", file_path.to_str().unwrap(), user, pass])
            .output()
            .unwrap();
        assert_eq!(
            output.status.success(),
            expected,
            "user {user}: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn test_apache_file_with_our_verify() {
    if !has_apache_htpasswd() {
        return;
    }

    let dir = TempDir::new().unwrap();
    let file_path = dir.path().join("test.htpasswd");
    let path = file_path.to_str().unwrap();

    for (flag, user, pass) in [
        ("-cmb", "apache_md5", "pass1"),
        ("-sb", "apache_sha", "pass2"),
        ("-Bb", "apache_bcrypt", "pass3"),
    ] {
        let status = Command::new("/usr/bin/htpasswd")
            .args([flag, path, user, pass])
            .status()
            .unwrap();
        assert!(status.success());
    }

    let htpasswd = Htpasswd::open(&file_path).unwrap();
    assert_eq!(htpasswd.user_count(), 3);
    assert!(htpasswd.verify_user("apache_md5", "pass1").unwrap());
    assert!(htpasswd.verify_user("apache_sha", "pass2").unwrap());
    assert!(htpasswd.verify_user("apache_bcrypt", "pass3").unwrap());
    assert!(!htpasswd.verify_user("apache_md5", "wrongpass").unwrap());
}
