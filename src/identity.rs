// src/identity.rs
// Content-addressed alert identity.
//
// The upstream agency re-issues the same logical alert with a fresh feed id
// on every poll, and route lists for identical alert text differ between the
// bus and train feeds. Only header + description are stable, so only they
// feed the fingerprint.

use std::fmt;

/// Hex length of a fingerprint (8 digest bytes).
pub const FINGERPRINT_LEN: usize = 16;

/// Stable content fingerprint of an alert. Derived from header + description
/// only; never from the feed-assigned id or the affected-route list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an already-computed hex string (ledger deserialization, tests).
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint for an alert's text content.
///
/// Sha256 over `header 0x1F description`, truncated to 8 bytes of hex. The
/// separator byte keeps ("ab", "c") distinct from ("a", "bc"). Pure and
/// total: empty or malformed text still hashes deterministically.
pub fn fingerprint(header: &str, description: &str) -> Fingerprint {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(header.as_bytes());
    hasher.update([0x1f]);
    hasher.update(description.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(FINGERPRINT_LEN);
    for b in digest.iter().take(FINGERPRINT_LEN / 2) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    Fingerprint(out)
}
