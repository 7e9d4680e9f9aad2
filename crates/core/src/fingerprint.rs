//! Deterministic cache key generation from request identity.

use sha2::{Digest, Sha256};

/// Compute a fingerprint for a request.
///
/// The fingerprint is a SHA-256 hex digest of the normalized request
/// identity: uppercased method, trimmed URL, the given headers sorted by
/// lowercased name, and the body if any. Two requests with the same
/// identity always produce the same fingerprint.
pub fn fingerprint(method: &str, url: &str, headers: &[(&str, &str)], body: Option<&[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.trim().to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.trim().as_bytes());
    hasher.update(b"\n");

    let mut sorted: Vec<(String, &str)> =
        headers.iter().map(|(name, value)| (name.to_ascii_lowercase(), *value)).collect();
    sorted.sort();
    for (name, value) in &sorted {
        hasher.update(name.as_bytes());
        hasher.update(b":");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }

    if let Some(body) = body {
        hasher.update(body);
    }

    hex::encode(hasher.finalize())
}
