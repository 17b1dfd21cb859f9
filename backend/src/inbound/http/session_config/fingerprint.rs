//! Short, loggable fingerprint of the session signing key.

use actix_web::cookie::Key;
use sha2::{Digest, Sha256};

const FINGERPRINT_BYTES: usize = 8;

/// First eight bytes of the SHA-256 of the signing half, hex encoded.
///
/// ```rust
/// use actix_web::cookie::Key;
/// use lifeline::inbound::http::session_config::fingerprint::key_fingerprint;
///
/// assert_eq!(key_fingerprint(&Key::generate()).len(), 16);
/// ```
#[must_use]
pub fn key_fingerprint(key: &Key) -> String {
    let digest = Sha256::digest(key.signing());
    hex::encode(&digest[..FINGERPRINT_BYTES])
}
