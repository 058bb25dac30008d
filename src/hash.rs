//! HMAC / digest primitives shared by both signature engines.
//!
//! All functions are pure and stateless. HMAC keys of arbitrary length are
//! supported (keys longer than the block size are shortened by hashing,
//! which `hmac` does internally).

use base64::engine::general_purpose;
use base64::Engine;
use hmac::Hmac;
use sha1::Sha1;
use sha2::digest::Mac;
use sha2::{Digest, Sha256};

use crate::error::S3Error;

pub(crate) fn hmac_sha1(key: &[u8], message: &[u8]) -> Result<Vec<u8>, S3Error> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub(crate) fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>, S3Error> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub(crate) fn sha256_hex(message: &[u8]) -> String {
    let mut hasher = Sha256::default();
    hasher.update(message);
    hex::encode(hasher.finalize().as_slice())
}

/// base64-encoded MD5, the `Content-MD5` header format on the legacy path.
pub(crate) fn md5_base64(message: &[u8]) -> String {
    general_purpose::STANDARD.encode(md5::compute(message).as_ref())
}

pub(crate) fn base64_standard(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}
