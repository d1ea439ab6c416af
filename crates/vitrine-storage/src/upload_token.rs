//! Signatures for upload URLs that point back at the API.
//!
//! Signature = hex(HMAC-SHA256(secret, "PUT\n{storage_key}\n{expires}")), where
//! `expires` is a unix timestamp in seconds.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::traits::{StorageError, StorageResult};

type HmacSha256 = Hmac<Sha256>;

fn upload_mac(secret: &[u8], storage_key: &str, expires: u64) -> StorageResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| StorageError::ConfigError(format!("Invalid upload signing secret: {}", e)))?;
    mac.update(format!("PUT\n{}\n{}", storage_key, expires).as_bytes());
    Ok(mac)
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Expiry timestamp `expires_in` from now
pub fn expiry_from_now(expires_in: Duration) -> u64 {
    unix_now().saturating_add(expires_in.as_secs())
}

/// Sign a PUT of `storage_key` valid until `expires`.
pub fn sign(secret: &[u8], storage_key: &str, expires: u64) -> StorageResult<String> {
    let mac = upload_mac(secret, storage_key, expires)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a signature made by [`sign`] and that `now` is not past `expires`.
pub fn verify(
    secret: &[u8],
    storage_key: &str,
    expires: u64,
    signature: &str,
    now: u64,
) -> StorageResult<()> {
    let provided = hex::decode(signature.trim())
        .map_err(|_| StorageError::Forbidden("malformed signature".to_string()))?;
    upload_mac(secret, storage_key, expires)?
        .verify_slice(&provided)
        .map_err(|_| StorageError::Forbidden("signature mismatch".to_string()))?;
    if now > expires {
        return Err(StorageError::Forbidden("upload URL has expired".to_string()));
    }
    Ok(())
}
