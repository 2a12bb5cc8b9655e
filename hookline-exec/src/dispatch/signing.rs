//! Payload signatures in the form `t=<unix seconds>,v1=<hex hmac-sha256>`.
//!
//! The MAC covers `"<t>." ++ body`.

use hmac::{Hmac, Mac};
use hookline_core::SigningKey;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac(key: &SigningKey, timestamp: i64, body: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key.expose_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Some(mac)
}

/// `None` for an empty key; such targets are called unsigned.
pub fn sign(key: &SigningKey, timestamp: i64, body: &[u8]) -> Option<String> {
    if key.is_empty() {
        return None;
    }
    let digest = mac(key, timestamp, body)?.finalize().into_bytes();
    Some(format!("t={timestamp},v1={}", hex::encode(digest)))
}

/// Checks `header` against `body`, rejecting timestamps further than `tolerance_secs` from `now`.
pub fn verify(key: &SigningKey, header: &str, body: &[u8], now: i64, tolerance_secs: i64) -> bool {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", t)) => timestamp = t.parse::<i64>().ok(),
            Some(("v1", v)) => signatures.push(v),
            _ => {}
        }
    }
    let Some(timestamp) = timestamp else {
        return false;
    };
    if now.abs_diff(timestamp) > u64::try_from(tolerance_secs).unwrap_or(0) {
        return false;
    }
    signatures.into_iter().any(|sig| {
        let Ok(expected) = hex::decode(sig) else {
            return false;
        };
        mac(key, timestamp, body).is_some_and(|m| m.verify_slice(&expected).is_ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_verifies_and_detects_tampering() {
        let key = SigningKey::from_bytes(b"secret".to_vec());
        let header = sign(&key, 1_700_000_000, b"{}").unwrap();
        assert!(header.starts_with("t=1700000000,v1="));
        assert!(verify(&key, &header, b"{}", 1_700_000_010, 300));
        assert!(!verify(&key, &header, b"{ }", 1_700_000_010, 300));
        assert!(!verify(&key, &header, b"{}", 1_700_001_000, 300));

        let other = SigningKey::from_bytes(b"other".to_vec());
        assert!(!verify(&other, &header, b"{}", 1_700_000_010, 300));
    }

    #[test]
    fn extreme_timestamps_are_rejected() {
        let key = SigningKey::from_bytes(b"secret".to_vec());
        assert!(!verify(&key, "t=-9223372036854775808,v1=00", b"{}", 1_700_000_000, 300));
        assert!(!verify(&key, "t=9223372036854775807,v1=00", b"{}", -1, 300));
        assert!(!verify(&key, "t=1700000000,v1=00", b"{}", 1_700_000_000, i64::MIN));
    }

    #[test]
    fn empty_key_does_not_sign() {
        assert_eq!(sign(&SigningKey::default(), 1, b"{}"), None);
    }
}
