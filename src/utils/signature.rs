// src/utils/signature.rs

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a gateway webhook signature: HMAC-SHA256 over the exact raw
/// request body, hex-encoded in the signature header.
///
/// Accepts the digest bare or with a `sha256=` prefix. The comparison is
/// performed by `Mac::verify_slice`, which is constant-time; a
/// length-mismatched or undecodable signature is a plain mismatch, never a
/// distinguishable error.
pub fn verify_signature(payload: &[u8], header_value: &str, secret: &[u8]) -> Result<(), AppError> {
    let hex_digest = header_value
        .trim()
        .strip_prefix("sha256=")
        .unwrap_or_else(|| header_value.trim());

    let supplied = hex::decode(hex_digest)
        .map_err(|_| AppError::AuthError("Invalid webhook signature".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    mac.update(payload);

    mac.verify_slice(&supplied)
        .map_err(|_| AppError::AuthError("Invalid webhook signature".to_string()))
}

/// Constant-time equality for shared-key header values: both sides are
/// HMAC-ed under the expected key and the digests compared with
/// `verify_slice`, so the check neither short-circuits on the first
/// differing byte nor leaks length.
pub fn keys_match(provided: &str, expected: &str) -> bool {
    let Ok(mut reference) = HmacSha256::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    reference.update(expected.as_bytes());
    let reference = reference.finalize().into_bytes();

    let Ok(mut candidate) = HmacSha256::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    candidate.update(provided.as_bytes());
    candidate.verify_slice(reference.as_slice()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"whsec_test_secret";

    fn sign(payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_a_valid_signature() {
        let body = br#"{"event":"payment.captured"}"#;
        assert!(verify_signature(body, &sign(body), SECRET).is_ok());
    }

    #[test]
    fn accepts_the_prefixed_form_and_surrounding_whitespace() {
        let body = br#"{"event":"payment.captured"}"#;
        let prefixed = format!("sha256={}", sign(body));
        assert!(verify_signature(body, &prefixed, SECRET).is_ok());
        let padded = format!("  {}  ", sign(body));
        assert!(verify_signature(body, &padded, SECRET).is_ok());
    }

    #[test]
    fn rejects_a_tampered_payload() {
        let body = br#"{"event":"payment.captured","amount":19900}"#;
        let sig = sign(body);
        let tampered = br#"{"event":"payment.captured","amount":1}"#;
        assert!(verify_signature(tampered, &sig, SECRET).is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let body = b"payload";
        let sig = sign(body);
        assert!(verify_signature(body, &sig, b"some_other_secret").is_err());
    }

    #[test]
    fn rejects_truncated_and_undecodable_signatures() {
        let body = b"payload";
        let sig = sign(body);
        assert!(verify_signature(body, &sig[..16], SECRET).is_err());
        assert!(verify_signature(body, "zz-not-hex-zz", SECRET).is_err());
        assert!(verify_signature(body, "", SECRET).is_err());
    }

    #[test]
    fn keys_match_only_on_exact_equality() {
        assert!(keys_match("internal_key_1", "internal_key_1"));
        assert!(!keys_match("internal_key_2", "internal_key_1"));
        assert!(!keys_match("internal_key_1_longer", "internal_key_1"));
        assert!(!keys_match("internal_key_", "internal_key_1"));
        assert!(!keys_match("", "internal_key_1"));
    }
}
