//! Signing primitives shared by plugins.
//!
//! Implements:
//! - JCS-style canonicalization (RFC 8785 key ordering, no whitespace)
//! - Stamp digests (SHA-256 over the canonical unsigned stamp)
//! - Ed25519 stamp signatures
//!
//! The evaluation pipeline never calls these; verification authority stays
//! with the plugin that owns a stamp.

use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::{AstralError, AstralResult};
use crate::stamp::{LocationStamp, StampSignature, UnsignedLocationStamp};

/// Signature algorithm identifier written into [`StampSignature`].
pub const ED25519: &str = "ed25519";

/// Canonical JSON serialization.
///
/// 1. Object keys sorted lexicographically
/// 2. No whitespace
/// 3. Strings escaped as serde_json escapes them
pub fn canonicalize_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Array(arr) => {
            let elements: Vec<String> = arr.iter().map(canonicalize_json).collect();
            format!("[{}]", elements.join(","))
        }
        serde_json::Value::Object(obj) => {
            let mut keys: Vec<&String> = obj.keys().collect();
            keys.sort();
            let pairs: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::Value::String(k.clone()),
                        canonicalize_json(&obj[k])
                    )
                })
                .collect();
            format!("{{{}}}", pairs.join(","))
        }
        // Scalars already print in their shortest form
        scalar => scalar.to_string(),
    }
}

/// Hex SHA-256 of the canonical form of an unsigned stamp.
pub fn stamp_digest(stamp: &UnsignedLocationStamp) -> AstralResult<String> {
    let value = serde_json::to_value(stamp)?;
    let canonical = canonicalize_json(&value);
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

/// Sign an unsigned stamp with Ed25519.
///
/// The signature covers the stamp digest, so any field change invalidates it.
pub fn sign_stamp(stamp: UnsignedLocationStamp, signing_key: &SigningKey) -> AstralResult<LocationStamp> {
    let digest = stamp_digest(&stamp)?;
    let signature: Signature = signing_key.sign(digest.as_bytes());

    Ok(LocationStamp {
        stamp,
        signature: Some(StampSignature {
            algorithm: ED25519.to_string(),
            public_key: encode_public_key(&signing_key.verifying_key()),
            value: base64::engine::general_purpose::STANDARD.encode(signature.to_bytes()),
        }),
    })
}

/// Verify the embedded signature of a stamp and return the signer's key.
pub fn verify_stamp_signature(stamp: &LocationStamp) -> AstralResult<VerifyingKey> {
    let signature = stamp
        .signature
        .as_ref()
        .ok_or_else(|| AstralError::Crypto("no signature present".to_string()))?;

    if signature.algorithm != ED25519 {
        return Err(AstralError::Crypto(format!(
            "unsupported signature algorithm: {}",
            signature.algorithm
        )));
    }

    let verifying_key = decode_public_key(&signature.public_key)?;

    let signature_bytes = base64::engine::general_purpose::STANDARD
        .decode(&signature.value)
        .map_err(|e| AstralError::Crypto(format!("invalid base64 signature: {}", e)))?;
    let sig = Signature::from_slice(&signature_bytes)
        .map_err(|e| AstralError::Crypto(format!("invalid signature format: {}", e)))?;

    let digest = stamp_digest(&stamp.stamp)?;
    verifying_key
        .verify(digest.as_bytes(), &sig)
        .map_err(|_| AstralError::SignatureInvalid)?;

    Ok(verifying_key)
}

/// Base64 encoding of a verifying key.
pub fn encode_public_key(key: &VerifyingKey) -> String {
    base64::engine::general_purpose::STANDARD.encode(key.as_bytes())
}

/// Parse a base64 verifying key.
pub fn decode_public_key(encoded: &str) -> AstralResult<VerifyingKey> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| AstralError::Crypto(format!("invalid base64 public key: {}", e)))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| AstralError::Crypto(format!("public key must be 32 bytes, got {}", bytes.len())))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| AstralError::Crypto(format!("invalid public key: {}", e)))
}

/// Parse a hex-encoded 32-byte Ed25519 seed.
pub fn signing_key_from_hex(seed: &str) -> AstralResult<SigningKey> {
    let bytes = hex::decode(seed.trim())
        .map_err(|e| AstralError::Crypto(format!("invalid hex seed: {}", e)))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| AstralError::Crypto(format!("seed must be 32 bytes, got {}", bytes.len())))?;
    Ok(SigningKey::from_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::TimeWindow;
    use crate::geo::GeoPoint;
    use crate::stamp::PluginRef;
    use chrono::{TimeZone, Utc};
    use rand::rngs::OsRng;

    fn sample_stamp() -> UnsignedLocationStamp {
        UnsignedLocationStamp::new(
            PluginRef {
                name: "witnesschain".to_string(),
                version: "1.2.0".to_string(),
            },
            GeoPoint::new(40.7484, -73.9857),
            TimeWindow::instant(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 10).unwrap()),
        )
        .with_evidence(serde_json::json!({"challengers": 3, "rtt_ms": [12, 15, 11]}))
    }

    #[test]
    fn canonicalization_sorts_keys() {
        let json = serde_json::json!({
            "z": 1,
            "a": "hello",
            "m": [3, 1, 2],
            "n": {"y": null, "b": true}
        });

        let canonical = canonicalize_json(&json);
        assert_eq!(
            canonical,
            "{\"a\":\"hello\",\"m\":[3,1,2],\"n\":{\"b\":true,\"y\":null},\"z\":1}"
        );
    }

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let stamp = sample_stamp();
        let d1 = stamp_digest(&stamp).unwrap();
        let d2 = stamp_digest(&stamp.clone()).unwrap();
        assert_eq!(d1, d2);
        assert_eq!(d1.len(), 64);

        let mut moved = stamp;
        moved.location.lat += 0.001;
        assert_ne!(stamp_digest(&moved).unwrap(), d1);
    }

    #[test]
    fn sign_and_verify() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let signed = sign_stamp(sample_stamp(), &signing_key).unwrap();

        let signer = verify_stamp_signature(&signed).unwrap();
        assert_eq!(signer, signing_key.verifying_key());
    }

    #[test]
    fn tampered_stamp_fails_verification() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let mut signed = sign_stamp(sample_stamp(), &signing_key).unwrap();
        signed.stamp.location.lon += 0.01;

        assert!(matches!(
            verify_stamp_signature(&signed),
            Err(AstralError::SignatureInvalid)
        ));
    }

    #[test]
    fn signature_survives_json_round_trip() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let signed = sign_stamp(sample_stamp(), &signing_key).unwrap();

        let json = serde_json::to_string(&signed).unwrap();
        let parsed: LocationStamp = serde_json::from_str(&json).unwrap();
        assert!(verify_stamp_signature(&parsed).is_ok());
    }

    #[test]
    fn unsigned_stamp_is_a_crypto_error() {
        let stamp = LocationStamp::unsigned(sample_stamp());
        assert!(matches!(
            verify_stamp_signature(&stamp),
            Err(AstralError::Crypto(_))
        ));
    }

    #[test]
    fn key_encodings() {
        let signing_key = signing_key_from_hex(&"07".repeat(32)).unwrap();
        let encoded = encode_public_key(&signing_key.verifying_key());
        assert_eq!(decode_public_key(&encoded).unwrap(), signing_key.verifying_key());

        assert!(signing_key_from_hex("abcd").is_err());
        assert!(decode_public_key("not base64!").is_err());
    }
}
