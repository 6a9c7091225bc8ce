//! Manually reported, Ed25519-signed location fixes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use astral_core::security::{decode_public_key, encode_public_key};
use astral_core::{
    sign_stamp, verify_stamp_signature, AstralError, AstralResult, GeoPoint, LocationProofPlugin,
    LocationStamp, PluginCapabilities, PluginDescriptor, PluginRef, RawSignals,
    StampVerificationResult, TimeWindow, TrustRoot, UnsignedLocationStamp, VerificationCheck,
};

/// Declarative form of a [`SignedFixPlugin`], as read from request files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedFixConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub trust_root: TrustRoot,
    /// Base64 verifying keys. Empty accepts any valid signer.
    #[serde(default)]
    pub trusted_keys: Vec<String>,
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Signal payload understood by the plugin.
#[derive(Debug, Deserialize)]
struct FixSignals {
    lat: f64,
    lon: f64,
    #[serde(default)]
    accuracy_m: Option<f64>,
    #[serde(default)]
    observed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    start: Option<DateTime<Utc>>,
    #[serde(default)]
    end: Option<DateTime<Utc>>,
    #[serde(default)]
    source: Option<String>,
}

/// Plugin for fixes that carry no proof beyond a signature.
///
/// Verification checks the signature, the signer (when a trusted key list is
/// configured) and the structural sanity of the stamp.
pub struct SignedFixPlugin {
    descriptor: PluginDescriptor,
    trusted: Vec<VerifyingKey>,
}

impl SignedFixPlugin {
    pub fn new(name: impl Into<String>, trust_root: TrustRoot) -> Self {
        Self {
            descriptor: PluginDescriptor::new(name, default_version(), trust_root).with_capabilities(
                PluginCapabilities {
                    collect: false,
                    sign: true,
                },
            ),
            trusted: Vec::new(),
        }
    }

    pub fn from_config(config: &SignedFixConfig) -> AstralResult<Self> {
        let mut plugin = Self::new(config.name.clone(), config.trust_root);
        plugin.descriptor.version = config.version.clone();
        for key in &config.trusted_keys {
            plugin.trusted.push(decode_public_key(key)?);
        }
        Ok(plugin)
    }

    pub fn with_trusted_key(mut self, key: VerifyingKey) -> Self {
        self.trusted.push(key);
        self
    }

    fn malformed(&self, reason: impl Into<String>) -> AstralError {
        AstralError::MalformedSignal {
            plugin: self.descriptor.name.clone(),
            reason: reason.into(),
        }
    }

    fn signature_checks(&self, stamp: &LocationStamp) -> Vec<VerificationCheck> {
        if stamp.signature.is_none() {
            return vec![VerificationCheck::fail("signature_present", "stamp is unsigned")];
        }

        let mut checks = vec![VerificationCheck::pass("signature_present")];
        match verify_stamp_signature(stamp) {
            Ok(signer) => {
                checks.push(VerificationCheck::pass("signature_valid"));
                if !self.trusted.is_empty() {
                    checks.push(if self.trusted.contains(&signer) {
                        VerificationCheck::pass("signer_trusted")
                    } else {
                        VerificationCheck::fail(
                            "signer_trusted",
                            format!("signer {} is not trusted", encode_public_key(&signer)),
                        )
                    });
                }
            }
            Err(e) => checks.push(VerificationCheck::fail("signature_valid", e.to_string())),
        }
        checks
    }
}

#[async_trait]
impl LocationProofPlugin for SignedFixPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    async fn create(&self, signals: RawSignals) -> AstralResult<UnsignedLocationStamp> {
        if signals.plugin != self.descriptor.name {
            return Err(self.malformed(format!("signals belong to '{}'", signals.plugin)));
        }

        let fix: FixSignals =
            serde_json::from_value(signals.payload).map_err(|e| self.malformed(e.to_string()))?;

        let location = GeoPoint::new(fix.lat, fix.lon);
        location
            .validate("location")
            .map_err(|e| self.malformed(e.to_string()))?;

        let observed = match (fix.observed_at, fix.start, fix.end) {
            (Some(at), None, None) => TimeWindow::instant(at),
            (None, Some(start), Some(end)) if start <= end => TimeWindow::new(start, end),
            (None, Some(_), Some(_)) => return Err(self.malformed("end precedes start")),
            _ => {
                return Err(self.malformed(
                    "expected either observed_at or both start and end",
                ))
            }
        };

        let mut stamp = UnsignedLocationStamp::new(
            PluginRef {
                name: self.descriptor.name.clone(),
                version: self.descriptor.version.clone(),
            },
            location,
            observed,
        );
        if let Some(accuracy) = fix.accuracy_m {
            if !accuracy.is_finite() || accuracy < 0.0 {
                return Err(self.malformed(format!("invalid accuracy {}", accuracy)));
            }
            stamp = stamp.with_accuracy(accuracy);
        }
        if let Some(source) = fix.source {
            stamp = stamp.with_evidence(serde_json::json!({ "source": source }));
        }
        Ok(stamp)
    }

    async fn sign(
        &self,
        stamp: UnsignedLocationStamp,
        signer: &SigningKey,
    ) -> AstralResult<LocationStamp> {
        if stamp.plugin.name != self.descriptor.name {
            return Err(AstralError::Signing {
                plugin: self.descriptor.name.clone(),
                reason: format!("stamp was created by '{}'", stamp.plugin.name),
            });
        }
        sign_stamp(stamp, signer).map_err(|e| AstralError::Signing {
            plugin: self.descriptor.name.clone(),
            reason: e.to_string(),
        })
    }

    async fn verify(&self, stamp: &LocationStamp) -> AstralResult<StampVerificationResult> {
        let mut checks = Vec::new();

        checks.push(if stamp.plugin_name() == self.descriptor.name {
            VerificationCheck::pass("plugin_match")
        } else {
            VerificationCheck::fail(
                "plugin_match",
                format!("stamp names plugin '{}'", stamp.plugin_name()),
            )
        });

        checks.extend(self.signature_checks(stamp));

        checks.push(match stamp.location().validate("location") {
            Ok(()) => VerificationCheck::pass("coordinates_valid"),
            Err(e) => VerificationCheck::fail("coordinates_valid", e.to_string()),
        });

        checks.push(if stamp.observed().is_ordered() {
            VerificationCheck::pass("footprint_ordered")
        } else {
            VerificationCheck::fail("footprint_ordered", "observation ends before it starts")
        });

        if let Some(accuracy) = stamp.stamp.accuracy_m {
            checks.push(if accuracy.is_finite() && accuracy >= 0.0 {
                VerificationCheck::pass("accuracy_valid")
            } else {
                VerificationCheck::fail("accuracy_valid", format!("accuracy {}", accuracy))
            });
        }

        Ok(StampVerificationResult::from_checks(checks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn signals(payload: serde_json::Value) -> RawSignals {
        RawSignals::new("manual", payload)
    }

    fn fix() -> serde_json::Value {
        serde_json::json!({
            "lat": 40.7484,
            "lon": -73.9857,
            "accuracy_m": 8.5,
            "observed_at": "2025-03-01T12:00:10Z",
            "source": "field-notes"
        })
    }

    #[tokio::test]
    async fn create_sign_verify() {
        let plugin = SignedFixPlugin::new("manual", TrustRoot::Device);
        let key = SigningKey::generate(&mut OsRng);

        let unsigned = plugin.create(signals(fix())).await.unwrap();
        assert_eq!(unsigned.plugin.name, "manual");
        assert_eq!(unsigned.accuracy_m, Some(8.5));
        assert!(unsigned.observed.is_instant());
        assert_eq!(unsigned.evidence["source"], "field-notes");

        let signed = plugin.sign(unsigned, &key).await.unwrap();
        let result = plugin.verify(&signed).await.unwrap();
        assert!(result.valid(), "failed: {:?}", result.failed_checks());
    }

    #[tokio::test]
    async fn interval_signals() {
        let plugin = SignedFixPlugin::new("manual", TrustRoot::Device);
        let stamp = plugin
            .create(signals(serde_json::json!({
                "lat": 0.0,
                "lon": 0.0,
                "start": "2025-03-01T12:00:00Z",
                "end": "2025-03-01T12:05:00Z"
            })))
            .await
            .unwrap();
        assert_eq!(stamp.observed.duration_ms(), 300_000);
    }

    #[tokio::test]
    async fn malformed_signals_are_rejected() {
        let plugin = SignedFixPlugin::new("manual", TrustRoot::Device);

        let cases = [
            serde_json::json!({"lat": 40.0}),
            serde_json::json!({"lat": 95.0, "lon": 0.0, "observed_at": "2025-03-01T12:00:00Z"}),
            serde_json::json!({"lat": 0.0, "lon": 0.0}),
            serde_json::json!({
                "lat": 0.0, "lon": 0.0,
                "start": "2025-03-01T12:05:00Z", "end": "2025-03-01T12:00:00Z"
            }),
            serde_json::json!({
                "lat": 0.0, "lon": 0.0, "accuracy_m": -1.0,
                "observed_at": "2025-03-01T12:00:00Z"
            }),
        ];
        for payload in cases {
            let err = plugin.create(signals(payload.clone())).await.unwrap_err();
            assert!(
                matches!(err, AstralError::MalformedSignal { .. }),
                "payload {} gave {:?}",
                payload,
                err
            );
        }

        let foreign = RawSignals::new("proofmode", fix());
        assert!(plugin.create(foreign).await.is_err());
    }

    #[tokio::test]
    async fn unsigned_stamp_is_invalid_not_an_error() {
        let plugin = SignedFixPlugin::new("manual", TrustRoot::Device);
        let unsigned = plugin.create(signals(fix())).await.unwrap();

        let result = plugin.verify(&LocationStamp::unsigned(unsigned)).await.unwrap();
        assert!(!result.valid());
        assert_eq!(result.failed_checks(), vec!["signature_present"]);
    }

    #[tokio::test]
    async fn tampering_is_reported() {
        let plugin = SignedFixPlugin::new("manual", TrustRoot::Device);
        let key = SigningKey::generate(&mut OsRng);
        let unsigned = plugin.create(signals(fix())).await.unwrap();
        let mut signed = plugin.sign(unsigned, &key).await.unwrap();
        signed.stamp.location.lat += 0.5;

        let result = plugin.verify(&signed).await.unwrap();
        assert!(!result.valid());
        assert_eq!(result.failed_checks(), vec!["signature_valid"]);
    }

    #[tokio::test]
    async fn untrusted_signer_is_reported() {
        let trusted = SigningKey::generate(&mut OsRng);
        let rogue = SigningKey::generate(&mut OsRng);
        let plugin =
            SignedFixPlugin::new("manual", TrustRoot::Device).with_trusted_key(trusted.verifying_key());

        let unsigned = plugin.create(signals(fix())).await.unwrap();
        let good = plugin.sign(unsigned.clone(), &trusted).await.unwrap();
        let bad = plugin.sign(unsigned, &rogue).await.unwrap();

        assert!(plugin.verify(&good).await.unwrap().valid());
        let result = plugin.verify(&bad).await.unwrap();
        assert_eq!(result.failed_checks(), vec!["signer_trusted"]);
    }

    #[tokio::test]
    async fn signing_a_foreign_stamp_fails() {
        let manual = SignedFixPlugin::new("manual", TrustRoot::Device);
        let other = SignedFixPlugin::new("other", TrustRoot::Network);
        let key = SigningKey::generate(&mut OsRng);

        let unsigned = manual.create(signals(fix())).await.unwrap();
        assert!(matches!(
            other.sign(unsigned, &key).await,
            Err(AstralError::Signing { .. })
        ));
    }

    #[test]
    fn from_config_decodes_keys() {
        let key = SigningKey::from_bytes(&[3u8; 32]);
        let config: SignedFixConfig = serde_json::from_value(serde_json::json!({
            "name": "manual",
            "trust_root": "infrastructure",
            "trusted_keys": [encode_public_key(&key.verifying_key())]
        }))
        .unwrap();

        let plugin = SignedFixPlugin::from_config(&config).unwrap();
        assert_eq!(plugin.descriptor().trust_root, TrustRoot::Infrastructure);
        assert_eq!(plugin.descriptor().version, env!("CARGO_PKG_VERSION"));
        assert!(plugin.descriptor().capabilities.sign);
        assert_eq!(plugin.trusted.len(), 1);

        let bad = SignedFixConfig {
            trusted_keys: vec!["%%%".to_string()],
            ..config
        };
        assert!(SignedFixPlugin::from_config(&bad).is_err());
    }
}
