//! Stamp types: raw signals, unsigned and signed location stamps, and
//! plugin verification results.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::claim::TimeWindow;
use crate::geo::GeoPoint;

/// Opaque plugin-specific payload produced by signal collection.
///
/// Only the plugin named in `plugin` interprets `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSignals {
    pub plugin: String,
    pub payload: serde_json::Value,
}

impl RawSignals {
    pub fn new(plugin: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            plugin: plugin.into(),
            payload,
        }
    }
}

/// Name and version of the plugin that produced a stamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginRef {
    pub name: String,
    pub version: String,
}

/// Location/time assertion derived from raw signals, not yet bound to a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedLocationStamp {
    pub id: Uuid,
    pub plugin: PluginRef,
    pub location: GeoPoint,
    /// Horizontal accuracy reported by the proof source, meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
    /// When the observation was made. May be an instant.
    pub observed: TimeWindow,
    /// Plugin-specific evidence carried along for `verify`.
    #[serde(default)]
    pub evidence: serde_json::Value,
}

impl UnsignedLocationStamp {
    /// Create a stamp with a fresh id and no evidence.
    pub fn new(plugin: PluginRef, location: GeoPoint, observed: TimeWindow) -> Self {
        Self {
            id: Uuid::new_v4(),
            plugin,
            location,
            accuracy_m: None,
            observed,
            evidence: serde_json::Value::Null,
        }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }

    pub fn with_evidence(mut self, evidence: serde_json::Value) -> Self {
        self.evidence = evidence;
        self
    }
}

/// Detached signature over the canonical form of an unsigned stamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampSignature {
    pub algorithm: String,
    /// Base64 verifying key.
    pub public_key: String,
    /// Base64 signature bytes.
    pub value: String,
}

/// A stamp, optionally signed. Immutable once signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationStamp {
    #[serde(flatten)]
    pub stamp: UnsignedLocationStamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<StampSignature>,
}

impl LocationStamp {
    /// Wrap a stamp from a plugin that does not sign.
    pub fn unsigned(stamp: UnsignedLocationStamp) -> Self {
        Self {
            stamp,
            signature: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.stamp.id
    }

    pub fn plugin_name(&self) -> &str {
        &self.stamp.plugin.name
    }

    pub fn location(&self) -> &GeoPoint {
        &self.stamp.location
    }

    pub fn observed(&self) -> &TimeWindow {
        &self.stamp.observed
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// One invariant a plugin checked, and whether it held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationCheck {
    pub name: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl VerificationCheck {
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: None,
        }
    }

    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: Some(detail.into()),
        }
    }
}

/// Outcome of a plugin's internal verification of a stamp.
///
/// An invalid stamp is a normal result, not an error. `valid` is always derived
/// from the checks, including when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VerificationRecord")]
pub struct StampVerificationResult {
    valid: bool,
    checks: Vec<VerificationCheck>,
}

/// Wire form; any `valid` flag on input is ignored.
#[derive(Deserialize)]
struct VerificationRecord {
    #[serde(default)]
    checks: Vec<VerificationCheck>,
}

impl From<VerificationRecord> for StampVerificationResult {
    fn from(record: VerificationRecord) -> Self {
        Self::from_checks(record.checks)
    }
}

impl StampVerificationResult {
    /// Build from checks; valid iff there is at least one check and all passed.
    pub fn from_checks(checks: Vec<VerificationCheck>) -> Self {
        let valid = !checks.is_empty() && checks.iter().all(|c| c.passed);
        Self { valid, checks }
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn checks(&self) -> &[VerificationCheck] {
        &self.checks
    }

    /// Names of the checks that did not hold.
    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_stamp() -> UnsignedLocationStamp {
        UnsignedLocationStamp::new(
            PluginRef {
                name: "proofmode".to_string(),
                version: "0.3.1".to_string(),
            },
            GeoPoint::new(40.7484, -73.9857),
            TimeWindow::instant(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 10).unwrap()),
        )
    }

    #[test]
    fn signed_stamp_flattens_unsigned_fields() {
        let stamp = LocationStamp::unsigned(sample_stamp().with_accuracy(5.0));
        let value = serde_json::to_value(&stamp).unwrap();

        assert_eq!(value["plugin"]["name"], "proofmode");
        assert_eq!(value["accuracy_m"], 5.0);
        assert!(value.get("signature").is_none());
        assert!(value.get("stamp").is_none());

        let parsed: LocationStamp = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, stamp);
        assert!(!parsed.is_signed());
        assert_eq!(parsed.plugin_name(), "proofmode");
    }

    #[test]
    fn missing_evidence_deserializes_as_null() {
        let mut value = serde_json::to_value(LocationStamp::unsigned(sample_stamp())).unwrap();
        value.as_object_mut().unwrap().remove("evidence");

        let parsed: LocationStamp = serde_json::from_value(value).unwrap();
        assert!(parsed.stamp.evidence.is_null());
    }

    #[test]
    fn verification_result_from_checks() {
        let ok = StampVerificationResult::from_checks(vec![
            VerificationCheck::pass("signature_present"),
            VerificationCheck::pass("signature_valid"),
        ]);
        assert!(ok.valid());
        assert!(ok.failed_checks().is_empty());

        let bad = StampVerificationResult::from_checks(vec![
            VerificationCheck::pass("signature_present"),
            VerificationCheck::fail("signature_valid", "digest mismatch"),
        ]);
        assert!(!bad.valid());
        assert_eq!(bad.failed_checks(), vec!["signature_valid"]);
    }

    #[test]
    fn empty_checks_are_not_valid() {
        assert!(!StampVerificationResult::from_checks(vec![]).valid());
    }

    #[test]
    fn deserialized_result_recomputes_validity() {
        let empty: StampVerificationResult =
            serde_json::from_value(serde_json::json!({"valid": true, "checks": []})).unwrap();
        assert!(!empty.valid());

        let contradictory: StampVerificationResult = serde_json::from_value(serde_json::json!({
            "valid": true,
            "checks": [{"name": "signature_valid", "passed": false}]
        }))
        .unwrap();
        assert!(!contradictory.valid());
        assert_eq!(contradictory.failed_checks(), vec!["signature_valid"]);

        let ok = StampVerificationResult::from_checks(vec![VerificationCheck::pass("integrity")]);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["valid"], true);
        let parsed: StampVerificationResult = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, ok);
    }
}
