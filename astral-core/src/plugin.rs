//! Plugin interface implemented by location-proof systems.
//!
//! A plugin turns raw signals from its proof source into stamps, optionally
//! signs them, and verifies its own stamps. Evaluation (distance, overlap,
//! correlation) is never a plugin concern.

use std::time::Duration;

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

use crate::error::{AstralError, AstralResult};
use crate::stamp::{LocationStamp, RawSignals, StampVerificationResult, UnsignedLocationStamp};

/// Where a proof system ultimately places its trust.
///
/// Stamps backed by different known roots corroborate each other more
/// strongly than stamps sharing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrustRoot {
    /// Hardware or OS attestation on the reporting device.
    Device,
    /// Independent network infrastructure (witness nodes, towers).
    Infrastructure,
    /// Satellite signals.
    Satellite,
    /// Peer or network measurements.
    Network,
    #[default]
    Unknown,
}

impl TrustRoot {
    /// Whether two roots are known and distinct.
    pub fn independent_of(&self, other: &TrustRoot) -> bool {
        *self != TrustRoot::Unknown && *other != TrustRoot::Unknown && self != other
    }
}

impl std::fmt::Display for TrustRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Device => write!(f, "device"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Satellite => write!(f, "satellite"),
            Self::Network => write!(f, "network"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Optional operations a plugin offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PluginCapabilities {
    pub collect: bool,
    pub sign: bool,
}

/// Static description of a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Registry key; stamps refer to their plugin by this name.
    pub name: String,
    /// Plugin release version.
    pub version: String,
    /// Plugin interface version the plugin was built against.
    pub interface_version: String,
    pub trust_root: TrustRoot,
    pub capabilities: PluginCapabilities,
}

impl PluginDescriptor {
    /// Descriptor targeting the current interface version.
    pub fn new(name: impl Into<String>, version: impl Into<String>, trust_root: TrustRoot) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            interface_version: crate::INTERFACE_VERSION.to_string(),
            trust_root,
            capabilities: PluginCapabilities::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: PluginCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Check the declared interface version against this core.
    ///
    /// Compatible iff the major components match.
    pub fn check_compatibility(&self) -> AstralResult<()> {
        let declared = major_version(&self.interface_version);
        let supported = major_version(crate::INTERFACE_VERSION);
        match (declared, supported) {
            (Some(d), Some(s)) if d == s => Ok(()),
            _ => Err(AstralError::IncompatiblePlugin {
                plugin: self.name.clone(),
                declared: self.interface_version.clone(),
                supported: crate::INTERFACE_VERSION,
            }),
        }
    }
}

fn major_version(version: &str) -> Option<u64> {
    version.trim().split('.').next()?.parse().ok()
}

/// Options passed to signal collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectOptions {
    /// Upper bound on how long the proof source may be polled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Plugin-specific hints.
    #[serde(default)]
    pub hints: serde_json::Value,
}

/// Capability set of a location-proof plugin.
///
/// `create` and `verify` are required. `collect` and `sign` are optional and
/// advertised through [`PluginCapabilities`]; their defaults return
/// [`AstralError::Unsupported`].
#[async_trait]
pub trait LocationProofPlugin: Send + Sync {
    fn descriptor(&self) -> &PluginDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Gather raw signals from the proof source.
    ///
    /// Fails with [`AstralError::Collection`] when the source is unavailable.
    async fn collect(&self, _options: &CollectOptions) -> AstralResult<RawSignals> {
        Err(AstralError::Unsupported {
            plugin: self.name().to_string(),
            operation: "collect",
        })
    }

    /// Derive an unsigned stamp from raw signals.
    ///
    /// Fails with [`AstralError::MalformedSignal`] on unparseable input.
    async fn create(&self, signals: RawSignals) -> AstralResult<UnsignedLocationStamp>;

    /// Bind a stamp to a signing key.
    async fn sign(
        &self,
        _stamp: UnsignedLocationStamp,
        _signer: &SigningKey,
    ) -> AstralResult<LocationStamp> {
        Err(AstralError::Unsupported {
            plugin: self.name().to_string(),
            operation: "sign",
        })
    }

    /// Check a stamp's internal validity.
    ///
    /// An invalid stamp is reported through the result. Errors are reserved
    /// for conditions that prevent verification from running at all.
    async fn verify(&self, stamp: &LocationStamp) -> AstralResult<StampVerificationResult>;
}
