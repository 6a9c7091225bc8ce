//! # astral-core
//!
//! Core library for Astral location-proof evaluation.
//!
//! This crate provides the claim and stamp data model, great-circle
//! geodesy, the plugin interface implemented by proof systems, signing
//! helpers, credibility scoring and the evaluation stage automaton used by
//! the SDK pipeline.

pub mod claim;
pub mod credibility;
pub mod error;
pub mod geo;
pub mod plugin;
pub mod security;
pub mod stage;
pub mod stamp;

pub use claim::{Claim, TimeWindow};
pub use credibility::{
    aggregate, correlation_score, spatial_score, temporal_score, CorrelationConfig,
    CorrelationInput, CorrelationScore, CredibilityVector, StampAssessment,
};
pub use error::{AstralError, AstralResult, ErrorClass};
pub use geo::{haversine_m, GeoPoint};
pub use plugin::{
    CollectOptions, LocationProofPlugin, PluginCapabilities, PluginDescriptor, TrustRoot,
};
pub use security::{sign_stamp, stamp_digest, verify_stamp_signature};
pub use stage::EvaluationStage;
pub use stamp::{
    LocationStamp, PluginRef, RawSignals, StampSignature, StampVerificationResult,
    UnsignedLocationStamp, VerificationCheck,
};

/// Version of the plugin interface implemented by this crate.
///
/// Plugins declaring a different major version are rejected at registration.
pub const INTERFACE_VERSION: &str = "1.0";
