//! Error types and error classes for Astral.

use thiserror::Error;

/// Coarse classification of errors, reported to callers alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The claim itself is malformed.
    InvalidClaim,
    /// Registry state does not match the submitted stamps or plugins.
    Configuration,
    /// A plugin broke while doing its job.
    PluginFailure,
    /// Raw signals could not be collected.
    Collection,
    /// Raw signals could not be turned into a stamp.
    MalformedSignal,
    /// A stamp could not be signed.
    Signing,
    /// The evaluation did not finish within the configured timeout.
    Timeout,
    /// Input rejected before processing (limits, encoding, keys).
    Validation,
}

impl ErrorClass {
    /// Whether the core retries this class on its own. It never does:
    /// sensor-derived proofs cannot be replayed without fresh signals.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidClaim => write!(f, "invalid_claim"),
            Self::Configuration => write!(f, "configuration"),
            Self::PluginFailure => write!(f, "plugin_failure"),
            Self::Collection => write!(f, "collection"),
            Self::MalformedSignal => write!(f, "malformed_signal"),
            Self::Signing => write!(f, "signing"),
            Self::Timeout => write!(f, "timeout"),
            Self::Validation => write!(f, "validation"),
        }
    }
}

/// Astral errors.
#[derive(Debug, Error)]
pub enum AstralError {
    /// Claim geometry or time window is invalid.
    #[error("invalid claim: {field}: {reason}")]
    InvalidClaim { field: &'static str, reason: String },

    /// A stamp names a plugin that is not registered.
    #[error("stamp {stamp_index} references unregistered plugin '{plugin}'")]
    Configuration { stamp_index: usize, plugin: String },

    /// Registry lookup failed.
    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    /// A plugin with this name is already registered.
    #[error("plugin already registered: {0}")]
    DuplicateRegistration(String),

    /// Plugin targets an interface version this core cannot host.
    #[error("plugin '{plugin}' targets interface {declared}, core provides {supported}")]
    IncompatiblePlugin {
        plugin: String,
        declared: String,
        supported: &'static str,
    },

    /// A plugin failed while verifying a stamp.
    #[error("plugin '{plugin}' failed on stamp {stamp_index}: {source}")]
    PluginFailure {
        stamp_index: usize,
        plugin: String,
        #[source]
        source: Box<AstralError>,
    },

    /// Proof source unavailable during signal collection.
    #[error("collection failed in '{plugin}': {reason}")]
    Collection { plugin: String, reason: String },

    /// Raw signals could not be parsed into a stamp.
    #[error("malformed signals for '{plugin}': {reason}")]
    MalformedSignal { plugin: String, reason: String },

    /// Signing a stamp failed.
    #[error("signing failed in '{plugin}': {reason}")]
    Signing { plugin: String, reason: String },

    /// Optional capability not offered by the plugin.
    #[error("plugin '{plugin}' does not support {operation}")]
    Unsupported {
        plugin: String,
        operation: &'static str,
    },

    /// Evaluation exceeded its deadline.
    #[error("evaluation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Input validation error (limits, configuration values).
    #[error("validation error: {0}")]
    Validation(String),

    /// Cryptographic error (key or signature encoding).
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Signature does not match the stamp contents.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AstralError {
    /// Classify this error for callers.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidClaim { .. } => ErrorClass::InvalidClaim,
            Self::Configuration { .. }
            | Self::PluginNotFound(_)
            | Self::DuplicateRegistration(_)
            | Self::IncompatiblePlugin { .. } => ErrorClass::Configuration,
            Self::PluginFailure { .. } | Self::Unsupported { .. } => ErrorClass::PluginFailure,
            Self::Collection { .. } => ErrorClass::Collection,
            Self::MalformedSignal { .. } => ErrorClass::MalformedSignal,
            Self::Signing { .. } => ErrorClass::Signing,
            Self::Timeout { .. } => ErrorClass::Timeout,
            Self::Validation(_)
            | Self::Crypto(_)
            | Self::SignatureInvalid
            | Self::Serialization(_) => ErrorClass::Validation,
        }
    }
}

/// Result type alias for Astral operations.
pub type AstralResult<T> = Result<T, AstralError>;
