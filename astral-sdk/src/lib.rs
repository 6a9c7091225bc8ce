//! Astral SDK - plugin registry and evaluation pipeline for location proofs.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use astral_core::{Claim, GeoPoint, RawSignals, TimeWindow, TrustRoot};
//! use astral_sdk::{Evaluator, PluginRegistry, SignedFixPlugin};
//! use ed25519_dalek::SigningKey;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(PluginRegistry::new());
//!     registry.register(Arc::new(SignedFixPlugin::new("manual", TrustRoot::Device)))?;
//!     let evaluator = Evaluator::with_defaults(registry);
//!
//!     let signals = RawSignals::new(
//!         "manual",
//!         serde_json::json!({"lat": 40.7484, "lon": -73.9857, "observed_at": "2025-03-01T12:00:10Z"}),
//!     );
//!     let unsigned = evaluator.create(signals).await?;
//!     let stamp = evaluator.sign(unsigned, &SigningKey::from_bytes(&[7u8; 32])).await?;
//!
//!     let start = "2025-03-01T12:00:00Z".parse()?;
//!     let claim = Claim::new(
//!         GeoPoint::new(40.7484, -73.9857),
//!         100.0,
//!         TimeWindow::starting_at(start, chrono::Duration::seconds(3600)),
//!     );
//!     let vector = evaluator.evaluate(&claim, &[stamp]).await?;
//!     println!("spatial={} temporal={}", vector.spatial, vector.temporal);
//!
//!     Ok(())
//! }
//! ```

mod config;
mod pipeline;
pub mod plugins;
mod registry;

pub use config::{EvaluatorConfig, FailurePolicy};
pub use pipeline::Evaluator;
pub use plugins::{SignedFixConfig, SignedFixPlugin};
pub use registry::PluginRegistry;
