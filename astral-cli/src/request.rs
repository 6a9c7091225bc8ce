//! Evaluation request files.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use astral_core::{AstralResult, Claim, CredibilityVector, LocationStamp};
use astral_sdk::{Evaluator, EvaluatorConfig, PluginRegistry, SignedFixConfig, SignedFixPlugin};

/// Everything needed for one evaluation, as read from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    #[serde(default)]
    pub config: EvaluatorConfig,
    /// Signed-fix plugins to register before evaluating.
    #[serde(default)]
    pub plugins: Vec<SignedFixConfig>,
    pub claim: Claim,
    #[serde(default)]
    pub stamps: Vec<LocationStamp>,
}

impl EvaluationRequest {
    pub fn from_json(json: &str) -> AstralResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Register the declared plugins and evaluate.
    pub async fn evaluate(&self) -> AstralResult<CredibilityVector> {
        let registry = Arc::new(PluginRegistry::new());
        for plugin in &self.plugins {
            registry.register(Arc::new(SignedFixPlugin::from_config(plugin)?))?;
        }
        tracing::info!("Registered plugins: {:?}", registry.names());

        let evaluator = Evaluator::new(registry, self.config.clone())?;
        evaluator.evaluate(&self.claim, &self.stamps).await
    }
}
