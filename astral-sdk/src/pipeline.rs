//! Evaluation pipeline: claim + stamps → credibility vector.

use std::sync::Arc;
use std::time::Instant;

use ed25519_dalek::SigningKey;
use futures::future::{join_all, try_join_all};
use tracing::Instrument;

use astral_core::{
    aggregate, correlation_score, haversine_m, spatial_score, temporal_score, AstralError,
    AstralResult, Claim, CollectOptions, CorrelationInput, CredibilityVector, EvaluationStage,
    LocationProofPlugin, LocationStamp, RawSignals, StampAssessment, StampVerificationResult,
    UnsignedLocationStamp,
};

use crate::config::{saturating_millis, EvaluatorConfig, FailurePolicy};
use crate::registry::PluginRegistry;

/// A stamp paired with the plugin that owns it.
type Resolved<'a> = (&'a LocationStamp, Arc<dyn LocationProofPlugin>);

/// Evaluates claims against location stamps using registered plugins.
///
/// Holds no state between calls apart from the shared registry.
pub struct Evaluator {
    registry: Arc<PluginRegistry>,
    config: EvaluatorConfig,
}

impl Evaluator {
    /// Create an evaluator over a shared registry.
    pub fn new(registry: Arc<PluginRegistry>, config: EvaluatorConfig) -> AstralResult<Self> {
        config.validate()?;
        Ok(Self { registry, config })
    }

    /// Create an evaluator with default configuration.
    pub fn with_defaults(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            config: EvaluatorConfig::default(),
        }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Collect raw signals through a registered plugin.
    pub async fn collect(&self, plugin: &str, options: &CollectOptions) -> AstralResult<RawSignals> {
        let plugin = self.registry.get(plugin)?;
        if !plugin.descriptor().capabilities.collect {
            return Err(AstralError::Unsupported {
                plugin: plugin.name().to_string(),
                operation: "collect",
            });
        }
        plugin.collect(options).await
    }

    /// Create an unsigned stamp from raw signals through their plugin.
    pub async fn create(&self, signals: RawSignals) -> AstralResult<UnsignedLocationStamp> {
        let plugin = self.registry.get(&signals.plugin)?;
        plugin.create(signals).await
    }

    /// Sign a stamp through the plugin that created it.
    pub async fn sign(
        &self,
        stamp: UnsignedLocationStamp,
        signer: &SigningKey,
    ) -> AstralResult<LocationStamp> {
        let plugin = self.registry.get(&stamp.plugin.name)?;
        if !plugin.descriptor().capabilities.sign {
            return Err(AstralError::Unsupported {
                plugin: plugin.name().to_string(),
                operation: "sign",
            });
        }
        plugin.sign(stamp, signer).await
    }

    /// Evaluate a claim against stamps.
    ///
    /// The vector's per-stamp entries follow input order. Plugin errors abort
    /// the call; a stamp its plugin reports invalid does not.
    pub async fn evaluate(
        &self,
        claim: &Claim,
        stamps: &[LocationStamp],
    ) -> AstralResult<CredibilityVector> {
        let span = tracing::info_span!(
            "evaluate",
            evaluation_id = %uuid::Uuid::new_v4(),
            stamps = stamps.len()
        );

        async move {
            let started = Instant::now();
            let mut tracker = StageTracker::new();

            let result = self.run(claim, stamps, &mut tracker).await;
            match &result {
                Ok(vector) => {
                    tracing::info!(
                        spatial = vector.spatial,
                        temporal = vector.temporal,
                        correlation = vector.correlation.score,
                        validity = vector.validity,
                        elapsed_ms = saturating_millis(started.elapsed()),
                        "evaluation complete"
                    );
                }
                Err(e) => {
                    let stage = tracker.stage();
                    tracker.fail();
                    tracing::warn!(
                        stage = %stage,
                        class = %e.class(),
                        error = %e,
                        "evaluation failed"
                    );
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        claim: &Claim,
        stamps: &[LocationStamp],
        tracker: &mut StageTracker,
    ) -> AstralResult<CredibilityVector> {
        tracker.advance(EvaluationStage::ValidatingClaim)?;
        claim.validate()?;
        if stamps.len() > self.config.max_stamps {
            return Err(AstralError::Validation(format!(
                "{} stamps submitted, limit is {}",
                stamps.len(),
                self.config.max_stamps
            )));
        }

        tracker.advance(EvaluationStage::ResolvingPlugins)?;
        let resolved = self.resolve(stamps)?;

        tracker.advance(EvaluationStage::Verifying)?;
        let verifications = match self.config.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.verify_all(&resolved))
                .await
                .map_err(|_| AstralError::Timeout {
                    timeout_ms: saturating_millis(timeout),
                })??,
            None => self.verify_all(&resolved).await?,
        };

        tracker.advance(EvaluationStage::Scoring)?;
        let vector = self.score(claim, &resolved, verifications);

        tracker.advance(EvaluationStage::Done)?;
        Ok(vector)
    }

    /// Map every stamp to its registered plugin, failing on the first gap.
    fn resolve<'a>(&self, stamps: &'a [LocationStamp]) -> AstralResult<Vec<Resolved<'a>>> {
        stamps
            .iter()
            .enumerate()
            .map(|(index, stamp)| -> AstralResult<Resolved<'a>> {
                let plugin = self
                    .registry
                    .get(stamp.plugin_name())
                    .map_err(|_| AstralError::Configuration {
                        stamp_index: index,
                        plugin: stamp.plugin_name().to_string(),
                    })?;

                let registered = &plugin.descriptor().version;
                if *registered != stamp.stamp.plugin.version {
                    tracing::warn!(
                        stamp_index = index,
                        plugin = %stamp.plugin_name(),
                        stamp_version = %stamp.stamp.plugin.version,
                        registered_version = %registered,
                        "stamp produced by a different plugin version"
                    );
                }
                Ok((stamp, plugin))
            })
            .collect()
    }

    /// Verify every stamp concurrently, preserving input order.
    async fn verify_all(&self, resolved: &[Resolved<'_>]) -> AstralResult<Vec<StampVerificationResult>> {
        let futures = resolved
            .iter()
            .enumerate()
            .map(|(index, (stamp, plugin))| verify_one(index, stamp, plugin));

        match self.config.failure_policy {
            // Dropping the remaining futures is the cancellation signal
            FailurePolicy::FailFast => try_join_all(futures).await,
            FailurePolicy::CollectAll => {
                let outcomes = join_all(futures).await;
                let mut first_error = None;
                let mut results = Vec::with_capacity(outcomes.len());
                for outcome in outcomes {
                    match outcome {
                        Ok(result) => results.push(result),
                        Err(e) => {
                            tracing::error!(error = %e, "plugin verification failed");
                            if first_error.is_none() {
                                first_error = Some(e);
                            }
                        }
                    }
                }
                match first_error {
                    Some(e) => Err(e),
                    None => Ok(results),
                }
            }
        }
    }

    fn score(
        &self,
        claim: &Claim,
        resolved: &[Resolved<'_>],
        verifications: Vec<StampVerificationResult>,
    ) -> CredibilityVector {
        let mut assessments = Vec::with_capacity(resolved.len());
        let mut correlation_inputs = Vec::new();

        for (index, ((stamp, plugin), verification)) in
            resolved.iter().zip(verifications).enumerate()
        {
            let trust_root = plugin.descriptor().trust_root;
            let distance_m = stamp
                .location()
                .is_valid()
                .then(|| haversine_m(&claim.location, stamp.location()));

            let (spatial, temporal) = if verification.valid() {
                if distance_m.is_some() {
                    correlation_inputs.push(CorrelationInput {
                        location: *stamp.location(),
                        trust_root,
                    });
                }
                (
                    distance_m.map_or(0.0, |d| spatial_score(d, claim.radius_m)),
                    temporal_score(&claim.window, stamp.observed()),
                )
            } else {
                tracing::debug!(
                    stamp_index = index,
                    plugin = %stamp.plugin_name(),
                    failed = ?verification.failed_checks(),
                    "stamp reported invalid by its plugin"
                );
                (0.0, 0.0)
            };

            assessments.push(StampAssessment {
                index,
                stamp_id: stamp.id(),
                plugin: stamp.plugin_name().to_string(),
                trust_root,
                verification,
                distance_m,
                spatial,
                temporal,
            });
        }

        let correlation = correlation_score(&correlation_inputs, claim.radius_m, &self.config.correlation);
        aggregate(assessments, correlation)
    }
}

async fn verify_one(
    index: usize,
    stamp: &LocationStamp,
    plugin: &Arc<dyn LocationProofPlugin>,
) -> AstralResult<StampVerificationResult> {
    let started = Instant::now();
    match plugin.verify(stamp).await {
        Ok(result) => {
            tracing::debug!(
                stamp_index = index,
                plugin = %plugin.name(),
                valid = result.valid(),
                elapsed_ms = saturating_millis(started.elapsed()),
                "stamp verified"
            );
            Ok(result)
        }
        Err(source) => Err(AstralError::PluginFailure {
            stamp_index: index,
            plugin: plugin.name().to_string(),
            source: Box::new(source),
        }),
    }
}

/// Tracks the stage of one evaluation call.
struct StageTracker {
    stage: EvaluationStage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            stage: EvaluationStage::Received,
        }
    }

    fn stage(&self) -> EvaluationStage {
        self.stage
    }

    fn advance(&mut self, next: EvaluationStage) -> AstralResult<()> {
        if self.stage.can_transition_to(next) {
            tracing::debug!("Evaluation stage: {} -> {}", self.stage, next);
            self.stage = next;
            Ok(())
        } else {
            Err(AstralError::Validation(format!(
                "invalid stage transition: {} -> {}",
                self.stage, next
            )))
        }
    }

    fn fail(&mut self) {
        if !self.stage.is_terminal() {
            self.stage = EvaluationStage::Failed;
        }
    }
}
