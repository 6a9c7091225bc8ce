//! Credibility scoring and aggregation.
//!
//! Every function here is pure: no clocks, no I/O, no randomness. Identical
//! inputs always produce identical vectors.
//!
//! - Spatial: `S = 1 - d/r` for `d < r`, `0` otherwise
//! - Temporal: `T = |footprint ∩ window| / |footprint|` (instants: 1 inside, 0 outside)
//! - Correlation: mean over valid pairs of `agreement · ((1 - w) + w · independence)`

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::claim::TimeWindow;
use crate::geo::{haversine_m, GeoPoint};
use crate::plugin::TrustRoot;
use crate::stamp::StampVerificationResult;

/// Parameters of the cross-stamp correlation score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Scale of pairwise agreement, as a multiple of the claim radius.
    /// Two stamps this far apart agree not at all.
    pub agreement_radius_factor: f64,
    /// Share of the pair score reserved for trust-root independence, in [0, 1].
    pub independence_weight: f64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            agreement_radius_factor: 1.0,
            independence_weight: 0.25,
        }
    }
}

/// Spatial accuracy of a stamp against a claim radius.
///
/// Decays linearly with distance and is exactly zero at `distance == radius`.
pub fn spatial_score(distance_m: f64, radius_m: f64) -> f64 {
    if !distance_m.is_finite() || !radius_m.is_finite() || radius_m <= 0.0 {
        return 0.0;
    }
    if distance_m >= radius_m {
        return 0.0;
    }
    (1.0 - distance_m / radius_m).clamp(0.0, 1.0)
}

/// Fraction of a stamp's observation footprint that lies inside the claim window.
pub fn temporal_score(window: &TimeWindow, footprint: &TimeWindow) -> f64 {
    if !footprint.is_ordered() {
        return 0.0;
    }
    let length = footprint.duration_secs();
    if footprint.is_instant() || length <= 0.0 {
        return if window.contains(footprint.start) { 1.0 } else { 0.0 };
    }
    match window.overlap_secs(footprint) {
        Some(overlap) => {
            let fraction = overlap / length;
            if fraction.is_finite() {
                fraction.clamp(0.0, 1.0)
            } else {
                0.0
            }
        }
        None => 0.0,
    }
}

/// Input to the correlation score: one entry per internally valid stamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationInput {
    pub location: GeoPoint,
    pub trust_root: TrustRoot,
}

/// Cross-stamp correlation, averaged over all unordered pairs of valid stamps.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrelationScore {
    /// Combined pair score in [0, 1].
    pub score: f64,
    /// Mean location agreement in [0, 1].
    pub agreement: f64,
    /// Fraction of pairs backed by independent trust roots.
    pub independence: f64,
    /// Number of pairs considered. Zero when fewer than two valid stamps.
    pub pairs: usize,
}

/// Correlate independently reported locations.
///
/// Fewer than two inputs yield the zero score.
pub fn correlation_score(
    inputs: &[CorrelationInput],
    claim_radius_m: f64,
    config: &CorrelationConfig,
) -> CorrelationScore {
    if inputs.len() < 2 {
        return CorrelationScore::default();
    }

    let agreement_radius = claim_radius_m * config.agreement_radius_factor;
    let w = config.independence_weight.clamp(0.0, 1.0);

    let mut pairs = 0usize;
    let mut agreement_sum = 0.0;
    let mut independence_sum = 0.0;
    let mut score_sum = 0.0;

    for (i, a) in inputs.iter().enumerate() {
        for b in &inputs[i + 1..] {
            let agreement = spatial_score(haversine_m(&a.location, &b.location), agreement_radius);
            let independence = if a.trust_root.independent_of(&b.trust_root) {
                1.0
            } else {
                0.0
            };

            agreement_sum += agreement;
            independence_sum += independence;
            score_sum += agreement * ((1.0 - w) + w * independence);
            pairs += 1;
        }
    }

    let n = pairs as f64;
    CorrelationScore {
        score: score_sum / n,
        agreement: agreement_sum / n,
        independence: independence_sum / n,
        pairs,
    }
}

/// Per-stamp outcome, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampAssessment {
    pub index: usize,
    pub stamp_id: Uuid,
    pub plugin: String,
    pub trust_root: TrustRoot,
    pub verification: StampVerificationResult,
    /// Distance from the claim center; reported for invalid stamps too.
    /// `None` when the stamp's coordinates are not a valid point.
    pub distance_m: Option<f64>,
    /// Zero for internally invalid stamps.
    pub spatial: f64,
    /// Zero for internally invalid stamps.
    pub temporal: f64,
}

impl StampAssessment {
    pub fn is_valid(&self) -> bool {
        self.verification.valid()
    }
}

/// Multidimensional credibility of a claim given its stamps.
///
/// Dimensions are deliberately not combined; consumers weight them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityVector {
    /// Mean spatial score over valid stamps.
    pub spatial: f64,
    /// Mean temporal score over valid stamps.
    pub temporal: f64,
    pub correlation: CorrelationScore,
    /// Fraction of submitted stamps their plugins reported valid.
    pub validity: f64,
    pub stamps: Vec<StampAssessment>,
}

impl CredibilityVector {
    /// The vector for an evaluation with no stamps: every dimension zero.
    pub fn empty() -> Self {
        Self {
            spatial: 0.0,
            temporal: 0.0,
            correlation: CorrelationScore::default(),
            validity: 0.0,
            stamps: Vec::new(),
        }
    }

    pub fn valid_stamps(&self) -> usize {
        self.stamps.iter().filter(|s| s.is_valid()).count()
    }
}

/// Combine per-stamp scores and the correlation score into a vector.
///
/// Invalid stamps stay in `stamps` but do not enter the spatial and temporal
/// means.
pub fn aggregate(assessments: Vec<StampAssessment>, correlation: CorrelationScore) -> CredibilityVector {
    if assessments.is_empty() {
        return CredibilityVector {
            correlation,
            ..CredibilityVector::empty()
        };
    }

    let total = assessments.len() as f64;
    let (count, spatial_sum, temporal_sum) = assessments
        .iter()
        .filter(|a| a.is_valid())
        .fold((0usize, 0.0, 0.0), |(n, s, t), a| (n + 1, s + a.spatial, t + a.temporal));

    let (spatial, temporal) = if count == 0 {
        (0.0, 0.0)
    } else {
        (spatial_sum / count as f64, temporal_sum / count as f64)
    };

    CredibilityVector {
        spatial,
        temporal,
        correlation,
        validity: count as f64 / total,
        stamps: assessments,
    }
}
