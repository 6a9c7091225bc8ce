//! Claims: the caller-asserted location, radius and time window under evaluation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AstralError, AstralResult};
use crate::geo::GeoPoint;

/// Closed time interval `[start, end]`. An instant has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Zero-length window at `at`.
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }

    /// Window of `duration` starting at `start`.
    pub fn starting_at(start: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            start,
            end: start + duration,
        }
    }

    pub fn is_instant(&self) -> bool {
        self.start == self.end
    }

    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }

    /// Length in seconds, at nanosecond resolution.
    pub fn duration_secs(&self) -> f64 {
        span_secs(self.end - self.start)
    }

    /// Inclusive containment of a single instant.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// Length of the intersection in seconds, `None` when disjoint.
    ///
    /// Windows touching at a single instant intersect with length zero.
    pub fn overlap_secs(&self, other: &TimeWindow) -> Option<f64> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start > end {
            None
        } else {
            Some(span_secs(end - start))
        }
    }
}

/// Spans past the nanosecond range (~292 years) fall back to milliseconds.
fn span_secs(span: Duration) -> f64 {
    match span.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        None => span.num_milliseconds() as f64 / 1e3,
    }
}

/// A claim about where and when something happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Asserted center.
    pub location: GeoPoint,
    /// Tolerance around the center, meters.
    pub radius_m: f64,
    /// Asserted time window.
    pub window: TimeWindow,
    /// Who or what the claim is about, if anyone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Claim {
    pub fn new(location: GeoPoint, radius_m: f64, window: TimeWindow) -> Self {
        Self {
            location,
            radius_m,
            window,
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Check geometry and window before any stamp is looked at.
    pub fn validate(&self) -> AstralResult<()> {
        self.location.validate("location")?;

        if !self.radius_m.is_finite() || self.radius_m <= 0.0 {
            return Err(AstralError::InvalidClaim {
                field: "radius_m",
                reason: format!("radius must be a positive number of meters, got {}", self.radius_m),
            });
        }

        if self.window.end <= self.window.start {
            return Err(AstralError::InvalidClaim {
                field: "window",
                reason: format!(
                    "window end {} is not after start {}",
                    self.window.end.to_rfc3339(),
                    self.window.start.to_rfc3339()
                ),
            });
        }

        Ok(())
    }
}
