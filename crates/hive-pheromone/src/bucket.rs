//! Coarse metric buckets.
//!
//! Only buckets ever leave an agent. Raw readings are quantised by the caller
//! (see [`MetricBucket::from_ratio`]) and dropped before a trail is built.

use crate::error::{PheromoneError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Most metrics a single trail may carry.
pub const MAX_METRICS: usize = 16;

/// Longest metric name.
pub const MAX_METRIC_NAME_LEN: usize = 32;

/// A coarse level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricBucket {
    Low,
    Medium,
    High,
}

impl MetricBucket {
    /// Quantise a reading normalised to `0.0..=1.0`.
    ///
    /// Out-of-range values clamp; NaN reads as Low.
    pub fn from_ratio(value: f64) -> Self {
        if value.is_nan() || value < 1.0 / 3.0 {
            Self::Low
        } else if value < 2.0 / 3.0 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub(crate) fn tag(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_METRIC_NAME_LEN {
        return Err(PheromoneError::InvalidInput(format!(
            "metric name must be 1..={} characters",
            MAX_METRIC_NAME_LEN
        )));
    }
    if !name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_') {
        return Err(PheromoneError::InvalidInput(format!(
            "metric name {:?} must be [a-z0-9_]",
            name
        )));
    }
    Ok(())
}

/// A validated set of bucketed metrics, ordered by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, MetricBucket>", into = "BTreeMap<String, MetricBucket>")]
pub struct BucketedMetrics(BTreeMap<String, MetricBucket>);

impl BucketedMetrics {
    /// Validate a metric map. Must hold between one and [`MAX_METRICS`] entries.
    pub fn new(metrics: BTreeMap<String, MetricBucket>) -> Result<Self> {
        if metrics.is_empty() {
            return Err(PheromoneError::InvalidInput("no metrics".into()));
        }
        if metrics.len() > MAX_METRICS {
            return Err(PheromoneError::InvalidInput(format!(
                "at most {} metrics per trail",
                MAX_METRICS
            )));
        }
        for name in metrics.keys() {
            validate_name(name)?;
        }
        Ok(Self(metrics))
    }

    /// Build from (name, bucket) pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, MetricBucket)>,
        S: Into<String>,
    {
        Self::new(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn get(&self, name: &str) -> Option<MetricBucket> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, MetricBucket)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether every pair in `pattern` appears here with the same bucket.
    pub fn matches(&self, pattern: &BucketPattern) -> bool {
        pattern.0.iter().all(|(name, bucket)| self.0.get(name) == Some(bucket))
    }

    /// Canonical byte encoding: `name 0x00 tag` per entry, in name order.
    pub(crate) fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() * 8);
        for (name, bucket) in &self.0 {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
            out.push(bucket.tag());
        }
        out
    }
}

impl TryFrom<BTreeMap<String, MetricBucket>> for BucketedMetrics {
    type Error = PheromoneError;

    fn try_from(value: BTreeMap<String, MetricBucket>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<BucketedMetrics> for BTreeMap<String, MetricBucket> {
    fn from(m: BucketedMetrics) -> Self {
        m.0
    }
}

/// A similarity query: the (metric, bucket) pairs a trail must carry.
///
/// An empty pattern matches every live trail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, MetricBucket>", into = "BTreeMap<String, MetricBucket>")]
pub struct BucketPattern(BTreeMap<String, MetricBucket>);

impl BucketPattern {
    pub fn new(pattern: BTreeMap<String, MetricBucket>) -> Result<Self> {
        for name in pattern.keys() {
            validate_name(name)?;
        }
        Ok(Self(pattern))
    }

    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, MetricBucket)>,
        S: Into<String>,
    {
        Self::new(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Pattern matching everything.
    pub fn any() -> Self {
        Self::default()
    }
}

impl TryFrom<BTreeMap<String, MetricBucket>> for BucketPattern {
    type Error = PheromoneError;

    fn try_from(value: BTreeMap<String, MetricBucket>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<BucketPattern> for BTreeMap<String, MetricBucket> {
    fn from(p: BucketPattern) -> Self {
        p.0
    }
}
