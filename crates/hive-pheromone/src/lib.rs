//! Hive Pheromone Propagation
//!
//! Agents share coarse state with the six cells around them as pheromone
//! trails: anonymized, bucketed snapshots that expire after a ttl.
//!
//! # Information minimisation
//!
//! A trail carries only coarse buckets (low/medium/high), never raw values,
//! and is tagged with a keyed one-way fingerprint instead of the agent's
//! identity. The origin cell is kept so a recipient can hold one trail per
//! neighbor.
//!
//! # Delivery
//!
//! Trails are advisory. Delivery is fire-and-forget: the sender never learns
//! about drops and never retries.

mod bucket;
mod error;
mod field;
mod fingerprint;
mod trail;

pub use bucket::{BucketPattern, BucketedMetrics, MetricBucket, MAX_METRICS, MAX_METRIC_NAME_LEN};
pub use error::{PheromoneError, Result};
pub use field::{Delivery, PheromoneField};
pub use fingerprint::{Fingerprint, Fingerprinter};
pub use trail::PheromoneTrail;
