//! Hive Node - the service owning all mesh state.
//!
//! Architecture:
//! - One explicitly constructed instance per mesh node, shared by `Arc`
//! - Separate locks for the directory, the consensus engine and the
//!   pheromone field; always acquired in that order
//! - Events published on a broadcast channel
//! - A maintenance loop (`run`) that sweeps liveness, closes due proposals
//!   and evicts expired trails

use crate::clock::{Clock, SystemClock};
use crate::config::HiveConfig;
use crate::error::Result;
use crate::events::HiveEvent;
use hive_consensus::{
    Ballot, Choice, ConsensusEngine, ConsensusStats, Electorate, Finalized, Proposal, ProposalDraft,
    ProposalId, Tally,
};
use hive_membership::{
    Admission, AgentId, DirectoryConfig, MemberStatus, MembershipCounts, MembershipDirectory,
    MembershipRecord, Weight,
};
use hive_pheromone::{
    BucketPattern, BucketedMetrics, Delivery, Fingerprint, PheromoneField, PheromoneTrail,
};
use hive_topology::HexCoord;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

/// Capacity of the event channel.
const EVENT_CAPACITY: usize = 1024;

/// A member's record and its Active neighbors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub record: MembershipRecord,
    pub neighbors: Vec<MembershipRecord>,
}

/// Result of one pheromone emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitReport {
    pub fingerprint: Fingerprint,
    pub origin: HexCoord,
    /// Neighbor cells the trail was handed to.
    pub recipients: Vec<HexCoord>,
    /// How many of them now hold it.
    pub stored: usize,
}

/// Cumulative pheromone delivery outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCounts {
    pub stored: u64,
    pub replaced: u64,
    pub stale: u64,
    pub expired: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct DeliveryCounters {
    stored: AtomicU64,
    replaced: AtomicU64,
    stale: AtomicU64,
    expired: AtomicU64,
    dropped: AtomicU64,
}

impl DeliveryCounters {
    fn record(&self, delivery: Delivery) {
        let counter = match delivery {
            Delivery::Stored => &self.stored,
            Delivery::Replaced => &self.replaced,
            Delivery::Stale => &self.stale,
            Delivery::Expired => &self.expired,
            Delivery::Dropped => &self.dropped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DeliveryCounts {
        DeliveryCounts {
            stored: self.stored.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Node-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStats {
    pub membership: MembershipCounts,
    pub held_cells: usize,
    pub total_active_weight: Weight,
    pub consensus: ConsensusStats,
    pub trails: usize,
    pub deliveries: DeliveryCounts,
}

/// What one maintenance pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub events: Vec<HiveEvent>,
    pub collected_records: usize,
    pub evicted_trails: usize,
}

/// A Hive node instance.
pub struct HiveNode {
    config: HiveConfig,
    clock: Arc<dyn Clock>,
    directory: RwLock<MembershipDirectory>,
    consensus: RwLock<ConsensusEngine>,
    field: RwLock<PheromoneField>,
    events: broadcast::Sender<HiveEvent>,
    deliveries: DeliveryCounters,
}

impl HiveNode {
    /// Create a node on wall-clock time.
    pub fn new(config: HiveConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: HiveConfig, clock: Arc<dyn Clock>) -> Self {
        let directory = MembershipDirectory::new(DirectoryConfig {
            max_cells: config.max_cells,
            departure_grace: config.departure_grace,
        });
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            config,
            clock,
            directory: RwLock::new(directory),
            consensus: RwLock::new(ConsensusEngine::new()),
            field: RwLock::new(PheromoneField::new()),
            events,
            deliveries: DeliveryCounters::default(),
        }
    }

    pub fn config(&self) -> &HiveConfig {
        &self.config
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<HiveEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: HiveEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // ---- membership ----

    /// Register `agent`, or return its existing Active record.
    pub async fn register(&self, agent: AgentId, weight: Weight, hint: Option<HexCoord>) -> Result<Admission> {
        let mut directory = self.directory.write().await;
        let now = self.now();
        let previous = directory.record(&agent).map(|r| r.status);

        let admission = directory.register(agent, weight, hint, now)?;
        if admission.is_new_state() {
            let record = admission.record();
            self.publish(HiveEvent::joined(record.agent.clone(), record.coord, previous, now));
        }
        Ok(admission)
    }

    pub async fn heartbeat(&self, agent: &AgentId) -> Result<()> {
        let mut directory = self.directory.write().await;
        if let Some(change) = directory.heartbeat(agent, self.now())? {
            HiveEvent::from_change(&change).into_iter().for_each(|e| self.publish(e));
        }
        Ok(())
    }

    /// Leave the mesh. The cell and everything delivered to it are released.
    pub async fn withdraw(&self, agent: &AgentId) -> Result<()> {
        let mut directory = self.directory.write().await;
        let change = directory.withdraw(agent, self.now())?;
        self.field.write().await.clear_cell(change.coord);
        HiveEvent::from_change(&change).into_iter().for_each(|e| self.publish(e));
        Ok(())
    }

    pub async fn resolve_neighbors(&self, agent: &AgentId) -> Result<Vec<MembershipRecord>> {
        Ok(self.directory.read().await.resolve_neighbors(agent)?)
    }

    pub async fn status(&self, agent: &AgentId) -> Result<AgentStatus> {
        let directory = self.directory.read().await;
        let record = directory.active_record(agent)?.clone();
        let neighbors = directory.resolve_neighbors(agent)?;
        Ok(AgentStatus { record, neighbors })
    }

    /// Any record for `agent`, whatever its status.
    pub async fn record(&self, agent: &AgentId) -> Option<MembershipRecord> {
        self.directory.read().await.record(agent).cloned()
    }

    /// Takes effect for proposals opened afterwards.
    pub async fn update_voting_weight(&self, agent: &AgentId, weight: Weight) -> Result<MembershipRecord> {
        Ok(self.directory.write().await.update_voting_weight(agent, weight)?)
    }

    // ---- pheromones ----

    /// Emit a trail from `agent`'s cell to its Active neighbors.
    ///
    /// Delivery is at-most-once; drops are counted and logged, never
    /// returned as errors.
    pub async fn emit(&self, agent: &AgentId, metrics: BucketedMetrics, ttl: Option<Duration>) -> Result<EmitReport> {
        let directory = self.directory.read().await;
        let origin = directory.active_record(agent)?.coord;
        let recipients: Vec<HexCoord> = directory
            .active_neighbors_of(origin)
            .into_iter()
            .map(|r| r.coord)
            .collect();

        let now = self.now();
        let fingerprint = self.config.fingerprinter.fingerprint(agent.as_str(), &metrics);
        let trail = PheromoneTrail::new(
            fingerprint,
            metrics,
            origin,
            now,
            ttl.unwrap_or(self.config.default_ttl),
        )?;

        let mut field = self.field.write().await;
        let mut stored = 0;
        for &recipient in &recipients {
            let delivery = field.deliver(recipient, trail.clone(), now);
            self.deliveries.record(delivery);
            match delivery {
                Delivery::Stored | Delivery::Replaced => stored += 1,
                Delivery::Dropped => warn!(%origin, %recipient, "pheromone dropped, inbox full"),
                other => debug!(%origin, %recipient, ?other, "pheromone not stored"),
            }
        }

        debug!(%origin, fingerprint = %fingerprint, recipients = recipients.len(), stored, "pheromone emitted");
        Ok(EmitReport {
            fingerprint,
            origin,
            recipients,
            stored,
        })
    }

    /// Live trails received at `agent`'s cell that match `pattern`.
    pub async fn similar(&self, agent: &AgentId, pattern: &BucketPattern) -> Result<Vec<PheromoneTrail>> {
        let directory = self.directory.read().await;
        let coord = directory.active_record(agent)?.coord;
        let field = self.field.read().await;
        Ok(field
            .similar_to(coord, pattern, self.now())
            .into_iter()
            .cloned()
            .collect())
    }

    // ---- consensus ----

    /// Open a proposal over the current Active membership.
    ///
    /// A named proposer must be Active. Without one the node proposes on
    /// the mesh's behalf.
    pub async fn open_proposal(&self, draft: ProposalDraft) -> Result<Proposal> {
        let directory = self.directory.read().await;
        if let Some(proposer) = &draft.proposer {
            directory.active_record(proposer)?;
        }
        let electorate = Electorate::new(directory.active_weights());

        let mut consensus = self.consensus.write().await;
        Ok(consensus.open(draft, electorate, self.now())?)
    }

    /// Cast or revise `voter`'s ballot. The voter must be Active now.
    pub async fn cast_ballot(&self, proposal: ProposalId, voter: &AgentId, choice: Choice) -> Result<Ballot> {
        let directory = self.directory.read().await;
        directory.active_record(voter)?;

        let mut consensus = self.consensus.write().await;
        Ok(consensus.cast_ballot(proposal, voter.clone(), choice, self.now())?)
    }

    /// Close ahead of the deadline if the outcome is already settled.
    pub async fn close_early(&self, proposal: ProposalId) -> Result<Option<Proposal>> {
        let finalized = self.consensus.write().await.close_early(proposal, self.now())?;
        Ok(finalized.map(|done| {
            let proposal = done.proposal.clone();
            self.publish(HiveEvent::finalized(done));
            proposal
        }))
    }

    pub async fn proposal(&self, id: ProposalId) -> Result<Proposal> {
        Ok(self.consensus.read().await.proposal(id)?.clone())
    }

    /// Advisory while open, final once closed.
    pub async fn preview(&self, id: ProposalId) -> Result<Tally> {
        Ok(self.consensus.read().await.preview(id)?)
    }

    pub async fn open_proposals(&self) -> Vec<Proposal> {
        self.consensus.read().await.open_proposals().cloned().collect()
    }

    // ---- maintenance ----

    pub async fn stats(&self) -> NodeStats {
        let directory = self.directory.read().await;
        let consensus = self.consensus.read().await;
        let field = self.field.read().await;
        NodeStats {
            membership: directory.counts(),
            held_cells: directory.held_cells(),
            total_active_weight: directory.total_active_weight(),
            consensus: consensus.stats(),
            trails: field.len(),
            deliveries: self.deliveries.snapshot(),
        }
    }

    /// One maintenance pass: liveness sweep, garbage collection, due
    /// proposals, expired trails.
    pub async fn tick(&self) -> TickReport {
        let now = self.now();
        let mut report = TickReport::default();

        let (changes, collected) = {
            let mut directory = self.directory.write().await;
            let changes = directory.sweep(now, self.config.heartbeat_timeout);
            let collected = directory.collect_garbage(now, self.config.departed_retention);

            // A departed cell is free the moment the directory guard drops,
            // so its inbox must be gone by then.
            let mut field = self.field.write().await;
            for change in changes.iter().filter(|c| c.to == MemberStatus::Departed) {
                field.clear_cell(change.coord);
            }
            (changes, collected)
        };
        report.collected_records = collected;

        let finalized: Vec<Finalized> = self.consensus.write().await.close_due(now);

        report.evicted_trails = self.field.write().await.evict_expired(now);

        for change in &changes {
            report.events.extend(HiveEvent::from_change(change));
        }
        report.events.extend(finalized.into_iter().map(HiveEvent::finalized));
        for event in &report.events {
            self.publish(event.clone());
        }

        if !report.events.is_empty() || collected > 0 {
            debug!(
                events = report.events.len(),
                collected,
                evicted = report.evicted_trails,
                "maintenance tick"
            );
        }
        report
    }

    /// Tick every `sweep_interval` until `shutdown` resolves.
    pub async fn run<F>(self: Arc<Self>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.config.sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(interval_ms = self.config.sweep_interval.as_millis() as u64, "maintenance loop started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = &mut shutdown => {
                    info!("maintenance loop stopping");
                    return Ok(());
                }
            }
        }
    }
}

impl std::fmt::Debug for HiveNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HiveNode").field("config", &self.config).finish_non_exhaustive()
    }
}
