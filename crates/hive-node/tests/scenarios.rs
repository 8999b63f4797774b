//! End-to-end behavior of a single node driven through the client facade.

use hive_consensus::{Choice, ProposalDraft, ProposalStatus, Quorum};
use hive_membership::{Admission, AgentId, MemberStatus, Weight};
use hive_node::{HiveClient, HiveConfig, HiveError, HiveEvent, HiveNode, ManualClock};
use hive_pheromone::{BucketPattern, BucketedMetrics, MetricBucket};
use hive_topology::{neighbors_of, HexCoord};
use std::sync::Arc;
use std::time::Duration;

const SEC: Duration = Duration::from_secs(1);

fn setup() -> (Arc<HiveNode>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let node = Arc::new(HiveNode::with_clock(HiveConfig::default(), clock.clone()));
    (node, clock)
}

fn client(node: &Arc<HiveNode>, name: &str, weight: u64) -> HiveClient {
    HiveClient::new(Arc::clone(node), AgentId::new(name).unwrap(), Weight::new(weight))
}

fn metrics(pairs: &[(&str, MetricBucket)]) -> BucketedMetrics {
    BucketedMetrics::from_pairs(pairs.iter().map(|(k, v)| (*k, *v))).unwrap()
}

#[tokio::test]
async fn lone_member_proposal_passes() {
    let (node, clock) = setup();
    let a = client(&node, "agent-a", 10);
    // B carries no stake so A alone makes up the electorate weight.
    let b = client(&node, "agent-b", 0);

    assert_eq!(a.activate().await.unwrap().coord(), HexCoord::ORIGIN);
    let b_coord = b.activate().await.unwrap().coord();
    assert_ne!(b_coord, HexCoord::ORIGIN);
    assert_eq!(b_coord.hex_distance(&HexCoord::ORIGIN), 1);

    let p = a
        .open_proposal("adopt ring policy", "", Some(Quorum::new(0.5).unwrap()), Some(60 * SEC))
        .await
        .unwrap();
    assert_eq!(p.electorate_weight, Weight::new(10));

    let ballot = a.vote(p.id, Choice::For).await.unwrap();
    assert_eq!(ballot.weight, Weight::new(10));

    let mut events = node.subscribe();
    clock.advance(60 * SEC);
    node.tick().await;

    let (closed, tally) = a.proposal(p.id).await.unwrap();
    assert_eq!(closed.status, ProposalStatus::Passed);
    assert_eq!(tally.turnout(), 1.0);

    // The same tick also reports both members as silent.
    let mut finalized = None;
    while let Ok(event) = events.try_recv() {
        if let HiveEvent::ProposalFinalized { proposal, tally } = event {
            finalized = Some((proposal, tally));
        }
    }
    let (proposal, final_tally) = finalized.expect("no ProposalFinalized event");
    assert_eq!(proposal.id, p.id);
    assert_eq!(proposal.status, ProposalStatus::Passed);
    assert_eq!(final_tally, tally);
}

#[tokio::test]
async fn insufficient_turnout_expires() {
    let (node, clock) = setup();
    let voters = [("v1", 40), ("v2", 30), ("v3", 30)];
    let clients: Vec<_> = voters.iter().map(|(n, w)| client(&node, n, *w)).collect();
    for c in &clients {
        c.activate().await.unwrap();
    }

    let p = clients[0]
        .open_proposal("raise cap", "", Some(Quorum::new(0.6).unwrap()), Some(60 * SEC))
        .await
        .unwrap();
    assert_eq!(p.electorate_weight, Weight::new(100));

    clients[0].vote(p.id, Choice::For).await.unwrap();
    clock.advance(60 * SEC);
    node.tick().await;

    assert_eq!(node.proposal(p.id).await.unwrap().status, ProposalStatus::Expired);
}

#[tokio::test]
async fn reregistering_is_idempotent() {
    let (node, _clock) = setup();
    let a = client(&node, "agent-a", 10);
    let first = a.activate().await.unwrap();
    let second = a.activate().await.unwrap();

    assert!(matches!(second.admission, Admission::AlreadyRegistered(_)));
    assert_eq!(first.coord(), second.coord());
    assert_eq!(first.admission.record(), second.admission.record());
    assert_eq!(node.stats().await.held_cells, 1);
}

#[tokio::test]
async fn electorate_weight_fixed_at_open() {
    let (node, _clock) = setup();
    let mut a = client(&node, "agent-a", 10);
    a.activate().await.unwrap();

    let p = a.open_proposal("freeze", "", None, None).await.unwrap();
    assert_eq!(p.electorate_weight, Weight::new(10));

    let late = client(&node, "late", 500);
    late.activate().await.unwrap();
    a.update_voting_weight(Weight::new(1_000)).await.unwrap();

    // Late joiner may vote but carries no weight in this proposal.
    let ballot = late.vote(p.id, Choice::Against).await.unwrap();
    assert_eq!(ballot.weight, Weight::ZERO);
    let ballot = a.vote(p.id, Choice::For).await.unwrap();
    assert_eq!(ballot.weight, Weight::new(10));

    assert_eq!(node.proposal(p.id).await.unwrap().electorate_weight, Weight::new(10));
    assert_eq!(node.preview(p.id).await.unwrap().electorate_weight, Weight::new(10));

    let next = a.open_proposal("next", "", None, None).await.unwrap();
    assert_eq!(next.electorate_weight, Weight::new(1_500));
}

#[tokio::test]
async fn later_ballot_replaces_earlier() {
    let (node, clock) = setup();
    let a = client(&node, "agent-a", 10);
    let b = client(&node, "agent-b", 5);
    a.activate().await.unwrap();
    b.activate().await.unwrap();

    let p = a.open_proposal("revise", "", None, Some(60 * SEC)).await.unwrap();
    a.vote(p.id, Choice::Against).await.unwrap();
    b.vote(p.id, Choice::For).await.unwrap();
    clock.advance(SEC);
    a.vote(p.id, Choice::For).await.unwrap();

    clock.advance(60 * SEC);
    node.tick().await;
    let (closed, tally) = a.proposal(p.id).await.unwrap();
    assert_eq!(tally.ballots, 2);
    assert_eq!(tally.for_weight, Weight::new(15));
    assert_eq!(tally.against_weight, Weight::ZERO);
    assert_eq!(closed.status, ProposalStatus::Passed);
}

#[tokio::test]
async fn ballots_after_close_are_rejected() {
    let (node, clock) = setup();
    let a = client(&node, "agent-a", 10);
    a.activate().await.unwrap();
    let p = a.open_proposal("late", "", None, Some(60 * SEC)).await.unwrap();

    clock.advance(60 * SEC);
    let err = a.vote(p.id, Choice::For).await.unwrap_err();
    assert!(matches!(err, HiveError::ProposalClosed(id) if id == p.id));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn unknown_voter_rejected() {
    let (node, _clock) = setup();
    let a = client(&node, "agent-a", 10);
    a.activate().await.unwrap();
    let p = a.open_proposal("who", "", None, None).await.unwrap();

    let stranger = client(&node, "stranger", 10);
    let err = stranger.vote(p.id, Choice::For).await.unwrap_err();
    assert!(matches!(err, HiveError::UnknownAgent(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn early_close_when_decided() {
    let (node, _clock) = setup();
    let a = client(&node, "agent-a", 70);
    let b = client(&node, "agent-b", 30);
    a.activate().await.unwrap();
    b.activate().await.unwrap();

    let p = a.open_proposal("fast", "", None, None).await.unwrap();
    assert_eq!(a.close_early(p.id).await.unwrap(), None);

    a.vote(p.id, Choice::For).await.unwrap();
    let closed = a.close_early(p.id).await.unwrap().unwrap();
    assert_eq!(closed.status, ProposalStatus::Passed);

    let err = b.vote(p.id, Choice::Against).await.unwrap_err();
    assert!(matches!(err, HiveError::ProposalClosed(_)));
}

#[tokio::test]
async fn pheromone_ttl_boundary() {
    let (node, clock) = setup();
    let a = client(&node, "agent-a", 1);
    let b = client(&node, "agent-b", 1);
    a.activate().await.unwrap();
    b.activate().await.unwrap();

    let report = b
        .share_state(metrics(&[("load", MetricBucket::High), ("mood", MetricBucket::Low)]), Some(60 * SEC))
        .await
        .unwrap();
    assert_eq!(report.recipients, vec![HexCoord::ORIGIN]);
    assert_eq!(report.stored, 1);

    let pattern = BucketPattern::from_pairs([("load", MetricBucket::High)]).unwrap();
    clock.advance(59 * SEC);
    let trails = a.similar(&pattern).await.unwrap();
    assert_eq!(trails.len(), 1);
    assert_eq!(trails[0].origin(), report.origin);
    assert_eq!(trails[0].fingerprint(), report.fingerprint);

    let miss = BucketPattern::from_pairs([("load", MetricBucket::Low)]).unwrap();
    assert!(a.similar(&miss).await.unwrap().is_empty());

    clock.advance(2 * SEC);
    assert!(a.similar(&pattern).await.unwrap().is_empty());
}

#[tokio::test]
async fn trails_carry_no_identity() {
    let (node, _clock) = setup();
    let a = client(&node, "agent-a", 1);
    let b = client(&node, "agent-b", 1);
    a.activate().await.unwrap();
    b.activate().await.unwrap();

    b.share_state(metrics(&[("load", MetricBucket::Medium)]), None).await.unwrap();
    let trails = a.similar(&BucketPattern::any()).await.unwrap();
    let json = serde_json::to_string(&trails).unwrap();
    assert!(!json.contains("agent-b"));
}

#[tokio::test]
async fn heartbeat_lapse_frees_cell() {
    let (node, clock) = setup();
    let mut events = node.subscribe();
    let a = client(&node, "agent-a", 10);
    assert_eq!(a.activate().await.unwrap().coord(), HexCoord::ORIGIN);
    assert!(matches!(events.recv().await.unwrap(), HiveEvent::MembershipChanged { status: MemberStatus::Active, .. }));

    clock.advance(31 * SEC);
    node.tick().await;
    assert_eq!(
        node.record(a.agent()).await.unwrap().status,
        MemberStatus::Unreachable
    );
    assert!(matches!(events.recv().await.unwrap(), HiveEvent::HeartbeatMissed { .. }));
    assert!(matches!(
        events.recv().await.unwrap(),
        HiveEvent::MembershipChanged { status: MemberStatus::Unreachable, .. }
    ));
    assert!(matches!(a.status().await.unwrap_err(), HiveError::UnknownAgent(_)));

    // Cell still held while Unreachable.
    let c = client(&node, "agent-c", 1);
    assert_ne!(c.activate().await.unwrap().coord(), HexCoord::ORIGIN);
    c.withdraw().await.unwrap();

    clock.advance(120 * SEC);
    node.tick().await;
    assert_eq!(node.record(a.agent()).await.unwrap().status, MemberStatus::Departed);

    let d = client(&node, "agent-d", 1);
    assert_eq!(d.activate().await.unwrap().coord(), HexCoord::ORIGIN);
}

#[tokio::test]
async fn heartbeat_revives_unreachable_member() {
    let (node, clock) = setup();
    let a = client(&node, "agent-a", 10);
    let coord = a.activate().await.unwrap().coord();

    clock.advance(31 * SEC);
    node.tick().await;
    a.heartbeat().await.unwrap();

    let status = a.status().await.unwrap();
    assert_eq!(status.record.status, MemberStatus::Active);
    assert_eq!(status.record.coord, coord);
}

#[tokio::test]
async fn neighbors_are_active_and_adjacent() {
    let (node, clock) = setup();
    let names: Vec<String> = (0..10).map(|i| format!("agent-{}", i)).collect();
    let clients: Vec<_> = names.iter().map(|n| client(&node, n, 1)).collect();
    for c in &clients {
        c.activate().await.unwrap();
    }

    // Let agent-1 lapse; everyone else keeps heartbeating.
    clock.advance(31 * SEC);
    for (i, c) in clients.iter().enumerate() {
        if i != 1 {
            c.heartbeat().await.unwrap();
        }
    }
    node.tick().await;

    for c in clients.iter().filter(|c| c.agent().as_str() != "agent-1") {
        let status = c.status().await.unwrap();
        assert!(status.neighbors.len() <= 6);
        let around = neighbors_of(status.record.coord);
        for n in &status.neighbors {
            assert_eq!(n.status, MemberStatus::Active);
            assert!(around.contains(&n.coord));
            assert_ne!(n.agent.as_str(), "agent-1");
        }
    }

    // Origin sees all of ring 1 but agent-1.
    let origin = clients[0].status().await.unwrap();
    assert_eq!(origin.record.coord, HexCoord::ORIGIN);
    assert_eq!(origin.neighbors.len(), 5);
}

#[tokio::test]
async fn grid_exhaustion_is_terminal() {
    let clock = Arc::new(ManualClock::new(0));
    let config = HiveConfig {
        max_cells: Some(1),
        ..HiveConfig::default()
    };
    let node = Arc::new(HiveNode::with_clock(config, clock));

    client(&node, "first", 1).activate().await.unwrap();
    let err = client(&node, "second", 1).activate().await.unwrap_err();
    assert!(matches!(err, HiveError::GridExhausted { capacity: 1 }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn vote_with_retry_reactivates_departed_agent() {
    let (node, clock) = setup();
    let a = client(&node, "agent-a", 10).with_retry(hive_node::RetryPolicy {
        base: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        max_attempts: 3,
    });
    a.activate().await.unwrap();
    let p = node
        .open_proposal(ProposalDraft::new("mesh", Quorum::HALF, Duration::from_secs(600)))
        .await
        .unwrap();
    assert_eq!(p.proposer, None);

    clock.advance(200 * SEC);
    node.tick().await;
    assert_eq!(node.record(a.agent()).await.unwrap().status, MemberStatus::Departed);

    let ballot = a.vote_with_retry(p.id, Choice::For).await.unwrap();
    assert_eq!(ballot.weight, Weight::new(10));
    assert_eq!(a.status().await.unwrap().record.status, MemberStatus::Active);
}

#[tokio::test]
async fn stats_track_everything() {
    let (node, clock) = setup();
    let a = client(&node, "agent-a", 3);
    let b = client(&node, "agent-b", 4);
    a.activate().await.unwrap();
    b.activate().await.unwrap();
    a.share_state(metrics(&[("load", MetricBucket::Low)]), None).await.unwrap();
    let p = a.open_proposal("count", "", None, Some(10 * SEC)).await.unwrap();
    b.vote(p.id, Choice::For).await.unwrap();

    clock.advance(10 * SEC);
    node.tick().await;

    let stats = node.stats().await;
    assert_eq!(stats.membership.active, 2);
    assert_eq!(stats.total_active_weight, Weight::new(7));
    assert_eq!(stats.consensus.passed, 1);
    assert_eq!(stats.consensus.ballots, 1);
    assert_eq!(stats.deliveries.stored, 1);
    assert_eq!(stats.trails, 1);
}
