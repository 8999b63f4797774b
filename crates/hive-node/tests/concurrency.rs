//! Races between clients sharing one node.

use hive_consensus::{Choice, ProposalDraft, Quorum};
use hive_membership::{AgentId, Weight};
use hive_node::{HiveClient, HiveConfig, HiveError, HiveNode, ManualClock};
use hive_topology::{total_cells_through, HexCoord};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn node_with(config: HiveConfig) -> Arc<HiveNode> {
    Arc::new(HiveNode::with_clock(config, Arc::new(ManualClock::new(0))))
}

fn client(node: &Arc<HiveNode>, name: String, weight: u64) -> HiveClient {
    HiveClient::new(Arc::clone(node), AgentId::new(name).unwrap(), Weight::new(weight))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_never_share_a_cell() {
    let node = node_with(HiveConfig::default());
    let n = total_cells_through(3) as usize;

    let handles: Vec<_> = (0..n)
        .map(|i| {
            let c = client(&node, format!("agent-{}", i), 1);
            tokio::spawn(async move { c.activate().await.map(|a| a.coord()) })
        })
        .collect();

    let mut coords = HashSet::new();
    for handle in handles {
        let coord = handle.await.unwrap().unwrap();
        assert!(coords.insert(coord), "cell {} allocated twice", coord);
    }

    // Rings 0..=3 are filled exactly, with nothing further out.
    assert_eq!(coords.len(), n);
    assert!(coords.iter().all(|c| c.hex_distance(&HexCoord::ORIGIN) <= 3));
    assert_eq!(node.stats().await.held_cells, n);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_respect_capacity() {
    let node = node_with(HiveConfig {
        max_cells: Some(7),
        ..HiveConfig::default()
    });

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let c = client(&node, format!("agent-{}", i), 1);
            tokio::spawn(async move { c.activate().await })
        })
        .collect();

    let mut admitted = 0;
    let mut exhausted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(HiveError::GridExhausted { capacity: 7 }) => exhausted += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(admitted, 7);
    assert_eq!(exhausted, 13);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_agent_racing_itself_gets_one_cell() {
    let node = node_with(HiveConfig::default());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let c = client(&node, "twin".to_string(), 5);
            tokio::spawn(async move { c.activate().await.map(|a| a.coord()) })
        })
        .collect();

    let mut coords = HashSet::new();
    for handle in handles {
        coords.insert(handle.await.unwrap().unwrap());
    }
    assert_eq!(coords.len(), 1);
    assert_eq!(node.stats().await.held_cells, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_ballots_from_one_voter_leave_one_ballot() {
    let node = node_with(HiveConfig::default());
    let voter = client(&node, "voter".to_string(), 10);
    voter.activate().await.unwrap();
    let p = node
        .open_proposal(ProposalDraft::new("race", Quorum::HALF, Duration::from_secs(60)))
        .await
        .unwrap();

    let choices = [Choice::For, Choice::Against, Choice::Abstain];
    let handles: Vec<_> = (0..30)
        .map(|i| {
            let v = voter.clone();
            let choice = choices[i % choices.len()];
            tokio::spawn(async move { v.vote(p.id, choice).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let tally = node.preview(p.id).await.unwrap();
    assert_eq!(tally.ballots, 1);
    assert_eq!(tally.cast_weight, Weight::new(10));
    let sides = [tally.for_weight, tally.against_weight, tally.abstain_weight];
    assert_eq!(sides.iter().filter(|w| **w == Weight::new(10)).count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_proceed_alongside_writers() {
    let node = node_with(HiveConfig::default());
    let anchor = client(&node, "anchor".to_string(), 1);
    anchor.activate().await.unwrap();

    let writers: Vec<_> = (0..24)
        .map(|i| {
            let c = client(&node, format!("w-{}", i), 1);
            tokio::spawn(async move { c.activate().await.map(|_| ()) })
        })
        .collect();
    let readers: Vec<_> = (0..24)
        .map(|_| {
            let a = anchor.clone();
            tokio::spawn(async move { a.status().await.map(|s| s.neighbors.len()) })
        })
        .collect();

    for w in writers {
        w.await.unwrap().unwrap();
    }
    for r in readers {
        assert!(r.await.unwrap().unwrap() <= 6);
    }
    assert_eq!(anchor.status().await.unwrap().neighbors.len(), 6);
}
