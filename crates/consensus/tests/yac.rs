//! YAC behavior: voting, supermajority commits, rejects, synchronization
//! hints, and catch-up for laggards.

use meridian_consensus::{ClusterOrdering, PeerOrderer, YacConfig, YacState};
use meridian_core::{Action, ConsensusOutcome, OutboundMessage, TimerId};
use meridian_types::test_utils::test_keypair;
use meridian_types::{Hash, KeyPair, Peer, Round, VoteMessage, YacHash};

const PEERS: usize = 4;

fn keypairs() -> Vec<KeyPair> {
    (1..=PEERS as u8).map(test_keypair).collect()
}

fn peers(keypairs: &[KeyPair]) -> Vec<Peer> {
    keypairs
        .iter()
        .enumerate()
        .map(|(i, kp)| {
            Peer::new(
                kp.public_key().to_hex(),
                format!("127.0.0.1:{}", 10000 + i),
            )
        })
        .collect()
}

fn yac_hash(round: Round) -> YacHash {
    YacHash::new(round, Hash::digest(b"proposal"), Hash::digest(b"block"))
}

fn fixture() -> (YacState, Vec<KeyPair>, ClusterOrdering) {
    let kps = keypairs();
    let order = ClusterOrdering::new(peers(&kps)).unwrap();
    let yac = YacState::new(kps[0].clone(), YacConfig::default());
    (yac, kps, order)
}

fn outcomes(actions: &[Action]) -> Vec<&ConsensusOutcome> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::EmitOutcome { outcome } => Some(outcome),
            _ => None,
        })
        .collect()
}

fn sends(actions: &[Action]) -> usize {
    actions.iter().filter(|a| a.is_network()).count()
}

#[test]
fn voting_propagates_state_to_every_peer() {
    let (mut yac, _kps, order) = fixture();
    let round = Round::new(1, 0);

    let actions = yac.vote(yac_hash(round), order);
    assert_eq!(sends(&actions), PEERS);
    assert!(actions
        .iter()
        .any(|a| matches!(a, Action::SetTimer { id: TimerId::VoteDelay, .. })));
    assert!(outcomes(&actions).is_empty());
}

#[test]
fn cold_start_single_vote_emits_nothing() {
    let (mut yac, kps, order) = fixture();
    let round = Round::new(1, 0);
    yac.vote(yac_hash(round), order);

    let vote = VoteMessage::sign(yac_hash(round), &kps[1]);
    let actions = yac.on_state(vec![vote]);
    assert!(outcomes(&actions).is_empty());
    assert_eq!(sends(&actions), 0);
}

#[test]
fn commit_certificate_emits_outcome_and_cancels_timer() {
    let (mut yac, kps, order) = fixture();
    let round = Round::new(1, 0);
    yac.vote(yac_hash(round), order);

    // A full commit message: votes from every peer.
    let votes: Vec<VoteMessage> = kps
        .iter()
        .map(|kp| VoteMessage::sign(yac_hash(round), kp))
        .collect();
    let actions = yac.on_state(votes);

    let emitted = outcomes(&actions);
    assert_eq!(emitted.len(), 1);
    match emitted[0] {
        ConsensusOutcome::Commit {
            round: r,
            block_hash,
            votes,
        } => {
            assert_eq!(*r, round);
            assert_eq!(*block_hash, Hash::digest(b"block"));
            assert_eq!(votes.len(), PEERS);
        }
        other => panic!("expected commit, got {other:?}"),
    }
    assert!(actions
        .iter()
        .any(|a| matches!(a, Action::CancelTimer { id: TimerId::VoteDelay })));
}

#[test]
fn supermajority_from_incremental_votes_commits_once() {
    let (mut yac, kps, order) = fixture();
    let round = Round::new(1, 0);
    yac.vote(yac_hash(round), order);

    // Own vote counts; two more reach the 3-of-4 threshold.
    let a1 = yac.on_state(vec![VoteMessage::sign(yac_hash(round), &kps[1])]);
    assert!(outcomes(&a1).is_empty());
    let a2 = yac.on_state(vec![VoteMessage::sign(yac_hash(round), &kps[2])]);
    assert_eq!(outcomes(&a2).len(), 1);

    // Further state for the decided round is dropped silently.
    let a3 = yac.on_state(vec![VoteMessage::sign(yac_hash(round), &kps[3])]);
    assert!(a3.is_empty());
}

#[test]
fn split_round_rejects() {
    let (mut yac, kps, order) = fixture();
    let round = Round::new(1, 0);

    // Do not vote ourselves; feed a 2/1/1 split from all four peers.
    yac.vote(
        YacHash::new(round, Hash::digest(b"p"), Hash::digest(b"mine")),
        order,
    );
    let hash_a = YacHash::new(round, Hash::digest(b"p"), Hash::digest(b"a"));
    let hash_b = YacHash::new(round, Hash::digest(b"p"), Hash::digest(b"b"));

    yac.on_state(vec![VoteMessage::sign(hash_a, &kps[1])]);
    yac.on_state(vec![VoteMessage::sign(hash_a, &kps[2])]);
    let actions = yac.on_state(vec![VoteMessage::sign(hash_b, &kps[3])]);

    // Best candidate has 2 of 4 votes and nobody is outstanding: reject.
    let emitted = outcomes(&actions);
    assert_eq!(emitted.len(), 1);
    assert!(matches!(emitted[0], ConsensusOutcome::Reject { round: r } if *r == round));
}

#[test]
fn future_round_vote_signals_synchronization_once() {
    let (mut yac, kps, order) = fixture();
    let round = Round::new(1, 0);
    yac.vote(yac_hash(round), order);

    let future = Round::new(2, 0);
    let vote = VoteMessage::sign(yac_hash(future), &kps[1]);
    let actions = yac.on_state(vec![vote]);
    let emitted = outcomes(&actions);
    assert_eq!(emitted.len(), 1);
    assert!(matches!(emitted[0], ConsensusOutcome::Future { round: r } if *r == future));

    // The second future vote for the same round stays quiet.
    let again = yac.on_state(vec![VoteMessage::sign(yac_hash(future), &kps[2])]);
    assert!(outcomes(&again).is_empty());
}

#[test]
fn laggard_gets_the_stored_commit_certificate() {
    let (mut yac, kps, order) = fixture();
    let round = Round::new(1, 0);
    yac.vote(yac_hash(round), order.clone());
    yac.on_state(
        kps.iter()
            .map(|kp| VoteMessage::sign(yac_hash(round), kp))
            .collect(),
    );

    // Move on to the next round.
    let next = Round::new(2, 0);
    yac.vote(
        YacHash::new(next, Hash::digest(b"p2"), Hash::digest(b"b2")),
        order,
    );

    // A peer still voting in round 1 receives the commit certificate.
    let actions = yac.on_state(vec![VoteMessage::sign(yac_hash(round), &kps[3])]);
    assert_eq!(sends(&actions), 1);
    match &actions[0] {
        Action::Send { to, message } => {
            assert_eq!(*to, kps[3].public_key().to_hex());
            match message {
                OutboundMessage::VoteState(state) => assert_eq!(state.votes.len(), PEERS),
                other => panic!("expected vote state, got {other:?}"),
            }
        }
        other => panic!("expected send, got {other:?}"),
    }
}

#[test]
fn invalid_signatures_are_dropped() {
    let (mut yac, kps, order) = fixture();
    let round = Round::new(1, 0);
    yac.vote(yac_hash(round), order);

    let mut forged = VoteMessage::sign(yac_hash(round), &kps[1]);
    forged.hash.block_hash = Hash::digest(b"other");
    let actions = yac.on_state(vec![forged]);
    assert!(actions.is_empty());
}

#[test]
fn votes_from_unknown_peers_are_ignored() {
    let (mut yac, _kps, order) = fixture();
    let round = Round::new(1, 0);
    yac.vote(yac_hash(round), order);

    let outsider = test_keypair(99);
    let a1 = yac.on_state(vec![VoteMessage::sign(yac_hash(round), &outsider)]);
    assert!(outcomes(&a1).is_empty());
}

#[test]
fn vote_timer_rebroadcasts_until_decided() {
    let (mut yac, kps, order) = fixture();
    let round = Round::new(1, 0);
    yac.vote(yac_hash(round), order);

    let actions = yac.on_vote_timer();
    assert_eq!(sends(&actions), PEERS);
    assert!(actions
        .iter()
        .any(|a| matches!(a, Action::SetTimer { id: TimerId::VoteDelay, .. })));

    // After the round decides, the timer is a no-op.
    yac.on_state(
        kps.iter()
            .map(|kp| VoteMessage::sign(yac_hash(round), kp))
            .collect(),
    );
    assert!(yac.on_vote_timer().is_empty());
}

#[test]
fn peer_orderer_is_shared_across_nodes() {
    let kps = keypairs();
    let peer_list = peers(&kps);
    let hash = yac_hash(Round::new(3, 0));
    let a = PeerOrderer::get_ordering(&hash, &peer_list).unwrap();
    let b = PeerOrderer::get_ordering(&hash, &peer_list).unwrap();
    assert_eq!(a.peers(), b.peers());
}
