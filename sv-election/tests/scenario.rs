//! End-to-end pipeline scenarios driven purely through the public
//! election surface, including offline replay of the exported board log.

use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use sv_crypto::{Modulus, Validity};
use sv_election::{
    BallotStyle, CastVote, Choice, Election, ProofTranscript, Race, RaceId, RejectReason, Verdict,
    VoterId, TAG_PROOF_COMMITMENTS, TAG_PROOF_TRANSCRIPT, TAG_TALLY_RESULT,
};
use sv_sbb::BulletinBoard;

fn tiny_ballot_style() -> BallotStyle {
    BallotStyle::new(vec![Race::new(
        RaceId::from("president"),
        vec!["A".to_string(), "B".to_string(), "C".to_string()],
        None,
        Modulus::new(5).unwrap(),
    )
    .unwrap()])
    .unwrap()
}

fn cast_aba(election: &Election) -> Vec<CastVote> {
    let race = election
        .ballot_style()
        .race(&RaceId::from("president"))
        .unwrap();
    ["A", "B", "A"]
        .iter()
        .enumerate()
        .map(|(i, label)| {
            CastVote::for_choice(
                race,
                VoterId::new(format!("voter:{}", i)),
                &Choice::Candidate(label.to_string()),
            )
            .unwrap()
        })
        .collect()
}

#[test]
fn honest_election_accepts_under_full_challenge() {
    let mut rng = ChaCha20Rng::seed_from_u64(100);
    let mut election = Election::new("sim-2026", tiny_ballot_style(), 2).unwrap();
    let race = RaceId::from("president");

    election.post_votes(&mut rng, &cast_aba(&election)).unwrap();
    election.run_tally(&race).unwrap();

    let result = election.tally_result(&race).unwrap();
    assert_eq!(result.counts["A"], 2);
    assert_eq!(result.counts["B"], 1);
    assert_eq!(result.counts["C"], 0);

    election.run_proof(&mut rng, &race).unwrap();
    let (_, verdict) = election.run_verification(&mut rng, &race, 3).unwrap();
    assert_eq!(verdict, Verdict::Accept);

    let transcript = election.latest_transcript(&race).unwrap();
    assert_eq!(transcript.challenged.len(), 3);
    // three commitments per vote: both shares and their sum
    for challenged in &transcript.challenged {
        assert_eq!(
            challenged.commitments.share_u.verify(&challenged.opening.share_u),
            Validity::Valid
        );
        assert_eq!(
            challenged.commitments.share_v.verify(&challenged.opening.share_v),
            Validity::Valid
        );
        assert_eq!(
            challenged.commitments.sum.verify(&challenged.opening.sum),
            Validity::Valid
        );
    }

    election.close().unwrap();
    assert!(election.sbb().verify_chain().is_ok());
}

#[test]
fn flipped_share_is_rejected() {
    let mut rng = ChaCha20Rng::seed_from_u64(101);
    let mut election = Election::new("sim-2026", tiny_ballot_style(), 2).unwrap();
    let race = RaceId::from("president");

    election.post_votes(&mut rng, &cast_aba(&election)).unwrap();
    election.run_tally(&race).unwrap();
    election.run_proof(&mut rng, &race).unwrap();

    // adversary flips one stored share after the commitments went up
    let victim = election.records(&race)[1].vote_record_id.clone();
    election.tamper_share(&victim, 1).unwrap();
    election.run_tally(&race).unwrap();

    let (_, verdict) = election.run_verification(&mut rng, &race, 3).unwrap();
    match verdict {
        Verdict::Reject(RejectReason::InconsistentOpening { vote_record_id, .. }) => {
            assert_eq!(vote_record_id, victim);
        }
        other => panic!("expected Reject(InconsistentOpening), got {:?}", other),
    }
}

#[test]
fn tally_recomputation_is_idempotent() {
    let mut rng = ChaCha20Rng::seed_from_u64(102);
    let mut election = Election::new("sim-2026", tiny_ballot_style(), 3).unwrap();
    let race = RaceId::from("president");

    election.post_votes(&mut rng, &cast_aba(&election)).unwrap();
    election.run_tally(&race).unwrap();
    let first = election.tally_result(&race).unwrap().clone();
    election.run_tally(&race).unwrap();
    let second = election.tally_result(&race).unwrap().clone();
    assert_eq!(first, second);
}

#[test]
fn exported_log_replays_and_audits_standalone() {
    let mut rng = ChaCha20Rng::seed_from_u64(103);
    let mut election = Election::new("sim-2026", tiny_ballot_style(), 2).unwrap();
    let race = RaceId::from("president");

    election.post_votes(&mut rng, &cast_aba(&election)).unwrap();
    election.run_tally(&race).unwrap();
    election.run_proof(&mut rng, &race).unwrap();
    let (_, verdict) = election.run_verification(&mut rng, &race, 3).unwrap();
    assert_eq!(verdict, Verdict::Accept);
    election.close().unwrap();

    // an outside observer replays the saved log alone
    let board = BulletinBoard::from_log_str(&election.export_log()).unwrap();
    assert!(board.verify_chain().is_ok());
    assert!(board.find_latest(TAG_TALLY_RESULT).is_some());
    assert!(board.find_latest(TAG_PROOF_COMMITMENTS).is_some());

    let entry = board.find_latest(TAG_PROOF_TRANSCRIPT).unwrap();
    let transcript: ProofTranscript = serde_json::from_value(entry.payload.body.clone()).unwrap();
    assert_eq!(transcript.verdict, Verdict::Accept);

    // and recomputes every posted check from the transcript itself
    let modulus = Modulus::new(5).unwrap();
    for challenged in &transcript.challenged {
        assert!(challenged.passed);
        assert_eq!(
            challenged.commitments.share_u.verify(&challenged.opening.share_u),
            Validity::Valid
        );
        assert_eq!(
            challenged.commitments.share_v.verify(&challenged.opening.share_v),
            Validity::Valid
        );
        assert_eq!(
            challenged.commitments.sum.verify(&challenged.opening.sum),
            Validity::Valid
        );
        assert_eq!(
            modulus.add(
                challenged.opening.share_u.value,
                challenged.opening.share_v.value
            ),
            challenged.opening.sum.value
        );
    }
}

#[test]
fn verification_sessions_are_independent() {
    let mut rng = ChaCha20Rng::seed_from_u64(104);
    let mut election = Election::new("sim-2026", tiny_ballot_style(), 2).unwrap();
    let race = RaceId::from("president");

    election.post_votes(&mut rng, &cast_aba(&election)).unwrap();
    election.run_tally(&race).unwrap();
    election.run_proof(&mut rng, &race).unwrap();

    for seed in 0..4u64 {
        let mut session_rng = ChaCha20Rng::seed_from_u64(200 + seed);
        let (_, verdict) = election
            .run_verification(&mut session_rng, &race, 2)
            .unwrap();
        assert_eq!(verdict, Verdict::Accept);
    }
}

#[test]
fn multi_race_elections_keep_races_independent() {
    let style = BallotStyle::new(vec![
        Race::new(
            RaceId::from("president"),
            vec!["A".to_string(), "B".to_string()],
            None,
            Modulus::new(7).unwrap(),
        )
        .unwrap(),
        Race::new(
            RaceId::from("senate"),
            vec!["X".to_string(), "Y".to_string()],
            None,
            Modulus::new(11).unwrap(),
        )
        .unwrap(),
    ])
    .unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(105);
    let mut election = Election::new("sim-2026", style, 4).unwrap();
    let president = RaceId::from("president");
    let senate = RaceId::from("senate");

    let votes: Vec<CastVote> = vec![
        CastVote::new(VoterId::from("voter:0"), president.clone(), 0),
        CastVote::new(VoterId::from("voter:0"), senate.clone(), 1),
        CastVote::new(VoterId::from("voter:1"), president.clone(), 1),
        CastVote::new(VoterId::from("voter:1"), senate.clone(), 1),
    ];
    election.post_votes(&mut rng, &votes).unwrap();

    election.run_tally(&president).unwrap();
    election.run_proof(&mut rng, &president).unwrap();
    let (_, verdict) = election.run_verification(&mut rng, &president, 2).unwrap();
    assert_eq!(verdict, Verdict::Accept);

    // the senate race is still at the casting stage
    election.run_tally(&senate).unwrap();
    let senate_result = election.tally_result(&senate).unwrap();
    assert_eq!(senate_result.counts["Y"], 2);
    assert_eq!(senate_result.counts["X"], 0);
}
