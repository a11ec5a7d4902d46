use crate::error::ElectionError;
use crate::prover::RaceProver;
use crate::race::{BallotStyle, RaceId};
use crate::server::ServerArray;
use crate::tally::{RaceTally, TallyResult};
use crate::vote::{CastVote, CastVoteRecord, VoteRecordId};
use crate::verifier::{self, ProofTranscript, Verdict};
use log::info;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use sv_crypto::{split, Digest, DigestContext};
use sv_sbb::BulletinBoard;

pub const TAG_SETUP_RACES: &str = "setup:races";
pub const TAG_SETUP_FINISHED: &str = "setup:finished";
pub const TAG_CASTING_VOTES: &str = "casting:votes";
pub const TAG_CASTING_RECEIPTS: &str = "casting:receipts";
pub const TAG_TALLY_RESULT: &str = "tally:result";
pub const TAG_PROOF_COMMITMENTS: &str = "proof:commitments";
pub const TAG_PROOF_TRANSCRIPT: &str = "proof:transcript";

/// The bulletin-board sequence range a driver operation touched.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub first_seq: u64,
    pub last_seq: u64,
}

impl StageReport {
    fn single(seq: u64) -> Self {
        StageReport {
            first_seq: seq,
            last_seq: seq,
        }
    }
}

/// One simulated election: the board, the server array, and the per-race
/// pipeline state. Every stage posts to and reads from the board; the
/// strict order per race is cast → tally → prove → verify.
pub struct Election {
    ballot_style: BallotStyle,
    sbb: BulletinBoard,
    servers: ServerArray,
    records: BTreeMap<RaceId, Vec<CastVoteRecord>>,
    write_in_labels: BTreeMap<RaceId, BTreeMap<u64, String>>,
    tallies: BTreeMap<RaceId, RaceTally>,
    provers: BTreeMap<RaceId, RaceProver>,
}

impl Election {
    /// Open the board and post the finalized ballot style.
    pub fn new(
        election_id: &str,
        ballot_style: BallotStyle,
        n_servers: usize,
    ) -> Result<Self, ElectionError> {
        let servers = ServerArray::new(n_servers)?;
        let mut sbb = BulletinBoard::new(election_id);
        let race_dict: BTreeMap<String, serde_json::Value> = ballot_style
            .races()
            .map(|race| {
                (
                    race.id().to_string(),
                    json!({
                        "candidates": race.candidates(),
                        "race_modulus": race.modulus(),
                        "write_in": race.allows_write_in(),
                    }),
                )
            })
            .collect();
        sbb.post(TAG_SETUP_RACES, &json!({ "ballot_style": race_dict }))?;
        sbb.post(TAG_SETUP_FINISHED, &json!({}))?;
        info!(
            "election {}: setup posted, {} servers",
            election_id, n_servers
        );
        Ok(Election {
            ballot_style,
            sbb,
            servers,
            records: BTreeMap::new(),
            write_in_labels: BTreeMap::new(),
            tallies: BTreeMap::new(),
            provers: BTreeMap::new(),
        })
    }

    pub fn ballot_style(&self) -> &BallotStyle {
        &self.ballot_style
    }

    pub fn sbb(&self) -> &BulletinBoard {
        &self.sbb
    }

    /// The durable record: the board's JSON-lines log.
    pub fn export_log(&self) -> String {
        self.sbb.to_log_string()
    }

    pub fn records(&self, race_id: &RaceId) -> &[CastVoteRecord] {
        self.records.get(race_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tally_result(&self, race_id: &RaceId) -> Option<&TallyResult> {
        self.tallies.get(race_id).map(|t| &t.result)
    }

    /// Split a batch of validated cast votes into shares held by the
    /// server array, and post the cast-vote records and voter receipts.
    /// The whole batch is validated before any share is stored, so a bad
    /// vote is rejected without partial effect.
    pub fn post_votes<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        votes: &[CastVote],
    ) -> Result<StageReport, ElectionError> {
        for vote in votes {
            let race = self.ballot_style.race(&vote.race_id)?;
            race.modulus().check(vote.value)?;
            if self.tallies.contains_key(&vote.race_id) {
                return Err(ElectionError::StageOrder(format!(
                    "race {} was already tallied, no further votes accepted",
                    vote.race_id
                )));
            }
        }

        let mut posted = Vec::with_capacity(votes.len());
        for vote in votes {
            let race = self.ballot_style.race(&vote.race_id)?;
            let race_records = self.records.entry(vote.race_id.clone()).or_default();
            let position = race_records.len();
            let vote_record_id = VoteRecordId::at_position(race.id(), position);
            let (first_holder, second_holder) =
                self.servers
                    .assign(vote_record_id.clone(), vote.race_id.clone(), position);
            let shares = split(rng, vote.value, race.modulus())?;
            self.servers
                .receive_share(vote_record_id.clone(), first_holder, shares.u)?;
            self.servers
                .receive_share(vote_record_id.clone(), second_holder, shares.v)?;
            if let Some(label) = &vote.write_in_label {
                self.write_in_labels
                    .entry(vote.race_id.clone())
                    .or_default()
                    .entry(vote.value)
                    .or_insert_with(|| label.clone());
            }
            let record = CastVoteRecord {
                vote_record_id,
                voter_id: vote.voter_id.clone(),
                race_id: vote.race_id.clone(),
                first_holder,
                second_holder,
            };
            race_records.push(record.clone());
            posted.push(record);
        }

        let first_seq = self
            .sbb
            .post(TAG_CASTING_VOTES, &json!({ "cast_votes": posted }))?;
        let receipts: BTreeMap<String, String> = posted
            .iter()
            .map(|r| (r.vote_record_id.to_string(), receipt_digest(r).to_string()))
            .collect();
        let last_seq = self
            .sbb
            .post(TAG_CASTING_RECEIPTS, &json!({ "receipts": receipts }))?;
        info!("posted {} cast votes", posted.len());
        Ok(StageReport {
            first_seq,
            last_seq,
        })
    }

    /// Reconstruct and count one race from its shares, and post the
    /// result as a single atomic entry. Recomputing from unchanged shares
    /// posts an identical result.
    pub fn run_tally(&mut self, race_id: &RaceId) -> Result<StageReport, ElectionError> {
        let race = self.ballot_style.race(race_id)?;
        let records = self.records.get(race_id).ok_or_else(|| {
            ElectionError::StageOrder(format!("no cast votes posted for race {}", race_id))
        })?;
        let labels = self.write_in_labels.get(race_id);
        static EMPTY: BTreeMap<u64, String> = BTreeMap::new();
        let tally = RaceTally::compute(race, records, labels.unwrap_or(&EMPTY), &self.servers)?;
        let seq = self.sbb.post(TAG_TALLY_RESULT, &tally.result)?;
        info!(
            "race {}: tally posted over {} votes",
            race_id,
            tally.n_votes()
        );
        self.tallies.insert(race_id.clone(), tally);
        Ok(StageReport::single(seq))
    }

    /// Commit to every cast vote of a tallied race and post the
    /// commitments, keyed by vote-record id.
    pub fn run_proof<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        race_id: &RaceId,
    ) -> Result<StageReport, ElectionError> {
        if !self.tallies.contains_key(race_id) {
            return Err(ElectionError::StageOrder(format!(
                "race {} has no posted tally to prove against",
                race_id
            )));
        }
        let race = self.ballot_style.race(race_id)?;
        let records = &self.records[race_id];
        let prover = RaceProver::commit_race(rng, race, records, &self.servers)?;
        let commitments: Vec<_> = prover.commitments().collect();
        let seq = self.sbb.post(
            TAG_PROOF_COMMITMENTS,
            &json!({ "race_id": race_id, "commitments": commitments }),
        )?;
        info!(
            "race {}: posted {} vote commitments",
            race_id,
            prover.n_votes()
        );
        self.provers.insert(race_id.clone(), prover);
        Ok(StageReport::single(seq))
    }

    /// Run a challenge session against the posted commitments and post
    /// the full transcript. Repeatable: each run draws a fresh challenge
    /// from the injected source and appends its own transcript.
    pub fn run_verification<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        race_id: &RaceId,
        challenge_size: usize,
    ) -> Result<(StageReport, Verdict), ElectionError> {
        let prover = self.provers.get(race_id).ok_or_else(|| {
            ElectionError::StageOrder(format!(
                "race {} has no posted commitments to challenge",
                race_id
            ))
        })?;
        let tally = &self.tallies[race_id];
        let race = self.ballot_style.race(race_id)?;
        let records = &self.records[race_id];
        let transcript = verifier::verify_race(rng, race, records, prover, tally, challenge_size)?;
        let verdict = transcript.verdict.clone();
        let seq = self.sbb.post(TAG_PROOF_TRANSCRIPT, &transcript)?;
        info!(
            "race {}: verification verdict {:?} over challenge of {}",
            race_id, verdict, challenge_size
        );
        Ok((StageReport::single(seq), verdict))
    }

    /// The transcript of the latest verification run for a race, read
    /// back from the board.
    pub fn latest_transcript(&self, race_id: &RaceId) -> Option<ProofTranscript> {
        self.sbb
            .iter()
            .rev()
            .filter(|e| e.payload.tag == TAG_PROOF_TRANSCRIPT)
            .filter_map(|e| serde_json::from_value::<ProofTranscript>(e.payload.body.clone()).ok())
            .find(|t| &t.race_id == race_id)
    }

    /// Seal the board; no stage can post afterwards.
    pub fn close(&mut self) -> Result<StageReport, ElectionError> {
        let seq = self.sbb.close()?;
        info!("election {}: board sealed", self.sbb.election_id());
        Ok(StageReport::single(seq))
    }

    /// Simulation-only adversarial hook: add `delta` to the first-holder
    /// share of one record, as a tampering scenario for the audit to
    /// catch.
    pub fn tamper_share(
        &mut self,
        vote_record_id: &VoteRecordId,
        delta: u64,
    ) -> Result<(), ElectionError> {
        let race_id = self
            .records
            .iter()
            .find(|(_, records)| {
                records.iter().any(|r| &r.vote_record_id == vote_record_id)
            })
            .map(|(race_id, _)| race_id.clone())
            .ok_or_else(|| ElectionError::UnknownVoteRecord(vote_record_id.clone()))?;
        let modulus = self.ballot_style.race(&race_id)?.modulus();
        let (first, _) = self.servers.holders(vote_record_id)?;
        let (u, _) = self.servers.shares_of(vote_record_id)?;
        self.servers
            .tamper_share(vote_record_id, first, modulus.add(u, delta))
    }
}

fn receipt_digest(record: &CastVoteRecord) -> Digest {
    let mut ctx = DigestContext::new();
    ctx.append(record.vote_record_id.as_str().as_bytes());
    ctx.append(record.voter_id.to_string().as_bytes());
    ctx.append(record.race_id.as_str().as_bytes());
    ctx.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::{Choice, Race, WriteInRule};
    use crate::vote::VoterId;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;
    use sv_crypto::Modulus;

    fn ballot_style() -> BallotStyle {
        BallotStyle::new(vec![Race::new(
            RaceId::from("mayor"),
            vec!["Jones".to_string(), "Smith".to_string()],
            Some(WriteInRule { max_len: 8 }),
            Modulus::new(1009).unwrap(),
        )
        .unwrap()])
        .unwrap()
    }

    fn cast(election: &Election, labels: &[&str]) -> Vec<CastVote> {
        let race = election
            .ballot_style()
            .race(&RaceId::from("mayor"))
            .unwrap();
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| {
                CastVote::for_choice(
                    race,
                    VoterId::new(format!("voter:{}", i)),
                    &Choice::Candidate(l.to_string()),
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn stages_must_run_in_order() {
        let mut election = Election::new("e1", ballot_style(), 2).unwrap();
        let race = RaceId::from("mayor");
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert!(matches!(
            election.run_tally(&race),
            Err(ElectionError::StageOrder(_))
        ));
        assert!(matches!(
            election.run_proof(&mut rng, &race),
            Err(ElectionError::StageOrder(_))
        ));
        assert!(matches!(
            election.run_verification(&mut rng, &race, 1),
            Err(ElectionError::StageOrder(_))
        ));
    }

    #[test]
    fn out_of_range_vote_is_rejected_without_partial_effect() {
        let mut election = Election::new("e2", ballot_style(), 2).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let race = RaceId::from("mayor");
        let mut votes = cast(&election, &["Jones"]);
        votes.push(CastVote::new(VoterId::from("voter:9"), race.clone(), 9999));
        let before = election.sbb().len();
        assert!(election.post_votes(&mut rng, &votes).is_err());
        assert_eq!(election.sbb().len(), before);
        assert!(election.records(&race).is_empty());
    }

    #[test]
    fn unknown_race_vote_is_rejected() {
        let mut election = Election::new("e3", ballot_style(), 2).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let vote = CastVote::new(VoterId::from("voter:0"), RaceId::from("senate"), 0);
        assert!(matches!(
            election.post_votes(&mut rng, &[vote]),
            Err(ElectionError::UnknownRace(_))
        ));
    }

    #[test]
    fn votes_after_tally_are_rejected() {
        let mut election = Election::new("e4", ballot_style(), 2).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let race = RaceId::from("mayor");
        let votes = cast(&election, &["Jones", "Smith"]);
        election.post_votes(&mut rng, &votes).unwrap();
        election.run_tally(&race).unwrap();
        let late = cast(&election, &["Jones"]);
        assert!(matches!(
            election.post_votes(&mut rng, &late),
            Err(ElectionError::StageOrder(_))
        ));
    }

    #[test]
    fn report_covers_posted_range() {
        let mut election = Election::new("e5", ballot_style(), 2).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let votes = cast(&election, &["Jones"]);
        let report = election.post_votes(&mut rng, &votes).unwrap();
        assert_eq!(report.last_seq, report.first_seq + 1);
        let entry = election.sbb().entry(report.first_seq).unwrap();
        assert_eq!(entry.payload.tag, TAG_CASTING_VOTES);
        let entry = election.sbb().entry(report.last_seq).unwrap();
        assert_eq!(entry.payload.tag, TAG_CASTING_RECEIPTS);
    }

    #[test]
    fn closed_election_blocks_every_stage() {
        let mut election = Election::new("e6", ballot_style(), 2).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let votes = cast(&election, &["Jones"]);
        election.post_votes(&mut rng, &votes).unwrap();
        election.close().unwrap();
        assert!(matches!(
            election.run_tally(&RaceId::from("mayor")),
            Err(ElectionError::Sbb(sv_sbb::SbbError::Closed))
        ));
    }

    #[test]
    fn write_in_votes_are_tallied_under_their_label() {
        let mut election = Election::new("e7", ballot_style(), 3).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let race_id = RaceId::from("mayor");
        let race = election.ballot_style().race(&race_id).unwrap().clone();
        let votes = vec![
            CastVote::for_choice(
                &race,
                VoterId::from("voter:0"),
                &Choice::WriteIn("Doe".to_string()),
            )
            .unwrap(),
            CastVote::for_choice(
                &race,
                VoterId::from("voter:1"),
                &Choice::Candidate("Jones".to_string()),
            )
            .unwrap(),
        ];
        election.post_votes(&mut rng, &votes).unwrap();
        election.run_tally(&race_id).unwrap();
        let result = election.tally_result(&race_id).unwrap();
        assert_eq!(result.counts["writein:Doe"], 1);
        assert_eq!(result.counts["Jones"], 1);
        assert_eq!(result.counts["Smith"], 0);
    }
}
