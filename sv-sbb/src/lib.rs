//! The secure bulletin board (SBB): a public, append-only, hash-chained
//! ledger. Every stage of the split-value protocol coordinates through
//! entries posted here, never by direct calls, so a saved log is enough to
//! replay and audit an election.

mod board;
mod entry;
mod error;

pub use crate::{
    board::{BulletinBoard, TAG_ELECTION_DONE, TAG_SETUP_START},
    entry::{Entry, Payload},
    error::SbbError,
};
