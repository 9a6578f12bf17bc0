//! SealVote Storage - Append-only commit log with replay.
//!
//! Every committed transaction is one JSON line. Reopening the log replays
//! the records in commit order.

pub mod commit_log;
pub mod error;

pub use commit_log::CommitLog;
pub use error::StorageError;
