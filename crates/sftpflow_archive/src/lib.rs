//! Moves every object named in an upload notification batch from the staging
//! bucket into the archive bucket.

pub mod error;
pub mod mover;
pub mod plan;

pub use error::{ArchiveError, MoveFailure, MoveStage};
pub use mover::{summarize, ArchiveMover, ArchiveReceipt, Disposition, MoveOutcome, DEFAULT_CONCURRENCY};
pub use plan::{plan_moves, MoveTask};
