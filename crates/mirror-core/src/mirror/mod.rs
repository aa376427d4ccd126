//! The backup mirror: bootstrap copy and incremental sync

mod init;
mod sync;

pub use init::{InitSummary, MirrorRoots, init_mirror};
pub use sync::{MirrorSync, SyncOutcome};
