//! Run orchestration for romset: content identification, placement and
//! user settings around the selection engine in `romset-core`.

pub mod context;
pub mod error;
pub mod hasher;
pub mod identify;
pub mod placement;
pub mod settings;
pub mod worker_pool;

pub use context::{RunConfig, RunContext};
pub use error::{RunError, ScanIssue};
pub use hasher::{FileHashes, compute_hashes, hash_file};
pub use identify::{Binding, ChecksumIndex, FileIdentity, FileIdentityMap, RomRef, ScanOptions};
pub use placement::{Plan, PlaceMode, PlacementOptions, PlannedFile, RejectedFile};
pub use settings::Settings;
pub use worker_pool::WorkerPool;
