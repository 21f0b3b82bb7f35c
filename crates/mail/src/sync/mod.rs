//! Sync engine for fetching and storing mail
//!
//! Provides idempotent sync operations that can be safely retried.

mod engine;

pub use engine::{
    full_sync, incremental_sync, sync, ProgressFn, SyncOptions, SyncReport,
    INCREMENTAL_PROGRESS_LABEL,
};
