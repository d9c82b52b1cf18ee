//! Background worker (C8, §4.8): the single process that sweeps the
//! session-summary queue and refreshes stale profiles on a 30-second tick.
//!
//! This replaces an unrelated cron/SQLite job scheduler that lived in this
//! crate previously — there is no general-purpose job table in this
//! service, only the two fixed housekeeping phases the spec names.

pub mod handle;
pub mod worker;

pub use handle::WorkerHandle;
pub use worker::{BackgroundWorker, TICK_INTERVAL_SECS};
