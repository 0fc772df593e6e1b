//! Disk I/O error interception for storage engines.
//!
//! Storage call sites wrap each disk operation in a category-specific check
//! (commit log, sstable read, sstable write, general). OS errors that are
//! fatal to the storage subsystem fire that category's channel and surface as
//! a [`StorageIoError`]; every other failure is returned unchanged.

pub mod channels;
pub mod check;
pub mod config;
pub mod fatality;
pub mod isolation;
pub mod signal;
pub mod storage;
pub mod util;

pub use channels::{DiskErrorChannels, DiskErrorCounters};
#[cfg(feature = "tokio-io")]
pub use check::BlockingCheckError;
pub use check::{IoCheck, SystemFailure};
pub use config::{DiskErrorConfig, DiskErrorConfigStore};
pub use fatality::{is_fatal_code, should_stop_on_system_error, FatalityPolicy};
pub use isolation::IsolationLatch;
pub use signal::{DiskErrorCategory, DiskErrorSignal, ScopedSubscription, SubscriptionId};
pub use util::error::{
    CheckedIoResult, DiskErrorConfigError, IoCheckError, OsError, StorageIoError,
};
