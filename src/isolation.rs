use crate::channels::DiskErrorChannels;
use crate::signal::{DiskErrorCategory, SubscriptionId};
use log::{info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide flag tripped by the first fatal disk error in any context.
///
/// Each execution context attaches the latch to its own channels; the latch
/// itself is the only state shared between contexts.
#[derive(Debug, Clone, Default)]
pub struct IsolationLatch {
    inner: Arc<LatchState>,
}

#[derive(Debug, Default)]
struct LatchState {
    tripped: AtomicBool,
    first: Mutex<Option<DiskErrorCategory>>,
    events: AtomicU64,
}

impl IsolationLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes the latch to all four channels of `channels`.
    pub fn attach(&self, channels: &DiskErrorChannels) -> Vec<SubscriptionId> {
        DiskErrorCategory::ALL
            .iter()
            .map(|&category| {
                let latch = self.clone();
                channels
                    .signal(category)
                    .subscribe(move || latch.trip(category))
            })
            .collect()
    }

    pub fn trip(&self, category: DiskErrorCategory) {
        self.inner.events.fetch_add(1, Ordering::Relaxed);
        let mut first = self.inner.first.lock();
        if first.is_some() {
            return;
        }
        *first = Some(category);
        self.inner.tripped.store(true, Ordering::Release);
        warn!(
            "event=disk_isolation_tripped category={} action=stop_storage",
            category
        );
    }

    pub fn is_tripped(&self) -> bool {
        self.inner.tripped.load(Ordering::Acquire)
    }

    pub fn tripped_by(&self) -> Option<DiskErrorCategory> {
        *self.inner.first.lock()
    }

    /// Fatal events observed, including those after the latch tripped.
    pub fn event_count(&self) -> u64 {
        self.inner.events.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        let mut first = self.inner.first.lock();
        if let Some(previous) = first.take() {
            info!("event=disk_isolation_reset previous_category={}", previous);
        }
        self.inner.tripped.store(false, Ordering::Release);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn first_category_wins() {
        let latch = IsolationLatch::new();
        let channels = DiskErrorChannels::new();
        let ids = latch.attach(&channels);
        assert_eq!(ids.len(), 4);
        assert!(!latch.is_tripped());

        channels.sstable_read_error().fire();
        channels.commit_error().fire();
        assert!(latch.is_tripped());
        assert_eq!(latch.tripped_by(), Some(DiskErrorCategory::SstableRead));
        assert_eq!(latch.event_count(), 2);
    }

    #[test]
    fn shared_across_threads() {
        let latch = IsolationLatch::new();
        let worker_latch = latch.clone();
        std::thread::spawn(move || {
            let channels = DiskErrorChannels::new();
            worker_latch.attach(&channels);
            let _ = channels
                .commit_io_check()
                .check(|| Err::<(), _>(io::Error::from_raw_os_error(28)));
        })
        .join()
        .unwrap();
        assert!(latch.is_tripped());
        assert_eq!(latch.tripped_by(), Some(DiskErrorCategory::Commit));
    }

    #[test]
    fn reset_clears_trip_but_keeps_event_count() {
        let latch = IsolationLatch::new();
        latch.trip(DiskErrorCategory::General);
        latch.reset();
        assert!(!latch.is_tripped());
        assert_eq!(latch.tripped_by(), None);
        assert_eq!(latch.event_count(), 1);
    }
}
