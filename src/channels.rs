use crate::check::IoCheck;
use crate::config::DiskErrorConfig;
use crate::fatality::FatalityPolicy;
use crate::isolation::IsolationLatch;
use crate::signal::{DiskErrorCategory, DiskErrorSignal};
use serde::Serialize;

/// The four disk error channels owned by one execution context.
///
/// Each worker constructs its own instance at startup and hands references to
/// its storage call sites; subscriptions never cross instances.
#[derive(Debug)]
pub struct DiskErrorChannels {
    commit: DiskErrorSignal,
    sstable_read: DiskErrorSignal,
    sstable_write: DiskErrorSignal,
    general: DiskErrorSignal,
    policy: FatalityPolicy,
}

impl Default for DiskErrorChannels {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskErrorChannels {
    pub fn new() -> Self {
        Self::with_policy(FatalityPolicy::default())
    }

    pub fn with_policy(policy: FatalityPolicy) -> Self {
        Self {
            commit: DiskErrorSignal::new(DiskErrorCategory::Commit),
            sstable_read: DiskErrorSignal::new(DiskErrorCategory::SstableRead),
            sstable_write: DiskErrorSignal::new(DiskErrorCategory::SstableWrite),
            general: DiskErrorSignal::new(DiskErrorCategory::General),
            policy,
        }
    }

    pub fn from_config(config: &DiskErrorConfig) -> Self {
        Self::with_policy(FatalityPolicy::from_config(config))
    }

    /// Builds the channels and, unless disabled in `config`, connects every
    /// category to the shared isolation latch.
    pub fn with_isolation(config: &DiskErrorConfig, latch: &IsolationLatch) -> Self {
        let channels = Self::from_config(config);
        if config.isolate_on_fatal {
            latch.attach(&channels);
        }
        channels
    }

    pub fn policy(&self) -> &FatalityPolicy {
        &self.policy
    }

    pub fn signal(&self, category: DiskErrorCategory) -> &DiskErrorSignal {
        match category {
            DiskErrorCategory::Commit => &self.commit,
            DiskErrorCategory::SstableRead => &self.sstable_read,
            DiskErrorCategory::SstableWrite => &self.sstable_write,
            DiskErrorCategory::General => &self.general,
        }
    }

    pub fn commit_error(&self) -> &DiskErrorSignal {
        &self.commit
    }

    pub fn sstable_read_error(&self) -> &DiskErrorSignal {
        &self.sstable_read
    }

    pub fn sstable_write_error(&self) -> &DiskErrorSignal {
        &self.sstable_write
    }

    pub fn general_disk_error(&self) -> &DiskErrorSignal {
        &self.general
    }

    pub fn check_for(&self, category: DiskErrorCategory) -> IoCheck<'_> {
        IoCheck::new(self.signal(category), &self.policy)
    }

    pub fn commit_io_check(&self) -> IoCheck<'_> {
        self.check_for(DiskErrorCategory::Commit)
    }

    pub fn sstable_read_io_check(&self) -> IoCheck<'_> {
        self.check_for(DiskErrorCategory::SstableRead)
    }

    pub fn sstable_write_io_check(&self) -> IoCheck<'_> {
        self.check_for(DiskErrorCategory::SstableWrite)
    }

    pub fn io_check(&self) -> IoCheck<'_> {
        self.check_for(DiskErrorCategory::General)
    }

    pub fn counters(&self) -> DiskErrorCounters {
        DiskErrorCounters {
            commit: self.commit.fire_count(),
            sstable_read: self.sstable_read.fire_count(),
            sstable_write: self.sstable_write.fire_count(),
            general: self.general.fire_count(),
        }
    }
}

/// Number of fatal events each channel has fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiskErrorCounters {
    pub commit: u64,
    pub sstable_read: u64,
    pub sstable_write: u64,
    pub general: u64,
}

impl DiskErrorCounters {
    pub fn get(&self, category: DiskErrorCategory) -> u64 {
        match category {
            DiskErrorCategory::Commit => self.commit,
            DiskErrorCategory::SstableRead => self.sstable_read,
            DiskErrorCategory::SstableWrite => self.sstable_write,
            DiskErrorCategory::General => self.general,
        }
    }

    pub fn total(&self) -> u64 {
        self.commit
            .saturating_add(self.sstable_read)
            .saturating_add(self.sstable_write)
            .saturating_add(self.general)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn entry_points_bind_their_own_channel() {
        let channels = DiskErrorChannels::new();
        assert_eq!(channels.commit_io_check().category(), DiskErrorCategory::Commit);
        assert_eq!(
            channels.sstable_read_io_check().category(),
            DiskErrorCategory::SstableRead
        );
        assert_eq!(
            channels.sstable_write_io_check().category(),
            DiskErrorCategory::SstableWrite
        );
        assert_eq!(channels.io_check().category(), DiskErrorCategory::General);
    }

    #[test]
    fn firing_one_channel_leaves_others_untouched() {
        let channels = DiskErrorChannels::new();
        let _ = channels
            .sstable_write_io_check()
            .check(|| Err::<(), _>(io::Error::from_raw_os_error(5)));
        let counters = channels.counters();
        assert_eq!(counters.sstable_write, 1);
        assert_eq!(counters.total(), 1);
        for category in DiskErrorCategory::ALL {
            let expected = u64::from(category == DiskErrorCategory::SstableWrite);
            assert_eq!(counters.get(category), expected);
        }
    }

    #[test]
    fn config_policy_is_used_by_checks() {
        let config = DiskErrorConfig {
            non_fatal_codes: vec![5],
            ..DiskErrorConfig::default()
        };
        let channels = DiskErrorChannels::from_config(&config);
        let err = channels
            .io_check()
            .check(|| Err::<(), _>(io::Error::from_raw_os_error(5)))
            .unwrap_err();
        assert!(!err.is_storage());
        assert_eq!(channels.counters().total(), 0);
    }

    #[test]
    fn isolation_can_be_disabled() {
        let latch = IsolationLatch::new();
        let config = DiskErrorConfig {
            isolate_on_fatal: false,
            ..DiskErrorConfig::default()
        };
        let channels = DiskErrorChannels::with_isolation(&config, &latch);
        for category in DiskErrorCategory::ALL {
            assert_eq!(channels.signal(category).subscriber_count(), 0);
        }
    }
}
