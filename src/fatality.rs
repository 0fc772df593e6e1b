//! Decides whether an OS-level failure is fatal to the storage subsystem.
//!
//! The fixed set covers conditions after which the node cannot keep writing
//! safely: out of space or quota, device I/O errors, read-only remounts, stale
//! handles, vanished devices and filesystem corruption. Anything else,
//! including codes we do not recognise, is non-fatal.

use crate::config::DiskErrorConfig;
use crate::util::error::OsError;
use std::collections::BTreeSet;

pub fn should_stop_on_system_error(err: &OsError) -> bool {
    is_fatal_code(err.code())
}

#[cfg(unix)]
pub fn is_fatal_code(code: i32) -> bool {
    match code {
        libc::ENOSPC | libc::EDQUOT | libc::EIO | libc::EROFS | libc::ESTALE | libc::ENXIO
        | libc::ENODEV => true,
        #[cfg(target_os = "linux")]
        libc::EUCLEAN => true,
        _ => false,
    }
}

#[cfg(not(unix))]
pub fn is_fatal_code(_code: i32) -> bool {
    false
}

/// Fatality decision consulted by every check wrapper.
///
/// The default policy is exactly [`should_stop_on_system_error`]. Operators
/// may escalate extra codes or demote codes from the fixed set; a demotion
/// wins over both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FatalityPolicy {
    extra_fatal: BTreeSet<i32>,
    non_fatal: BTreeSet<i32>,
}

impl FatalityPolicy {
    pub fn from_config(config: &DiskErrorConfig) -> Self {
        Self {
            extra_fatal: config.extra_fatal_codes.iter().copied().collect(),
            non_fatal: config.non_fatal_codes.iter().copied().collect(),
        }
    }

    pub fn escalate(mut self, code: i32) -> Self {
        self.extra_fatal.insert(code);
        self
    }

    pub fn demote(mut self, code: i32) -> Self {
        self.non_fatal.insert(code);
        self
    }

    pub fn is_fatal(&self, err: &OsError) -> bool {
        let code = err.code();
        if self.non_fatal.contains(&code) {
            return false;
        }
        self.extra_fatal.contains(&code) || should_stop_on_system_error(err)
    }

    pub fn is_default(&self) -> bool {
        self.extra_fatal.is_empty() && self.non_fatal.is_empty()
    }
}
