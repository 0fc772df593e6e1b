//! Check wrappers that sit between storage call sites and disk I/O.
//!
//! [`IoCheck`] binds one category channel to the fatality policy of its
//! execution context. Both calling conventions funnel failures through the
//! same [`IoCheck::translate`] step, so a given OS error yields the same
//! [`StorageIoError`] whether it surfaced synchronously or from a future.

use crate::fatality::FatalityPolicy;
use crate::signal::{DiskErrorCategory, DiskErrorSignal};
use crate::util::error::{IoCheckError, OsError, StorageIoError};
use log::{debug, error};
use std::error::Error as StdError;
use std::future::Future;
use std::io;

/// Errors that can report whether they are OS-level failures.
///
/// Returning `None` marks the error as a non-system failure: it is never
/// classified and always passes through the wrappers untouched.
pub trait SystemFailure {
    fn os_error(&self) -> Option<OsError>;
}

impl SystemFailure for io::Error {
    fn os_error(&self) -> Option<OsError> {
        OsError::from_io(self)
    }
}

impl SystemFailure for Box<dyn StdError + Send + Sync> {
    fn os_error(&self) -> Option<OsError> {
        self.downcast_ref::<io::Error>().and_then(OsError::from_io)
    }
}

// Already classified once; outer wrappers must not classify again.
impl SystemFailure for StorageIoError {
    fn os_error(&self) -> Option<OsError> {
        None
    }
}

impl<E> SystemFailure for IoCheckError<E> {
    fn os_error(&self) -> Option<OsError> {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IoCheck<'a> {
    signal: &'a DiskErrorSignal,
    policy: &'a FatalityPolicy,
}

impl<'a> IoCheck<'a> {
    pub fn new(signal: &'a DiskErrorSignal, policy: &'a FatalityPolicy) -> Self {
        Self { signal, policy }
    }

    pub fn category(&self) -> DiskErrorCategory {
        self.signal.category()
    }

    pub fn signal(&self) -> &'a DiskErrorSignal {
        self.signal
    }

    /// Runs `op` and classifies its failure, if any.
    pub fn check<F, T, E>(&self, op: F) -> Result<T, IoCheckError<E>>
    where
        F: FnOnce() -> Result<T, E>,
        E: SystemFailure,
    {
        op().map_err(|err| self.translate(err))
    }

    /// Obtains a future from `op` and classifies the failure it completes with.
    ///
    /// Dropping the returned future before it completes fires nothing.
    pub fn check_async<F, Fut, T, E>(
        &self,
        op: F,
    ) -> impl Future<Output = Result<T, IoCheckError<E>>> + 'a
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + 'a,
        T: 'a,
        E: SystemFailure + 'a,
    {
        let check = *self;
        let pending = op();
        async move { pending.await.map_err(|err| check.translate(err)) }
    }

    /// Like [`check_async`](Self::check_async) for operations that can fail
    /// before any asynchronous work starts. A setup failure is classified
    /// immediately, exactly as [`check`](Self::check) would.
    pub fn try_check_async<F, Fut, T, E>(
        &self,
        op: F,
    ) -> Result<impl Future<Output = Result<T, IoCheckError<E>>> + 'a, IoCheckError<E>>
    where
        F: FnOnce() -> Result<Fut, E>,
        Fut: Future<Output = Result<T, E>> + 'a,
        T: 'a,
        E: SystemFailure + 'a,
    {
        let pending = self.check(op)?;
        Ok(self.check_async(move || pending))
    }

    /// Runs a blocking closure on the runtime's blocking pool and classifies
    /// the result back on the calling context.
    ///
    /// A join failure (panic or runtime shutdown) is not a disk error and
    /// never fires the channel.
    #[cfg(feature = "tokio-io")]
    pub async fn check_blocking<F, T, E>(&self, op: F) -> Result<T, BlockingCheckError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: SystemFailure + Send + 'static,
    {
        let outcome = tokio::task::spawn_blocking(op).await?;
        outcome.map_err(|err| BlockingCheckError::Check(self.translate(err)))
    }

    /// Classifies `err`, firing the channel and translating it when fatal.
    pub fn translate<E>(&self, err: E) -> IoCheckError<E>
    where
        E: SystemFailure,
    {
        let Some(os_error) = err.os_error() else {
            return IoCheckError::Passthrough(err);
        };
        let category = self.signal.category();
        if self.policy.is_fatal(&os_error) {
            error!(
                "event=disk_io_fatal category={} code={} error={}",
                category,
                os_error.code(),
                os_error
            );
            self.signal.fire();
            return IoCheckError::Storage(StorageIoError::new(category, os_error));
        }
        debug!(
            "event=disk_io_passthrough category={} code={}",
            category,
            os_error.code()
        );
        IoCheckError::Passthrough(err)
    }
}

#[cfg(feature = "tokio-io")]
#[derive(Debug, thiserror::Error)]
pub enum BlockingCheckError<E> {
    #[error(transparent)]
    Check(IoCheckError<E>),
    #[error("blocking disk task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(feature = "tokio-io")]
impl<E> BlockingCheckError<E> {
    pub fn storage_error(&self) -> Option<&StorageIoError> {
        match self {
            BlockingCheckError::Check(err) => err.storage_error(),
            BlockingCheckError::Join(_) => None,
        }
    }
}
