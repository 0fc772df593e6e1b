#![cfg(all(unix, feature = "tokio-io"))]

use diskguard::{BlockingCheckError, DiskErrorCategory, DiskErrorChannels, IoCheckError};
use std::cell::Cell;
use std::future::{pending, ready, Ready};
use std::io;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::yield_now;

fn hit_counter(channels: &DiskErrorChannels, category: DiskErrorCategory) -> Rc<Cell<u32>> {
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    channels
        .signal(category)
        .subscribe(move || counter.set(counter.get() + 1));
    hits
}

async fn deferred_write(result: io::Result<usize>) -> io::Result<usize> {
    yield_now().await;
    result
}

#[tokio::test]
async fn deferred_success_returns_value_without_events() {
    let channels = DiskErrorChannels::new();
    let hits = hit_counter(&channels, DiskErrorCategory::SstableWrite);
    let written = channels
        .sstable_write_io_check()
        .check_async(|| deferred_write(Ok(4096)))
        .await
        .unwrap();
    assert_eq!(written, 4096);
    assert_eq!(hits.get(), 0);
}

#[tokio::test]
async fn deferred_fatal_failure_fires_and_translates() {
    let channels = DiskErrorChannels::new();
    let hits = hit_counter(&channels, DiskErrorCategory::Commit);
    let err = channels
        .commit_io_check()
        .check_async(|| deferred_write(Err(io::Error::from_raw_os_error(libc::EIO))))
        .await
        .unwrap_err();
    assert_eq!(err.storage_error().map(|e| e.code()), Some(libc::EIO));
    assert_eq!(hits.get(), 1);
}

#[tokio::test]
async fn deferred_non_fatal_failure_keeps_original() {
    let channels = DiskErrorChannels::new();
    let hits = hit_counter(&channels, DiskErrorCategory::SstableRead);
    let err = channels
        .sstable_read_io_check()
        .check_async(|| deferred_write(Err(io::Error::from_raw_os_error(libc::EAGAIN))))
        .await
        .unwrap_err();
    let original = err.into_passthrough().expect("passthrough");
    assert_eq!(original.raw_os_error(), Some(libc::EAGAIN));
    assert_eq!(hits.get(), 0);
}

#[tokio::test]
async fn immediate_and_deferred_forms_agree() {
    for code in [libc::ENOSPC, libc::EROFS, libc::ESTALE, libc::EIO] {
        let channels = DiskErrorChannels::new();
        let check = channels.io_check();
        let immediate = check
            .check(|| Err::<usize, _>(io::Error::from_raw_os_error(code)))
            .unwrap_err();
        let deferred = check
            .check_async(|| deferred_write(Err(io::Error::from_raw_os_error(code))))
            .await
            .unwrap_err();
        let setup = match check.try_check_async(|| {
            Err::<Ready<io::Result<usize>>, _>(io::Error::from_raw_os_error(code))
        }) {
            Ok(_) => panic!("setup failure must surface immediately"),
            Err(err) => err,
        };
        let immediate = immediate.storage_error().expect("immediate translated");
        assert_eq!(deferred.storage_error(), Some(immediate));
        assert_eq!(setup.storage_error(), Some(immediate));
        assert_eq!(channels.general_disk_error().fire_count(), 3);
    }
}

#[tokio::test]
async fn setup_success_defers_to_completion() {
    let channels = DiskErrorChannels::new();
    let hits = hit_counter(&channels, DiskErrorCategory::Commit);
    let pending_write = channels
        .commit_io_check()
        .try_check_async(|| {
            Ok::<_, io::Error>(ready(Err::<(), _>(io::Error::from_raw_os_error(
                libc::ENOSPC,
            ))))
        })
        .expect("setup succeeded");
    assert_eq!(hits.get(), 0, "nothing fires before completion");
    let err = pending_write.await.unwrap_err();
    assert!(matches!(err, IoCheckError::Storage(_)));
    assert_eq!(hits.get(), 1);
}

#[tokio::test]
async fn abandoned_future_fires_nothing() {
    let channels = DiskErrorChannels::new();
    let hits = hit_counter(&channels, DiskErrorCategory::SstableWrite);
    let outcome = tokio::time::timeout(
        Duration::from_millis(10),
        channels
            .sstable_write_io_check()
            .check_async(pending::<io::Result<()>>),
    )
    .await;
    assert!(outcome.is_err(), "pending write timed out");
    assert_eq!(hits.get(), 0);
    assert_eq!(channels.counters().total(), 0);
}

#[tokio::test]
async fn blocking_offload_classifies_on_caller() {
    let channels = DiskErrorChannels::new();
    let hits = hit_counter(&channels, DiskErrorCategory::SstableWrite);
    let err = channels
        .sstable_write_io_check()
        .check_blocking(|| Err::<(), _>(io::Error::from_raw_os_error(libc::ENOSPC)))
        .await
        .unwrap_err();
    assert_eq!(err.storage_error().map(|e| e.code()), Some(libc::ENOSPC));
    assert_eq!(hits.get(), 1);

    let value = channels
        .sstable_write_io_check()
        .check_blocking(|| Ok::<_, io::Error>(7))
        .await
        .unwrap();
    assert_eq!(value, 7);
    assert_eq!(hits.get(), 1);
}

#[tokio::test]
async fn blocking_panic_is_not_a_disk_error() {
    let channels = DiskErrorChannels::new();
    let hits = hit_counter(&channels, DiskErrorCategory::General);
    let err = channels
        .io_check()
        .check_blocking(|| -> io::Result<()> { panic!("worker crashed") })
        .await
        .unwrap_err();
    assert!(matches!(err, BlockingCheckError::Join(_)));
    assert!(err.storage_error().is_none());
    assert_eq!(hits.get(), 0);
}
