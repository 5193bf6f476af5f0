//! Integration tests: dispatcher admission, cancellation, and shutdown.

#![cfg(unix)]

mod common;

use std::time::Duration;

use common::{download_slow, Harness, DOWNLOAD_MERGED, META_FAIL};
use mediafetch_core::dispatcher::{DispatchError, Dispatcher};
use mediafetch_core::handoff::{remove_job, Removal};
use mediafetch_core::job_db::JobStatus;

fn terminal(status: JobStatus) -> impl Fn(Option<&mediafetch_core::job_db::JobRecord>) -> bool {
    move |j| j.is_some_and(|j| j.status == status)
}

#[tokio::test]
async fn dispatched_jobs_complete_and_registry_drains() {
    let h = Harness::new(META_FAIL, DOWNLOAD_MERGED).await;
    let dispatcher = Dispatcher::new(h.orchestrator.clone(), 2);
    let ids = [
        h.add_video("alice").await,
        h.add_video("alice").await,
        h.add_video("bob").await,
    ];
    for id in ids {
        dispatcher.dispatch(id).unwrap();
    }

    tokio::time::timeout(Duration::from_secs(10), dispatcher.wait_idle())
        .await
        .unwrap();
    assert!(dispatcher.registry().is_empty());
    for id in ids {
        assert_eq!(h.job(id).await.status, JobStatus::Completed);
    }
}

#[tokio::test]
async fn duplicate_dispatch_is_rejected() {
    let h = Harness::new(META_FAIL, &download_slow(10)).await;
    let dispatcher = Dispatcher::new(h.orchestrator.clone(), 1);
    let id = h.add_video("alice").await;

    dispatcher.dispatch(id).unwrap();
    assert_eq!(dispatcher.dispatch(id), Err(DispatchError::AlreadyRunning(id)));
    dispatcher.wait_idle().await;
    assert_eq!(h.job(id).await.status, JobStatus::Completed);
}

#[tokio::test]
async fn one_slot_keeps_second_job_queued() {
    let h = Harness::new(META_FAIL, &download_slow(20)).await;
    let dispatcher = Dispatcher::new(h.orchestrator.clone(), 1);
    let first = h.add_video("alice").await;
    let second = h.add_video("alice").await;
    dispatcher.dispatch(first).unwrap();
    h.wait_for(first, terminal(JobStatus::Downloading)).await;
    dispatcher.dispatch(second).unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.job(first).await.status, JobStatus::Downloading);
    assert_eq!(h.job(second).await.status, JobStatus::Pending);

    dispatcher.wait_idle().await;
    assert_eq!(h.job(first).await.status, JobStatus::Completed);
    assert_eq!(h.job(second).await.status, JobStatus::Completed);
}

#[tokio::test]
async fn cancelling_queued_job_fails_it_without_running() {
    let h = Harness::new(META_FAIL, &download_slow(20)).await;
    let dispatcher = Dispatcher::new(h.orchestrator.clone(), 1);
    let first = h.add_video("alice").await;
    let queued = h.add_video("alice").await;
    dispatcher.dispatch(first).unwrap();
    h.wait_for(first, terminal(JobStatus::Downloading)).await;
    dispatcher.dispatch(queued).unwrap();

    assert!(dispatcher.cancel(queued));
    h.wait_for(queued, terminal(JobStatus::Failed)).await;
    let job = h.job(queued).await;
    assert_eq!(job.error_detail.as_deref(), Some("Download cancelled"));
    assert_eq!(job.progress_percent, 0);

    dispatcher.wait_idle().await;
    assert_eq!(h.job(first).await.status, JobStatus::Completed);
}

#[tokio::test]
async fn removing_running_job_cancels_and_purges() {
    let h = Harness::new(META_FAIL, &download_slow(100)).await;
    let dispatcher = Dispatcher::new(h.orchestrator.clone(), 1);
    let id = h.add_video("alice").await;
    dispatcher.dispatch(id).unwrap();
    h.wait_for(id, |j| j.is_some_and(|j| j.progress_percent >= 1)).await;

    let removal = remove_job(&h.db, Some(dispatcher.registry()), id, "alice")
        .await
        .unwrap();
    assert_eq!(removal, Removal::Cancelled);

    tokio::time::timeout(Duration::from_secs(5), dispatcher.wait_idle())
        .await
        .unwrap();
    assert!(h.db.get_job(id).await.unwrap().is_none());
    assert!(!h.db.purge(id).await.unwrap(), "worker already purged the row");
}

#[tokio::test]
async fn shutdown_cancels_in_flight_jobs() {
    let h = Harness::new(META_FAIL, &download_slow(100)).await;
    let dispatcher = Dispatcher::new(h.orchestrator.clone(), 2);
    let running = h.add_video("alice").await;
    dispatcher.dispatch(running).unwrap();
    h.wait_for(running, terminal(JobStatus::Downloading)).await;

    let report = dispatcher.shutdown(Duration::from_secs(5)).await;
    assert_eq!(report.drained, 1);
    assert!(report.aborted.is_empty());

    let job = h.job(running).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_detail.as_deref(), Some("Download cancelled"));

    let late = h.add_video("alice").await;
    assert_eq!(dispatcher.dispatch(late), Err(DispatchError::ShuttingDown));
}
