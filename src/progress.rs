//! Progress-callback trait for upload and polling events.
//!
//! Inject an [`Arc<dyn JobProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to receive
//! events as a document moves from upload through polling to its terminal
//! state.
//!
//! Callbacks are the least-invasive integration point: callers can forward
//! events to a terminal progress bar, a channel or a log without the library
//! knowing how the host application communicates. The trait is `Send + Sync`
//! because [`JobProgressCallback::on_status`] and
//! [`JobProgressCallback::on_poll_error`] fire from the poller's spawned task.
//!
//! # Example
//!
//! ```rust
//! use scarf_client::{ClientConfig, JobProgressCallback, UploadJob};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     polls: AtomicUsize,
//! }
//!
//! impl JobProgressCallback for CountingCallback {
//!     fn on_status(&self, job: &UploadJob) {
//!         let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("poll {n}: {}%", job.progress);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { polls: AtomicUsize::new(0) });
//!
//! let config = ClientConfig::builder()
//!     .progress_callback(counter as Arc<dyn JobProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::job::UploadJob;
use crate::view::ReportSummary;
use std::sync::Arc;

/// Called by the session and the poller as a job progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Error arguments are owned `String`s so implementations
/// can move them into spawned tasks.
pub trait JobProgressCallback: Send + Sync {
    /// Called once the selected file has been read, just before the upload.
    ///
    /// # Arguments
    /// * `file_name`: name sent in the multipart field
    /// * `bytes`: payload size
    fn on_upload_start(&self, file_name: &str, bytes: usize) {
        let _ = (file_name, bytes);
    }

    /// Called when the backend has accepted the upload.
    fn on_job_created(&self, job_id: &str) {
        let _ = job_id;
    }

    /// Called for every status response, terminal or not.
    fn on_status(&self, job: &UploadJob) {
        let _ = job;
    }

    /// Called when a status request fails; polling continues on the next tick.
    ///
    /// # Arguments
    /// * `attempt`: 1-indexed status request number
    /// * `error`: human-readable error description
    fn on_poll_error(&self, attempt: u32, error: String) {
        let _ = (attempt, error);
    }

    /// Called once the completed result has been turned into a report view.
    fn on_job_complete(&self, job_id: &str, summary: &ReportSummary) {
        let _ = (job_id, summary);
    }

    /// Called when the upload fails or the backend reports `FAILED`.
    ///
    /// `job_id` is `None` when the failure happened before a job existed.
    fn on_job_failed(&self, job_id: Option<&str>, error: String) {
        let _ = (job_id, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl JobProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ProgressCallback = Arc<dyn JobProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::JobStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        statuses: AtomicUsize,
        poll_errors: Mutex<Vec<(u32, String)>>,
        failures: Mutex<Vec<(Option<String>, String)>>,
    }

    impl JobProgressCallback for TrackingCallback {
        fn on_status(&self, _job: &UploadJob) {
            self.statuses.fetch_add(1, Ordering::SeqCst);
        }

        fn on_poll_error(&self, attempt: u32, error: String) {
            self.poll_errors.lock().unwrap().push((attempt, error));
        }

        fn on_job_failed(&self, job_id: Option<&str>, error: String) {
            self.failures
                .lock()
                .unwrap()
                .push((job_id.map(str::to_string), error));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_upload_start("paper.pdf", 1024);
        cb.on_job_created("abc");
        cb.on_status(&UploadJob::new("abc"));
        cb.on_poll_error(1, "timeout".into());
        cb.on_job_complete("abc", &ReportSummary::default());
        cb.on_job_failed(None, "Upload Failed".into());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        let mut job = UploadJob::new("abc");
        job.status = JobStatus::Running;

        tracker.on_status(&job);
        tracker.on_poll_error(2, "connection refused".into());
        tracker.on_status(&job);
        tracker.on_job_failed(Some("abc"), "boom".into());

        assert_eq!(tracker.statuses.load(Ordering::SeqCst), 2);
        assert_eq!(
            tracker.poll_errors.lock().unwrap().as_slice(),
            &[(2, "connection refused".to_string())]
        );
        assert_eq!(
            tracker.failures.lock().unwrap().as_slice(),
            &[(Some("abc".to_string()), "boom".to_string())]
        );
    }

    #[tokio::test]
    async fn arc_dyn_callback_moves_into_spawned_task() {
        let cb: Arc<dyn JobProgressCallback> = Arc::new(NoopProgressCallback);
        tokio::spawn(async move {
            cb.on_poll_error(1, "timeout".to_string());
        })
        .await
        .expect("spawn must succeed");
    }
}
