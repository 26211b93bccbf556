use std::sync::RwLock;

use skiff_protocol::{UploadProgress, UploadStatus};
use uuid::Uuid;

/// Progress is held just below this value while bytes are still in flight;
/// the server may reject them after they are on the wire, so only
/// [`UploadTask::complete`] publishes the exact 100.
const PRE_ACK_CEILING: f64 = 99.9;

/// Mutable state of one upload (thread-safe).
///
/// The engine driving the task is the only writer; any number of readers
/// may take snapshots concurrently. Progress is a 0–100 percentage and
/// never moves backwards within one task.
pub struct UploadTask {
    inner: RwLock<TaskInner>,
}

struct TaskInner {
    id: String,
    dest_path: String,
    file_name: String,
    total_bytes: u64,
    overwrite: bool,
    status: UploadStatus,
    transferred_bytes: u64,
    progress: f64,
    speed_bps: f64,
    error: String,
}

impl UploadTask {
    /// Creates a pending task for uploading `file_name` to `dest_path`.
    pub fn new(
        dest_path: impl Into<String>,
        file_name: impl Into<String>,
        total_bytes: u64,
        overwrite: bool,
    ) -> Self {
        Self {
            inner: RwLock::new(TaskInner {
                id: Uuid::new_v4().to_string(),
                dest_path: dest_path.into(),
                file_name: file_name.into(),
                total_bytes,
                overwrite,
                status: UploadStatus::Pending,
                transferred_bytes: 0,
                progress: 0.0,
                speed_bps: 0.0,
                error: String::new(),
            }),
        }
    }

    pub fn id(&self) -> String {
        self.inner.read().unwrap().id.clone()
    }

    /// Full destination path, directory plus file name.
    pub fn dest_path(&self) -> String {
        self.inner.read().unwrap().dest_path.clone()
    }

    pub fn file_name(&self) -> String {
        self.inner.read().unwrap().file_name.clone()
    }

    pub fn total_bytes(&self) -> u64 {
        self.inner.read().unwrap().total_bytes
    }

    pub fn overwrite(&self) -> bool {
        self.inner.read().unwrap().overwrite
    }

    /// Marks the task as in progress.
    pub fn start(&self) {
        let mut s = self.inner.write().unwrap();
        if !s.status.is_terminal() {
            s.status = UploadStatus::InProgress;
        }
    }

    /// Records cumulative transferred bytes for the whole task.
    ///
    /// Lower values than previously recorded are ignored, so progress is
    /// monotone even with out-of-order ticks.
    pub fn set_transferred(&self, bytes: u64) {
        let mut s = self.inner.write().unwrap();
        if s.status.is_terminal() {
            return;
        }
        if bytes > s.transferred_bytes {
            s.transferred_bytes = bytes;
        }
        if s.total_bytes > 0 {
            let pct = s.transferred_bytes as f64 / s.total_bytes as f64 * 100.0;
            let pct = pct.min(PRE_ACK_CEILING);
            if pct > s.progress {
                s.progress = pct;
            }
        }
    }

    /// Publishes an advisory throughput estimate in bytes/second.
    pub fn set_speed(&self, bytes_per_second: f64) {
        let mut s = self.inner.write().unwrap();
        if !s.status.is_terminal() {
            s.speed_bps = bytes_per_second;
        }
    }

    /// Marks the task as completed and pins progress to exactly 100.
    pub fn complete(&self) {
        let mut s = self.inner.write().unwrap();
        s.status = UploadStatus::Completed;
        s.transferred_bytes = s.total_bytes;
        s.progress = 100.0;
    }

    /// Marks the task as failed. Progress and speed keep their last values
    /// (no reset) and stop updating.
    pub fn fail(&self, err: &str) {
        let mut s = self.inner.write().unwrap();
        s.status = UploadStatus::Failed;
        s.error = err.to_string();
    }

    pub fn status(&self) -> UploadStatus {
        self.inner.read().unwrap().status.clone()
    }

    /// Percent complete, 0–100.
    pub fn progress(&self) -> f64 {
        self.inner.read().unwrap().progress
    }

    pub fn speed_bps(&self) -> f64 {
        self.inner.read().unwrap().speed_bps
    }

    pub fn transferred_bytes(&self) -> u64 {
        self.inner.read().unwrap().transferred_bytes
    }

    /// Returns `true` until the task reaches a terminal state.
    pub fn is_active(&self) -> bool {
        !self.inner.read().unwrap().status.is_terminal()
    }

    /// Takes a point-in-time snapshot for progress callbacks.
    pub fn snapshot(&self) -> UploadProgress {
        let s = self.inner.read().unwrap();
        UploadProgress {
            task_id: s.id.clone(),
            status: s.status.clone(),
            file_name: s.file_name.clone(),
            total_bytes: s.total_bytes,
            transferred_bytes: s.transferred_bytes,
            progress: s.progress,
            speed_bps: s.speed_bps,
            error: s.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> UploadTask {
        UploadTask::new("/docs/report.pdf", "report.pdf", 1000, false)
    }

    #[test]
    fn new_task_is_pending() {
        let task = sample_task();
        assert_eq!(task.status(), UploadStatus::Pending);
        assert!(task.is_active());
        assert_eq!(task.progress(), 0.0);
        assert_eq!(task.transferred_bytes(), 0);
        assert!(!task.overwrite());
        assert_eq!(task.dest_path(), "/docs/report.pdf");
    }

    #[test]
    fn task_ids_are_unique() {
        assert_ne!(sample_task().id(), sample_task().id());
    }

    #[test]
    fn start_sets_in_progress() {
        let task = sample_task();
        task.start();
        assert_eq!(task.status(), UploadStatus::InProgress);
    }

    #[test]
    fn transferred_updates_progress() {
        let task = sample_task();
        task.start();
        task.set_transferred(250);
        assert_eq!(task.transferred_bytes(), 250);
        assert!((task.progress() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn progress_is_monotone() {
        let task = sample_task();
        task.start();
        task.set_transferred(500);
        let before = task.progress();

        // Out-of-order tick with a lower cumulative count is ignored.
        task.set_transferred(100);
        assert_eq!(task.transferred_bytes(), 500);
        assert_eq!(task.progress(), before);
    }

    #[test]
    fn progress_holds_below_hundred_until_complete() {
        let task = sample_task();
        task.start();
        task.set_transferred(1000);
        assert!(task.progress() < 100.0);
        assert_eq!(task.transferred_bytes(), 1000);

        task.complete();
        assert_eq!(task.progress(), 100.0);
        assert_eq!(task.status(), UploadStatus::Completed);
        assert!(!task.is_active());
    }

    #[test]
    fn complete_pins_progress_for_empty_file() {
        let task = UploadTask::new("/docs/empty.bin", "empty.bin", 0, true);
        task.start();
        task.set_transferred(0);
        assert_eq!(task.progress(), 0.0);

        task.complete();
        assert_eq!(task.progress(), 100.0);
        assert_eq!(task.transferred_bytes(), 0);
    }

    #[test]
    fn fail_keeps_last_progress() {
        let task = sample_task();
        task.start();
        task.set_transferred(400);
        task.set_speed(1234.0);
        let progress = task.progress();

        task.fail("upload rejected with status 500");
        assert_eq!(task.status(), UploadStatus::Failed);
        assert!(!task.is_active());
        assert_eq!(task.progress(), progress);
        assert_eq!(task.speed_bps(), 1234.0);
        assert_eq!(task.snapshot().error, "upload rejected with status 500");
    }

    #[test]
    fn terminal_state_stops_updates() {
        let task = sample_task();
        task.start();
        task.fail("boom");

        task.set_transferred(900);
        task.set_speed(10.0);
        task.start();
        assert_eq!(task.transferred_bytes(), 0);
        assert_eq!(task.speed_bps(), 0.0);
        assert_eq!(task.status(), UploadStatus::Failed);
    }

    #[test]
    fn snapshot_reflects_state() {
        let task = sample_task();
        task.start();
        task.set_transferred(500);

        let snap = task.snapshot();
        assert_eq!(snap.task_id, task.id());
        assert_eq!(snap.status, UploadStatus::InProgress);
        assert_eq!(snap.file_name, "report.pdf");
        assert_eq!(snap.total_bytes, 1000);
        assert_eq!(snap.transferred_bytes, 500);
        assert!(snap.error.is_empty());
    }

    #[test]
    fn concurrent_readers_and_writer() {
        use std::sync::Arc;
        use std::thread;

        let task = Arc::new(UploadTask::new("/d/f.bin", "f.bin", 100_000, false));
        task.start();

        let mut handles = vec![];
        for i in 0..4u64 {
            let t = Arc::clone(&task);
            handles.push(thread::spawn(move || {
                for j in 0..1000 {
                    t.set_transferred(i * 1000 + j);
                }
            }));
        }
        for _ in 0..4 {
            let t = Arc::clone(&task);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    let _ = t.snapshot();
                    let _ = t.progress();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        // The highest cumulative tick wins.
        assert_eq!(task.transferred_bytes(), 3999);
    }
}
