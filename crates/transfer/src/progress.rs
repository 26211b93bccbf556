use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use skiff_protocol::UploadProgress;

use crate::UploadTask;

/// Default progress notification interval.
const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Callback invoked with upload progress snapshots.
pub type ProgressCallback = Box<dyn Fn(UploadProgress) + Send + Sync>;

/// Tracks concurrent upload tasks and notifies callbacks.
///
/// Tasks share no state with each other; the tracker only reads their
/// snapshots. Notification is either one-shot ([`notify`](Self::notify))
/// or periodic ([`start`](Self::start)).
pub struct ProgressTracker {
    inner: Arc<RwLock<TrackerInner>>,
    stop: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
}

struct TrackerInner {
    callbacks: Vec<ProgressCallback>,
    tasks: HashMap<String, Arc<UploadTask>>,
    interval: Duration,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl ProgressTracker {
    /// Creates a tracker that notifies every `interval` once started.
    pub fn new(interval: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TrackerInner {
                callbacks: Vec::new(),
                tasks: HashMap::new(),
                interval,
            })),
            stop: Mutex::new(None),
        }
    }

    /// Registers a progress callback.
    pub fn on_progress(&self, callback: ProgressCallback) {
        self.inner.write().unwrap().callbacks.push(callback);
    }

    /// Begins tracking a task under its own id.
    pub fn track(&self, task: Arc<UploadTask>) {
        let id = task.id();
        self.inner.write().unwrap().tasks.insert(id, task);
    }

    /// Stops tracking a task.
    pub fn untrack(&self, task_id: &str) {
        self.inner.write().unwrap().tasks.remove(task_id);
    }

    /// Returns a tracked task by id.
    pub fn get_task(&self, task_id: &str) -> Option<Arc<UploadTask>> {
        self.inner.read().unwrap().tasks.get(task_id).cloned()
    }

    /// Sends a one-time snapshot of `task_id` to every callback.
    pub fn notify(&self, task_id: &str) {
        let inner = self.inner.read().unwrap();
        if let Some(task) = inner.tasks.get(task_id) {
            let snapshot = task.snapshot();
            for cb in &inner.callbacks {
                cb(snapshot.clone());
            }
        }
    }

    /// Starts periodic notifications for active tasks in a background
    /// tokio task. Call [`stop`](Self::stop) to cancel.
    pub fn start(&self) {
        let (tx, mut rx) = tokio::sync::oneshot::channel();
        {
            let mut stop = self.stop.lock().unwrap();
            // Replacing the sender stops any previous loop.
            drop(stop.take());
            *stop = Some(tx);
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let interval = inner.read().unwrap().interval;
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let i = inner.read().unwrap();
                        for task in i.tasks.values() {
                            if task.is_active() {
                                let snapshot = task.snapshot();
                                for cb in &i.callbacks {
                                    cb(snapshot.clone());
                                }
                            }
                        }
                    }
                    _ = &mut rx => break,
                }
            }
        });
    }

    /// Stops the periodic notification loop.
    pub fn stop(&self) {
        // Dropping the sender signals the loop to exit.
        drop(self.stop.lock().unwrap().take());
    }
}

// ---------------------------------------------------------------------------
// SpeedCalculator
// ---------------------------------------------------------------------------

struct SpeedSample {
    bytes: u64,
    at: Instant,
}

/// Sliding-window throughput estimate from byte-count samples.
pub struct SpeedCalculator {
    inner: Mutex<SpeedInner>,
}

struct SpeedInner {
    samples: Vec<SpeedSample>,
    window: Duration,
    max_samples: usize,
}

impl Default for SpeedCalculator {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 100)
    }
}

impl SpeedCalculator {
    /// Creates a calculator averaging over `window`, retaining at most
    /// `max_samples` samples.
    pub fn new(window: Duration, max_samples: usize) -> Self {
        Self {
            inner: Mutex::new(SpeedInner {
                samples: Vec::new(),
                window,
                max_samples,
            }),
        }
    }

    /// Records `bytes` transferred at the current instant.
    pub fn add_sample(&self, bytes: u64) {
        let mut s = self.inner.lock().unwrap();
        let now = Instant::now();
        s.samples.push(SpeedSample { bytes, at: now });

        // Prune samples outside the window, then cap the count.
        let cutoff = now - s.window;
        s.samples.retain(|sample| sample.at >= cutoff);
        if s.samples.len() > s.max_samples {
            let excess = s.samples.len() - s.max_samples;
            s.samples.drain(..excess);
        }
    }

    /// Average speed in bytes/second over the window; 0.0 with fewer than
    /// two samples.
    pub fn bytes_per_second(&self) -> f64 {
        let s = self.inner.lock().unwrap();
        if s.samples.len() < 2 {
            return 0.0;
        }

        let elapsed = s.samples[s.samples.len() - 1]
            .at
            .duration_since(s.samples[0].at);
        if elapsed.is_zero() {
            return 0.0;
        }

        let total: u64 = s.samples.iter().map(|sample| sample.bytes).sum();
        total as f64 / elapsed.as_secs_f64()
    }

    /// Estimated time to transfer `remaining_bytes`, or `None` while the
    /// speed is unknown.
    pub fn eta(&self, remaining_bytes: u64) -> Option<Duration> {
        let speed = self.bytes_per_second();
        if speed <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining_bytes as f64 / speed))
    }

    /// Clears all recorded samples.
    pub fn reset(&self) {
        self.inner.lock().unwrap().samples.clear();
    }
}
