//! Progress reporting for the download pool.

use std::sync::Arc;

use tokio::sync::Mutex;

use novel_dl_shared::{ChapterLink, Stage};

use crate::engine::ChapterOutcome;

/// Callback interface for pipeline and per-chapter progress.
///
/// Implementations must be cheap; `chapter_finished` is called while the
/// counter lock is held.
pub trait ProgressReporter: Send + Sync {
    /// Called on every pipeline state transition.
    fn stage(&self, _stage: Stage) {}
    /// Called once a task holds a pool slot, before its courtesy delay.
    fn chapter_started(&self, _link: &ChapterLink) {}
    /// Called exactly once per task, success or failure.
    fn chapter_finished(&self, outcome: &ChapterOutcome, completed: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn chapter_finished(&self, _outcome: &ChapterOutcome, _completed: usize, _total: usize) {}
}

/// Completion counter shared by all download tasks.
///
/// `increment` is serialized by a mutex, so the reporter sees completions one
/// at a time with a strictly increasing count.
pub struct ProgressCounter {
    completed: Mutex<usize>,
    total: usize,
    reporter: Arc<dyn ProgressReporter>,
}

impl ProgressCounter {
    pub fn new(total: usize, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            completed: Mutex::new(0),
            total,
            reporter,
        }
    }

    /// Record one finished task and notify the reporter. Returns the new count.
    pub async fn increment(&self, outcome: &ChapterOutcome) -> usize {
        let mut completed = self.completed.lock().await;
        *completed += 1;
        self.reporter.chapter_finished(outcome, *completed, self.total);
        *completed
    }

    /// Number of tasks finished so far.
    pub async fn completed(&self) -> usize {
        *self.completed.lock().await
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub(crate) fn reporter(&self) -> &dyn ProgressReporter {
        self.reporter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ChapterStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    struct Recording {
        last: AtomicUsize,
    }

    impl ProgressReporter for Recording {
        fn chapter_finished(&self, _outcome: &ChapterOutcome, completed: usize, total: usize) {
            assert!(completed <= total);
            let prev = self.last.swap(completed, Ordering::SeqCst);
            assert_eq!(prev + 1, completed, "counts must be strictly sequential");
        }
    }

    fn outcome(position: u32) -> ChapterOutcome {
        ChapterOutcome {
            position,
            url: Url::parse(&format!("https://example.com/{position}")).unwrap(),
            status: ChapterStatus::Failed("boom".into()),
        }
    }

    #[tokio::test]
    async fn concurrent_increments_are_serialized() {
        let reporter = Arc::new(Recording {
            last: AtomicUsize::new(0),
        });
        let counter = Arc::new(ProgressCounter::new(50, reporter.clone()));

        let mut handles = Vec::new();
        for i in 0..50 {
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                counter.increment(&outcome(i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(counter.completed().await, 50);
        assert_eq!(reporter.last.load(Ordering::SeqCst), 50);
    }
}
