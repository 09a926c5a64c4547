//! Progress and page-stream callbacks for remote extraction.

use std::sync::Arc;

use tracing::trace;

/// `completed` of `total` units (pages, batches, files) are done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Receives model output for a page as it streams in: `(page, fragment)`,
/// pages numbered from 1.
pub type PageStreamCallback = Arc<dyn Fn(usize, &str) + Send + Sync>;

/// Forwards progress to an optional callback, never letting either counter
/// go backwards.
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    last: Progress,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last: Progress {
                completed: 0,
                total: 0,
            },
        }
    }

    pub fn report(&mut self, completed: usize, total: usize) {
        let total = total.max(self.last.total);
        let completed = completed.max(self.last.completed).min(total);
        let progress = Progress { completed, total };
        self.last = progress;
        trace!(completed, total, "progress");
        if let Some(callback) = &self.callback {
            callback(progress);
        }
    }

    pub fn last(&self) -> Progress {
        self.last
    }
}
