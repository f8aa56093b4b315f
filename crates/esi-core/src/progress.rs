use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Cooperative abort flag shared between a caller and a long-running
/// pipeline stage (§5). Checked at chunk boundaries only; there is no
/// preemption and no timeout.
#[derive(Debug, Default)]
pub struct CancellationToken {
    flag: AtomicBool,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// A single atomic counter incremented per chunk, plus the cancellation
/// flag a filter checks at the next chunk boundary (§5, §9). This is the
/// only progress-reporting surface the volumetric/geometric core talks
/// to; the concrete terminal rendering lives in `esi-cli`, the same split
/// the teacher draws between `TerminalBackend` (trait) and
/// `CrosstermBackend` (one concrete implementation).
pub trait Progress: Send + Sync {
    /// Called once up front with the total number of chunks of work.
    fn start(&self, stage: &str, total_chunks: u64);

    /// Called after each chunk of work completes.
    fn advance(&self, completed_chunks: u64);

    /// Called once the stage finishes (successfully or not).
    fn finish(&self, stage: &str);

    /// Cooperative cancellation check; filters call this at chunk
    /// boundaries and abort with [`crate::Error::Cancelled`] when true.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Headless default: counts chunks, never cancels. Used by library
/// callers and tests that don't care about progress reporting.
#[derive(Debug, Default)]
pub struct SilentProgress {
    completed: AtomicU64,
}

impl SilentProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

impl Progress for SilentProgress {
    fn start(&self, _stage: &str, _total_chunks: u64) {}

    fn advance(&self, completed_chunks: u64) {
        self.completed.store(completed_chunks, Ordering::Relaxed);
    }

    fn finish(&self, _stage: &str) {}
}
