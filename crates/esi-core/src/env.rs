use crate::progress::{Progress, SilentProgress};

/// A destination for user-visible diagnostics. Distinct from `tracing`
/// spans: `Logger` is for the single-line, stage-tagged messages a
/// recipe emits on recoverable fallback (§7); `tracing` covers the
/// structured, always-on instrumentation.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Replaces the Windows GUI's confirmation dialogs (§4.6's "ask for
/// confirmation" when too many solution points fall outside the grey
/// matter mask). A headless caller always answers `default`.
pub trait Asker: Send + Sync {
    fn confirm(&self, question: &str, default: bool) -> bool;
}

/// The small trait/interface bundle the core takes by reference instead
/// of a global application/UI object (§9). Every long-running operation
/// in the workspace is handed one of these rather than reaching for
/// ambient state.
pub struct Environment<'a> {
    pub progress: &'a dyn Progress,
    pub logger: &'a dyn Logger,
    pub asker: &'a dyn Asker,
}

struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

struct AlwaysDefaultAsker;

impl Asker for AlwaysDefaultAsker {
    fn confirm(&self, question: &str, default: bool) -> bool {
        tracing::debug!(question, default, "headless confirm, using default");
        default
    }
}

/// Headless default: progress is silently counted, diagnostics go to
/// `tracing`, and every confirmation takes its default answer.
pub struct NullEnvironment {
    progress: SilentProgress,
    logger: TracingLogger,
    asker: AlwaysDefaultAsker,
}

impl Default for NullEnvironment {
    fn default() -> Self {
        Self {
            progress: SilentProgress::new(),
            logger: TracingLogger,
            asker: AlwaysDefaultAsker,
        }
    }
}

impl NullEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_environment(&self) -> Environment<'_> {
        Environment {
            progress: &self.progress,
            logger: &self.logger,
            asker: &self.asker,
        }
    }
}
