//! Shared foundations for the ESI toolkit: the error taxonomy (§7), the
//! headless environment trait bundle (§9), and the cooperative
//! cancellation/progress primitives used by every long-running pipeline
//! stage (§5).
//!
//! No module outside this crate should define its own error type; every
//! fallible operation in the workspace returns [`Result<T>`].

mod env;
mod error;
mod progress;

pub use env::{Asker, Environment, Logger, NullEnvironment};
pub use error::{Error, Result};
pub use progress::{CancellationToken, Progress, SilentProgress};
