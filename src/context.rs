//! Service context bundling the ports and the cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::adapters::fixture::{FixedClock, MemoryFileSystem};
use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::error::LineageError;
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;

/// Process-lifetime cancellation signal shared with the file walk.
///
/// This is a library-level hook: the `lineage` binary never raises it and
/// relies on the default signal disposition to stop. Embedders that own a
/// signal handler or a deadline clone the flag out of the context and call
/// [`CancelFlag::cancel`]. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Raises the flag. Every holder observes it on its next check.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`CancelFlag::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fails with [`LineageError::Cancelled`] if the flag is raised.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` once the flag has been raised.
    pub fn check(&self) -> Result<(), LineageError> {
        if self.is_cancelled() {
            Err(LineageError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Bundles all port trait objects into a single context.
///
/// Every component receives its context explicitly; there is no
/// process-wide registry or configuration singleton.
pub struct ServiceContext {
    /// Clock used to evaluate override expiry.
    pub clock: Box<dyn Clock>,
    /// Filesystem for source trees, artifacts, and registries.
    pub fs: Box<dyn FileSystem>,
    /// Cancellation signal checked by the collector.
    pub cancel: CancelFlag,
}

impl ServiceContext {
    /// Creates a live context with the system clock and real disk.
    #[must_use]
    pub fn live() -> Self {
        Self {
            clock: Box::new(LiveClock),
            fs: Box::new(LiveFileSystem),
            cancel: CancelFlag::default(),
        }
    }

    /// Creates a context over an in-memory tree with a pinned clock.
    #[must_use]
    pub fn fixture(fs: MemoryFileSystem, clock: FixedClock) -> Self {
        Self { clock: Box::new(clock), fs: Box::new(fs), cancel: CancelFlag::default() }
    }
}
