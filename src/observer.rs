//! Observer trait for session events.
//!
//! Inject an [`Arc<dyn SessionObserver>`] via
//! [`crate::session::SessionBuilder::observer`] to hear about state changes,
//! generation progress and the one-shot notices a UI should show the user
//! (failed generation, rejected edit, …).
//!
//! # Example
//!
//! ```rust
//! use pdf2mindmap::{Notice, SessionObserver};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct ErrorCounter(AtomicUsize);
//!
//! impl SessionObserver for ErrorCounter {
//!     fn on_notice(&self, notice: &Notice) {
//!         if notice.is_error() {
//!             self.0.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//! ```

use crate::output::GenerationStats;
use crate::session::SessionState;
use std::fmt;
use std::sync::Arc;

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message meant for the user, delivered once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Called by the session as it moves through its states.
///
/// All methods default to no-ops so implementors only override what they
/// need. The trait is `Send + Sync` so one observer can be shared between a
/// session and a UI thread.
pub trait SessionObserver: Send + Sync {
    /// Called on every state transition, including `Failed` on its way back
    /// to `TextReady`.
    fn on_state_change(&self, from: &SessionState, to: &SessionState) {
        let _ = (from, to);
    }

    /// Called just before the outline request is sent.
    ///
    /// # Arguments
    /// * `source_chars` — characters of source text in the request
    fn on_generation_start(&self, source_chars: usize) {
        let _ = source_chars;
    }

    /// Called after a generation was parsed and rendered.
    fn on_generation_complete(&self, stats: &GenerationStats) {
        let _ = stats;
    }

    /// Called once per user-visible message.
    fn on_notice(&self, notice: &Notice) {
        let _ = notice;
    }
}

/// Observer that ignores everything. The default when none is configured.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias for the type the session stores.
pub type SharedObserver = Arc<dyn SessionObserver>;
