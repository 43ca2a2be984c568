//! Logging collaborator handed to the parser.
//!
//! A [`Logger`] is a plain value carrying a verbosity. It emits `tracing`
//! events under the `cifdoc` target; installing a subscriber is left to the
//! application.

/// How much the parser reports about its progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Verbosity {
    /// Nothing is logged.
    #[default]
    None,
    /// Per-document summaries.
    Some,
    /// Per-block and per-loop progress.
    All,
    /// Everything, including individual items.
    Everything,
}

impl Verbosity {
    /// Parse a verbosity name (`none`, `some`, `all`, `everything`) or level (`0`..`3`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" | "0" => Some(Verbosity::None),
            "some" | "1" => Some(Verbosity::Some),
            "all" | "2" => Some(Verbosity::All),
            "everything" | "3" => Some(Verbosity::Everything),
            _ => None,
        }
    }
}

/// Emits parser progress as `tracing` events, filtered by verbosity.
///
/// # Example
///
/// ```rust
/// use cifdoc_core::logging::{Logger, Verbosity};
///
/// let logger = Logger::new(Verbosity::Some);
/// assert!(logger.enabled(Verbosity::Some));
/// assert!(!logger.enabled(Verbosity::All));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Logger {
    verbosity: Verbosity,
}

impl Logger {
    #[inline]
    pub const fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// A logger that never emits anything.
    #[inline]
    pub const fn silent() -> Self {
        Self::new(Verbosity::None)
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[inline]
    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    /// Whether a message at `level` would be emitted.
    #[inline]
    pub fn enabled(&self, level: Verbosity) -> bool {
        level != Verbosity::None && level <= self.verbosity
    }

    /// Emit `message` if `level` is enabled.
    pub fn log(&self, level: Verbosity, message: &str) {
        if !self.enabled(level) {
            return;
        }
        match level {
            Verbosity::None => {}
            Verbosity::Some => tracing::info!(target: "cifdoc", "{}", message),
            Verbosity::All => tracing::debug!(target: "cifdoc", "{}", message),
            Verbosity::Everything => tracing::trace!(target: "cifdoc", "{}", message),
        }
    }
}
