//! Timing helpers for grid builds and bond inference

use std::time::Instant;

/// RAII timer that logs elapsed time on drop.
///
/// ```ignore
/// let _timer = Timed::debug("light frame");
/// // ... rebuild grids ...
/// // logs "light frame: 1.234ms" when _timer is dropped
/// ```
pub struct Timed {
    label: &'static str,
    started_at: Instant,
    level: log::Level,
}

impl Timed {
    /// Timer that reports at INFO level.
    pub fn info(label: &'static str) -> Self {
        log::debug!("{}...", label);
        Self {
            label,
            started_at: Instant::now(),
            level: log::Level::Info,
        }
    }

    /// Timer that reports at DEBUG level.
    pub fn debug(label: &'static str) -> Self {
        log::trace!("{}...", label);
        Self {
            label,
            started_at: Instant::now(),
            level: log::Level::Debug,
        }
    }
}

impl Drop for Timed {
    fn drop(&mut self) {
        log::log!(self.level, "{}: {:.3?}", self.label, self.started_at.elapsed());
    }
}
