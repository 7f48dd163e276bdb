//! Policies deciding when partial results are pushed to the display surface.

use std::time::{Duration, Instant};

/// Minimum interval between flushes for the time-based policy.
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Decides after which columns the compositor flushes the framebuffer.
#[derive(Debug, Clone)]
pub enum FlushPolicy {
    /// Flushes when the column index crosses every ~1% of the image width, and
    /// for each of the last `x_skip + 1` columns. Used with parallel workers.
    Position {
        /// Distance between flushed columns.
        step: u32,
        /// Columns starting from this one always flush.
        tail_start: u32,
    },
    /// Flushes when more than `interval` has elapsed since the last flush. The flush
    /// is deferred until the next column is written so that it does not stall the
    /// producer. Used with the sequential fallback.
    Time {
        /// Minimum interval between flushes.
        interval: Duration,
        /// Time of the last flush (or of policy creation).
        last_flush: Instant,
        /// Whether the interval has elapsed and a flush is due at the next column.
        pending: bool,
    },
}

impl FlushPolicy {
    /// Creates a position-based policy for an image `width` pixels wide rendered
    /// with column stride `x_skip`.
    pub fn position(width: u32, x_skip: u32) -> Self {
        Self::Position {
            step: (width / 100).max(1),
            tail_start: width.saturating_sub(x_skip.saturating_add(1)),
        }
    }

    /// Creates a time-based policy with the default [`FLUSH_INTERVAL`].
    pub fn time_based(now: Instant) -> Self {
        Self::with_interval(FLUSH_INTERVAL, now)
    }

    /// Creates a time-based policy with a custom interval.
    pub fn with_interval(interval: Duration, now: Instant) -> Self {
        Self::Time {
            interval,
            last_flush: now,
            pending: false,
        }
    }

    /// Notifies the policy that `column` was written at `now`. Returns `true` if
    /// the framebuffer should be flushed.
    pub fn on_column(&mut self, column: u32, now: Instant) -> bool {
        match self {
            Self::Position { step, tail_start } => column % *step == 0 || column >= *tail_start,
            Self::Time {
                interval,
                last_flush,
                pending,
            } => {
                if *pending {
                    *pending = false;
                    *last_flush = now;
                    true
                } else {
                    *pending = now.duration_since(*last_flush) > *interval;
                    false
                }
            }
        }
    }
}
