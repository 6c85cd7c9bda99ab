//! Input coalescing

/// Rate limiter that keeps only the latest sample between emissions.
///
/// A sample arriving at least `interval_ms` after the previous emission is
/// returned immediately. Anything earlier replaces the pending sample, which
/// the owner drains with [`InputThrottle::take_pending`] on a timer or at
/// stroke end.
#[derive(Debug, Clone)]
pub struct InputThrottle<T> {
    interval_ms: f64,
    last_emit_ms: Option<f64>,
    pending: Option<(T, f64)>,
}

impl<T> InputThrottle<T> {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms: if interval_ms.is_finite() { interval_ms.max(0.0) } else { 0.0 },
            last_emit_ms: None,
            pending: None,
        }
    }

    #[inline]
    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn is_due(&self, timestamp_ms: f64) -> bool {
        match self.last_emit_ms {
            None => true,
            // A clock that jumps backwards or a garbage timestamp never stalls input
            Some(last) => {
                let elapsed = timestamp_ms - last;
                !elapsed.is_finite() || elapsed < 0.0 || elapsed >= self.interval_ms
            }
        }
    }

    /// Offer a sample. Returns it when due, otherwise holds it as pending.
    pub fn offer(&mut self, sample: T, timestamp_ms: f64) -> Option<T> {
        if self.is_due(timestamp_ms) {
            self.last_emit_ms = Some(timestamp_ms);
            self.pending = None;
            Some(sample)
        } else {
            self.pending = Some((sample, timestamp_ms));
            None
        }
    }

    /// Drain the pending sample, counting it as emitted
    pub fn take_pending(&mut self) -> Option<T> {
        let (sample, timestamp_ms) = self.pending.take()?;
        self.last_emit_ms = Some(timestamp_ms);
        Some(sample)
    }

    pub fn reset(&mut self) {
        self.last_emit_ms = None;
        self.pending = None;
    }
}
