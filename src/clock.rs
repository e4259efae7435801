// src/clock.rs
//! Monotonic nanosecond clock, one per process, cloned across threads.

/// Thin wrapper over `quanta::Clock` yielding nanoseconds since an arbitrary
/// process-local epoch. Both pipeline threads must use clones of the same
/// clock so their timestamps share a calibration.
#[derive(Clone, Debug)]
pub struct NanoClock {
    inner: quanta::Clock,
}

impl NanoClock {
    pub fn new() -> Self {
        Self { inner: quanta::Clock::new() }
    }

    /// Current monotonic time in nanoseconds.
    #[inline(always)]
    pub fn now_ns(&self) -> u64 {
        let raw = self.inner.raw();
        self.inner.delta_as_nanos(0, raw)
    }
}

impl Default for NanoClock {
    fn default() -> Self {
        Self::new()
    }
}
