//! Shared traits at the engine seams
//!
//! The round engine only needs "give me the next crash point", so the
//! source of that number is pluggable for replays and tests.

/// Supplies the hidden crash multiplier for each new round
pub trait CrashPointSource: Send {
    /// Produce the crash point for the next round. Must be `>= 1.0`.
    fn next_crash_point(&mut self) -> f64;
}

impl<S: CrashPointSource + ?Sized> CrashPointSource for Box<S> {
    fn next_crash_point(&mut self) -> f64 {
        (**self).next_crash_point()
    }
}
