//! Cooperative run control flags.
//!
//! The supervisor loop reads these once per iteration. An embedder (or a
//! signal task) flips them from outside; the loop never blocks on them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Pause/stop switches shared between the run loop and its operator.
#[derive(Debug, Default)]
pub struct RunFlags {
    pause: AtomicBool,
    stop: AtomicBool,
}

impl RunFlags {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Hold submissions while keeping the process (and heartbeat) alive.
    pub fn request_pause(&self) {
        self.pause.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.pause.store(false, Ordering::Relaxed);
    }

    /// Ask the loop to wind down at the next iteration.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::Relaxed)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_start_clear() {
        let flags = RunFlags::new();
        assert!(!flags.is_paused());
        assert!(!flags.stop_requested());
    }

    #[test]
    fn test_pause_toggles_and_resumes() {
        let flags = RunFlags::new();
        flags.request_pause();
        assert!(flags.is_paused());
        flags.resume();
        assert!(!flags.is_paused());
    }

    #[test]
    fn test_stop_is_sticky() {
        let flags = RunFlags::new();
        flags.request_stop();
        assert!(flags.stop_requested());
        // No un-stop: the loop exits once it sees the flag.
        assert!(flags.stop_requested());
    }

    #[test]
    fn test_shared_handle_sees_updates() {
        let flags = RunFlags::new();
        let other = flags.clone();
        other.request_pause();
        assert!(flags.is_paused());
    }
}
