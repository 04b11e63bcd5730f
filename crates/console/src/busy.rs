//! Scoped busy flags.

use std::sync::atomic::{AtomicBool, Ordering};

/// Holds a busy flag set for as long as it lives.
///
/// Dropping the guard clears the flag, so the flag is released on every exit
/// path: normal return, `?` propagation, panic unwinding, and the owning
/// future being dropped mid-await.
#[derive(Debug)]
pub(crate) struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    /// Set `flag`, or return `None` if it is already set.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let flag = AtomicBool::new(false);

        let guard = BusyGuard::acquire(&flag);
        assert!(guard.is_some());
        assert!(flag.load(Ordering::Acquire));
        assert!(BusyGuard::acquire(&flag).is_none());

        drop(guard);
        assert!(!flag.load(Ordering::Acquire));
        assert!(BusyGuard::acquire(&flag).is_some());
    }

    #[test]
    fn test_released_on_panic() {
        let flag = AtomicBool::new(false);
        let result = std::panic::catch_unwind(|| {
            let _guard = BusyGuard::acquire(&flag);
            panic!("transport blew up");
        });
        assert!(result.is_err());
        assert!(!flag.load(Ordering::Acquire));
    }
}
