use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

/// One-way stop signal shared by the supervisor, the generator and the consumer.
///
/// The flag only ever goes from `false` to `true`. Threads that call
/// [`ShutdownFlag::sleep`] are unparked when it flips, so a long random pause
/// ends as soon as a stop is requested.
#[derive(Clone, Default)]
pub struct ShutdownFlag {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    requested: AtomicBool,
    sleepers: Mutex<Vec<Thread>>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Sets the flag. Returns `true` only for the call that flipped it.
    pub fn request(&self) -> bool {
        let first = !self.inner.requested.swap(true, Ordering::AcqRel);
        if let Ok(sleepers) = self.inner.sleepers.lock() {
            for thread in sleepers.iter() {
                thread.unpark();
            }
        }
        first
    }

    /// Sleeps for `duration` unless the flag is set first.
    /// Returns `true` when the full pause elapsed, `false` when interrupted.
    pub fn sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_set();
        }
        let current = thread::current();
        self.register(&current);
        let completed = self.park_until(Instant::now().checked_add(duration));
        self.unregister(&current);
        completed
    }

    /// `None` means the pause outlasts any representable instant: wait for the flag only.
    fn park_until(&self, deadline: Option<Instant>) -> bool {
        loop {
            if self.is_set() {
                return false;
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return true;
                    }
                    // park_timeout may wake spuriously; the loop re-checks both exits.
                    thread::park_timeout(deadline - now);
                }
                None => thread::park(),
            }
        }
    }

    fn register(&self, current: &Thread) {
        if let Ok(mut sleepers) = self.inner.sleepers.lock() {
            if !sleepers.iter().any(|t| t.id() == current.id()) {
                sleepers.push(current.clone());
            }
        }
    }

    fn unregister(&self, current: &Thread) {
        if let Ok(mut sleepers) = self.inner.sleepers.lock() {
            sleepers.retain(|t| t.id() != current.id());
        }
    }

    #[cfg(test)]
    fn sleeper_count(&self) -> usize {
        self.inner.sleepers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for ShutdownFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownFlag")
            .field("requested", &self.is_set())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn request_is_idempotent() {
        let flag = ShutdownFlag::new();
        assert!(!flag.is_set());
        assert!(flag.request());
        assert!(!flag.request());
        assert!(flag.is_set());
    }
    #[test]
    fn sleep_runs_to_completion_when_not_requested() {
        let flag = ShutdownFlag::new();
        let started = Instant::now();
        assert!(flag.sleep(Duration::from_millis(20)));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
    #[test]
    fn request_wakes_a_sleeping_thread() {
        let flag = ShutdownFlag::new();
        let sleeper = {
            let flag = flag.clone();
            thread::spawn(move || {
                let started = Instant::now();
                let completed = flag.sleep(Duration::from_secs(10));
                (completed, started.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(50));
        flag.request();
        let (completed, elapsed) = sleeper.join().unwrap();
        assert!(!completed);
        assert!(elapsed < Duration::from_secs(5));
        assert_eq!(flag.sleeper_count(), 0);
    }
    #[test]
    fn finished_sleepers_are_forgotten() {
        let flag = ShutdownFlag::new();
        assert!(flag.sleep(Duration::from_millis(5)));
        assert_eq!(flag.sleeper_count(), 0);
    }
    #[test]
    fn unrepresentable_pause_waits_for_the_flag() {
        let flag = ShutdownFlag::new();
        let sleeper = {
            let flag = flag.clone();
            thread::spawn(move || flag.sleep(Duration::MAX))
        };
        thread::sleep(Duration::from_millis(30));
        flag.request();
        assert!(!sleeper.join().unwrap());
    }
}
