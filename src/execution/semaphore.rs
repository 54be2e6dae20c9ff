use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A small, blocking counting semaphore.
///
/// Bounds the number of map chunks in flight at once. Permits are tied to
/// a guard value so a panicking map chunk still releases its slot.
pub struct Semaphore {
    permits: Mutex<usize>,
    cv: Condvar,
}

/// Guard for one acquired permit; released on drop.
pub struct Permit<'a> {
    sem: &'a Semaphore,
    waited: Duration,
}

impl Permit<'_> {
    /// Time spent blocked waiting for the permit (zero if none was needed).
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let mut g = self.sem.permits.lock().expect("semaphore mutex poisoned");
        *g += 1;
        self.sem.cv.notify_one();
    }
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        assert!(permits > 0, "permits must be > 0");
        Self {
            permits: Mutex::new(permits),
            cv: Condvar::new(),
        }
    }

    /// Acquire one permit, blocking until available.
    pub fn acquire(&self) -> Permit<'_> {
        let start = Instant::now();
        let mut waited = false;
        let mut g = self.permits.lock().expect("semaphore mutex poisoned");
        while *g == 0 {
            waited = true;
            g = self.cv.wait(g).expect("semaphore mutex poisoned");
        }
        *g -= 1;
        drop(g);

        Permit {
            sem: self,
            waited: if waited { start.elapsed() } else { Duration::ZERO },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Semaphore;
    use std::time::Duration;

    #[test]
    fn uncontended_acquire_reports_zero_wait() {
        let sem = Semaphore::new(2);
        let a = sem.acquire();
        let b = sem.acquire();
        assert_eq!(a.waited(), Duration::ZERO);
        assert_eq!(b.waited(), Duration::ZERO);
    }

    #[test]
    fn dropping_a_permit_frees_a_slot() {
        let sem = Semaphore::new(1);
        let first = sem.acquire();
        drop(first);
        // Would deadlock if the drop above had not released.
        let _second = sem.acquire();
    }
}
