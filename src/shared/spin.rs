use std::{
    hint::spin_loop,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

/// Bounded busy-waiting done before a thread commits to parking.
#[derive(Default)]
pub(crate) struct SpinWait {
    counter: usize,
}

impl SpinWait {
    /// Upper bound on spins. Same ballpark as glibc's PTHREAD_MUTEX_ADAPTIVE_SPIN.
    const LIMIT: usize = 100;

    /// Spins once and returns true, or returns false once spinning stops paying off.
    pub(crate) fn try_yield_now(&mut self) -> bool {
        // Spinning on a single core only delays the thread we're waiting on.
        if self.counter >= Self::LIMIT || !is_multi_core() {
            return false;
        }

        self.counter += 1;
        spin_loop();
        true
    }
}

static NUM_CPUS: AtomicUsize = AtomicUsize::new(0);

#[inline]
fn is_multi_core() -> bool {
    let num_cpus = match NUM_CPUS.load(Ordering::Relaxed) {
        0 => num_cpus_slow(),
        n => n,
    };
    num_cpus > 1
}

#[cold]
fn num_cpus_slow() -> usize {
    let num_cpus = thread::available_parallelism().map_or(1, |n| n.get());
    NUM_CPUS.store(num_cpus, Ordering::Relaxed);
    num_cpus
}

#[cfg(test)]
mod tests {
    use super::SpinWait;

    #[test]
    fn spinning_is_bounded() {
        let mut spin = SpinWait::default();
        let mut spins = 0;
        while spin.try_yield_now() {
            spins += 1;
        }
        assert!(spins <= SpinWait::LIMIT);
        assert!(!spin.try_yield_now());
    }
}
