use super::SpinWait;
use crate::{CancelToken, Cancellation};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread::{self, Thread},
    time::Instant,
};

/// One-shot notification owned by the thread that creates it.
///
/// [`set`](Signal::set) may be called from any thread; [`wait`](Signal::wait)
/// must only be called from the creating thread since that's the one which
/// gets unparked.
pub(crate) struct Signal {
    thread: Thread,
    is_set: AtomicBool,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Self {
            thread: thread::current(),
            is_set: AtomicBool::new(false),
        }
    }

    /// Acquire barrier ensures the set() happens before we observe it.
    #[inline]
    pub(crate) fn is_set(&self) -> bool {
        self.is_set.load(Ordering::Acquire)
    }

    pub(crate) fn set(&self) {
        // Release barrier ensures writes made by the waker happen before is_set() sees true.
        self.is_set.store(true, Ordering::Release);
        self.thread.unpark();
    }

    /// Blocks until the signal is set or `token` fires, whichever happens first.
    /// A set signal wins over a token which fired at the same time.
    pub(crate) fn wait(&self, token: &CancelToken) -> Result<(), Cancellation> {
        debug_assert_eq!(self.thread.id(), thread::current().id());

        // Spin a little bit in hopes that another thread sets us soon.
        let mut spin = SpinWait::default();
        while spin.try_yield_now() {
            if self.is_set() {
                return Ok(());
            }
        }

        self.wait_slow(token)
    }

    #[cold]
    fn wait_slow(&self, token: &CancelToken) -> Result<(), Cancellation> {
        let _subscription = token.subscribe();
        loop {
            if self.is_set() {
                return Ok(());
            }

            if let Some(cancellation) = token.cancellation() {
                return Err(cancellation);
            }

            // Parking can return spuriously, everything is re-checked above.
            match token.deadline() {
                None => thread::park(),
                Some(deadline) => {
                    if let Some(timeout) = deadline.checked_duration_since(Instant::now()) {
                        thread::park_timeout(timeout);
                    }
                }
            }
        }
    }
}
