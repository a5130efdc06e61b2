use crate::{
    mutex::{const_mutex, Mutex},
    shared::Signal,
    CancelToken, Cancellation,
};
use std::{collections::VecDeque, fmt, sync::Arc};

/// The handshake between the call which waits and the queue which wakes it.
///
/// # State table:
///
/// waiting | fired | Description
///    1    |   0   | Registered and still interested in being woken.
/// --------+-------+--------------------------------------------------------------
///    1    |   1   | The queue committed to waking this waiter and set its signal.
/// --------+-------+--------------------------------------------------------------
///    0    |   0   | The call gave up first. Wakers skip over it.
/// --------+-------+--------------------------------------------------------------
///    0    |   1   | The call gave up after being woken. The wake-up it won
///         |       | must be forwarded to the next waiter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct WaiterState {
    waiting: bool,
    fired: bool,
}

/// A blocked `push()` or `pop()` call.
pub(crate) struct Waiter {
    signal: Signal,
    state: Mutex<WaiterState>,
}

impl fmt::Debug for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = *self.state.lock();
        f.debug_struct("Waiter")
            .field("waiting", &state.waiting)
            .field("fired", &state.fired)
            .finish()
    }
}

impl Waiter {
    /// Creates a waiter for the calling thread.
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            signal: Signal::new(),
            state: const_mutex(WaiterState {
                waiting: true,
                fired: false,
            }),
        })
    }

    /// Blocks the owning thread until fired or until `token` fires.
    pub(crate) fn wait(&self, token: &CancelToken) -> Result<(), Cancellation> {
        self.signal.wait(token)
    }

    /// Wakes the waiter if it's still interested.
    /// Returns false if the owning call already gave up.
    fn fire(&self) -> bool {
        let mut state = self.state.lock();
        if !state.waiting {
            return false;
        }

        debug_assert!(!state.fired, "Waiter fired twice");
        state.fired = true;
        self.signal.set();
        true
    }

    /// Marks the waiter as no longer interested.
    /// Returns true if it was fired first, meaning the wake-up must be passed on.
    pub(crate) fn abandon(&self) -> bool {
        let mut state = self.state.lock();
        debug_assert!(state.waiting, "Waiter abandoned twice");
        state.waiting = false;
        state.fired
    }
}

/// Oldest-first list of blocked calls waiting on the same condition.
#[derive(Default)]
pub(crate) struct WaitList {
    waiters: VecDeque<Arc<Waiter>>,
}

impl fmt::Debug for WaitList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.waiters.iter()).finish()
    }
}

impl WaitList {
    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }

    pub(crate) fn enqueue(&mut self, waiter: Arc<Waiter>) {
        self.waiters.push_back(waiter);
    }

    /// Unlinks a waiter which gave up before anyone woke it.
    pub(crate) fn remove(&mut self, waiter: &Arc<Waiter>) -> bool {
        let position = self.waiters.iter().position(|w| Arc::ptr_eq(w, waiter));
        position.and_then(|index| self.waiters.remove(index)).is_some()
    }

    /// Wakes the oldest waiter which is still interested.
    /// Waiters which gave up are dropped from the list on the way.
    pub(crate) fn wake_next(&mut self) -> bool {
        while let Some(waiter) = self.waiters.pop_front() {
            if waiter.fire() {
                return true;
            }
        }
        false
    }

    /// Wakes every waiter, returning how many were still interested.
    pub(crate) fn wake_all(&mut self) -> usize {
        self.waiters.drain(..).filter(|waiter| waiter.fire()).count()
    }
}
