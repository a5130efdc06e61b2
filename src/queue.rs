use crate::{
    builder::{Builder, Limits},
    mutex::{Mutex, MutexGuard},
    waiter::{WaitList, Waiter},
    CancelToken, Error, PushError,
};
use std::{collections::VecDeque, fmt, mem};

/// A FIFO queue shared between threads where `pop()` blocks while the queue
/// is empty and, when bounded, `push()` blocks while it is full.
///
/// Blocked calls are served in the order they started waiting, can be
/// interrupted with a [`CancelToken`], and are released with
/// [`Error::Closed`] once the queue is [closed](Bloque::close).
///
/// # Examples
///
/// ```
/// use bloque::{Bloque, CancelToken};
/// use std::{sync::Arc, thread};
///
/// let queue = Arc::new(Bloque::bounded(1));
/// let token = CancelToken::new();
///
/// let producer = {
///     let queue = queue.clone();
///     let token = token.clone();
///     thread::spawn(move || {
///         for i in 0..10 {
///             queue.push(&token, i).unwrap();
///         }
///         queue.close();
///     })
/// };
///
/// let mut received = Vec::new();
/// while let Ok(i) = queue.pop(&token) {
///     received.push(i);
/// }
///
/// producer.join().unwrap();
/// assert_eq!(received, (0..10).collect::<Vec<_>>());
/// ```
pub struct Bloque<T> {
    pub(crate) limits: Limits,
    state: Mutex<State<T>>,
}

struct State<T> {
    items: VecDeque<T>,
    push_waiters: WaitList,
    pop_waiters: WaitList,
    closed: bool,
}

#[derive(Copy, Clone, Debug)]
enum Side {
    Push,
    Pop,
}

impl<T> State<T> {
    fn waiters(&mut self, side: Side) -> &mut WaitList {
        match side {
            Side::Push => &mut self.push_waiters,
            Side::Pop => &mut self.pop_waiters,
        }
    }
}

impl<T> Default for Bloque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Bloque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Bloque")
            .field("len", &state.items.len())
            .field("capacity", &self.capacity())
            .field("push_waiters", &state.push_waiters.len())
            .field("pop_waiters", &state.pop_waiters.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl<T> Bloque<T> {
    /// Creates an unbounded queue.
    pub fn new() -> Self {
        Builder::new().build()
    }

    /// Creates a queue holding at most `capacity` items. A capacity of `0`
    /// means unbounded.
    pub fn bounded(capacity: usize) -> Self {
        Builder::new().capacity(capacity).build()
    }

    pub(crate) fn from_limits(limits: Limits) -> Self {
        Self {
            limits,
            state: Mutex::new(State {
                items: VecDeque::new(),
                push_waiters: WaitList::default(),
                pop_waiters: WaitList::default(),
                closed: false,
            }),
        }
    }

    /// Appends `item` to the back of the queue.
    ///
    /// While the queue is at capacity, the call blocks until an item is
    /// popped, `token` fires, or the queue is closed.
    ///
    /// # Errors
    ///
    /// The item is handed back inside the [`PushError`] along with:
    /// - [`Error::Closed`] if the queue is or gets closed.
    /// - [`Error::MaxWaiters`] if the call would block but the configured
    ///   number of blocked pushes was already reached.
    /// - [`Error::Canceled`] if `token` fired while blocked.
    pub fn push(&self, token: &CancelToken, item: T) -> Result<(), PushError<T>> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(PushError::new(item, Error::Closed));
            }

            if !self.limits.is_full(state.items.len()) {
                break;
            }

            if self.limits.push_waiters_reached(state.push_waiters.len()) {
                return Err(PushError::new(item, Error::MaxWaiters));
            }

            // Woken up with the queue still full means another push got the slot first.
            if let Err(error) = Self::block(&mut state, token, Side::Push) {
                return Err(PushError::new(item, error));
            }
        }

        state.items.push_back(item);
        state.pop_waiters.wake_next();
        Ok(())
    }

    /// Removes the item at the front of the queue.
    ///
    /// While the queue is empty, the call blocks until an item is pushed,
    /// `token` fires, or the queue is closed. Items still buffered when the
    /// queue is closed keep being returned until it's drained.
    ///
    /// # Errors
    ///
    /// - [`Error::Closed`] if the queue is closed and empty.
    /// - [`Error::MaxWaiters`] if the call would block but the configured
    ///   number of blocked pops was already reached.
    /// - [`Error::Canceled`] if `token` fired while blocked.
    pub fn pop(&self, token: &CancelToken) -> Result<T, Error> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                state.push_waiters.wake_next();
                return Ok(item);
            }

            if state.closed {
                return Err(Error::Closed);
            }

            if self.limits.pop_waiters_reached(state.pop_waiters.len()) {
                return Err(Error::MaxWaiters);
            }

            Self::block(&mut state, token, Side::Pop)?;
        }
    }

    /// Registers a waiter on the `side` list and waits on it with the lock
    /// released. Returns with the lock held again.
    #[cold]
    fn block(
        state: &mut MutexGuard<'_, State<T>>,
        token: &CancelToken,
        side: Side,
    ) -> Result<(), Error> {
        let waiter = Waiter::new();
        let waiters = state.waiters(side);
        waiters.enqueue(waiter.clone());
        tracing::trace!(?side, waiters = waiters.len(), "blocking on queue");

        let cancellation = MutexGuard::unlocked(state, || {
            waiter
                .wait(token)
                .map_err(|cancellation| (cancellation, waiter.abandon()))
        });

        let (cancellation, fired) = match cancellation {
            Ok(()) => return Ok(()),
            Err(canceled) => canceled,
        };

        // Being fired took us off the list already. The wake-up we got was
        // meant for someone still interested so pass it on.
        if fired {
            let forwarded = state.waiters(side).wake_next();
            tracing::trace!(?side, ?cancellation, forwarded, "canceled after wake-up");
        } else {
            state.waiters(side).remove(&waiter);
            tracing::trace!(?side, ?cancellation, "canceled while blocked");
        }

        Err(Error::Canceled(cancellation))
    }

    /// Closes the queue. Idempotent.
    ///
    /// Every blocked push and pop is woken up. Pushes fail with
    /// [`Error::Closed`] from now on while pops keep draining whatever is
    /// still buffered before failing the same way.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if mem::replace(&mut state.closed, true) {
            return;
        }

        let push_woken = state.push_waiters.wake_all();
        let pop_woken = state.pop_waiters.wake_all();
        tracing::debug!(
            len = state.items.len(),
            push_woken,
            pop_woken,
            "queue closed"
        );
    }

    /// Returns true once [`close`](Bloque::close) was called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured capacity, or `None` if the queue is unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.limits.capacity.map(|capacity| capacity.get())
    }

    /// Number of calls currently blocked in [`push`](Bloque::push).
    pub fn push_waiters(&self) -> usize {
        self.state.lock().push_waiters.len()
    }

    /// Number of calls currently blocked in [`pop`](Bloque::pop).
    pub fn pop_waiters(&self) -> usize {
        self.state.lock().pop_waiters.len()
    }
}
