use crate::Bloque;
use std::num::NonZeroUsize;

/// Configuration for a [`Bloque`].
///
/// Every limit defaults to `0`, which means unbounded.
///
/// # Examples
///
/// ```
/// use bloque::{Bloque, Builder};
///
/// let queue: Bloque<String> = Builder::new()
///     .capacity(128)
///     .max_push_waiters(4)
///     .build();
/// assert_eq!(queue.capacity(), Some(128));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Builder {
    capacity: usize,
    max_push_waiters: usize,
    max_pop_waiters: usize,
}

impl Builder {
    /// Creates a configuration for an unbounded queue with no waiter limits.
    pub const fn new() -> Self {
        Self {
            capacity: 0,
            max_push_waiters: 0,
            max_pop_waiters: 0,
        }
    }

    /// Maximum number of buffered items. Once reached, [`push`](Bloque::push)
    /// blocks until an item is popped.
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Maximum number of threads blocked in [`push`](Bloque::push) at once.
    /// Pushes past that fail with [`Error::MaxWaiters`](crate::Error::MaxWaiters).
    pub const fn max_push_waiters(mut self, max_waiters: usize) -> Self {
        self.max_push_waiters = max_waiters;
        self
    }

    /// Maximum number of threads blocked in [`pop`](Bloque::pop) at once.
    /// Pops past that fail with [`Error::MaxWaiters`](crate::Error::MaxWaiters).
    pub const fn max_pop_waiters(mut self, max_waiters: usize) -> Self {
        self.max_pop_waiters = max_waiters;
        self
    }

    /// Creates the queue.
    pub fn build<T>(self) -> Bloque<T> {
        Bloque::from_limits(Limits {
            capacity: NonZeroUsize::new(self.capacity),
            max_push_waiters: NonZeroUsize::new(self.max_push_waiters),
            max_pop_waiters: NonZeroUsize::new(self.max_pop_waiters),
        })
    }
}

/// [`Builder`] settings where `None` means unbounded.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Limits {
    pub(crate) capacity: Option<NonZeroUsize>,
    pub(crate) max_push_waiters: Option<NonZeroUsize>,
    pub(crate) max_pop_waiters: Option<NonZeroUsize>,
}

impl Limits {
    pub(crate) fn is_full(&self, len: usize) -> bool {
        self.capacity.map_or(false, |capacity| len >= capacity.get())
    }

    pub(crate) fn push_waiters_reached(&self, waiters: usize) -> bool {
        limit_reached(self.max_push_waiters, waiters)
    }

    pub(crate) fn pop_waiters_reached(&self, waiters: usize) -> bool {
        limit_reached(self.max_pop_waiters, waiters)
    }
}

fn limit_reached(limit: Option<NonZeroUsize>, waiters: usize) -> bool {
    limit.map_or(false, |max| waiters >= max.get())
}
