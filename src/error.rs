use std::{error, fmt};
use thiserror::Error;

/// The reason a [`CancelToken`] stopped a blocked call.
///
/// [`CancelToken`]: crate::CancelToken
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
pub enum Cancellation {
    /// [`CancelToken::cancel`](crate::CancelToken::cancel) was called on the
    /// token or one of its ancestors.
    #[error("operation canceled")]
    Canceled,
    /// The token's deadline passed before the call could complete.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Errors returned by [`Bloque`] operations.
///
/// [`Bloque`]: crate::Bloque
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
pub enum Error {
    /// The call had to block but the configured waiter limit was already
    /// reached. Returned without blocking.
    #[error("max waiters reached")]
    MaxWaiters,
    /// The queue was closed, and for pops, has been drained.
    #[error("queue closed")]
    Closed,
    /// The call was blocked and its token fired first.
    #[error(transparent)]
    Canceled(#[from] Cancellation),
}

impl Error {
    /// Returns true if the call gave up because of its [`CancelToken`](crate::CancelToken).
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled(_))
    }
}

/// An error returned from [`Bloque::push`] which hands back the item that
/// could not be queued.
///
/// [`Bloque::push`]: crate::Bloque::push
#[derive(Clone, PartialEq, Eq)]
pub struct PushError<T> {
    item: T,
    error: Error,
}

impl<T> PushError<T> {
    pub(crate) fn new(item: T, error: Error) -> Self {
        Self { item, error }
    }

    /// Why the push failed.
    pub fn error(&self) -> Error {
        self.error
    }

    /// Takes back the item that was not pushed.
    pub fn into_inner(self) -> T {
        self.item
    }
}

impl<T> From<PushError<T>> for Error {
    fn from(err: PushError<T>) -> Self {
        err.error
    }
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T> error::Error for PushError<T> {}
