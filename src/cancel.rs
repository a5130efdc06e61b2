use crate::{mutex::Mutex, Cancellation};
use std::{
    cmp, fmt, mem,
    sync::{Arc, Weak},
    thread::{self, Thread},
    time::{Duration, Instant},
};

/// A cooperative cancellation signal handed to blocking queue operations.
///
/// A token fires either when [`cancel`] is called on it (or on any token it
/// was derived from) or when its deadline passes. Clones share the same state,
/// so one clone can be canceled from another thread while a call blocks on a
/// different clone.
///
/// Tokens only interrupt calls which actually block: an operation that can
/// complete immediately does so even if its token already fired.
///
/// # Examples
///
/// ```
/// use bloque::{Bloque, CancelToken, Cancellation, Error};
/// use std::time::Duration;
///
/// let queue = Bloque::<u32>::new();
/// let token = CancelToken::with_timeout(Duration::from_millis(10));
/// assert_eq!(
///     queue.pop(&token),
///     Err(Error::Canceled(Cancellation::DeadlineExceeded)),
/// );
/// ```
///
/// [`cancel`]: CancelToken::cancel
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

struct Inner {
    deadline: Option<Instant>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    cause: Option<Cancellation>,
    next_id: usize,
    parked: Vec<(usize, Thread)>,
    children: Vec<Weak<Inner>>,
}

impl Inner {
    fn new(deadline: Option<Instant>, cause: Option<Cancellation>) -> Self {
        Self {
            deadline,
            state: Mutex::new(State {
                cause,
                ..State::default()
            }),
        }
    }

    fn is_expired(&self) -> bool {
        self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }

    fn cancel(&self, cause: Cancellation) {
        // An already expired token keeps reporting the deadline.
        let cause = match self.is_expired() {
            true => Cancellation::DeadlineExceeded,
            false => cause,
        };

        let (parked, children) = {
            let mut state = self.state.lock();
            if state.cause.is_some() {
                return;
            }

            state.cause = Some(cause);
            (
                mem::take(&mut state.parked),
                mem::take(&mut state.children),
            )
        };

        for (_, thread) in parked {
            thread.unpark();
        }

        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel(cause);
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("deadline", &self.inner.deadline)
            .field("cancellation", &self.cancellation())
            .finish()
    }
}

impl CancelToken {
    /// Creates a token which only fires when [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::from_inner(Inner::new(None, None))
    }

    /// Creates a token which fires once `timeout` has elapsed from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(deadline_after(timeout))
    }

    /// Creates a token which fires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::from_inner(Inner::new(Some(deadline), None))
    }

    /// Derives a token which is canceled along with `self` but can also be
    /// canceled on its own without affecting `self`.
    pub fn child(&self) -> Self {
        self.derive(None)
    }

    /// Like [`child`](Self::child), but also fires once `timeout` has elapsed.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        self.derive(Some(deadline_after(timeout)))
    }

    /// Like [`child`](Self::child), but also fires at `deadline`.
    /// The child never outlives the parent's own deadline.
    pub fn child_with_deadline(&self, deadline: Instant) -> Self {
        self.derive(Some(deadline))
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        let deadline = match (self.inner.deadline, deadline) {
            (Some(parent), Some(child)) => Some(cmp::min(parent, child)),
            (parent, child) => parent.or(child),
        };

        let mut state = self.inner.state.lock();
        if let Some(cause) = state.cause {
            return Self::from_inner(Inner::new(deadline, Some(cause)));
        }

        let child = Self::from_inner(Inner::new(deadline, None));
        state.children.retain(|weak| weak.strong_count() > 0);
        state.children.push(Arc::downgrade(&child.inner));
        child
    }

    fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Fires the token, waking up every call blocked on it or on a token
    /// derived from it. Canceling more than once has no further effect.
    pub fn cancel(&self) {
        self.inner.cancel(Cancellation::Canceled);
    }

    /// Returns why the token fired, if it did.
    pub fn cancellation(&self) -> Option<Cancellation> {
        let cause = self.inner.state.lock().cause;
        cause.or_else(|| match self.inner.is_expired() {
            true => Some(Cancellation::DeadlineExceeded),
            false => None,
        })
    }

    /// Returns true once the token was canceled or its deadline passed.
    pub fn is_canceled(&self) -> bool {
        self.cancellation().is_some()
    }

    /// The instant at which the token fires on its own, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Registers the current thread to be unparked when the token is canceled.
    /// The registration is dropped along with the returned guard.
    pub(crate) fn subscribe(&self) -> Subscription<'_> {
        let mut state = self.inner.state.lock();
        let id = state.next_id;
        state.next_id = id.wrapping_add(1);
        if state.cause.is_none() {
            state.parked.push((id, thread::current()));
        }

        Subscription {
            inner: &self.inner,
            id,
        }
    }
}

/// Keeps a parked thread reachable from its [`CancelToken`].
pub(crate) struct Subscription<'a> {
    inner: &'a Inner,
    id: usize,
}

impl<'a> Drop for Subscription<'a> {
    fn drop(&mut self) {
        let id = self.id;
        let mut state = self.inner.state.lock();
        state.parked.retain(|&(parked_id, _)| parked_id != id);
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    // Saturate absurd timeouts to something still representable.
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365 * 30))
}

#[cfg(test)]
mod tests {
    use crate::{CancelToken, Cancellation};
    use std::{
        sync::mpsc::channel,
        thread,
        time::{Duration, Instant},
    };

    #[test]
    fn smoke() {
        let token = CancelToken::new();
        assert!(!token.is_canceled());
        assert_eq!(token.deadline(), None);

        token.cancel();
        token.cancel();
        assert_eq!(token.cancellation(), Some(Cancellation::Canceled));
    }

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_canceled());
    }

    #[test]
    fn deadline_expires() {
        let token = CancelToken::with_timeout(Duration::from_millis(1));
        assert!(token.deadline().is_some());

        thread::sleep(Duration::from_millis(5));
        assert_eq!(token.cancellation(), Some(Cancellation::DeadlineExceeded));

        // The deadline already fired, so cancel() doesn't change the reason.
        token.cancel();
        assert_eq!(token.cancellation(), Some(Cancellation::DeadlineExceeded));
    }

    #[test]
    fn huge_timeout_does_not_overflow() {
        let token = CancelToken::with_timeout(Duration::from_secs(u64::max_value()));
        assert!(!token.is_canceled());
    }

    #[test]
    fn cancel_propagates_to_children() {
        let parent = CancelToken::new();
        let child = parent.child();
        let grandchild = child.child_with_timeout(Duration::from_secs(60));

        child.cancel();
        assert!(!parent.is_canceled());
        assert_eq!(grandchild.cancellation(), Some(Cancellation::Canceled));

        let sibling = parent.child();
        parent.cancel();
        assert_eq!(sibling.cancellation(), Some(Cancellation::Canceled));

        let late = parent.child();
        assert_eq!(late.cancellation(), Some(Cancellation::Canceled));
    }

    #[test]
    fn child_deadline_is_bounded_by_parent() {
        let deadline = Instant::now() + Duration::from_secs(10);
        let parent = CancelToken::with_deadline(deadline);

        let later = parent.child_with_timeout(Duration::from_secs(60));
        assert_eq!(later.deadline(), Some(deadline));

        let inherited = parent.child();
        assert_eq!(inherited.deadline(), Some(deadline));

        let sooner = deadline - Duration::from_secs(5);
        assert_eq!(parent.child_with_deadline(sooner).deadline(), Some(sooner));
    }

    #[test]
    fn cancel_unparks_subscribers() {
        let token = CancelToken::new();
        let (tx, rx) = channel();

        let t = {
            let token = token.clone();
            thread::spawn(move || {
                let _subscription = token.subscribe();
                tx.send(()).unwrap();
                while !token.is_canceled() {
                    thread::park();
                }
            })
        };

        rx.recv().unwrap();
        token.cancel();
        t.join().unwrap();
        assert!(token.inner.state.lock().parked.is_empty());
    }

    #[test]
    fn subscription_unregisters_on_drop() {
        let token = CancelToken::new();
        {
            let _a = token.subscribe();
            let _b = token.subscribe();
            assert_eq!(token.inner.state.lock().parked.len(), 2);
        }
        assert!(token.inner.state.lock().parked.is_empty());
    }

    #[test]
    fn test_debug_cancel_token() {
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            format!("{:?}", token),
            "CancelToken { deadline: None, cancellation: Some(Canceled) }"
        );
    }
}
