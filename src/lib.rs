//! A bounded, thread-safe FIFO blocking queue.
//!
//! [`Bloque`] lets producer and consumer threads hand items to each other:
//! [`pop`](Bloque::pop) blocks while the queue is empty and, when a capacity is
//! configured, [`push`](Bloque::push) blocks while it is full. Blocked calls are
//! served in arrival order and every one of them takes a [`CancelToken`] which
//! can interrupt it, either explicitly or once a deadline passes.
//!
//! The number of threads allowed to block on each side can be capped, in
//! which case calls past the cap fail fast with [`Error::MaxWaiters`].
//!
//! [`close`](Bloque::close) shuts the queue down: blocked calls are released,
//! pushes start failing with [`Error::Closed`] and pops drain what is left
//! before failing the same way.
//!
//! # Examples
//!
//! ```
//! use bloque::{Builder, CancelToken, Error};
//! use std::{sync::Arc, thread, time::Duration};
//!
//! let queue = Arc::new(Builder::new().capacity(2).build());
//! let token = CancelToken::new();
//!
//! let consumer = {
//!     let queue = queue.clone();
//!     let token = token.clone();
//!     thread::spawn(move || {
//!         let mut sum = 0;
//!         loop {
//!             match queue.pop(&token) {
//!                 Ok(n) => sum += n,
//!                 Err(Error::Closed) => return sum,
//!                 Err(e) => panic!("unexpected error: {}", e),
//!             }
//!         }
//!     })
//! };
//!
//! for n in 1..=10 {
//!     queue.push(&token, n).unwrap();
//! }
//! queue.close();
//!
//! assert_eq!(consumer.join().unwrap(), 55);
//!
//! // Pushing after close hands the item back.
//! let err = queue.push(&CancelToken::with_timeout(Duration::from_secs(1)), 11).unwrap_err();
//! assert_eq!(err.error(), Error::Closed);
//! assert_eq!(err.into_inner(), 11);
//! ```
#![warn(
    rust_2018_idioms,
    unreachable_pub,
    // missing_docs
    missing_debug_implementations
)]

mod builder;
mod cancel;
mod error;
mod mutex;
mod queue;
mod shared;
mod waiter;

pub use self::{
    builder::Builder,
    cancel::CancelToken,
    error::{Cancellation, Error, PushError},
    queue::Bloque,
};
