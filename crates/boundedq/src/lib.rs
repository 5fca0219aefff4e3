//! Bounded queue primitives for thread-to-thread handoff.
//!
//! Three building blocks compose bottom-up:
//!
//! - [`BlockingQueue`] — a mutex/condvar FIFO with blocking push/pop,
//!   non-blocking variants, and a timed pop for pollable waits.
//! - [`SpRing`] / [`MpRing`] — lock-free bounded rings over a fixed slot
//!   array. The single-producer variant pushes wait-free; the multi-producer
//!   variant reserves slots by CAS and commits them in reservation order.
//!   Both are safe for any number of consumers.
//! - [`Consumer`] — a dedicated worker thread that drains a [`BlockingQueue`]
//!   through a user-supplied handler until asked to stop.
//!
//! # Example
//!
//! ```
//! use boundedq::Consumer;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! let seen = Arc::new(AtomicU64::new(0));
//! let sink = Arc::clone(&seen);
//! let mut worker = Consumer::new(move |n: u64| {
//!     sink.fetch_add(n, Ordering::Relaxed);
//! });
//!
//! for n in 1..=10 {
//!     worker.produce_or_block(n);
//! }
//! worker.drain_and_join().unwrap();
//! assert_eq!(seen.load(Ordering::Relaxed), 55);
//! ```
//!
//! # Feature flags
//!
//! - `exact-len` — the rings maintain an exact live-element counter, making
//!   [`SpRing::len`]/[`MpRing::len`] precise at the cost of an extra atomic
//!   per successful push/pop. Without it, `len()` and `is_full()` are
//!   best-effort snapshots.
//! - `loom` — enables the loom-based concurrency tests.

mod blocking;
mod config;
mod invariants;
mod mp_ring;
mod sp_ring;
mod worker;

pub use blocking::{BlockingQueue, QueueFull};
pub use config::WorkerConfig;
pub use mp_ring::MpRing;
pub use sp_ring::SpRing;
pub use worker::Consumer;
