use crate::invariants::debug_assert_window;
use crossbeam_utils::{Backoff, CachePadded};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// MULTI-PRODUCER PROTOCOL
// =============================================================================
//
// Layout and index arithmetic are shared with `SpRing`: N slots, wrapped u64
// counters, one slot sacrificed so full and empty stay distinguishable.
//
// With several producers, `write` alone cannot be the publish barrier: a
// producer that has reserved a slot but not yet stored into it must not be
// visible to consumers. A third counter closes the gap:
//
//   read <= commit <= write        (modular, differences < N)
//
// Push is a three-step protocol:
//
//   1. RESERVE - CAS `write` from `cur` to `cur + 1` (AcqRel). Winning the
//      CAS grants exclusive ownership of slot index(cur). The full check
//      compares against `read` (Acquire), counting reserved slots as
//      occupied.
//   2. STORE   - plain write into the owned slot; no other thread touches it.
//   3. COMMIT  - CAS `commit` from `cur` to `cur + 1` (Release). This can
//      only succeed once every earlier reservation has committed, so
//      `commit` advances in exactly the order `write` was reserved and a
//      consumer never observes a committed slot whose predecessor is still
//      pending. While the predecessor is uncommitted the CAS fails and the
//      producer backs off (spin, then yield to let the predecessor run).
//
// Pop claims sequences by CAS on `read` with `commit` as the upper bound;
// otherwise identical to the single-producer pop. A producer parked forever
// inside step 3 makes the ring look producer-pending (empty) past that slot;
// nobody deadlocks, but progress past the slot waits on the scheduler.
// =============================================================================

/// Lock-free bounded ring, multi-producer variant.
///
/// `N` is the slot count and must be a power of two; the usable capacity is
/// `N - 1`. Any number of producer and consumer threads may push and pop
/// concurrently. Per-producer push order is preserved on the consumer side;
/// ordering *between* producers is decided by whichever reservation CAS wins.
pub struct MpRing<T, const N: usize> {
    /// Next sequence to reserve. Winning the CAS grants exclusive write
    /// access to that slot.
    write: CachePadded<AtomicU64>,
    /// Publish bound: slots below this sequence are committed and readable.
    /// Trails `write` while any producer holds an uncommitted reservation.
    commit: CachePadded<AtomicU64>,
    /// Next sequence a consumer may claim. Advanced by CAS.
    read: CachePadded<AtomicU64>,
    /// Exact live-element count, maintained on every successful push/pop.
    #[cfg(feature = "exact-len")]
    live: CachePadded<AtomicU64>,
    slots: UnsafeCell<[MaybeUninit<T>; N]>,
}

// Safety: values move through the ring by copy; the reservation CAS hands
// each slot to exactly one producer, the claim CAS to exactly one consumer.
unsafe impl<T: Send, const N: usize> Send for MpRing<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for MpRing<T, N> {}

impl<T: Copy, const N: usize> MpRing<T, N> {
    const MASK: u64 = (N as u64) - 1;

    /// Creates an empty ring.
    ///
    /// # Panics
    ///
    /// Panics if `N` is not a power of two or is smaller than 2.
    pub fn new() -> Self {
        assert!(
            N >= 2 && N.is_power_of_two(),
            "slot count must be a power of two >= 2"
        );
        Self {
            write: CachePadded::new(AtomicU64::new(0)),
            commit: CachePadded::new(AtomicU64::new(0)),
            read: CachePadded::new(AtomicU64::new(0)),
            #[cfg(feature = "exact-len")]
            live: CachePadded::new(AtomicU64::new(0)),
            // SAFETY: an array of MaybeUninit does not require initialization.
            slots: UnsafeCell::new(unsafe {
                MaybeUninit::<[MaybeUninit<T>; N]>::uninit().assume_init()
            }),
        }
    }

    #[inline]
    fn index(seq: u64) -> usize {
        (seq & Self::MASK) as usize
    }

    /// Usable capacity: `N - 1`.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Appends `value` if a slot is free. Lock-free; returns `false` when
    /// the ring is full (reserved slots count as occupied).
    pub fn push(&self, value: T) -> bool {
        // Reserve the next write sequence, or report full.
        let reserved = loop {
            let current = self.write.load(Ordering::Relaxed);
            let read = self.read.load(Ordering::Acquire);
            if Self::index(current.wrapping_add(1)) == Self::index(read) {
                return false;
            }
            match self.write.compare_exchange(
                current,
                current.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break current,
                // Another producer took this sequence; re-check from scratch.
                Err(_) => continue,
            }
        };

        // SAFETY: winning the reservation CAS grants exclusive ownership of
        // this slot. Consumers only read below `commit`, which cannot pass
        // `reserved` until our own commit below.
        unsafe {
            let base = self.slots.get().cast::<MaybeUninit<T>>();
            (*base.add(Self::index(reserved))).write(value);
        }

        // The increment precedes the committing CAS so any consumer that
        // observes the published slot also observes the new count.
        #[cfg(feature = "exact-len")]
        self.live.fetch_add(1, Ordering::Relaxed);

        // Commit in reservation order: the CAS succeeds only once every
        // earlier reservation has committed. On failure the predecessor is
        // still writing; back off and hand the processor over so it can
        // finish. No lock is held here, so the wait is yield-based spinning,
        // never a sleep.
        let backoff = Backoff::new();
        loop {
            match self.commit.compare_exchange(
                reserved,
                reserved.wrapping_add(1),
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(_) => backoff.snooze(),
            }
        }
        debug_assert_window!(
            "mp commit",
            self.read.load(Ordering::Relaxed),
            reserved.wrapping_add(1),
            N
        );

        true
    }

    /// Removes the oldest committed element, if any.
    ///
    /// Safe to call from several consumer threads concurrently; each element
    /// is delivered to exactly one caller. Returns `None` when the ring is
    /// empty or the next slot's producer has reserved but not yet committed.
    pub fn pop(&self) -> Option<T> {
        loop {
            let read = self.read.load(Ordering::Relaxed);
            let commit = self.commit.load(Ordering::Acquire);
            if Self::index(read) == Self::index(commit) {
                return None;
            }

            // SAFETY: `read != commit` (mod N) proves the slot was published
            // by a committing CAS, which the Acquire load above synchronizes
            // with. The copy races with a producer overwrite only after a
            // peer consumer claims this sequence first, and in that case the
            // CAS below fails and the copy is discarded.
            let value = unsafe {
                let base = self.slots.get().cast::<MaybeUninit<T>>();
                (*base.add(Self::index(read))).assume_init_read()
            };

            match self.read.compare_exchange(
                read,
                read.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    #[cfg(feature = "exact-len")]
                    self.live.fetch_sub(1, Ordering::Relaxed);
                    return Some(value);
                }
                // A peer consumer claimed the slot first.
                Err(_) => continue,
            }
        }
    }

    /// Exact number of live elements.
    #[cfg(feature = "exact-len")]
    pub fn len(&self) -> usize {
        self.live.load(Ordering::Relaxed) as usize
    }

    /// Approximate number of live elements, computed from a racy snapshot of
    /// the counters; may be transiently off under concurrent traffic and
    /// counts reserved-but-uncommitted slots.
    #[cfg(not(feature = "exact-len"))]
    pub fn len(&self) -> usize {
        let write = Self::index(self.write.load(Ordering::Relaxed));
        let read = Self::index(self.read.load(Ordering::Relaxed));
        if write >= read {
            write - read
        } else {
            write + N - read
        }
    }

    /// Returns `true` when no committed element is available. Approximate
    /// under concurrent traffic.
    pub fn is_empty(&self) -> bool {
        let read = self.read.load(Ordering::Relaxed);
        let commit = self.commit.load(Ordering::Relaxed);
        Self::index(read) == Self::index(commit)
    }

    /// Returns `true` when no slot is free. Approximate under concurrent
    /// traffic.
    pub fn is_full(&self) -> bool {
        let read = self.read.load(Ordering::Relaxed);
        let write = self.write.load(Ordering::Relaxed);
        Self::index(write.wrapping_add(1)) == Self::index(read)
    }

    /// Test-only: start all counters at `seq` to exercise wrap-around.
    #[cfg(test)]
    fn seeded(seq: u64) -> Self {
        let ring = Self::new();
        ring.write.store(seq, Ordering::Relaxed);
        ring.commit.store(seq, Ordering::Relaxed);
        ring.read.store(seq, Ordering::Relaxed);
        ring
    }
}

impl<T: Copy, const N: usize> Default for MpRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
