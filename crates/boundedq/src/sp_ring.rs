use crate::invariants::debug_assert_window;
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// SINGLE-PRODUCER PROTOCOL
// =============================================================================
//
// The ring holds N slots addressed by two monotonically increasing u64
// counters, wrapped onto the array with `seq & (N - 1)`. One slot is always
// left free so that full and empty remain distinguishable:
//
//   empty  <=>  index(read) == index(write)
//   full   <=>  index(write + 1) == index(read)
//
// The sole producer needs no reservation step: `write` itself is the publish
// barrier. Push is wait-free:
//
//   1. Load `write` (Relaxed - only this thread stores it).
//   2. Load `read` (Acquire - synchronizes with consumers' claim CAS, so a
//      slot is never overwritten while its previous value is still being
//      copied out by the consumer that claimed it).
//   3. Full check on the wrapped indices; store the value into the slot.
//   4. Store `write + 1` (Release - publishes the slot store).
//
// Pop is shared with the multi-producer ring: consumers claim a sequence by
// CAS on `read` (Acquire to observe the producer's publish, Release toward
// peer consumers). The slot is copied out *before* the CAS, because after a
// successful claim the producer may immediately reuse the slot; a consumer
// that loses the CAS simply discards its local copy. `T: Copy` makes that
// discard free of drop obligations.
// =============================================================================

/// Lock-free bounded ring, single-producer variant.
///
/// `N` is the slot count and must be a power of two; the usable capacity is
/// `N - 1`. Push is wait-free; pop is lock-free and safe for any number of
/// consumer threads.
///
/// Only one thread may push at a time. The single-producer protocol skips
/// the reservation CAS entirely, so concurrent pushers would race on the
/// same slot — use [`MpRing`](crate::MpRing) for that.
pub struct SpRing<T, const N: usize> {
    /// Next sequence the producer will fill; publish bound for consumers.
    write: CachePadded<AtomicU64>,
    /// Next sequence a consumer may claim. Advanced by CAS.
    read: CachePadded<AtomicU64>,
    /// Exact live-element count, maintained on every successful push/pop.
    #[cfg(feature = "exact-len")]
    live: CachePadded<AtomicU64>,
    slots: UnsafeCell<[MaybeUninit<T>; N]>,
}

// Safety: values move through the ring by copy; the counter protocol hands
// each slot to exactly one producer store and one consumer load at a time.
unsafe impl<T: Send, const N: usize> Send for SpRing<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for SpRing<T, N> {}

impl<T: Copy, const N: usize> SpRing<T, N> {
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

    /// Appends `value` if a slot is free. Wait-free; returns `false` when
    /// the ring is full.
    pub fn push(&self, value: T) -> bool {
        let write = self.write.load(Ordering::Relaxed);
        let read = self.read.load(Ordering::Acquire);
        let next = write.wrapping_add(1);
        if Self::index(next) == Self::index(read) {
            return false;
        }

        // SAFETY: the full check proves this slot lies outside the live
        // window, and no consumer reads it until the Release store below
        // publishes it.
        unsafe {
            let base = self.slots.get().cast::<MaybeUninit<T>>();
            (*base.add(Self::index(write))).write(value);
        }

        // The increment precedes the Release store so any consumer that
        // observes the published slot also observes the new count; the
        // matching decrement can then never underflow.
        #[cfg(feature = "exact-len")]
        self.live.fetch_add(1, Ordering::Relaxed);

        debug_assert_window!("sp write", read, next, N);
        self.write.store(next, Ordering::Release);

        true
    }

    /// Removes the oldest element, if any.
    ///
    /// Safe to call from several consumer threads concurrently; each element
    /// is delivered to exactly one caller. Returns `None` when empty.
    pub fn pop(&self) -> Option<T> {
        loop {
            let read = self.read.load(Ordering::Relaxed);
            let write = self.write.load(Ordering::Acquire);
            if Self::index(read) == Self::index(write) {
                return None;
            }

            // SAFETY: `read != write` (mod N) proves the slot was published
            // by the Release store in `push`, which the Acquire load above
            // synchronizes with. The copy races with a producer overwrite
            // only after a peer consumer claims this sequence first, and in
            // that case the CAS below fails and the copy is discarded.
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
    /// the counters; may be transiently off under concurrent traffic.
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

    /// Returns `true` when the ring holds no published elements. Approximate
    /// under concurrent traffic for the same reason as [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        let read = self.read.load(Ordering::Relaxed);
        let write = self.write.load(Ordering::Relaxed);
        Self::index(read) == Self::index(write)
    }

    /// Returns `true` when no slot is free. Approximate under concurrent
    /// traffic.
    pub fn is_full(&self) -> bool {
        let read = self.read.load(Ordering::Relaxed);
        let write = self.write.load(Ordering::Relaxed);
        Self::index(write.wrapping_add(1)) == Self::index(read)
    }

    /// Test-only: start both counters at `seq` to exercise wrap-around.
    #[cfg(test)]
    fn seeded(seq: u64) -> Self {
        let ring = Self::new();
        ring.write.store(seq, Ordering::Relaxed);
        ring.read.store(seq, Ordering::Relaxed);
        ring
    }
}

impl<T: Copy, const N: usize> Default for SpRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
