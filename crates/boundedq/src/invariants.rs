//! Debug assertion macros for the ring counter protocol.
//!
//! Active only in debug builds (`debug_assertions`); release builds compile
//! them to nothing. Used by both `SpRing<T, N>` and `MpRing<T, N>`.

/// Assert that the in-flight window between two counters stays below the
/// slot count.
///
/// The protocol keeps `upper - lower < N` at all times (one slot is
/// sacrificed to tell full from empty), so a wider window means a counter
/// was corrupted or advanced out of order.
macro_rules! debug_assert_window {
    ($label:literal, $lower:expr, $upper:expr, $slots:expr) => {
        debug_assert!(
            ($upper.wrapping_sub($lower) as usize) < $slots,
            "{} window out of bounds: lower={} upper={} slots={}",
            $label,
            $lower,
            $upper,
            $slots
        )
    };
}

pub(crate) use debug_assert_window;
