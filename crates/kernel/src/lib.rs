//! Fibonacci kernel shared by the WebAssembly guest and the native host.
//!
//! Convention: F(0) = 0, F(1) = 1, F(k) = F(k-1) + F(k-2).
//! Results are `i64` and wrap on overflow (the first wrapped value is F(93)),
//! regardless of whether the build enables overflow checks.
#![cfg_attr(not(test), no_std)]

/// Compute F(n) in `n` steps with two accumulators.
#[must_use]
pub fn fib(n: u32) -> i64 {
    let (mut acc1, mut acc2) = (0_i64, 1_i64);
    let mut remaining = n;
    loop {
        match remaining {
            0 => return acc1,
            1 => return acc2,
            _ => {
                (acc1, acc2) = (acc2, acc1.wrapping_add(acc2));
                remaining -= 1;
            }
        }
    }
}

/// Accumulator-passing recursive formulation of [`fib`].
///
/// Returns the same values as [`fib`] but uses one stack frame per step,
/// so it is only suitable as a cross-check for small `n`.
#[must_use]
pub fn fib_recursive(n: u32) -> i64 {
    fn aux(n: u32, acc1: i64, acc2: i64) -> i64 {
        match n {
            0 => acc1,
            1 => acc2,
            _ => aux(n - 1, acc2, acc1.wrapping_add(acc2)),
        }
    }
    aux(n, 0, 1)
}

/// Run [`fib`] `count` times and return the last result.
///
/// Returns 0 when `count` is 0, in which case the kernel is never invoked.
/// Timing is up to the caller.
#[must_use]
pub fn test(n: u32, count: u32) -> i64 {
    let mut last = 0;
    for _ in 0..count {
        last = fib(core::hint::black_box(n));
    }
    last
}

#[cfg(test)]
mod tests {
    use super::{fib, fib_recursive, test};
    use rstest::rstest;

    // F(50) is the largest value checked against a table, F(92) the largest that fits into i64.
    const MAX_TABLE_N: u32 = 50;
    const MAX_EXACT_N: u32 = 92;

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(2, 1)]
    #[case(3, 2)]
    #[case(4, 3)]
    #[case(5, 5)]
    #[case(6, 8)]
    #[case(7, 13)]
    #[case(10, 55)]
    #[case(20, 6765)]
    #[case(30, 832_040)]
    #[case(40, 102_334_155)]
    #[case(50, 12_586_269_025)]
    #[case(92, 7_540_113_804_746_346_429)]
    fn fib_matches_canonical_sequence(#[case] n: u32, #[case] expected: i64) {
        assert_eq!(expected, fib(n));
    }

    #[test]
    fn fib_satisfies_recurrence() {
        for n in 2..=MAX_TABLE_N {
            assert_eq!(fib(n - 1) + fib(n - 2), fib(n), "n = {n}");
        }
    }

    #[test]
    fn fib_is_idempotent() {
        for n in 0..=MAX_TABLE_N {
            assert_eq!(fib(n), fib(n));
        }
    }

    #[test]
    fn recursive_and_iterative_agree() {
        for n in 0..=MAX_EXACT_N + 8 {
            assert_eq!(fib(n), fib_recursive(n), "n = {n}");
        }
    }

    #[test]
    fn fib_is_monotonic_until_overflow() {
        for n in 1..MAX_EXACT_N {
            assert!(fib(n + 1) >= fib(n), "n = {n}");
        }
    }

    #[test]
    fn overflow_wraps_silently() {
        let wrapped = fib(MAX_EXACT_N + 1);
        assert_eq!(fib(91).wrapping_add(fib(92)), wrapped);
        assert_eq!(-6_246_583_658_587_674_878, wrapped);
        assert!(wrapped < 0);
    }

    #[rstest]
    fn test_returns_fib_for_any_positive_count(
        #[values(0, 1, 2, 10, 20, 50)] n: u32,
        #[values(1, 2, 7, 100)] count: u32,
    ) {
        assert_eq!(fib(n), test(n, count));
    }

    #[rstest]
    fn test_with_zero_count_returns_zero(#[values(0, 1, 10, 50)] n: u32) {
        assert_eq!(0, test(n, 0));
    }
}
