//! A collection of utilities.

mod power_of_2;

pub use power_of_2::PowerOf2;

/// Returns whether the address is a multiple of `alignment`.
pub(crate) fn is_aligned(address: usize, alignment: PowerOf2) -> bool { address % alignment == 0 }

/// Returns the least common multiple of `a` and `b`, or None on overflow.
///
/// Assumes that neither is 0.
pub(crate) fn least_common_multiple(a: usize, b: usize) -> Option<usize> {
    debug_assert!(a != 0 && b != 0);

    (a / greatest_common_divisor(a, b)).checked_mul(b)
}

fn greatest_common_divisor(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }

    a
}
