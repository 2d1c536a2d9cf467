//! An integer guaranteed to be a PowerOf2.

use core::{num, ops};

/// PowerOf2
///
/// An integral guaranteed to be non-zero and a power of 2.
///
/// Used for alignments, page sizes, and heap-growth units, all of which rely on mask arithmetic.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PowerOf2(num::NonZeroUsize);

impl PowerOf2 {
    /// Creates a new instance of PowerOf2.
    ///
    /// Or nothing if the value is not a power of 2.
    pub const fn new(value: usize) -> Option<PowerOf2> {
        if value.is_power_of_two() {
            //  Safety:
            //  -   Value is a power of 2, as per the if check.
            Some(unsafe { PowerOf2::new_unchecked(value) })
        } else {
            None
        }
    }

    /// Creates a new instance of PowerOf2.
    ///
    /// #   Safety
    ///
    /// Assumes that the value is a power of 2.
    pub const unsafe fn new_unchecked(value: usize) -> PowerOf2 {
        //  Safety:
        //  -   A power of 2 cannot be 0.
        PowerOf2(num::NonZeroUsize::new_unchecked(value))
    }

    /// Returns the inner value.
    pub const fn value(&self) -> usize { self.0.get() }

    /// Returns the base 2 logarithm of the value.
    pub const fn shift(&self) -> u32 { self.value().trailing_zeros() }

    /// Rounds the value up to the nearest higher multiple of `self`.
    ///
    /// Assumes that the result does not overflow; see `checked_round_up` otherwise.
    pub const fn round_up(&self, n: usize) -> usize {
        let mask = self.mask();

        (n + mask) & !mask
    }

    /// Rounds the value up to the nearest higher multiple of `self`, or None if it overflows.
    pub const fn checked_round_up(&self, n: usize) -> Option<usize> {
        let mask = self.mask();

        match n.checked_add(mask) {
            Some(n) => Some(n & !mask),
            None => None,
        }
    }

    /// Rounds the value down to the nearest lower multiple of `self`.
    pub const fn round_down(&self, n: usize) -> usize { n & !self.mask() }

    const fn mask(&self) -> usize { self.value() - 1 }
}

impl ops::Rem<PowerOf2> for usize {
    type Output = usize;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn rem(self, rhs: PowerOf2) -> usize { self & rhs.mask() }
}

#[cfg(test)]
mod tests {

use super::*;

fn pow2(value: usize) -> PowerOf2 { PowerOf2::new(value).expect("Power of 2") }

#[test]
fn power_of_2_new() {
    fn new(value: usize) -> Option<usize> {
        PowerOf2::new(value).map(|p| p.value())
    }

    assert_eq!(None, new(0));
    assert_eq!(Some(1), new(1));
    assert_eq!(Some(2), new(2));
    assert_eq!(None, new(3));
    assert_eq!(None, new(24));
    assert_eq!(Some(4096), new(4096));
    assert_eq!(None, new(usize::MAX));
}

#[test]
fn power_of_2_shift() {
    assert_eq!(0, pow2(1).shift());
    assert_eq!(4, pow2(16).shift());
    assert_eq!(13, pow2(8192).shift());
}

#[test]
fn power_of_2_rem() {
    assert_eq!(0, 32 % pow2(16));
    assert_eq!(8, 40 % pow2(16));
    assert_eq!(4095, 8191 % pow2(4096));
}

#[test]
fn power_of_2_round_up() {
    assert_eq!(0, pow2(16).round_up(0));
    assert_eq!(16, pow2(16).round_up(1));
    assert_eq!(16, pow2(16).round_up(16));
    assert_eq!(32, pow2(16).round_up(17));
    assert_eq!(8192, pow2(8192).round_up(5000));
    assert_eq!(16384, pow2(8192).round_up(8193));
}

#[test]
fn power_of_2_checked_round_up() {
    assert_eq!(Some(8192), pow2(8192).checked_round_up(1));
    assert_eq!(None, pow2(8192).checked_round_up(usize::MAX - 10));
    assert_eq!(Some(usize::MAX), pow2(1).checked_round_up(usize::MAX));
}

#[test]
fn power_of_2_round_down() {
    assert_eq!(0, pow2(16).round_down(15));
    assert_eq!(16, pow2(16).round_down(16));
    assert_eq!(16, pow2(16).round_down(31));
    assert_eq!(4096, pow2(4096).round_down(8191));
}

}
