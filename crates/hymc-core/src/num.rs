//! Exact scalar types and the small amount of number theory the pipeline
//! needs.
//!
//! Every rational in the pipeline is a [`Rational`], kept canonical
//! (denominator positive, numerator and denominator coprime, zero stored as
//! 0/1) by construction: `Ratio::new` reduces on entry and all arithmetic on
//! `Ratio` preserves the form.

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

/// Exact arbitrary-precision rational.
pub type Rational = BigRational;

/// Exact arbitrary-precision integer.
pub type Int = BigInt;

/// Parse a rational literal: an optionally signed integer, or `num/den`.
///
/// Returns `None` on malformed text or a zero denominator.
pub fn parse_rational(text: &str) -> Option<Rational> {
    let text = text.trim();
    match text.split_once('/') {
        Some((num, den)) => {
            let num: Int = num.trim().parse().ok()?;
            let den: Int = den.trim().parse().ok()?;
            if den.is_zero() {
                return None;
            }
            Some(Rational::new(num, den))
        }
        None => {
            let num: Int = text.parse().ok()?;
            Some(Rational::from_integer(num))
        }
    }
}

/// Least common multiple of a list of integers.
///
/// Empty input yields 1; the result is always positive. Zeros are skipped so
/// that a constraint with a zero free term never forces the multiplier to
/// zero.
pub fn lcm(nums: &[Int]) -> Int {
    let mut result = Int::one();
    for n in nums {
        if n.is_zero() {
            continue;
        }
        result = result.lcm(n);
    }
    result.abs()
}

/// Number of 0/1 variables needed to cover an inclusive integer range of
/// width `range`: `floor(log2(range)) + 1`, clamped to 1 when the range is
/// degenerate.
///
/// Computed exactly: for `range >= 1` the value equals the bit length of
/// `floor(range)`.
pub fn range_bits(range: &Rational) -> usize {
    let floored = range.floor().to_integer();
    if floored.is_positive() {
        floored.bits() as usize
    } else {
        1
    }
}
