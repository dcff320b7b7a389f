//! Helpers on arbitrary-precision integers: extended GCD, modular inverse
//! and modular exponentiation with signed conventions.

use std::borrow::Cow;

use num_bigint::Sign::Plus;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

/// Generic trait to implement modular inverse.
pub trait ModInverse<R: Sized>: Sized {
    /// Returns the [modular multiplicative
    /// inverse](https://en.wikipedia.org/wiki/Modular_multiplicative_inverse)
    /// of `self` modulo `m`, or `None` when none exists.
    fn mod_inverse(self, m: R) -> Option<Self>;
}

impl<'a> ModInverse<&'a BigUint> for BigUint {
    fn mod_inverse(self, m: &'a BigUint) -> Option<BigUint> {
        mod_inverse(
            Cow::Owned(BigInt::from_biguint(Plus, self)),
            &BigInt::from_biguint(Plus, m.clone()),
        )
        .and_then(|n| n.to_biguint())
    }
}

impl ModInverse<BigUint> for BigUint {
    fn mod_inverse(self, m: BigUint) -> Option<BigUint> {
        self.mod_inverse(&m)
    }
}

impl<'a> ModInverse<&'a BigInt> for BigInt {
    fn mod_inverse(self, m: &'a BigInt) -> Option<BigInt> {
        mod_inverse(Cow::Owned(self), m)
    }
}

impl ModInverse<BigInt> for BigInt {
    fn mod_inverse(self, m: BigInt) -> Option<BigInt> {
        mod_inverse(Cow::Owned(self), &m)
    }
}

/// Calculate the modular inverse of `g` modulo `n`. Negative inputs are
/// reduced first; a negative modulus is replaced by its absolute value.
#[inline]
fn mod_inverse(g: Cow<'_, BigInt>, n: &BigInt) -> Option<BigInt> {
    let n = n.abs();
    let g = if g.is_negative() {
        g.mod_floor(&n)
    } else {
        g.into_owned()
    };

    let (d, x, _) = extended_gcd(&g, &n);

    if !d.is_one() {
        return None;
    }

    if x.is_negative() {
        Some(x + n)
    } else {
        Some(x)
    }
}

/// Iterative extended Euclidean algorithm over `(|a|, |b|)`.
///
/// Returns `(g, x, y)` satisfying `a*x + |b|*y = g`: the coefficient of `a`
/// is negated when `a` is negative, so it can be fed straight into a modular
/// inverse.
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let mut r0 = a.abs();
    let mut r1 = b.abs();

    let mut ua = BigInt::one();
    let mut va = BigInt::zero();

    let mut ub = BigInt::zero();
    let mut vb = BigInt::one();

    while !r1.is_zero() {
        let (q, r) = r0.div_rem(&r1);
        r0 = r1;
        r1 = r;

        let tmp = ua;
        ua = ub.clone();
        ub = tmp - &q * &ub;

        let tmp = va;
        va = vb.clone();
        vb = tmp - &q * &vb;
    }

    if a.is_negative() {
        ua = -ua;
    }

    (r0, ua, va)
}

/// Computes `x^y mod m` with the conventions of the RSA primitive:
/// a zero modulus has no result, `x^0` is `1 mod m`, and a negative
/// exponent means `(x^-1)^|y| mod m`, failing when `x` is not invertible.
pub fn mod_exp(x: &BigInt, y: &BigInt, m: &BigInt) -> Option<BigInt> {
    if m.is_zero() {
        return None;
    }
    let m = m.abs();

    let mut x = x.mod_floor(&m);
    let mut y = y.clone();
    if y.is_negative() {
        x = x.mod_inverse(&m)?;
        y = -y;
    }

    if m.is_one() {
        return Some(BigInt::zero());
    }
    if y.is_zero() {
        return Some(BigInt::one());
    }

    // Everything is non-negative now, hand off to the unsigned modpow.
    let x = x.to_biguint()?;
    let y = y.to_biguint()?;
    let m = m.to_biguint()?;
    Some(BigInt::from_biguint(Plus, x.modpow(&y, &m)))
}
