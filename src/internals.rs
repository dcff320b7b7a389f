//! The RSA primitive: raw modular exponentiation, CRT acceleration and
//! ciphertext blinding.

use std::borrow::Cow;

use num_bigint::{BigUint, IntoBigInt, IntoBigUint, RandBigInt, ToBigInt};
use num_traits::{One, Signed, Zero};
use rand::Rng;
use zeroize::Zeroize;

use crate::errors::{Error, Result};
use crate::key::{PublicKeyParts, RsaPrivateKey};
use crate::math::ModInverse;

/// Raw RSA encryption of m with the public key. No padding is performed.
#[inline]
pub fn encrypt<K: PublicKeyParts>(key: &K, m: &BigUint) -> BigUint {
    m.modpow(key.e(), key.n())
}

/// Performs raw RSA decryption with no padding, resulting in a plaintext
/// `BigUint`. Uses the precomputed CRT data when present and blinds the
/// exponentiation whenever an `rng` is passed.
#[inline]
pub fn decrypt<R: Rng>(
    mut rng: Option<&mut R>,
    priv_key: &RsaPrivateKey,
    c: &BigUint,
) -> Result<BigUint> {
    if c >= priv_key.n() {
        return Err(Error::Decryption);
    }

    if priv_key.n().is_zero() {
        return Err(Error::Decryption);
    }

    let mut ir = None;

    let c = if let Some(ref mut rng) = rng {
        let (blinded, unblinder) = blind(rng, priv_key, c);
        ir = Some(unblinder);
        Cow::Owned(blinded)
    } else {
        Cow::Borrowed(c)
    };

    let m = match priv_key.precomputed {
        None => c.modpow(priv_key.d(), priv_key.n()),
        Some(ref precomputed) => {
            // Chinese remainder recombination: fold the first two primes,
            // then each additional prime in turn.
            let mut p = priv_key.primes()[0].to_bigint().unwrap();
            let mut q = priv_key.primes()[1].to_bigint().unwrap();

            let m1 = c
                .modpow(&precomputed.dp, &priv_key.primes()[0])
                .into_bigint()
                .unwrap();
            let m2 = c
                .modpow(&precomputed.dq, &priv_key.primes()[1])
                .into_bigint()
                .unwrap();

            // h = qInv (m1 - m2) mod p
            let mut h = (m1 - &m2) * &precomputed.qinv % &p;
            if h.is_negative() {
                h += &p;
            }
            // m = m2 + q h
            let mut m = m2 + &q * h;

            for (i, value) in precomputed.crt_values.iter().enumerate() {
                let prime = &priv_key.primes()[2 + i];
                let mi = c.modpow(&value.exp, prime).into_bigint().unwrap();
                let mut prime = prime.to_bigint().unwrap();

                // h = (m_i - m) t_i mod p_i
                let mut h = (mi - &m) * &value.coeff % &prime;
                if h.is_negative() {
                    h += &prime;
                }
                // m = m + r_i h
                m += &value.r * h;

                prime.zeroize();
            }

            // wipe the scratch copies of the factors
            p.zeroize();
            q.zeroize();

            m.into_biguint().expect("recombined plaintext is negative")
        }
    };

    match ir {
        Some(ref ir) => {
            // unblind
            Ok(unblind(priv_key, &m, ir))
        }
        None => Ok(m),
    }
}

/// Performs RSA decryption as [`decrypt`], then re-encrypts the result and
/// compares it against the input. A mismatch means a fault in the CRT
/// computation and is reported as an internal error rather than leaking a
/// half-broken plaintext.
#[inline]
pub fn decrypt_and_check<R: Rng>(
    rng: Option<&mut R>,
    priv_key: &RsaPrivateKey,
    c: &BigUint,
) -> Result<BigUint> {
    let m = decrypt(rng, priv_key, c)?;

    let check = encrypt(priv_key, &m);
    if c != &check {
        return Err(Error::Internal);
    }

    Ok(m)
}

/// Returns the blinded c, along with the unblinding factor.
fn blind<R: Rng, K: PublicKeyParts>(rng: &mut R, key: &K, c: &BigUint) -> (BigUint, BigUint) {
    // Blinding involves multiplying c by r^e. Then the decryption operation
    // performs (m^e * r^e)^d mod n, which equals m r mod n. The factor of r
    // can then be removed by multiplying by its inverse, leaving the timing
    // of the exponentiation uncorrelated with c.
    let mut r: BigUint;
    let unblinder: BigUint;
    loop {
        r = rng.gen_biguint_below(key.n());
        if r.is_zero() {
            r = BigUint::one();
        }
        if let Some(inverse) = r.clone().mod_inverse(key.n()) {
            unblinder = inverse;
            break;
        }
    }

    let blinded = {
        // r^e (mod n)
        let mut rpowe = r.modpow(key.e(), key.n());
        // c r^e (mod n)
        let mut blinded = c * &rpowe;
        blinded %= key.n();

        rpowe.zeroize();

        blinded
    };

    (blinded, unblinder)
}

/// Given an m and an unblinding factor, unblind the m.
fn unblind(key: &impl PublicKeyParts, m: &BigUint, unblinder: &BigUint) -> BigUint {
    (m * unblinder) % key.n()
}

/// Returns a new vector of the given length, with the input left-padded
/// with zeros: the fixed-width big-endian octet encoding of RFC 8017.
#[inline]
pub fn left_pad(input: &[u8], size: usize) -> Vec<u8> {
    let n = input.len().min(size);

    let mut out = vec![0u8; size];
    out[size - n..].copy_from_slice(&input[input.len() - n..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_pad() {
        // shorter than the target width
        let padded = left_pad(&[1, 2, 3], 5);
        assert_eq!(padded, vec![0, 0, 1, 2, 3]);

        // exactly the target width
        let padded = left_pad(&[1, 2, 3], 3);
        assert_eq!(padded, vec![1, 2, 3]);

        // longer inputs keep their trailing bytes
        let padded = left_pad(&[9, 1, 2], 2);
        assert_eq!(padded, vec![1, 2]);
    }
}
