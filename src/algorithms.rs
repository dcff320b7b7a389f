//! Multi-prime RSA key generation.

use num_bigint::BigUint;
use num_traits::{FromPrimitive, One, Zero};
use rand::Rng;

use crate::errors::{Error, Result};
use crate::key::RsaPrivateKey;
use crate::math::ModInverse;
use crate::prime_rand::{RandPrime, SearchStrategy};

/// Public exponent used for every generated key.
const EXP: u64 = 65537;

/// Generates a multi-prime RSA keypair of the given bit size and the given
/// random source, as suggested in [1]. Although the public keys are
/// compatible (actually, indistinguishable) from the 2-prime case, the
/// private keys are not. Thus it may not be possible to export multi-prime
/// private keys in certain formats or to subsequently import them into
/// other code.
///
/// Table 1 in [2] suggests maximum numbers of primes for a given size.
///
/// [1]: https://patents.google.com/patent/US4405829A/en
/// [2]: http://www.cacr.math.uwaterloo.ca/techreports/2006/cacr2006-16.pdf
pub fn generate_multi_prime_key<R: Rng>(
    rng: &mut R,
    nprimes: usize,
    bit_size: usize,
) -> Result<RsaPrivateKey> {
    generate_multi_prime_key_with_strategy(rng, nprimes, bit_size, SearchStrategy::Sequential)
}

/// As [`generate_multi_prime_key`], with the prime search scheduled
/// according to `strategy`. A parallel search makes the generated key
/// non-reproducible even under a seeded generator.
pub fn generate_multi_prime_key_with_strategy<R: Rng>(
    rng: &mut R,
    nprimes: usize,
    bit_size: usize,
    strategy: SearchStrategy,
) -> Result<RsaPrivateKey> {
    if nprimes < 2 {
        return Err(Error::NprimesTooSmall);
    }

    if bit_size < 64 {
        let prime_limit = (1u64 << (bit_size / nprimes) as u64) as f64;

        // pi approximates the number of primes less than prime_limit
        let mut pi = prime_limit / (prime_limit.ln() - 1f64);
        // Generated primes start with 0b11, so we can only use a quarter of them.
        pi /= 4f64;
        // Use a factor of two to ensure that key generation terminates in a
        // reasonable amount of time.
        pi /= 2f64;

        if pi < nprimes as f64 {
            return Err(Error::TooFewPrimes);
        }
    }

    let mut primes = vec![BigUint::zero(); nprimes];
    let n_final: BigUint;
    let d_final: BigUint;

    'next: loop {
        let mut todo = bit_size;
        // `gen_prime` usually sets the top two bits in each prime, making
        // each of the form 2^bitlen(p_i) × 0.11… in base 2, so the product
        // of nprimes of them loses about nprimes × log2(8/7) bits. For
        // larger prime counts, hand out a few extra bits to compensate.
        if nprimes >= 7 {
            todo += (nprimes - 2) / 5;
        }

        for i in 0..nprimes {
            // Resample the slot until its prime differs from all earlier picks.
            loop {
                let prime = rng.gen_prime_with(todo / (nprimes - i), strategy)?;
                if !primes[..i].contains(&prime) {
                    todo -= prime.bits();
                    primes[i] = prime;
                    break;
                }
            }
        }

        let mut n = BigUint::one();
        let mut totient = BigUint::one();
        for prime in &primes {
            n *= prime;
            totient *= prime - BigUint::one();
        }

        if n.bits() != bit_size {
            // This doesn't happen for nprimes == 2 because the top-bit
            // shaping keeps the product wide enough; for nprimes > 2 the
            // per-slot rounding can lose a bit. Resample everything.
            log::debug!(
                "modulus came out at {} bits instead of {}, restarting",
                n.bits(),
                bit_size
            );
            continue 'next;
        }

        let exp = BigUint::from_u64(EXP).unwrap();
        if let Some(d) = exp.mod_inverse(&totient) {
            n_final = n;
            d_final = d;
            break;
        }
    }

    Ok(RsaPrivateKey::from_components(
        n_final,
        BigUint::from_u64(EXP).unwrap(),
        d_final,
        primes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::tests::test_key_basics;
    use crate::key::PublicKeyParts;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_nprimes_too_small() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        assert_eq!(
            generate_multi_prime_key(&mut rng, 1, 128).unwrap_err(),
            Error::NprimesTooSmall
        );
    }

    #[test]
    fn test_impossible_keys() {
        // Make sure no infinite loops are hit here.
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        for i in 0..32 {
            let _ = generate_multi_prime_key(&mut rng, 2, i);
            let _ = generate_multi_prime_key(&mut rng, 3, i);
            let _ = generate_multi_prime_key(&mut rng, 4, i);
            let _ = generate_multi_prime_key(&mut rng, 5, i);
        }
    }

    #[test]
    fn test_too_few_primes() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        assert_eq!(
            generate_multi_prime_key(&mut rng, 2, 8).unwrap_err(),
            Error::TooFewPrimes
        );
    }

    macro_rules! key_generation {
        ($name:ident, $multi:expr, $size:expr, $rounds:expr) => {
            #[test]
            fn $name() {
                let mut rng = ChaCha8Rng::from_seed([42; 32]);

                for _ in 0..$rounds {
                    let private_key = if $multi == 2 {
                        RsaPrivateKey::new(&mut rng, $size).expect("failed to generate key")
                    } else {
                        generate_multi_prime_key(&mut rng, $multi, $size).unwrap()
                    };
                    assert_eq!(private_key.n().bits(), $size);
                    assert_eq!(private_key.primes().len(), $multi);

                    test_key_basics(&private_key);
                }
            }
        };
    }

    key_generation!(key_generation_128, 2, 128, 10);
    key_generation!(key_generation_512, 2, 512, 3);
    key_generation!(key_generation_1024, 2, 1024, 2);

    key_generation!(key_generation_multi_3_256, 3, 256, 5);
    key_generation!(key_generation_multi_4_64, 4, 64, 5);
    key_generation!(key_generation_multi_5_64, 5, 64, 5);
    key_generation!(key_generation_multi_8_576, 8, 576, 3);
    key_generation!(key_generation_multi_16_1024, 16, 1024, 2);

    #[test]
    fn test_three_prime_precomputation() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let key = generate_multi_prime_key(&mut rng, 3, 1024).unwrap();

        key.validate().expect("invalid key");
        assert_eq!(key.n().bits(), 1024);

        // One CRT entry for the third prime; the first two are folded
        // directly.
        let precomputed = key.precomputed.as_ref().expect("missing precomputation");
        assert_eq!(precomputed.crt_values.len(), 1);

        test_key_basics(&key);
    }

    #[test]
    fn test_primes_are_distinct() {
        let mut rng = ChaCha8Rng::from_seed([1; 32]);
        // Small primes collide often enough for the resampling to matter.
        for _ in 0..10 {
            let key = generate_multi_prime_key(&mut rng, 4, 64).unwrap();
            let primes = key.primes();
            for (i, p) in primes.iter().enumerate() {
                assert!(!primes[..i].contains(p), "duplicate prime in {:?}", primes);
            }
        }
    }
}
