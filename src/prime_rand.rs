//! Generation of random primes.

use std::sync::atomic::{AtomicBool, Ordering};

use lazy_static::lazy_static;
use num_bigint::BigUint;
use num_iter::range_step;
use num_traits::{FromPrimitive, ToPrimitive};
use rand::Rng;
use rayon::prelude::*;

use crate::errors::{Error, Result};
use crate::prime::probably_prime;

/// Miller-Rabin confidence requested for every generated prime, giving an
/// error probability of at most 4^-21.
const MILLER_RABIN_ROUNDS: usize = 20;

/// Width of the incremental search window swept over a fresh candidate
/// before new random bytes are drawn.
const SWEEP_WINDOW: u64 = 1 << 20;

/// Span of deltas handed to a single worker in the parallel search.
const SWEEP_CHUNK: u64 = 100;

/// Candidates of this size or below are always searched sequentially.
const PARALLEL_MIN_BITS: usize = 512;

/// A list of small, prime numbers that allows us to rapidly
/// exclude some fraction of composite candidates when searching for a random
/// prime. This list is truncated at the point where smallPrimesProduct exceeds
/// a u64. It does not include two because we ensure that the candidates are
/// odd by construction.
const SMALL_PRIMES: [u8; 15] = [3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53];

lazy_static! {
    /// The product of the values in SMALL_PRIMES and allows us
    /// to reduce a candidate prime by this number and then determine whether it's
    /// coprime to all the elements of SMALL_PRIMES without further BigUint
    /// operations.
    static ref SMALL_PRIMES_PRODUCT: BigUint = BigUint::from_u64(16_294_579_238_595_022_365).unwrap();
}

/// How the incremental sweep over a candidate is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStrategy {
    /// Walk the window in order on the calling thread.
    #[default]
    Sequential,
    /// Race chunks of the window across a worker pool sized to the
    /// machine's parallelism. Any worker may win, so the returned prime is
    /// not reproducible even with a seeded generator. Only engaged for
    /// candidates larger than 512 bits.
    Parallel,
}

/// A generic trait for generating random primes.
///
/// *Warning*: the quality of the primes is entirely dependent on the
/// provided random number generator being cryptographically strong.
///
/// # Example
/// ```
/// use rand::thread_rng;
/// use simple_rsa::RandPrime;
///
/// let mut rng = thread_rng();
/// let p = rng.gen_prime(256).unwrap();
/// assert_eq!(p.bits(), 256);
/// ```
pub trait RandPrime {
    /// Generate a random prime of exactly `bit_size` bits.
    fn gen_prime(&mut self, bit_size: usize) -> Result<BigUint>;

    /// Generate a random prime of exactly `bit_size` bits, scheduling the
    /// candidate sweep according to `strategy`.
    fn gen_prime_with(&mut self, bit_size: usize, strategy: SearchStrategy) -> Result<BigUint>;
}

impl<R: Rng> RandPrime for R {
    fn gen_prime(&mut self, bit_size: usize) -> Result<BigUint> {
        self.gen_prime_with(bit_size, SearchStrategy::Sequential)
    }

    fn gen_prime_with(&mut self, bit_size: usize, strategy: SearchStrategy) -> Result<BigUint> {
        if bit_size < 2 {
            return Err(Error::PrimeSizeTooSmall);
        }

        let mut b = bit_size % 8;
        if b == 0 {
            b = 8;
        }

        let bytes_len = (bit_size + 7) / 8;
        let mut bytes = vec![0u8; bytes_len];

        loop {
            self.try_fill_bytes(&mut bytes)
                .map_err(|_| Error::RandomSource)?;

            // Clear bits in the first byte to make sure the candidate has
            // a size <= bits.
            bytes[0] &= ((1u32 << (b as u32)) - 1) as u8;

            // Shape the top of the candidate. Both top bits set means the
            // product of two candidates never comes up a bit short; with
            // probability 1/3 only the top bit is set so the low end of the
            // range stays reachable.
            if b >= 2 {
                if self.gen_range(0..3u8) != 0 {
                    bytes[0] |= 3u8.wrapping_shl(b as u32 - 2);
                } else {
                    bytes[0] |= 2u8.wrapping_shl(b as u32 - 2);
                }
            } else {
                // Here b == 1, so bit_size >= 9 and a second byte exists.
                bytes[0] |= 1;
                if bytes_len > 1 && self.gen_range(0..3u8) != 0 {
                    bytes[1] |= 0x80;
                }
            }

            // Make the value odd, since an even number this large certainly
            // isn't prime.
            bytes[bytes_len - 1] |= 1u8;

            let p = BigUint::from_bytes_be(&bytes);
            // Always fits in a u64, as SMALL_PRIMES_PRODUCT does.
            let rem = (&p % &*SMALL_PRIMES_PRODUCT).to_u64().unwrap();

            let parallel = strategy == SearchStrategy::Parallel && bit_size > PARALLEL_MIN_BITS;
            let found = if parallel {
                sweep_parallel(&p, rem, bit_size)
            } else {
                sweep(&p, rem, bit_size)
            };

            if let Some(prime) = found {
                return Ok(prime);
            }

            // The whole window came up empty; draw fresh bytes.
        }
    }
}

/// Walks the window of even deltas, promoting every candidate that survives
/// the small-prime sieve to a full Miller-Rabin test.
fn sweep(p: &BigUint, rem: u64, bit_size: usize) -> Option<BigUint> {
    for delta in range_step(0u64, SWEEP_WINDOW, 2) {
        if !survives_sieve(rem + delta, bit_size) {
            continue;
        }

        let candidate = p + BigUint::from_u64(delta).unwrap();
        // Adding delta may have pushed the candidate one bit too far.
        if candidate.bits() == bit_size && probably_prime(&candidate, MILLER_RABIN_ROUNDS) {
            return Some(candidate);
        }
    }

    None
}

/// Races chunks of the window across the rayon pool. Workers observe a
/// shared found flag inside their chunk loop and stand down once any worker
/// has published a delta; which delta wins depends on scheduling.
fn sweep_parallel(p: &BigUint, rem: u64, bit_size: usize) -> Option<BigUint> {
    let found = AtomicBool::new(false);

    let starts: Vec<u64> = range_step(0u64, SWEEP_WINDOW, SWEEP_CHUNK).collect();
    let delta = starts.into_par_iter().find_map_any(|start| {
        let end = (start + SWEEP_CHUNK).min(SWEEP_WINDOW);
        let mut delta = start;
        while delta < end {
            if found.load(Ordering::Relaxed) {
                return None;
            }

            if survives_sieve(rem + delta, bit_size) {
                let candidate = p + BigUint::from_u64(delta).unwrap();
                if candidate.bits() == bit_size && probably_prime(&candidate, MILLER_RABIN_ROUNDS)
                {
                    found.store(true, Ordering::Relaxed);
                    return Some(delta);
                }
            }

            delta += 2;
        }
        None
    })?;

    log::debug!("parallel prime search settled on delta {}", delta);
    Some(p + BigUint::from_u64(delta).unwrap())
}

/// A shifted candidate survives when no small prime divides it. Tiny
/// candidates are allowed to *be* one of the small primes.
fn survives_sieve(m: u64, bit_size: usize) -> bool {
    for prime in &SMALL_PRIMES {
        let prime = u64::from(*prime);
        if m % prime == 0 && (bit_size > 6 || m != prime) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_prime_small() {
        let mut rng = StdRng::from_seed([0u8; 32]);
        for n in 2..10 {
            let p = rng.gen_prime(n).unwrap();

            assert_eq!(p.bits(), n);
            assert!(probably_prime(&p, 32));
        }
    }

    #[test]
    fn test_gen_prime_1024() {
        let mut rng = StdRng::from_seed([0u8; 32]);
        let p = rng.gen_prime(1024).unwrap();
        assert_eq!(p.bits(), 1024);
        assert!(probably_prime(&p, 32));
    }

    #[test]
    fn test_gen_prime_parallel() {
        let mut rng = StdRng::from_seed([7u8; 32]);
        let p = rng
            .gen_prime_with(600, SearchStrategy::Parallel)
            .unwrap();
        assert_eq!(p.bits(), 600);
        assert!(probably_prime(&p, 32));
    }

    #[test]
    fn test_gen_prime_small_strategy_is_sequential() {
        // Below the parallel threshold both strategies walk the same window.
        let mut rng = StdRng::from_seed([3u8; 32]);
        let p = rng
            .gen_prime_with(128, SearchStrategy::Parallel)
            .unwrap();
        assert_eq!(p.bits(), 128);
    }

    #[test]
    fn test_gen_prime_too_small() {
        let mut rng = StdRng::from_seed([0u8; 32]);
        assert_eq!(rng.gen_prime(0), Err(Error::PrimeSizeTooSmall));
        assert_eq!(rng.gen_prime(1), Err(Error::PrimeSizeTooSmall));
    }

    #[test]
    fn test_sieve_small_prime_exemption() {
        // A 3-bit candidate is allowed to be 3, 5 or 7 itself...
        assert!(survives_sieve(3, 3));
        assert!(survives_sieve(7, 3));
        // ...but a large candidate divisible by 3 is rejected.
        assert!(!survives_sieve(3 * 1_000_003, 64));
    }
}
