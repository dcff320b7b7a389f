use lazy_static::lazy_static;
use num_bigint::Sign::Plus;
use num_bigint::{BigInt, BigUint};
use num_traits::{FromPrimitive, One};
use rand::rngs::ThreadRng;
use rand::Rng;
use zeroize::Zeroize;

use crate::algorithms::generate_multi_prime_key;
use crate::errors::{Error, Result};
use crate::hash::Hash;
use crate::math::ModInverse;
use crate::padding::PaddingScheme;
use crate::{internals, oaep, pkcs1v15, pss};

lazy_static! {
    static ref MIN_PUB_EXPONENT: BigUint = BigUint::from_u64(2).unwrap();
    static ref MAX_PUB_EXPONENT: BigUint = BigUint::from_u64((1 << 31) - 1).unwrap();
}

/// Operations shared by public keys and the public half of private keys.
pub trait PublicKeyParts {
    /// Returns the modulus of the key.
    fn n(&self) -> &BigUint;
    /// Returns the public exponent of the key.
    fn e(&self) -> &BigUint;
    /// Returns the modulus size in bytes. Raw signatures and ciphertexts
    /// for or by this public key will have the same size.
    fn size(&self) -> usize {
        (self.n().bits() + 7) / 8
    }
}

/// Represents the public part of an RSA key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    n: BigUint,
    e: BigUint,
}

/// Represents a whole RSA key, public and private parts.
#[derive(Debug, Clone)]
pub struct RsaPrivateKey {
    /// Modulus
    n: BigUint,
    /// Public exponent
    e: BigUint,
    /// Private exponent
    d: BigUint,
    /// Prime factors of N, contains >= 2 elements.
    primes: Vec<BigUint>,
    /// Precomputed values to speed up private operations
    pub(crate) precomputed: Option<PrecomputedValues>,
}

impl PartialEq for RsaPrivateKey {
    #[inline]
    fn eq(&self, other: &RsaPrivateKey) -> bool {
        // Precomputed values are derived and take no part in key identity.
        self.n == other.n && self.e == other.e && self.d == other.d && self.primes == other.primes
    }
}

impl Eq for RsaPrivateKey {}

impl Zeroize for RsaPrivateKey {
    fn zeroize(&mut self) {
        self.d.zeroize();
        for prime in self.primes.iter_mut() {
            prime.zeroize();
        }
        self.primes.clear();
        if let Some(mut precomputed) = self.precomputed.take() {
            precomputed.zeroize();
        }
    }
}

impl Drop for RsaPrivateKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PrecomputedValues {
    /// D mod (P-1)
    pub(crate) dp: BigUint,
    /// D mod (Q-1)
    pub(crate) dq: BigUint,
    /// Q^-1 mod P
    pub(crate) qinv: BigInt,

    /// Used for the 3rd and subsequent primes. Due to a historical accident
    /// the CRT for the first two primes is handled differently in PKCS#1,
    /// and interoperability is sufficiently important that we mirror this.
    pub(crate) crt_values: Vec<CrtValue>,
}

impl Zeroize for PrecomputedValues {
    fn zeroize(&mut self) {
        self.dp.zeroize();
        self.dq.zeroize();
        self.qinv.zeroize();
        for val in self.crt_values.iter_mut() {
            val.zeroize();
        }
        self.crt_values.clear();
    }
}

impl Drop for PrecomputedValues {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Contains the precomputed Chinese remainder theorem values for a prime
/// beyond the first two.
#[derive(Debug, Clone, Zeroize)]
pub(crate) struct CrtValue {
    /// D mod (prime - 1)
    pub(crate) exp: BigUint,
    /// R·Coeff ≡ 1 mod Prime.
    pub(crate) coeff: BigInt,
    /// Product of all primes prior to this one (inc. p and q).
    pub(crate) r: BigInt,
}

impl From<RsaPrivateKey> for RsaPublicKey {
    fn from(private_key: RsaPrivateKey) -> Self {
        private_key.to_public_key()
    }
}

impl PublicKeyParts for RsaPublicKey {
    fn n(&self) -> &BigUint {
        &self.n
    }

    fn e(&self) -> &BigUint {
        &self.e
    }
}

impl PublicKeyParts for RsaPrivateKey {
    fn n(&self) -> &BigUint {
        &self.n
    }

    fn e(&self) -> &BigUint {
        &self.e
    }
}

impl RsaPublicKey {
    /// Create a new key from its components.
    pub fn new(n: BigUint, e: BigUint) -> Result<Self> {
        let k = RsaPublicKey { n, e };
        check_public(&k)?;

        Ok(k)
    }

    /// Encrypt the given message.
    pub fn encrypt<R: Rng>(&self, rng: &mut R, padding: PaddingScheme, msg: &[u8]) -> Result<Vec<u8>> {
        match padding {
            PaddingScheme::Pkcs1v15 => pkcs1v15::encrypt(rng, self, msg),
            PaddingScheme::Oaep { hash, label } => oaep::encrypt(hash, rng, self, msg, &label),
            PaddingScheme::Pss(_) => Err(Error::EncryptionOption),
        }
    }

    /// Verify a signature over `hashed`, which must be the digest of the
    /// message under `hash`. Passing `None` for the hash treats `hashed` as
    /// a pre-encoded message (PKCS#1 v1.5 only).
    pub fn verify(
        &self,
        padding: PaddingScheme,
        hash: Option<Hash>,
        hashed: &[u8],
        sig: &[u8],
    ) -> Result<()> {
        match padding {
            PaddingScheme::Pkcs1v15 => pkcs1v15::verify(self, hash, hashed, sig),
            PaddingScheme::Pss(opts) => {
                let hash = hash.or(opts.hash).ok_or(Error::UnsupportedHash)?;
                pss::verify(self, hash, hashed, sig, Some(&opts))
            }
            PaddingScheme::Oaep { .. } => Err(Error::EncryptionOption),
        }
    }
}

impl RsaPrivateKey {
    /// Generate a new RSA key pair of the given bit size using the passed in `rng`.
    pub fn new<R: Rng>(rng: &mut R, bit_size: usize) -> Result<RsaPrivateKey> {
        generate_multi_prime_key(rng, 2, bit_size)
    }

    /// Constructs an RSA key pair from the individual components.
    pub fn from_components(
        n: BigUint,
        e: BigUint,
        d: BigUint,
        primes: Vec<BigUint>,
    ) -> RsaPrivateKey {
        let mut k = RsaPrivateKey {
            n,
            e,
            d,
            primes,
            precomputed: None,
        };

        k.precompute();

        k
    }

    /// Get the public key from the private key, cloning `n` and `e`.
    ///
    /// Useful when the private information must be discarded entirely.
    pub fn to_public_key(&self) -> RsaPublicKey {
        RsaPublicKey {
            n: self.n.clone(),
            e: self.e.clone(),
        }
    }

    /// Performs some calculations to speed up private key operations.
    /// Idempotent; keys built by the generator arrive precomputed.
    pub fn precompute(&mut self) {
        if self.precomputed.is_some() {
            return;
        }

        let dp = &self.d % (&self.primes[0] - BigUint::one());
        let dq = &self.d % (&self.primes[1] - BigUint::one());
        let qinv = self.primes[1]
            .clone()
            .mod_inverse(&self.primes[0])
            .expect("invalid prime");
        let qinv = BigInt::from_biguint(Plus, qinv);

        let mut r: BigUint = &self.primes[0] * &self.primes[1];
        let crt_values: Vec<CrtValue> = self
            .primes
            .iter()
            .skip(2)
            .map(|prime| {
                let value = CrtValue {
                    exp: &self.d % (prime - BigUint::one()),
                    r: BigInt::from_biguint(Plus, r.clone()),
                    coeff: BigInt::from_biguint(
                        Plus,
                        r.clone().mod_inverse(prime).expect("invalid coefficient"),
                    ),
                };
                r *= prime;

                value
            })
            .collect();

        self.precomputed = Some(PrecomputedValues {
            dp,
            dq,
            qinv,
            crt_values,
        });
    }

    /// Returns the private exponent of the key.
    pub fn d(&self) -> &BigUint {
        &self.d
    }

    /// Returns the prime factors.
    pub fn primes(&self) -> &[BigUint] {
        &self.primes
    }

    /// Performs basic sanity checks on the key.
    /// Returns `Ok(())` if everything is good, otherwise an appropriate error.
    pub fn validate(&self) -> Result<()> {
        check_public(self)?;

        // Check that Πprimes == n.
        let mut m = BigUint::one();
        for prime in &self.primes {
            // Any primes ≤ 1 will cause divide-by-zero panics later.
            if *prime <= BigUint::one() {
                return Err(Error::InvalidPrime);
            }
            m *= prime;
        }
        if m != self.n {
            return Err(Error::InvalidModulus);
        }

        // Check that de ≡ 1 mod p-1, for each prime. This implies that e is
        // coprime to each p-1, and thus that a^de ≡ a mod n for all a
        // coprime to n, as required.
        let mut de = self.e.clone();
        de *= self.d.clone();
        for prime in &self.primes {
            let congruence: BigUint = &de % (prime - BigUint::one());
            if !congruence.is_one() {
                return Err(Error::InvalidExponent);
            }
        }

        Ok(())
    }

    /// Decrypt the given message.
    pub fn decrypt(&self, padding: PaddingScheme, ciphertext: &[u8]) -> Result<Vec<u8>> {
        match padding {
            // The rng type argument only satisfies the type checker; no
            // randomness is consumed without blinding.
            PaddingScheme::Pkcs1v15 => pkcs1v15::decrypt::<ThreadRng>(None, self, ciphertext),
            PaddingScheme::Oaep { hash, label } => {
                oaep::decrypt::<ThreadRng>(hash, None, self, ciphertext, &label)
            }
            PaddingScheme::Pss(_) => Err(Error::EncryptionOption),
        }
    }

    /// Decrypt the given message.
    /// Uses `rng` to blind the decryption process.
    pub fn decrypt_blinded<R: Rng>(
        &self,
        rng: &mut R,
        padding: PaddingScheme,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        match padding {
            PaddingScheme::Pkcs1v15 => pkcs1v15::decrypt(Some(rng), self, ciphertext),
            PaddingScheme::Oaep { hash, label } => {
                oaep::decrypt(hash, Some(rng), self, ciphertext, &label)
            }
            PaddingScheme::Pss(_) => Err(Error::EncryptionOption),
        }
    }

    /// Sign the given digest. PSS is not available here because it consumes
    /// randomness for the salt; use [`RsaPrivateKey::sign_blinded`].
    pub fn sign(&self, padding: PaddingScheme, hash: Option<Hash>, digest: &[u8]) -> Result<Vec<u8>> {
        match padding {
            PaddingScheme::Pkcs1v15 => pkcs1v15::sign::<ThreadRng>(None, self, hash, digest),
            _ => Err(Error::EncryptionOption),
        }
    }

    /// Sign the given digest. `rng` blinds the private operation and, for
    /// PSS, provides the salt.
    pub fn sign_blinded<R: Rng>(
        &self,
        rng: &mut R,
        padding: PaddingScheme,
        hash: Option<Hash>,
        digest: &[u8],
    ) -> Result<Vec<u8>> {
        match padding {
            PaddingScheme::Pkcs1v15 => pkcs1v15::sign(Some(rng), self, hash, digest),
            PaddingScheme::Pss(opts) => {
                let hash = hash.or(opts.hash).ok_or(Error::UnsupportedHash)?;
                pss::sign(rng, self, hash, digest, Some(&opts))
            }
            PaddingScheme::Oaep { .. } => Err(Error::EncryptionOption),
        }
    }
}

/// Check that the public key is well formed and has an exponent within acceptable bounds.
#[inline]
pub fn check_public(public_key: &impl PublicKeyParts) -> Result<()> {
    if public_key.e() < &*MIN_PUB_EXPONENT {
        return Err(Error::PublicExponentTooSmall);
    }

    if public_key.e() > &*MAX_PUB_EXPONENT {
        return Err(Error::PublicExponentTooLarge);
    }

    Ok(())
}
