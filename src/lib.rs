//! RSA as described in PKCS#1 v2.2 (RFC 8017): multi-prime key generation,
//! the raw primitive with blinding and CRT acceleration, and the standard
//! message schemes built on top of it — PKCS#1 v1.5 encryption and
//! signatures, OAEP encryption and PSS signatures.
//!
//! The decode and verify paths of every padding scheme run in constant time
//! with respect to secret-derived data, and private-key operations are
//! blinded whenever the caller supplies a randomness source.
//!
//! # Example
//!
//! ```
//! use rand::thread_rng;
//! use simple_rsa::{PaddingScheme, RsaPrivateKey};
//!
//! let mut rng = thread_rng();
//! let priv_key = RsaPrivateKey::new(&mut rng, 512).expect("failed to generate a key");
//! let pub_key = priv_key.to_public_key();
//!
//! let ciphertext = pub_key
//!     .encrypt(&mut rng, PaddingScheme::Pkcs1v15, b"hello world")
//!     .expect("failed to encrypt");
//! let plaintext = priv_key
//!     .decrypt(PaddingScheme::Pkcs1v15, &ciphertext)
//!     .expect("failed to decrypt");
//! assert_eq!(&plaintext[..], b"hello world");
//! ```

pub mod errors;
pub mod hash;
pub mod oaep;
pub mod padding;
pub mod pkcs1v15;
pub mod prime;
pub mod pss;

mod algorithms;
mod internals;
mod key;
mod math;
mod mgf;
mod prime_rand;

pub use crate::algorithms::{generate_multi_prime_key, generate_multi_prime_key_with_strategy};
pub use crate::hash::Hash;
pub use crate::key::{PublicKeyParts, RsaPrivateKey, RsaPublicKey};
pub use crate::padding::PaddingScheme;
pub use crate::prime_rand::{RandPrime, SearchStrategy};
pub use crate::pss::{PssOptions, SaltLength};
