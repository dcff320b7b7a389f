use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Error types.
///
/// Failures on the decrypt and verify paths are deliberately collapsed into
/// [`Error::Decryption`] and [`Error::Verification`] so that callers cannot
/// be turned into padding oracles. Encrypt, sign and key-generation failures
/// keep their full granularity.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("message too long for RSA public key size")]
    MessageTooLong,
    #[error("decryption error")]
    Decryption,
    #[error("verification error")]
    Verification,
    #[error("invalid options for this operation")]
    EncryptionOption,
    #[error("unsupported hash function")]
    UnsupportedHash,
    #[error("input must be hashed message")]
    InputNotHashed,
    #[error("prime size must be at least 2-bit")]
    PrimeSizeTooSmall,
    #[error("nprimes must be >= 2")]
    NprimesTooSmall,
    #[error("too few primes of given length to generate an RSA key")]
    TooFewPrimes,
    #[error("invalid prime value")]
    InvalidPrime,
    #[error("invalid modulus")]
    InvalidModulus,
    #[error("invalid exponents")]
    InvalidExponent,
    #[error("public exponent too small")]
    PublicExponentTooSmall,
    #[error("public exponent too large")]
    PublicExponentTooLarge,
    #[error("internal error")]
    Internal,
    #[error("random source failure")]
    RandomSource,
    #[error("MGF1 mask length too long")]
    MaskTooLong,
}
