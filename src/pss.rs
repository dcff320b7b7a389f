//! RSASSA-PSS signatures as described in
//! [RFC 8017 § 8.1](https://datatracker.ietf.org/doc/html/rfc8017#section-8.1).

use digest::DynDigest;
use num_bigint::BigUint;
use rand::Rng;
use subtle::{Choice, ConstantTimeEq};

use crate::errors::{Error, Result};
use crate::hash::Hash;
use crate::internals;
use crate::key::{PublicKeyParts, RsaPrivateKey};
use crate::mgf::mgf1_xor;

/// Salt length policy for PSS signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaltLength {
    /// As large as the encoded message allows when signing; recovered from
    /// the encoding when verifying.
    #[default]
    Auto,
    /// A salt of exactly `hash.size()` bytes.
    EqualsHash,
    /// A fixed salt length in bytes.
    Fixed(usize),
}

/// Options for PSS signing and verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct PssOptions {
    /// Salt policy; [`SaltLength::Auto`] if unspecified.
    pub salt_length: SaltLength,
    /// Overrides the hash argument of the sign or verify call when set.
    pub hash: Option<Hash>,
}

/// Computes an RSASSA-PSS signature over a digest. `digest` must be the
/// `hash` of the message; `rng` draws the salt and blinds the private
/// operation. With `None` options the salt is as long as the encoding
/// allows.
pub fn sign<R: Rng>(
    rng: &mut R,
    priv_key: &RsaPrivateKey,
    hash: Hash,
    digest: &[u8],
    opts: Option<&PssOptions>,
) -> Result<Vec<u8>> {
    let hash = opts.and_then(|o| o.hash).unwrap_or(hash);
    let salt_length = opts.map(|o| o.salt_length).unwrap_or_default();

    let k = priv_key.size();
    let em_bits = priv_key.n().bits() - 1;
    let em_len = (em_bits + 7) / 8;

    let s_len = match salt_length {
        SaltLength::Auto => em_len
            .checked_sub(hash.size() + 2)
            .ok_or(Error::MessageTooLong)?,
        SaltLength::EqualsHash => hash.size(),
        SaltLength::Fixed(len) => len,
    };

    let mut hasher = hash.new_digest()?;

    let mut salt = vec![0u8; s_len];
    rng.try_fill_bytes(&mut salt)
        .map_err(|_| Error::RandomSource)?;

    let em = emsa_pss_encode(digest, em_bits, &salt, &mut *hasher)?;

    let m = BigUint::from_bytes_be(&em);
    let s = internals::decrypt_and_check(Some(rng), priv_key, &m)?;

    // The encoded message is one byte shorter than the modulus when
    // bitlen(N) ≡ 1 (mod 8); the signature is always k bytes.
    Ok(internals::left_pad(&s.to_bytes_be(), k))
}

/// Verifies an RSASSA-PSS signature. Under [`SaltLength::Auto`] the salt
/// length is recovered from the encoding itself.
pub fn verify<K: PublicKeyParts>(
    pub_key: &K,
    hash: Hash,
    digest: &[u8],
    sig: &[u8],
    opts: Option<&PssOptions>,
) -> Result<()> {
    let hash = opts.and_then(|o| o.hash).unwrap_or(hash);
    let salt_length = opts.map(|o| o.salt_length).unwrap_or_default();

    let k = pub_key.size();
    let em_bits = pub_key.n().bits() - 1;
    let em_len = (em_bits + 7) / 8;

    let s_len = match salt_length {
        SaltLength::Auto => None,
        SaltLength::EqualsHash => Some(hash.size()),
        SaltLength::Fixed(len) => Some(len),
    };

    if sig.len() != k {
        return Err(Error::Verification);
    }

    let mut hasher = hash.new_digest()?;

    let s = BigUint::from_bytes_be(sig);
    let m = internals::encrypt(pub_key, &s);
    if m.bits() > em_len * 8 {
        return Err(Error::Verification);
    }
    let mut em = internals::left_pad(&m.to_bytes_be(), em_len);

    emsa_pss_verify(digest, &mut em, em_bits, s_len, &mut *hasher)
}

/// EMSA-PSS encoding (RFC 8017 § 9.1.1):
///
/// ```text
///     M' = 0x00 * 8 || mHash || salt     H = Hash(M')
///     DB = PS || 0x01 || salt            maskedDB = DB xor MGF1(H)
///     EM = maskedDB || H || 0xbc
/// ```
fn emsa_pss_encode(
    m_hash: &[u8],
    em_bits: usize,
    salt: &[u8],
    hash: &mut dyn DynDigest,
) -> Result<Vec<u8>> {
    let h_len = hash.output_size();
    let s_len = salt.len();
    let em_len = (em_bits + 7) / 8;

    if m_hash.len() != h_len {
        return Err(Error::InputNotHashed);
    }

    if em_len < h_len + s_len + 2 {
        return Err(Error::MessageTooLong);
    }

    let prefix = [0u8; 8];
    hash.update(&prefix);
    hash.update(m_hash);
    hash.update(salt);
    let hashed = hash.finalize_reset();

    let mut em = vec![0u8; em_len];
    let ps_len = em_len - s_len - h_len - 2;
    {
        let db = &mut em[..em_len - h_len - 1];
        db[ps_len] = 0x01;
        let db_len = db.len();
        db[db_len - s_len..].copy_from_slice(salt);

        mgf1_xor(db, hash, &hashed)?;

        // Clear the bits beyond emBits in the leftmost octet.
        db[0] &= 0xff >> (8 * em_len - em_bits);
    }

    em[em_len - h_len - 1..em_len - 1].copy_from_slice(&hashed);
    em[em_len - 1] = 0xbc;

    Ok(em)
}

/// EMSA-PSS verification (RFC 8017 § 9.1.2). The structural rejects at the
/// top gate on public data; the padding run, separator and recomputed hash
/// feed one accumulated validity bit.
fn emsa_pss_verify(
    m_hash: &[u8],
    em: &mut [u8],
    em_bits: usize,
    s_len: Option<usize>,
    hash: &mut dyn DynDigest,
) -> Result<()> {
    let em_len = (em_bits + 7) / 8;
    let h_len = hash.output_size();

    if em.len() != em_len || m_hash.len() != h_len {
        return Err(Error::Verification);
    }

    if let Some(s_len) = s_len {
        if em_len < h_len + s_len + 2 {
            return Err(Error::Verification);
        }
    }

    if em[em_len - 1] != 0xbc {
        return Err(Error::Verification);
    }

    // The bits beyond emBits in the leftmost octet must be clear.
    let bit_mask: u8 = 0xff >> (8 * em_len - em_bits);
    if em[0] & !bit_mask != 0 {
        return Err(Error::Verification);
    }

    let (db, rest) = em.split_at_mut(em_len - h_len - 1);
    let h = &rest[..h_len];

    // DB = maskedDB xor MGF1(H)
    mgf1_xor(db, hash, h).map_err(|_| Error::Verification)?;
    db[0] &= bit_mask;

    let s_len = match s_len {
        Some(s_len) => s_len,
        // Recover the salt length from the 0x01 separator.
        None => {
            let pos = db
                .iter()
                .position(|&b| b == 0x01)
                .ok_or(Error::Verification)?;
            db.len() - pos - 1
        }
    };

    // DB = PS || 0x01 || salt with PS all zero.
    let ps_len = em_len - h_len - s_len - 2;
    let mut valid = Choice::from(1u8);
    for el in db[..ps_len].iter() {
        valid &= el.ct_eq(&0x00);
    }
    valid &= db[ps_len].ct_eq(&0x01);

    // H' = Hash(0x00 * 8 || mHash || salt)
    let salt = &db[db.len() - s_len..];
    let prefix = [0u8; 8];
    hash.update(&prefix);
    hash.update(m_hash);
    hash.update(salt);
    let h0 = hash.finalize_reset();

    valid &= h0.ct_eq(h);

    if valid.unwrap_u8() != 1 {
        return Err(Error::Verification);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkcs1v15::tests::get_private_key;
    use digest::Digest;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sha1::Sha1;
    use sha2::Sha256;

    #[test]
    fn test_sign_verify_roundtrip() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let priv_key = get_private_key();
        let pub_key = priv_key.to_public_key();

        let digest = Sha256::digest(b"testing").to_vec();
        let sig = sign(&mut rng, &priv_key, Hash::Sha256, &digest, None).unwrap();
        assert_eq!(sig.len(), priv_key.size());

        verify(&pub_key, Hash::Sha256, &digest, &sig, None).expect("failed to verify");
    }

    #[test]
    fn test_salt_modes_interoperate() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let priv_key = get_private_key();
        let pub_key = priv_key.to_public_key();

        let digest = Sha256::digest(b"salty").to_vec();
        let em_len = (priv_key.n().bits() - 1 + 7) / 8;
        let max_salt = em_len - 32 - 2;

        // Auto sign, Auto verify.
        let sig = sign(&mut rng, &priv_key, Hash::Sha256, &digest, None).unwrap();
        verify(&pub_key, Hash::Sha256, &digest, &sig, None).unwrap();

        // Auto sign, explicit maximum salt on verify.
        let opts = PssOptions {
            salt_length: SaltLength::Fixed(max_salt),
            hash: None,
        };
        verify(&pub_key, Hash::Sha256, &digest, &sig, Some(&opts)).unwrap();

        // EqualsHash sign verifies under both EqualsHash and Auto.
        let opts = PssOptions {
            salt_length: SaltLength::EqualsHash,
            hash: None,
        };
        let sig = sign(&mut rng, &priv_key, Hash::Sha256, &digest, Some(&opts)).unwrap();
        verify(&pub_key, Hash::Sha256, &digest, &sig, Some(&opts)).unwrap();
        verify(&pub_key, Hash::Sha256, &digest, &sig, None).unwrap();

        // Fixed-length salt round trip.
        let opts = PssOptions {
            salt_length: SaltLength::Fixed(8),
            hash: None,
        };
        let sig = sign(&mut rng, &priv_key, Hash::Sha256, &digest, Some(&opts)).unwrap();
        verify(&pub_key, Hash::Sha256, &digest, &sig, Some(&opts)).unwrap();
    }

    #[test]
    fn test_options_hash_overrides_argument() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let priv_key = get_private_key();
        let pub_key = priv_key.to_public_key();

        let digest = Sha1::digest(b"override").to_vec();
        let opts = PssOptions {
            salt_length: SaltLength::Auto,
            hash: Some(Hash::Sha1),
        };

        // The options hash wins over the (wrong) outer argument.
        let sig = sign(&mut rng, &priv_key, Hash::Sha256, &digest, Some(&opts)).unwrap();
        verify(&pub_key, Hash::Sha256, &digest, &sig, Some(&opts)).unwrap();
    }

    #[test]
    fn test_mismatched_salt_length_rejected() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let priv_key = get_private_key();
        let pub_key = priv_key.to_public_key();

        let digest = Sha256::digest(b"salt size").to_vec();
        let opts = PssOptions {
            salt_length: SaltLength::Fixed(8),
            hash: None,
        };
        let sig = sign(&mut rng, &priv_key, Hash::Sha256, &digest, Some(&opts)).unwrap();

        let wrong = PssOptions {
            salt_length: SaltLength::Fixed(9),
            hash: None,
        };
        assert_eq!(
            verify(&pub_key, Hash::Sha256, &digest, &sig, Some(&wrong)).unwrap_err(),
            Error::Verification
        );
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let priv_key = get_private_key();
        let pub_key = priv_key.to_public_key();

        let digest = Sha256::digest(b"bitflip").to_vec();
        let mut sig = sign(&mut rng, &priv_key, Hash::Sha256, &digest, None).unwrap();
        sig[17] ^= 0x04;

        assert_eq!(
            verify(&pub_key, Hash::Sha256, &digest, &sig, None).unwrap_err(),
            Error::Verification
        );
    }

    #[test]
    fn test_wrong_digest_rejected() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let priv_key = get_private_key();
        let pub_key = priv_key.to_public_key();

        let digest = Sha256::digest(b"message one").to_vec();
        let sig = sign(&mut rng, &priv_key, Hash::Sha256, &digest, None).unwrap();

        let other = Sha256::digest(b"message two").to_vec();
        assert_eq!(
            verify(&pub_key, Hash::Sha256, &other, &sig, None).unwrap_err(),
            Error::Verification
        );
    }

    #[test]
    fn test_trailer_byte_checked() {
        // A signature whose recovered encoding does not end in 0xbc must be
        // rejected; flipping any signature bit achieves that almost surely,
        // so instead corrupt deterministically: verify a valid signature
        // against a key-sized buffer of zeros.
        let priv_key = get_private_key();
        let pub_key = priv_key.to_public_key();
        let digest = Sha256::digest(b"trailer").to_vec();

        let sig = vec![0u8; priv_key.size()];
        assert_eq!(
            verify(&pub_key, Hash::Sha256, &digest, &sig, None).unwrap_err(),
            Error::Verification
        );
    }

    #[test]
    fn test_digest_length_checked() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let priv_key = get_private_key();

        assert_eq!(
            sign(&mut rng, &priv_key, Hash::Sha256, &[0u8; 20], None).unwrap_err(),
            Error::InputNotHashed
        );
    }

    #[test]
    fn test_salt_does_not_fit() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let priv_key = get_private_key();

        let digest = Sha256::digest(b"too big").to_vec();
        let opts = PssOptions {
            salt_length: SaltLength::Fixed(4096),
            hash: None,
        };
        assert_eq!(
            sign(&mut rng, &priv_key, Hash::Sha256, &digest, Some(&opts)).unwrap_err(),
            Error::MessageTooLong
        );
    }
}
