//! Encryption and decryption using [OAEP
//! padding](https://datatracker.ietf.org/doc/html/rfc8017#section-7.1).

use num_bigint::BigUint;
use rand::Rng;
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

use crate::errors::{Error, Result};
use crate::hash::Hash;
use crate::internals;
use crate::key::{check_public, PublicKeyParts, RsaPrivateKey};
use crate::mgf::mgf1_xor;

/// Encrypts the given message with RSAES-OAEP.
///
/// `label` binds optional context to the ciphertext without being encrypted
/// itself; decryption must present the identical label. The message must be
/// no longer than the length of the public modulus minus
/// `2 + (2 * hash.size())`.
pub fn encrypt<R: Rng, K: PublicKeyParts>(
    hash: Hash,
    rng: &mut R,
    pub_key: &K,
    msg: &[u8],
    label: &[u8],
) -> Result<Vec<u8>> {
    check_public(pub_key)?;

    let mut digest = hash.new_digest()?;

    let k = pub_key.size();
    let h_len = hash.size();
    if msg.len() + 2 * h_len + 2 > k {
        return Err(Error::MessageTooLong);
    }

    // lHash = Hash(L)
    digest.update(label);
    let l_hash = digest.finalize_reset();

    // EM = 0x00 || maskedSeed || maskedDB
    let mut em = vec![0u8; k];
    let (_, payload) = em.split_at_mut(1);
    let (seed, db) = payload.split_at_mut(h_len);

    // DB = lHash || PS || 0x01 || M
    let db_len = k - h_len - 1;
    db[0..h_len].copy_from_slice(&l_hash);
    db[db_len - msg.len() - 1] = 1;
    db[db_len - msg.len()..].copy_from_slice(msg);

    rng.try_fill_bytes(seed).map_err(|_| Error::RandomSource)?;

    // maskedDB = DB xor MGF1(seed), maskedSeed = seed xor MGF1(maskedDB)
    mgf1_xor(db, &mut *digest, seed)?;
    mgf1_xor(seed, &mut *digest, db)?;

    let m = BigUint::from_bytes_be(&em);
    let c = internals::encrypt(pub_key, &m);
    Ok(internals::left_pad(&c.to_bytes_be(), k))
}

/// Decrypts an RSAES-OAEP ciphertext, blinding the private operation when
/// an `rng` is passed. Beyond a mismatched hash choice, every failure mode
/// collapses into [`Error::Decryption`]: a caller that can distinguish a
/// wrong label from broken padding has an oracle.
pub fn decrypt<R: Rng>(
    hash: Hash,
    rng: Option<&mut R>,
    priv_key: &RsaPrivateKey,
    ciphertext: &[u8],
    label: &[u8],
) -> Result<Vec<u8>> {
    check_public(priv_key)?;

    let mut digest = hash.new_digest()?;

    let k = priv_key.size();
    let h_len = hash.size();
    if ciphertext.len() != k || k < 2 * h_len + 2 {
        return Err(Error::Decryption);
    }

    let c = BigUint::from_bytes_be(ciphertext);
    let m = internals::decrypt(rng, priv_key, &c)?;
    let em = internals::left_pad(&m.to_bytes_be(), k);

    let (valid, em, index) = decrypt_inner(em, h_len, &mut *digest, label)?;
    if valid.unwrap_u8() == 0 {
        return Err(Error::Decryption);
    }

    Ok(em[index as usize..].to_vec())
}

/// Reverses the two mask steps and validates the encoding. The validity
/// bits are accumulated over the whole buffer with constant-time selects
/// and inspected exactly once, after the scan.
fn decrypt_inner(
    mut em: Vec<u8>,
    h_len: usize,
    digest: &mut dyn digest::DynDigest,
    label: &[u8],
) -> Result<(Choice, Vec<u8>, u32)> {
    // lHash' = Hash(L)
    digest.update(label);
    let expected_l_hash = digest.finalize_reset();

    let first_byte_is_zero = em[0].ct_eq(&0u8);

    {
        let (_, payload) = em.split_at_mut(1);
        let (seed, db) = payload.split_at_mut(h_len);

        // seed = maskedSeed xor MGF1(maskedDB), DB = maskedDB xor MGF1(seed)
        mgf1_xor(seed, digest, db).map_err(|_| Error::Decryption)?;
        mgf1_xor(db, digest, seed).map_err(|_| Error::Decryption)?;
    }

    let db = &em[1 + h_len..];
    let hashes_are_equal = db[0..h_len].ct_eq(&expected_l_hash);

    // Past lHash the data block must be zero or more 0x00, then 0x01, then
    // the message.
    //   looking_for_index: 1 iff the 0x01 has not been seen yet.
    //   index: offset of the first 0x01 byte.
    //   nonzero_before_one: 1 iff a stray byte preceded the 0x01.
    let mut looking_for_index = Choice::from(1u8);
    let mut index = 0u32;
    let mut nonzero_before_one = Choice::from(0u8);

    for (i, el) in db.iter().skip(h_len).enumerate() {
        let equals0 = el.ct_eq(&0u8);
        let equals1 = el.ct_eq(&1u8);
        index.conditional_assign(&(i as u32), looking_for_index & equals1);
        looking_for_index &= !equals1;
        nonzero_before_one |= looking_for_index & !equals0;
    }

    let valid = first_byte_is_zero & hashes_are_equal & !nonzero_before_one & !looking_for_index;
    let index = u32::conditional_select(&0, &(index + 2 + (h_len * 2) as u32), valid);

    Ok((valid, em, index))
}
