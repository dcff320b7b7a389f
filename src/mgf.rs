//! Mask generation function shared by the OAEP and PSS paddings.

use digest::DynDigest;

use crate::errors::{Error, Result};

/// XORs `out` in place with MGF1(seed): counter-mode output of the hash
/// with a 4-byte big-endian counter, as in RFC 8017 appendix B.2.1. The
/// requested mask may be at most `2^32` hash blocks long. The hash state is
/// reset between invocations.
pub(crate) fn mgf1_xor(out: &mut [u8], digest: &mut dyn DynDigest, seed: &[u8]) -> Result<()> {
    let h_len = digest.output_size() as u64;
    if out.len() as u64 > (1u64 << 32).saturating_mul(h_len) {
        return Err(Error::MaskTooLong);
    }

    let mut counter = [0u8; 4];
    let mut i = 0;

    while i < out.len() {
        digest.update(seed);
        digest.update(&counter);
        let block = digest.finalize_reset();

        let mut j = 0;
        while j < block.len() && i < out.len() {
            out[i] ^= block[j];
            j += 1;
            i += 1;
        }

        inc_counter(&mut counter);
    }

    Ok(())
}

fn inc_counter(counter: &mut [u8; 4]) {
    for i in (0..4).rev() {
        counter[i] = counter[i].wrapping_add(1);
        if counter[i] != 0 {
            // no carry
            return;
        }
    }
}
