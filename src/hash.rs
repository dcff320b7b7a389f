//! Hash algorithm identifiers and their PKCS#1 v1.5 `DigestInfo` prefixes.

use digest::{Digest, DynDigest};
use md5::Md5;
use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};

use crate::errors::{Error, Result};

/// Hash functions usable with the signature and encryption schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hash {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Ripemd160,
    /// Concatenated MD5 and SHA-1 digest, as used by TLS 1.1 and earlier.
    /// It is signed without a `DigestInfo` prefix and cannot drive MGF1,
    /// so it is rejected by the OAEP and PSS schemes.
    Md5Sha1,
}

impl Hash {
    /// Length in bytes of a digest.
    pub fn size(&self) -> usize {
        match self {
            Hash::Md5 => 16,
            Hash::Sha1 => 20,
            Hash::Sha224 => 28,
            Hash::Sha256 => 32,
            Hash::Sha384 => 48,
            Hash::Sha512 => 64,
            Hash::Ripemd160 => 20,
            Hash::Md5Sha1 => 36,
        }
    }

    /// DER encoded `DigestInfo` prefix for the hash; the raw digest octets
    /// follow it directly.
    ///
    ///   DigestInfo ::= SEQUENCE {
    ///     digestAlgorithm AlgorithmIdentifier,
    ///     digest OCTET STRING
    ///   }
    pub fn asn1_prefix(&self) -> &'static [u8] {
        match self {
            Hash::Md5 => &[
                0x30, 0x20, 0x30, 0x0c, 0x06, 0x08, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x02,
                0x05, 0x05, 0x00, 0x04, 0x10,
            ],
            Hash::Sha1 => &[
                0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00,
                0x04, 0x14,
            ],
            Hash::Sha224 => &[
                0x30, 0x2d, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04,
                0x02, 0x04, 0x05, 0x00, 0x04, 0x1c,
            ],
            Hash::Sha256 => &[
                0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04,
                0x02, 0x01, 0x05, 0x00, 0x04, 0x20,
            ],
            Hash::Sha384 => &[
                0x30, 0x41, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04,
                0x02, 0x02, 0x05, 0x00, 0x04, 0x30,
            ],
            Hash::Sha512 => &[
                0x30, 0x51, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04,
                0x02, 0x03, 0x05, 0x00, 0x04, 0x40,
            ],
            Hash::Ripemd160 => &[
                0x30, 0x20, 0x30, 0x08, 0x06, 0x06, 0x28, 0xcf, 0x06, 0x03, 0x00, 0x31, 0x04,
                0x14,
            ],
            // A special TLS case which doesn't use an ASN1 prefix.
            Hash::Md5Sha1 => &[],
        }
    }

    /// Fresh incremental hasher for this algorithm.
    pub(crate) fn new_digest(&self) -> Result<Box<dyn DynDigest>> {
        match self {
            Hash::Md5 => Ok(Box::new(Md5::new())),
            Hash::Sha1 => Ok(Box::new(Sha1::new())),
            Hash::Sha224 => Ok(Box::new(Sha224::new())),
            Hash::Sha256 => Ok(Box::new(Sha256::new())),
            Hash::Sha384 => Ok(Box::new(Sha384::new())),
            Hash::Sha512 => Ok(Box::new(Sha512::new())),
            Hash::Ripemd160 => Ok(Box::new(Ripemd160::new())),
            Hash::Md5Sha1 => Err(Error::UnsupportedHash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Hash; 8] = [
        Hash::Md5,
        Hash::Sha1,
        Hash::Sha224,
        Hash::Sha256,
        Hash::Sha384,
        Hash::Sha512,
        Hash::Ripemd160,
        Hash::Md5Sha1,
    ];

    #[test]
    fn test_prefix_encodes_digest_length() {
        // The final octet of every DigestInfo prefix is the digest length.
        for hash in ALL {
            let prefix = hash.asn1_prefix();
            if hash == Hash::Md5Sha1 {
                assert!(prefix.is_empty());
                continue;
            }
            assert_eq!(*prefix.last().unwrap() as usize, hash.size(), "{:?}", hash);
        }
    }

    #[test]
    fn test_digest_sizes() {
        for hash in ALL {
            match hash.new_digest() {
                Ok(digest) => assert_eq!(digest.output_size(), hash.size(), "{:?}", hash),
                Err(err) => {
                    assert_eq!(hash, Hash::Md5Sha1);
                    assert_eq!(err, Error::UnsupportedHash);
                }
            }
        }
    }
}
