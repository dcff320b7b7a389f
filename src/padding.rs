use crate::hash::Hash;
use crate::pss::PssOptions;

/// Selects the padding scheme for the key-level encrypt, decrypt, sign and
/// verify entry points. Operations reject schemes that do not apply to them
/// (for example PSS decryption) with
/// [`Error::EncryptionOption`](crate::errors::Error::EncryptionOption).
#[derive(Debug, Clone)]
pub enum PaddingScheme {
    /// PKCS#1 v1.5: EME for encryption, EMSA for signatures.
    Pkcs1v15,
    /// EME-OAEP with the given hash and label.
    Oaep { hash: Hash, label: Vec<u8> },
    /// EMSA-PSS signatures with the given options.
    Pss(PssOptions),
}
