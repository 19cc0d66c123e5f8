use md5::{Digest, Md5};
use scanvault_core::Fingerprint;

/// Hex MD5 of the raw document. Only used to spot re-uploads of the same
/// file, so collision resistance against an attacker does not matter.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    Fingerprint::from(hex::encode(hasher.finalize()))
}
