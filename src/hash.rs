//! Digests used to bind an OCSP `CertID` to an issuer.

use const_oid::db::rfc5912::{ID_SHA_1, ID_SHA_256, ID_SHA_384, ID_SHA_512};
use const_oid::ObjectIdentifier;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Hash functions accepted in a `CertID` `hashAlgorithm`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum HashAlgorithm {
    /// SHA-1. Only ever accepted when echoed back by a responder.
    Sha1,
    /// SHA-256, the algorithm requests are built with.
    #[default]
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl HashAlgorithm {
    /// Look up the algorithm named by `oid`.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        match *oid {
            ID_SHA_1 => Some(HashAlgorithm::Sha1),
            ID_SHA_256 => Some(HashAlgorithm::Sha256),
            ID_SHA_384 => Some(HashAlgorithm::Sha384),
            ID_SHA_512 => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }

    /// Returns the object identifier of the hash function.
    pub fn oid(&self) -> ObjectIdentifier {
        match *self {
            HashAlgorithm::Sha1 => ID_SHA_1,
            HashAlgorithm::Sha256 => ID_SHA_256,
            HashAlgorithm::Sha384 => ID_SHA_384,
            HashAlgorithm::Sha512 => ID_SHA_512,
        }
    }

    /// Returns the length in bytes of a digest.
    pub fn size(&self) -> usize {
        match *self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Hash `msg`.
    pub fn digest(&self, msg: &[u8]) -> Vec<u8> {
        match *self {
            HashAlgorithm::Sha1 => Sha1::digest(msg).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(msg).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(msg).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(msg).to_vec(),
        }
    }
}
