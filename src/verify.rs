//! Signature checks over DER `SIGNED{...}` structures as described in
//! [RFC 5280 § 4.1.1.3] and [RFC 6960 § 4.2.1].
//!
//! The to-be-signed portion is kept as the exact bytes received so that the
//! signature is checked over what the signer produced, never over a
//! re-encoding of it.
//!
//! [RFC 5280 § 4.1.1.3]: https://datatracker.ietf.org/doc/html/rfc5280#section-4.1.1.3
//! [RFC 6960 § 4.2.1]: https://datatracker.ietf.org/doc/html/rfc6960#section-4.2.1

use const_oid::db::rfc5912::{
    ECDSA_WITH_SHA_256, ECDSA_WITH_SHA_384, ECDSA_WITH_SHA_512, ID_EC_PUBLIC_KEY, ID_MGF_1,
    ID_RSASSA_PSS, ID_SHA_256, ID_SHA_384, ID_SHA_512, RSA_ENCRYPTION, SECP_256_R_1,
    SECP_384_R_1, SHA_1_WITH_RSA_ENCRYPTION, SHA_256_WITH_RSA_ENCRYPTION,
    SHA_384_WITH_RSA_ENCRYPTION, SHA_512_WITH_RSA_ENCRYPTION,
};
use const_oid::db::rfc8410::ID_ED_25519;
use const_oid::{AssociatedOid, ObjectIdentifier};
use der::asn1::{AnyRef, BitStringRef};
use der::{Decode, Encode, Sequence};
use digest::{Digest, FixedOutputReset};
use pkcs8::DecodePublicKey;
use rsa::pkcs1::RsaPssParams;
use rsa::RsaPublicKey;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use signature::hazmat::PrehashVerifier;
use signature::Verifier;
use spki::{AlgorithmIdentifierRef, SubjectPublicKeyInfoOwned};

use crate::errors::{Error, Result};
use crate::hash::HashAlgorithm;

/// A signed structure whose to-be-signed part has not been decoded.
///
/// ```text
/// SIGNED ::= SEQUENCE {
///    toBeSigned              ANY,
///    signatureAlgorithm      AlgorithmIdentifier,
///    signature               BIT STRING,
///    certs               [0] EXPLICIT SEQUENCE OF Certificate OPTIONAL }
/// ```
///
/// `certs` is only ever present in a `BasicOCSPResponse`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct SignedData<'a> {
    pub tbs: AnyRef<'a>,
    pub signature_algorithm: AlgorithmIdentifierRef<'a>,
    pub signature: BitStringRef<'a>,

    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub certs: Option<Vec<AnyRef<'a>>>,
}

impl<'a> SignedData<'a> {
    /// Split a DER encoded signed structure.
    pub fn parse(der: &'a [u8]) -> Result<Self> {
        Ok(Self::from_der(der)?)
    }

    /// Check the signature with `signer`'s public key.
    pub fn verify_with(&self, signer: &SubjectPublicKeyInfoOwned) -> Result<()> {
        let tbs = self.tbs.to_der()?;
        let signature = self.signature.as_bytes().ok_or(Error::SignatureMismatch)?;
        verify_signature(&tbs, &self.signature_algorithm, signature, signer)
    }
}

/// Verify `signature` over `msg` with the public key in `signer`.
///
/// Supported algorithms:
///
/// - `sha{1,256,384,512}WithRSAEncryption` ([RFC 8017 § 8.2] `RSASSA-PKCS1-v1_5`)
/// - `id-RSASSA-PSS` with SHA-256, SHA-384 or SHA-512 and MGF1 over the same
///   hash ([RFC 4055 § 3.1])
/// - `ecdsa-with-SHA{256,384,512}` over P-256 or P-384, in any combination
/// - `id-Ed25519` ([RFC 8410])
///
/// [RFC 8017 § 8.2]: https://datatracker.ietf.org/doc/html/rfc8017#section-8.2
/// [RFC 4055 § 3.1]: https://datatracker.ietf.org/doc/html/rfc4055#section-3.1
/// [RFC 8410]: https://datatracker.ietf.org/doc/html/rfc8410
pub fn verify_signature(
    msg: &[u8],
    algorithm: &AlgorithmIdentifierRef<'_>,
    signature: &[u8],
    signer: &SubjectPublicKeyInfoOwned,
) -> Result<()> {
    match algorithm.oid {
        SHA_1_WITH_RSA_ENCRYPTION
        | SHA_256_WITH_RSA_ENCRYPTION
        | SHA_384_WITH_RSA_ENCRYPTION
        | SHA_512_WITH_RSA_ENCRYPTION => {
            // parameters MUST be NULL, some encoders omit them
            if algorithm.parameters.is_some_and(|p| p != AnyRef::NULL) {
                return Err(Error::UnsupportedSignatureAlgorithm(algorithm.oid));
            }
            let key = rsa_key(signer)?;
            match algorithm.oid {
                SHA_1_WITH_RSA_ENCRYPTION => verify_pkcs1v15::<Sha1>(msg, signature, key),
                SHA_256_WITH_RSA_ENCRYPTION => verify_pkcs1v15::<Sha256>(msg, signature, key),
                SHA_384_WITH_RSA_ENCRYPTION => verify_pkcs1v15::<Sha384>(msg, signature, key),
                _ => verify_pkcs1v15::<Sha512>(msg, signature, key),
            }
        }
        ID_RSASSA_PSS => verify_pss(msg, algorithm, signature, signer),
        ECDSA_WITH_SHA_256 => verify_ecdsa(HashAlgorithm::Sha256, msg, signature, signer),
        ECDSA_WITH_SHA_384 => verify_ecdsa(HashAlgorithm::Sha384, msg, signature, signer),
        ECDSA_WITH_SHA_512 => verify_ecdsa(HashAlgorithm::Sha512, msg, signature, signer),
        ID_ED_25519 => {
            if signer.algorithm.oid != ID_ED_25519 {
                return Err(Error::UnsupportedKey);
            }
            let key = ring::signature::UnparsedPublicKey::new(
                &ring::signature::ED25519,
                signer.subject_public_key.raw_bytes(),
            );
            key.verify(msg, signature)
                .map_err(|_| Error::SignatureMismatch)
        }
        oid => Err(Error::UnsupportedSignatureAlgorithm(oid)),
    }
}

fn rsa_key(signer: &SubjectPublicKeyInfoOwned) -> Result<RsaPublicKey> {
    if signer.algorithm.oid != RSA_ENCRYPTION {
        return Err(Error::UnsupportedKey);
    }
    RsaPublicKey::from_public_key_der(&signer.to_der()?).map_err(|_| Error::UnsupportedKey)
}

fn verify_pkcs1v15<D>(msg: &[u8], signature: &[u8], key: RsaPublicKey) -> Result<()>
where
    D: Digest + AssociatedOid,
{
    let signature = rsa::pkcs1v15::Signature::try_from(signature)?;
    rsa::pkcs1v15::VerifyingKey::<D>::new(key).verify(msg, &signature)?;
    Ok(())
}

/// `RSASSA-PSS` with the hash, MGF1 hash and salt length taken from the
/// algorithm parameters.
fn verify_pss(
    msg: &[u8],
    algorithm: &AlgorithmIdentifierRef<'_>,
    signature: &[u8],
    signer: &SubjectPublicKeyInfoOwned,
) -> Result<()> {
    let unsupported = || Error::UnsupportedSignatureAlgorithm(algorithm.oid);

    // the all-default parameters select SHA-1, which is not accepted
    let params: RsaPssParams<'_> = algorithm.parameters.ok_or_else(unsupported)?.decode_as()?;
    let mgf_hash = params.mask_gen.parameters.map(|hash| hash.oid);
    if params.mask_gen.oid != ID_MGF_1 || mgf_hash != Some(params.hash.oid) {
        return Err(unsupported());
    }

    let key = rsa_key(signer)?;
    let salt_len = usize::from(params.salt_len);
    match params.hash.oid {
        ID_SHA_256 => verify_pss_with::<Sha256>(msg, signature, key, salt_len),
        ID_SHA_384 => verify_pss_with::<Sha384>(msg, signature, key, salt_len),
        ID_SHA_512 => verify_pss_with::<Sha512>(msg, signature, key, salt_len),
        _ => Err(unsupported()),
    }
}

fn verify_pss_with<D>(msg: &[u8], signature: &[u8], key: RsaPublicKey, salt_len: usize) -> Result<()>
where
    D: Digest + FixedOutputReset,
{
    let signature = rsa::pss::Signature::try_from(signature)?;
    rsa::pss::VerifyingKey::<D>::new_with_salt_len(key, salt_len).verify(msg, &signature)?;
    Ok(())
}

/// ECDSA over the curve named in `signer`, with the message hashed by
/// `hash` regardless of the curve size.
fn verify_ecdsa(
    hash: HashAlgorithm,
    msg: &[u8],
    signature: &[u8],
    signer: &SubjectPublicKeyInfoOwned,
) -> Result<()> {
    if signer.algorithm.oid != ID_EC_PUBLIC_KEY {
        return Err(Error::UnsupportedKey);
    }
    let curve = signer
        .algorithm
        .parameters
        .as_ref()
        .and_then(|params| params.decode_as::<ObjectIdentifier>().ok())
        .ok_or(Error::UnsupportedKey)?;
    let key = signer.to_der()?;
    let prehash = hash.digest(msg);

    match curve {
        SECP_256_R_1 => {
            let key = p256::ecdsa::VerifyingKey::from_public_key_der(&key)
                .map_err(|_| Error::UnsupportedKey)?;
            let signature = p256::ecdsa::Signature::from_der(signature)?;
            Ok(key.verify_prehash(&prehash, &signature)?)
        }
        SECP_384_R_1 => {
            let key = p384::ecdsa::VerifyingKey::from_public_key_der(&key)
                .map_err(|_| Error::UnsupportedKey)?;
            let signature = p384::ecdsa::Signature::from_der(signature)?;
            Ok(key.verify_prehash(&prehash, &signature)?)
        }
        _ => Err(Error::UnsupportedKey),
    }
}
