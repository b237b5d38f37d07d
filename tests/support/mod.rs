//! Test PKI: certificates, CRLs and OCSP responses signed with the fixture
//! keys in `tests/fixtures`.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use const_oid::db::rfc5280::ID_KP_SERVER_AUTH;
use const_oid::db::rfc5912::{
    ECDSA_WITH_SHA_256, ECDSA_WITH_SHA_384, ID_AD_OCSP, ID_KP_OCSP_SIGNING, ID_RSASSA_PSS,
    SHA_256_WITH_RSA_ENCRYPTION,
};
use const_oid::db::rfc6960::ID_PKIX_OCSP_BASIC;
use const_oid::db::rfc8410::ID_ED_25519;
use const_oid::{AssociatedOid, ObjectIdentifier};
use der::asn1::{Any, BitString, Ia5String, OctetString};
use der::{Decode, Encode};
use pkcs8::{DecodePrivateKey, EncodePublicKey};
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use ring::signature::{Ed25519KeyPair, KeyPair};
use rsa::pkcs1::RsaPssParams;
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256, Sha384};
use signature::hazmat::PrehashSigner;
use signature::{RandomizedSigner, SignatureEncoding, Signer};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::certificate::{Certificate, TbsCertificate, Version};
use x509_cert::crl::{CertificateList, RevokedCert, TbsCertList};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{
    AccessDescription, AuthorityInfoAccessSyntax, BasicConstraints, CrlReason, ExtendedKeyUsage,
    SubjectAltName,
};
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};

use x509_revocation::x509_ocsp::{
    BasicOcspResponse, CertId, CertStatus, OcspGeneralizedTime, OcspRequest, OcspResponse,
    OcspResponseStatus, ResponderId, ResponseBytes, ResponseData, RevokedInfo, SingleResponse,
    Version as OcspVersion,
};
use x509_revocation::ocsp::OcspTransport;
use x509_revocation::{CertificateRef, HashAlgorithm, Result};

pub const HOUR: Duration = Duration::from_secs(60 * 60);
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

pub const OCSP_URL: &str = "http://ocsp.test.invalid/ocsp";

/// Fixed reference time used by all offline tests.
pub fn now() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_750_000_000)
}

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}.pem", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("{path}: {err}"))
}

fn time(t: SystemTime) -> Time {
    Time::try_from(t).unwrap()
}

pub fn generalized(t: SystemTime) -> OcspGeneralizedTime {
    OcspGeneralizedTime::try_from(t).unwrap()
}

pub fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

fn extension<T: AssociatedOid + Encode>(critical: bool, value: &T) -> Extension {
    Extension {
        extn_id: T::OID,
        critical,
        extn_value: OctetString::new(value.to_der().unwrap()).unwrap(),
    }
}

/// Digest an ECDSA key signs with, independent of its curve.
#[derive(Clone, Copy, Debug)]
pub enum EcdsaHash {
    Sha256,
    Sha384,
}

/// A signing key loaded from `tests/fixtures`.
#[derive(Clone)]
pub enum Key {
    Rsa(RsaPrivateKey),
    RsaPss(RsaPrivateKey),
    P256(p256::ecdsa::SigningKey, EcdsaHash),
    P384(p384::ecdsa::SigningKey, EcdsaHash),
    Ed25519(Arc<Ed25519KeyPair>),
}

impl Key {
    pub fn rsa(fixture_name: &str) -> Self {
        Key::Rsa(RsaPrivateKey::from_pkcs8_pem(&fixture(fixture_name)).unwrap())
    }

    /// RSASSA-PSS with SHA-256 and a 32 byte salt.
    pub fn rsa_pss(fixture_name: &str) -> Self {
        Key::RsaPss(RsaPrivateKey::from_pkcs8_pem(&fixture(fixture_name)).unwrap())
    }

    pub fn p256(fixture_name: &str) -> Self {
        let key = p256::ecdsa::SigningKey::from_pkcs8_pem(&fixture(fixture_name)).unwrap();
        Key::P256(key, EcdsaHash::Sha256)
    }

    pub fn p384(fixture_name: &str) -> Self {
        let key = p384::ecdsa::SigningKey::from_pkcs8_pem(&fixture(fixture_name)).unwrap();
        Key::P384(key, EcdsaHash::Sha384)
    }

    pub fn ed25519(fixture_name: &str) -> Self {
        let (_, der) = der::pem::decode_vec(fixture(fixture_name).as_bytes()).unwrap();
        Key::Ed25519(Arc::new(
            Ed25519KeyPair::from_pkcs8_maybe_unchecked(&der).unwrap(),
        ))
    }

    /// The same ECDSA key signing with `hash` instead.
    pub fn with_hash(self, hash: EcdsaHash) -> Self {
        match self {
            Key::P256(key, _) => Key::P256(key, hash),
            Key::P384(key, _) => Key::P384(key, hash),
            other => other,
        }
    }

    /// PKCS#8 PEM of the key, as a TLS server would load it.
    pub fn pem(fixture_name: &str) -> String {
        fixture(fixture_name)
    }

    pub fn spki(&self) -> SubjectPublicKeyInfoOwned {
        let doc = match self {
            Key::Rsa(key) | Key::RsaPss(key) => key.to_public_key().to_public_key_der().unwrap(),
            Key::P256(key, _) => key.verifying_key().to_public_key_der().unwrap(),
            Key::P384(key, _) => key.verifying_key().to_public_key_der().unwrap(),
            Key::Ed25519(key) => {
                return SubjectPublicKeyInfoOwned {
                    algorithm: AlgorithmIdentifierOwned {
                        oid: ID_ED_25519,
                        parameters: None,
                    },
                    subject_public_key: BitString::from_bytes(key.public_key().as_ref()).unwrap(),
                }
            }
        };
        SubjectPublicKeyInfoOwned::from_der(doc.as_bytes()).unwrap()
    }

    pub fn algorithm(&self) -> AlgorithmIdentifierOwned {
        let ecdsa = |hash: EcdsaHash| AlgorithmIdentifierOwned {
            oid: match hash {
                EcdsaHash::Sha256 => ECDSA_WITH_SHA_256,
                EcdsaHash::Sha384 => ECDSA_WITH_SHA_384,
            },
            parameters: None,
        };
        match self {
            Key::Rsa(_) => AlgorithmIdentifierOwned {
                oid: SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(Any::null()),
            },
            Key::RsaPss(_) => AlgorithmIdentifierOwned {
                oid: ID_RSASSA_PSS,
                parameters: Some(Any::encode_from(&RsaPssParams::new::<Sha256>(32)).unwrap()),
            },
            Key::P256(_, hash) | Key::P384(_, hash) => ecdsa(*hash),
            Key::Ed25519(_) => AlgorithmIdentifierOwned {
                oid: ID_ED_25519,
                parameters: None,
            },
        }
    }

    pub fn sign(&self, msg: &[u8]) -> BitString {
        let prehash = |hash: EcdsaHash| match hash {
            EcdsaHash::Sha256 => Sha256::digest(msg).to_vec(),
            EcdsaHash::Sha384 => Sha384::digest(msg).to_vec(),
        };
        let signature = match self {
            Key::Rsa(key) => rsa::pkcs1v15::SigningKey::<Sha256>::new(key.clone())
                .sign(msg)
                .to_vec(),
            Key::RsaPss(key) => {
                let mut rng = ChaCha8Rng::from_seed([42; 32]);
                rsa::pss::SigningKey::<Sha256>::new(key.clone())
                    .sign_with_rng(&mut rng, msg)
                    .to_vec()
            }
            Key::P256(key, hash) => {
                let signature: p256::ecdsa::Signature = key.sign_prehash(&prehash(*hash)).unwrap();
                signature.to_der().to_vec()
            }
            Key::P384(key, hash) => {
                let signature: p384::ecdsa::Signature = key.sign_prehash(&prehash(*hash)).unwrap();
                signature.to_der().to_vec()
            }
            Key::Ed25519(key) => key.sign(msg).as_ref().to_vec(),
        };
        BitString::from_bytes(&signature).unwrap()
    }
}

/// Contents of a certificate to issue.
#[derive(Clone, Debug)]
pub struct CertParams {
    pub serial: SerialNumber,
    pub subject: Name,
    pub not_before: SystemTime,
    pub not_after: SystemTime,
    pub ca: bool,
    pub ocsp_urls: Vec<String>,
    pub eku: Vec<ObjectIdentifier>,
    pub dns_names: Vec<String>,
}

impl CertParams {
    /// An end-entity certificate valid for a day either side of [`now`],
    /// pointing at [`OCSP_URL`].
    pub fn leaf(serial: u64) -> Self {
        Self {
            serial: SerialNumber::from(serial),
            subject: name("CN=leaf.test"),
            not_before: now() - DAY,
            not_after: now() + DAY,
            ca: false,
            ocsp_urls: vec![OCSP_URL.to_string()],
            eku: vec![ID_KP_SERVER_AUTH],
            dns_names: Vec::new(),
        }
    }

    /// A delegated OCSP signer.
    pub fn responder(serial: u64) -> Self {
        Self {
            subject: name("CN=OCSP Responder"),
            ocsp_urls: Vec::new(),
            eku: vec![ID_KP_OCSP_SIGNING],
            ..Self::leaf(serial)
        }
    }

    pub fn serial_bytes(mut self, bytes: &[u8]) -> Self {
        self.serial = SerialNumber::new(bytes).unwrap();
        self
    }

    pub fn ocsp_urls(mut self, urls: &[&str]) -> Self {
        self.ocsp_urls = urls.iter().map(|url| url.to_string()).collect();
        self
    }

    pub fn validity(mut self, not_before: SystemTime, not_after: SystemTime) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    pub fn eku(mut self, eku: &[ObjectIdentifier]) -> Self {
        self.eku = eku.to_vec();
        self
    }

    pub fn dns_name(mut self, dns_name: &str) -> Self {
        self.dns_names.push(dns_name.to_string());
        self
    }

    fn extensions(&self) -> Vec<Extension> {
        let mut extensions = Vec::new();
        if self.ca {
            extensions.push(extension(
                true,
                &BasicConstraints {
                    ca: true,
                    path_len_constraint: None,
                },
            ));
        }
        if !self.ocsp_urls.is_empty() {
            let aia = self
                .ocsp_urls
                .iter()
                .map(|url| AccessDescription {
                    access_method: ID_AD_OCSP,
                    access_location: GeneralName::UniformResourceIdentifier(
                        Ia5String::new(url).unwrap(),
                    ),
                })
                .collect();
            extensions.push(extension(false, &AuthorityInfoAccessSyntax(aia)));
        }
        if !self.eku.is_empty() {
            extensions.push(extension(false, &ExtendedKeyUsage(self.eku.clone())));
        }
        if !self.dns_names.is_empty() {
            let names = self
                .dns_names
                .iter()
                .map(|dns| GeneralName::DnsName(Ia5String::new(dns).unwrap()))
                .collect();
            extensions.push(extension(false, &SubjectAltName(names)));
        }
        extensions
    }
}

fn issue(params: &CertParams, subject_key: &Key, issuer: &Name, signer: &Key) -> CertificateRef {
    let extensions = params.extensions();
    let tbs = TbsCertificate {
        version: Version::V3,
        serial_number: params.serial.clone(),
        signature: signer.algorithm(),
        issuer: issuer.clone(),
        validity: Validity {
            not_before: time(params.not_before),
            not_after: time(params.not_after),
        },
        subject: params.subject.clone(),
        subject_public_key_info: subject_key.spki(),
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: (!extensions.is_empty()).then_some(extensions),
    };
    let signature = signer.sign(&tbs.to_der().unwrap());
    let cert = Certificate {
        tbs_certificate: tbs,
        signature_algorithm: signer.algorithm(),
        signature,
    };
    CertificateRef::from_der(cert.to_der().unwrap()).unwrap()
}

/// `cert` relabelled with signature algorithm `oid`, leaving the signature
/// bytes untouched.
pub fn with_signature_algorithm(cert: &CertificateRef, oid: ObjectIdentifier) -> CertificateRef {
    let mut cert = Certificate::from_der(cert.der()).unwrap();
    cert.signature_algorithm = AlgorithmIdentifierOwned {
        oid,
        parameters: Some(Any::null()),
    };
    CertificateRef::from_der(cert.to_der().unwrap()).unwrap()
}

/// A certificate authority with its key.
pub struct Authority {
    pub cert: CertificateRef,
    pub key: Key,
}

impl Authority {
    /// Self-signed root named `subject`.
    pub fn root(subject: &str, key: Key) -> Self {
        let subject = name(subject);
        let params = CertParams {
            serial: SerialNumber::from(1u32),
            subject: subject.clone(),
            not_before: now() - 3650 * DAY,
            not_after: now() + 3650 * DAY,
            ca: true,
            ocsp_urls: Vec::new(),
            eku: Vec::new(),
            dns_names: Vec::new(),
        };
        let cert = issue(&params, &key, &subject, &key);
        Self { cert, key }
    }

    /// The `CN=Test CA` root on the RSA fixture key.
    pub fn test_ca() -> Self {
        Self::root("CN=Test CA", Key::rsa("ca-rsa2048"))
    }

    /// A different key claiming the same name as [`Authority::test_ca`].
    pub fn impostor() -> Self {
        Self::root("CN=Test CA", Key::rsa("rogue-rsa2048"))
    }

    /// Sign a certificate for `subject_key`.
    pub fn issue(&self, params: &CertParams, subject_key: &Key) -> CertificateRef {
        issue(params, subject_key, self.cert.subject(), &self.key)
    }

    /// Leaf certificate on the leaf fixture key.
    pub fn leaf(&self, params: &CertParams) -> CertificateRef {
        self.issue(params, &Key::rsa("leaf-rsa2048"))
    }

    /// Sign a CRL naming this authority as issuer.
    pub fn crl(&self, params: &CrlParams) -> Vec<u8> {
        params.sign(self.cert.subject(), &self.key)
    }
}

/// Contents of a CRL to sign.
#[derive(Clone, Debug)]
pub struct CrlParams {
    pub this_update: SystemTime,
    pub next_update: Option<SystemTime>,
    pub revoked: Vec<(SerialNumber, Option<CrlReason>)>,
}

impl CrlParams {
    /// Issued an hour before [`now`], next update a day after.
    pub fn current() -> Self {
        Self {
            this_update: now() - HOUR,
            next_update: Some(now() + DAY),
            revoked: Vec::new(),
        }
    }

    pub fn revoke(mut self, serial: u64, reason: Option<CrlReason>) -> Self {
        self.revoked.push((SerialNumber::from(serial), reason));
        self
    }

    pub fn revoke_serial(mut self, serial: SerialNumber) -> Self {
        self.revoked.push((serial, None));
        self
    }

    pub fn next_update(mut self, next_update: Option<SystemTime>) -> Self {
        self.next_update = next_update;
        self
    }

    pub fn tbs(&self, issuer: &Name, algorithm: AlgorithmIdentifierOwned) -> TbsCertList {
        let revoked: Vec<_> = self
            .revoked
            .iter()
            .map(|(serial, reason)| RevokedCert {
                serial_number: serial.clone(),
                revocation_date: time(self.this_update - HOUR),
                crl_entry_extensions: reason.map(|reason| vec![extension(false, &reason)]),
            })
            .collect();
        TbsCertList {
            version: Version::V2,
            signature: algorithm,
            issuer: issuer.clone(),
            this_update: time(self.this_update),
            next_update: self.next_update.map(time),
            revoked_certificates: (!revoked.is_empty()).then_some(revoked),
            crl_extensions: None,
        }
    }

    pub fn sign(&self, issuer: &Name, key: &Key) -> Vec<u8> {
        let tbs = self.tbs(issuer, key.algorithm());
        let signature = key.sign(&tbs.to_der().unwrap());
        CertificateList {
            tbs_cert_list: tbs,
            signature_algorithm: key.algorithm(),
            signature,
        }
        .to_der()
        .unwrap()
    }
}

pub fn responder_by_name(cert: &CertificateRef) -> ResponderId {
    ResponderId::ByName(cert.subject().clone())
}

pub fn responder_by_key(cert: &CertificateRef) -> ResponderId {
    let key = cert
        .subject_public_key_info()
        .subject_public_key
        .raw_bytes();
    ResponderId::ByKey(OctetString::new(HashAlgorithm::Sha1.digest(key)).unwrap())
}

pub fn good() -> CertStatus {
    CertStatus::good()
}

pub fn unknown() -> CertStatus {
    CertStatus::unknown()
}

pub fn revoked(at: SystemTime, reason: Option<CrlReason>) -> CertStatus {
    CertStatus::Revoked(RevokedInfo {
        revocation_time: generalized(at),
        revocation_reason: reason,
    })
}

/// A `SingleResponse` for `cert_id`, current at [`now`].
pub fn single(cert_id: CertId, cert_status: CertStatus) -> SingleResponse {
    SingleResponse {
        cert_id,
        cert_status,
        this_update: generalized(now() - HOUR),
        next_update: Some(generalized(now() + HOUR)),
        single_extensions: None,
    }
}

/// Sign `responses` with `key` and wrap them into a successful
/// `OCSPResponse`, embedding `certs`.
pub fn ocsp_response(
    key: &Key,
    responder_id: ResponderId,
    responses: Vec<SingleResponse>,
    certs: &[&CertificateRef],
) -> Vec<u8> {
    let data = ResponseData {
        version: OcspVersion::V1,
        responder_id,
        produced_at: generalized(now()),
        responses,
        response_extensions: None,
    };
    let signature = key.sign(&data.to_der().unwrap());
    let certs = certs
        .iter()
        .map(|cert| Certificate::from_der(cert.der()).unwrap())
        .collect::<Vec<_>>();
    let basic = BasicOcspResponse {
        tbs_response_data: data,
        signature_algorithm: key.algorithm(),
        signature,
        certs: (!certs.is_empty()).then_some(certs),
    };

    OcspResponse {
        response_status: OcspResponseStatus::Successful,
        response_bytes: Some(ResponseBytes {
            response_type: ID_PKIX_OCSP_BASIC,
            response: OctetString::new(basic.to_der().unwrap()).unwrap(),
        }),
    }
    .to_der()
    .unwrap()
}

/// The `CertID` of the only request in an encoded `OCSPRequest`.
pub fn requested_cert_id(request: &[u8]) -> CertId {
    let request = OcspRequest::from_der(request).unwrap();
    assert_eq!(request.tbs_request.request_list.len(), 1);
    request.tbs_request.request_list[0].req_cert.clone()
}

type Handler = dyn Fn(&str, &[u8]) -> Result<Vec<u8>> + Send + Sync;

/// In-memory responder recording every request it receives.
pub struct MockResponder {
    handler: Box<Handler>,
    requests: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MockResponder {
    pub fn new(handler: impl Fn(&str, &[u8]) -> Result<Vec<u8>> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request with `status`, signed by `ca` itself.
    pub fn signed_by(ca: &Authority, status: CertStatus) -> Self {
        let cert = ca.cert.clone();
        let key = ca.key.clone();
        Self::new(move |_, request| {
            let cert_id = requested_cert_id(request);
            Ok(ocsp_response(
                &key,
                responder_by_name(&cert),
                vec![single(cert_id, status.clone())],
                &[],
            ))
        })
    }

    /// URLs queried so far, in order.
    pub fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Encoded `OCSPRequest`s received so far, in order.
    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl OcspTransport for MockResponder {
    fn post(&self, url: &str, request: &[u8]) -> Result<Vec<u8>> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), request.to_vec()));
        (self.handler)(url, request)
    }
}

/// Write `der` to a fresh temporary CRL file.
pub fn crl_file(der: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(der).unwrap();
    file.flush().unwrap();
    file
}
