//! HTTP transport for OCSP exchanges ([RFC 6960 Appendix A]).
//!
//! [RFC 6960 Appendix A]: https://datatracker.ietf.org/doc/html/rfc6960#appendix-A

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HOST};
use reqwest::Url;
use tracing::debug;

use crate::errors::{Error, Result};

/// MIME type of a DER encoded `OCSPRequest`.
pub const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";

/// MIME type of a DER encoded `OCSPResponse`.
pub const OCSP_RESPONSE_CONTENT_TYPE: &str = "application/ocsp-response";

/// Delivers an encoded `OCSPRequest` to a responder and returns the raw
/// response body.
pub trait OcspTransport: Send + Sync {
    /// Send `request` to the responder at `url`.
    fn post(&self, url: &str, request: &[u8]) -> Result<Vec<u8>>;
}

impl<T: OcspTransport + ?Sized> OcspTransport for Box<T> {
    fn post(&self, url: &str, request: &[u8]) -> Result<Vec<u8>> {
        (**self).post(url, request)
    }
}

impl<T: OcspTransport + ?Sized> OcspTransport for Arc<T> {
    fn post(&self, url: &str, request: &[u8]) -> Result<Vec<u8>> {
        (**self).post(url, request)
    }
}

/// A single blocking HTTP POST per request, without retries.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    max_response_size: usize,
}

impl HttpTransport {
    /// Build a transport whose requests time out after `timeout` and whose
    /// response bodies may not exceed `max_response_size` bytes.
    pub fn new(timeout: Duration, max_response_size: usize) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::HttpClient)?;
        Ok(Self {
            client,
            max_response_size,
        })
    }
}

impl OcspTransport for HttpTransport {
    fn post(&self, url: &str, request: &[u8]) -> Result<Vec<u8>> {
        let parsed = parse_responder_url(url)?;
        let host = authority(&parsed).ok_or_else(|| Error::InvalidResponderUrl {
            url: url.to_string(),
        })?;

        debug!(url, len = request.len(), "sending OCSP request");
        let response = self
            .client
            .post(parsed)
            .header(CONTENT_TYPE, OCSP_REQUEST_CONTENT_TYPE)
            .header(ACCEPT, OCSP_RESPONSE_CONTENT_TYPE)
            .header(HOST, host)
            .body(request.to_vec())
            .send()
            .map_err(|source| Error::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let limit = self.max_response_size;
        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(Error::ResponseTooLarge { limit });
        }

        let mut body = Vec::new();
        response
            .take(limit as u64 + 1)
            .read_to_end(&mut body)
            .map_err(|source| Error::HttpBody {
                url: url.to_string(),
                source,
            })?;
        if body.len() > limit {
            return Err(Error::ResponseTooLarge { limit });
        }

        debug!(url, len = body.len(), "received OCSP response");
        Ok(body)
    }
}

/// Accept only absolute `http` and `https` URLs.
pub(crate) fn parse_responder_url(url: &str) -> Result<Url> {
    if url.is_empty() {
        return Err(Error::NoResponderUrl);
    }
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {
            Ok(parsed)
        }
        _ => Err(Error::InvalidResponderUrl {
            url: url.to_string(),
        }),
    }
}

/// `host[:port]` as it appears in the URL.
fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
