//! Request assembly: verb, target, query parameters, headers and payload.
//!
//! A [`RequestBuilder`] is mutated by the calling operation and becomes the
//! immutable input of the signing pipeline once [`RequestBuilder::send`] is
//! invoked.

use std::sync::Mutex;

use bytes::Bytes;
use tokio::fs::File;

use crate::client::S3Client;
use crate::error::S3Error;
use crate::hash::{md5_base64, sha256_hex};
use crate::response::ResponseEnvelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Put,
    Post,
    Head,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Put => "PUT",
            Verb::Post => "POST",
            Verb::Head => "HEAD",
            Verb::Delete => "DELETE",
        }
    }

    pub(crate) fn method(&self) -> http::Method {
        match self {
            Verb::Get => http::Method::GET,
            Verb::Put => http::Method::PUT,
            Verb::Post => http::Method::POST,
            Verb::Head => http::Method::HEAD,
            Verb::Delete => http::Method::DELETE,
        }
    }
}

/// Request payload. A streamed file must carry its length and, for SigV4
/// targets, a precomputed SHA-256 — the stream is consumed exactly once, on
/// the wire.
#[derive(Debug)]
pub enum Payload {
    Empty,
    Buffer(Bytes),
    Stream {
        file: File,
        len: u64,
        sha256: Option<String>,
    },
}

impl Payload {
    pub(crate) fn len(&self) -> u64 {
        match self {
            Payload::Empty => 0,
            Payload::Buffer(bytes) => bytes.len() as u64,
            Payload::Stream { len, .. } => *len,
        }
    }

    /// Hex SHA-256 over the exact bytes that will be transmitted.
    ///
    /// For a stream this must have been precomputed by the caller; hashing
    /// here would consume the file. Surfaced before any network I/O.
    pub(crate) fn sha256(&self) -> Result<String, S3Error> {
        match self {
            Payload::Empty => Ok(crate::constants::EMPTY_PAYLOAD_SHA.to_string()),
            Payload::Buffer(bytes) => Ok(sha256_hex(bytes)),
            Payload::Stream { sha256, .. } => {
                sha256.clone().ok_or(S3Error::MissingPayloadHash)
            }
        }
    }

    /// `Content-MD5` value, legacy path only. Streams are not hashed.
    pub(crate) fn content_md5(&self) -> Option<String> {
        match self {
            Payload::Buffer(bytes) if !bytes.is_empty() => Some(md5_base64(bytes)),
            _ => None,
        }
    }
}

/// A pending request against a single client. Dropped without side effects
/// if never sent.
#[derive(Debug)]
pub struct RequestBuilder<'a> {
    pub(crate) client: &'a S3Client,
    pub(crate) verb: Verb,
    pub(crate) bucket: String,
    pub(crate) key: String,
    pub(crate) query: Vec<(String, Option<String>)>,
    pub(crate) amz_headers: Vec<(String, String)>,
    pub(crate) plain_headers: Vec<(String, String)>,
    pub(crate) content_type: Option<String>,
    pub(crate) payload: Payload,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(client: &'a S3Client, verb: Verb, bucket: String, key: String) -> Self {
        Self {
            client,
            verb,
            bucket,
            key,
            query: Vec::new(),
            amz_headers: Vec::new(),
            plain_headers: Vec::new(),
            content_type: None,
            payload: Payload::Empty,
        }
    }

    /// Add a query parameter; `None` marks a bare sub-resource like `?acl`.
    pub fn query<K: Into<String>>(mut self, key: K, value: Option<String>) -> Self {
        self.query.push((key.into(), value));
        self
    }

    /// Add an `x-amz-*` header. The name is lower-cased before storage so
    /// canonicalization sees one casing only.
    pub fn amz_header<K: AsRef<str>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.amz_headers
            .push((key.as_ref().to_lowercase(), value.into()));
        self
    }

    /// Add a plain HTTP header.
    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.plain_headers.push((key.into(), value.into()));
        self
    }

    pub fn content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Attach a buffered payload.
    pub fn body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.payload = Payload::Buffer(body.into());
        self
    }

    /// Attach a streamed file payload. `sha256` must be precomputed for
    /// SigV4 targets; passing `None` there fails with
    /// [`S3Error::MissingPayloadHash`] before anything is sent.
    pub fn stream(mut self, file: File, len: u64, sha256: Option<String>) -> Self {
        self.payload = Payload::Stream { file, len, sha256 };
        self
    }

    /// Sign and execute, buffering and classifying the response body.
    pub async fn send(self) -> Result<ResponseEnvelope, S3Error> {
        self.client.execute(self).await
    }

    /// Sign and execute, streaming a successful opaque response body into
    /// `sink` instead of buffering it. Structured (XML) and non-success
    /// bodies are still buffered so faults can be extracted.
    pub async fn send_to_sink<W>(self, sink: &mut W) -> Result<ResponseEnvelope, S3Error>
    where
        W: tokio::io::AsyncWrite + Send + Unpin,
    {
        self.client.execute_to_sink(self, sink).await
    }
}

/// DNS conformity check for virtual-hosted-style addressing.
///
/// Under TLS any dot is rejected: a wildcard certificate for
/// `*.s3.amazonaws.com` cannot validate a multi-label bucket host.
pub(crate) fn dns_bucket_name(bucket: &str, tls: bool) -> bool {
    let bytes = bucket.as_bytes();
    if bytes.is_empty() || bytes.len() > 63 {
        return false;
    }
    if !bytes
        .iter()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'.' || *b == b'-')
    {
        return false;
    }
    if !bytes[0].is_ascii_alphanumeric() || !bytes[bytes.len() - 1].is_ascii_alphanumeric() {
        return false;
    }
    if bucket.contains("..") || bucket.contains("-.") {
        return false;
    }
    if tls && bucket.contains('.') {
        return false;
    }
    true
}

/// Size-1 memo over the most recently checked bucket name.
///
/// Requests against one client are issued sequentially, so a single slot
/// avoids re-running the check on the common loop-over-one-bucket pattern.
/// The memo is per client instance and never shared across clients.
#[derive(Debug, Default)]
pub(crate) struct BucketNameMemo {
    last: Mutex<Option<(String, bool)>>,
}

impl BucketNameMemo {
    pub(crate) fn is_dns_safe(&self, bucket: &str, tls: bool) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((name, ok)) = last.as_ref() {
            if name == bucket {
                return *ok;
            }
        }
        let ok = dns_bucket_name(bucket, tls);
        *last = Some((bucket.to_string(), ok));
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dns_bucket_name_table() {
        assert!(dns_bucket_name("my-bucket.1", false));
        // uppercase and underscore
        assert!(!dns_bucket_name("My_Bucket", false));
        // length limit is 63
        assert!(dns_bucket_name(&"a".repeat(63), false));
        assert!(!dns_bucket_name(&"a".repeat(64), false));
        // dots are fine without TLS but not with it
        assert!(dns_bucket_name("bucket.name", false));
        assert!(!dns_bucket_name("bucket.name", true));
        // must start and end alphanumeric
        assert!(!dns_bucket_name("-bucket", false));
        assert!(!dns_bucket_name("bucket-", false));
        assert!(!dns_bucket_name(".bucket", false));
        // forbidden runs
        assert!(!dns_bucket_name("buck..et", false));
        assert!(!dns_bucket_name("buck-.et", false));
        assert!(!dns_bucket_name("", false));
    }

    #[test]
    fn test_memo_returns_cached_verdict() {
        let memo = BucketNameMemo::default();
        assert!(memo.is_dns_safe("ok-bucket", false));
        // same name hits the memo slot
        assert!(memo.is_dns_safe("ok-bucket", false));
        // a different name evicts it
        assert!(!memo.is_dns_safe("BAD", false));
        assert_eq!(
            memo.last.lock().unwrap().as_ref().unwrap().0,
            "BAD".to_string()
        );
        assert!(memo.is_dns_safe("ok-bucket", false));
    }

    #[test]
    fn test_payload_sha256() {
        assert_eq!(
            Payload::Empty.sha256().unwrap(),
            crate::constants::EMPTY_PAYLOAD_SHA
        );
        let buffered = Payload::Buffer(Bytes::from_static(b"hello world"));
        assert_eq!(
            buffered.sha256().unwrap(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn test_stream_payload_without_hash_is_rejected() {
        let file = tokio::fs::File::open("/dev/null").await.unwrap();
        let payload = Payload::Stream {
            file,
            len: 0,
            sha256: None,
        };
        assert!(matches!(
            payload.sha256(),
            Err(S3Error::MissingPayloadHash)
        ));
    }
}
