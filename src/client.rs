//! Client configuration and the sign-and-send pipeline.
//!
//! The client decides bucket-in-host vs bucket-in-path addressing, selects
//! the signature engine by target host (CDN-management endpoint → legacy
//! HMAC-SHA1, everything else → SigV4), attaches the `Authorization`
//! header and delegates to the transport. All signing failures surface
//! before any network I/O.

use std::env;

use http::header::{AUTHORIZATION, DATE};
use http::{HeaderMap, HeaderName, HeaderValue};
use time::format_description::well_known::Rfc2822;
use time::{Duration, OffsetDateTime};
use tokio::io::AsyncWrite;
use tracing::debug;
use url::Url;

use crate::canonical::{legacy_query, uri_encode};
use crate::constants::{DEFAULT_ENDPOINT_CDN, DEFAULT_ENDPOINT_S3, FALLBACK_REGION, LONG_DATE_TIME};
use crate::credentials::Credentials;
use crate::error::S3Error;
use crate::request::{BucketNameMemo, RequestBuilder, Verb};
use crate::response::{self, ResponseEnvelope, SUCCESS_CODES};
use crate::{sigv1, sigv4, transport, Region};

/// How the bucket is placed into the request target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// Bucket-in-host when the name is DNS-safe, bucket-in-path otherwise.
    Auto,
    /// Bucket-in-host always; a name failing the DNS-safety check is an
    /// error instead of a silent fallback.
    VirtualHost,
    /// Bucket-in-path always.
    Path,
}

/// Target endpoint. The region is either explicit or inferred from the
/// host against the virtual-hosted-style pattern
/// `s3[.-](website-|dualstack.)?<region>.amazonaws.com`.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub host: String,
    pub use_tls: bool,
    region: Option<Region>,
}

impl Default for Endpoint {
    /// The public AWS endpoint over TLS.
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT_S3, true)
    }
}

impl Endpoint {
    pub fn new<S: Into<String>>(host: S, use_tls: bool) -> Self {
        Self {
            host: host.into(),
            use_tls,
            region: None,
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }

    /// Explicit region, else host-pattern inference, else `us-east-1`.
    pub fn region(&self) -> Region {
        if let Some(region) = &self.region {
            return region.clone();
        }
        Region(
            infer_region(&self.host)
                .unwrap_or_else(|| FALLBACK_REGION.to_string()),
        )
    }

    /// The CDN-management host takes the legacy signature scheme.
    pub(crate) fn is_cdn(&self) -> bool {
        self.host.eq_ignore_ascii_case(DEFAULT_ENDPOINT_CDN)
    }
}

fn infer_region(host: &str) -> Option<String> {
    let lower = host.to_ascii_lowercase();
    let tail = lower.strip_suffix(".amazonaws.com")?;
    let pos = tail.find("s3.").or_else(|| tail.find("s3-"))?;
    let mut region = &tail[pos + 3..];
    if let Some(stripped) = region.strip_prefix("website-") {
        region = stripped;
    } else if let Some(stripped) = region.strip_prefix("dualstack.") {
        region = stripped;
    }
    if region.is_empty() || region == "external-1" {
        return None;
    }
    Some(region.to_string())
}

#[derive(Debug)]
pub struct ClientOptions {
    pub addressing: Addressing,
}

impl Default for ClientOptions {
    fn default() -> Self {
        let path_style = env::var("S3_PATH_STYLE")
            .map(|v| v.parse::<bool>().unwrap_or(false))
            .unwrap_or(false);
        Self {
            addressing: if path_style {
                Addressing::Path
            } else {
                Addressing::Auto
            },
        }
    }
}

#[derive(Debug)]
pub struct S3Client {
    pub endpoint: Endpoint,
    credentials: Option<Credentials>,
    addressing: Addressing,
    /// Correction added to the system clock before signing, for callers
    /// whose clock drifts from the service's.
    time_offset_secs: i64,
    dns_memo: BucketNameMemo,
}

// The DNS memo holds interior state behind a Mutex, so clones get a fresh,
// empty slot instead of sharing one.
impl Clone for S3Client {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            credentials: self.credentials.clone(),
            addressing: self.addressing,
            time_offset_secs: self.time_offset_secs,
            dns_memo: BucketNameMemo::default(),
        }
    }
}

impl S3Client {
    pub fn new(
        endpoint: Endpoint,
        credentials: Option<Credentials>,
        options: Option<ClientOptions>,
    ) -> Self {
        let options = options.unwrap_or_default();
        Self {
            endpoint,
            credentials,
            addressing: options.addressing,
            time_offset_secs: 0,
            dns_memo: BucketNameMemo::default(),
        }
    }

    pub fn try_from_env() -> Result<Self, S3Error> {
        let url = env::var("S3_URL")?.parse::<Url>()?;
        let host = url
            .host_str()
            .ok_or(S3Error::Configuration("S3_URL must contain a host"))?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let mut endpoint = Endpoint::new(host, url.scheme() == "https");
        if let Ok(region) = Region::try_from_env() {
            endpoint = endpoint.with_region(region);
        }
        let credentials = Credentials::try_from_env().ok();

        Ok(Self::new(endpoint, credentials, None))
    }

    /// Whether authenticated calls are possible.
    pub fn has_auth(&self) -> bool {
        self.credentials.is_some()
    }

    /// Correct the signing clock by `secs` (positive or negative).
    pub fn set_time_offset(&mut self, secs: i64) {
        self.time_offset_secs = secs;
    }

    /// Start assembling a request. `bucket` and `key` may be empty for
    /// account- and bucket-level operations respectively.
    pub fn request<B, K>(&self, verb: Verb, bucket: B, key: K) -> RequestBuilder<'_>
    where
        B: Into<String>,
        K: Into<String>,
    {
        RequestBuilder::new(self, verb, bucket.into(), key.into())
    }

    fn signing_time(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc() + Duration::seconds(self.time_offset_secs)
    }

    /// Legacy query-string pre-signed GET URL, valid for `lifetime_secs`.
    pub fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        lifetime_secs: u32,
    ) -> Result<String, S3Error> {
        let expires = self.signing_time().unix_timestamp() + i64::from(lifetime_secs);
        self.presigned_url_at(bucket, key, expires)
    }

    fn presigned_url_at(&self, bucket: &str, key: &str, expires: i64) -> Result<String, S3Error> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(S3Error::Configuration("pre-signing requires credentials"))?;

        let encoded_key = uri_encode(key, false);
        let string_to_sign = sigv1::presign_string_to_sign(expires, bucket, &encoded_key);
        let signature = sigv1::sign(&credentials.access_key_secret, &string_to_sign)?;

        let base = if self.host_style(bucket)? {
            format!(
                "{}://{}.{}/{}",
                self.endpoint.scheme(),
                bucket,
                self.endpoint.host,
                encoded_key,
            )
        } else {
            format!(
                "{}://{}/{}/{}",
                self.endpoint.scheme(),
                self.endpoint.host,
                bucket,
                encoded_key,
            )
        };

        Ok(format!(
            "{}?AWSAccessKeyId={}&Expires={}&Signature={}",
            base,
            credentials.access_key_id.as_ref(),
            expires,
            uri_encode(&signature, true),
        ))
    }

    /// Bucket-in-host decision per the addressing mode. Only the
    /// `VirtualHost` mode turns an unsafe name into an error.
    fn host_style(&self, bucket: &str) -> Result<bool, S3Error> {
        if bucket.is_empty() {
            return Ok(false);
        }
        match self.addressing {
            Addressing::Path => Ok(false),
            Addressing::Auto => Ok(self.dns_memo.is_dns_safe(bucket, self.endpoint.use_tls)),
            Addressing::VirtualHost => {
                if self.dns_memo.is_dns_safe(bucket, self.endpoint.use_tls) {
                    Ok(true)
                } else {
                    Err(S3Error::InvalidBucketName(bucket.to_string()))
                }
            }
        }
    }

    pub(crate) async fn execute(
        &self,
        req: RequestBuilder<'_>,
    ) -> Result<ResponseEnvelope, S3Error> {
        let res = self.send_signed(req).await?;
        let status = res.status().as_u16();
        let headers = transport::header_map(&res);
        let raw = res.bytes().await?;
        Ok(response::classify(status, headers, raw))
    }

    pub(crate) async fn execute_to_sink<W>(
        &self,
        req: RequestBuilder<'_>,
        sink: &mut W,
    ) -> Result<ResponseEnvelope, S3Error>
    where
        W: AsyncWrite + Send + Unpin,
    {
        let res = self.send_signed(req).await?;
        let status = res.status().as_u16();
        let headers = transport::header_map(&res);

        // Only a successful opaque body goes to the sink; structured bodies
        // are buffered so a fault can still be extracted.
        let is_xml = headers
            .get("content-type")
            .is_some_and(|t| t == "application/xml");
        if SUCCESS_CODES.contains(&status) && !is_xml {
            let written = transport::drain_to_sink(res, sink).await?;
            debug!(written, "response body drained to sink");
            Ok(response::classify(status, headers, bytes::Bytes::new()))
        } else {
            let raw = res.bytes().await?;
            Ok(response::classify(status, headers, raw))
        }
    }

    /// Assemble, sign and put the request on the wire.
    #[tracing::instrument(level = "debug", skip_all, fields(verb = req.verb.as_str(), bucket = %req.bucket, key = %req.key))]
    async fn send_signed(&self, req: RequestBuilder<'_>) -> Result<reqwest::Response, S3Error> {
        let RequestBuilder {
            verb,
            bucket,
            key,
            query,
            mut amz_headers,
            mut plain_headers,
            content_type,
            payload,
            ..
        } = req;

        let now = self.signing_time();
        let host_style = self.host_style(&bucket)?;

        let host = if host_style {
            format!("{}.{}", bucket, self.endpoint.host)
        } else {
            self.endpoint.host.clone()
        };

        let key_path = format!("/{}", uri_encode(&key, false));
        // canonical URI: path only, including the bucket for path-style
        let resource = if host_style || bucket.is_empty() {
            key_path
        } else {
            format!("/{}{}", bucket, key_path)
        };

        let mut url = format!("{}://{}{}", self.endpoint.scheme(), host, resource);
        let query_string = legacy_query(&query);
        if !query_string.is_empty() {
            url.push('?');
            url.push_str(&query_string);
        }
        let url = Url::parse(&url)?;

        plain_headers.push(("host".to_string(), host));
        let content_length = payload.len();
        if content_length > 0 || matches!(verb, Verb::Put | Verb::Post) {
            plain_headers.push(("content-length".to_string(), content_length.to_string()));
            plain_headers.push((
                "content-type".to_string(),
                content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
            ));
        }

        let mut headers = HeaderMap::with_capacity(8);

        if self.has_auth() {
            // unwrap-free: has_auth() just checked
            let credentials = self
                .credentials
                .as_ref()
                .ok_or(S3Error::Configuration("credentials missing"))?;

            if self.endpoint.is_cdn() {
                // The CDN-management scheme signs only the Date header.
                let date = now.format(&Rfc2822)?;
                if let Some(md5) = payload.content_md5() {
                    plain_headers.push(("content-md5".to_string(), md5));
                }
                plain_headers.push(("date".to_string(), date.clone()));

                let signature = sigv1::sign(&credentials.access_key_secret, &date)?;
                let authorization =
                    sigv1::authorization_header(&credentials.access_key_id, &signature);
                headers.insert(AUTHORIZATION, HeaderValue::try_from(authorization)?);
            } else {
                // x-amz-date and the credential-scope date stamp both come
                // from `now`; recomputing either independently would risk a
                // mismatch within the request.
                amz_headers.push(("x-amz-date".to_string(), now.format(LONG_DATE_TIME)?));
                let payload_hash = match amz_headers
                    .iter()
                    .find(|(k, _)| k == "x-amz-content-sha256")
                {
                    Some((_, hash)) => hash.clone(),
                    None => {
                        let hash = payload.sha256()?;
                        amz_headers
                            .push(("x-amz-content-sha256".to_string(), hash.clone()));
                        hash
                    }
                };

                let authorization = sigv4::sign(
                    credentials,
                    &self.endpoint.region(),
                    verb.as_str(),
                    &resource,
                    &query,
                    &plain_headers,
                    &amz_headers,
                    &payload_hash,
                    &now,
                )?;
                headers.insert(AUTHORIZATION, HeaderValue::try_from(authorization)?);

                // The RFC2822 format is somewhat malleable, so the Date
                // header stays out of the signed set; x-amz-date already
                // bounds the request in time.
                headers.insert(DATE, HeaderValue::try_from(now.format(&Rfc2822)?)?);
            }
        } else {
            plain_headers.push(("date".to_string(), now.format(&Rfc2822)?));
        }

        for (key, value) in plain_headers.iter().chain(amz_headers.iter()) {
            headers.insert(
                HeaderName::from_bytes(key.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }
        transport::execute(verb.method(), url, headers, payload).await
    }
}
