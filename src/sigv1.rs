//! Legacy `AWS <key>:<signature>` scheme (HMAC-SHA1).
//!
//! Only two request kinds still use it: query-string pre-signed URLs, where
//! the expiry timestamp stands in for the `Date` header, and requests
//! against the CDN-management endpoint. Everything else goes through
//! [`crate::sigv4`].
//!
//! ```text
//! StringToSign = HTTP-Verb + "\n" +
//!                Content-MD5 + "\n" +
//!                Content-Type + "\n" +
//!                Date + "\n" +
//!                CanonicalizedAmzHeaders +
//!                CanonicalizedResource
//! ```

use crate::canonical::canonical_cmp;
use crate::credentials::{AccessKeyId, AccessKeySecret};
use crate::error::S3Error;
use crate::hash::{base64_standard, hmac_sha1};

/// Build the legacy string to sign. Each amz header contributes a
/// `name:value\n` line, sorted by name; `resource` is `/bucket/key`, or
/// `/key` when the bucket is carried in the host.
pub(crate) fn string_to_sign(
    verb: &str,
    content_md5: &str,
    content_type: &str,
    date: &str,
    amz_headers: &[(String, String)],
    resource: &str,
) -> String {
    let mut amz_lines = amz_headers.to_vec();
    amz_lines.sort_by(|a, b| canonical_cmp(&a.0, &b.0));

    let mut out = format!("{verb}\n{content_md5}\n{content_type}\n{date}\n");
    for (name, value) in &amz_lines {
        out.push_str(name);
        out.push(':');
        out.push_str(value);
        out.push('\n');
    }
    out.push_str(resource);
    out
}

/// `base64(HMAC-SHA1(secret, string_to_sign))`
pub(crate) fn sign(secret: &AccessKeySecret, string_to_sign: &str) -> Result<String, S3Error> {
    let digest = hmac_sha1(secret.as_ref().as_bytes(), string_to_sign.as_bytes())?;
    Ok(base64_standard(&digest))
}

pub(crate) fn authorization_header(
    access_key: &AccessKeyId,
    signature: &str,
) -> String {
    format!("AWS {}:{}", access_key.as_ref(), signature)
}

/// The string signed for a query-string pre-signed GET, with the unix
/// expiry timestamp substituted for the `Date` header.
pub(crate) fn presign_string_to_sign(expires: i64, bucket: &str, key: &str) -> String {
    format!("GET\n\n\n{expires}\n/{bucket}/{key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_string_to_sign_sorts_amz_headers() {
        let amz = vec![
            ("x-amz-meta-author".to_string(), "foo@bar.com".to_string()),
            ("x-amz-magic".to_string(), "abracadabra".to_string()),
        ];
        let sts = string_to_sign(
            "PUT",
            "c8fdb181845a4ca6b8fec737b3581d76",
            "text/html",
            "Thu, 17 Nov 2005 18:49:58 GMT",
            &amz,
            "/quotes/nelson",
        );
        assert_eq!(
            sts,
            "PUT\nc8fdb181845a4ca6b8fec737b3581d76\ntext/html\n\
             Thu, 17 Nov 2005 18:49:58 GMT\n\
             x-amz-magic:abracadabra\n\
             x-amz-meta-author:foo@bar.com\n\
             /quotes/nelson"
        );
    }

    #[test]
    fn test_sign_matches_published_example() {
        // S3 developer guide REST authentication example
        let secret = AccessKeySecret::new("uV3F3YluFJax1cknvbcGwgjvx4QpvB+leU8dUj2o".to_string());
        let sts = "PUT\nc8fdb181845a4ca6b8fec737b3581d76\ntext/html\n\
                   Thu, 17 Nov 2005 18:49:58 GMT\n\
                   x-amz-magic:abracadabra\n\
                   x-amz-meta-author:foo@bar.com\n\
                   /quotes/nelson";
        let signature = sign(&secret, sts).unwrap();
        assert_eq!(signature, "OiCYoAUPCuPHge6ynJLDVyhrXzk=");

        let access_key = AccessKeyId::new("44CF9590006BF252F707".to_string());
        assert_eq!(
            authorization_header(&access_key, &signature),
            "AWS 44CF9590006BF252F707:OiCYoAUPCuPHge6ynJLDVyhrXzk="
        );
    }

    #[test]
    fn test_presign_string_to_sign() {
        assert_eq!(
            presign_string_to_sign(1000000000, "b", "k"),
            "GET\n\n\n1000000000\n/b/k"
        );
    }

    #[test]
    fn test_presign_signature_fixed_value() {
        // computed independently via HMAC-SHA1
        let secret = AccessKeySecret::new("wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY".to_string());
        let sts = presign_string_to_sign(1000000000, "b", "k");
        assert_eq!(sign(&secret, &sts).unwrap(), "a5m+okTsbUZXDd26xgANieedBAA=");
    }
}
