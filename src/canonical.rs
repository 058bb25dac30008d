//! Deterministic, sorted textual forms of headers and query parameters.
//!
//! Both signature engines hash these representations byte for byte, so the
//! encoding and ordering rules here must be reproduced exactly or the
//! receiving service rejects the signature.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::cmp::Ordering;

const FRAGMENT: &AsciiSet = &CONTROLS
    // URL_RESERVED
    .add(b':')
    .add(b'?')
    .add(b'#')
    .add(b'[')
    .add(b']')
    .add(b'@')
    .add(b'!')
    .add(b'$')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b';')
    .add(b'=')
    // URL_UNSAFE
    .add(b'"')
    .add(b' ')
    .add(b'<')
    .add(b'>')
    .add(b'%')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^')
    .add(b'`');

pub const FRAGMENT_SLASH: &AsciiSet = &FRAGMENT.add(b'/');

/// RFC 3986 percent-encoding; space becomes `%20`, never `+`.
pub fn uri_encode(string: &str, encode_slash: bool) -> String {
    if encode_slash {
        utf8_percent_encode(string, FRAGMENT_SLASH).to_string()
    } else {
        utf8_percent_encode(string, FRAGMENT).to_string()
    }
}

/// Ordering used for canonical headers and query parameters: byte-wise
/// comparison up to the shorter length; on a shared prefix the shorter
/// string sorts first.
pub(crate) fn canonical_cmp(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let min_len = a.len().min(b.len());
    match a[..min_len].cmp(&b[..min_len]) {
        Ordering::Equal => a.len().cmp(&b.len()),
        ord => ord,
    }
}

/// Merge standard HTTP headers and `x-amz-*` headers into one sorted
/// sequence of `(lowercase_key, trimmed_value)` pairs.
///
/// Empty-valued plain headers are skipped; on a key collision the amz set
/// wins. Sorting an already sorted sequence is a no-op.
pub(crate) fn sort_headers<'a, I, J>(plain: I, amz: J) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
    J: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut merged: Vec<(String, String)> = Vec::with_capacity(12);

    let mut insert = |key: &str, value: &str| {
        let key = key.to_lowercase();
        let value = value.trim().to_string();
        match merged.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => merged.push((key, value)),
        }
    };

    for (key, value) in plain {
        if !value.trim().is_empty() {
            insert(key, value);
        }
    }
    for (key, value) in amz {
        insert(key, value);
    }

    merged.sort_by(|a, b| canonical_cmp(&a.0, &b.0));
    merged
}

/// The `SignedHeaders` list: sorted lower-cased names joined by `;`.
pub(crate) fn signed_header_names(sorted: &[(String, String)]) -> String {
    sorted
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

/// SigV4 canonical query string. Absent values become the empty string and
/// `key=` is always emitted, even for empty values.
pub(crate) fn canonical_query_v4(params: &[(String, Option<String>)]) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (k.clone(), v.clone().unwrap_or_default()))
        .collect();
    pairs.sort_by(|a, b| canonical_cmp(&a.0, &b.0));
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Legacy query string, appended to the resource path. Unlike the V4 form,
/// parameters keep their given order and `=value` is omitted entirely when
/// the value is empty.
pub(crate) fn legacy_query(params: &[(String, Option<String>)]) -> String {
    params
        .iter()
        .map(|(k, v)| match v.as_deref() {
            None | Some("") => k.clone(),
            Some(v) => format!("{}={}", k, uri_encode(v, true)),
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs<'a>(raw: &'a [(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        raw.to_vec()
    }

    #[test]
    fn test_strict_prefix_sorts_first() {
        assert_eq!(canonical_cmp("key", "key-with-postfix"), Ordering::Less);
        assert_eq!(canonical_cmp("key-with-postfix", "key"), Ordering::Greater);
        assert_eq!(canonical_cmp("abc", "abc"), Ordering::Equal);
        assert_eq!(canonical_cmp("abd", "abc-longer"), Ordering::Greater);

        let sorted = sort_headers(
            pairs(&[("x-amz-date-extra", "1"), ("x-amz-date", "2")]),
            pairs(&[]),
        );
        assert_eq!(sorted[0].0, "x-amz-date");
        assert_eq!(sorted[1].0, "x-amz-date-extra");
    }

    #[test]
    fn test_sort_headers_is_idempotent() {
        let sorted = sort_headers(
            pairs(&[("Host", "s3.amazonaws.com"), ("Foo", " bAr ")]),
            pairs(&[("x-amz-date", "20130708T220855Z")]),
        );
        let as_refs: Vec<(&str, &str)> = sorted
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let resorted = sort_headers(as_refs, Vec::new());
        assert_eq!(sorted, resorted);
        assert_eq!(
            sorted,
            vec![
                ("foo".to_string(), "bAr".to_string()),
                ("host".to_string(), "s3.amazonaws.com".to_string()),
                ("x-amz-date".to_string(), "20130708T220855Z".to_string()),
            ]
        );
    }

    #[test]
    fn test_amz_wins_on_collision_and_empty_plain_dropped() {
        let sorted = sort_headers(
            pairs(&[("Date", "plain"), ("Content-MD5", "  ")]),
            pairs(&[("date", "amz")]),
        );
        assert_eq!(sorted, vec![("date".to_string(), "amz".to_string())]);
    }

    #[test]
    fn test_signed_header_names() {
        let sorted = sort_headers(
            pairs(&[("Host", "h"), ("Range", "bytes=0-9")]),
            pairs(&[("x-amz-date", "d")]),
        );
        assert_eq!(signed_header_names(&sorted), "host;range;x-amz-date");
    }

    #[test]
    fn test_canonical_query_v4_empty() {
        assert_eq!(canonical_query_v4(&[]), "");
    }

    #[test]
    fn test_canonical_query_v4_sorts_and_keeps_empty_values() {
        let params = vec![
            ("prefix".to_string(), Some("somePrefix".to_string())),
            ("acl".to_string(), None),
            ("marker".to_string(), Some("with space".to_string())),
        ];
        assert_eq!(
            canonical_query_v4(&params),
            "acl=&marker=with%20space&prefix=somePrefix"
        );
    }

    #[test]
    fn test_legacy_query_omits_empty_values() {
        let params = vec![
            ("uploads".to_string(), None),
            ("uploadId".to_string(), Some("abc def".to_string())),
        ];
        assert_eq!(legacy_query(&params), "uploads&uploadId=abc%20def");
    }

    #[test]
    fn test_uri_encode() {
        assert_eq!(uri_encode(r#"~!@#$%^&*()-_=+[]\{}|;:'",.<>? привет 你好"#, true), "~%21%40%23%24%25%5E%26%2A%28%29-_%3D%2B%5B%5D%5C%7B%7D%7C%3B%3A%27%22%2C.%3C%3E%3F%20%D0%BF%D1%80%D0%B8%D0%B2%D0%B5%D1%82%20%E4%BD%A0%E5%A5%BD");
        assert_eq!(uri_encode("a/b", false), "a/b");
        assert_eq!(uri_encode("a/b", true), "a%2Fb");
    }
}
