//! Response classification: opaque bytes vs XML document vs service fault.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Deserialize;

use crate::error::S3Error;

/// Status codes treated as success by the classifier and by
/// [`ResponseEnvelope::into_result`].
pub const SUCCESS_CODES: [u16; 3] = [200, 204, 206];

/// Normalized error record extracted from a structured fault body.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ErrorRecord {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Resource")]
    pub resource: Option<String>,
}

/// Probe shape: any XML root whose children include `Code` and `Message`
/// is fault-shaped.
#[derive(Debug, Deserialize)]
struct FaultProbe {
    #[serde(rename = "Code")]
    code: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "Resource")]
    resource: Option<String>,
}

/// A body is exactly one of the three shapes; the error-vs-data-vs-bytes
/// overloading of the wire format is resolved here, once.
#[derive(Debug)]
pub enum ResponseBody {
    Bytes(Bytes),
    Document(String),
    Fault(ErrorRecord),
}

#[derive(Debug)]
pub struct ResponseEnvelope {
    pub status: u16,
    /// Response headers with lower-cased names, `x-amz-meta-*` included.
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
}

impl ResponseEnvelope {
    pub fn error(&self) -> Option<&ErrorRecord> {
        match &self.body {
            ResponseBody::Fault(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        SUCCESS_CODES.contains(&self.status)
    }

    /// Raise-style mode: a fault or unexpected status becomes an error
    /// value carrying the response metadata.
    pub fn into_result(self) -> Result<Self, S3Error> {
        match self.body {
            ResponseBody::Fault(record) => Err(S3Error::ServiceFault(record)),
            _ if !self.is_success() => {
                let text = match &self.body {
                    ResponseBody::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                    ResponseBody::Document(doc) => doc.clone(),
                    ResponseBody::Fault(_) => unreachable!(),
                };
                Err(S3Error::UnexpectedStatus(self.status, text))
            }
            _ => Ok(self),
        }
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        match &self.body {
            ResponseBody::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn document(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Document(doc) => Some(doc.as_str()),
            _ => None,
        }
    }
}

/// Classify a received body.
///
/// Only a non-empty body whose declared content-type is exactly
/// `application/xml` is treated as structured. A fault-shaped root yields
/// [`ResponseBody::Fault`] even on a 200: a storage backend can report an
/// error inside a nominally successful response, and the caller must not
/// mistake it for data.
pub(crate) fn classify(
    status: u16,
    headers: BTreeMap<String, String>,
    raw: Bytes,
) -> ResponseEnvelope {
    let is_xml = headers
        .get("content-type")
        .is_some_and(|t| t == "application/xml");

    let body = if is_xml && !raw.is_empty() {
        match std::str::from_utf8(&raw) {
            Ok(text) => match quick_xml::de::from_str::<FaultProbe>(text) {
                Ok(FaultProbe {
                    code: Some(code),
                    message: Some(message),
                    resource,
                }) => ResponseBody::Fault(ErrorRecord {
                    code,
                    message,
                    resource,
                }),
                _ => ResponseBody::Document(text.to_string()),
            },
            Err(_) => ResponseBody::Bytes(raw),
        }
    } else {
        ResponseBody::Bytes(raw)
    };

    ResponseEnvelope {
        status,
        headers,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn xml_headers() -> BTreeMap<String, String> {
        BTreeMap::from([("content-type".to_string(), "application/xml".to_string())])
    }

    const FAULT_XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
        <Error><Code>NoSuchKey</Code>\
        <Message>The specified key does not exist.</Message>\
        <Resource>/mybucket/missing.txt</Resource></Error>";

    const LISTING_XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
        <ListBucketResult><Name>mybucket</Name><KeyCount>0</KeyCount>\
        </ListBucketResult>";

    #[test]
    fn test_fault_extraction() {
        let envelope = classify(404, xml_headers(), Bytes::from_static(FAULT_XML.as_bytes()));
        let record = envelope.error().expect("fault body");
        assert_eq!(record.code, "NoSuchKey");
        assert_eq!(record.message, "The specified key does not exist.");
        assert_eq!(record.resource.as_deref(), Some("/mybucket/missing.txt"));
    }

    #[test]
    fn test_fault_shaped_body_on_status_200_is_still_a_fault() {
        let envelope = classify(200, xml_headers(), Bytes::from_static(FAULT_XML.as_bytes()));
        assert!(envelope.error().is_some());
        assert!(envelope.into_result().is_err());
    }

    #[test]
    fn test_non_fault_xml_is_a_document() {
        let envelope = classify(
            200,
            xml_headers(),
            Bytes::from_static(LISTING_XML.as_bytes()),
        );
        assert!(envelope.error().is_none());
        assert_eq!(envelope.document(), Some(LISTING_XML));
    }

    #[test]
    fn test_non_xml_content_type_stays_opaque() {
        let headers = BTreeMap::from([(
            "content-type".to_string(),
            "application/octet-stream".to_string(),
        )]);
        let envelope = classify(200, headers, Bytes::from_static(FAULT_XML.as_bytes()));
        assert!(envelope.error().is_none());
        assert!(envelope.bytes().is_some());
    }

    #[test]
    fn test_empty_xml_body_stays_opaque() {
        let envelope = classify(204, xml_headers(), Bytes::new());
        assert!(matches!(envelope.body, ResponseBody::Bytes(ref b) if b.is_empty()));
    }

    #[test]
    fn test_into_result_on_unexpected_status() {
        let envelope = classify(403, BTreeMap::new(), Bytes::from_static(b"denied"));
        match envelope.into_result() {
            Err(S3Error::UnexpectedStatus(status, body)) => {
                assert_eq!(status, 403);
                assert_eq!(body, "denied");
            }
            other => panic!("expected UnexpectedStatus, got {other:?}"),
        }
    }
}
