use thiserror::Error;

use crate::response::ErrorRecord;

#[derive(Error, Debug)]
pub enum S3Error {
    #[error("credentials: {0}")]
    Credentials(String),
    #[error("configuration: {0}")]
    Configuration(&'static str),
    #[error("env var missing: {0}")]
    EnvVarMissing(#[from] std::env::VarError),
    #[error("fmt error: {0}")]
    FmtError(#[from] std::fmt::Error),
    #[error("from utf8: {0}")]
    FromUtf8(#[from] std::string::FromUtf8Error),
    #[error("header to string: {0}")]
    HeaderToStr(#[from] http::header::ToStrError),
    #[error("hmac invalid key length: {0}")]
    HmacInvalidLength(#[from] sha2::digest::InvalidLength),
    #[error("Got HTTP {0} with content '{1}'")]
    UnexpectedStatus(u16, String),
    #[error("service fault [{}] {}", .0.code, .0.message)]
    ServiceFault(ErrorRecord),
    #[error("bucket name '{0}' is not DNS-safe for host-style addressing")]
    InvalidBucketName(String),
    #[error("streamed payload without a precomputed sha256, cannot sign")]
    MissingPayloadHash,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("http: {0}")]
    Http(#[from] http::Error),
    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("serde xml: {0}")]
    SerdeXml(#[from] quick_xml::de::DeError),
    #[error("Time format error: {0}")]
    TimeFormatError(#[from] time::error::Format),
    #[error("url parse: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Utf8 decoding error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}
