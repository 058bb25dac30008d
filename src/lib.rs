#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

use std::env;

/// Client configuration and the sign-and-send pipeline
pub use crate::client::{Addressing, ClientOptions, Endpoint, S3Client};
/// S3 Credentials
pub use crate::credentials::{AccessKeyId, AccessKeySecret, Credentials};
/// Specialized S3 Error type which wraps errors from different sources
pub use crate::error::S3Error;
/// Request assembly
pub use crate::request::{Payload, RequestBuilder, Verb};
/// Classified responses
pub use crate::response::{ErrorRecord, ResponseBody, ResponseEnvelope};

mod canonical;
mod client;
mod constants;
mod credentials;
mod error;
mod hash;
mod request;
mod response;
mod sigv1;
mod sigv4;
mod transport;

pub mod prelude;

/// S3 Region Wrapper
#[derive(Debug, Clone)]
pub struct Region(pub String);

impl Region {
    pub fn new<S>(region: S) -> Self
    where
        S: Into<String>,
    {
        Self(region.into())
    }

    pub fn try_from_env() -> Result<Self, S3Error> {
        Ok(Self(env::var("S3_REGION")?))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}
