pub use crate::client::{Addressing, ClientOptions, Endpoint, S3Client};
pub use crate::credentials::{AccessKeyId, AccessKeySecret, Credentials};
pub use crate::error::S3Error;
pub use crate::request::{Payload, RequestBuilder, Verb};
pub use crate::response::{ErrorRecord, ResponseBody, ResponseEnvelope};
pub use crate::Region;
