pub const LONG_DATE_TIME: &[time::format_description::BorrowedFormatItem<'static>] =
    time::macros::format_description!("[year][month][day]T[hour][minute][second]Z");
pub const SHORT_DATE: &[time::format_description::BorrowedFormatItem<'static>] =
    time::macros::format_description!("[year][month][day]");

pub const EMPTY_PAYLOAD_SHA: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

pub const DEFAULT_ENDPOINT_S3: &str = "s3.amazonaws.com";
/// CDN-management endpoint. Requests against it must use the legacy
/// `AWS <key>:<sig>` scheme instead of SigV4.
pub const DEFAULT_ENDPOINT_CDN: &str = "cloudfront.amazonaws.com";

pub const SERVICE_NAME: &str = "s3";
pub const FALLBACK_REGION: &str = "us-east-1";
