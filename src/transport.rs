//! HTTP execution. No signing logic lives here: the request arrives fully
//! signed and is only put on the wire.

use std::collections::BTreeMap;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

use http::HeaderMap;
use reqwest::{Method, Response, Url};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::S3Error;
use crate::request::Payload;

static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

pub(crate) fn http_client<'a>() -> &'a reqwest::Client {
    CLIENT.get_or_init(|| {
        let mut builder = reqwest::Client::builder()
            .brotli(true)
            .connect_timeout(Duration::from_secs(10))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(600));
        if env::var("S3_DANGER_ALLOW_INSECURE").as_deref() == Ok("true") {
            builder = builder.danger_accept_invalid_certs(true);
        }
        builder.build().unwrap()
    })
}

/// Execute a signed request. A streamed file payload is moved into the
/// request body, so its handle is closed on every exit path — success,
/// HTTP error or transport failure — once the body has been dropped.
pub(crate) async fn execute(
    method: Method,
    url: Url,
    headers: HeaderMap,
    payload: Payload,
) -> Result<Response, S3Error> {
    debug!(%method, %url, "executing signed request");

    let builder = http_client().request(method, url).headers(headers);
    let res = match payload {
        Payload::Empty => builder.body(Vec::default()),
        Payload::Buffer(bytes) => builder.body(bytes),
        Payload::Stream { file, .. } => {
            builder.body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
        }
    }
    .send()
    .await?;

    Ok(res)
}

/// Lower-case the response headers into the envelope's string map.
pub(crate) fn header_map(res: &Response) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    for (key, value) in res.headers() {
        if let Ok(value) = value.to_str() {
            headers.insert(key.as_str().to_lowercase(), value.to_string());
        }
    }
    headers
}

/// Drain a response body into `sink`, returning the number of bytes
/// written. Partial writes are handled by `write_all`; the sink is flushed
/// before returning.
pub(crate) async fn drain_to_sink<W>(mut res: Response, sink: &mut W) -> Result<u64, S3Error>
where
    W: AsyncWrite + Send + Unpin,
{
    let mut written = 0u64;
    while let Some(chunk) = res.chunk().await? {
        sink.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    sink.flush().await?;
    Ok(written)
}
