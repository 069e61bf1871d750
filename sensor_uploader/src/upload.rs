use crate::error::{UResult, UploaderError};
use crate::payload::{encode_upload, NonFinitePolicy};
use crate::sample::SampleRecord;
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};

/// HTTP client posting sample batches to the collection endpoint
///
/// # Request
/// - `POST <endpoint>` with `Content-Type: application/json`
/// - Body: `{"deviceId": ..., "data": [...]}`
///
/// # Outcome
/// - HTTP 200: success
/// - Any other status: `UploaderError::HttpStatus`
/// - Connection/DNS/I/O failure: `UploaderError::Transport`
///
/// One request per call. No retry and no timeout beyond the client defaults.
/// The response is dropped before returning, which releases the connection
/// on every path.
#[derive(Clone, Debug)]
pub struct UploadClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl UploadClient {
    pub fn new(endpoint: &str) -> UResult<Self> {
        let endpoint = parse_endpoint(endpoint)?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("sensor_uploader/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UploaderError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(UploadClient { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// POST an already encoded document
    pub async fn post(&self, body: Vec<u8>) -> UResult<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| UploaderError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UploaderError::HttpStatus(status.as_u16()));
        }

        Ok(())
    }
}

/// Encode `records` for `device_id` and POST them
pub async fn send_batch(
    client: &UploadClient,
    device_id: &str,
    records: &[SampleRecord],
    policy: NonFinitePolicy,
) -> UResult<()> {
    let body = encode_upload(device_id, records, policy)?;
    log::debug!(
        "Posting {} samples ({} bytes) to {}",
        records.len(),
        body.len(),
        client.endpoint()
    );
    client.post(body).await
}

/// Accept only absolute http(s) URLs
pub fn parse_endpoint(endpoint: &str) -> UResult<Url> {
    let url = Url::parse(endpoint)
        .map_err(|e| UploaderError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UploaderError::InvalidEndpoint(format!(
            "{}: unsupported scheme {}",
            endpoint, other
        ))),
    }
}
