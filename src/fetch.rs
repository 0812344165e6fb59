use std::time::Duration;

// ---------------------------------------------------------------------------
// Remote fetches (OWID CSV, world GeoJSON)
// ---------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

impl FetchError {
    /// Timeouts and server-side failures are worth retrying.
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Request { source, .. } => source.is_timeout() || source.is_connect(),
            FetchError::Status { status, .. } => status.is_server_error(),
        }
    }
}

/// Something that can download the body behind a URL.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP fetcher with a hard timeout per request.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Request {
                url: String::new(),
                source,
            })?;
        Ok(HttpFetcher { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        log::info!("Fetching {url}");
        let request_err = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        let body = response.bytes().map_err(request_err)?;
        log::info!("Fetched {} bytes from {url}", body.len());
        Ok(body.to_vec())
    }
}
