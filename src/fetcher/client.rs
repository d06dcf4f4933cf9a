use crate::fetcher::{errors::FetchError, pipeline::process_response, types::PageResponse};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, header};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const USER_AGENT: &str = "GazetteBot/0.1 (+https://gazette.example.com/bot)";

/// One request, no retries. The retry loop lives in [`crate::fetcher::Fetcher`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<PageResponse, FetchError>;
}

/// Knobs for the shared HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Reject bodies larger than this. Unlimited when `None`.
    pub max_body_size: Option<u64>,
    /// Reject 2xx responses whose content type is not HTML.
    pub html_only: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_body_size: None,
            html_only: false,
        }
    }
}

/// Build the client shared by every fetch of a process.
pub fn build_client(settings: &HttpSettings) -> Result<Client, FetchError> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );

    ClientBuilder::new()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .default_headers(headers)
        .build()
        .map_err(|e| FetchError::Unknown(format!("failed to build http client: {e}")))
}

/// [`Transport`] over an injected reqwest client.
///
/// By default every 2xx body is accepted whatever its size or content type.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    max_body_size: Option<u64>,
    html_only: bool,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            max_body_size: None,
            html_only: false,
        }
    }

    pub fn from_settings(settings: &HttpSettings) -> Result<Self, FetchError> {
        let mut transport = Self::new(build_client(settings)?).html_only(settings.html_only);
        transport.max_body_size = settings.max_body_size;
        Ok(transport)
    }

    pub fn with_max_body_size(mut self, max_body_size: u64) -> Self {
        self.max_body_size = Some(max_body_size);
        self
    }

    pub fn html_only(mut self, html_only: bool) -> Self {
        self.html_only = html_only;
        self
    }

    fn check_size(&self, size: u64) -> Result<(), FetchError> {
        match self.max_body_size {
            Some(limit) if size > limit => Err(FetchError::BodyTooLarge(size)),
            _ => Ok(()),
        }
    }
}

fn is_html(content_type: &str) -> bool {
    content_type.contains("text/html") || content_type.contains("application/xhtml")
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, fields(url = %url))]
    async fn get(&self, url: &Url) -> Result<PageResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        let final_url = response.url().clone();
        let status = response.status();
        let headers = response.headers().clone();
        debug!(%status, %final_url, "response received");

        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        // Check content length before downloading
        if let Some(content_length) = response.content_length() {
            self.check_size(content_length)?;
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        if self.html_only && !is_html(&content_type) {
            return Err(FetchError::UnsupportedContentType(content_type));
        }

        let body_bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;

        // Content-Length may be missing or wrong
        self.check_size(body_bytes.len() as u64)?;

        process_response(final_url, status, headers, body_bytes, &content_type)
    }
}
