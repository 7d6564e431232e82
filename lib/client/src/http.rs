use crate::HttpError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// The media types accepted when requesting fragments, ordered by preference.
pub const DEFAULT_ACCEPT: &str = "application/trig;q=1.0,application/n-quads;q=0.7,text/turtle;q=0.6,application/n-triples;q=0.3,text/n3;q=0.2";

/// The default user agent sent with every fragment request.
pub const DEFAULT_USER_AGENT: &str = "Triple Pattern Fragments Client";

/// A GET request for a fragment page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Returns the value of the first header called `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A fully received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// The transport used for retrieving fragment pages.
///
/// Implementations only need to support GET requests. Non-success status codes must be returned as
/// regular responses; errors are reserved for transport failures.
#[async_trait]
pub trait HttpClient: Debug + Send + Sync {
    /// Executes `request` and returns the complete response.
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// An [HttpClient] backed by [reqwest].
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Creates a new client. The `timeout` applies to each request as a whole.
    pub fn new(timeout: Option<Duration>) -> Result<Self, HttpError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| HttpError::Builder(std::sync::Arc::new(err)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| HttpError::transport(&request.url, err))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(|err| HttpError::transport(&request.url, err))?;

        Ok(HttpResponse {
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}
