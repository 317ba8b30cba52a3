//! HTTP transport implementation using reqwest.
//!
//! Sends fully resolved [`PreparedRequest`]s. Query parameters, auth and the
//! body kind are applied here; the engine itself never touches the network.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use courier_application::ports::{HttpTransport, TransportError};
use courier_domain::{
    ApiKeyLocation, AuthConfig, Header, Headers, HttpMethod, HttpResponse, PreparedRequest,
    RequestBody,
};
use reqwest::{Client, Method, RequestBuilder, Url, multipart};
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 10;

/// HTTP transport backed by `reqwest::Client`.
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport with default settings.
    ///
    /// Default configuration:
    /// - Request timeout: 30 seconds
    /// - Follow redirects: up to 10
    /// - User-Agent: "Courier/0.1.0"
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent("Courier/0.1.0")
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self {
            client,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Creates a transport around an existing reqwest client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the per-request timeout (builder pattern).
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
        }
    }

    /// Parses the URL and appends enabled query parameters and a query API key.
    fn build_url(request: &PreparedRequest) -> Result<Url, TransportError> {
        let mut url = Url::parse(request.url.trim())
            .map_err(|e| TransportError::InvalidUrl(format!("{e}: {}", request.url)))?;

        let mut extra: Vec<(&str, &str)> = request
            .params
            .enabled()
            .map(|p| (p.key.as_str(), p.value.as_str()))
            .collect();
        if let AuthConfig::ApiKey {
            name,
            key,
            location: ApiKeyLocation::Query,
        } = &request.auth
        {
            extra.push((name.as_str(), key.as_str()));
        }
        if !extra.is_empty() {
            url.query_pairs_mut().extend_pairs(extra);
        }
        Ok(url)
    }

    fn apply_auth(builder: RequestBuilder, request: &PreparedRequest) -> RequestBuilder {
        if request.headers.contains("authorization") {
            return builder;
        }
        match &request.auth {
            AuthConfig::Bearer { token } => builder.bearer_auth(token),
            AuthConfig::Basic { username, password } => builder.basic_auth(username, Some(password)),
            AuthConfig::ApiKey {
                name,
                key,
                location: ApiKeyLocation::Header,
            } => builder.header(name.as_str(), key.as_str()),
            AuthConfig::None | AuthConfig::ApiKey { .. } => builder,
        }
    }

    fn apply_body(
        builder: RequestBuilder,
        request: &PreparedRequest,
    ) -> Result<RequestBuilder, TransportError> {
        let has_content_type = request.headers.contains("content-type");
        match &request.body {
            RequestBody::None => Ok(builder),
            RequestBody::Raw { content } => Ok(builder.body(content.clone())),
            RequestBody::FormUrlEncoded { fields } => {
                let pairs: Vec<(&str, &str)> = fields
                    .iter()
                    .map(|f| (f.key.as_str(), f.value.as_str()))
                    .collect();
                let encoded = serde_urlencoded::to_string(pairs)
                    .map_err(|e| TransportError::Other(format!("Invalid form body: {e}")))?;
                let builder = if has_content_type {
                    builder
                } else {
                    builder.header("Content-Type", "application/x-www-form-urlencoded")
                };
                Ok(builder.body(encoded))
            }
            RequestBody::FormData { fields, files } => {
                let mut form = multipart::Form::new();
                for field in fields {
                    form = form.text(field.key.clone(), field.value.clone());
                }
                for file in files {
                    let mut part =
                        multipart::Part::bytes(file.data.clone()).file_name(file.file_name.clone());
                    if let Some(content_type) = &file.content_type {
                        part = part
                            .mime_str(content_type)
                            .map_err(|e| TransportError::Other(e.to_string()))?;
                    }
                    form = form.part(file.field.clone(), part);
                }
                Ok(builder.multipart(form))
            }
            RequestBody::Binary { file } => {
                let builder = match (&file.content_type, has_content_type) {
                    (Some(content_type), false) => builder.header("Content-Type", content_type),
                    _ => builder,
                };
                Ok(builder.body(file.data.clone()))
            }
        }
    }

    fn map_error(error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout;
        }
        if error.is_connect() {
            return TransportError::Connection(error.to_string());
        }
        if error.is_builder() {
            return TransportError::InvalidUrl(error.to_string());
        }
        TransportError::Other(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<HttpResponse, TransportError> {
        let url = Self::build_url(request)?;

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url)
            .timeout(self.timeout);
        for header in request.headers.enabled() {
            builder = builder.header(header.name.as_str(), header.value.as_str());
        }
        builder = Self::apply_auth(builder, request);
        builder = Self::apply_body(builder, request)?;

        let start = Instant::now();
        let response = builder.send().await.map_err(|e| Self::map_error(&e))?;

        let status = response.status();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            headers.add(Header::new(
                name.as_str(),
                value.to_str().unwrap_or("<binary>"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Other(format!("Failed to read body: {e}")))?;
        let duration = start.elapsed();
        debug!(status = status.as_u16(), elapsed_ms = duration.as_millis(), "response received");

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
            duration,
        })
    }
}
