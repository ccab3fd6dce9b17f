//! Outbound HTTP with a timeout/cancellation envelope

use medipedia_core::{
    retry_async, validate_absolute_url, validation_error, with_timeout, ErrorContext,
    FailureReason, MedipediaError, MedipediaResult, RequestOutcome, DEFAULT_TIMEOUT_MS,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::{debug, warn};

use crate::ApiClientConfig;

/// Request body variants supported by the backend
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

/// One field of a multipart form
#[derive(Debug, Clone)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        bytes: Vec<u8>,
    },
}

/// A single outbound request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = Some(RequestBody::Multipart(parts));
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Successful (2xx) response with its body fully read
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub url: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> MedipediaResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| MedipediaError::Parse {
            message: format!("Invalid JSON body from {}: {}", self.url, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("decode_json"),
        })
    }
}

/// HTTP client that never lets a transport error escape as anything but a
/// [`RequestOutcome::Failed`]
pub struct HttpClient {
    client: reqwest::Client,
    config: ApiClientConfig,
}

impl HttpClient {
    pub fn new(config: ApiClientConfig) -> MedipediaResult<Self> {
        let client = create_http_client(&config)?;

        debug!("Created HTTP client for {}", config.base_url);

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Start a request against a backend path with the configured timeout
    pub fn request(&self, method: Method, path: &str) -> HttpRequest {
        HttpRequest::new(method, self.config.endpoint(path)).timeout_ms(self.config.timeout_ms)
    }

    /// Execute a request.
    ///
    /// The request is raced against `timeout_ms`; when the timer wins the
    /// in-flight request is dropped and the outcome is `Failed(Timeout)`.
    /// Non-2xx responses become `Failed(HttpStatus)` with the body in `detail`.
    pub async fn execute(&self, request: HttpRequest) -> RequestOutcome<RawResponse> {
        match self.try_execute(&request).await {
            Ok(response) => RequestOutcome::Ok(response),
            Err(error) => {
                error.log();
                let message = default_message(error.failure_reason());
                RequestOutcome::Failed(error.into_failure(message))
            }
        }
    }

    /// Same as [`execute`](Self::execute) but keeps the internal error
    pub async fn try_execute(&self, request: &HttpRequest) -> MedipediaResult<RawResponse> {
        if request.timeout_ms == 0 {
            return Err(validation_error!(
                "timeout_ms must be greater than 0",
                "timeout_ms",
                "http_client"
            ));
        }
        validate_absolute_url(&request.url)
            .map_err(|message| validation_error!(message, "url", "http_client"))?;

        retry_async(
            || self.attempt(request),
            &self.config.retry,
            "http_request",
            MedipediaError::is_recoverable,
        )
        .await
    }

    async fn attempt(&self, request: &HttpRequest) -> MedipediaResult<RawResponse> {
        let started = Instant::now();
        let operation = format!("{} {}", request.method, request.url);

        let exchange = async {
            let response = self
                .build(request)
                .send()
                .await
                .map_err(|e| transport_error(e, "send"))?;

            let status = response.status();
            let url = response.url().to_string();
            let body = response
                .bytes()
                .await
                .map_err(|e| transport_error(e, "read_body"))?;

            Ok::<_, MedipediaError>(RawResponse {
                status: status.as_u16(),
                url,
                body: body.to_vec(),
            })
        };

        let response = with_timeout(exchange, request.timeout_ms, &operation).await??;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !(200..300).contains(&response.status) {
            warn!(
                method = %request.method,
                url = %request.url,
                status = response.status,
                elapsed_ms,
                "Backend returned error status"
            );
            return Err(status_error(response));
        }

        debug!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            elapsed_ms,
            "Request completed"
        );

        Ok(response)
    }

    fn build(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.as_str());

        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Multipart(parts)) => builder.multipart(build_form(parts)),
            None => builder,
        }
    }
}

/// Multipart forms are single-use, so one is built per attempt
fn build_form(parts: &[FormPart]) -> reqwest::multipart::Form {
    parts
        .iter()
        .fold(reqwest::multipart::Form::new(), |form, part| match part {
            FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
            FormPart::File {
                name,
                file_name,
                bytes,
            } => form.part(
                name.clone(),
                reqwest::multipart::Part::bytes(bytes.clone()).file_name(file_name.clone()),
            ),
        })
}

/// Helper function to create HTTP client with common configuration
pub(crate) fn create_http_client(config: &ApiClientConfig) -> MedipediaResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
            MedipediaError::Config {
                message: format!("Invalid user agent: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?,
    );

    for (key, value) in &config.headers {
        let header_name = reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            MedipediaError::Config {
                message: format!("Invalid header name '{}': {}", key, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?;

        let header_value =
            reqwest::header::HeaderValue::from_str(value).map_err(|e| MedipediaError::Config {
                message: format!("Invalid header value for '{}': {}", key, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            })?;

        headers.insert(header_name, header_value);
    }

    // No client-level timeout: each request carries its own.
    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| MedipediaError::Config {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("create_client"),
        })
}

fn transport_error(error: reqwest::Error, operation: &str) -> MedipediaError {
    if error.is_builder() {
        return MedipediaError::InvalidRequest {
            message: format!("Could not build request: {}", error),
            field: None,
            context: ErrorContext::new("http_client").with_operation(operation),
        };
    }

    MedipediaError::Network {
        message: format!("Request failed: {}", error),
        source: Some(Box::new(error)),
        context: ErrorContext::new("http_client")
            .with_operation(operation)
            .with_suggestion("Check if the API is running")
            .with_suggestion("Check network connectivity"),
    }
}

fn status_error(response: RawResponse) -> MedipediaError {
    let status = response.status;
    let body = response.text();

    MedipediaError::HttpStatus {
        status,
        url: response.url,
        body,
        context: ErrorContext::new("http_client")
            .with_operation("check_status")
            .with_suggestion(match status {
                400 | 422 => "Check the request payload",
                401 | 403 => "Check your credentials",
                404 => "Resource not found",
                _ => "Check the API server logs",
            }),
    }
}

/// Generic message for failures that no gateway has rephrased
fn default_message(reason: FailureReason) -> String {
    match reason {
        FailureReason::Timeout => "The request timed out".to_string(),
        FailureReason::NetworkError => "Could not reach the server".to_string(),
        FailureReason::HttpStatus(code) => format!("HTTP error! status: {}", code),
        FailureReason::ParseError => "Unexpected response from the server".to_string(),
        FailureReason::InvalidRequest => "Invalid request".to_string(),
        FailureReason::InvalidCredentials => "Invalid credentials".to_string(),
        FailureReason::Storage => "Storage error".to_string(),
    }
}
