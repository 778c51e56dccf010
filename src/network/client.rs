//! HTTP client wrapper - builds wire requests and executes them
//!
//! Steps, each its own failure point: parse URL, attach enabled query/header
//! rows, serialize the body, send, read the full body. Only the last two can
//! produce a transport error. 4xx/5xx come back as a normal [`Response`].

use std::time::Instant;

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::Url;

use crate::config::EngineConfig;
use crate::error::{ClientInitError, ExecutionError};
use crate::interpolate::resolve;
use crate::models::{AuthType, Body, RequestDefinition, Response, VariableMap};

/// Executes resolved requests over one shared connection pool.
///
/// Cloning is cheap and shares the pool.
#[derive(Clone, Debug)]
pub struct HttpEngine {
    client: reqwest::Client,
}

impl HttpEngine {
    /// Build the shared client. Failure here is fatal for the caller.
    pub fn new(config: &EngineConfig) -> Result<Self, ClientInitError> {
        Ok(HttpEngine {
            client: create_client(config)?,
        })
    }

    /// Wrap an already configured client
    pub fn with_client(client: reqwest::Client) -> Self {
        HttpEngine { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Materialize the wire request without sending it
    pub fn build(&self, request: &RequestDefinition) -> Result<reqwest::Request, ExecutionError> {
        build_request(&self.client, request)
    }

    /// Execute an already resolved request
    pub async fn execute(&self, request: RequestDefinition) -> Result<Response, ExecutionError> {
        let wire = build_request(&self.client, &request)?;
        tracing::info!(
            id = %request.id,
            method = %request.method,
            url = %wire.url(),
            "Executing request"
        );

        let start = Instant::now();
        let resp = self
            .client
            .execute(wire)
            .await
            .map_err(|e| transport_failure(&request, e))?;

        let status = resp.status();
        let headers = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = resp
            .bytes()
            .await
            .map_err(|e| transport_failure(&request, e))?;
        let elapsed = start.elapsed();

        tracing::info!(
            id = %request.id,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            bytes = body.len(),
            "Request completed"
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            content_length: body.len() as u64,
            body,
            elapsed,
        })
    }

    /// Resolve `request` against `variables`, then execute it
    pub async fn send(
        &self,
        request: &RequestDefinition,
        variables: &VariableMap,
    ) -> Result<Response, ExecutionError> {
        self.execute(resolve(request, variables)).await
    }
}

fn transport_failure(request: &RequestDefinition, err: reqwest::Error) -> ExecutionError {
    let err = ExecutionError::from_transport(err);
    tracing::warn!(id = %request.id, error = %err, "Request failed");
    err
}

/// Create an HTTP client from configuration
pub fn create_client(config: &EngineConfig) -> Result<reqwest::Client, ClientInitError> {
    let redirect = if config.follow_redirects {
        Policy::limited(config.max_redirects)
    } else {
        Policy::none()
    };

    let mut builder = reqwest::Client::builder()
        .redirect(redirect)
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .user_agent(config.user_agent.as_str());
    if config.timeout_secs > 0 {
        builder = builder.timeout(config.timeout());
    }
    if config.connect_timeout_secs > 0 {
        builder = builder.connect_timeout(config.connect_timeout());
    }
    if config.no_proxy {
        builder = builder.no_proxy();
    }

    Ok(builder.build()?)
}

/// Build a request from the given definition
fn build_request(
    client: &reqwest::Client,
    request: &RequestDefinition,
) -> Result<reqwest::Request, ExecutionError> {
    let url = parse_url(&request.url)?;
    let mut req_builder = client.request(request.method.to_reqwest(), url);

    let query: Vec<(&str, &str)> = request
        .enabled_query_params()
        .filter(|p| !p.key.trim().is_empty())
        .map(|p| (p.key.as_str(), p.value.as_str()))
        .collect();
    if !query.is_empty() {
        req_builder = req_builder.query(&query);
    }

    let headers = header_map(request)?;
    let has_content_type = headers.contains_key(CONTENT_TYPE);
    req_builder = req_builder.headers(headers);

    req_builder = match &request.body {
        Body::None => req_builder,
        Body::Raw {
            content,
            content_type,
        } => {
            if !has_content_type {
                req_builder = req_builder.header(CONTENT_TYPE, content_type.mime());
            }
            req_builder.body(content.clone())
        }
        Body::FormUrlEncoded { fields } => {
            let pairs: Vec<(&str, &str)> = fields
                .iter()
                .filter(|f| f.enabled)
                .map(|f| (f.key.as_str(), f.value.as_str()))
                .collect();
            req_builder.form(&pairs)
        }
    };

    req_builder
        .build()
        .map_err(|e| ExecutionError::InvalidRequest(e.to_string()))
}

fn parse_url(raw: &str) -> Result<Url, ExecutionError> {
    let invalid = |reason: String| ExecutionError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| {
        if raw.contains("{{") {
            invalid(format!("{} (unresolved variables)", e))
        } else {
            invalid(e.to_string())
        }
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme `{}`", other))),
    }
}

/// Enabled headers plus auth. Rows with a blank key are editor leftovers and skipped.
fn header_map(request: &RequestDefinition) -> Result<HeaderMap, ExecutionError> {
    let mut headers = HeaderMap::new();

    for header in request.enabled_headers() {
        let key = header.key.trim();
        if key.is_empty() {
            continue;
        }
        let name =
            HeaderName::from_bytes(key.as_bytes()).map_err(|e| ExecutionError::InvalidHeader {
                name: key.to_string(),
                reason: e.to_string(),
            })?;
        headers.append(name, header_value(key, &header.value)?);
    }

    let authorization = match &request.auth {
        AuthType::None => None,
        AuthType::Bearer { token } => Some(format!("Bearer {}", token)),
        AuthType::Basic { username, password } => {
            let credentials = format!("{}:{}", username, password);
            let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
            Some(format!("Basic {}", encoded))
        }
    };
    if let Some(value) = authorization {
        headers.insert(AUTHORIZATION, header_value(AUTHORIZATION.as_str(), &value)?);
    }

    Ok(headers)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ExecutionError> {
    HeaderValue::from_str(value).map_err(|e| ExecutionError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
