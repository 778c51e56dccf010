use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, RequestId};

/// HTTP Method enum
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HttpMethod {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::GET,
        HttpMethod::POST,
        HttpMethod::PUT,
        HttpMethod::PATCH,
        HttpMethod::DELETE,
        HttpMethod::HEAD,
        HttpMethod::OPTIONS,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::GET => reqwest::Method::GET,
            HttpMethod::POST => reqwest::Method::POST,
            HttpMethod::PUT => reqwest::Method::PUT,
            HttpMethod::PATCH => reqwest::Method::PATCH,
            HttpMethod::DELETE => reqwest::Method::DELETE,
            HttpMethod::HEAD => reqwest::Method::HEAD,
            HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown HTTP method: {}", s))
    }
}

fn enabled_by_default() -> bool {
    true
}

/// A key/value row with an enabled toggle, used for headers, query
/// parameters and form fields
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        KeyValue {
            key: key.into(),
            value: value.into(),
            enabled: true,
            description: String::new(),
        }
    }

    /// A row that is kept but never sent
    pub fn disabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        KeyValue {
            enabled: false,
            ..KeyValue::new(key, value)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// HTTP Header
pub type Header = KeyValue;

/// URL query parameter
pub type QueryParam = KeyValue;

/// Declared sub-type of a raw body
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawContentType {
    #[default]
    Json,
    Xml,
    Text,
    Html,
}

impl RawContentType {
    /// MIME type sent as `Content-Type`
    pub fn mime(&self) -> &'static str {
        match self {
            RawContentType::Json => "application/json",
            RawContentType::Xml => "application/xml",
            RawContentType::Text => "text/plain",
            RawContentType::Html => "text/html",
        }
    }
}

/// Request body
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Body {
    #[default]
    None,
    Raw {
        content: String,
        #[serde(default)]
        content_type: RawContentType,
    },
    FormUrlEncoded {
        #[serde(default)]
        fields: Vec<KeyValue>,
    },
}

impl Body {
    pub fn json(content: impl Into<String>) -> Self {
        Body::Raw {
            content: content.into(),
            content_type: RawContentType::Json,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Body::Raw {
            content: content.into(),
            content_type: RawContentType::Text,
        }
    }

    pub fn form(fields: Vec<KeyValue>) -> Self {
        Body::FormUrlEncoded { fields }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Body::None)
    }
}

/// Authentication type
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthType {
    #[default]
    None,
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: String,
    },
}

/// A saved or ad-hoc HTTP request. String fields may carry `{{name}}`
/// placeholders until passed through [`crate::interpolate::resolve`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestDefinition {
    pub id: RequestId,
    pub name: String,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub query_params: Vec<QueryParam>,
    #[serde(default)]
    pub body: Body,
    #[serde(default)]
    pub auth: AuthType,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl RequestDefinition {
    pub fn new(name: impl Into<String>, method: HttpMethod, url: impl Into<String>) -> Self {
        let now = Utc::now();
        RequestDefinition {
            id: new_id(),
            name: name.into(),
            method,
            url: url.into(),
            headers: Vec::new(),
            query_params: Vec::new(),
            body: Body::None,
            auth: AuthType::None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    pub fn with_query_param(mut self, param: QueryParam) -> Self {
        self.query_params.push(param);
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn with_auth(mut self, auth: AuthType) -> Self {
        self.auth = auth;
        self
    }

    /// Mark the definition as modified now
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Headers that will actually be sent
    pub fn enabled_headers(&self) -> impl Iterator<Item = &Header> {
        self.headers.iter().filter(|h| h.enabled)
    }

    /// Query parameters that will actually be sent
    pub fn enabled_query_params(&self) -> impl Iterator<Item = &QueryParam> {
        self.query_params.iter().filter(|p| p.enabled)
    }
}

impl Default for RequestDefinition {
    fn default() -> Self {
        use crate::constants::DEFAULT_HTTP_URL;
        RequestDefinition::new("New Request", HttpMethod::GET, DEFAULT_HTTP_URL)
    }
}
