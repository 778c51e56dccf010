//! `{{variable}}` interpolation
//!
//! Unknown placeholders are left exactly as written so the caller can show
//! which variables are unresolved. Interpolation never fails.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::models::{AuthType, Body, KeyValue, RequestDefinition, VariableMap};

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").unwrap())
}

/// Substitute every `{{name}}` in `text` that has a mapping in `variables`.
///
/// Input without `{{` is returned borrowed, without allocating. Substituted
/// values are not scanned again.
pub fn interpolate<'a>(text: &'a str, variables: &VariableMap) -> Cow<'a, str> {
    if !text.contains("{{") {
        return Cow::Borrowed(text);
    }

    placeholder().replace_all(text, |caps: &Captures| match variables.get(&caps[1]) {
        Some(value) => value.to_string(),
        None => caps[0].to_string(),
    })
}

/// Names of placeholders in `text` with no mapping, in order of appearance
pub fn unresolved<'a>(text: &'a str, variables: &VariableMap) -> Vec<&'a str> {
    if !text.contains("{{") {
        return Vec::new();
    }

    placeholder()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|name| name.as_str())
        .filter(|name| !variables.contains_key(name))
        .collect()
}

/// Produce a fully owned copy of `request` with placeholders substituted in
/// the URL, header and query rows, body content or form fields, and auth
/// credentials. Method and body content type are copied as-is.
pub fn resolve(request: &RequestDefinition, variables: &VariableMap) -> RequestDefinition {
    let owned = |text: &str| interpolate(text, variables).into_owned();
    let rows = |items: &[KeyValue]| -> Vec<KeyValue> {
        items
            .iter()
            .map(|row| KeyValue {
                key: owned(&row.key),
                value: owned(&row.value),
                enabled: row.enabled,
                description: row.description.clone(),
            })
            .collect()
    };

    let body = match &request.body {
        Body::None => Body::None,
        Body::Raw {
            content,
            content_type,
        } => Body::Raw {
            content: owned(content),
            content_type: *content_type,
        },
        Body::FormUrlEncoded { fields } => Body::FormUrlEncoded {
            fields: rows(fields),
        },
    };

    let auth = match &request.auth {
        AuthType::None => AuthType::None,
        AuthType::Bearer { token } => AuthType::Bearer {
            token: owned(token),
        },
        AuthType::Basic { username, password } => AuthType::Basic {
            username: owned(username),
            password: owned(password),
        },
    };

    RequestDefinition {
        id: request.id.clone(),
        name: request.name.clone(),
        method: request.method,
        url: owned(&request.url),
        headers: rows(&request.headers),
        query_params: rows(&request.query_params),
        body,
        auth,
        created_at: request.created_at,
        updated_at: request.updated_at,
    }
}
