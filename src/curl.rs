use crate::models::{AuthType, Body, HttpMethod, KeyValue, RawContentType, RequestDefinition};
use anyhow::{anyhow, bail, Result};
use url::{form_urlencoded, Url};

/// Parse a cURL command into a RequestDefinition
pub fn parse_curl(input: &str) -> Result<RequestDefinition> {
    let mut request = RequestDefinition::new("Imported Request", HttpMethod::GET, "");
    let mut explicit_method = false;
    let mut data: Option<String> = None;
    let mut form_fields: Vec<KeyValue> = Vec::new();

    // Remove line continuations and normalize
    let normalized = input.replace("\\\r\n", " ").replace("\\\n", " ");

    let mut tokens = tokenize(&normalized)?;

    // Skip 'curl' command if present
    if tokens.first().map(|s| s.as_str()) == Some("curl") {
        tokens.remove(0);
    }

    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];

        match token.as_str() {
            "-X" | "--request" => {
                let value = next_value(&tokens, i)?;
                request.method = value.parse().map_err(|e: String| anyhow!(e))?;
                explicit_method = true;
                i += 1;
            }
            "-H" | "--header" => {
                let header = parse_header(next_value(&tokens, i)?)?;
                // Don't add duplicate headers
                if !request
                    .headers
                    .iter()
                    .any(|h| h.key.eq_ignore_ascii_case(&header.key))
                {
                    request.headers.push(header);
                }
                i += 1;
            }
            "-d" | "--data" | "--data-raw" | "--data-binary" => {
                let value = next_value(&tokens, i)?;
                // Repeated -d flags are joined with '&' like curl does
                data = Some(match data.take() {
                    Some(existing) => format!("{}&{}", existing, value),
                    None => value.to_string(),
                });
                i += 1;
            }
            "--data-urlencode" => {
                let value = next_value(&tokens, i)?;
                form_fields.push(match value.split_once('=') {
                    Some((key, content)) => KeyValue::new(key, content),
                    None => KeyValue::new("", value),
                });
                i += 1;
            }
            "-u" | "--user" => {
                let (username, password) = parse_basic_auth(next_value(&tokens, i)?);
                request.auth = AuthType::Basic { username, password };
                i += 1;
            }
            "--url" => {
                request.url = next_value(&tokens, i)?.to_string();
                i += 1;
            }
            "-o" | "--output" | "-m" | "--max-time" | "--connect-timeout" => {
                // Ignored flags with a value
                next_value(&tokens, i)?;
                i += 1;
            }
            "--compressed" | "-k" | "--insecure" | "-L" | "--location" | "-s" | "--silent" | "-v"
            | "--verbose" | "-i" | "--include" => {
                // Ignored flags
            }
            _ => {
                // First bare argument is the URL; it may still hold placeholders
                if !token.starts_with('-') && request.url.is_empty() {
                    request.url = token.clone();
                }
            }
        }
        i += 1;
    }

    if request.url.is_empty() {
        bail!("No URL found in cURL command");
    }

    promote_bearer_header(&mut request);

    if data.is_some() || !form_fields.is_empty() {
        // Infer POST if not set
        if !explicit_method {
            request.method = HttpMethod::POST;
        }
    }

    if !form_fields.is_empty() {
        let mut fields = data.as_deref().map(parse_form).unwrap_or_default();
        fields.extend(form_fields);
        request.headers.retain(|h| {
            !(h.key.eq_ignore_ascii_case("content-type")
                && h.value.contains("x-www-form-urlencoded"))
        });
        request.body = Body::FormUrlEncoded { fields };
    } else if let Some(content) = data {
        request.body = body_from_data(&mut request.headers, content);
    }

    Ok(request)
}

fn next_value(tokens: &[String], i: usize) -> Result<&str> {
    tokens
        .get(i + 1)
        .map(|s| s.as_str())
        .ok_or_else(|| anyhow!("Missing value for {}", tokens[i]))
}

fn parse_header(s: &str) -> Result<KeyValue> {
    match s.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => Ok(KeyValue::new(key.trim(), value.trim())),
        _ => Err(anyhow!("Invalid header format: {}", s)),
    }
}

fn parse_basic_auth(s: &str) -> (String, String) {
    match s.split_once(':') {
        Some((user, pass)) => (user.to_string(), pass.to_string()),
        None => (s.to_string(), String::new()),
    }
}

/// `Authorization: Bearer x` becomes bearer auth instead of a raw header
fn promote_bearer_header(request: &mut RequestDefinition) {
    let Some(pos) = request.headers.iter().position(|h| {
        h.key.eq_ignore_ascii_case("authorization")
            && h.value.get(..7).is_some_and(|p| p.eq_ignore_ascii_case("bearer "))
    }) else {
        return;
    };
    let header = request.headers.remove(pos);
    request.auth = AuthType::Bearer {
        token: header.value[7..].trim().to_string(),
    };
}

/// Pick the body variant from the declared Content-Type. The header is
/// dropped when the body variant implies it.
fn body_from_data(headers: &mut Vec<KeyValue>, content: String) -> Body {
    let declared = headers
        .iter()
        .position(|h| h.key.eq_ignore_ascii_case("content-type"))
        .map(|pos| (pos, headers[pos].value.to_ascii_lowercase()));

    let (pos, mime) = match declared {
        Some(found) => found,
        None => {
            // curl sends -d data as a form by default
            return Body::FormUrlEncoded {
                fields: parse_form(&content),
            };
        }
    };

    let essence = mime.split(';').next().unwrap_or_default().trim();
    let content_type = match essence {
        "application/x-www-form-urlencoded" => {
            headers.remove(pos);
            return Body::FormUrlEncoded {
                fields: parse_form(&content),
            };
        }
        "application/json" => Some(RawContentType::Json),
        "application/xml" | "text/xml" => Some(RawContentType::Xml),
        "text/plain" => Some(RawContentType::Text),
        "text/html" => Some(RawContentType::Html),
        _ => None,
    };

    match content_type {
        Some(content_type) if content_type.mime() == mime.trim() => {
            headers.remove(pos);
            Body::Raw {
                content,
                content_type,
            }
        }
        // parameters such as charset only survive in the header
        Some(content_type) => Body::Raw {
            content,
            content_type,
        },
        None => Body::Raw {
            content,
            content_type: RawContentType::Text,
        },
    }
}

fn parse_form(content: &str) -> Vec<KeyValue> {
    form_urlencoded::parse(content.as_bytes())
        .map(|(key, value)| KeyValue::new(key, value))
        .collect()
}

#[derive(Clone, Copy, PartialEq)]
enum Quote {
    Bare,
    Single,
    Double,
}

/// Split a shell command line into words. Single quotes are literal, a
/// backslash escapes the next character outside them.
fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut word: Option<String> = None;
    let mut quote = Quote::Bare;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::Bare,
            (Quote::Single, c) => word.get_or_insert_with(String::new).push(c),
            (_, '\\') => {
                if let Some(escaped) = chars.next() {
                    word.get_or_insert_with(String::new).push(escaped);
                }
            }
            (Quote::Double, c) => word.get_or_insert_with(String::new).push(c),
            (Quote::Bare, '\'') => {
                word.get_or_insert_with(String::new);
                quote = Quote::Single;
            }
            (Quote::Bare, '"') => {
                word.get_or_insert_with(String::new);
                quote = Quote::Double;
            }
            (Quote::Bare, c) if c.is_whitespace() => words.extend(word.take()),
            (Quote::Bare, c) => word.get_or_insert_with(String::new).push(c),
        }
    }

    if quote != Quote::Bare {
        bail!("Unterminated quote in cURL command");
    }
    words.extend(word);

    Ok(words)
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// URL with the enabled query rows appended, form-encoded
fn export_url(request: &RequestDefinition) -> String {
    let pairs: Vec<(&str, &str)> = request
        .enabled_query_params()
        .map(|p| (p.key.as_str(), p.value.as_str()))
        .collect();
    if pairs.is_empty() {
        return request.url.clone();
    }

    // placeholders must survive as written, so only plain URLs are re-parsed
    match Url::parse(&request.url).ok().filter(|_| !request.url.contains("{{")) {
        Some(mut url) => {
            url.query_pairs_mut().extend_pairs(&pairs);
            url.into()
        }
        None => {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&pairs)
                .finish();
            let separator = if request.url.contains('?') { '&' } else { '?' };
            format!("{}{}{}", request.url, separator, query)
        }
    }
}

/// Format request as cURL command. Only enabled rows are included.
pub fn to_curl(request: &RequestDefinition) -> String {
    let mut parts = vec!["curl".to_string()];

    // Method
    if request.method != HttpMethod::GET {
        parts.push(format!("-X {}", request.method.as_str()));
    }

    parts.push(shell_quote(&export_url(request)));

    // Headers
    for header in request.enabled_headers() {
        parts.push(format!("-H {}", shell_quote(&format!("{}: {}", header.key, header.value))));
    }

    // Auth
    match &request.auth {
        AuthType::Bearer { token } => {
            parts.push(format!("-H {}", shell_quote(&format!("Authorization: Bearer {}", token))));
        }
        AuthType::Basic { username, password } => {
            parts.push(format!("-u {}", shell_quote(&format!("{}:{}", username, password))));
        }
        AuthType::None => {}
    }

    // Body
    let has_content_type = request
        .enabled_headers()
        .any(|h| h.key.eq_ignore_ascii_case("content-type"));
    match &request.body {
        Body::None => {}
        Body::Raw {
            content,
            content_type,
        } => {
            if !has_content_type {
                let header = format!("Content-Type: {}", content_type.mime());
                parts.push(format!("-H {}", shell_quote(&header)));
            }
            parts.push(format!("-d {}", shell_quote(content)));
        }
        Body::FormUrlEncoded { fields } => {
            for field in fields.iter().filter(|f| f.enabled) {
                parts.push(format!(
                    "--data-urlencode {}",
                    shell_quote(&format!("{}={}", field.key, field.value))
                ));
            }
        }
    }

    parts.join(" \\\n  ")
}
