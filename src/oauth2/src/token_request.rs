// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Sends token requests and decodes the responses ([RFC 6749 section 5]).
//!
//! [RFC 6749 section 5]: https://www.rfc-editor.org/rfc/rfc6749#section-5

use crate::Result;
use crate::client_auth::ClientAuth;
use crate::constants::MAX_RESPONSE_BYTES;
use crate::context::Context;
use crate::endpoint::AuthStyle;
use crate::errors::{Error, RetrieveError};
use crate::token::{DEFAULT_EXPIRY_DELTA, Token};
use crate::transport;
use crate::values::Values;
use bytes::{Bytes, BytesMut};
use http::StatusCode;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};
use time::OffsetDateTime;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// The auth style that worked for each token URL.
static AUTH_STYLE_CACHE: LazyLock<Mutex<HashMap<String, AuthStyle>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

pub(crate) fn lookup_auth_style(token_url: &str) -> Option<AuthStyle> {
    AUTH_STYLE_CACHE
        .lock()
        .ok()
        .and_then(|cache| cache.get(token_url).copied())
}

pub(crate) fn remember_auth_style(token_url: &str, style: AuthStyle) {
    if let Ok(mut cache) = AUTH_STYLE_CACHE.lock() {
        cache.insert(token_url.to_string(), style);
    }
}

/// Requests a token from `token_url`.
///
/// With [AuthStyle::AutoDetect] the style cached for `token_url` is used. If
/// there is none, the request is sent with [AuthStyle::InHeader], and retried
/// with [AuthStyle::InParams] if the server rejects it with a 400 or 401.
pub(crate) async fn retrieve_token(
    ctx: &Context,
    auth: &ClientAuth,
    token_url: &str,
    values: Values,
) -> Result<Token> {
    let (style, needs_probe) = match auth.style() {
        AuthStyle::AutoDetect => match lookup_auth_style(token_url) {
            Some(style) => (style, false),
            None => (AuthStyle::InHeader, true),
        },
        style => (style, false),
    };

    let result = round_trip(ctx, auth, style, token_url, &values).await;
    let (result, style) = match result {
        Err(e) if needs_probe && rejects_client_auth(&e) => {
            tracing::debug!(
                token_url,
                status = ?e.as_retrieve().map(RetrieveError::status),
                "retrying token request with client credentials in the request body"
            );
            let style = AuthStyle::InParams;
            (round_trip(ctx, auth, style, token_url, &values).await, style)
        }
        r => (r, style),
    };
    let mut token = result?;
    if needs_probe {
        tracing::debug!(token_url, ?style, "detected token endpoint auth style");
        remember_auth_style(token_url, style);
    }
    if token.refresh_token.is_none() {
        token.refresh_token = values.get("refresh_token").map(str::to_string);
    }
    Ok(token)
}

fn rejects_client_auth(e: &Error) -> bool {
    e.as_retrieve().is_some_and(|r| {
        r.status() == StatusCode::BAD_REQUEST || r.status() == StatusCode::UNAUTHORIZED
    })
}

async fn round_trip(
    ctx: &Context,
    auth: &ClientAuth,
    style: AuthStyle,
    token_url: &str,
    values: &Values,
) -> Result<Token> {
    let mut values = values.clone();
    let mut headers = HeaderMap::new();
    auth.apply(style, token_url, &mut headers, &mut values)?;
    let tls = match style {
        AuthStyle::Mtls => auth.tls(),
        _ => None,
    };
    let client = transport::client_for(ctx, tls)?;
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    tracing::debug!(token_url, ?style, "requesting token");
    ctx.run(async {
        let start = OffsetDateTime::now_utc();
        let response = client
            .post(token_url)
            .headers(headers)
            .body(values.encode())
            .send()
            .await
            .map_err(Error::from_http)?;
        let status = response.status();
        let content_type = header_str(response.headers(), CONTENT_TYPE);
        let body = read_limited(response).await?;
        parse_token_response(status, content_type, body, start)
    })
    .await
}

fn header_str(headers: &HeaderMap, name: http::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Reads at most [MAX_RESPONSE_BYTES] of the response body.
pub(crate) async fn read_limited(mut response: reqwest::Response) -> Result<Bytes> {
    let mut body = BytesMut::new();
    while let Some(chunk) = response.chunk().await.map_err(Error::from_http)? {
        let remaining = MAX_RESPONSE_BYTES - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

fn is_form(content_type: Option<&str>) -> bool {
    let media_type = content_type
        .and_then(|c| c.split(';').next())
        .map(str::trim)
        .unwrap_or_default();
    media_type.eq_ignore_ascii_case(FORM_CONTENT_TYPE)
        || media_type.eq_ignore_ascii_case("text/plain")
}

pub(crate) fn parse_token_response(
    status: StatusCode,
    content_type: Option<String>,
    body: Bytes,
    start: OffsetDateTime,
) -> Result<Token> {
    let fields = if is_form(content_type.as_deref()) {
        Some(form_fields(&body))
    } else {
        serde_json::from_slice::<Map<String, Value>>(&body).ok()
    };

    let error_code = fields
        .as_ref()
        .and_then(|f| string_field(f, "error"))
        .filter(|c| !c.is_empty());
    if !status.is_success() || error_code.is_some() {
        let get = |k: &str| fields.as_ref().and_then(|f| string_field(f, k));
        let error = RetrieveError::new(status, content_type, body.clone()).with_oauth_fields(
            get("error"),
            get("error_description"),
            get("error_uri"),
        );
        return Err(Error::retrieve(error));
    }

    let fields = fields.ok_or_else(|| {
        Error::invalid_response(format!(
            "cannot parse the token response as JSON, response=<{}>",
            String::from_utf8_lossy(&body)
        ))
    })?;
    let access_token = string_field(&fields, "access_token").unwrap_or_default();
    if access_token.is_empty() {
        return Err(Error::invalid_response(
            "the server response contains no access token",
        ));
    }
    let expiry = match expires_in(&fields)?.filter(|s| *s > 0) {
        None => None,
        Some(s) => Some(expiry_after(start, s)? - DEFAULT_EXPIRY_DELTA),
    };
    Ok(Token {
        access_token,
        token_type: string_field(&fields, "token_type").unwrap_or_default(),
        refresh_token: string_field(&fields, "refresh_token").filter(|t| !t.is_empty()),
        expiry,
        expiry_delta: None,
        extra: fields.into_iter().collect(),
    })
}

/// Returns `start` plus `seconds`, failing if the result is not representable.
pub(crate) fn expiry_after(start: OffsetDateTime, seconds: i64) -> Result<OffsetDateTime> {
    start
        .checked_add(time::Duration::seconds(seconds))
        .ok_or_else(|| {
            Error::invalid_response(format!("`expires_in` value <{seconds}> is out of range"))
        })
}

fn form_fields(body: &[u8]) -> Map<String, Value> {
    Values::parse_bytes(body)
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(v)))
        .collect()
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Some servers send `expires_in` as a string.
fn expires_in(fields: &Map<String, Value>) -> Result<Option<i64>> {
    let value = match fields.get("expires_in") {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };
    let seconds = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) if s.is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    seconds.map(Some).ok_or_else(|| {
        Error::invalid_response(format!("cannot parse `expires_in` value <{value}>"))
    })
}
