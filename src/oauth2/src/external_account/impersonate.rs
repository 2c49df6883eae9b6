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

use crate::Result;
use crate::context::Context;
use crate::errors::{Error, RetrieveError};
use crate::token::Token;
use crate::token_request::read_limited;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use time::OffsetDateTime;

pub(crate) const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(serde::Serialize, Debug, PartialEq)]
struct GenerateAccessTokenRequest {
    scope: Vec<String>,
    lifetime: String,
}

#[derive(serde::Deserialize)]
struct GenerateAccessTokenResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "expireTime", with = "time::serde::rfc3339")]
    expire_time: OffsetDateTime,
}

// The IAM credentials API returns `{"error": {"status": ..., "message": ...}}`,
// some proxies return the RFC 6749 shape instead.
fn error_fields(body: &[u8]) -> (Option<String>, Option<String>) {
    let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(body) else {
        return (None, None);
    };
    let text = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);
    match fields.get("error") {
        Some(Value::Object(status)) => (text(status.get("status")), text(status.get("message"))),
        Some(Value::String(code)) => (Some(code.clone()), text(fields.get("error_description"))),
        _ => (None, None),
    }
}

/// Exchanges `source` for a service account access token.
pub(crate) async fn generate_access_token(
    ctx: &Context,
    url: &str,
    source: &Token,
    scopes: &[String],
    lifetime: Duration,
) -> Result<Token> {
    let body = GenerateAccessTokenRequest {
        scope: scopes.to_vec(),
        lifetime: format!("{}s", lifetime.as_secs()),
    };
    let authorization = source.authorization_header()?;
    let client = ctx.http_client()?;

    tracing::debug!(url, "impersonating service account");
    ctx.run(async {
        let response = client
            .post(url)
            .header(AUTHORIZATION, authorization)
            .json(&body)
            .send()
            .await
            .map_err(Error::from_http)?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = read_limited(response).await?;
        if !status.is_success() {
            tracing::warn!(url, %status, "service account impersonation rejected");
            let (code, description) = error_fields(&body);
            let error = RetrieveError::new(status, content_type, body)
                .with_oauth_fields(code, description, None);
            return Err(Error::retrieve(error));
        }
        let response =
            serde_json::from_slice::<GenerateAccessTokenResponse>(&body).map_err(|e| {
                Error::invalid_response(format!(
                    "cannot parse the impersonation response: {e}, response=<{}>",
                    String::from_utf8_lossy(&body)
                ))
            })?;
        Ok(Token {
            access_token: response.access_token,
            token_type: "Bearer".to_string(),
            expiry: Some(response.expire_time),
            ..Default::default()
        })
    })
    .await
}
