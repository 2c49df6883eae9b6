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

//! OAuth 2.0 Security Token Service (STS) exchange.
//!
//! [exchange_token] trades a subject token (and optionally an actor token)
//! for an access token, following [RFC 8693]. [refresh_access_token] uses the
//! refresh token grant against the same kind of endpoint.
//!
//! These functions do not check the token URL against the Google STS
//! allow-list, callers that accept URLs from configuration files should use
//! [external_account][crate::external_account] instead.
//!
//! [RFC 8693]: https://datatracker.ietf.org/doc/html/rfc8693

use crate::Result;
use crate::client_auth::ClientAuth;
use crate::constants::{ACCESS_TOKEN_TYPE, REFRESH_TOKEN_GRANT_TYPE, TOKEN_EXCHANGE_GRANT_TYPE};
use crate::context::Context;
use crate::endpoint::AuthStyle;
use crate::errors::{Error, RetrieveError};
use crate::token_request::read_limited;
use crate::values::Values;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::collections::HashMap;

/// Performs an oauth2 token exchange with the provided [ExchangeTokenRequest]
/// information.
pub async fn exchange_token(ctx: &Context, req: ExchangeTokenRequest) -> Result<TokenResponse> {
    let mut params = Values::new();
    params.set("grant_type", TOKEN_EXCHANGE_GRANT_TYPE);
    params.set("requested_token_type", ACCESS_TOKEN_TYPE);
    params.set("subject_token", req.subject_token);
    params.set("subject_token_type", req.subject_token_type);

    if !req.scope.is_empty() {
        params.set("scope", req.scope.join(" "));
    }
    if let Some(audience) = req.audience {
        params.set("audience", audience);
    }
    if let Some(resource) = req.resource {
        params.set("resource", resource);
    }
    if let Some(actor_token) = req.actor_token {
        params.set("actor_token", actor_token);
    }
    if let Some(actor_token_type) = req.actor_token_type {
        params.set("actor_token_type", actor_token_type);
    }
    if let Some(options) = req.extra_options {
        let options = serde_json::to_string(&options).map_err(Error::internal)?;
        params.set("options", options);
    }

    execute(ctx, &req.url, req.authentication, req.headers, params).await
}

/// Performs the token exchange using a refresh token flow with the provided
/// [RefreshAccessTokenRequest] information.
pub async fn refresh_access_token(
    ctx: &Context,
    req: RefreshAccessTokenRequest,
) -> Result<TokenResponse> {
    let mut params = Values::new();
    params.set("grant_type", REFRESH_TOKEN_GRANT_TYPE);
    params.set("refresh_token", req.refresh_token);

    execute(ctx, &req.url, req.authentication, req.headers, params).await
}

async fn execute(
    ctx: &Context,
    url: &str,
    client_auth: ClientAuthentication,
    mut headers: HeaderMap,
    mut params: Values,
) -> Result<TokenResponse> {
    client_auth.inject_auth(url, &mut headers, &mut params)?;
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    let client = ctx.http_client()?;

    tracing::debug!(url, "exchanging token with the security token service");
    ctx.run(async {
        let response = client
            .post(url)
            .headers(headers)
            .body(params.encode())
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
            let fields = serde_json::from_slice::<OAuthError>(&body).unwrap_or_default();
            let error = RetrieveError::new(status, content_type, body).with_oauth_fields(
                fields.error,
                fields.error_description,
                fields.error_uri,
            );
            tracing::warn!(url, %status, "token exchange rejected");
            return Err(Error::retrieve(error));
        }
        serde_json::from_slice::<TokenResponse>(&body).map_err(|e| {
            Error::invalid_response(format!(
                "cannot parse the token exchange response: {e}, response=<{}>",
                String::from_utf8_lossy(&body)
            ))
        })
    })
    .await
}

#[derive(Deserialize, Default)]
struct OAuthError {
    error: Option<String>,
    error_description: Option<String>,
    error_uri: Option<String>,
}

/// TokenResponse is used to decode the remote server response during
/// an oauth2 token exchange.
#[derive(Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TokenResponse {
    pub access_token: String,
    pub issued_token_type: String,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[censored]")
            .field("issued_token_type", &self.issued_token_type)
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[censored]"))
            .finish()
    }
}

/// ClientAuthentication represents an OAuth client ID and secret and the
/// mechanism for passing these credentials as stated
/// in https://datatracker.ietf.org/doc/html/rfc6749#section-2.3.1.
#[derive(Clone, Default)]
pub struct ClientAuthentication {
    pub auth_style: ClientAuthStyle,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for ClientAuthentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientAuthentication")
            .field("auth_style", &self.auth_style)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[censored]"))
            .finish()
    }
}

/// Authentication style via headers or form params.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClientAuthStyle {
    #[default]
    InHeader,
    InParams,
}

impl ClientAuthentication {
    /// Adds the client credentials when both the id and the secret are set.
    pub(crate) fn inject_auth(
        &self,
        url: &str,
        headers: &mut HeaderMap,
        params: &mut Values,
    ) -> Result<()> {
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) else {
            return Ok(());
        };
        if client_id.is_empty() || client_secret.is_empty() {
            return Ok(());
        }
        let style = match self.auth_style {
            ClientAuthStyle::InHeader => AuthStyle::InHeader,
            ClientAuthStyle::InParams => AuthStyle::InParams,
        };
        ClientAuth::new(client_id.as_str(), client_secret.as_str()).apply(style, url, headers, params)
    }
}

/// Information required to perform an oauth2 token exchange with the provided endpoint.
///
/// `headers` are sent in addition to the content type and client
/// authentication headers. `extra_options` is JSON encoded into the `options`
/// parameter.
#[derive(Default)]
pub struct ExchangeTokenRequest {
    pub url: String,
    pub authentication: ClientAuthentication,
    pub headers: HeaderMap,
    pub resource: Option<String>,
    pub subject_token: String,
    pub subject_token_type: String,
    pub audience: Option<String>,
    pub scope: Vec<String>,
    pub actor_token: Option<String>,
    pub actor_token_type: Option<String>,
    pub extra_options: Option<HashMap<String, String>>,
}

impl std::fmt::Debug for ExchangeTokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeTokenRequest")
            .field("url", &self.url)
            .field("authentication", &self.authentication)
            .field("resource", &self.resource)
            .field("subject_token", &"[censored]")
            .field("subject_token_type", &self.subject_token_type)
            .field("audience", &self.audience)
            .field("scope", &self.scope)
            .field("actor_token", &self.actor_token.as_ref().map(|_| "[censored]"))
            .field("actor_token_type", &self.actor_token_type)
            .field("extra_options", &self.extra_options)
            .finish()
    }
}

/// Information required to perform the token exchange using a refresh token flow.
#[derive(Default)]
pub struct RefreshAccessTokenRequest {
    pub url: String,
    pub authentication: ClientAuthentication,
    pub headers: HeaderMap,
    pub refresh_token: String,
}

impl std::fmt::Debug for RefreshAccessTokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshAccessTokenRequest")
            .field("url", &self.url)
            .field("authentication", &self.authentication)
            .field("refresh_token", &"[censored]")
            .finish()
    }
}
