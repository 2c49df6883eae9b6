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

//! The authorization code flow ([RFC 6749 section 4.1]), token refresh, and
//! the resource owner password flow.
//!
//! [RFC 6749 section 4.1]: https://www.rfc-editor.org/rfc/rfc6749#section-4.1

use crate::Result;
use crate::authorized::AuthorizedClient;
use crate::client_auth::ClientAuth;
use crate::constants::{
    AUTHORIZATION_CODE_GRANT_TYPE, PASSWORD_GRANT_TYPE, REFRESH_TOKEN_GRANT_TYPE,
};
use crate::context::Context;
use crate::endpoint::{AuthStyle, Endpoint};
use crate::errors::Error;
use crate::jwt_assertion::PrivateKeyAuth;
use crate::options::AuthCodeOption;
use crate::token::{Token, TokenSource};
use crate::token_cache::ReuseTokenSource;
use crate::token_request::retrieve_token;
use crate::transport::TlsAuth;
use crate::values::Values;
use std::sync::{Arc, Mutex};

/// Builds a [Config].
///
/// # Example
/// ```
/// # use google_cloud_oauth2::config::Builder;
/// # use google_cloud_oauth2::endpoint::Endpoint;
/// # fn sample() -> google_cloud_oauth2::Result<()> {
/// let config = Builder::new("my-client-id")
///     .with_client_secret("my-client-secret")
///     .with_endpoint(Endpoint::new(
///         "https://provider.example.com/o/oauth2/auth",
///         "https://provider.example.com/token",
///     ))
///     .with_redirect_url("https://app.example.com/callback")
///     .with_scopes(["email", "profile"])
///     .build()?;
/// let url = config.auth_code_url("state", &[]);
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct Builder {
    client_id: String,
    client_secret: String,
    endpoint: Endpoint,
    redirect_url: String,
    scopes: Vec<String>,
    private_key_auth: Option<PrivateKeyAuth>,
    tls_auth: Option<TlsAuth>,
    context: Context,
}

impl Builder {
    pub fn new<T: Into<String>>(client_id: T) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: String::new(),
            endpoint: Endpoint::default(),
            redirect_url: String::new(),
            scopes: Vec::new(),
            private_key_auth: None,
            tls_auth: None,
            context: Context::default(),
        }
    }

    pub fn with_client_secret<T: Into<String>>(mut self, v: T) -> Self {
        self.client_secret = v.into();
        self
    }

    pub fn with_endpoint(mut self, v: Endpoint) -> Self {
        self.endpoint = v;
        self
    }

    /// The `redirect_uri` for the authorization and exchange requests.
    pub fn with_redirect_url<T: Into<String>>(mut self, v: T) -> Self {
        self.redirect_url = v.into();
        self
    }

    pub fn with_scopes<I, S>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = v.into_iter().map(Into::into).collect();
        self
    }

    /// Required with [AuthStyle::PrivateKeyJwt].
    pub fn with_private_key_auth(mut self, v: PrivateKeyAuth) -> Self {
        self.private_key_auth = Some(v);
        self
    }

    /// Required with [AuthStyle::Mtls].
    pub fn with_tls_auth(mut self, v: TlsAuth) -> Self {
        self.tls_auth = Some(v);
        self
    }

    /// The context for all requests made by the config and its token sources.
    pub fn with_context(mut self, v: Context) -> Self {
        self.context = v;
        self
    }

    /// Validates the configuration and parses any private key.
    pub fn build(self) -> Result<Config> {
        if self.client_id.is_empty() {
            return Err(Error::configuration("the client id is required"));
        }
        let signer = self
            .private_key_auth
            .as_ref()
            .map(PrivateKeyAuth::signer)
            .transpose()?
            .map(Arc::new);
        match self.endpoint.auth_style() {
            AuthStyle::PrivateKeyJwt if signer.is_none() => {
                return Err(Error::configuration(
                    "the private key JWT auth style requires `with_private_key_auth()`",
                ));
            }
            AuthStyle::Mtls if self.tls_auth.is_none() => {
                return Err(Error::configuration(
                    "the mutual TLS auth style requires `with_tls_auth()`",
                ));
            }
            _ => {}
        }
        let auth = ClientAuth::new(self.client_id.clone(), self.client_secret.clone())
            .with_style(self.endpoint.auth_style())
            .with_signer(signer)
            .with_tls(self.tls_auth);
        Ok(Config {
            client_id: self.client_id,
            endpoint: self.endpoint,
            redirect_url: self.redirect_url,
            scopes: self.scopes,
            auth,
            context: self.context,
        })
    }
}

/// A client registered with an authorization server.
#[derive(Clone, Debug)]
pub struct Config {
    client_id: String,
    endpoint: Endpoint,
    redirect_url: String,
    scopes: Vec<String>,
    auth: ClientAuth,
    context: Context,
}

impl Config {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// The URL of the consent page for the user.
    ///
    /// `state` protects against CSRF, and the application must verify it
    /// when handling the redirect. Use [Pkce][crate::pkce::Pkce] options
    /// for public clients.
    ///
    /// The parameters are sorted by name. Options are applied last, so they
    /// can override any standard parameter.
    pub fn auth_code_url(&self, state: &str, options: &[AuthCodeOption]) -> String {
        let mut values = Values::new();
        values.set("response_type", "code");
        values.set("client_id", self.client_id.clone());
        if !self.redirect_url.is_empty() {
            values.set("redirect_uri", self.redirect_url.clone());
        }
        if !self.scopes.is_empty() {
            values.set("scope", self.scopes.join(" "));
        }
        if !state.is_empty() {
            values.set("state", state);
        }
        for o in options {
            o.apply(&mut values);
        }
        let auth_url = self.endpoint.auth_url();
        let separator = if auth_url.contains('?') { '&' } else { '?' };
        format!("{auth_url}{separator}{}", values.encode())
    }

    /// Exchanges an authorization code for a token.
    ///
    /// Include the PKCE [verifier_option][crate::pkce::Pkce::verifier_option]
    /// in `options` if the authorization request used PKCE.
    pub async fn exchange(&self, code: &str, options: &[AuthCodeOption]) -> Result<Token> {
        let mut values = Values::new();
        values.set("grant_type", AUTHORIZATION_CODE_GRANT_TYPE);
        values.set("code", code);
        if !self.redirect_url.is_empty() {
            values.set("redirect_uri", self.redirect_url.clone());
        }
        for o in options {
            o.apply(&mut values);
        }
        retrieve_token(&self.context, &self.auth, self.endpoint.token_url(), values).await
    }

    /// Requests a token with the resource owner's credentials.
    ///
    /// Only use this flow with a highly trusted application, when no other
    /// flow is viable.
    pub async fn password_credentials_token(&self, username: &str, password: &str) -> Result<Token> {
        let mut values = Values::new();
        values.set("grant_type", PASSWORD_GRANT_TYPE);
        values.set("username", username);
        values.set("password", password);
        if !self.scopes.is_empty() {
            values.set("scope", self.scopes.join(" "));
        }
        retrieve_token(&self.context, &self.auth, self.endpoint.token_url(), values).await
    }

    /// Returns `token` while it is valid, then refreshes it.
    ///
    /// The refresh token from `token` is used until the server returns a
    /// new one.
    pub fn token_source(&self, token: Token) -> ReuseTokenSource {
        let refresher = TokenRefresher {
            config: self.clone(),
            refresh_token: Mutex::new(token.refresh_token.clone()),
        };
        ReuseTokenSource::build(Some(token), Arc::new(refresher), None)
    }

    /// An HTTP client authorized with [token_source][Config::token_source].
    pub fn authorized_client(&self, token: Token) -> Result<AuthorizedClient> {
        AuthorizedClient::from_context(&self.context, Arc::new(self.token_source(token)))
    }
}

#[derive(Debug)]
struct TokenRefresher {
    config: Config,
    refresh_token: Mutex<Option<String>>,
}

impl TokenRefresher {
    fn current(&self) -> Result<Option<String>> {
        let guard = self
            .refresh_token
            .lock()
            .map_err(|e| Error::internal(format!("refresh token lock poisoned: {e}")))?;
        Ok(guard.clone())
    }
}

#[async_trait::async_trait]
impl TokenSource for TokenRefresher {
    async fn token(&self) -> Result<Token> {
        let refresh_token = self
            .current()?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::configuration("token expired and refresh token is not set"))?;
        let mut values = Values::new();
        values.set("grant_type", REFRESH_TOKEN_GRANT_TYPE);
        values.set("refresh_token", refresh_token.clone());
        let token = retrieve_token(
            &self.config.context,
            &self.config.auth,
            self.config.endpoint.token_url(),
            values,
        )
        .await?;
        if let Some(new) = token.refresh_token.as_ref().filter(|t| **t != refresh_token) {
            tracing::debug!("the token endpoint rotated the refresh token");
            if let Ok(mut guard) = self.refresh_token.lock() {
                *guard = Some(new.clone());
            }
        }
        Ok(token)
    }
}
