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

//! The client credentials flow ([RFC 6749 section 4.4]).
//!
//! The client authenticates with its own credentials, there is no user
//! involved. Typically used for server-to-server communication.
//!
//! [RFC 6749 section 4.4]: https://www.rfc-editor.org/rfc/rfc6749#section-4.4

use crate::Result;
use crate::authorized::AuthorizedClient;
use crate::client_auth::ClientAuth;
use crate::constants::CLIENT_CREDENTIALS_GRANT_TYPE;
use crate::context::Context;
use crate::endpoint::AuthStyle;
use crate::errors::Error;
use crate::jwt_assertion::PrivateKeyAuth;
use crate::token::{Token, TokenSource};
use crate::token_cache::ReuseTokenSource;
use crate::token_request::retrieve_token;
use crate::transport::TlsAuth;
use crate::values::Values;
use std::sync::Arc;

/// Builds a client credentials [Config].
///
/// # Example
/// ```
/// # use google_cloud_oauth2::client_credentials::Builder;
/// # fn sample() -> google_cloud_oauth2::Result<()> {
/// let config = Builder::new("my-client-id", "https://provider.example.com/token")
///     .with_client_secret("my-client-secret")
///     .with_scopes(["https://www.googleapis.com/auth/devstorage.full_control"])
///     .build()?;
/// let source = config.token_source();
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct Builder {
    client_id: String,
    client_secret: String,
    token_url: String,
    scopes: Vec<String>,
    endpoint_params: Values,
    auth_style: AuthStyle,
    private_key_auth: Option<PrivateKeyAuth>,
    tls_auth: Option<TlsAuth>,
    context: Context,
}

impl Builder {
    pub fn new<I: Into<String>, U: Into<String>>(client_id: I, token_url: U) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: String::new(),
            token_url: token_url.into(),
            scopes: Vec::new(),
            endpoint_params: Values::new(),
            auth_style: AuthStyle::default(),
            private_key_auth: None,
            tls_auth: None,
            context: Context::default(),
        }
    }

    pub fn with_client_secret<T: Into<String>>(mut self, v: T) -> Self {
        self.client_secret = v.into();
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

    /// Additional parameters for the token request.
    ///
    /// These are merged with the standard parameters, replacing any that
    /// share a name.
    pub fn with_endpoint_params(mut self, v: Values) -> Self {
        self.endpoint_params = v;
        self
    }

    pub fn with_auth_style(mut self, v: AuthStyle) -> Self {
        self.auth_style = v;
        self
    }

    /// Signs a client assertion instead of sending the client secret.
    ///
    /// Sets the auth style to [AuthStyle::PrivateKeyJwt].
    pub fn with_private_key_auth(mut self, v: PrivateKeyAuth) -> Self {
        self.private_key_auth = Some(v);
        self.auth_style = AuthStyle::PrivateKeyJwt;
        self
    }

    /// Authenticates with a TLS client certificate.
    ///
    /// Sets the auth style to [AuthStyle::Mtls].
    pub fn with_tls_auth(mut self, v: TlsAuth) -> Self {
        self.tls_auth = Some(v);
        self.auth_style = AuthStyle::Mtls;
        self
    }

    pub fn with_context(mut self, v: Context) -> Self {
        self.context = v;
        self
    }

    pub fn build(self) -> Result<Config> {
        if self.client_id.is_empty() {
            return Err(Error::configuration("the client id is required"));
        }
        if self.token_url.is_empty() {
            return Err(Error::configuration("the token URL is required"));
        }
        let signer = self
            .private_key_auth
            .as_ref()
            .map(PrivateKeyAuth::signer)
            .transpose()?
            .map(Arc::new);
        match self.auth_style {
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
        let auth = ClientAuth::new(self.client_id, self.client_secret)
            .with_style(self.auth_style)
            .with_signer(signer)
            .with_tls(self.tls_auth);
        Ok(Config {
            inner: Arc::new(Inner {
                token_url: self.token_url,
                scopes: self.scopes,
                endpoint_params: self.endpoint_params,
                auth,
                context: self.context,
            }),
        })
    }
}

/// A client credentials configuration.
#[derive(Clone, Debug)]
pub struct Config {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    token_url: String,
    scopes: Vec<String>,
    endpoint_params: Values,
    auth: ClientAuth,
    context: Context,
}

impl Config {
    pub fn client_id(&self) -> &str {
        self.inner.auth.client_id()
    }

    pub fn token_url(&self) -> &str {
        &self.inner.token_url
    }

    /// Requests a new token. Every call sends a request.
    pub async fn token(&self) -> Result<Token> {
        let mut values = Values::new();
        values.set("grant_type", CLIENT_CREDENTIALS_GRANT_TYPE);
        if !self.inner.scopes.is_empty() {
            values.set("scope", self.inner.scopes.join(" "));
        }
        values.merge(&self.inner.endpoint_params);
        retrieve_token(
            &self.inner.context,
            &self.inner.auth,
            &self.inner.token_url,
            values,
        )
        .await
    }

    /// A source that caches the token until it expires.
    pub fn token_source(&self) -> ReuseTokenSource {
        ReuseTokenSource::build(None, Arc::new(self.clone()), None)
    }

    /// An HTTP client authorized with [token_source][Config::token_source].
    pub fn authorized_client(&self) -> Result<AuthorizedClient> {
        AuthorizedClient::from_context(&self.inner.context, Arc::new(self.token_source()))
    }
}

#[async_trait::async_trait]
impl TokenSource for Config {
    async fn token(&self) -> Result<Token> {
        Config::token(self).await
    }
}
