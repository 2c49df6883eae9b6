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

//! Adds client credentials to token requests.

use crate::Result;
use crate::endpoint::AuthStyle;
use crate::errors::Error;
use crate::jwt_assertion::AssertionSigner;
use crate::transport::TlsAuth;
use crate::values::Values;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::sync::Arc;
use url::form_urlencoded::byte_serialize;

/// How a client authenticates to the token endpoint.
#[derive(Clone, Default)]
pub(crate) struct ClientAuth {
    client_id: String,
    client_secret: String,
    style: AuthStyle,
    signer: Option<Arc<AssertionSigner>>,
    tls: Option<TlsAuth>,
}

impl ClientAuth {
    pub(crate) fn new<I: Into<String>, S: Into<String>>(client_id: I, client_secret: S) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Default::default()
        }
    }

    pub(crate) fn with_style(mut self, v: AuthStyle) -> Self {
        self.style = v;
        self
    }

    pub(crate) fn with_signer(mut self, v: Option<Arc<AssertionSigner>>) -> Self {
        self.signer = v;
        self
    }

    pub(crate) fn with_tls(mut self, v: Option<TlsAuth>) -> Self {
        self.tls = v;
        self
    }

    pub(crate) fn style(&self) -> AuthStyle {
        self.style
    }

    pub(crate) fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn tls(&self) -> Option<&TlsAuth> {
        self.tls.as_ref()
    }

    /// Adds the credentials for `style`, which must not be `AutoDetect`.
    pub(crate) fn apply(
        &self,
        style: AuthStyle,
        token_url: &str,
        headers: &mut HeaderMap,
        values: &mut Values,
    ) -> Result<()> {
        match style {
            AuthStyle::InHeader => {
                headers.insert(AUTHORIZATION, self.basic_header()?);
            }
            AuthStyle::InParams => {
                values.set("client_id", self.client_id.clone());
                if !self.client_secret.is_empty() {
                    values.set("client_secret", self.client_secret.clone());
                }
            }
            AuthStyle::PrivateKeyJwt => {
                let signer = self.signer.as_ref().ok_or_else(|| {
                    Error::configuration(
                        "the private key JWT auth style requires a private key configuration",
                    )
                })?;
                values.set("client_id", self.client_id.clone());
                signer.inject(&self.client_id, token_url, values)?;
            }
            AuthStyle::Mtls => {
                if self.tls.is_none() {
                    return Err(Error::configuration(
                        "the mutual TLS auth style requires a client certificate",
                    ));
                }
                values.set("client_id", self.client_id.clone());
            }
            AuthStyle::AutoDetect => {
                return Err(Error::internal(
                    "the auth style must be resolved before sending a token request",
                ));
            }
        }
        Ok(())
    }

    // RFC 6749 section 2.3.1 requires form encoding the credentials first.
    fn basic_header(&self) -> Result<HeaderValue> {
        let id: String = byte_serialize(self.client_id.as_bytes()).collect();
        let secret: String = byte_serialize(self.client_secret.as_bytes()).collect();
        let encoded = STANDARD.encode(format!("{id}:{secret}"));
        let mut value =
            HeaderValue::from_str(&format!("Basic {encoded}")).map_err(Error::internal)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl std::fmt::Debug for ClientAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientAuth")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[censored]")
            .field("style", &self.style)
            .field("signer", &self.signer)
            .field("tls", &self.tls)
            .finish()
    }
}
