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

//! HTTP client configuration, including TLS client certificates for
//! [RFC 8705] mutual TLS client authentication.
//!
//! [RFC 8705]: https://www.rfc-editor.org/rfc/rfc8705

use crate::Result;
use crate::context::Context;
use crate::errors::Error;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::time::Duration;

/// The HTTP client used by a [Context].
#[derive(Clone, Debug)]
pub enum HttpClient {
    /// The client is built from these options. The options are kept, so the
    /// client can be rebuilt with a TLS client certificate.
    Options(ClientOptions),
    /// A client configured by the application. It is used as-is.
    Prebuilt(reqwest::Client),
}

/// Tunables for the HTTP clients created by this crate.
#[derive(Clone, Debug, Default)]
pub struct ClientOptions {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The timeout for each request, from connecting until the body is read.
    pub fn with_timeout(mut self, v: Duration) -> Self {
        self.timeout = Some(v);
        self
    }

    pub fn with_connect_timeout(mut self, v: Duration) -> Self {
        self.connect_timeout = Some(v);
        self
    }

    /// How long idle connections are kept in the pool.
    pub fn with_pool_idle_timeout(mut self, v: Duration) -> Self {
        self.pool_idle_timeout = Some(v);
        self
    }

    pub fn with_user_agent<T: Into<String>>(mut self, v: T) -> Self {
        self.user_agent = Some(v.into());
        self
    }

    pub(crate) fn build(&self, identity: Option<&reqwest::Identity>) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(v) = self.timeout {
            builder = builder.timeout(v);
        }
        if let Some(v) = self.connect_timeout {
            builder = builder.connect_timeout(v);
        }
        if let Some(v) = self.pool_idle_timeout {
            builder = builder.pool_idle_timeout(v);
        }
        if let Some(v) = &self.user_agent {
            builder = builder.user_agent(v.as_str());
        }
        if let Some(v) = identity {
            builder = builder.identity(v.clone());
        }
        builder.build().map_err(Error::configuration)
    }
}

/// A TLS client certificate and its private key.
#[derive(Clone)]
pub struct TlsAuth {
    identity: reqwest::Identity,
}

impl TlsAuth {
    /// Parses a PEM encoded certificate chain and private key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the certificate or the key are
    /// missing or malformed.
    pub fn from_pem(certificate: &[u8], private_key: &[u8]) -> Result<Self> {
        let certs = CertificateDer::pem_slice_iter(certificate)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::configuration(format!("cannot parse TLS certificate: {e}")))?;
        if certs.is_empty() {
            return Err(Error::configuration(
                "no certificate found in the TLS certificate PEM",
            ));
        }
        PrivateKeyDer::from_pem_slice(private_key)
            .map_err(|e| Error::configuration(format!("cannot parse TLS private key: {e}")))?;

        let mut pem = certificate.to_vec();
        if !pem.ends_with(b"\n") {
            pem.push(b'\n');
        }
        pem.extend_from_slice(private_key);
        let identity = reqwest::Identity::from_pem(&pem).map_err(Error::configuration)?;
        Ok(Self { identity })
    }
}

impl std::fmt::Debug for TlsAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsAuth")
            .field("identity", &"[censored]")
            .finish()
    }
}

/// Returns an HTTP client that presents `tls` during the TLS handshake.
///
/// The client is rebuilt from the context's [ClientOptions], so timeouts and
/// other tunables carry over. A prebuilt client cannot be modified.
pub(crate) fn attach_client_certificate(ctx: &Context, tls: &TlsAuth) -> Result<reqwest::Client> {
    match ctx.client_config() {
        HttpClient::Options(options) => options.build(Some(&tls.identity)),
        HttpClient::Prebuilt(_) => Err(Error::configuration(
            "mutual TLS requires an HTTP client built from `ClientOptions`, the context holds a prebuilt `reqwest::Client`",
        )),
    }
}

/// Returns the client for a token request, with the TLS identity if any.
pub(crate) fn client_for(ctx: &Context, tls: Option<&TlsAuth>) -> Result<reqwest::Client> {
    match tls {
        Some(tls) => attach_client_certificate(ctx, tls),
        None => ctx.http_client(),
    }
}
