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

/// How the client credentials are presented to the token endpoint.
///
/// See [RFC 6749 section 2.3] for the password based styles, [RFC 7523] for
/// private key JWTs, and [RFC 8705] for mutual TLS.
///
/// [RFC 6749 section 2.3]: https://www.rfc-editor.org/rfc/rfc6749#section-2.3
/// [RFC 7523]: https://www.rfc-editor.org/rfc/rfc7523
/// [RFC 8705]: https://www.rfc-editor.org/rfc/rfc8705
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AuthStyle {
    /// Try [InHeader][AuthStyle::InHeader] first and fall back to
    /// [InParams][AuthStyle::InParams]. The style that works is remembered
    /// for the token URL.
    #[default]
    AutoDetect,
    /// HTTP Basic authentication with the client id and secret.
    InHeader,
    /// `client_id` and `client_secret` form parameters.
    InParams,
    /// A signed `client_assertion`.
    PrivateKeyJwt,
    /// A TLS client certificate, with the `client_id` form parameter.
    Mtls,
}

/// The endpoints of an OAuth 2.0 authorization server.
///
/// # Example
/// ```
/// # use google_cloud_oauth2::endpoint::{AuthStyle, Endpoint};
/// let endpoint = Endpoint::new(
///     "https://provider.example.com/o/oauth2/auth",
///     "https://provider.example.com/token",
/// )
/// .with_auth_style(AuthStyle::InParams);
/// assert_eq!(endpoint.token_url(), "https://provider.example.com/token");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Endpoint {
    auth_url: String,
    token_url: String,
    device_auth_url: Option<String>,
    auth_style: AuthStyle,
}

impl Endpoint {
    pub fn new<A: Into<String>, T: Into<String>>(auth_url: A, token_url: T) -> Self {
        Self {
            auth_url: auth_url.into(),
            token_url: token_url.into(),
            device_auth_url: None,
            auth_style: AuthStyle::default(),
        }
    }

    /// Sets the device authorization URL ([RFC 8628]).
    ///
    /// [RFC 8628]: https://www.rfc-editor.org/rfc/rfc8628
    pub fn with_device_auth_url<T: Into<String>>(mut self, v: T) -> Self {
        self.device_auth_url = Some(v.into());
        self
    }

    pub fn with_auth_style(mut self, v: AuthStyle) -> Self {
        self.auth_style = v;
        self
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn device_auth_url(&self) -> Option<&str> {
        self.device_auth_url.as_deref()
    }

    pub fn auth_style(&self) -> AuthStyle {
        self.auth_style
    }
}
