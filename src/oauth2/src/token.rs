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

//! Types and functions to work with OAuth 2.0 tokens.

use crate::Result;
use crate::errors::Error;
use http::HeaderValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

/// Tokens are considered expired this long before their actual expiration.
///
/// Clock skew and the time needed to send a request would otherwise let an
/// almost expired token reach the server after it expired.
pub const DEFAULT_EXPIRY_DELTA: Duration = Duration::from_secs(10);

/// Represents an OAuth 2.0 token.
#[derive(Clone, Default, PartialEq)]
pub struct Token {
    /// The token presented to resource servers.
    pub access_token: String,

    /// The type of the token, compared case-insensitively.
    ///
    /// An empty type is treated as `"Bearer"`.
    pub token_type: String,

    /// Used to obtain new access tokens, if the server issued one.
    pub refresh_token: Option<String>,

    /// When the access token expires.
    ///
    /// If `None`, the token does not expire.
    pub expiry: Option<OffsetDateTime>,

    /// Overrides [DEFAULT_EXPIRY_DELTA] for this token.
    pub expiry_delta: Option<Duration>,

    /// Every field in the token response, including the standard ones.
    ///
    /// Providers return additional fields such as `id_token` or `scope`.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Token {
    /// The token type with the usual capitalization.
    ///
    /// Servers often return `"bearer"`, while resource servers expect
    /// `"Bearer"` in the `Authorization` header.
    pub fn normalized_type(&self) -> &str {
        let t = self.token_type.as_str();
        if t.is_empty() || t.eq_ignore_ascii_case("bearer") {
            return "Bearer";
        }
        if t.eq_ignore_ascii_case("mac") {
            return "MAC";
        }
        if t.eq_ignore_ascii_case("basic") {
            return "Basic";
        }
        t
    }

    /// Returns a field from the token response.
    pub fn extra(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }

    /// The access token is non-empty and not about to expire.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(
            OffsetDateTime::now_utc(),
            self.expiry_delta.unwrap_or(DEFAULT_EXPIRY_DELTA),
        )
    }

    pub(crate) fn is_valid_at(&self, now: OffsetDateTime, delta: Duration) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match self.expiry {
            None => true,
            Some(expiry) => expiry > now + delta,
        }
    }

    /// The value for the `Authorization` header.
    pub fn authorization_header(&self) -> Result<HeaderValue> {
        let mut value =
            HeaderValue::from_str(&format!("{} {}", self.normalized_type(), self.access_token))
                .map_err(Error::invalid_response)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[censored]")
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[censored]"),
            )
            .field("expiry", &self.expiry)
            .field("expiry_delta", &self.expiry_delta)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Produces tokens.
///
/// Implementations may perform a network request on each call. Wrap them in
/// a [ReuseTokenSource][crate::token_cache::ReuseTokenSource] to cache the
/// tokens until they expire.
#[async_trait::async_trait]
pub trait TokenSource: std::fmt::Debug + Send + Sync {
    async fn token(&self) -> Result<Token>;
}

#[async_trait::async_trait]
impl<T> TokenSource for Arc<T>
where
    T: TokenSource + ?Sized,
{
    async fn token(&self) -> Result<Token> {
        self.as_ref().token().await
    }
}

/// Always returns the same token, which is never refreshed.
#[derive(Clone, Debug)]
pub struct StaticTokenSource {
    token: Token,
}

impl StaticTokenSource {
    pub fn new(token: Token) -> Self {
        Self { token }
    }
}

#[async_trait::async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<Token> {
        Ok(self.token.clone())
    }
}
