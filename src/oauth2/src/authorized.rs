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

//! Sends requests with tokens from a [TokenSource].

use crate::Result;
use crate::context::Context;
use crate::errors::Error;
use crate::token::TokenSource;
use http::header::AUTHORIZATION;
use std::sync::Arc;

/// An HTTP client that adds an `Authorization` header to each request.
///
/// The token is obtained from the token source right before the request is
/// sent, so wrapping a refreshing source keeps the requests authorized
/// indefinitely.
///
/// # Example
/// ```no_run
/// # use google_cloud_oauth2::authorized::AuthorizedClient;
/// # use google_cloud_oauth2::token::{StaticTokenSource, Token};
/// # async fn sample() -> google_cloud_oauth2::Result<()> {
/// let token = Token { access_token: "abc".into(), ..Default::default() };
/// let client = AuthorizedClient::new(reqwest::Client::new(), StaticTokenSource::new(token));
/// let builder = client.builder(reqwest::Method::GET, "https://api.example.com/v1/items");
/// let response = client.execute(builder).await?;
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct AuthorizedClient {
    client: reqwest::Client,
    source: Arc<dyn TokenSource>,
}

impl AuthorizedClient {
    pub fn new<T>(client: reqwest::Client, source: T) -> Self
    where
        T: TokenSource + 'static,
    {
        Self {
            client,
            source: Arc::new(source),
        }
    }

    pub(crate) fn from_context(ctx: &Context, source: Arc<dyn TokenSource>) -> Result<Self> {
        Ok(Self {
            client: ctx.http_client()?,
            source,
        })
    }

    /// Starts a request. Send it with [execute][AuthorizedClient::execute].
    pub fn builder<U: reqwest::IntoUrl>(
        &self,
        method: reqwest::Method,
        url: U,
    ) -> reqwest::RequestBuilder {
        self.client.request(method, url)
    }

    /// Adds the `Authorization` header and sends the request.
    ///
    /// Any `Authorization` header already in the request is replaced.
    /// Responses are returned as-is, including error statuses.
    pub async fn execute(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let token = self.source.token().await?;
        let mut request = builder.build().map_err(Error::configuration)?;
        request
            .headers_mut()
            .insert(AUTHORIZATION, token.authorization_header()?);
        self.client
            .execute(request)
            .await
            .map_err(Error::from_http)
    }

    pub fn token_source(&self) -> &Arc<dyn TokenSource> {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tests::{MockTokenSource, test_token};
    use httptest::matchers::{all_of, contains, request};
    use httptest::responders::status_code;
    use httptest::{Expectation, Server};

    #[tokio::test]
    async fn adds_authorization() -> anyhow::Result<()> {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/v1/items"),
                request::headers(contains(("authorization", "Bearer abc"))),
            ])
            .respond_with(status_code(200).body("ok")),
        );

        let mut mock = MockTokenSource::new();
        mock.expect_token()
            .times(1)
            .returning(|| Ok(test_token("abc", None)));
        let client = AuthorizedClient::new(reqwest::Client::new(), mock);
        let builder = client
            .builder(reqwest::Method::GET, server.url("/v1/items").to_string())
            .header(AUTHORIZATION, "Bearer replaced");
        let response = client.execute(builder).await?;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await?, "ok");
        Ok(())
    }

    #[tokio::test]
    async fn token_error() {
        let mut mock = MockTokenSource::new();
        mock.expect_token()
            .times(1)
            .returning(|| Err(Error::configuration("no refresh token")));
        let client = AuthorizedClient::new(reqwest::Client::new(), mock);
        let builder = client.builder(reqwest::Method::GET, "http://127.0.0.1:1/unused");
        let err = client.execute(builder).await.unwrap_err();
        assert!(err.is_configuration(), "{err:?}");
    }
}
