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

//! The environment used by token sources to perform network calls.

use crate::Result;
use crate::errors::Error;
use crate::transport::{ClientOptions, HttpClient};
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Carries the HTTP client, a deadline, and a cancellation signal.
///
/// Every network request, file read, and subprocess started by this crate
/// runs under a `Context`. When the deadline expires the operation fails with
/// a timeout error. When the cancellation token is cancelled the operation
/// fails with a cancelled error, and any subprocess is terminated.
///
/// Token sources capture the `Context` given to their builders and use it
/// for every refresh.
///
/// # Example
/// ```
/// # use google_cloud_oauth2::context::Context;
/// # use google_cloud_oauth2::transport::ClientOptions;
/// # use std::time::Duration;
/// let ctx = Context::new()
///     .with_client_options(ClientOptions::new().with_timeout(Duration::from_secs(10)));
/// ```
#[derive(Clone, Debug)]
pub struct Context {
    client: HttpClient,
    // Built from `client` on first use and shared by all clones.
    built: Arc<OnceLock<reqwest::Client>>,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            client: HttpClient::Options(ClientOptions::default()),
            built: Arc::new(OnceLock::new()),
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a pre-configured `reqwest::Client` for all requests.
    ///
    /// A pre-configured client cannot be extended with a TLS client
    /// certificate. Use [with_client_options][Context::with_client_options]
    /// with mutual TLS.
    pub fn with_http_client(mut self, v: reqwest::Client) -> Self {
        self.client = HttpClient::Prebuilt(v);
        self.built = Arc::new(OnceLock::new());
        self
    }

    /// Builds the HTTP client from `options`.
    pub fn with_client_options(mut self, v: ClientOptions) -> Self {
        self.client = HttpClient::Options(v);
        self.built = Arc::new(OnceLock::new());
        self
    }

    /// Operations that have not completed by `v` fail with a timeout.
    pub fn with_deadline(mut self, v: Instant) -> Self {
        self.deadline = Some(v);
        self
    }

    /// Sets the deadline to `now + v`.
    pub fn with_timeout(self, v: Duration) -> Self {
        self.with_deadline(Instant::now() + v)
    }

    /// Operations fail when `v` is cancelled.
    pub fn with_cancellation_token(mut self, v: CancellationToken) -> Self {
        self.cancel = v;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn client_config(&self) -> &HttpClient {
        &self.client
    }

    /// Returns the client for requests without a TLS client certificate.
    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        if let Some(client) = self.built.get() {
            return Ok(client.clone());
        }
        let client = match &self.client {
            HttpClient::Prebuilt(c) => c.clone(),
            HttpClient::Options(o) => o.build(None)?,
        };
        // Losing the race just means another clone built the same client.
        let _ = self.built.set(client.clone());
        Ok(client)
    }

    /// Runs `operation` observing the deadline and the cancellation token.
    pub(crate) async fn run<F, T>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, operation)
                    .await
                    .map_err(Error::timeout)?,
                None => operation.await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::cancelled()),
            result = bounded => result,
        }
    }
}
