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
use crate::errors::Error;
use crate::token::{DEFAULT_EXPIRY_DELTA, Token, TokenSource};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;

type Refresh = Shared<BoxFuture<'static, Result<Token>>>;

/// Caches the token from another [TokenSource] until it expires.
///
/// Concurrent callers that find the cached token expired share a single
/// call to the underlying source, and all of them receive its result. Errors
/// are returned to the callers waiting on that call but never cached: the
/// next call starts a new refresh.
///
/// # Example
/// ```
/// # use google_cloud_oauth2::token::{StaticTokenSource, Token, TokenSource};
/// # use google_cloud_oauth2::token_cache::ReuseTokenSource;
/// # tokio_test::block_on(async {
/// let token = Token { access_token: "abc".into(), ..Default::default() };
/// let source = ReuseTokenSource::new(None, StaticTokenSource::new(token));
/// assert_eq!(source.token().await?.access_token, "abc");
/// # Ok::<(), google_cloud_oauth2::errors::Error>(())
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct ReuseTokenSource {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    source: Arc<dyn TokenSource>,
    expiry_delta: Option<Duration>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    current: Option<Token>,
    // The refresh in progress, if any.
    pending: Option<Refresh>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("current", &self.current)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

impl ReuseTokenSource {
    /// Returns `initial` while it is valid, then tokens from `source`.
    pub fn new<T>(initial: Option<Token>, source: T) -> Self
    where
        T: TokenSource + 'static,
    {
        Self::build(initial, Arc::new(source), None)
    }

    /// Like [new][ReuseTokenSource::new], but tokens are refreshed
    /// `expiry_delta` before they expire, instead of
    /// [DEFAULT_EXPIRY_DELTA].
    pub fn with_early_expiry<T>(initial: Option<Token>, source: T, expiry_delta: Duration) -> Self
    where
        T: TokenSource + 'static,
    {
        Self::build(initial, Arc::new(source), Some(expiry_delta))
    }

    pub(crate) fn build(
        initial: Option<Token>,
        source: Arc<dyn TokenSource>,
        expiry_delta: Option<Duration>,
    ) -> Self {
        let state = State {
            current: initial,
            pending: None,
        };
        Self {
            inner: Arc::new(Inner {
                source,
                expiry_delta,
                state: Mutex::new(state),
            }),
        }
    }

    fn is_valid(&self, token: &Token) -> bool {
        let delta = self
            .inner
            .expiry_delta
            .or(token.expiry_delta)
            .unwrap_or(DEFAULT_EXPIRY_DELTA);
        token.is_valid_at(OffsetDateTime::now_utc(), delta)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        self.inner
            .state
            .lock()
            .map_err(|e| Error::internal(format!("token cache lock poisoned: {e}")))
    }

    // Returns the cached token, or joins (or starts) a refresh.
    fn cached_or_refresh(&self) -> Result<std::result::Result<Token, Refresh>> {
        let mut state = self.lock()?;
        if let Some(token) = state.current.as_ref().filter(|t| self.is_valid(t)) {
            return Ok(Ok(token.clone()));
        }
        if let Some(pending) = &state.pending {
            return Ok(Err(pending.clone()));
        }
        let source = self.inner.source.clone();
        let refresh = async move { source.token().await }.boxed().shared();
        state.pending = Some(refresh.clone());
        Ok(Err(refresh))
    }

    fn with_delta(&self, mut token: Token) -> Token {
        if self.inner.expiry_delta.is_some() {
            token.expiry_delta = self.inner.expiry_delta;
        }
        token
    }
}

#[async_trait::async_trait]
impl TokenSource for ReuseTokenSource {
    async fn token(&self) -> Result<Token> {
        let refresh = match self.cached_or_refresh()? {
            Ok(token) => return Ok(self.with_delta(token)),
            Err(refresh) => refresh,
        };
        let result = refresh.clone().await;

        let mut state = self.lock()?;
        // Only the first waiter to finish clears the refresh.
        if state.pending.as_ref().is_some_and(|p| p.ptr_eq(&refresh)) {
            state.pending = None;
            if let Ok(token) = &result {
                state.current = Some(token.clone());
            }
        }
        result.map(|t| self.with_delta(t))
    }
}
