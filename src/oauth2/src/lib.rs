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

//! OAuth 2.0 token lifecycle for Rust applications.
//!
//! **WARNING:** this crate is under active development. We expect multiple
//! breaking changes in the upcoming releases. We welcome feedback about the
//! APIs, documentation, missing features, bugs, etc.
//!
//! This crate obtains, caches, and refreshes OAuth 2.0 access tokens:
//!
//! - The [authorization code][config] flow with [PKCE][pkce], token refresh,
//!   and the resource owner password flow.
//! - The [client credentials][client_credentials] flow.
//! - Client authentication with the client secret (in the `Authorization`
//!   header or in the request body), [private key JWTs][jwt_assertion], or
//!   [mutual TLS][transport].
//! - [Token caching][token_cache], where concurrent callers share a single
//!   refresh.
//! - Google [external accounts][external_account], exchanging third party
//!   tokens at the Security Token Service and optionally impersonating a
//!   service account.
//!
//! All network operations take their HTTP client, deadline, and
//! cancellation token from a [Context][context::Context].

pub mod errors;

/// An ordered multimap for form bodies and query strings.
pub mod values;

/// The token and authorization endpoints of a provider.
pub mod endpoint;

pub(crate) mod client_auth;

pub mod jwt_assertion;

pub mod transport;

pub mod context;

pub mod pkce;

/// Extra parameters for authorization URLs and token exchanges.
pub mod options;

pub mod token;

pub(crate) mod token_request;

/// Caches tokens until they expire.
pub mod token_cache;

pub mod config;

pub mod client_credentials;

pub mod authorized;

pub mod sts_exchange;

pub mod external_account;

pub(crate) mod constants;

/// A `Result` alias where the `Err` case is [errors::Error].
pub type Result<T> = std::result::Result<T, errors::Error>;
