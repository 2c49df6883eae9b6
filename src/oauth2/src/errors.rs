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

//! Errors returned while building token sources and obtaining tokens.

use bytes::Bytes;
use http::StatusCode;
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for token sources and their builders.
///
/// The type is opaque, use the `is_*()` predicates to discriminate between
/// the different kinds of failures. Errors are cheap to clone, a failed
/// refresh hands the same error to every caller waiting on it.
#[derive(thiserror::Error, Clone, Debug)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    /// The configuration is invalid.
    ///
    /// Malformed keys, disallowed endpoints, unsupported algorithms, missing
    /// fields, and similar problems. Retrying will not help.
    pub fn is_configuration(&self) -> bool {
        matches!(self.0, ErrorKind::Configuration(_))
    }

    /// The token endpoint (or the impersonation endpoint) rejected the request.
    ///
    /// Use [as_retrieve()][Error::as_retrieve] to examine the response.
    pub fn is_retrieve(&self) -> bool {
        matches!(self.0, ErrorKind::Retrieve(_))
    }

    /// The server returned a successful response that could not be used.
    pub fn is_invalid_response(&self) -> bool {
        matches!(self.0, ErrorKind::InvalidResponse(_))
    }

    /// The deadline expired before the operation completed.
    pub fn is_timeout(&self) -> bool {
        matches!(self.0, ErrorKind::Timeout(_))
    }

    /// The operation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.0, ErrorKind::Cancelled)
    }

    /// A subject token source failed, or a request never got a response.
    ///
    /// Includes connection failures, unreadable files, executables that
    /// could not be started or exited with an error, and similar problems.
    pub fn is_source(&self) -> bool {
        matches!(self.0, ErrorKind::Source(_))
    }

    /// An executable reported a failure with a well-formed code and message.
    pub fn is_user_defined(&self) -> bool {
        matches!(self.0, ErrorKind::UserDefined { .. })
    }

    /// Signing, random number generation, or a similar local facility failed.
    pub fn is_internal(&self) -> bool {
        matches!(self.0, ErrorKind::Internal(_))
    }

    /// Returns `true` if a future attempt may succeed.
    ///
    /// The library never retries on its own. Applications may use this
    /// predicate to decide whether to retry with backoff.
    pub fn is_transient(&self) -> bool {
        match &self.0 {
            ErrorKind::Timeout(_) => true,
            ErrorKind::Retrieve(e) => is_retryable(e.status),
            _ => false,
        }
    }

    /// Returns the details of a rejected token request.
    pub fn as_retrieve(&self) -> Option<&RetrieveError> {
        match &self.0 {
            ErrorKind::Retrieve(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the `(code, message)` pair reported by an executable.
    pub fn user_defined(&self) -> Option<(&str, &str)> {
        match &self.0 {
            ErrorKind::UserDefined { code, message } => Some((code, message)),
            _ => None,
        }
    }

    /// Creates an error for a failure in application provided code.
    ///
    /// Subject token and AWS credential suppliers use this to report their
    /// failures. The error is classified as a [source][Error::is_source]
    /// error.
    pub fn from_source<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error::source(source)
    }

    pub(crate) fn configuration<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::Configuration(Arc::from(source.into())))
    }

    pub(crate) fn retrieve(error: RetrieveError) -> Error {
        Error(ErrorKind::Retrieve(error))
    }

    pub(crate) fn invalid_response<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::InvalidResponse(Arc::from(source.into())))
    }

    pub(crate) fn timeout<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::Timeout(Arc::from(source.into())))
    }

    pub(crate) fn cancelled() -> Error {
        Error(ErrorKind::Cancelled)
    }

    pub(crate) fn source<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::Source(Arc::from(source.into())))
    }

    pub(crate) fn user_defined_failure<C, M>(code: C, message: M) -> Error
    where
        C: Into<String>,
        M: Into<String>,
    {
        Error(ErrorKind::UserDefined {
            code: code.into(),
            message: message.into(),
        })
    }

    pub(crate) fn internal<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::Internal(Arc::from(source.into())))
    }

    /// Classifies a `reqwest` failure, mostly for requests that never got a
    /// response.
    pub(crate) fn from_http(error: reqwest::Error) -> Error {
        if error.is_timeout() {
            return Error::timeout(error);
        }
        if error.is_builder() {
            return Error::configuration(error);
        }
        Error::source(error)
    }
}

#[derive(thiserror::Error, Clone, Debug)]
enum ErrorKind {
    #[error("invalid configuration: {0}")]
    Configuration(#[source] SharedError),
    #[error(transparent)]
    Retrieve(RetrieveError),
    #[error("invalid token response: {0}")]
    InvalidResponse(#[source] SharedError),
    #[error("deadline exceeded: {0}")]
    Timeout(#[source] SharedError),
    #[error("the operation was cancelled")]
    Cancelled,
    #[error("the request or the credential source failed: {0}")]
    Source(#[source] SharedError),
    #[error("executable reported an unsuccessful response, code=<{code}>, message=<{message}>")]
    UserDefined { code: String, message: String },
    #[error("internal error: {0}")]
    Internal(#[source] SharedError),
}

/// A token request rejected by the authorization server.
///
/// The raw body is always preserved. The OAuth 2.0 error fields are populated
/// when the body follows [RFC 6749 section 5.2].
///
/// [RFC 6749 section 5.2]: https://www.rfc-editor.org/rfc/rfc6749#section-5.2
#[derive(Clone, Debug)]
pub struct RetrieveError {
    status: StatusCode,
    content_type: Option<String>,
    body: Bytes,
    error_code: Option<String>,
    error_description: Option<String>,
    error_uri: Option<String>,
}

impl RetrieveError {
    pub(crate) fn new(status: StatusCode, content_type: Option<String>, body: Bytes) -> Self {
        Self {
            status,
            content_type,
            body,
            error_code: None,
            error_description: None,
            error_uri: None,
        }
    }

    pub(crate) fn with_oauth_fields(
        mut self,
        error_code: Option<String>,
        error_description: Option<String>,
        error_uri: Option<String>,
    ) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        self.error_code = non_empty(error_code);
        self.error_description = non_empty(error_description);
        self.error_uri = non_empty(error_uri);
        self
    }

    /// The HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The `Content-Type` of the response, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The response body, truncated to 1 MiB.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The `error` field.
    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    /// The `error_description` field.
    pub fn error_description(&self) -> Option<&str> {
        self.error_description.as_deref()
    }

    /// The `error_uri` field.
    pub fn error_uri(&self) -> Option<&str> {
        self.error_uri.as_deref()
    }
}

impl std::fmt::Display for RetrieveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(code) = &self.error_code {
            write!(f, "oauth2: {code:?}")?;
            if let Some(description) = &self.error_description {
                write!(f, " {description:?}")?;
            }
            if let Some(uri) = &self.error_uri {
                write!(f, " {uri:?}")?;
            }
            return write!(
                f,
                ", status={}, response=<{}>",
                self.status,
                String::from_utf8_lossy(&self.body)
            );
        }
        write!(
            f,
            "oauth2: cannot fetch token: {}, response=<{}>",
            self.status,
            String::from_utf8_lossy(&self.body)
        )
    }
}

impl std::error::Error for RetrieveError {}

pub(crate) fn is_retryable(c: StatusCode) -> bool {
    match c {
        // Internal server errors do not indicate that there is anything wrong
        // with our request, so we retry them.
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::REQUEST_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS => true,
        _ => false,
    }
}
