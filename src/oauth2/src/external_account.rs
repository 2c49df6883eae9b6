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

//! [Workload identity federation] with external account configurations.
//!
//! An external account exchanges a token issued by a third party identity
//! provider (the *subject token*) for a Google access token, using the
//! Security Token Service ([RFC 8693]). Optionally the resulting token is
//! used to impersonate a service account.
//!
//! The subject token comes from one of:
//! - a file, usually refreshed by some agent,
//! - a local URL, such as the Azure instance metadata service,
//! - AWS credentials, used to sign a `GetCallerIdentity` request,
//! - an executable, which must be explicitly allowed,
//! - the application, through a [SubjectTokenSupplier] or an
//!   [AwsSecurityCredentialsSupplier].
//!
//! [Workload identity federation]: https://cloud.google.com/iam/docs/workload-identity-federation
//! [RFC 8693]: https://datatracker.ietf.org/doc/html/rfc8693

mod aws_signer;
mod aws_sourced;
mod executable_sourced;
mod file_sourced;
mod impersonate;
mod programmatic_sourced;
mod url_sourced;
mod url_validation;

pub use aws_signer::AwsSecurityCredentials;
pub use programmatic_sourced::{
    AwsSecurityCredentialsSupplier, SubjectTokenSupplier, SupplierOptions,
};

use crate::Result;
use crate::authorized::AuthorizedClient;
use crate::constants::CLOUD_PLATFORM_SCOPE;
use crate::context::Context;
use crate::errors::Error;
use crate::sts_exchange::{
    ClientAuthStyle, ClientAuthentication, ExchangeTokenRequest, exchange_token,
};
use crate::token::{Token, TokenSource};
use crate::token_cache::ReuseTokenSource;
use crate::token_request::expiry_after;
use aws_sourced::{
    AwsProvider, AwsSourcedCredentials, DEFAULT_REGIONAL_CRED_VERIFICATION_URL, MetadataEndpoints,
};
use executable_sourced::{ExecutableConfig, ExecutableSourcedCredentials};
use file_sourced::FileSourcedCredentials;
use programmatic_sourced::ProgrammaticSourcedCredentials;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use time::OffsetDateTime;
use url_sourced::UrlSourcedCredentials;
use url_validation::UrlPolicy;

const DEFAULT_TOKEN_URL: &str = "https://sts.googleapis.com/v1/token";
const EXTERNAL_ACCOUNT_TYPE: &str = "external_account";

static WORKFORCE_AUDIENCE: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"//iam\.googleapis\.com/locations/[^/]+/workforcePools/"));

fn is_workforce_audience(audience: &str) -> Result<bool> {
    WORKFORCE_AUDIENCE
        .as_ref()
        .map(|r| r.is_match(audience))
        .map_err(|e| Error::internal(e.to_string()))
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

/// How a file or URL subject token is encoded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum SubjectTokenFormat {
    /// The content is the token.
    #[default]
    Text,
    /// The token is the named string field of a JSON object.
    Json(String),
}

impl SubjectTokenFormat {
    pub(crate) fn extract(&self, content: &str) -> Result<String> {
        let field = match self {
            Self::Text => return Ok(content.to_string()),
            Self::Json(field) => field,
        };
        let value = serde_json::from_str::<Value>(content)
            .map_err(|e| Error::source(format!("cannot parse the subject token as JSON: {e}")))?;
        match value.get(field) {
            Some(Value::String(token)) => Ok(token.clone()),
            Some(_) => Err(Error::source(format!(
                "the subject token field `{field}` is not a string"
            ))),
            None => Err(Error::source(format!(
                "the subject token field `{field}` is missing"
            ))),
        }
    }
}

#[derive(Deserialize)]
struct ExternalAccountFile {
    #[serde(rename = "type")]
    config_type: Option<String>,
    audience: String,
    subject_token_type: String,
    token_url: Option<String>,
    service_account_impersonation_url: Option<String>,
    service_account_impersonation: Option<ImpersonationFile>,
    client_id: Option<String>,
    client_secret: Option<String>,
    scopes: Option<Vec<String>>,
    workforce_pool_user_project: Option<String>,
    credential_source: CredentialSourceFile,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ImpersonationFile {
    token_lifetime_seconds: Option<u64>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CredentialSourceFile {
    file: Option<String>,
    url: Option<String>,
    headers: BTreeMap<String, String>,
    format: Option<FormatFile>,
    environment_id: Option<String>,
    region_url: Option<String>,
    regional_cred_verification_url: Option<String>,
    imdsv2_session_token_url: Option<String>,
    executable: Option<ExecutableConfig>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct FormatFile {
    #[serde(rename = "type")]
    format_type: Option<String>,
    subject_token_field_name: Option<String>,
}

impl FormatFile {
    fn into_format(self) -> Result<SubjectTokenFormat> {
        match self.format_type.as_deref().unwrap_or_default() {
            "" | "text" => Ok(SubjectTokenFormat::Text),
            "json" => non_empty(self.subject_token_field_name)
                .map(SubjectTokenFormat::Json)
                .ok_or_else(|| {
                    Error::configuration(
                        "the json credential source format requires `subject_token_field_name`",
                    )
                }),
            t => Err(Error::configuration(format!(
                "unsupported credential source format `{t}`"
            ))),
        }
    }
}

impl CredentialSourceFile {
    fn into_source(self, policy: UrlPolicy) -> Result<CredentialSource> {
        let environment_id = non_empty(self.environment_id);
        let executable = self.executable;
        let file = non_empty(self.file);
        let url = non_empty(self.url);

        // AWS sources use `url` for the metadata server.
        let is_aws = environment_id.is_some();
        let populated = [
            ("environment_id", is_aws),
            ("executable", executable.is_some()),
            ("file", file.is_some()),
            ("url", url.is_some() && !is_aws),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect::<Vec<_>>();
        match populated.len() {
            0 => {
                return Err(Error::configuration(
                    "the credential source needs one of `environment_id`, `executable`, `file` or `url`",
                ));
            }
            1 => {}
            _ => {
                return Err(Error::configuration(format!(
                    "the credential source must have a single source, found {}",
                    populated.join(", ")
                )));
            }
        }

        if let Some(environment_id) = environment_id {
            aws_sourced::validate_environment_id(&environment_id)?;
            let endpoints = MetadataEndpoints {
                region_url: non_empty(self.region_url),
                url,
                imdsv2_session_token_url: non_empty(self.imdsv2_session_token_url),
            };
            endpoints.validate(policy)?;
            return Ok(CredentialSource::Aws(AwsSourcedCredentials {
                regional_cred_verification_url: non_empty(self.regional_cred_verification_url)
                    .unwrap_or_else(|| DEFAULT_REGIONAL_CRED_VERIFICATION_URL.to_string()),
                provider: AwsProvider::Environment(endpoints),
            }));
        }
        if let Some(executable) = executable {
            return ExecutableSourcedCredentials::new(executable).map(CredentialSource::Executable);
        }
        let format = self.format.unwrap_or_default().into_format()?;
        match (file, url) {
            (Some(file), _) => Ok(CredentialSource::File(FileSourcedCredentials { file, format })),
            (None, Some(url)) => Ok(CredentialSource::Url(UrlSourcedCredentials {
                url,
                headers: self.headers,
                format,
            })),
            (None, None) => Err(Error::internal("credential source without a variant")),
        }
    }
}

#[derive(Debug)]
enum CredentialSource {
    File(FileSourcedCredentials),
    Url(UrlSourcedCredentials),
    Aws(AwsSourcedCredentials),
    Executable(ExecutableSourcedCredentials),
    Programmatic(ProgrammaticSourcedCredentials),
}

impl CredentialSource {
    async fn subject_token(
        &self,
        ctx: &Context,
        options: &SupplierOptions,
        impersonation_url: Option<&str>,
    ) -> Result<String> {
        match self {
            Self::File(source) => source.subject_token(ctx).await,
            Self::Url(source) => source.subject_token(ctx).await,
            Self::Aws(source) => source.subject_token(ctx, options).await,
            Self::Executable(source) => {
                source
                    .subject_token(ctx, options, impersonation_url)
                    .await
            }
            Self::Programmatic(source) => source.subject_token(ctx, options).await,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Url(_) => "url",
            Self::Aws(_) => "aws",
            Self::Executable(_) => "executable",
            Self::Programmatic(_) => "programmatic",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Impersonation {
    url: String,
    lifetime: Duration,
}

#[derive(Clone, PartialEq)]
struct Settings {
    audience: String,
    subject_token_type: String,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    scopes: Vec<String>,
    impersonation: Option<Impersonation>,
    workforce_pool_user_project: Option<String>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("audience", &self.audience)
            .field("subject_token_type", &self.subject_token_type)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[censored]"))
            .field("scopes", &self.scopes)
            .field("impersonation", &self.impersonation)
            .field("workforce_pool_user_project", &self.workforce_pool_user_project)
            .finish()
    }
}

impl Settings {
    fn validate(&self, policy: UrlPolicy) -> Result<()> {
        if self.audience.is_empty() {
            return Err(Error::configuration("the `audience` is required"));
        }
        if self.subject_token_type.is_empty() {
            return Err(Error::configuration("the `subject_token_type` is required"));
        }
        policy.validate_token_url(&self.token_url)?;
        if let Some(impersonation) = &self.impersonation {
            policy.validate_impersonation_url(&impersonation.url)?;
        }
        if self.workforce_pool_user_project.is_some() && !is_workforce_audience(&self.audience)? {
            return Err(Error::configuration(
                "`workforce_pool_user_project` should not be set for non-workforce pool credentials",
            ));
        }
        Ok(())
    }

    fn sts_options(&self) -> Option<HashMap<String, String>> {
        // The client id is enough to find the user project.
        if self.client_id.is_some() {
            return None;
        }
        self.workforce_pool_user_project
            .as_ref()
            .map(|p| HashMap::from([("userProject".to_string(), p.clone())]))
    }
}

fn scopes_or_default(scopes: Option<Vec<String>>) -> Vec<String> {
    scopes
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| vec![CLOUD_PLATFORM_SCOPE.to_string()])
}

/// Builds an external account [Config] from its JSON [configuration file].
///
/// # Example
/// ```
/// # use google_cloud_oauth2::external_account::Builder;
/// # fn sample() -> google_cloud_oauth2::Result<()> {
/// let provider = "//iam.googleapis.com/projects/123/locations/global/workloadIdentityPools/my-pool/providers/my-provider";
/// let config = serde_json::json!({
///     "type": "external_account",
///     "audience": provider,
///     "subject_token_type": "urn:ietf:params:oauth:token-type:jwt",
///     "token_url": "https://sts.googleapis.com/v1/token",
///     "credential_source": {
///         "url": format!("http://169.254.169.254/metadata/identity/oauth2/token?api-version=2018-02-01&resource={provider}"),
///         "headers": { "Metadata": "True" },
///         "format": { "type": "json", "subject_token_field_name": "access_token" }
///     }
/// });
/// let config = Builder::new(config).build()?;
/// let source = config.token_source();
/// # Ok(()) }
/// ```
///
/// [configuration file]: https://google.aip.dev/auth/4117#configuration-file-generation-and-usage
pub struct Builder {
    config: Value,
    scopes: Option<Vec<String>>,
    impersonation_lifetime: Option<Duration>,
    context: Context,
    policy: UrlPolicy,
}

impl Builder {
    pub fn new(config: Value) -> Self {
        Self {
            config,
            scopes: None,
            impersonation_lifetime: None,
            context: Context::default(),
            policy: UrlPolicy::default(),
        }
    }

    /// Overrides the scopes in the configuration.
    ///
    /// Defaults to `https://www.googleapis.com/auth/cloud-platform`.
    pub fn with_scopes<I, S>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(v.into_iter().map(Into::into).collect());
        self
    }

    /// Overrides `service_account_impersonation.token_lifetime_seconds`.
    pub fn with_impersonation_lifetime(mut self, v: Duration) -> Self {
        self.impersonation_lifetime = Some(v);
        self
    }

    pub fn with_context(mut self, v: Context) -> Self {
        self.context = v;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_url_policy(mut self, v: UrlPolicy) -> Self {
        self.policy = v;
        self
    }

    /// Validates the configuration and returns the [Config].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the JSON is malformed, misses
    /// required fields, does not have exactly one credential source, or
    /// names endpoints outside the Google STS and IAM credentials hosts.
    pub fn build(self) -> Result<Config> {
        let file = serde_json::from_value::<ExternalAccountFile>(self.config).map_err(|e| {
            Error::configuration(format!("cannot parse the external account configuration: {e}"))
        })?;
        if let Some(t) = file.config_type.as_deref().filter(|t| *t != EXTERNAL_ACCOUNT_TYPE) {
            return Err(Error::configuration(format!(
                "unexpected configuration type `{t}`, expected `{EXTERNAL_ACCOUNT_TYPE}`"
            )));
        }
        let lifetime = self
            .impersonation_lifetime
            .or_else(|| {
                file.service_account_impersonation
                    .and_then(|i| i.token_lifetime_seconds)
                    .filter(|s| *s > 0)
                    .map(Duration::from_secs)
            })
            .unwrap_or(impersonate::DEFAULT_LIFETIME);
        let settings = Settings {
            audience: file.audience,
            subject_token_type: file.subject_token_type,
            token_url: non_empty(file.token_url).unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            client_id: non_empty(file.client_id),
            client_secret: non_empty(file.client_secret),
            scopes: scopes_or_default(self.scopes.or(file.scopes)),
            impersonation: non_empty(file.service_account_impersonation_url)
                .map(|url| Impersonation { url, lifetime }),
            workforce_pool_user_project: non_empty(file.workforce_pool_user_project),
        };
        settings.validate(self.policy)?;
        let source = file.credential_source.into_source(self.policy)?;
        Ok(Config::new(settings, source, self.context))
    }
}

enum Supplier {
    SubjectToken(Arc<dyn SubjectTokenSupplier>),
    Aws(Arc<dyn AwsSecurityCredentialsSupplier>),
}

/// Builds an external account [Config] where the application supplies the
/// subject token, or the AWS credentials used to create it.
///
/// # Example
/// ```
/// # use google_cloud_oauth2::context::Context;
/// # use google_cloud_oauth2::external_account::{ProgrammaticBuilder, SubjectTokenSupplier, SupplierOptions};
/// # use std::sync::Arc;
/// #[derive(Debug)]
/// struct MyTokenSupplier;
///
/// #[async_trait::async_trait]
/// impl SubjectTokenSupplier for MyTokenSupplier {
///     async fn subject_token(
///         &self,
///         _ctx: &Context,
///         _options: &SupplierOptions,
///     ) -> google_cloud_oauth2::Result<String> {
///         Ok("my-oidc-token".to_string())
///     }
/// }
///
/// # fn sample() -> google_cloud_oauth2::Result<()> {
/// let config = ProgrammaticBuilder::new(Arc::new(MyTokenSupplier))
///     .with_audience("//iam.googleapis.com/projects/123/locations/global/workloadIdentityPools/my-pool/providers/my-provider")
///     .with_subject_token_type("urn:ietf:params:oauth:token-type:jwt")
///     .build()?;
/// # Ok(()) }
/// ```
pub struct ProgrammaticBuilder {
    supplier: Supplier,
    audience: String,
    subject_token_type: String,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    scopes: Option<Vec<String>>,
    impersonation_url: Option<String>,
    impersonation_lifetime: Duration,
    workforce_pool_user_project: Option<String>,
    regional_cred_verification_url: String,
    context: Context,
    policy: UrlPolicy,
}

impl ProgrammaticBuilder {
    pub fn new(supplier: Arc<dyn SubjectTokenSupplier>) -> Self {
        Self::with_supplier(Supplier::SubjectToken(supplier))
    }

    /// The subject token is a signed AWS `GetCallerIdentity` request, using
    /// the region and credentials from `supplier`.
    pub fn from_aws_supplier(supplier: Arc<dyn AwsSecurityCredentialsSupplier>) -> Self {
        Self::with_supplier(Supplier::Aws(supplier))
    }

    fn with_supplier(supplier: Supplier) -> Self {
        Self {
            supplier,
            audience: String::new(),
            subject_token_type: String::new(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: None,
            client_secret: None,
            scopes: None,
            impersonation_url: None,
            impersonation_lifetime: impersonate::DEFAULT_LIFETIME,
            workforce_pool_user_project: None,
            regional_cred_verification_url: DEFAULT_REGIONAL_CRED_VERIFICATION_URL.to_string(),
            context: Context::default(),
            policy: UrlPolicy::default(),
        }
    }

    /// The workload or workforce pool provider. Required.
    pub fn with_audience<T: Into<String>>(mut self, v: T) -> Self {
        self.audience = v.into();
        self
    }

    /// The STS subject token type. Required.
    pub fn with_subject_token_type<T: Into<String>>(mut self, v: T) -> Self {
        self.subject_token_type = v.into();
        self
    }

    /// Defaults to `https://sts.googleapis.com/v1/token`.
    pub fn with_token_url<T: Into<String>>(mut self, v: T) -> Self {
        self.token_url = v.into();
        self
    }

    pub fn with_client_id<T: Into<String>>(mut self, v: T) -> Self {
        self.client_id = non_empty(Some(v.into()));
        self
    }

    pub fn with_client_secret<T: Into<String>>(mut self, v: T) -> Self {
        self.client_secret = non_empty(Some(v.into()));
        self
    }

    /// Defaults to `https://www.googleapis.com/auth/cloud-platform`.
    pub fn with_scopes<I, S>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(v.into_iter().map(Into::into).collect());
        self
    }

    /// Impersonates a service account with the federated token.
    pub fn with_service_account_impersonation_url<T: Into<String>>(mut self, v: T) -> Self {
        self.impersonation_url = non_empty(Some(v.into()));
        self
    }

    pub fn with_impersonation_lifetime(mut self, v: Duration) -> Self {
        self.impersonation_lifetime = v;
        self
    }

    pub fn with_workforce_pool_user_project<T: Into<String>>(mut self, v: T) -> Self {
        self.workforce_pool_user_project = non_empty(Some(v.into()));
        self
    }

    /// Only used with [from_aws_supplier][ProgrammaticBuilder::from_aws_supplier].
    pub fn with_regional_cred_verification_url<T: Into<String>>(mut self, v: T) -> Self {
        self.regional_cred_verification_url = v.into();
        self
    }

    pub fn with_context(mut self, v: Context) -> Self {
        self.context = v;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_url_policy(mut self, v: UrlPolicy) -> Self {
        self.policy = v;
        self
    }

    pub fn build(self) -> Result<Config> {
        let settings = Settings {
            audience: self.audience,
            subject_token_type: self.subject_token_type,
            token_url: self.token_url,
            client_id: self.client_id,
            client_secret: self.client_secret,
            scopes: scopes_or_default(self.scopes),
            impersonation: self.impersonation_url.map(|url| Impersonation {
                url,
                lifetime: self.impersonation_lifetime,
            }),
            workforce_pool_user_project: self.workforce_pool_user_project,
        };
        settings.validate(self.policy)?;
        let source = match self.supplier {
            Supplier::SubjectToken(s) => {
                CredentialSource::Programmatic(ProgrammaticSourcedCredentials::new(s))
            }
            Supplier::Aws(s) => CredentialSource::Aws(AwsSourcedCredentials {
                regional_cred_verification_url: self.regional_cred_verification_url,
                provider: AwsProvider::Supplier(s),
            }),
        };
        Ok(Config::new(settings, source, self.context))
    }
}

/// An external account configuration.
///
/// Each call to [token][Config::token] fetches a subject token, exchanges
/// it at the STS and, if configured, impersonates a service account. Use
/// [token_source][Config::token_source] to cache the result.
#[derive(Clone, Debug)]
pub struct Config {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    settings: Settings,
    source: CredentialSource,
    context: Context,
}

impl Config {
    fn new(settings: Settings, source: CredentialSource, context: Context) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                source,
                context,
            }),
        }
    }

    pub fn audience(&self) -> &str {
        &self.inner.settings.audience
    }

    pub fn token_url(&self) -> &str {
        &self.inner.settings.token_url
    }

    /// Requests a new token. Every call contacts the token endpoints.
    pub async fn token(&self) -> Result<Token> {
        let Inner {
            settings,
            source,
            context: ctx,
        } = self.inner.as_ref();
        let impersonation_url = settings.impersonation.as_ref().map(|i| i.url.as_str());
        let options = SupplierOptions::new(
            settings.audience.as_str(),
            settings.subject_token_type.as_str(),
        );
        tracing::debug!(source = source.kind(), "fetching subject token");
        let subject_token = source
            .subject_token(ctx, &options, impersonation_url)
            .await?;

        // The impersonated token carries the configured scopes.
        let scope = match settings.impersonation {
            Some(_) => vec![CLOUD_PLATFORM_SCOPE.to_string()],
            None => settings.scopes.clone(),
        };
        let request = ExchangeTokenRequest {
            url: settings.token_url.clone(),
            authentication: ClientAuthentication {
                auth_style: ClientAuthStyle::InHeader,
                client_id: settings.client_id.clone(),
                client_secret: settings.client_secret.clone(),
            },
            subject_token,
            subject_token_type: settings.subject_token_type.clone(),
            audience: Some(settings.audience.clone()),
            scope,
            extra_options: settings.sts_options(),
            ..ExchangeTokenRequest::default()
        };
        let start = OffsetDateTime::now_utc();
        let response = exchange_token(ctx, request).await?;
        if response.expires_in <= 0 {
            return Err(Error::invalid_response(format!(
                "invalid `expires_in` ({}) in the token exchange response",
                response.expires_in
            )));
        }
        let token = Token {
            access_token: response.access_token,
            token_type: response.token_type,
            refresh_token: non_empty(response.refresh_token),
            expiry: Some(expiry_after(start, response.expires_in)?),
            ..Token::default()
        };

        match &settings.impersonation {
            None => Ok(token),
            Some(impersonation) => {
                impersonate::generate_access_token(
                    ctx,
                    &impersonation.url,
                    &token,
                    &settings.scopes,
                    impersonation.lifetime,
                )
                .await
            }
        }
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
