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

//! Application provided subject tokens and AWS credentials.

use super::aws_signer::AwsSecurityCredentials;
use crate::Result;
use crate::context::Context;
use std::sync::Arc;

/// Describes the external account asking a supplier for credentials.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct SupplierOptions {
    /// The STS audience, usually the workload identity pool provider.
    pub audience: String,
    /// The type of subject token the STS expects.
    pub subject_token_type: String,
}

impl SupplierOptions {
    pub fn new<A, T>(audience: A, subject_token_type: T) -> Self
    where
        A: Into<String>,
        T: Into<String>,
    {
        Self {
            audience: audience.into(),
            subject_token_type: subject_token_type.into(),
        }
    }
}

/// Supplies subject tokens obtained by the application.
///
/// Use [Error::from_source][crate::errors::Error::from_source] to report
/// failures.
///
/// # Example
/// ```
/// # use google_cloud_oauth2::context::Context;
/// # use google_cloud_oauth2::external_account::{SubjectTokenSupplier, SupplierOptions};
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
/// ```
#[async_trait::async_trait]
pub trait SubjectTokenSupplier: std::fmt::Debug + Send + Sync {
    async fn subject_token(&self, ctx: &Context, options: &SupplierOptions) -> Result<String>;
}

/// Supplies the AWS region and credentials, in place of the environment and
/// the EC2 metadata server.
#[async_trait::async_trait]
pub trait AwsSecurityCredentialsSupplier: std::fmt::Debug + Send + Sync {
    /// The region of the `GetCallerIdentity` endpoint, for example
    /// `us-east-2`.
    async fn aws_region(&self, ctx: &Context, options: &SupplierOptions) -> Result<String>;

    async fn aws_security_credentials(
        &self,
        ctx: &Context,
        options: &SupplierOptions,
    ) -> Result<AwsSecurityCredentials>;
}

#[derive(Clone, Debug)]
pub(crate) struct ProgrammaticSourcedCredentials {
    supplier: Arc<dyn SubjectTokenSupplier>,
}

impl ProgrammaticSourcedCredentials {
    pub(crate) fn new(supplier: Arc<dyn SubjectTokenSupplier>) -> Self {
        Self { supplier }
    }

    pub(crate) async fn subject_token(
        &self,
        ctx: &Context,
        options: &SupplierOptions,
    ) -> Result<String> {
        ctx.run(self.supplier.subject_token(ctx, options)).await
    }
}
