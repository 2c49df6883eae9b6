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

//! Subject tokens for AWS workloads.
//!
//! The subject token is a signed `GetCallerIdentity` request, serialized as
//! JSON. The STS forwards it to AWS to verify the caller identity.

use super::aws_signer::{AwsRequest, AwsSecurityCredentials, RequestSigner, canonical_header_name};
use super::programmatic_sourced::{AwsSecurityCredentialsSupplier, SupplierOptions};
use super::url_validation::UrlPolicy;
use crate::Result;
use crate::context::Context;
use crate::errors::Error;
use crate::token_request::read_limited;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use time::OffsetDateTime;

pub(crate) const DEFAULT_REGIONAL_CRED_VERIFICATION_URL: &str =
    "https://sts.{region}.amazonaws.com?Action=GetCallerIdentity&Version=2011-06-15";
const TARGET_RESOURCE_HEADER: &str = "x-goog-cloud-target-resource";
const METADATA_TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";
const METADATA_TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const METADATA_TOKEN_TTL: &str = "300";
const METADATA_HOSTS: [&str; 3] = ["169.254.169.254", "[fd00:ec2::254]", "fd00:ec2::254"];

const AWS_REGION: &str = "AWS_REGION";
const AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

#[derive(Clone, Debug)]
pub(crate) struct AwsSourcedCredentials {
    pub(crate) regional_cred_verification_url: String,
    pub(crate) provider: AwsProvider,
}

/// Where the region and the AWS credentials come from.
#[derive(Clone, Debug)]
pub(crate) enum AwsProvider {
    /// Environment variables, then the EC2 metadata server.
    Environment(MetadataEndpoints),
    Supplier(Arc<dyn AwsSecurityCredentialsSupplier>),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct MetadataEndpoints {
    pub(crate) region_url: Option<String>,
    pub(crate) url: Option<String>,
    pub(crate) imdsv2_session_token_url: Option<String>,
}

impl MetadataEndpoints {
    pub(crate) fn validate(&self, policy: UrlPolicy) -> Result<()> {
        for (name, url) in [
            ("region_url", &self.region_url),
            ("url", &self.url),
            ("imdsv2_session_token_url", &self.imdsv2_session_token_url),
        ] {
            if let Some(url) = url.as_deref().filter(|u| !u.is_empty()) {
                validate_metadata_url(name, url, policy)?;
            }
        }
        Ok(())
    }
}

/// Only `aws1` is supported.
pub(crate) fn validate_environment_id(environment_id: &str) -> Result<()> {
    let version = environment_id
        .strip_prefix("aws")
        .ok_or_else(|| Error::configuration(format!("invalid environment id {environment_id}")))?;
    match version {
        "1" => Ok(()),
        v => Err(Error::configuration(format!(
            "aws version `{v}` is not supported"
        ))),
    }
}

fn validate_metadata_url(name: &str, url: &str, policy: UrlPolicy) -> Result<()> {
    let parsed = url::Url::parse(url)
        .map_err(|e| Error::configuration(format!("invalid `{name}` <{url}>: {e}")))?;
    let host = parsed.host_str().unwrap_or_default();
    if METADATA_HOSTS.contains(&host) || (policy.allow_loopback && host == "127.0.0.1") {
        return Ok(());
    }
    Err(Error::configuration(format!(
        "invalid host `{host}` for `{name}`, expected the AWS metadata server"
    )))
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn region_from_env() -> Option<String> {
    env(AWS_REGION).or_else(|| env(AWS_DEFAULT_REGION))
}

fn credentials_from_env() -> Option<AwsSecurityCredentials> {
    let access_key_id = env(AWS_ACCESS_KEY_ID)?;
    let secret_access_key = env(AWS_SECRET_ACCESS_KEY)?;
    Some(AwsSecurityCredentials {
        access_key_id,
        secret_access_key,
        session_token: env(AWS_SESSION_TOKEN),
    })
}

#[derive(serde::Serialize)]
struct SignedRequest {
    url: String,
    method: String,
    headers: Vec<SignedRequestHeader>,
}

#[derive(serde::Serialize)]
struct SignedRequestHeader {
    key: String,
    value: String,
}

impl AwsSourcedCredentials {
    pub(crate) async fn subject_token(
        &self,
        ctx: &Context,
        options: &SupplierOptions,
    ) -> Result<String> {
        let (region, credentials) = match &self.provider {
            AwsProvider::Supplier(supplier) => {
                let region = ctx.run(supplier.aws_region(ctx, options)).await?;
                let credentials = ctx
                    .run(supplier.aws_security_credentials(ctx, options))
                    .await?;
                (region, credentials)
            }
            AwsProvider::Environment(endpoints) => {
                let metadata = Metadata::new(ctx, endpoints).await?;
                let region = match region_from_env() {
                    Some(r) => r,
                    None => metadata.region().await?,
                };
                let credentials = match credentials_from_env() {
                    Some(c) => c,
                    None => metadata.credentials().await?,
                };
                (region, credentials)
            }
        };
        self.signed_request(region, credentials, &options.audience, OffsetDateTime::now_utc())
    }

    fn signed_request(
        &self,
        region: String,
        credentials: AwsSecurityCredentials,
        audience: &str,
        now: OffsetDateTime,
    ) -> Result<String> {
        let target = self
            .regional_cred_verification_url
            .replacen("{region}", &region, 1);
        let url = url::Url::parse(&target).map_err(|e| {
            Error::configuration(format!(
                "invalid `regional_cred_verification_url` <{target}>: {e}"
            ))
        })?;
        let mut request = AwsRequest::new(http::Method::POST, url);
        if !audience.is_empty() {
            request.headers.insert(
                HeaderName::from_static(TARGET_RESOURCE_HEADER),
                HeaderValue::from_str(audience).map_err(Error::configuration)?,
            );
        }
        RequestSigner::new(region, credentials).sign(&mut request, now)?;

        let mut headers = request
            .headers
            .iter()
            .map(|(k, v)| {
                let value = v.to_str().map_err(Error::internal)?;
                Ok(SignedRequestHeader {
                    key: canonical_header_name(k.as_str()),
                    value: value.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        headers.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.value.cmp(&b.value)));

        let envelope = SignedRequest {
            url: target,
            method: request.method.to_string(),
            headers,
        };
        let json = serde_json::to_string(&envelope).map_err(Error::internal)?;
        Ok(url::form_urlencoded::byte_serialize(json.as_bytes()).collect())
    }
}

/// Requests to the EC2 metadata server.
struct Metadata<'a> {
    ctx: &'a Context,
    client: reqwest::Client,
    endpoints: &'a MetadataEndpoints,
    headers: HeaderMap,
}

impl<'a> Metadata<'a> {
    // Fetches the IMDSv2 session token, but only if the metadata server
    // will be used at all.
    async fn new(ctx: &'a Context, endpoints: &'a MetadataEndpoints) -> Result<Self> {
        let client = ctx.http_client()?;
        let mut headers = HeaderMap::new();
        let needed = region_from_env().is_none() || credentials_from_env().is_none();
        if let Some(url) = endpoints
            .imdsv2_session_token_url
            .as_deref()
            .filter(|u| needed && !u.is_empty())
        {
            let request = client
                .put(url)
                .header(METADATA_TOKEN_TTL_HEADER, METADATA_TOKEN_TTL);
            let token = fetch(ctx, request, "IMDSv2 session token").await?;
            headers.insert(
                HeaderName::from_static(METADATA_TOKEN_HEADER),
                HeaderValue::from_str(&token).map_err(Error::invalid_response)?,
            );
        }
        Ok(Self {
            ctx,
            client,
            endpoints,
            headers,
        })
    }

    async fn region(&self) -> Result<String> {
        let url = self
            .endpoints
            .region_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::source("unable to determine the AWS region"))?;
        let request = self.client.get(url).headers(self.headers.clone());
        let zone = fetch(self.ctx, request, "AWS region").await?;
        region_from_zone(&zone)
    }

    async fn credentials(&self) -> Result<AwsSecurityCredentials> {
        let url = self
            .endpoints
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                Error::source("unable to determine the AWS security credentials endpoint")
            })?;
        let request = self.client.get(url).headers(self.headers.clone());
        let role = fetch(self.ctx, request, "AWS role name").await?;

        let request = self
            .client
            .get(format!("{url}/{role}"))
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, "application/json");
        let body = fetch(self.ctx, request, "AWS security credentials").await?;
        let credentials = serde_json::from_str::<AwsSecurityCredentials>(&body)
            .map_err(|e| Error::source(format!("cannot parse AWS security credentials: {e}")))?;
        if credentials.access_key_id.is_empty() {
            return Err(Error::source("missing `AccessKeyId` in AWS security credentials"));
        }
        if credentials.secret_access_key.is_empty() {
            return Err(Error::source(
                "missing `SecretAccessKey` in AWS security credentials",
            ));
        }
        Ok(credentials)
    }
}

// The metadata server returns the availability zone, e.g. `us-east-2b`.
fn region_from_zone(zone: &str) -> Result<String> {
    let mut chars = zone.trim().chars();
    chars.next_back();
    match chars.as_str() {
        "" => Err(Error::invalid_response(format!(
            "invalid AWS availability zone <{zone}>"
        ))),
        region => Ok(region.to_string()),
    }
}

async fn fetch(ctx: &Context, request: reqwest::RequestBuilder, what: &str) -> Result<String> {
    ctx.run(async {
        let response = request.send().await.map_err(Error::from_http)?;
        let status = response.status();
        let body = read_limited(response).await?;
        let body = String::from_utf8_lossy(&body).to_string();
        if !status.is_success() {
            return Err(Error::source(format!(
                "unable to retrieve {what}, status={status}, body=<{body}>"
            )));
        }
        Ok(body)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::matchers::{all_of, contains, key, not, request};
    use httptest::responders::{json_encoded, status_code};
    use httptest::{Expectation, Server};
    use percent_encoding::percent_decode_str;
    use scoped_env::ScopedEnv;
    use serde_json::{Value, json};
    use serial_test::serial;
    use test_case::test_case;

    const AUDIENCE: &str = "//iam.googleapis.com/projects/123/locations/global/workloadIdentityPools/pool/providers/aws";

    fn decode(token: &str) -> anyhow::Result<Value> {
        let token = token.replace('+', " ");
        let json = percent_decode_str(&token).decode_utf8()?;
        Ok(serde_json::from_str(&json)?)
    }

    fn header_keys(envelope: &Value) -> Vec<String> {
        envelope["headers"]
            .as_array()
            .map(|headers| {
                headers
                    .iter()
                    .filter_map(|h| h["key"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn header(envelope: &Value, key: &str) -> Option<String> {
        envelope["headers"]
            .as_array()?
            .iter()
            .find(|h| h["key"] == key)
            .and_then(|h| h["value"].as_str().map(str::to_string))
    }

    fn clear_env() -> Vec<ScopedEnv<&'static str>> {
        [
            AWS_REGION,
            AWS_DEFAULT_REGION,
            AWS_ACCESS_KEY_ID,
            AWS_SECRET_ACCESS_KEY,
            AWS_SESSION_TOKEN,
        ]
        .into_iter()
        .map(ScopedEnv::remove)
        .collect()
    }

    fn environment_source(endpoints: MetadataEndpoints) -> AwsSourcedCredentials {
        AwsSourcedCredentials {
            regional_cred_verification_url: DEFAULT_REGIONAL_CRED_VERIFICATION_URL.to_string(),
            provider: AwsProvider::Environment(endpoints),
        }
    }

    #[test]
    fn signed_request_envelope() -> anyhow::Result<()> {
        let source = environment_source(MetadataEndpoints::default());
        let now = OffsetDateTime::from_unix_timestamp(1_315_611_360)?;
        let credentials = AwsSecurityCredentials::new("AKIDEXAMPLE", "secret")
            .with_session_token("session-token");
        let token = source.signed_request("us-east-2".to_string(), credentials, AUDIENCE, now)?;
        let envelope = decode(&token)?;

        assert_eq!(
            envelope["url"],
            "https://sts.us-east-2.amazonaws.com?Action=GetCallerIdentity&Version=2011-06-15"
        );
        assert_eq!(envelope["method"], "POST");
        assert_eq!(
            header_keys(&envelope),
            vec![
                "Authorization",
                "Host",
                "X-Amz-Date",
                "X-Amz-Security-Token",
                "X-Goog-Cloud-Target-Resource"
            ]
        );
        assert_eq!(
            header(&envelope, "Host").as_deref(),
            Some("sts.us-east-2.amazonaws.com")
        );
        assert_eq!(
            header(&envelope, "X-Amz-Date").as_deref(),
            Some("20110909T233600Z")
        );
        assert_eq!(
            header(&envelope, "X-Goog-Cloud-Target-Resource").as_deref(),
            Some(AUDIENCE)
        );
        let authorization = header(&envelope, "Authorization").unwrap_or_default();
        assert!(
            authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20110909/us-east-2/sts/aws4_request, SignedHeaders=host;x-amz-date;x-amz-security-token;x-goog-cloud-target-resource, Signature="),
            "{authorization}"
        );
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn from_environment() -> anyhow::Result<()> {
        let _env = clear_env();
        let _region = ScopedEnv::set(AWS_REGION, "us-west-1");
        let _id = ScopedEnv::set(AWS_ACCESS_KEY_ID, "AKIDEXAMPLE");
        let _secret = ScopedEnv::set(AWS_SECRET_ACCESS_KEY, "secret");

        // The metadata server is never contacted.
        let server = Server::run();
        let source = environment_source(MetadataEndpoints {
            region_url: Some(server.url("/region").to_string()),
            url: Some(server.url("/credentials").to_string()),
            imdsv2_session_token_url: Some(server.url("/token").to_string()),
        });
        let options = SupplierOptions::new(AUDIENCE, "urn:ietf:params:aws:token-type:aws4_request");
        let envelope = decode(&source.subject_token(&Context::new(), &options).await?)?;
        assert_eq!(
            envelope["url"],
            "https://sts.us-west-1.amazonaws.com?Action=GetCallerIdentity&Version=2011-06-15"
        );
        assert!(!header_keys(&envelope).contains(&"X-Amz-Security-Token".to_string()));
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn default_region_from_environment() -> anyhow::Result<()> {
        let _env = clear_env();
        let _region = ScopedEnv::set(AWS_DEFAULT_REGION, "eu-west-3");
        let _id = ScopedEnv::set(AWS_ACCESS_KEY_ID, "AKIDEXAMPLE");
        let _secret = ScopedEnv::set(AWS_SECRET_ACCESS_KEY, "secret");
        let _token = ScopedEnv::set(AWS_SESSION_TOKEN, "session-token");

        let source = environment_source(MetadataEndpoints::default());
        let options = SupplierOptions::new(AUDIENCE, "urn:ietf:params:aws:token-type:aws4_request");
        let envelope = decode(&source.subject_token(&Context::new(), &options).await?)?;
        assert_eq!(
            header(&envelope, "Host").as_deref(),
            Some("sts.eu-west-3.amazonaws.com")
        );
        assert_eq!(
            header(&envelope, "X-Amz-Security-Token").as_deref(),
            Some("session-token")
        );
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn from_metadata_server_with_imdsv2() -> anyhow::Result<()> {
        let _env = clear_env();
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("PUT", "/latest/api/token"),
                request::headers(contains((METADATA_TOKEN_TTL_HEADER, "300"))),
            ])
            .respond_with(status_code(200).body("imdsv2-token")),
        );
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/latest/meta-data/placement/availability-zone"),
                request::headers(contains((METADATA_TOKEN_HEADER, "imdsv2-token"))),
            ])
            .respond_with(status_code(200).body("us-east-2b")),
        );
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/latest/meta-data/iam/security-credentials"),
                request::headers(contains((METADATA_TOKEN_HEADER, "imdsv2-token"))),
            ])
            .respond_with(status_code(200).body("test-role")),
        );
        server.expect(
            Expectation::matching(all_of![
                request::method_path(
                    "GET",
                    "/latest/meta-data/iam/security-credentials/test-role"
                ),
                request::headers(contains((METADATA_TOKEN_HEADER, "imdsv2-token"))),
            ])
            .respond_with(json_encoded(json!({
                "AccessKeyId": "AKIDEXAMPLE",
                "SecretAccessKey": "secret",
                "Token": "metadata-session-token",
            }))),
        );

        let source = environment_source(MetadataEndpoints {
            region_url: Some(
                server
                    .url("/latest/meta-data/placement/availability-zone")
                    .to_string(),
            ),
            url: Some(
                server
                    .url("/latest/meta-data/iam/security-credentials")
                    .to_string(),
            ),
            imdsv2_session_token_url: Some(server.url("/latest/api/token").to_string()),
        });
        let options = SupplierOptions::new(AUDIENCE, "urn:ietf:params:aws:token-type:aws4_request");
        let envelope = decode(&source.subject_token(&Context::new(), &options).await?)?;
        assert_eq!(
            header(&envelope, "Host").as_deref(),
            Some("sts.us-east-2.amazonaws.com")
        );
        assert_eq!(
            header(&envelope, "X-Amz-Security-Token").as_deref(),
            Some("metadata-session-token")
        );
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn metadata_server_without_imdsv2() -> anyhow::Result<()> {
        let _env = clear_env();
        let _region = ScopedEnv::set(AWS_REGION, "us-west-1");
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/credentials"),
                request::headers(not(contains(key(METADATA_TOKEN_HEADER)))),
            ])
            .respond_with(status_code(200).body("test-role")),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/credentials/test-role"))
                .respond_with(json_encoded(json!({
                    "AccessKeyId": "AKIDEXAMPLE",
                    "SecretAccessKey": "secret",
                }))),
        );

        let source = environment_source(MetadataEndpoints {
            url: Some(server.url("/credentials").to_string()),
            ..Default::default()
        });
        let options = SupplierOptions::new(AUDIENCE, "urn:ietf:params:aws:token-type:aws4_request");
        let envelope = decode(&source.subject_token(&Context::new(), &options).await?)?;
        assert_eq!(
            header(&envelope, "Host").as_deref(),
            Some("sts.us-west-1.amazonaws.com")
        );
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn missing_region() {
        let _env = clear_env();
        let _id = ScopedEnv::set(AWS_ACCESS_KEY_ID, "AKIDEXAMPLE");
        let _secret = ScopedEnv::set(AWS_SECRET_ACCESS_KEY, "secret");
        let source = environment_source(MetadataEndpoints::default());
        let err = source
            .subject_token(&Context::new(), &SupplierOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_source(), "{err:?}");
        assert!(err.to_string().contains("region"), "{err}");
    }

    #[test_case("us-east-2b", Some("us-east-2"))]
    #[test_case("us-east-2b\n", Some("us-east-2"); "trailing newline")]
    #[test_case("b", None; "single character")]
    #[test_case("", None; "empty")]
    fn region_from_zone_values(zone: &str, want: Option<&str>) {
        match (region_from_zone(zone), want) {
            (Ok(got), Some(want)) => assert_eq!(got, want),
            (Err(e), None) => assert!(e.is_invalid_response(), "{e:?}"),
            (got, _) => panic!("unexpected result for {zone:?}: {got:?}"),
        }
    }

    #[test_case(""; "empty")]
    #[test_case("a"; "single character")]
    #[tokio::test]
    #[serial]
    async fn invalid_availability_zone(zone: &'static str) {
        let _env = clear_env();
        let _id = ScopedEnv::set(AWS_ACCESS_KEY_ID, "AKIDEXAMPLE");
        let _secret = ScopedEnv::set(AWS_SECRET_ACCESS_KEY, "secret");
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/zone"))
                .respond_with(status_code(200).body(zone)),
        );
        let source = environment_source(MetadataEndpoints {
            region_url: Some(server.url("/zone").to_string()),
            ..Default::default()
        });
        let err = source
            .subject_token(&Context::new(), &SupplierOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_invalid_response(), "{err:?}");
    }

    #[tokio::test]
    #[serial]
    async fn metadata_error() {
        let _env = clear_env();
        let _region = ScopedEnv::set(AWS_REGION, "us-west-1");
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/credentials"))
                .respond_with(status_code(404)),
        );
        let source = environment_source(MetadataEndpoints {
            url: Some(server.url("/credentials").to_string()),
            ..Default::default()
        });
        let err = source
            .subject_token(&Context::new(), &SupplierOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_source(), "{err:?}");
        assert!(err.to_string().contains("404"), "{err}");
    }

    mockall::mock! {
        #[derive(Debug)]
        AwsSupplier { }

        #[async_trait::async_trait]
        impl AwsSecurityCredentialsSupplier for AwsSupplier {
            async fn aws_region(&self, ctx: &Context, options: &SupplierOptions) -> Result<String>;
            async fn aws_security_credentials(
                &self,
                ctx: &Context,
                options: &SupplierOptions,
            ) -> Result<AwsSecurityCredentials>;
        }
    }

    #[tokio::test]
    #[serial]
    async fn from_supplier() -> anyhow::Result<()> {
        let _env = clear_env();
        let mut mock = MockAwsSupplier::new();
        mock.expect_aws_region()
            .times(1)
            .returning(|_, _| Ok("ap-south-1".to_string()));
        mock.expect_aws_security_credentials()
            .withf(|_, o| o.audience == AUDIENCE)
            .times(1)
            .returning(|_, _| Ok(AwsSecurityCredentials::new("AKIDEXAMPLE", "secret")));

        let source = AwsSourcedCredentials {
            regional_cred_verification_url: DEFAULT_REGIONAL_CRED_VERIFICATION_URL.to_string(),
            provider: AwsProvider::Supplier(Arc::new(mock)),
        };
        let options = SupplierOptions::new(AUDIENCE, "urn:ietf:params:aws:token-type:aws4_request");
        let envelope = decode(&source.subject_token(&Context::new(), &options).await?)?;
        assert_eq!(
            header(&envelope, "Host").as_deref(),
            Some("sts.ap-south-1.amazonaws.com")
        );
        Ok(())
    }

    #[test_case("aws1", true)]
    #[test_case("aws2", false)]
    #[test_case("aws", false)]
    #[test_case("azure1", false)]
    fn environment_id(id: &str, ok: bool) {
        assert_eq!(validate_environment_id(id).is_ok(), ok, "{id}");
    }

    #[test_case("http://169.254.169.254/latest/meta-data/iam/security-credentials", true)]
    #[test_case("http://[fd00:ec2::254]/latest/meta-data/placement/availability-zone", true)]
    #[test_case("http://abc.com/latest/api/token", false)]
    #[test_case("http://127.0.0.1/latest/api/token", false)]
    fn metadata_urls(url: &str, ok: bool) {
        let endpoints = MetadataEndpoints {
            url: Some(url.to_string()),
            ..Default::default()
        };
        assert_eq!(endpoints.validate(UrlPolicy::default()).is_ok(), ok, "{url}");
    }

    #[test]
    fn metadata_urls_loopback_policy() {
        let endpoints = MetadataEndpoints {
            region_url: Some("http://127.0.0.1:8080/region".to_string()),
            ..Default::default()
        };
        assert!(endpoints.validate(UrlPolicy::loopback()).is_ok());
    }
}
