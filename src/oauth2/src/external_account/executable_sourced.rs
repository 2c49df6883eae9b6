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

//! Subject tokens produced by a local executable.
//!
//! The executable contract is documented in [AIP-4117]. Running arbitrary
//! commands is opt-in, the `GOOGLE_EXTERNAL_ACCOUNT_ALLOW_EXECUTABLES`
//! environment variable must be set to `1`.
//!
//! [AIP-4117]: https://google.aip.dev/auth/4117#determining-the-subject-token-in-executable-sourced-credentials

use super::programmatic_sourced::SupplierOptions;
use crate::Result;
use crate::constants::{ID_TOKEN_TYPE, JWT_TOKEN_TYPE, MAX_RESPONSE_BYTES, SAML2_TOKEN_TYPE};
use crate::context::Context;
use crate::errors::Error;
use regex::Regex;
use std::process::Stdio;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use time::OffsetDateTime;

pub(crate) const ALLOW_EXECUTABLES_ENV: &str = "GOOGLE_EXTERNAL_ACCOUNT_ALLOW_EXECUTABLES";
const AUDIENCE_ENV: &str = "GOOGLE_EXTERNAL_ACCOUNT_AUDIENCE";
const TOKEN_TYPE_ENV: &str = "GOOGLE_EXTERNAL_ACCOUNT_TOKEN_TYPE";
const INTERACTIVE_ENV: &str = "GOOGLE_EXTERNAL_ACCOUNT_INTERACTIVE";
const IMPERSONATED_EMAIL_ENV: &str = "GOOGLE_EXTERNAL_ACCOUNT_IMPERSONATED_EMAIL";
const OUTPUT_FILE_ENV: &str = "GOOGLE_EXTERNAL_ACCOUNT_OUTPUT_FILE";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MIN_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_SUPPORTED_VERSION: i64 = 1;

static SERVICE_ACCOUNT_EMAIL: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| {
        Regex::new(
            r"https://iamcredentials\..+/v1/projects/-/serviceAccounts/(.*@.*):generateAccessToken",
        )
    });

/// The `executable` section of the `credential_source`.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
pub(crate) struct ExecutableConfig {
    #[serde(default)]
    pub(crate) command: String,
    pub(crate) timeout_millis: Option<u64>,
    pub(crate) output_file: Option<String>,
}

/// What to run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct CommandSpec {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
    /// Added to the environment of the current process.
    pub(crate) env: Vec<(String, String)>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct CommandOutput {
    /// The exit code, `None` if the process was killed by a signal.
    pub(crate) code: Option<i32>,
    pub(crate) success: bool,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
}

/// Runs commands to completion. Dropping the future must stop the command.
#[async_trait::async_trait]
pub(crate) trait CommandRunner: std::fmt::Debug + Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands as child processes.
#[derive(Debug, Default)]
pub(crate) struct ProcessRunner;

#[async_trait::async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        tracing::debug!(program = %spec.program, "running subject token executable");
        let output = tokio::process::Command::new(&spec.program)
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::source(format!("cannot run `{}`: {e}", spec.program)))?;
        Ok(CommandOutput {
            code: output.status.code(),
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ExecutableSourcedCredentials {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
    pub(crate) timeout: Duration,
    pub(crate) output_file: Option<String>,
    pub(crate) runner: Arc<dyn CommandRunner>,
}

impl ExecutableSourcedCredentials {
    pub(crate) fn new(config: ExecutableConfig) -> Result<Self> {
        let mut parts = config.command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            Error::configuration("missing `command` in the executable credential source")
        })?;
        let timeout = match config.timeout_millis {
            None => DEFAULT_TIMEOUT,
            Some(millis) => {
                let timeout = Duration::from_millis(millis);
                if !(MIN_TIMEOUT..=MAX_TIMEOUT).contains(&timeout) {
                    return Err(Error::configuration(format!(
                        "invalid executable `timeout_millis` {millis}, must be between {} and {}",
                        MIN_TIMEOUT.as_millis(),
                        MAX_TIMEOUT.as_millis()
                    )));
                }
                timeout
            }
        };
        Ok(Self {
            program,
            args: parts.collect(),
            timeout,
            output_file: config.output_file.filter(|f| !f.is_empty()),
            runner: Arc::new(ProcessRunner),
        })
    }

    pub(crate) async fn subject_token(
        &self,
        ctx: &Context,
        options: &SupplierOptions,
        impersonation_url: Option<&str>,
    ) -> Result<String> {
        if std::env::var(ALLOW_EXECUTABLES_ENV).ok().as_deref() != Some("1") {
            return Err(Error::source(format!(
                "executables need to be explicitly allowed (set {ALLOW_EXECUTABLES_ENV} to '1') to run"
            )));
        }
        if let Some(token) = self.from_output_file(ctx).await? {
            return Ok(token);
        }
        self.from_command(ctx, options, impersonation_url).await
    }

    // Returns `None` when the command needs to run.
    async fn from_output_file(&self, ctx: &Context) -> Result<Option<String>> {
        let Some(path) = &self.output_file else {
            return Ok(None);
        };
        let Ok(mut content) = ctx.run(async { Ok(tokio::fs::read(path).await) }).await? else {
            return Ok(None);
        };
        content.truncate(MAX_RESPONSE_BYTES);
        if content.is_empty() {
            return Ok(None);
        }
        match parse_response(&content, "output file", OffsetDateTime::now_utc()) {
            Ok(token) => Ok(Some(token)),
            Err(e) if e.falls_through() => {
                tracing::debug!(path, "ignoring the cached executable response: {e:?}");
                Ok(None)
            }
            Err(e) => Err(e.into_error()),
        }
    }

    async fn from_command(
        &self,
        ctx: &Context,
        options: &SupplierOptions,
        impersonation_url: Option<&str>,
    ) -> Result<String> {
        let spec = CommandSpec {
            program: self.program.clone(),
            args: self.args.clone(),
            env: self.environment(options, impersonation_url),
        };
        let timeout = self.timeout;
        let output = ctx
            .run(async {
                tokio::time::timeout(timeout, self.runner.run(&spec))
                    .await
                    .map_err(|_| {
                        Error::timeout(format!(
                            "executable `{}` did not finish in {}ms",
                            spec.program,
                            timeout.as_millis()
                        ))
                    })?
            })
            .await?;

        if !output.success {
            let code = output
                .code
                .map_or_else(|| "none".to_string(), |c| c.to_string());
            return Err(Error::source(format!(
                "executable `{}` failed with exit code {code}",
                self.program
            )));
        }
        let stdout = output.stdout.trim_ascii();
        let response = if stdout.is_empty() {
            output.stderr.trim_ascii()
        } else {
            stdout
        };
        parse_response(response, "executable", OffsetDateTime::now_utc())
            .map_err(ResponseError::into_error)
    }

    fn environment(
        &self,
        options: &SupplierOptions,
        impersonation_url: Option<&str>,
    ) -> Vec<(String, String)> {
        let mut env = vec![
            (AUDIENCE_ENV.to_string(), options.audience.clone()),
            (TOKEN_TYPE_ENV.to_string(), options.subject_token_type.clone()),
            (INTERACTIVE_ENV.to_string(), "0".to_string()),
        ];
        if let Some(email) = impersonation_url.and_then(service_account_email) {
            env.push((IMPERSONATED_EMAIL_ENV.to_string(), email));
        }
        if let Some(path) = &self.output_file {
            env.push((OUTPUT_FILE_ENV.to_string(), path.clone()));
        }
        env
    }
}

fn service_account_email(url: &str) -> Option<String> {
    let re = SERVICE_ACCOUNT_EMAIL.as_ref().ok()?;
    re.captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// The response format of the executable, also used for the output file.
#[derive(serde::Deserialize, Debug, Default)]
struct ExecutableResponse {
    version: Option<i64>,
    success: Option<bool>,
    token_type: Option<String>,
    expiration_time: Option<i64>,
    id_token: Option<String>,
    saml_response: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug)]
enum ResponseError {
    Expired,
    MalformedFailure,
    UserDefined { code: String, message: String },
    Invalid(String),
}

impl ResponseError {
    // Expired tokens and failures are never served from the output file, the
    // command runs again.
    fn falls_through(&self) -> bool {
        !matches!(self, ResponseError::Invalid(_))
    }

    fn into_error(self) -> Error {
        match self {
            ResponseError::Expired => {
                Error::invalid_response("the token returned by the executable is expired")
            }
            ResponseError::MalformedFailure => Error::invalid_response(
                "the executable response must include `code` and `message` fields when unsuccessful",
            ),
            ResponseError::UserDefined { code, message } => {
                Error::user_defined_failure(code, message)
            }
            ResponseError::Invalid(msg) => Error::invalid_response(msg),
        }
    }
}

fn missing(source: &str, field: &str) -> ResponseError {
    ResponseError::Invalid(format!("the {source} response is missing the `{field}` field"))
}

fn parse_response(
    content: &[u8],
    source: &str,
    now: OffsetDateTime,
) -> std::result::Result<String, ResponseError> {
    let response = serde_json::from_slice::<ExecutableResponse>(content).map_err(|e| {
        ResponseError::Invalid(format!(
            "cannot parse the {source} response: {e}, response=<{}>",
            String::from_utf8_lossy(content)
        ))
    })?;
    let version = response.version.ok_or_else(|| missing(source, "version"))?;
    let success = response.success.ok_or_else(|| missing(source, "success"))?;
    if !success {
        return match (response.code, response.message) {
            (Some(code), Some(message)) if !code.is_empty() && !message.is_empty() => {
                Err(ResponseError::UserDefined { code, message })
            }
            _ => Err(ResponseError::MalformedFailure),
        };
    }
    if !(0..=MAX_SUPPORTED_VERSION).contains(&version) {
        return Err(ResponseError::Invalid(format!(
            "the {source} response has unsupported `version` {version}, the maximum supported version is {MAX_SUPPORTED_VERSION}"
        )));
    }
    let expiration_time = response
        .expiration_time
        .ok_or_else(|| missing(source, "expiration_time"))?;
    let token_type = response
        .token_type
        .filter(|t| !t.is_empty())
        .ok_or_else(|| missing(source, "token_type"))?;
    if expiration_time <= now.unix_timestamp() {
        return Err(ResponseError::Expired);
    }
    let token = match token_type.as_str() {
        JWT_TOKEN_TYPE | ID_TOKEN_TYPE => response.id_token.ok_or_else(|| missing(source, "id_token"))?,
        SAML2_TOKEN_TYPE => response
            .saml_response
            .ok_or_else(|| missing(source, "saml_response"))?,
        t => {
            return Err(ResponseError::Invalid(format!(
                "the {source} response has an unsupported `token_type` {t}"
            )));
        }
    };
    if token.is_empty() {
        return Err(ResponseError::Invalid(format!(
            "the {source} response has an empty subject token"
        )));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoped_env::ScopedEnv;
    use serde_json::{Value, json};
    use serial_test::serial;
    use std::io::Write;
    use test_case::test_case;

    const AUDIENCE: &str =
        "//iam.googleapis.com/projects/123/locations/global/workloadIdentityPools/pool/providers/oidc";
    const IMPERSONATION_URL: &str = "https://iamcredentials.googleapis.com/v1/projects/-/serviceAccounts/sa@project.iam.gserviceaccount.com:generateAccessToken";

    mockall::mock! {
        #[derive(Debug)]
        Runner { }

        #[async_trait::async_trait]
        impl CommandRunner for Runner {
            async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
        }
    }

    fn options() -> SupplierOptions {
        SupplierOptions::new(AUDIENCE, JWT_TOKEN_TYPE)
    }

    fn in_one_hour() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp() + 3600
    }

    fn valid_response(token: &str) -> Value {
        json!({
            "version": 1,
            "success": true,
            "token_type": JWT_TOKEN_TYPE,
            "id_token": token,
            "expiration_time": in_one_hour(),
        })
    }

    fn stdout(v: impl ToString) -> Result<CommandOutput> {
        Ok(CommandOutput {
            code: Some(0),
            success: true,
            stdout: v.to_string().into_bytes(),
            stderr: Vec::new(),
        })
    }

    fn source(runner: MockRunner, output_file: Option<String>) -> ExecutableSourcedCredentials {
        ExecutableSourcedCredentials {
            program: "/usr/bin/fetch-token".to_string(),
            args: vec!["--audience".to_string(), "test".to_string()],
            timeout: DEFAULT_TIMEOUT,
            output_file,
            runner: Arc::new(runner),
        }
    }

    fn temp_file(content: &str) -> anyhow::Result<tempfile::NamedTempFile> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(content.as_bytes())?;
        Ok(file)
    }

    #[tokio::test]
    #[serial]
    async fn not_allowed() {
        let _e = ScopedEnv::remove(ALLOW_EXECUTABLES_ENV);
        let mut runner = MockRunner::new();
        runner.expect_run().never();
        let err = source(runner, None)
            .subject_token(&Context::new(), &options(), None)
            .await
            .unwrap_err();
        assert!(err.is_source(), "{err:?}");
        assert!(err.to_string().contains(ALLOW_EXECUTABLES_ENV), "{err}");
    }

    #[tokio::test]
    #[serial]
    async fn unsupported_version() {
        let _e = ScopedEnv::set(ALLOW_EXECUTABLES_ENV, "1");
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_| stdout(json!({"success": true, "version": 2})));
        let err = source(runner, None)
            .subject_token(&Context::new(), &options(), None)
            .await
            .unwrap_err();
        assert!(err.is_invalid_response(), "{err:?}");
        let msg = err.to_string();
        assert!(msg.contains("`version` 2"), "{msg}");
    }

    #[tokio::test]
    #[serial]
    async fn command_environment() -> anyhow::Result<()> {
        let _e = ScopedEnv::set(ALLOW_EXECUTABLES_ENV, "1");
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .withf(|spec| {
                let env = |k: &str| {
                    spec.env
                        .iter()
                        .find(|(name, _)| name == k)
                        .map(|(_, v)| v.as_str())
                };
                spec.program == "/usr/bin/fetch-token"
                    && spec.args == ["--audience", "test"]
                    && env(AUDIENCE_ENV) == Some(AUDIENCE)
                    && env(TOKEN_TYPE_ENV) == Some(JWT_TOKEN_TYPE)
                    && env(INTERACTIVE_ENV) == Some("0")
                    && env(IMPERSONATED_EMAIL_ENV) == Some("sa@project.iam.gserviceaccount.com")
                    && env(OUTPUT_FILE_ENV) == Some("/tmp/does-not-exist/output.json")
            })
            .times(1)
            .returning(|_| stdout(valid_response("an_example_token")));

        let token = source(runner, Some("/tmp/does-not-exist/output.json".to_string()))
            .subject_token(&Context::new(), &options(), Some(IMPERSONATION_URL))
            .await?;
        assert_eq!(token, "an_example_token");
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn command_environment_without_impersonation() -> anyhow::Result<()> {
        let _e = ScopedEnv::set(ALLOW_EXECUTABLES_ENV, "1");
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .withf(|spec| {
                !spec.env.iter().any(|(k, _)| k == IMPERSONATED_EMAIL_ENV || k == OUTPUT_FILE_ENV)
            })
            .times(1)
            .returning(|_| stdout(valid_response("an_example_token")));

        let token = source(runner, None)
            .subject_token(&Context::new(), &options(), None)
            .await?;
        assert_eq!(token, "an_example_token");
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn uses_stderr_when_stdout_is_empty() -> anyhow::Result<()> {
        let _e = ScopedEnv::set(ALLOW_EXECUTABLES_ENV, "1");
        let mut runner = MockRunner::new();
        runner.expect_run().times(1).returning(|_| {
            Ok(CommandOutput {
                code: Some(0),
                success: true,
                stdout: b"  \n".to_vec(),
                stderr: valid_response("from-stderr").to_string().into_bytes(),
            })
        });
        let token = source(runner, None)
            .subject_token(&Context::new(), &options(), None)
            .await?;
        assert_eq!(token, "from-stderr");
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn exit_code() {
        let _e = ScopedEnv::set(ALLOW_EXECUTABLES_ENV, "1");
        let mut runner = MockRunner::new();
        runner.expect_run().times(1).returning(|_| {
            Ok(CommandOutput {
                code: Some(3),
                success: false,
                ..Default::default()
            })
        });
        let err = source(runner, None)
            .subject_token(&Context::new(), &options(), None)
            .await
            .unwrap_err();
        assert!(err.is_source(), "{err:?}");
        assert!(err.to_string().contains("exit code 3"), "{err}");
    }

    #[derive(Debug)]
    struct SlowRunner;

    #[async_trait::async_trait]
    impl CommandRunner for SlowRunner {
        async fn run(&self, _spec: &CommandSpec) -> Result<CommandOutput> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            stdout(valid_response("too-late"))
        }
    }

    #[tokio::test(start_paused = true)]
    #[serial]
    async fn command_timeout() {
        let _e = ScopedEnv::set(ALLOW_EXECUTABLES_ENV, "1");
        let source = ExecutableSourcedCredentials {
            runner: Arc::new(SlowRunner),
            ..source(MockRunner::new(), None)
        };
        let err = source
            .subject_token(&Context::new(), &options(), None)
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
    }

    #[tokio::test(start_paused = true)]
    #[serial]
    async fn context_deadline() {
        let _e = ScopedEnv::set(ALLOW_EXECUTABLES_ENV, "1");
        let source = ExecutableSourcedCredentials {
            runner: Arc::new(SlowRunner),
            ..source(MockRunner::new(), None)
        };
        let ctx = Context::new().with_timeout(Duration::from_secs(1));
        let err = source
            .subject_token(&ctx, &options(), None)
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
    }

    #[tokio::test]
    #[serial]
    async fn valid_output_file() -> anyhow::Result<()> {
        let _e = ScopedEnv::set(ALLOW_EXECUTABLES_ENV, "1");
        let file = temp_file(&valid_response("cached_token").to_string())?;
        let mut runner = MockRunner::new();
        runner.expect_run().never();
        let token = source(runner, Some(file.path().to_string_lossy().to_string()))
            .subject_token(&Context::new(), &options(), None)
            .await?;
        assert_eq!(token, "cached_token");
        Ok(())
    }

    #[test_case(json!({"version": 1, "success": true, "token_type": JWT_TOKEN_TYPE, "id_token": "expired", "expiration_time": 1}).to_string(); "expired")]
    #[test_case(json!({"version": 1, "success": false, "code": "401", "message": "Caller not authorized."}).to_string(); "user defined failure")]
    #[test_case(json!({"version": 1, "success": false}).to_string(); "malformed failure")]
    #[test_case(String::new(); "empty")]
    #[tokio::test]
    #[serial]
    async fn output_file_falls_through(content: String) -> anyhow::Result<()> {
        let _e = ScopedEnv::set(ALLOW_EXECUTABLES_ENV, "1");
        let file = temp_file(&content)?;
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_| stdout(valid_response("fresh_token")));
        let token = source(runner, Some(file.path().to_string_lossy().to_string()))
            .subject_token(&Context::new(), &options(), None)
            .await?;
        assert_eq!(token, "fresh_token");
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn output_file_garbage_surfaces() -> anyhow::Result<()> {
        let _e = ScopedEnv::set(ALLOW_EXECUTABLES_ENV, "1");
        let file = temp_file("not json")?;
        let mut runner = MockRunner::new();
        runner.expect_run().never();
        let err = source(runner, Some(file.path().to_string_lossy().to_string()))
            .subject_token(&Context::new(), &options(), None)
            .await
            .unwrap_err();
        assert!(err.is_invalid_response(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn output_file_unsupported_version_surfaces() -> anyhow::Result<()> {
        let _e = ScopedEnv::set(ALLOW_EXECUTABLES_ENV, "1");
        let content = json!({
            "version": 2,
            "success": true,
            "token_type": JWT_TOKEN_TYPE,
            "id_token": "cached",
            "expiration_time": in_one_hour(),
        });
        let file = temp_file(&content.to_string())?;
        let mut runner = MockRunner::new();
        runner.expect_run().never();
        let err = source(runner, Some(file.path().to_string_lossy().to_string()))
            .subject_token(&Context::new(), &options(), None)
            .await
            .unwrap_err();
        assert!(err.is_invalid_response(), "{err:?}");
        Ok(())
    }

    #[test_case(json!({"success": true, "token_type": JWT_TOKEN_TYPE}), "`version`"; "missing version")]
    #[test_case(json!({"version": 1, "token_type": JWT_TOKEN_TYPE}), "`success`"; "missing success")]
    #[test_case(json!({"version": 1, "success": true, "token_type": JWT_TOKEN_TYPE, "id_token": "t"}), "`expiration_time`"; "missing expiration")]
    #[test_case(json!({"version": 1, "success": true, "id_token": "t", "expiration_time": in_one_hour()}), "`token_type`"; "missing token type")]
    #[test_case(json!({"version": 1, "success": true, "token_type": JWT_TOKEN_TYPE, "expiration_time": in_one_hour()}), "`id_token`"; "missing id token")]
    #[test_case(json!({"version": 1, "success": true, "token_type": SAML2_TOKEN_TYPE, "id_token": "t", "expiration_time": in_one_hour()}), "`saml_response`"; "missing saml response")]
    #[test_case(json!({"version": 1, "success": true, "token_type": "urn:ietf:params:oauth:token-type:access_token", "id_token": "t", "expiration_time": in_one_hour()}), "`token_type`"; "unsupported token type")]
    fn invalid_responses(input: Value, want: &str) {
        let err = parse_response(
            input.to_string().as_bytes(),
            "executable",
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
        assert!(!err.falls_through(), "{err:?}");
        let err = err.into_error();
        assert!(err.is_invalid_response(), "{err:?}");
        assert!(err.to_string().contains(want), "{err}");
    }

    #[test]
    fn user_defined_failure() {
        let input = json!({"version": 1, "success": false, "code": "401", "message": "Caller not authorized."});
        let err = parse_response(
            input.to_string().as_bytes(),
            "executable",
            OffsetDateTime::now_utc(),
        )
        .unwrap_err()
        .into_error();
        assert!(err.is_user_defined(), "{err:?}");
        assert_eq!(err.user_defined(), Some(("401", "Caller not authorized.")));
    }

    #[tokio::test]
    #[serial]
    async fn expiration_required_without_output_file() {
        let _e = ScopedEnv::set(ALLOW_EXECUTABLES_ENV, "1");
        let mut runner = MockRunner::new();
        runner.expect_run().times(1).returning(|_| {
            stdout(json!({"version": 1, "success": true, "token_type": JWT_TOKEN_TYPE, "id_token": "t"}))
        });
        let err = source(runner, None)
            .subject_token(&Context::new(), &options(), None)
            .await
            .unwrap_err();
        assert!(err.is_invalid_response(), "{err:?}");
        assert!(err.to_string().contains("`expiration_time`"), "{err}");
    }

    #[test_case(-1, true; "expired")]
    #[test_case(0, true; "expires now")]
    #[test_case(1, false; "expires later")]
    fn expiration_boundary(offset: i64, expired: bool) {
        let now = OffsetDateTime::now_utc();
        let input = json!({
            "version": 1,
            "success": true,
            "token_type": JWT_TOKEN_TYPE,
            "id_token": "t",
            "expiration_time": now.unix_timestamp() + offset,
        });
        let got = parse_response(input.to_string().as_bytes(), "executable", now);
        assert_eq!(matches!(got, Err(ResponseError::Expired)), expired, "{got:?}");
        assert_eq!(got.is_ok(), !expired, "{got:?}");
    }

    #[test_case(JWT_TOKEN_TYPE, json!({"id_token": "jwt-token"}), "jwt-token")]
    #[test_case(ID_TOKEN_TYPE, json!({"id_token": "oidc-token"}), "oidc-token")]
    #[test_case(SAML2_TOKEN_TYPE, json!({"saml_response": "saml-token"}), "saml-token")]
    fn token_types(token_type: &str, token: Value, want: &str) -> anyhow::Result<()> {
        let mut input = json!({"version": 1, "success": true, "token_type": token_type, "expiration_time": in_one_hour()});
        if let (Some(input), Some(token)) = (input.as_object_mut(), token.as_object()) {
            input.extend(token.clone());
        }
        let got = parse_response(
            input.to_string().as_bytes(),
            "executable",
            OffsetDateTime::now_utc(),
        )
        .map_err(|e| e.into_error())?;
        assert_eq!(got, want);
        Ok(())
    }

    #[test_case("", None, "missing `command`")]
    #[test_case("   ", None, "missing `command`")]
    #[test_case("cmd", Some(4_999), "timeout_millis")]
    #[test_case("cmd", Some(120_001), "timeout_millis")]
    fn invalid_config(command: &str, timeout_millis: Option<u64>, want: &str) {
        let config = ExecutableConfig {
            command: command.to_string(),
            timeout_millis,
            output_file: None,
        };
        let err = ExecutableSourcedCredentials::new(config).unwrap_err();
        assert!(err.is_configuration(), "{err:?}");
        assert!(err.to_string().contains(want), "{err}");
    }

    #[test]
    fn config() -> anyhow::Result<()> {
        let config = ExecutableConfig {
            command: "/usr/bin/cat  /some/file".to_string(),
            timeout_millis: Some(5_000),
            output_file: Some("/some/output".to_string()),
        };
        let source = ExecutableSourcedCredentials::new(config)?;
        assert_eq!(source.program, "/usr/bin/cat");
        assert_eq!(source.args, vec!["/some/file"]);
        assert_eq!(source.timeout, Duration::from_secs(5));
        assert_eq!(source.output_file.as_deref(), Some("/some/output"));

        let source = ExecutableSourcedCredentials::new(ExecutableConfig {
            command: "cmd".to_string(),
            ..Default::default()
        })?;
        assert_eq!(source.timeout, DEFAULT_TIMEOUT);
        Ok(())
    }

    #[test_case(IMPERSONATION_URL, Some("sa@project.iam.gserviceaccount.com"))]
    #[test_case("https://iamcredentials.googleapis.com/v1/projects/-/serviceAccounts/no-at-sign:generateAccessToken", None)]
    #[test_case("https://example.com", None)]
    fn impersonated_email(url: &str, want: Option<&str>) {
        assert_eq!(service_account_email(url).as_deref(), want);
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn runs_process() -> anyhow::Result<()> {
        let _e = ScopedEnv::set(ALLOW_EXECUTABLES_ENV, "1");
        let file = temp_file(&valid_response("from-process").to_string())?;
        let source = ExecutableSourcedCredentials::new(ExecutableConfig {
            command: format!("cat {}", file.path().to_string_lossy()),
            ..Default::default()
        })?;
        let token = source
            .subject_token(&Context::new(), &options(), None)
            .await?;
        assert_eq!(token, "from-process");
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_exit_code() -> anyhow::Result<()> {
        let output = ProcessRunner
            .run(&CommandSpec {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), "echo $GOOGLE_EXTERNAL_ACCOUNT_INTERACTIVE; exit 7".to_string()],
                env: vec![(INTERACTIVE_ENV.to_string(), "0".to_string())],
            })
            .await?;
        assert_eq!(output.code, Some(7));
        assert!(!output.success);
        assert_eq!(output.stdout, b"0\n");
        Ok(())
    }

    #[tokio::test]
    async fn process_not_found() {
        let err = ProcessRunner
            .run(&CommandSpec {
                program: "/does/not/exist/fetch-token".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_source(), "{err:?}");
    }
}
