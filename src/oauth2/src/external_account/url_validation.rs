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

//! Validates the STS and impersonation endpoints of external accounts.

use crate::Result;
use crate::errors::Error;
use regex::Regex;
use std::sync::LazyLock;

type Patterns = std::result::Result<Vec<Regex>, regex::Error>;

static STS_HOSTS: LazyLock<Patterns> = LazyLock::new(|| host_patterns("sts"));
static IAM_CREDENTIALS_HOSTS: LazyLock<Patterns> =
    LazyLock::new(|| host_patterns("iamcredentials"));
static LOOPBACK_HOST: LazyLock<Patterns> =
    LazyLock::new(|| Ok(vec![Regex::new(r"^127\.0\.0\.1$")?]));

fn host_patterns(service: &str) -> Patterns {
    [
        format!(r"^[^\.\s\/\\]+\.{service}\.googleapis\.com$"),
        format!(r"^{service}\.googleapis\.com$"),
        format!(r"^{service}\.[^\.\s\/\\]+\.googleapis\.com$"),
        format!(r"^[^\.\s\/\\]+-{service}\.googleapis\.com$"),
        format!(r"^{service}-[^\.\s\/\\]+\.p\.googleapis\.com$"),
    ]
    .iter()
    .map(|p| Regex::new(p))
    .collect()
}

fn matches(patterns: &Patterns, host: &str) -> std::result::Result<bool, String> {
    let patterns = patterns.as_ref().map_err(|e| e.to_string())?;
    Ok(patterns.iter().any(|p| p.is_match(host)))
}

/// Which endpoints an external account may talk to.
///
/// The default only allows `https` and the Google hosts. Tests relax it to
/// reach local fake servers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct UrlPolicy {
    pub(crate) allow_loopback: bool,
}

impl UrlPolicy {
    #[cfg(test)]
    pub(crate) fn loopback() -> Self {
        Self {
            allow_loopback: true,
        }
    }

    pub(crate) fn validate_token_url(&self, url: &str) -> Result<()> {
        self.validate(url, &STS_HOSTS)
            .map_err(|e| Error::configuration(format!("invalid `token_url` <{url}>: {e}")))
    }

    pub(crate) fn validate_impersonation_url(&self, url: &str) -> Result<()> {
        self.validate(url, &IAM_CREDENTIALS_HOSTS).map_err(|e| {
            Error::configuration(format!(
                "invalid `service_account_impersonation_url` <{url}>: {e}"
            ))
        })
    }

    fn validate(&self, url: &str, patterns: &Patterns) -> std::result::Result<(), String> {
        let parsed = url::Url::parse(url).map_err(|e| e.to_string())?;
        let scheme_ok = match parsed.scheme() {
            "https" => true,
            "http" => self.allow_loopback,
            _ => false,
        };
        if !scheme_ok {
            return Err(format!("the `{}` scheme is not allowed", parsed.scheme()));
        }
        let host = parsed
            .host_str()
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| "missing host".to_string())?;
        if matches(patterns, &host)? {
            return Ok(());
        }
        if self.allow_loopback && matches(&LOOPBACK_HOST, &host)? {
            return Ok(());
        }
        Err(format!("the host `{host}` is not allowed"))
    }
}
