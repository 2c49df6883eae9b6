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

use super::SubjectTokenFormat;
use crate::Result;
use crate::context::Context;
use crate::errors::Error;
use crate::token_request::read_limited;
use std::collections::BTreeMap;

/// Fetches the subject token from a local metadata endpoint.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct UrlSourcedCredentials {
    pub(crate) url: String,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) format: SubjectTokenFormat,
}

impl UrlSourcedCredentials {
    pub(crate) async fn subject_token(&self, ctx: &Context) -> Result<String> {
        let client = ctx.http_client()?;
        let request = self
            .headers
            .iter()
            .fold(client.get(&self.url), |r, (k, v)| {
                r.header(k.as_str(), v.as_str())
            });

        let body = ctx
            .run(async {
                let response = request.send().await.map_err(Error::from_http)?;
                let status = response.status();
                let body = read_limited(response).await?;
                if !status.is_success() {
                    return Err(Error::source(format!(
                        "cannot fetch subject token from {}, status={status}, body=<{}>",
                        self.url,
                        String::from_utf8_lossy(&body)
                    )));
                }
                Ok(body)
            })
            .await?;
        let content = String::from_utf8(body.to_vec())
            .map_err(|e| Error::source(format!("subject token is not UTF-8: {e}")))?;
        self.format.extract(content.trim_end())
    }
}
