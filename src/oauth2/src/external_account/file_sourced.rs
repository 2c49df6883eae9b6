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

/// Reads the subject token from a file, usually refreshed by some agent.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FileSourcedCredentials {
    pub(crate) file: String,
    pub(crate) format: SubjectTokenFormat,
}

impl FileSourcedCredentials {
    pub(crate) async fn subject_token(&self, ctx: &Context) -> Result<String> {
        let content = ctx
            .run(async {
                tokio::fs::read_to_string(&self.file).await.map_err(|e| {
                    Error::source(format!("cannot read subject token file {}: {e}", self.file))
                })
            })
            .await?;
        self.format.extract(content.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_file(content: &str) -> std::io::Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(content.as_bytes())?;
        Ok(file)
    }

    fn source(file: &NamedTempFile, format: SubjectTokenFormat) -> FileSourcedCredentials {
        FileSourcedCredentials {
            file: file.path().to_string_lossy().to_string(),
            format,
        }
    }

    #[tokio::test]
    async fn text_token() -> anyhow::Result<()> {
        let file = create_temp_file("an_example_token\n")?;
        let token = source(&file, SubjectTokenFormat::Text)
            .subject_token(&Context::new())
            .await?;
        assert_eq!(token, "an_example_token");
        Ok(())
    }

    #[tokio::test]
    async fn json_token() -> anyhow::Result<()> {
        let file = create_temp_file(&json!({"access_token": "an_example_token"}).to_string())?;
        let format = SubjectTokenFormat::Json("access_token".to_string());
        let token = source(&file, format).subject_token(&Context::new()).await?;
        assert_eq!(token, "an_example_token");
        Ok(())
    }

    #[tokio::test]
    async fn json_token_missing_field() -> anyhow::Result<()> {
        let file = create_temp_file(&json!({"wrong_field": "an_example_token"}).to_string())?;
        let format = SubjectTokenFormat::Json("access_token".to_string());
        let err = source(&file, format)
            .subject_token(&Context::new())
            .await
            .unwrap_err();
        assert!(err.is_source(), "{err:?}");
        assert!(err.to_string().contains("`access_token`"), "{err}");
        Ok(())
    }

    #[tokio::test]
    async fn json_token_from_empty_file() -> anyhow::Result<()> {
        let file = create_temp_file("")?;
        let format = SubjectTokenFormat::Json("access_token".to_string());
        let err = source(&file, format)
            .subject_token(&Context::new())
            .await
            .unwrap_err();
        assert!(err.is_source(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn file_not_found() {
        let source = FileSourcedCredentials {
            file: "/path/to/non/existent/file".to_string(),
            format: SubjectTokenFormat::Text,
        };
        let err = source.subject_token(&Context::new()).await.unwrap_err();
        assert!(err.is_source(), "{err:?}");
        assert!(err.to_string().contains("/path/to/non/existent/file"), "{err}");
    }
}
