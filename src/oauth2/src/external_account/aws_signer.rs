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

//! Signs requests with [AWS Signature Version 4].
//!
//! Only the subset needed to sign a `GetCallerIdentity` request is
//! implemented: the signature goes in the `Authorization` header and the
//! payload is always hashed.
//!
//! [AWS Signature Version 4]: https://docs.aws.amazon.com/IAM/latest/UserGuide/reference_sigv.html

use crate::Result;
use crate::errors::Error;
use hmac::{Hmac, Mac};
use http::header::{AUTHORIZATION, HOST, HeaderMap, HeaderName, HeaderValue};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use time::{OffsetDateTime, UtcOffset};

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const REQUEST_TYPE: &str = "aws4_request";
const DATE_HEADER: &str = "date";
pub(crate) const AMZ_DATE_HEADER: &str = "x-amz-date";
pub(crate) const SECURITY_TOKEN_HEADER: &str = "x-amz-security-token";

// RFC 3986 unreserved characters are left alone.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

type HmacSha256 = Hmac<Sha256>;

/// AWS credentials used to sign the `GetCallerIdentity` request.
#[derive(Clone, PartialEq, Eq, serde::Deserialize)]
pub struct AwsSecurityCredentials {
    #[serde(rename = "AccessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    pub secret_access_key: String,
    #[serde(rename = "Token", default)]
    pub session_token: Option<String>,
}

impl AwsSecurityCredentials {
    pub fn new<K, S>(access_key_id: K, secret_access_key: S) -> Self
    where
        K: Into<String>,
        S: Into<String>,
    {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token<T: Into<String>>(mut self, v: T) -> Self {
        self.session_token = Some(v.into());
        self
    }
}

impl std::fmt::Debug for AwsSecurityCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecurityCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[censored]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[censored]"),
            )
            .finish()
    }
}

/// A request to sign.
#[derive(Clone, Debug)]
pub(crate) struct AwsRequest {
    pub(crate) method: http::Method,
    pub(crate) url: url::Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,
}

impl AwsRequest {
    pub(crate) fn new(method: http::Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct RequestSigner {
    region: String,
    credentials: AwsSecurityCredentials,
}

impl RequestSigner {
    pub(crate) fn new(region: String, credentials: AwsSecurityCredentials) -> Self {
        Self {
            region,
            credentials,
        }
    }

    /// Adds the `host`, date, session token and `Authorization` headers.
    pub(crate) fn sign(&self, request: &mut AwsRequest, now: OffsetDateTime) -> Result<()> {
        let now = now.to_offset(UtcOffset::UTC);
        let host = request_host(&request.url)?;
        request.headers.insert(HOST, header_value(&host)?);
        if let Some(token) = &self.credentials.session_token {
            request.headers.insert(
                HeaderName::from_static(SECURITY_TOKEN_HEADER),
                header_value(token)?,
            );
        }
        if !request.headers.contains_key(DATE_HEADER)
            && !request.headers.contains_key(AMZ_DATE_HEADER)
        {
            request.headers.insert(
                HeaderName::from_static(AMZ_DATE_HEADER),
                header_value(&long_date(now))?,
            );
        }
        let authorization = self.authorization(request, &host, now)?;
        let mut value = header_value(&authorization)?;
        value.set_sensitive(true);
        request.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    fn authorization(
        &self,
        request: &AwsRequest,
        host: &str,
        now: OffsetDateTime,
    ) -> Result<String> {
        let (signed_headers, canonical_headers) = canonical_headers(&request.headers)?;
        let date = short_date(now);
        let service = host.split('.').next().unwrap_or_default();
        let scope = format!("{date}/{}/{service}/{REQUEST_TYPE}", self.region);

        let canonical_request = format!(
            "{}\n{}\n{}\n{canonical_headers}\n{signed_headers}\n{}",
            request.method,
            canonical_path(&request.url),
            canonical_query(&request.url),
            hex::encode(Sha256::digest(&request.body)),
        );
        let string_to_sign = format!(
            "{ALGORITHM}\n{}\n{scope}\n{}",
            long_date(now),
            hex::encode(Sha256::digest(canonical_request.as_bytes())),
        );

        let mut key = format!("AWS4{}", self.credentials.secret_access_key).into_bytes();
        for input in [
            date.as_str(),
            self.region.as_str(),
            service,
            REQUEST_TYPE,
            string_to_sign.as_str(),
        ] {
            key = hmac_sha256(&key, input.as_bytes())?;
        }

        Ok(format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={}",
            self.credentials.access_key_id,
            hex::encode(key),
        ))
    }
}

fn hmac_sha256(key: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(Error::internal)?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn header_value(v: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(v).map_err(Error::configuration)
}

fn request_host(url: &url::Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::configuration(format!("missing host in <{url}>")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn long_date(t: OffsetDateTime) -> String {
    format!(
        "{}T{:02}{:02}{:02}Z",
        short_date(t),
        t.hour(),
        t.minute(),
        t.second()
    )
}

fn short_date(t: OffsetDateTime) -> String {
    format!("{:04}{:02}{:02}", t.year(), u8::from(t.month()), t.day())
}

// Resolves dot segments, collapses duplicate slashes and drops the trailing
// slash.
fn canonical_path(url: &url::Url) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in url.path().split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

fn canonical_query(url: &url::Url) -> String {
    let mut pairs: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (k, v) in url.query_pairs() {
        pairs.entry(k.into_owned()).or_default().push(v.into_owned());
    }
    for values in pairs.values_mut() {
        values.sort();
    }
    pairs
        .iter()
        .flat_map(|(k, values)| {
            let k = utf8_percent_encode(k, QUERY_ENCODE_SET).to_string();
            values
                .iter()
                .map(move |v| format!("{k}={}", utf8_percent_encode(v, QUERY_ENCODE_SET)))
        })
        .collect::<Vec<_>>()
        .join("&")
}

// Returns the signed header names and the canonical header block.
fn canonical_headers(headers: &HeaderMap) -> Result<(String, String)> {
    let mut merged: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, value) in headers {
        let value = value.to_str().map_err(Error::configuration)?;
        merged.entry(name.as_str()).or_default().push(value);
    }
    let signed = merged.keys().copied().collect::<Vec<_>>().join(";");
    let block = merged
        .iter()
        .map(|(name, values)| format!("{name}:{}\n", values.join(",")))
        .collect::<String>();
    Ok((signed, block))
}

/// Converts a lowercase header name to `Canonical-Case`.
pub(crate) fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const ACCESS_KEY_ID: &str = "AKIDEXAMPLE";
    const SECRET_ACCESS_KEY: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";
    const SCOPE: &str = "AKIDEXAMPLE/20110909/us-east-1/host/aws4_request";

    fn now() -> OffsetDateTime {
        // Mon, 09 Sep 2011 23:36:00 GMT
        OffsetDateTime::from_unix_timestamp(1_315_611_360).expect("valid timestamp")
    }

    fn signer() -> RequestSigner {
        RequestSigner::new(
            "us-east-1".to_string(),
            AwsSecurityCredentials::new(ACCESS_KEY_ID, SECRET_ACCESS_KEY),
        )
    }

    fn request(method: http::Method, url: &str) -> AwsRequest {
        let mut request = AwsRequest::new(method, url::Url::parse(url).expect("valid url"));
        request.headers.insert(
            DATE_HEADER,
            HeaderValue::from_static("Mon, 09 Sep 2011 23:36:00 GMT"),
        );
        request
    }

    fn authorization(request: &AwsRequest) -> &str {
        request
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .expect("request is signed")
    }

    #[test_case("https://host.foo.com", "b27ccfbfa7df52a200ff74193ca6e32d4b48b8856fab7ebf1c595d0670a7e470"; "get vanilla")]
    #[test_case("https://host.foo.com/foo/bar/../..", "b27ccfbfa7df52a200ff74193ca6e32d4b48b8856fab7ebf1c595d0670a7e470"; "get relative relative")]
    #[test_case("https://host.foo.com/./", "b27ccfbfa7df52a200ff74193ca6e32d4b48b8856fab7ebf1c595d0670a7e470"; "get slash dot slash")]
    #[test_case("https://host.foo.com/%E1%88%B4", "8d6634c189aa8c75c2e51e106b6b5121bed103fdb351f7d7d4381c738823af74"; "get utf8")]
    #[test_case("https://host.foo.com/?foo=Zoo&foo=aha", "be7148d34ebccdc6423b19085378aa0bee970bdc61d144bd1a8c48c33079ab09"; "get query order value")]
    fn sign_get(url: &str, signature: &str) -> anyhow::Result<()> {
        let mut request = request(http::Method::GET, url);
        signer().sign(&mut request, now())?;
        let want = format!(
            "AWS4-HMAC-SHA256 Credential={SCOPE}, SignedHeaders=date;host, Signature={signature}"
        );
        assert_eq!(authorization(&request), want);
        assert!(!request.headers.contains_key(AMZ_DATE_HEADER));
        Ok(())
    }

    #[test]
    fn sign_post_header_key_case() -> anyhow::Result<()> {
        let mut request = request(http::Method::POST, "https://host.foo.com");
        request
            .headers
            .insert("zoo", HeaderValue::from_static("ZOOBAR"));
        signer().sign(&mut request, now())?;
        assert_eq!(
            authorization(&request),
            format!(
                "AWS4-HMAC-SHA256 Credential={SCOPE}, SignedHeaders=date;host;zoo, Signature=273313af9d0c265c531e11db70bbd653f3ba074c1009239e8559d3987039cad7"
            )
        );
        Ok(())
    }

    #[test]
    fn sign_post_form() -> anyhow::Result<()> {
        let mut request = request(http::Method::POST, "https://host.foo.com");
        request.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        request.body = b"foo=bar".to_vec();
        signer().sign(&mut request, now())?;
        assert_eq!(
            authorization(&request),
            format!(
                "AWS4-HMAC-SHA256 Credential={SCOPE}, SignedHeaders=content-type;date;host, Signature=5a15b22cf462f047318703b92e6f4f38884e4a7ab7b1d6426ca46a8bd1c26cbc"
            )
        );
        Ok(())
    }

    #[test]
    fn adds_amz_date_and_session_token() -> anyhow::Result<()> {
        let signer = RequestSigner::new(
            "us-east-2".to_string(),
            AwsSecurityCredentials::new(ACCESS_KEY_ID, SECRET_ACCESS_KEY)
                .with_session_token("session-token"),
        );
        let mut request = AwsRequest::new(
            http::Method::POST,
            url::Url::parse("https://sts.us-east-2.amazonaws.com?Action=GetCallerIdentity&Version=2011-06-15")?,
        );
        signer.sign(&mut request, now())?;

        let header = |name: &str| {
            request
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        assert_eq!(header(AMZ_DATE_HEADER).as_deref(), Some("20110909T233600Z"));
        assert_eq!(
            header(SECURITY_TOKEN_HEADER).as_deref(),
            Some("session-token")
        );
        assert_eq!(
            header("host").as_deref(),
            Some("sts.us-east-2.amazonaws.com")
        );
        let authorization = authorization(&request);
        assert!(
            authorization.starts_with(
                "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20110909/us-east-2/sts/aws4_request, SignedHeaders=host;x-amz-date;x-amz-security-token, Signature="
            ),
            "{authorization}"
        );
        Ok(())
    }

    #[test]
    fn deterministic() -> anyhow::Result<()> {
        let mut first = request(http::Method::GET, "https://host.foo.com");
        let mut second = first.clone();
        signer().sign(&mut first, now())?;
        signer().sign(&mut second, now())?;
        assert_eq!(authorization(&first), authorization(&second));
        Ok(())
    }

    #[test_case("https://host.foo.com", "/")]
    #[test_case("https://host.foo.com/a//b/", "/a/b")]
    #[test_case("https://host.foo.com/a/./b/../c", "/a/c")]
    fn path(url: &str, want: &str) -> anyhow::Result<()> {
        assert_eq!(canonical_path(&url::Url::parse(url)?), want);
        Ok(())
    }

    #[test]
    fn query() -> anyhow::Result<()> {
        let url = url::Url::parse("https://host.foo.com/?b=2&a=x y&b=1&c=%2F")?;
        assert_eq!(canonical_query(&url), "a=x%20y&b=1&b=2&c=%2F");
        Ok(())
    }

    #[test_case("host", "Host")]
    #[test_case("x-goog-cloud-target-resource", "X-Goog-Cloud-Target-Resource")]
    #[test_case("x-amz-date", "X-Amz-Date")]
    fn header_name(input: &str, want: &str) {
        assert_eq!(canonical_header_name(input), want);
    }

    #[test]
    fn debug_is_censored() {
        let creds = AwsSecurityCredentials::new(ACCESS_KEY_ID, SECRET_ACCESS_KEY)
            .with_session_token("session-token");
        let got = format!("{creds:?}");
        assert!(got.contains(ACCESS_KEY_ID), "{got}");
        assert!(!got.contains(SECRET_ACCESS_KEY), "{got}");
        assert!(!got.contains("session-token"), "{got}");
    }
}
