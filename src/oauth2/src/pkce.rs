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

//! Proof Key for Code Exchange ([RFC 7636]).
//!
//! [RFC 7636]: https://www.rfc-editor.org/rfc/rfc7636

use crate::Result;
use crate::errors::Error;
use crate::options::AuthCodeOption;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256, Sha512};

const MIN_VERIFIER_LENGTH: usize = 43;
const MAX_VERIFIER_LENGTH: usize = 128;
const DEFAULT_VERIFIER_LENGTH: usize = 64;

// RFC 7636 section 4.1, "unreserved" characters.
const UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// The code challenge method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PkceMethod {
    /// The challenge is the verifier.
    Plain,
    /// The challenge is `BASE64URL(SHA256(verifier))`.
    #[default]
    S256,
    /// The challenge is `BASE64URL(SHA512(verifier))`.
    S512,
}

impl PkceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::S256 => "S256",
            Self::S512 => "S512",
        }
    }

    fn challenge(&self, verifier: &str) -> String {
        match self {
            Self::Plain => verifier.to_string(),
            Self::S256 => URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())),
            Self::S512 => URL_SAFE_NO_PAD.encode(Sha512::digest(verifier.as_bytes())),
        }
    }
}

impl std::str::FromStr for PkceMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(Self::Plain),
            "S256" => Ok(Self::S256),
            "S512" => Ok(Self::S512),
            _ => Err(Error::configuration(format!(
                "unknown PKCE code challenge method <{s}>"
            ))),
        }
    }
}

impl std::fmt::Display for PkceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A code verifier and its challenge.
///
/// Create a new `Pkce` for each authorization attempt. Send the
/// [auth_code_options][Pkce::auth_code_options] with the authorization
/// request and the [verifier_option][Pkce::verifier_option] with the code
/// exchange.
///
/// # Example
/// ```
/// # use google_cloud_oauth2::pkce::Pkce;
/// # fn sample() -> google_cloud_oauth2::Result<()> {
/// let pkce = Pkce::new()?;
/// assert_eq!(pkce.verifier().len(), 64);
/// assert_eq!(pkce.method().as_str(), "S256");
/// # Ok(()) }
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Pkce {
    verifier: String,
    challenge: String,
    method: PkceMethod,
}

impl Pkce {
    /// A 64 character random verifier with the `S256` method.
    pub fn new() -> Result<Self> {
        Self::with_method_and_length(PkceMethod::S256, DEFAULT_VERIFIER_LENGTH)
    }

    /// A random verifier of `length` characters, which must be in the
    /// `[43, 128]` range.
    pub fn with_method_and_length(method: PkceMethod, length: usize) -> Result<Self> {
        check_length(length)?;
        let verifier = random_verifier(length)?;
        Ok(Self::build(method, verifier))
    }

    /// Uses an existing verifier.
    pub fn from_verifier<T: Into<String>>(method: PkceMethod, verifier: T) -> Result<Self> {
        let verifier = verifier.into();
        check_length(verifier.len())?;
        if let Some(c) = verifier.bytes().find(|c| !UNRESERVED.contains(c)) {
            return Err(Error::configuration(format!(
                "the PKCE code verifier contains an invalid character <{}>",
                char::from(c)
            )));
        }
        Ok(Self::build(method, verifier))
    }

    fn build(method: PkceMethod, verifier: String) -> Self {
        let challenge = method.challenge(&verifier);
        Self {
            verifier,
            challenge,
            method,
        }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    pub fn method(&self) -> PkceMethod {
        self.method
    }

    /// The `code_challenge` and `code_challenge_method` parameters.
    pub fn auth_code_options(&self) -> [AuthCodeOption; 2] {
        [
            AuthCodeOption::set_param("code_challenge", self.challenge.clone()),
            AuthCodeOption::set_param("code_challenge_method", self.method.as_str()),
        ]
    }

    /// The `code_verifier` parameter.
    pub fn verifier_option(&self) -> AuthCodeOption {
        AuthCodeOption::set_param("code_verifier", self.verifier.clone())
    }
}

impl std::fmt::Debug for Pkce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pkce")
            .field("verifier", &"[censored]")
            .field("challenge", &self.challenge)
            .field("method", &self.method)
            .finish()
    }
}

fn check_length(length: usize) -> Result<()> {
    if !(MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH).contains(&length) {
        return Err(Error::configuration(format!(
            "the PKCE code verifier length must be between {MIN_VERIFIER_LENGTH} and {MAX_VERIFIER_LENGTH}, got {length}"
        )));
    }
    Ok(())
}

fn random_verifier(length: usize) -> Result<String> {
    // Rejection sampling keeps the distribution uniform over the alphabet.
    let limit = 256 - 256 % UNRESERVED.len();
    let mut verifier = String::with_capacity(length);
    let mut buffer = [0_u8; 64];
    while verifier.len() < length {
        OsRng
            .try_fill_bytes(&mut buffer)
            .map_err(Error::internal)?;
        let accepted = buffer
            .iter()
            .map(|b| usize::from(*b))
            .filter(|b| *b < limit)
            .map(|b| char::from(UNRESERVED[b % UNRESERVED.len()]))
            .take(length - verifier.len());
        verifier.extend(accepted);
    }
    Ok(verifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use test_case::test_case;

    #[test]
    fn new_defaults() -> anyhow::Result<()> {
        let pkce = Pkce::new()?;
        assert_eq!(pkce.verifier().len(), 64);
        assert_eq!(pkce.method(), PkceMethod::S256);
        assert!(pkce.verifier().bytes().all(|c| UNRESERVED.contains(&c)));
        assert_eq!(
            pkce.challenge(),
            URL_SAFE_NO_PAD.encode(Sha256::digest(pkce.verifier().as_bytes()))
        );
        Ok(())
    }

    #[test]
    fn new_is_random() -> anyhow::Result<()> {
        let a = Pkce::new()?;
        let b = Pkce::new()?;
        assert_ne!(a.verifier(), b.verifier());
        Ok(())
    }

    #[test_case(43)]
    #[test_case(100)]
    #[test_case(128)]
    fn lengths(length: usize) -> anyhow::Result<()> {
        let pkce = Pkce::with_method_and_length(PkceMethod::S512, length)?;
        assert_eq!(pkce.verifier().len(), length);
        assert_eq!(
            pkce.challenge(),
            URL_SAFE_NO_PAD.encode(Sha512::digest(pkce.verifier().as_bytes()))
        );
        Ok(())
    }

    #[test_case(0)]
    #[test_case(42)]
    #[test_case(129)]
    fn bad_lengths(length: usize) {
        let err = Pkce::with_method_and_length(PkceMethod::S256, length).unwrap_err();
        assert!(err.is_configuration(), "{err:?}");
        assert!(err.to_string().contains(&length.to_string()), "{err}");
    }

    #[test]
    fn plain() -> anyhow::Result<()> {
        let pkce = Pkce::with_method_and_length(PkceMethod::Plain, 50)?;
        assert_eq!(pkce.challenge(), pkce.verifier());
        Ok(())
    }

    #[test]
    fn rfc7636_appendix_b() -> anyhow::Result<()> {
        let pkce = Pkce::from_verifier(
            PkceMethod::S256,
            "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk",
        )?;
        assert_eq!(pkce.challenge(), "E9Melhoa2OwvFrEMTJguCQaoWrHUXGTyRh-ckoWv2rA");
        Ok(())
    }

    #[test]
    fn from_verifier_bad_character() {
        let verifier = format!("{}+", "a".repeat(50));
        let err = Pkce::from_verifier(PkceMethod::S256, verifier).unwrap_err();
        assert!(err.is_configuration(), "{err:?}");
    }

    #[test_case("plain", PkceMethod::Plain)]
    #[test_case("S256", PkceMethod::S256)]
    #[test_case("S512", PkceMethod::S512)]
    fn method_from_str(input: &str, want: PkceMethod) -> anyhow::Result<()> {
        let got = PkceMethod::from_str(input)?;
        assert_eq!(got, want);
        assert_eq!(got.to_string(), input);
        Ok(())
    }

    #[test]
    fn method_from_str_unknown() {
        let err = PkceMethod::from_str("S384").unwrap_err();
        assert!(err.is_configuration(), "{err:?}");
    }

    #[test]
    fn options() -> anyhow::Result<()> {
        let pkce = Pkce::new()?;
        let [challenge, method] = pkce.auth_code_options();
        assert_eq!(challenge.key(), "code_challenge");
        assert_eq!(challenge.value(), pkce.challenge());
        assert_eq!(method.key(), "code_challenge_method");
        assert_eq!(method.value(), "S256");
        let verifier = pkce.verifier_option();
        assert_eq!(verifier.key(), "code_verifier");
        assert_eq!(verifier.value(), pkce.verifier());
        Ok(())
    }

    #[test]
    fn debug() -> anyhow::Result<()> {
        let pkce = Pkce::new()?;
        let got = format!("{pkce:?}");
        assert!(!got.contains(pkce.verifier()), "{got}");
        assert!(got.contains(pkce.challenge()), "{got}");
        Ok(())
    }
}
