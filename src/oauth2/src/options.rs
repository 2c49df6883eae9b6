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

use crate::values::Values;

/// An extra parameter for the authorization URL or the token exchange.
///
/// Options are applied after the standard parameters, so they can override
/// any of them.
///
/// # Example
/// ```
/// # use google_cloud_oauth2::options::AuthCodeOption;
/// let options = [
///     AuthCodeOption::access_type_offline(),
///     AuthCodeOption::set_param("prompt", "consent"),
/// ];
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthCodeOption {
    key: String,
    value: String,
}

impl AuthCodeOption {
    /// Sets `key` to `value`, replacing any previous value.
    pub fn set_param<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Requests a token that is only valid while the user is present.
    pub fn access_type_online() -> Self {
        Self::set_param("access_type", "online")
    }

    /// Requests a refresh token, so the application can refresh access
    /// tokens while the user is not present.
    pub fn access_type_offline() -> Self {
        Self::set_param("access_type", "offline")
    }

    /// Forces the user to approve the application, even if they did so
    /// before.
    pub fn approval_force() -> Self {
        Self::set_param("prompt", "consent")
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub(crate) fn apply(&self, values: &mut Values) {
        values.set(self.key.clone(), self.value.clone());
    }
}
