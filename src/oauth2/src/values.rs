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

//! An ordered multimap of form parameters.

use std::collections::BTreeMap;
use url::form_urlencoded;

/// Parameters for query strings and `application/x-www-form-urlencoded`
/// bodies.
///
/// Keys are kept sorted, so the encoded form is deterministic: keys appear in
/// lexicographic order and values for the same key keep their insertion
/// order.
///
/// # Example
/// ```
/// # use google_cloud_oauth2::values::Values;
/// let mut v = Values::new();
/// v.set("scope", "a b");
/// v.set("grant_type", "client_credentials");
/// assert_eq!(v.encode(), "grant_type=client_credentials&scope=a+b");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Values(BTreeMap<String, Vec<String>>);

impl Values {
    /// Creates an empty set of parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any existing values for `key`.
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    /// Appends a value for `key`.
    pub fn add<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Returns the first value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Returns all the values for `key`.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Removes all the values for `key`.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(key, value)` pairs in encoding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// Copies every value in `other` into `self`, replacing existing keys.
    pub fn merge(&mut self, other: &Values) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Encodes the parameters, sorted by key.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(self.iter());
        serializer.finish()
    }

    /// Parses a query string or form body.
    ///
    /// Invalid percent escapes are kept as-is, mirroring how browsers treat
    /// them.
    pub fn parse(input: &str) -> Self {
        Self::parse_bytes(input.as_bytes())
    }

    pub(crate) fn parse_bytes(input: &[u8]) -> Self {
        let mut values = Values::new();
        for (k, v) in form_urlencoded::parse(input) {
            values.add(k, v);
        }
        values
    }
}

impl<K, V> FromIterator<(K, V)> for Values
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut values = Values::new();
        for (k, v) in iter {
            values.add(k, v);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn encode_sorted() {
        let mut v = Values::new();
        v.set("state", "state");
        v.set("response_type", "code");
        v.set("client_id", "CLIENT_ID");
        v.set("scope", "scope1 scope2");
        assert_eq!(
            v.encode(),
            "client_id=CLIENT_ID&response_type=code&scope=scope1+scope2&state=state"
        );
    }

    #[test]
    fn encode_escapes() {
        let mut v = Values::new();
        v.set("redirect_uri", "https://example.com/cb?x=1&y=2");
        v.set("subject_token_type", "urn:ietf:params:oauth:token-type:jwt");
        assert_eq!(
            v.encode(),
            "redirect_uri=https%3A%2F%2Fexample.com%2Fcb%3Fx%3D1%26y%3D2&subject_token_type=urn%3Aietf%3Aparams%3Aoauth%3Atoken-type%3Ajwt"
        );
    }

    #[test]
    fn multiple_values() {
        let mut v = Values::new();
        v.add("b", "2");
        v.add("a", "1");
        v.add("b", "1");
        assert_eq!(v.encode(), "a=1&b=2&b=1");
        assert_eq!(v.get("b"), Some("2"));
        assert_eq!(v.get_all("b"), &["2".to_string(), "1".to_string()]);
        assert!(v.get_all("c").is_empty());

        v.set("b", "3");
        assert_eq!(v.encode(), "a=1&b=3");
        assert_eq!(v.remove("a"), Some(vec!["1".to_string()]));
        assert!(!v.contains_key("a"));
    }

    #[test]
    fn parse() {
        let v = Values::parse("access_token=abc&token_type=bearer&scope=a+b%20c&empty=");
        assert_eq!(v.get("access_token"), Some("abc"));
        assert_eq!(v.get("token_type"), Some("bearer"));
        assert_eq!(v.get("scope"), Some("a b c"));
        assert_eq!(v.get("empty"), Some(""));
        assert_eq!(v.get("missing"), None);
    }

    #[test]
    fn merge_and_collect() {
        let mut v: Values = [("audience", "a"), ("scope", "s")].into_iter().collect();
        let extra: Values = [("audience", "b"), ("resource", "r")].into_iter().collect();
        v.merge(&extra);
        assert_eq!(v.encode(), "audience=b&resource=r&scope=s");
        assert!(!v.is_empty());
        assert!(Values::new().is_empty());
    }
}
