// Copyright Rouven Bauer
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;

use crate::value::ValueSend;
use crate::value_map;

/// Credentials carried in HELLO (Bolt ≤ 5.0) or LOGON (Bolt ≥ 5.1).
///
/// Stored as a raw `scheme`-tagged map rather than a closed set of variants
/// because the server, not this crate, defines which schemes exist.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthToken {
    pub(crate) data: HashMap<String, ValueSend>,
}

impl AuthToken {
    pub fn none() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            data: value_map!({
                "scheme": "basic",
                "principal": username.into(),
                "credentials": password.into(),
            }),
        }
    }

    pub fn basic_with_realm(
        username: impl Into<String>,
        password: impl Into<String>,
        realm: impl Into<String>,
    ) -> Self {
        let mut token = Self::basic(username, password);
        token.data.insert("realm".into(), realm.into().into());
        token
    }

    pub fn bearer(base64_encoded_token: impl Into<String>) -> Self {
        Self {
            data: value_map!({
                "scheme": "bearer",
                "credentials": base64_encoded_token.into(),
            }),
        }
    }

    pub fn custom(
        principal: Option<String>,
        credentials: Option<String>,
        realm: Option<String>,
        scheme: impl Into<String>,
        parameters: Option<HashMap<String, ValueSend>>,
    ) -> Self {
        let mut data = HashMap::new();
        if let Some(principal) = principal {
            data.insert("principal".into(), principal.into());
        }
        if let Some(credentials) = credentials {
            data.insert("credentials".into(), credentials.into());
        }
        if let Some(realm) = realm {
            data.insert("realm".into(), realm.into());
        }
        data.insert("scheme".into(), scheme.into().into());
        if let Some(parameters) = parameters {
            data.insert(
                "parameters".into(),
                ValueSend::Map(parameters),
            );
        }
        Self { data }
    }

    pub(crate) fn is_none(&self) -> bool {
        self.data.is_empty()
    }

    /// Everything except `scheme`/`principal`/`credentials`, moved into
    /// LOGON at Bolt ≥ 5.1; stays in HELLO's extra for older versions.
    pub(crate) fn reauth_keys(&self) -> HashMap<String, ValueSend> {
        self.data
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "scheme" | "principal" | "credentials"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        let token = AuthToken::basic("neo4j", "pass");
        assert_eq!(
            token.data.get("scheme"),
            Some(&ValueSend::String("basic".into()))
        );
        assert_eq!(
            token.data.get("principal"),
            Some(&ValueSend::String("neo4j".into()))
        );
        assert_eq!(
            token.data.get("credentials"),
            Some(&ValueSend::String("pass".into()))
        );
    }

    #[test]
    fn test_none_is_empty() {
        assert!(AuthToken::none().is_none());
        assert!(!AuthToken::basic("a", "b").is_none());
    }
}
