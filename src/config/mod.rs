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

pub mod auth;

use std::time::Duration;

use auth::AuthToken;

use crate::notification::NotificationFilter;

const DEFAULT_USER_AGENT: &str = env!("NEO4J_DEFAULT_USER_AGENT");
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable configuration a [`crate::io::bolt::Connection`] is opened
/// with. Once a version is negotiated, the connection carries a derived
/// copy with the negotiated version filled in; credentials themselves are
/// never mutated after construction.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub(crate) auth: AuthToken,
    pub(crate) user_agent: String,
    pub(crate) database: Option<String>,
    pub(crate) notification_filter: NotificationFilter,
    pub(crate) connect_timeout: Option<Duration>,
    pub(crate) socket_timeout: Option<Duration>,
    pub(crate) keep_alive: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            auth: AuthToken::none(),
            user_agent: String::from(DEFAULT_USER_AGENT),
            database: None,
            notification_filter: NotificationFilter::default(),
            connect_timeout: Some(DEFAULT_CONNECTION_TIMEOUT),
            socket_timeout: None,
            keep_alive: false,
        }
    }
}

impl ConnectionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auth(mut self, auth: AuthToken) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn without_database(mut self) -> Self {
        self.database = None;
        self
    }

    pub fn with_notification_filter(mut self, filter: NotificationFilter) -> Self {
        self.notification_filter = filter;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn without_connect_timeout(mut self) -> Self {
        self.connect_timeout = None;
        self
    }

    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = Some(timeout);
        self
    }

    pub fn without_socket_timeout(mut self) -> Self {
        self.socket_timeout = None;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_connect_timeout() {
        let settings = ConnectionSettings::default();
        assert_eq!(settings.connect_timeout, Some(DEFAULT_CONNECTION_TIMEOUT));
        assert_eq!(settings.socket_timeout, None);
    }

    #[test]
    fn test_builder() {
        let settings = ConnectionSettings::new()
            .with_database("neo4j")
            .with_user_agent("my-app/1.0")
            .without_connect_timeout();
        assert_eq!(settings.database(), Some("neo4j"));
        assert_eq!(settings.user_agent(), "my-app/1.0");
        assert_eq!(settings.connect_timeout, None);
    }
}
