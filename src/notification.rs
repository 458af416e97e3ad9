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

use crate::value::ValueReceive;

/// Which notifications the server should send back, requested via BEGIN/RUN
/// extras `notifications_minimum_severity` / `notifications_disabled_categories`.
/// Only meaningful for connections negotiated at Bolt ≥ 5.2
/// (`CapabilitySet::notification_filtering`); the core does not enforce
/// this itself, callers must check the capability before setting it.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct NotificationFilter {
    /// Request the server to only send notifications of this severity or
    /// higher. `None` leaves the choice to the server.
    pub minimum_severity: Option<MinimumSeverity>,
    /// Request the server to not send notifications of these categories.
    /// `None` leaves the choice to the server; `Some(vec![])` disables
    /// nothing explicitly.
    pub disabled_categories: Option<Vec<DisabledCategory>>,
}

impl NotificationFilter {
    /// A filter that requests the server send no notifications at all.
    pub fn disable_all() -> Self {
        Self {
            minimum_severity: Some(MinimumSeverity::Disabled),
            disabled_categories: None,
        }
    }

    pub(crate) fn is_default(&self) -> bool {
        self.minimum_severity.is_none() && self.disabled_categories.is_none()
    }
}

/// See [`NotificationFilter::minimum_severity`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum MinimumSeverity {
    Disabled,
    Warning,
    Information,
}

impl MinimumSeverity {
    pub(crate) fn as_protocol_str(&self) -> &'static str {
        match self {
            Self::Disabled => "OFF",
            Self::Warning => "WARNING",
            Self::Information => "INFORMATION",
        }
    }
}

/// See [`NotificationFilter::disabled_categories`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum DisabledCategory {
    Hint,
    Unrecognized,
    Unsupported,
    Performance,
    Deprecation,
    Generic,
    /// Requires Bolt ≥ 5.? / Neo4j 5.13; rejected by older servers with a
    /// `ServerError`.
    Security,
    Topology,
}

impl DisabledCategory {
    pub(crate) fn as_protocol_str(&self) -> &'static str {
        match self {
            Self::Hint => "HINT",
            Self::Unrecognized => "UNRECOGNIZED",
            Self::Unsupported => "UNSUPPORTED",
            Self::Performance => "PERFORMANCE",
            Self::Deprecation => "DEPRECATION",
            Self::Generic => "GENERIC",
            Self::Security => "SECURITY",
            Self::Topology => "TOPOLOGY",
        }
    }
}

/// A position within a query's source text, as reported by a notification.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Position {
    pub offset: i64,
    pub line: i64,
    pub column: i64,
}

/// A server-reported notification, extracted from a SUCCESS response's
/// `notifications` metadata entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub code: String,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub category: Option<String>,
    pub position: Option<Position>,
}

impl Notification {
    pub(crate) fn from_value(value: ValueReceive) -> Option<Self> {
        let mut map = value.into_map()?;
        let code = map.remove("code")?.into_string()?;
        let title = map.remove("title")?.into_string()?;
        let description = map.remove("description")?.into_string()?;
        let severity = map
            .remove("severity")
            .and_then(ValueReceive::into_string)
            .unwrap_or_default();
        let category = map.remove("category").and_then(ValueReceive::into_string);
        let position = map.remove("position").and_then(|position| {
            let mut position = position.into_map()?;
            Some(Position {
                offset: position.remove("offset")?.as_int()?,
                line: position.remove("line")?.as_int()?,
                column: position.remove("column")?.as_int()?,
            })
        });
        Some(Notification {
            code,
            title,
            description,
            severity,
            category,
            position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_value() {
        let value = ValueReceive::Map(HashMap::from([
            ("code".into(), ValueReceive::String("Neo.ClientNotification.Statement.CartesianProductWarning".into())),
            ("title".into(), ValueReceive::String("cartesian product".into())),
            ("description".into(), ValueReceive::String("...".into())),
            ("severity".into(), ValueReceive::String("WARNING".into())),
            ("category".into(), ValueReceive::String("PERFORMANCE".into())),
            (
                "position".into(),
                ValueReceive::Map(HashMap::from([
                    ("offset".into(), ValueReceive::Integer(10)),
                    ("line".into(), ValueReceive::Integer(2)),
                    ("column".into(), ValueReceive::Integer(4)),
                ])),
            ),
        ]));
        let notification = Notification::from_value(value).unwrap();
        assert_eq!(notification.severity, "WARNING");
        assert_eq!(
            notification.position,
            Some(Position {
                offset: 10,
                line: 2,
                column: 4
            })
        );
    }

    #[test]
    fn test_from_value_missing_position() {
        let value = ValueReceive::Map(HashMap::from([
            ("code".into(), ValueReceive::String("x".into())),
            ("title".into(), ValueReceive::String("x".into())),
            ("description".into(), ValueReceive::String("x".into())),
        ]));
        let notification = Notification::from_value(value).unwrap();
        assert_eq!(notification.position, None);
    }
}
