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
use std::fmt::{Display, Formatter};
use std::io;
use thiserror::Error;

use crate::value::ValueReceive;

pub type Result<T> = std::result::Result<T, Neo4jError>;

/// Errors this crate's connection can produce.
///
/// Transport errors (`Connection`) and `Protocol` errors mark the connection
/// broken; server-reported errors (`ServerError`) only abort the current
/// batch and are recoverable with `RESET`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Neo4jError {
    /// The transport could not be opened, or broke while in use: a failed
    /// connect, a dropped socket, an I/O error mid read/write.
    #[error("connection failed: {message}")]
    Connection {
        message: String,
        source: Option<io::Error>,
    },
    /// The driver encountered a protocol violation: malformed framing, an
    /// unknown response signature, a capability precondition not met by the
    /// negotiated version. This is either a bug in this crate or the server.
    #[error(
        "the driver encountered a protocol violation, \
        this is likely a bug in the driver or the server: {message}"
    )]
    Protocol { message: String },
    /// A local precondition failed that has nothing to do with the wire:
    /// an unsupported parameter value (e.g. a list longer than `u32::MAX`),
    /// a misconfigured setting, or a non-I/O serialization failure.
    #[error("invalid configuration: {message}")]
    Service { message: String },
    /// The server answered with a `FAILURE` response.
    #[error("{0}")]
    ServerError(ServerError),
}

impl Neo4jError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Neo4jError::ServerError(err) => err.is_retryable(),
            Neo4jError::Connection { .. } => true,
            _ => false,
        }
    }

    pub(crate) fn read_err(err: io::Error) -> Self {
        Self::Connection {
            message: format!("failed to read: {err}"),
            source: Some(err),
        }
    }

    pub(crate) fn wrap_read<T>(res: io::Result<T>) -> Result<T> {
        res.map_err(Self::read_err)
    }

    pub(crate) fn write_err(err: io::Error) -> Self {
        Self::Connection {
            message: format!("failed to write: {err}"),
            source: Some(err),
        }
    }

    pub(crate) fn wrap_write<T>(res: io::Result<T>) -> Result<T> {
        res.map_err(Self::write_err)
    }

    pub(crate) fn connect_err(err: io::Error) -> Self {
        Self::Connection {
            message: format!("failed to open connection: {err}"),
            source: Some(err),
        }
    }

    pub(crate) fn wrap_connect<T>(res: io::Result<T>) -> Result<T> {
        res.map_err(Self::connect_err)
    }

    pub(crate) fn disconnect<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub(crate) fn service<S: Into<String>>(message: S) -> Self {
        Self::Service {
            message: message.into(),
        }
    }
}

/// The classification a `FAILURE` response's dotted `code` resolves to.
///
/// Derived purely from the code by splitting on `.`; never inferred from
/// the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    Authentication,
    Security,
    Syntax,
    Constraint,
    Transaction,
    Protocol,
    Database,
    /// The caller may retry, typically on a fresh connection; this crate
    /// never retries on its own.
    Transient,
    Unknown,
}

impl ErrorKind {
    fn label(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "Authentication",
            ErrorKind::Security => "Security",
            ErrorKind::Syntax => "Syntax",
            ErrorKind::Constraint => "Constraint",
            ErrorKind::Transaction => "Transaction",
            ErrorKind::Protocol => "Protocol",
            ErrorKind::Database => "Database",
            ErrorKind::Transient => "Transient",
            ErrorKind::Unknown => "Unknown",
        }
    }
}

/// A `FAILURE` response, as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    code: String,
    message: String,
}

impl ServerError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `code.split('.').nth(1)`, e.g. `"ClientError"`.
    pub fn classification(&self) -> &str {
        self.code.split('.').nth(1).unwrap_or("")
    }

    /// `code.split('.').nth(2)`, e.g. `"Statement"`.
    pub fn category(&self) -> &str {
        self.code.split('.').nth(2).unwrap_or("")
    }

    /// `code.split('.').nth(3)`, e.g. `"SyntaxError"`.
    pub fn title(&self) -> &str {
        self.code.split('.').nth(3).unwrap_or("")
    }

    pub fn kind(&self) -> ErrorKind {
        let classification = self.classification();
        let category = self.category();
        let title = self.title();
        match classification {
            "ClientError" => match category {
                "Security" => {
                    if title.contains("Unauthorized") || title.contains("Authentication") {
                        ErrorKind::Authentication
                    } else {
                        ErrorKind::Security
                    }
                }
                "Statement" => {
                    if title == "SyntaxError" {
                        ErrorKind::Syntax
                    } else {
                        ErrorKind::Database
                    }
                }
                "Schema" => {
                    if title.contains("Constraint") {
                        ErrorKind::Constraint
                    } else {
                        ErrorKind::Database
                    }
                }
                "Transaction" => ErrorKind::Transaction,
                "Request" => ErrorKind::Protocol,
                _ => ErrorKind::Database,
            },
            "TransientError" => ErrorKind::Transient,
            "DatabaseError" => ErrorKind::Database,
            _ => ErrorKind::Unknown,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Builds a `ServerError` from a `FAILURE` response's metadata map,
    /// reading the `code`/`message` string fields the server is required to
    /// send. Either field missing or non-string degrades to an empty string
    /// rather than failing: a malformed FAILURE is still a failure.
    pub(crate) fn from_meta(mut meta: HashMap<String, ValueReceive>) -> Self {
        let code = meta.remove("code").and_then(|v| v.into_string()).unwrap_or_default();
        let message = meta
            .remove("message")
            .and_then(|v| v.into_string())
            .unwrap_or_default();
        Self::new(code, message)
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} error: {} ({})",
            self.kind().label(),
            self.message,
            self.code
        )
    }
}

impl From<ServerError> for Neo4jError {
    fn from(err: ServerError) -> Self {
        Neo4jError::ServerError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Neo.ClientError.Statement.SyntaxError", ErrorKind::Syntax)]
    #[case("Neo.ClientError.Statement.ArithmeticError", ErrorKind::Database)]
    #[case("Neo.ClientError.Security.Unauthorized", ErrorKind::Authentication)]
    #[case("Neo.ClientError.Security.AuthenticationRateLimit", ErrorKind::Authentication)]
    #[case("Neo.ClientError.Security.Forbidden", ErrorKind::Security)]
    #[case(
        "Neo.ClientError.Schema.ConstraintValidationFailed",
        ErrorKind::Constraint
    )]
    #[case("Neo.ClientError.Schema.IndexNotFound", ErrorKind::Database)]
    #[case("Neo.ClientError.Transaction.Terminated", ErrorKind::Transaction)]
    #[case("Neo.ClientError.Request.Invalid", ErrorKind::Protocol)]
    #[case("Neo.ClientError.General.ForbiddenOnReadOnlyDatabase", ErrorKind::Database)]
    #[case(
        "Neo.TransientError.General.DatabaseUnavailable",
        ErrorKind::Transient
    )]
    #[case("Neo.DatabaseError.General.UnknownError", ErrorKind::Database)]
    #[case("not.a.known.shape", ErrorKind::Unknown)]
    fn test_classify(#[case] code: &str, #[case] expected: ErrorKind) {
        let err = ServerError::new(code, "message");
        assert_eq!(err.kind(), expected);
    }

    #[test]
    fn test_transient_is_retryable() {
        let err = ServerError::new("Neo.TransientError.General.DatabaseUnavailable", "busy");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_syntax_not_retryable() {
        let err = ServerError::new("Neo.ClientError.Statement.SyntaxError", "bad syntax");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_meta() {
        let meta = HashMap::from([
            (
                "code".to_string(),
                ValueReceive::String("Neo.ClientError.Statement.SyntaxError".into()),
            ),
            ("message".to_string(), ValueReceive::String("bad syntax".into())),
        ]);
        let err = ServerError::from_meta(meta);
        assert_eq!(err.code(), "Neo.ClientError.Statement.SyntaxError");
        assert_eq!(err.message(), "bad syntax");
    }

    #[test]
    fn test_from_meta_missing_fields() {
        let err = ServerError::from_meta(HashMap::new());
        assert_eq!(err.code(), "");
        assert_eq!(err.message(), "");
    }
}
