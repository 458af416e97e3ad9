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

//! # Neo4j Bolt Connection Core
//!
//! This crate implements the Bolt binary protocol's connection-level
//! machinery: version negotiation (legacy and manifest handshakes), chunked
//! message framing, the PackStream value codec, the HELLO/LOGON
//! authentication dance, query streaming (`RUN`/`PULL`/`DISCARD` with query
//! IDs), explicit transactions, `ROUTE`, bookmark tracking, and typed
//! server-error classification.
//!
//! It deliberately stops at [`io::bolt::Connection`]: there is no
//! connection pool, no session, no driver-level retry policy, and no typed
//! result cursor here. Those are session/driver concerns layered on top of
//! a single connection, and are out of scope for this crate.
//!
//! ## Basic example
//! ```no_run
//! use neo4j_bolt_core::address::Address;
//! use neo4j_bolt_core::config::auth::AuthToken;
//! use neo4j_bolt_core::config::ConnectionSettings;
//! use neo4j_bolt_core::io::bolt::params::RunParameters;
//! use neo4j_bolt_core::io::bolt::{Connection, ResponseCallbacks};
//!
//! let address = Address::from(("localhost", 7687));
//! let settings = ConnectionSettings::new().with_auth(AuthToken::basic("neo4j", "pass"));
//! let mut connection = Connection::open(address, settings)?;
//!
//! connection.run(
//!     RunParameters::new("RETURN 1 AS n"),
//!     ResponseCallbacks::new(),
//! )?;
//! connection.fetch_all()?;
//! # Ok::<(), neo4j_bolt_core::Neo4jError>(())
//! ```

mod macros;

pub mod address;
pub mod bookmarks;
pub mod config;
mod error;
pub mod io;
pub mod notification;
pub mod value;

pub use error::{ErrorKind, Neo4jError, Result, ServerError};
pub(crate) use macros::value_map;
pub use value::{ValueReceive, ValueSend};
