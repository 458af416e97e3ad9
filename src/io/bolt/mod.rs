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

//! The Bolt protocol core: version negotiation, the wire codec, request
//! parameter bags, response bookkeeping, the coarse protocol state
//! machine, and [`Connection`], which drives all of it.

mod connection;
mod handshake;
mod message;
mod packstream;
pub mod params;
mod response;
mod state;

pub use connection::{Connection, ConnectionMetadata};
pub use response::ResponseCallbacks;

/// Helpers for pulling well-known fields out of a `SUCCESS` response's
/// metadata map, for use inside a [`ResponseCallbacks::with_on_success`]
/// callback. `Connection` itself reads the same fields to maintain bookmark
/// and query-id tracking; a caller inspecting the map directly needs a way
/// to make sense of the same conventions.
pub mod meta {
    pub use super::response::{bookmark, connection_id, fields, has_more, notifications, qid, server, stats};
}
