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

//! Per-request parameter bags, kept separate from [`super::connection::Connection`]'s
//! methods so the option-bag construction in `connection.rs` isn't buried in a wall
//! of positional arguments.

use std::collections::HashMap;

use crate::bookmarks::Bookmarks;
use crate::value::ValueSend;

/// Everything `RUN` needs beyond the fixed `(statement, parameters, extra)` shape.
#[derive(Debug, Default, Clone)]
pub struct RunParameters<'a> {
    pub query: &'a str,
    pub parameters: HashMap<String, ValueSend>,
    pub bookmarks: Option<&'a Bookmarks>,
    pub tx_timeout: Option<i64>,
    pub tx_metadata: HashMap<String, ValueSend>,
    pub readonly: bool,
    pub db: Option<&'a str>,
    pub imp_user: Option<&'a str>,
}

impl<'a> RunParameters<'a> {
    pub fn new(query: &'a str) -> Self {
        Self {
            query,
            ..Default::default()
        }
    }

    pub fn with_parameters(mut self, parameters: HashMap<String, ValueSend>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_bookmarks(mut self, bookmarks: &'a Bookmarks) -> Self {
        self.bookmarks = Some(bookmarks);
        self
    }

    pub fn with_tx_timeout(mut self, timeout_ms: i64) -> Self {
        self.tx_timeout = Some(timeout_ms);
        self
    }

    pub fn with_tx_metadata(mut self, metadata: HashMap<String, ValueSend>) -> Self {
        self.tx_metadata = metadata;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn with_db(mut self, db: &'a str) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_imp_user(mut self, imp_user: &'a str) -> Self {
        self.imp_user = Some(imp_user);
        self
    }
}

/// Everything `BEGIN` needs: the same transaction-scoping extras as `RUN`, minus the
/// statement/parameters a `RUN` inside the transaction will carry separately.
#[derive(Debug, Default, Clone)]
pub struct BeginParameters<'a> {
    pub bookmarks: Option<&'a Bookmarks>,
    pub tx_timeout: Option<i64>,
    pub tx_metadata: HashMap<String, ValueSend>,
    pub readonly: bool,
    pub db: Option<&'a str>,
    pub imp_user: Option<&'a str>,
}

impl<'a> BeginParameters<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bookmarks(mut self, bookmarks: &'a Bookmarks) -> Self {
        self.bookmarks = Some(bookmarks);
        self
    }

    pub fn with_tx_timeout(mut self, timeout_ms: i64) -> Self {
        self.tx_timeout = Some(timeout_ms);
        self
    }

    pub fn with_tx_metadata(mut self, metadata: HashMap<String, ValueSend>) -> Self {
        self.tx_metadata = metadata;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn with_db(mut self, db: &'a str) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_imp_user(mut self, imp_user: &'a str) -> Self {
        self.imp_user = Some(imp_user);
        self
    }
}

/// `n`/`qid` pair shared by `PULL` and `DISCARD`. `n = -1` means "all remaining
/// records"; `qid = -1` means "the most recently opened query," and is omitted from
/// the wire extra map entirely rather than sent as `-1` (see
/// [`super::connection::Connection::can_omit_qid`]).
#[derive(Debug, Copy, Clone)]
pub struct StreamParameters {
    pub n: i64,
    pub qid: i64,
}

impl StreamParameters {
    pub fn all() -> Self {
        Self { n: -1, qid: -1 }
    }

    pub fn new(n: i64, qid: i64) -> Self {
        Self { n, qid }
    }
}

/// `ROUTE` (≥4.3 only): a routing context plus the bookmarks the server should be
/// causally consistent with when computing the routing table.
#[derive(Debug, Default, Clone)]
pub struct RouteParameters<'a> {
    pub routing_context: HashMap<String, ValueSend>,
    pub bookmarks: Option<&'a Bookmarks>,
    pub db: Option<&'a str>,
    pub imp_user: Option<&'a str>,
}

impl<'a> RouteParameters<'a> {
    pub fn new(routing_context: HashMap<String, ValueSend>) -> Self {
        Self {
            routing_context,
            ..Default::default()
        }
    }

    pub fn with_bookmarks(mut self, bookmarks: &'a Bookmarks) -> Self {
        self.bookmarks = Some(bookmarks);
        self
    }

    pub fn with_db(mut self, db: &'a str) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_imp_user(mut self, imp_user: &'a str) -> Self {
        self.imp_user = Some(imp_user);
        self
    }
}
