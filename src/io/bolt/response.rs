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

//! Response bookkeeping: what a pending request expects back, and the
//! small set of metadata fields the core itself reads out of a `SUCCESS`.

use std::collections::HashMap;

use crate::error::{Neo4jError, Result, ServerError};
use crate::value::ValueReceive;

use super::message::signature;

/// Which request a queued response belongs to, purely for error messages
/// and logging; the wire protocol itself never names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponseMessage {
    Hello,
    Logon,
    Logoff,
    Reset,
    Run,
    Discard,
    Pull,
    Begin,
    Commit,
    Rollback,
    Route,
    Telemetry,
    Goodbye,
}

impl ResponseMessage {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            ResponseMessage::Hello => "HELLO",
            ResponseMessage::Logon => "LOGON",
            ResponseMessage::Logoff => "LOGOFF",
            ResponseMessage::Reset => "RESET",
            ResponseMessage::Run => "RUN",
            ResponseMessage::Discard => "DISCARD",
            ResponseMessage::Pull => "PULL",
            ResponseMessage::Begin => "BEGIN",
            ResponseMessage::Commit => "COMMIT",
            ResponseMessage::Rollback => "ROLLBACK",
            ResponseMessage::Route => "ROUTE",
            ResponseMessage::Telemetry => "TELEMETRY",
            ResponseMessage::Goodbye => "GOODBYE",
        }
    }

    /// Whether a request of this kind can ever be followed by `RECORD`
    /// messages before its terminal `SUCCESS`/`FAILURE`.
    pub(crate) fn streams_records(&self) -> bool {
        matches!(self, ResponseMessage::Run | ResponseMessage::Pull | ResponseMessage::Discard)
    }
}

type RecordCallback<'cb> = Box<dyn FnMut(Vec<ValueReceive>) -> Result<()> + Send + 'cb>;
type SuccessCallback<'cb> = Box<dyn FnOnce(HashMap<String, ValueReceive>) -> Result<()> + Send + 'cb>;
type FailureCallback<'cb> = Box<dyn FnOnce(ServerError) -> Result<()> + Send + 'cb>;
type IgnoredCallback<'cb> = Box<dyn FnOnce() -> Result<()> + Send + 'cb>;

/// What to do with each of the three terminal outcomes (and, for streaming
/// requests, every `RECORD` in between). Every field is optional: a caller
/// that doesn't care about, say, `IGNORED` simply leaves it as a no-op.
#[derive(Default)]
pub struct ResponseCallbacks<'cb> {
    on_record: Option<RecordCallback<'cb>>,
    on_success: Option<SuccessCallback<'cb>>,
    on_failure: Option<FailureCallback<'cb>>,
    on_ignored: Option<IgnoredCallback<'cb>>,
}

impl<'cb> ResponseCallbacks<'cb> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_record(
        mut self,
        cb: impl FnMut(Vec<ValueReceive>) -> Result<()> + Send + 'cb,
    ) -> Self {
        self.on_record = Some(Box::new(cb));
        self
    }

    pub fn with_on_success(
        mut self,
        cb: impl FnOnce(HashMap<String, ValueReceive>) -> Result<()> + Send + 'cb,
    ) -> Self {
        self.on_success = Some(Box::new(cb));
        self
    }

    pub fn with_on_failure(mut self, cb: impl FnOnce(ServerError) -> Result<()> + Send + 'cb) -> Self {
        self.on_failure = Some(Box::new(cb));
        self
    }

    pub fn with_on_ignored(mut self, cb: impl FnOnce() -> Result<()> + Send + 'cb) -> Self {
        self.on_ignored = Some(Box::new(cb));
        self
    }

    fn record(&mut self, fields: Vec<ValueReceive>) -> Result<()> {
        match &mut self.on_record {
            Some(cb) => cb(fields),
            None => Ok(()),
        }
    }

    fn success(self, meta: HashMap<String, ValueReceive>) -> Result<()> {
        match self.on_success {
            Some(cb) => cb(meta),
            None => Ok(()),
        }
    }

    fn failure(self, err: ServerError) -> Result<()> {
        match self.on_failure {
            Some(cb) => cb(err),
            None => Ok(()),
        }
    }

    fn ignored(self) -> Result<()> {
        match self.on_ignored {
            Some(cb) => cb(),
            None => Ok(()),
        }
    }
}

/// A request awaiting its response(s) in FIFO order. `RECORD`s feed
/// `on_record` as they arrive; the first non-`RECORD` message is terminal
/// and consumes the whole entry.
pub(crate) struct BoltResponse<'cb> {
    pub(crate) message: ResponseMessage,
    callbacks: ResponseCallbacks<'cb>,
}

impl<'cb> BoltResponse<'cb> {
    pub(crate) fn new(message: ResponseMessage, callbacks: ResponseCallbacks<'cb>) -> Self {
        Self { message, callbacks }
    }

    /// Dispatches one wire message against this pending response. Returns
    /// `true` once a terminal (`SUCCESS`/`FAILURE`/`IGNORED`) message has
    /// been consumed, i.e. this entry should be dropped from the queue.
    pub(crate) fn handle(&mut self, tag: u8, mut fields: Vec<ValueReceive>) -> Result<bool> {
        match tag {
            signature::RECORD => {
                if !self.message.streams_records() {
                    return Err(Neo4jError::protocol(format!(
                        "unexpected RECORD message for {}",
                        self.message.name()
                    )));
                }
                let records = fields
                    .pop()
                    .and_then(ValueReceive::into_list)
                    .ok_or_else(|| Neo4jError::protocol("RECORD message missing its field list"))?;
                self.callbacks.record(records)?;
                Ok(false)
            }
            signature::SUCCESS => {
                let meta = pop_map(&mut fields, "SUCCESS")?;
                self.take_callbacks().success(meta)?;
                Ok(true)
            }
            signature::FAILURE => {
                let meta = pop_map(&mut fields, "FAILURE")?;
                self.take_callbacks().failure(ServerError::from_meta(meta))?;
                Ok(true)
            }
            signature::IGNORED => {
                self.take_callbacks().ignored()?;
                Ok(true)
            }
            other => Err(Neo4jError::protocol(format!(
                "unexpected response signature 0x{other:02X} for {}",
                self.message.name()
            ))),
        }
    }

    fn take_callbacks(&mut self) -> ResponseCallbacks<'cb> {
        std::mem::take(&mut self.callbacks)
    }
}

fn pop_map(fields: &mut Vec<ValueReceive>, context: &str) -> Result<HashMap<String, ValueReceive>> {
    fields
        .pop()
        .and_then(ValueReceive::into_map)
        .ok_or_else(|| Neo4jError::protocol(format!("{context} message missing its metadata map")))
}

/// `server` metadata field from HELLO's `SUCCESS`.
pub fn server(meta: &HashMap<String, ValueReceive>) -> Option<&str> {
    meta.get("server").and_then(ValueReceive::as_str)
}

/// `connection_id` metadata field from HELLO's `SUCCESS`.
pub fn connection_id(meta: &HashMap<String, ValueReceive>) -> Option<&str> {
    meta.get("connection_id").and_then(ValueReceive::as_str)
}

/// `fields` metadata field from RUN's `SUCCESS`: the result's column names.
pub fn fields(meta: &HashMap<String, ValueReceive>) -> Vec<String> {
    meta.get("fields")
        .and_then(ValueReceive::as_list)
        .map(|list| list.iter().filter_map(ValueReceive::as_str).map(String::from).collect())
        .unwrap_or_default()
}

/// `bookmark` (singular, current servers) metadata field, falling back to
/// the first entry of `bookmarks` for older servers that still pluralize it.
pub fn bookmark(meta: &HashMap<String, ValueReceive>) -> Option<String> {
    if let Some(bm) = meta.get("bookmark").and_then(ValueReceive::as_str) {
        return Some(bm.to_string());
    }
    meta.get("bookmarks")
        .and_then(ValueReceive::as_list)
        .and_then(|list| list.first())
        .and_then(ValueReceive::as_str)
        .map(String::from)
}

/// `has_more` metadata field from PULL/DISCARD's `SUCCESS`.
pub fn has_more(meta: &HashMap<String, ValueReceive>) -> bool {
    meta.get("has_more").and_then(ValueReceive::as_bool).unwrap_or(false)
}

/// `qid` metadata field from RUN's `SUCCESS`, identifying the query for
/// subsequent PULL/DISCARD on a connection with more than one open query.
pub fn qid(meta: &HashMap<String, ValueReceive>) -> Option<i64> {
    meta.get("qid").and_then(ValueReceive::as_int)
}

/// `stats` metadata field from a streaming request's terminal `SUCCESS`.
pub fn stats(meta: &HashMap<String, ValueReceive>) -> HashMap<String, ValueReceive> {
    meta.get("stats").and_then(|v| v.as_map().cloned()).unwrap_or_default()
}

/// `notifications` metadata field, parsed into [`crate::notification::Notification`]s.
pub fn notifications(meta: &HashMap<String, ValueReceive>) -> Vec<crate::notification::Notification> {
    meta.get("notifications")
        .and_then(ValueReceive::as_list)
        .map(|list| {
            list.iter()
                .filter_map(|v| crate::notification::Notification::from_value(v.clone()))
                .collect()
        })
        .unwrap_or_default()
}
