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

//! `Connection`: the request/response state machine (handshake through
//! HELLO/LOGON, RUN/PULL/DISCARD streaming, explicit transactions, ROUTE,
//! RESET/GOODBYE) that every other module in [`super`] exists to serve.
//!
//! Dispatch is gated on the negotiated version's [`CapabilitySet`] rather
//! than on a hand-enumerated struct per version: a `Connection` is generic
//! in neither the version nor the protocol dialect, it just consults
//! `self.capabilities` before deciding which optional pieces of a request
//! to build.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::address::Address;
use crate::bookmarks::Bookmarks;
use crate::config::ConnectionSettings;
use crate::error::{Neo4jError, Result};
use crate::io::deadline::DeadlineIO;
use crate::io::transport::{TcpTransport, Transport};
use crate::io::version::{CapabilitySet, Version};
use crate::value::{ValueReceive, ValueSend};
use crate::value_map;

use super::handshake;
use super::message::{signature, BoltRequest, BoltResponseMessage};
use super::params::{BeginParameters, RouteParameters, RunParameters, StreamParameters};
use super::response::{self, BoltResponse, ResponseCallbacks, ResponseMessage};
use super::state::BoltStateTracker;

/// Server-reported facts gathered while authenticating, plus any hints the
/// server wants this client to act on (e.g. `connection.recv_timeout_seconds`).
#[derive(Debug, Clone, Default)]
pub struct ConnectionMetadata {
    pub server_agent: String,
    /// Everything in `server_agent` after the first `/`, e.g. `"5.23.0"`.
    pub server_version: Option<String>,
    pub connection_id: Option<String>,
    pub hints: HashMap<String, String>,
}

/// A single Bolt connection: one negotiated version, one TCP (or other
/// `Transport`) stream, and the state machine in §4.5 layered over it.
///
/// Running a query, pulling its records, and committing a transaction are
/// all expressed as queuing a request and (eventually) draining its
/// response(s) with [`Connection::fetch_one`]/[`Connection::fetch_all`];
/// `Connection` never decodes a result into anything richer than the raw
/// [`ValueReceive`] rows and metadata a [`ResponseCallbacks`] hands back to
/// the caller.
pub struct Connection<T: Transport> {
    address: Arc<Address>,
    socket: T,
    raw: Option<TcpStream>,
    settings: ConnectionSettings,
    version: Version,
    capabilities: CapabilitySet,
    state: BoltStateTracker,
    pending: VecDeque<BoltResponse<'static>>,
    metadata: Option<ConnectionMetadata>,
    bookmark: Option<String>,
    last_qid: Option<i64>,
    broken: bool,
}

impl Connection<TcpTransport> {
    /// Opens a plain TCP connection, negotiates a version, and runs the
    /// HELLO/LOGON dance. The returned connection is `Ready`.
    pub fn open(address: Address, settings: ConnectionSettings) -> Result<Self> {
        let socket = TcpTransport::connect(&address, settings.connect_timeout)?;
        socket.set_keep_alive(settings.keep_alive)?;
        Self::from_transport(address, settings, socket)
    }

    /// Same as [`Connection::open`], but wraps the TCP stream in TLS first.
    pub fn open_tls(
        address: Address,
        settings: ConnectionSettings,
        tls_config: Arc<rustls::ClientConfig>,
        validator: &dyn crate::io::transport::CertificateValidator,
    ) -> Result<Self> {
        let socket =
            TcpTransport::connect_tls(&address, settings.connect_timeout, tls_config, validator)?;
        socket.set_keep_alive(settings.keep_alive)?;
        Self::from_transport(address, settings, socket)
    }
}

impl<T: Transport> Connection<T> {
    /// Runs the handshake and authentication dance over an already-open
    /// transport. Lets a caller plug in a non-TCP `Transport` (tests,
    /// alternative socket layers) while reusing the exact same protocol
    /// logic as [`Connection::open`].
    pub fn from_transport(address: Address, settings: ConnectionSettings, mut socket: T) -> Result<Self> {
        let raw = socket.try_clone_raw()?;
        let version = handshake::negotiate(&mut socket)?;
        let capabilities = version.capabilities();
        let mut state = BoltStateTracker::new();
        state.handshake_done();
        let mut conn = Self {
            address: Arc::new(address),
            socket,
            raw,
            settings,
            version,
            capabilities,
            state,
            pending: VecDeque::new(),
            metadata: None,
            bookmark: None,
            last_qid: None,
            broken: false,
        };
        conn.authenticate()?;
        Ok(conn)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    pub fn metadata(&self) -> Option<&ConnectionMetadata> {
        self.metadata.as_ref()
    }

    pub fn bookmark(&self) -> Option<&str> {
        self.bookmark.as_deref()
    }

    /// Whether the connection can still accept a new request. `false` once
    /// `GOODBYE` has been sent or the transport has broken; a server
    /// `FAILURE` alone still allows `reset()` to bring it back.
    pub fn is_usable(&self) -> bool {
        !self.broken && !self.state.is_closed()
    }

    pub fn is_failed(&self) -> bool {
        self.state.is_failed()
    }

    pub fn is_open_tx(&self) -> bool {
        self.state.is_open_tx()
    }

    pub fn has_pending_responses(&self) -> bool {
        !self.pending.is_empty()
    }

    // -- authentication --------------------------------------------------

    fn authenticate(&mut self) -> Result<()> {
        let mut hello_extra: HashMap<String, ValueSend> = HashMap::new();
        hello_extra.insert(
            "user_agent".to_string(),
            ValueSend::String(self.settings.user_agent().to_string()),
        );
        if !self.capabilities.reauth {
            for (key, value) in &self.settings.auth.data {
                hello_extra.insert(key.clone(), value.clone());
            }
        }
        self.send_and_wait(
            signature::HELLO,
            vec![ValueSend::Map(hello_extra)],
            ResponseMessage::Hello,
            ResponseCallbacks::new(),
        )?;

        if self.capabilities.reauth {
            let logon_extra = self.logon_extra();
            self.send_and_wait(
                signature::LOGON,
                vec![ValueSend::Map(logon_extra)],
                ResponseMessage::Logon,
                ResponseCallbacks::new(),
            )?;
        }
        Ok(())
    }

    fn logon_extra(&self) -> HashMap<String, ValueSend> {
        let mut extra = HashMap::new();
        for key in ["scheme", "principal", "credentials"] {
            if let Some(value) = self.settings.auth.data.get(key) {
                extra.insert(key.to_string(), value.clone());
            }
        }
        extra.extend(self.settings.auth.reauth_keys());
        extra
    }

    /// Swaps the active credentials without reconnecting: `LOGOFF` followed
    /// by `LOGON` with `auth`. Only valid once ≥ 5.1 has been negotiated.
    pub fn reauthenticate(&mut self, auth: crate::config::auth::AuthToken) -> Result<()> {
        if !self.capabilities.reauth {
            return Err(Neo4jError::protocol(
                "reauthentication requires a connection negotiated at Bolt >= 5.1",
            ));
        }
        self.send_and_wait(
            signature::LOGOFF,
            vec![],
            ResponseMessage::Logoff,
            ResponseCallbacks::new(),
        )?;
        self.settings.auth = auth;
        let logon_extra = self.logon_extra();
        self.send_and_wait(
            signature::LOGON,
            vec![ValueSend::Map(logon_extra)],
            ResponseMessage::Logon,
            ResponseCallbacks::new(),
        )
    }

    // -- transaction-scoped extras ----------------------------------------

    fn resolve_bookmarks(&self, supplied: Option<&Bookmarks>) -> Bookmarks {
        match supplied {
            Some(bookmarks) if !bookmarks.is_empty() => bookmarks.clone(),
            _ => match &self.bookmark {
                Some(bookmark) => Bookmarks::from_raw([bookmark.clone()]),
                None => Bookmarks::from_raw([]),
            },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn tx_extra(
        &self,
        db: Option<&str>,
        bookmarks: Option<&Bookmarks>,
        tx_timeout: Option<i64>,
        tx_metadata: &HashMap<String, ValueSend>,
        readonly: bool,
        imp_user: Option<&str>,
    ) -> HashMap<String, ValueSend> {
        let mut extra = HashMap::new();
        if readonly {
            extra.insert("mode".to_string(), ValueSend::String("r".to_string()));
        }
        if let Some(db) = db.or_else(|| self.settings.database()) {
            extra.insert("db".to_string(), ValueSend::String(db.to_string()));
        }
        let bookmarks = self.resolve_bookmarks(bookmarks);
        if !bookmarks.is_empty() {
            extra.insert(
                "bookmarks".to_string(),
                ValueSend::List(bookmarks.raw().map(|bm| ValueSend::String(bm.to_string())).collect()),
            );
        }
        if let Some(timeout) = tx_timeout {
            extra.insert("tx_timeout".to_string(), ValueSend::Integer(timeout));
        }
        if !tx_metadata.is_empty() {
            extra.insert("tx_metadata".to_string(), ValueSend::Map(tx_metadata.clone()));
        }
        if self.version >= Version::new(4, 4) {
            if let Some(imp_user) = imp_user {
                extra.insert("imp_user".to_string(), ValueSend::String(imp_user.to_string()));
            }
        }
        if self.capabilities.notification_filtering && !self.settings.notification_filter.is_default() {
            self.add_notification_extras(&mut extra);
        }
        extra
    }

    fn add_notification_extras(&self, extra: &mut HashMap<String, ValueSend>) {
        let filter = &self.settings.notification_filter;
        if let Some(minimum) = filter.minimum_severity {
            extra.insert(
                "notifications_minimum_severity".to_string(),
                ValueSend::String(minimum.as_protocol_str().to_string()),
            );
        }
        if let Some(disabled) = &filter.disabled_categories {
            extra.insert(
                "notifications_disabled_categories".to_string(),
                ValueSend::List(
                    disabled
                        .iter()
                        .map(|category| ValueSend::String(category.as_protocol_str().to_string()))
                        .collect(),
                ),
            );
        }
    }

    /// `PULL`/`DISCARD`'s `qid` may be omitted entirely when it names the
    /// most recently opened query, which is the only one this crate ever
    /// has open unless the caller interleaves multiple `RUN`s before
    /// consuming either.
    fn can_omit_qid(&self, qid: i64) -> bool {
        qid == -1 || Some(qid) == self.last_qid
    }

    // -- requests ----------------------------------------------------------

    pub fn run(&mut self, params: RunParameters<'_>, callbacks: ResponseCallbacks<'static>) -> Result<()> {
        self.ensure_can_send()?;
        let extra = self.tx_extra(
            params.db,
            params.bookmarks,
            params.tx_timeout,
            &params.tx_metadata,
            params.readonly,
            params.imp_user,
        );
        let fields = vec![
            ValueSend::String(params.query.to_string()),
            ValueSend::Map(params.parameters.clone()),
            ValueSend::Map(extra),
        ];
        self.state.start_streaming();
        self.queue_request(signature::RUN, fields, ResponseMessage::Run, callbacks)
    }

    pub fn pull(&mut self, params: StreamParameters, callbacks: ResponseCallbacks<'static>) -> Result<()> {
        self.ensure_can_send()?;
        let extra = self.stream_extra(params);
        self.state.start_streaming();
        self.queue_request(signature::PULL, vec![ValueSend::Map(extra)], ResponseMessage::Pull, callbacks)
    }

    pub fn discard(&mut self, params: StreamParameters, callbacks: ResponseCallbacks<'static>) -> Result<()> {
        self.ensure_can_send()?;
        let extra = self.stream_extra(params);
        self.state.start_streaming();
        self.queue_request(signature::DISCARD, vec![ValueSend::Map(extra)], ResponseMessage::Discard, callbacks)
    }

    fn stream_extra(&self, params: StreamParameters) -> HashMap<String, ValueSend> {
        let mut extra = HashMap::new();
        extra.insert("n".to_string(), ValueSend::Integer(params.n));
        if !self.can_omit_qid(params.qid) {
            extra.insert("qid".to_string(), ValueSend::Integer(params.qid));
        }
        extra
    }

    pub fn begin(&mut self, params: BeginParameters<'_>) -> Result<()> {
        self.ensure_can_send()?;
        let extra = self.tx_extra(
            params.db,
            params.bookmarks,
            params.tx_timeout,
            &params.tx_metadata,
            params.readonly,
            params.imp_user,
        );
        self.state.begin_tx();
        self.send_and_wait(
            signature::BEGIN,
            vec![ValueSend::Map(extra)],
            ResponseMessage::Begin,
            ResponseCallbacks::new(),
        )
    }

    pub fn commit(&mut self, callbacks: ResponseCallbacks<'static>) -> Result<()> {
        self.ensure_can_send()?;
        self.state.end_tx();
        self.queue_request(signature::COMMIT, vec![], ResponseMessage::Commit, callbacks)
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_can_send()?;
        self.state.end_tx();
        self.send_and_wait(signature::ROLLBACK, vec![], ResponseMessage::Rollback, ResponseCallbacks::new())
    }

    pub fn route(&mut self, params: RouteParameters<'_>, callbacks: ResponseCallbacks<'static>) -> Result<()> {
        if !self.capabilities.routing {
            return Err(Neo4jError::protocol("ROUTE requires a connection negotiated at Bolt >= 4.3"));
        }
        self.ensure_can_send()?;
        let bookmarks = self.resolve_bookmarks(params.bookmarks);
        let mut route_meta = HashMap::new();
        if let Some(db) = params.db {
            route_meta.insert("db".to_string(), ValueSend::String(db.to_string()));
        }
        if let Some(imp_user) = params.imp_user {
            route_meta.insert("imp_user".to_string(), ValueSend::String(imp_user.to_string()));
        }
        let fields = vec![
            ValueSend::Map(params.routing_context),
            ValueSend::List(bookmarks.raw().map(|bm| ValueSend::String(bm.to_string())).collect()),
            ValueSend::Map(route_meta),
        ];
        self.queue_request(signature::ROUTE, fields, ResponseMessage::Route, callbacks)
    }

    /// Sends `TELEMETRY` (≥ 5.4 only); a no-op on older servers since the
    /// caller can't have gotten a capability that doesn't exist.
    pub fn telemetry(&mut self, api: u8) -> Result<()> {
        if !self.capabilities.telemetry {
            return Ok(());
        }
        self.ensure_can_send()?;
        let extra = value_map!({"api": ValueSend::Integer(api as i64)});
        self.send_and_wait(
            signature::TELEMETRY,
            vec![ValueSend::Map(extra)],
            ResponseMessage::Telemetry,
            ResponseCallbacks::new(),
        )
    }

    /// Clears a `Failed` connection (and any open transaction) back to
    /// `Ready`. The only request allowed while `Failed`, besides `GOODBYE`.
    /// If `RESET` itself comes back `FAILURE`, the connection is marked
    /// broken (see [`fetch_one`](Self::fetch_one)) and a further `reset()`
    /// is rejected rather than retried forever.
    pub fn reset(&mut self) -> Result<()> {
        if self.broken || self.state.is_closed() {
            return Err(Neo4jError::protocol("cannot RESET a broken or closed connection"));
        }
        self.pending.clear();
        self.send_and_wait(signature::RESET, vec![], ResponseMessage::Reset, ResponseCallbacks::new())
    }

    /// Sends `GOODBYE` and shuts the transport down. Best-effort: failures
    /// writing/reading are swallowed since the connection is on its way out
    /// either way.
    pub fn close(&mut self) {
        if self.state.is_closed() {
            return;
        }
        if !self.broken {
            let request = BoltRequest::new(signature::GOODBYE, vec![]);
            let _ = self.write_request(&request);
        }
        self.state.close();
        let _ = self.socket.disconnect();
    }

    fn ensure_can_send(&self) -> Result<()> {
        if self.state.can_send() {
            Ok(())
        } else {
            Err(Neo4jError::protocol(format!(
                "connection cannot accept a new request in its current state ({:?})",
                self.state.state()
            )))
        }
    }

    // -- sending and receiving ----------------------------------------------

    fn queue_request(
        &mut self,
        tag: u8,
        fields: Vec<ValueSend>,
        message: ResponseMessage,
        callbacks: ResponseCallbacks<'static>,
    ) -> Result<()> {
        let request = BoltRequest::new(tag, fields);
        self.write_request(&request)?;
        self.pending.push_back(BoltResponse::new(message, callbacks));
        Ok(())
    }

    /// Queues the request and immediately drains exactly its response,
    /// surfacing a `FAILURE` as `Err` rather than letting the caller opt
    /// out. Used for every control message the core itself drives
    /// (HELLO/LOGON/LOGOFF/BEGIN/ROLLBACK/RESET/TELEMETRY).
    fn send_and_wait(
        &mut self,
        tag: u8,
        fields: Vec<ValueSend>,
        message: ResponseMessage,
        callbacks: ResponseCallbacks<'static>,
    ) -> Result<()> {
        let callbacks = callbacks.with_on_failure(|err| Err(err.into()));
        self.queue_request(tag, fields, message, callbacks)?;
        self.fetch_one()
    }

    fn write_request(&mut self, request: &BoltRequest) -> Result<()> {
        let deadline = self.deadline();
        let mut io = DeadlineIO::new(&mut self.socket, deadline, self.raw.as_ref());
        let res = request.send(&mut io);
        let res = io.rewrite_error(res);
        if res.is_err() {
            self.broken = true;
        }
        res
    }

    fn read_message(&mut self) -> Result<BoltResponseMessage> {
        let deadline = self.deadline();
        let mut io = DeadlineIO::new(&mut self.socket, deadline, self.raw.as_ref());
        let res = BoltResponseMessage::load(&mut io);
        let res = io.rewrite_error(res);
        if res.is_err() {
            self.broken = true;
        }
        res
    }

    fn deadline(&self) -> Option<Instant> {
        self.settings.socket_timeout.map(|timeout| Instant::now() + timeout)
    }

    /// Drains one pending response to completion: every `RECORD` it
    /// carries, followed by its terminal `SUCCESS`/`FAILURE`/`IGNORED`.
    pub fn fetch_one(&mut self) -> Result<()> {
        loop {
            let mut pending = self
                .pending
                .pop_front()
                .ok_or_else(|| Neo4jError::protocol("no pending response to read"))?;
            let message = pending.message;
            let wire = self.read_message()?;
            let is_failure = wire.tag == signature::FAILURE;
            let is_success = wire.tag == signature::SUCCESS;
            let meta_snapshot = if is_success {
                wire.fields.last().and_then(ValueReceive::as_map).cloned()
            } else {
                None
            };
            if is_failure {
                self.state.fail();
                // RESET is the caller's one remedy for a `Failed` connection;
                // if RESET itself is refused, there is no further recovery
                // and the connection must be treated as broken rather than
                // left `Failed` forever (spec: "on further failure the
                // connection is considered broken").
                if message == ResponseMessage::Reset {
                    self.broken = true;
                }
            }
            match pending.handle(wire.tag, wire.fields) {
                Ok(false) => {
                    self.pending.push_front(pending);
                    continue;
                }
                Ok(true) => {
                    if let Some(meta) = meta_snapshot {
                        self.apply_success_bookkeeping(message, &meta);
                    }
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Drains every response still pending, in FIFO order.
    pub fn fetch_all(&mut self) -> Result<()> {
        while self.has_pending_responses() {
            self.fetch_one()?;
        }
        Ok(())
    }

    fn apply_success_bookkeeping(&mut self, message: ResponseMessage, meta: &HashMap<String, ValueReceive>) {
        match message {
            ResponseMessage::Hello => {
                self.record_metadata(meta);
                if !self.capabilities.reauth {
                    self.state.authentication_done();
                }
            }
            ResponseMessage::Logon => {
                self.state.authentication_done();
            }
            ResponseMessage::Reset => self.state.reset(),
            ResponseMessage::Goodbye => self.state.close(),
            _ => {}
        }
        if let Some(bookmark) = response::bookmark(meta) {
            self.bookmark = Some(bookmark);
        }
        if let Some(qid) = response::qid(meta) {
            self.last_qid = Some(qid);
        }
        // Only PULL/DISCARD's SUCCESS carries `has_more`; RUN's SUCCESS just
        // reports column names and leaves the stream open awaiting the
        // first PULL/DISCARD.
        if matches!(message, ResponseMessage::Pull | ResponseMessage::Discard) && !response::has_more(meta) {
            self.state.stop_streaming();
        }
    }

    fn record_metadata(&mut self, meta: &HashMap<String, ValueReceive>) {
        let metadata = self.metadata.get_or_insert_with(ConnectionMetadata::default);
        if let Some(agent) = response::server(meta) {
            metadata.server_version = agent.split_once('/').map(|(_, version)| version.to_string());
            metadata.server_agent = agent.to_string();
        }
        if let Some(connection_id) = response::connection_id(meta) {
            metadata.connection_id = Some(connection_id.to_string());
        }
        if let Some(hints) = meta.get("hints").and_then(ValueReceive::as_map) {
            for (key, value) in hints {
                if let Some(value) = value.as_str() {
                    metadata.hints.insert(key.clone(), value.to_string());
                }
            }
        }
        debug!(
            "connection {} authenticated against {}",
            metadata.connection_id.as_deref().unwrap_or("<unknown>"),
            metadata.server_agent
        );
    }
}

impl<T: Transport> Drop for Connection<T> {
    /// Best-effort `GOODBYE` if the caller never called [`Connection::close`]
    /// themselves, mirroring the teacher's own `Drop` impl. Never panics and
    /// never blocks longer than the configured socket timeout.
    fn drop(&mut self) {
        if !self.state.is_closed() && !self.broken {
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::auth::AuthToken;
    use crate::io::bolt::packstream;
    use std::io::{Cursor, Read, Write};

    /// An in-memory duplex stream standing in for a real socket: writes the
    /// client sends land in `to_server`, and `from_server` is played back to
    /// reads, exactly the shape `Connection` needs without opening a TCP
    /// socket in a unit test.
    struct MockTransport {
        from_server: Cursor<Vec<u8>>,
        to_server: Vec<u8>,
    }

    impl MockTransport {
        fn new(from_server: Vec<u8>) -> Self {
            Self {
                from_server: Cursor::new(from_server),
                to_server: Vec::new(),
            }
        }
    }

    impl Read for MockTransport {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.from_server.read(buf)
        }
    }

    impl Write for MockTransport {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.to_server.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Transport for MockTransport {
        fn disconnect(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn chunked_message(tag: u8, fields: &[ValueSend]) -> Vec<u8> {
        let mut body = Vec::new();
        packstream::write_struct_header(&mut body, tag, fields.len()).unwrap();
        for field in fields {
            packstream::write_value(&mut body, field).unwrap();
        }
        let mut out = Vec::new();
        for chunk in crate::io::chunk::Chunker::new(&[body]) {
            out.extend_from_slice(&chunk);
        }
        out
    }

    fn success(meta: HashMap<String, ValueSend>) -> Vec<u8> {
        chunked_message(signature::SUCCESS, &[ValueSend::Map(meta)])
    }

    fn record(fields: Vec<ValueSend>) -> Vec<u8> {
        chunked_message(signature::RECORD, &[ValueSend::List(fields)])
    }

    fn server_reply(version: Version, messages: &[Vec<u8>]) -> Vec<u8> {
        let mut reply = version.encode().to_vec();
        for message in messages {
            reply.extend_from_slice(message);
        }
        reply
    }

    #[test]
    fn test_open_pre_5_1_sends_credentials_in_hello() {
        let server_bytes = server_reply(
            Version::new(4, 4),
            &[success(value_map!({
                "server": "Neo4j/4.4.0",
                "connection_id": "bolt-1"
            }))],
        );
        let transport = MockTransport::new(server_bytes);
        let settings = ConnectionSettings::new().with_auth(AuthToken::basic("neo4j", "pass"));
        let conn = Connection::from_transport(Address::from(("localhost", 7687)), settings, transport).unwrap();
        assert_eq!(conn.version(), Version::new(4, 4));
        assert!(conn.is_usable());
        assert_eq!(conn.metadata().unwrap().server_agent, "Neo4j/4.4.0");
        assert_eq!(conn.metadata().unwrap().connection_id.as_deref(), Some("bolt-1"));
        assert_eq!(conn.metadata().unwrap().server_version.as_deref(), Some("4.4.0"));
    }

    #[test]
    fn test_open_5_1_splits_hello_and_logon() {
        let server_bytes = server_reply(
            Version::new(5, 1),
            &[
                success(value_map!({"server": "Neo4j/5.1.0"})),
                success(HashMap::new()),
            ],
        );
        let transport = MockTransport::new(server_bytes);
        let settings = ConnectionSettings::new().with_auth(AuthToken::basic("neo4j", "pass"));
        let conn = Connection::from_transport(Address::from(("localhost", 7687)), settings, transport).unwrap();
        assert!(conn.capabilities().reauth);
        assert!(conn.is_usable());
        assert!(!conn.is_failed());
    }

    #[test]
    fn test_authentication_failure_is_returned() {
        let failure = chunked_message(
            signature::FAILURE,
            &[ValueSend::Map(value_map!({
                "code": "Neo.ClientError.Security.Unauthorized",
                "message": "bad credentials"
            }))],
        );
        let server_bytes = server_reply(Version::new(4, 4), &[failure]);
        let transport = MockTransport::new(server_bytes);
        let settings = ConnectionSettings::new().with_auth(AuthToken::basic("neo4j", "wrong"));
        let err = Connection::from_transport(Address::from(("localhost", 7687)), settings, transport).unwrap_err();
        assert!(matches!(err, Neo4jError::ServerError(_)));
    }

    fn connected(version: Version) -> Connection<MockTransport> {
        let server_bytes = server_reply(version, &[success(HashMap::new())]);
        let transport = MockTransport::new(server_bytes);
        Connection::from_transport(Address::from(("localhost", 7687)), ConnectionSettings::new(), transport).unwrap()
    }

    #[test]
    fn test_run_then_pull_tracks_bookmark_and_leaves_ready() {
        let mut conn = connected(Version::new(4, 4));
        // Queue the two server responses the client's RUN and PULL expect.
        let run_success = success(value_map!({"fields": ValueSend::List(vec![])}));
        let one_record = record(vec![ValueSend::Integer(1)]);
        let pull_success = success(value_map!({
            "bookmark": "nb:v1:tx7",
            "has_more": false
        }));
        conn.socket.from_server = Cursor::new([run_success, one_record, pull_success].concat());

        conn.run(RunParameters::new("RETURN 1"), ResponseCallbacks::new()).unwrap();
        assert_eq!(conn.state.state(), super::super::state::BoltState::Streaming);
        conn.fetch_one().unwrap();

        let records_seen = std::cell::RefCell::new(Vec::new());
        conn.pull(
            StreamParameters::all(),
            ResponseCallbacks::new().with_on_record(|fields| {
                records_seen.borrow_mut().push(fields);
                Ok(())
            }),
        )
        .unwrap();
        conn.fetch_one().unwrap();

        assert_eq!(records_seen.borrow().len(), 1);
        assert_eq!(conn.bookmark(), Some("nb:v1:tx7"));
        assert_eq!(conn.state.state(), super::super::state::BoltState::Ready);
    }

    #[test]
    fn test_cannot_send_while_failed() {
        let mut conn = connected(Version::new(4, 4));
        conn.state.fail();
        let err = conn.begin(BeginParameters::new()).unwrap_err();
        assert!(matches!(err, Neo4jError::Protocol { .. }));
    }

    #[test]
    fn test_reset_failure_marks_connection_broken() {
        let mut conn = connected(Version::new(4, 4));
        conn.state.fail();
        let failure = chunked_message(
            signature::FAILURE,
            &[ValueSend::Map(value_map!({
                "code": "Neo.ClientError.Request.Invalid",
                "message": "cannot reset"
            }))],
        );
        conn.socket.from_server = Cursor::new(failure);

        let err = conn.reset().unwrap_err();
        assert!(matches!(err, Neo4jError::ServerError(_)));
        assert!(!conn.is_usable());

        // A second `reset()` must be rejected outright rather than retrying
        // a RESET the connection has no way to recover from.
        let err = conn.reset().unwrap_err();
        assert!(matches!(err, Neo4jError::Protocol { .. }));
    }

    #[test]
    fn test_route_rejected_below_4_3() {
        let mut conn = connected(Version::new(4, 1));
        let err = conn
            .route(RouteParameters::new(HashMap::new()), ResponseCallbacks::new())
            .unwrap_err();
        assert!(matches!(err, Neo4jError::Protocol { .. }));
    }
}
