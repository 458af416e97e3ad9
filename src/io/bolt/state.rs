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

//! The connection's coarse protocol state, tracked independently of which
//! capability set the negotiated version implies.
//!
//! `Failed` is reachable from every other state (any response can turn out
//! to be a `FAILURE`) and only `RESET` moves out of it.

use log::debug;

/// Where a connection is in its request/response lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoltState {
    /// The socket is open but the magic preamble/version negotiation
    /// hasn't happened yet.
    Handshaking,
    /// A version has been negotiated; HELLO/LOGON haven't completed yet.
    Authenticating,
    /// Idle, outside of any transaction, ready to accept the next request.
    Ready,
    /// An auto-commit or explicit-transaction query is open; `RECORD`s may
    /// still be pending.
    Streaming,
    /// Inside an explicit transaction (`BEGIN` acknowledged, no
    /// `COMMIT`/`ROLLBACK` yet). Queries may still be `Streaming` within it.
    Tx,
    /// The server sent a `FAILURE` (or a local protocol violation was
    /// detected) that hasn't been cleared with `RESET` yet. No new request
    /// other than `RESET`/`GOODBYE` may be sent.
    Failed,
    /// `GOODBYE` was sent, or the transport is otherwise known gone.
    Closed,
}

impl BoltState {
    fn can_accept_request(&self) -> bool {
        !matches!(self, BoltState::Failed | BoltState::Closed | BoltState::Handshaking)
    }
}

/// Tracks [`BoltState`] transitions as requests are queued and responses
/// arrive, independent of what the negotiated version's capability set
/// allows (that's `Connection`'s job, at the call site, before a request is
/// even constructed).
#[derive(Debug)]
pub(crate) struct BoltStateTracker {
    state: BoltState,
    open_tx: bool,
}

impl BoltStateTracker {
    pub(crate) fn new() -> Self {
        Self {
            state: BoltState::Handshaking,
            open_tx: false,
        }
    }

    pub(crate) fn state(&self) -> BoltState {
        self.state
    }

    pub(crate) fn is_failed(&self) -> bool {
        self.state == BoltState::Failed
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state == BoltState::Closed
    }

    pub(crate) fn is_open_tx(&self) -> bool {
        self.open_tx
    }

    /// Whether a new request (other than `RESET`/`GOODBYE`) may be queued
    /// right now.
    pub(crate) fn can_send(&self) -> bool {
        self.state.can_accept_request()
    }

    pub(crate) fn handshake_done(&mut self) {
        debug_assert_eq!(self.state, BoltState::Handshaking);
        self.set(BoltState::Authenticating);
    }

    pub(crate) fn authentication_done(&mut self) {
        debug_assert_eq!(self.state, BoltState::Authenticating);
        self.set(BoltState::Ready);
    }

    pub(crate) fn begin_tx(&mut self) {
        self.open_tx = true;
        self.set(BoltState::Tx);
    }

    pub(crate) fn end_tx(&mut self) {
        self.open_tx = false;
        self.set(BoltState::Ready);
    }

    pub(crate) fn start_streaming(&mut self) {
        if !matches!(self.state, BoltState::Failed | BoltState::Closed) {
            self.set(BoltState::Streaming);
        }
    }

    /// A query's last batch has been fully consumed (`has_more == false`).
    /// Returns to `Tx` if an explicit transaction is still open, `Ready`
    /// otherwise.
    pub(crate) fn stop_streaming(&mut self) {
        if self.state == BoltState::Streaming {
            self.set(if self.open_tx { BoltState::Tx } else { BoltState::Ready });
        }
    }

    pub(crate) fn fail(&mut self) {
        self.set(BoltState::Failed);
    }

    /// `RESET` succeeded: clears `Failed` and any open transaction.
    pub(crate) fn reset(&mut self) {
        self.open_tx = false;
        self.set(BoltState::Ready);
    }

    pub(crate) fn close(&mut self) {
        self.set(BoltState::Closed);
    }

    fn set(&mut self, new: BoltState) {
        if new != self.state {
            debug!("bolt state: {:?} -> {:?}", self.state, new);
        }
        self.state = new;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_tracker_is_handshaking() {
        let tracker = BoltStateTracker::new();
        assert_eq!(tracker.state(), BoltState::Handshaking);
        assert!(!tracker.can_send());
    }

    #[test]
    fn test_happy_path_to_ready() {
        let mut tracker = BoltStateTracker::new();
        tracker.handshake_done();
        assert_eq!(tracker.state(), BoltState::Authenticating);
        tracker.authentication_done();
        assert_eq!(tracker.state(), BoltState::Ready);
        assert!(tracker.can_send());
    }

    #[test]
    fn test_failed_blocks_new_requests_until_reset() {
        let mut tracker = BoltStateTracker::new();
        tracker.handshake_done();
        tracker.authentication_done();
        tracker.fail();
        assert!(tracker.is_failed());
        assert!(!tracker.can_send());
        tracker.reset();
        assert!(!tracker.is_failed());
        assert!(tracker.can_send());
    }

    #[test]
    fn test_streaming_inside_tx_returns_to_tx() {
        let mut tracker = BoltStateTracker::new();
        tracker.handshake_done();
        tracker.authentication_done();
        tracker.begin_tx();
        tracker.start_streaming();
        assert_eq!(tracker.state(), BoltState::Streaming);
        tracker.stop_streaming();
        assert_eq!(tracker.state(), BoltState::Tx);
    }

    #[test]
    fn test_streaming_outside_tx_returns_to_ready() {
        let mut tracker = BoltStateTracker::new();
        tracker.handshake_done();
        tracker.authentication_done();
        tracker.start_streaming();
        tracker.stop_streaming();
        assert_eq!(tracker.state(), BoltState::Ready);
    }

    #[test]
    fn test_closed_cannot_send() {
        let mut tracker = BoltStateTracker::new();
        tracker.close();
        assert!(!tracker.can_send());
    }
}
