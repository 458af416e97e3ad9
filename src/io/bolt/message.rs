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

//! Request/response message shape: a single tag byte plus a list of
//! PackStream-encoded fields, framed through the chunker on the way out and
//! the dechunker on the way back in.

use std::io::{Read, Write};

use log::{log_enabled, trace, Level};

use super::packstream;
use crate::error::{Neo4jError, Result};
use crate::io::chunk::{Chunker, Dechunker};
use crate::value::{ValueReceive, ValueSend};

pub(crate) mod signature {
    pub(crate) const HELLO: u8 = 0x01;
    pub(crate) const GOODBYE: u8 = 0x02;
    pub(crate) const RESET: u8 = 0x0F;
    pub(crate) const RUN: u8 = 0x10;
    pub(crate) const DISCARD: u8 = 0x2F;
    pub(crate) const PULL: u8 = 0x3F;
    pub(crate) const BEGIN: u8 = 0x11;
    pub(crate) const COMMIT: u8 = 0x12;
    pub(crate) const ROLLBACK: u8 = 0x13;
    pub(crate) const ROUTE: u8 = 0x66;
    pub(crate) const LOGON: u8 = 0x6A;
    pub(crate) const LOGOFF: u8 = 0x6B;
    pub(crate) const TELEMETRY: u8 = 0x54;

    pub(crate) const SUCCESS: u8 = 0x70;
    pub(crate) const RECORD: u8 = 0x71;
    pub(crate) const IGNORED: u8 = 0x7E;
    pub(crate) const FAILURE: u8 = 0x7F;
}

/// A request this crate sends, ready to be chunked onto the wire.
#[derive(Debug)]
pub(crate) struct BoltRequest {
    pub(crate) tag: u8,
    pub(crate) fields: Vec<ValueSend>,
}

impl BoltRequest {
    pub(crate) fn new(tag: u8, fields: Vec<ValueSend>) -> Self {
        Self { tag, fields }
    }

    /// Encodes the message body (signature struct + fields) and chunks it,
    /// writing the resulting frames straight to `writer`.
    pub(crate) fn send(&self, writer: &mut impl Write) -> Result<()> {
        let mut body = Vec::new();
        packstream::write_struct_header(&mut body, self.tag, self.fields.len())?;
        for field in &self.fields {
            packstream::write_value(&mut body, field)?;
        }
        if log_enabled!(Level::Trace) {
            trace!("C: message tag=0x{:02X} fields={:?}", self.tag, self.fields);
        }
        let buffers = [body];
        for chunk in Chunker::new(&buffers) {
            Neo4jError::wrap_write(writer.write_all(&chunk))?;
        }
        Ok(())
    }
}

/// A response message as read off the wire: a signature byte and its
/// fields. `SUCCESS`/`IGNORED` carry one map field (metadata); `FAILURE`
/// carries one map field (the error); `RECORD` carries one list field (the
/// row).
#[derive(Debug)]
pub(crate) struct BoltResponseMessage {
    pub(crate) tag: u8,
    pub(crate) fields: Vec<ValueReceive>,
}

impl BoltResponseMessage {
    /// Reads exactly one message's chunk stream from `reader` and decodes
    /// it. `reader` must be positioned at the start of a message (right
    /// after the previous message's terminator, or at the very start of the
    /// stream).
    pub(crate) fn load(reader: &mut impl Read) -> Result<Self> {
        let mut dechunker = Dechunker::new(reader);
        let (tag, field_count) = packstream::read_struct_header(&mut dechunker)?;
        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            fields.push(packstream::read_value(&mut dechunker)?);
        }
        // The structure's fields exactly exhaust every chunk but the
        // terminator; one more read observes (and consumes) it, leaving the
        // underlying stream positioned at the next message for the
        // `Dechunker` this call constructs on the following `load`.
        let mut trailing = [0u8; 1];
        match Neo4jError::wrap_read(dechunker.read(&mut trailing))? {
            0 => {}
            _ => return Err(Neo4jError::protocol("message body ran past its chunk terminator")),
        }
        if log_enabled!(Level::Trace) {
            trace!("S: message tag=0x{tag:02X} fields={fields:?}");
        }
        Ok(Self { tag, fields })
    }
}
