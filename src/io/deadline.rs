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

//! Wraps a `Read + Write` stream so every call is bounded by an absolute
//! deadline instead of a fixed per-call timeout. This is the suspension
//! point of the blocking, deadline-bounded execution model chosen for this
//! crate (see the concurrency design notes): protocol logic never runs
//! concurrently with the read/write calls this wraps.

use std::fmt::Debug;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use log::warn;

use crate::error::{Neo4jError, Result};

enum ErrorDuring {
    GetTimeout,
    SetTimeout,
    Io,
}

pub(crate) struct DeadlineIO<'tcp, S> {
    stream: S,
    deadline: Option<Instant>,
    socket: Option<&'tcp TcpStream>,
    error_during: Option<ErrorDuring>,
}

impl<'tcp, S: Read + Write> DeadlineIO<'tcp, S> {
    pub(crate) fn new(stream: S, deadline: Option<Instant>, socket: Option<&'tcp TcpStream>) -> Self {
        Self {
            stream,
            deadline,
            socket,
            error_during: None,
        }
    }

    fn wrap_io_error<T>(&mut self, res: io::Result<T>, during: ErrorDuring) -> io::Result<T> {
        if res.is_err() {
            self.error_during = Some(during);
        }
        res
    }

    fn with_deadline<T: Debug>(&mut self, work: impl FnOnce(&mut Self) -> io::Result<T>) -> io::Result<T> {
        let (Some(deadline), Some(socket)) = (self.deadline, self.socket) else {
            let res = work(self);
            return self.wrap_io_error(res, ErrorDuring::Io);
        };
        let old_timeout = self.wrap_io_error(socket.read_timeout(), ErrorDuring::GetTimeout)?;
        let timeout = deadline
            .checked_duration_since(Instant::now())
            .unwrap_or(Duration::from_nanos(1));
        if let Some(old_timeout) = old_timeout {
            if timeout >= old_timeout {
                let res = work(self);
                return self.wrap_io_error(res, ErrorDuring::Io);
            }
        }
        self.wrap_io_error(set_timeout(socket, Some(timeout)), ErrorDuring::SetTimeout)?;
        let res = work(self);
        let res = self.wrap_io_error(res, ErrorDuring::Io);
        if let Err(err) = set_timeout(socket, old_timeout) {
            warn!("failed to restore socket timeout: {err}");
        }
        res
    }

    /// Turns a raw I/O error produced while this wrapper was active into the
    /// right `Neo4jError` variant (a timeout surfaces as a connection error
    /// either way, but this keeps the message informative about which step
    /// of the deadline bookkeeping actually failed).
    pub(crate) fn rewrite_error<T>(&self, res: Result<T>) -> Result<T> {
        if res.is_ok() {
            return res;
        }
        match self.error_during {
            Some(ErrorDuring::GetTimeout) => {
                res.map_err(|err| Neo4jError::service(format!("failed to read socket timeout: {err}")))
            }
            Some(ErrorDuring::SetTimeout) => {
                res.map_err(|err| Neo4jError::service(format!("failed to set socket timeout: {err}")))
            }
            Some(ErrorDuring::Io) | None => res,
        }
    }
}

fn set_timeout(socket: &TcpStream, timeout: Option<Duration>) -> io::Result<()> {
    socket.set_read_timeout(timeout)?;
    socket.set_write_timeout(timeout)
}

impl<S> Debug for DeadlineIO<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlineIO")
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl<S: Read + Write> Read for DeadlineIO<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.with_deadline(|this| this.stream.read(buf))
    }
}

impl<S: Read + Write> Write for DeadlineIO<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_deadline(|this| this.stream.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_deadline(|this| this.stream.flush())
    }
}
