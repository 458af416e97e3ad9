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

//! Chunked message framing: split an encoded message into ≤65535-byte
//! frames terminated by a zero-length chunk; reassemble frames on the way
//! back in.

use std::cmp;
use std::fmt::{Debug, Formatter};
use std::io::{self, Read};
use std::ops::Deref;
use std::thread::panicking;

use log::{error, log_enabled, trace, Level};
use usize_cast::IntoUsize;

/// Turns one or more byte buffers making up a single message into the
/// `(u16 length, payload)*` chunk stream, terminated by a `0x00 0x00`
/// chunk. Consecutive buffers are packed into the same length-prefixed
/// chunk whenever that keeps the chunk under the 65535-byte cap, so a
/// caller building a message out of several `Vec<u8>` pieces need not
/// concatenate them first.
#[derive(Debug)]
pub(crate) struct Chunker<'a, T: Deref<Target = [u8]>> {
    buffers: &'a [T],
    buffer_start: usize,
    chunk_size_left: u16,
    ended: bool,
}

impl<'a, T: Deref<Target = [u8]>> Chunker<'a, T> {
    pub(crate) fn new(buf: &'a [T]) -> Self {
        Chunker {
            buffers: buf,
            buffer_start: 0,
            chunk_size_left: 0,
            ended: false,
        }
    }
}

impl<'a, T: Deref<Target = [u8]>> Iterator for Chunker<'a, T> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.ended {
            return None;
        }
        while let Some(true) = self.buffers.first().map(|b| b.is_empty()) {
            self.buffers = &self.buffers[1..];
        }
        if self.buffers.is_empty() {
            self.ended = true;
            return Some(Chunk::Size([0, 0]));
        }
        if self.chunk_size_left > 0 {
            let buffer_len = cmp::min(
                self.buffers[0].len() - self.buffer_start,
                self.chunk_size_left.into_usize(),
            );
            let buffer_end = self.buffer_start + buffer_len;
            let chunk = &self.buffers[0][self.buffer_start..buffer_end];
            self.chunk_size_left -= buffer_len as u16;
            self.buffer_start = buffer_end;
            if self.buffer_start == self.buffers[0].len() {
                self.buffers = &self.buffers[1..];
                self.buffer_start = 0;
            }
            Some(Chunk::Buffer(chunk))
        } else {
            let mut size = (self.buffers[0].len() - self.buffer_start)
                .try_into()
                .unwrap_or(u16::MAX);
            size = size.saturating_add(
                self.buffers[1..]
                    .iter()
                    .map(|b| b.len().try_into().unwrap_or(u16::MAX))
                    .reduce(|acc, x| acc.saturating_add(x))
                    .unwrap_or_default(),
            );
            self.chunk_size_left = size;
            Some(Chunk::Size(size.to_be_bytes()))
        }
    }
}

pub(crate) enum Chunk<'a> {
    Buffer(&'a [u8]),
    Size([u8; 2]),
}

impl<'a> Deref for Chunk<'a> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        match self {
            Chunk::Buffer(buf) => {
                trace!("C: <RAW> {buf:02X?}");
                buf
            }
            Chunk::Size(size) => {
                trace!("C: <RAW> {size:02X?}");
                size
            }
        }
    }
}

/// Reassembles a single message's chunk stream back into a byte sequence,
/// implementing `Read` so the message codec can read it like any other
/// stream. Stops (returning `Ok(0)`) once the terminating zero-length
/// chunk has been consumed; the caller constructs a fresh `Dechunker` for
/// the next message.
pub(crate) struct Dechunker<R: Read> {
    reader: R,
    chunk_size: usize,
    broken: bool,
}

impl<R: Read> Dechunker<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            chunk_size: 0,
            broken: false,
        }
    }

    fn error_wrap<T: Debug>(&mut self, res: io::Result<T>) -> io::Result<T> {
        if res.is_err() {
            self.broken = true;
        }
        res
    }
}

impl<R: Read> Read for Dechunker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.broken {
            panic!("attempted to read from a broken dechunker");
        }
        while self.chunk_size == 0 {
            let mut size_buf = [0; 2];
            let res = self.reader.read_exact(&mut size_buf);
            self.error_wrap(res)?;
            self.chunk_size = u16::from_be_bytes(size_buf).into_usize();
            trace!("S: <RAW> {size_buf:02X?}");
            if self.chunk_size == 0 {
                // terminator: let the caller observe EOF for this message
                return Ok(0);
            }
        }
        let new_buf_size = cmp::min(buf.len(), self.chunk_size);
        let buf = &mut buf[..new_buf_size];
        let res = self.reader.read_exact(buf).map(|_| new_buf_size);
        if log_enabled!(Level::Trace) && res.is_ok() {
            trace!("S: <RAW> {buf:02X?}");
        }
        self.chunk_size -= new_buf_size;
        self.error_wrap(res)
    }
}

impl<R: Read> Debug for Dechunker<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dechunker")
            .field("reader", &"...")
            .field("chunk_size", &self.chunk_size)
            .field("broken", &self.broken)
            .finish()
    }
}

impl<R: Read> Drop for Dechunker<R> {
    fn drop(&mut self) {
        if self.chunk_size > 0 && !self.broken {
            match panicking() {
                false => panic!("attempted to drop a dechunker with an unfinished chunk: {self:?}"),
                true => error!(
                    "attempted to drop a dechunker with an unfinished chunk \
                     while panicking: {self:?}"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn chunk_bytes(buffers: &[&[u8]]) -> Vec<u8> {
        let owned: Vec<Vec<u8>> = buffers.iter().map(|b| b.to_vec()).collect();
        let mut out = Vec::new();
        for chunk in Chunker::new(&owned) {
            out.extend_from_slice(&chunk);
        }
        out
    }

    #[test]
    fn test_small_message_single_chunk() {
        let out = chunk_bytes(&[&[1, 2, 3]]);
        assert_eq!(out, vec![0, 3, 1, 2, 3, 0, 0]);
    }

    #[test]
    fn test_empty_message() {
        let out = chunk_bytes(&[&[]]);
        assert_eq!(out, vec![0, 0]);
    }

    #[test]
    fn test_exactly_65535_bytes_single_chunk() {
        let payload = vec![0xABu8; 65535];
        let out = chunk_bytes(&[&payload]);
        assert_eq!(&out[0..2], &[0xFF, 0xFF]);
        assert_eq!(out.len(), 2 + 65535 + 2);
        assert_eq!(&out[out.len() - 2..], &[0, 0]);
    }

    #[test]
    fn test_65536_bytes_splits_into_two_chunks() {
        let payload = vec![0xABu8; 65536];
        let out = chunk_bytes(&[&payload]);
        assert_eq!(&out[0..2], &[0xFF, 0xFF]);
        let second_size_at = 2 + 65535;
        assert_eq!(&out[second_size_at..second_size_at + 2], &[0x00, 0x01]);
        assert_eq!(&out[out.len() - 2..], &[0, 0]);
    }

    fn dechunk(bytes: &[u8]) -> Vec<u8> {
        let mut dechunker = Dechunker::new(bytes);
        let mut out = Vec::new();
        dechunker.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_roundtrip_small() {
        let message = b"hello world".to_vec();
        let chunked = chunk_bytes(&[&message]);
        assert_eq!(dechunk(&chunked), message);
    }

    #[test]
    fn test_roundtrip_70000_bytes() {
        let message = vec![0x42u8; 70000];
        let chunked = chunk_bytes(&[&message]);
        // at least two length-prefixed chunks before the terminator
        assert!(chunked.len() > 70000 + 2 + 2);
        assert_eq!(&chunked[chunked.len() - 2..], &[0, 0]);
        assert_eq!(dechunk(&chunked), message);
    }

    #[test]
    fn test_tolerates_partial_reads() {
        struct Stutter<'a> {
            data: &'a [u8],
            pos: usize,
        }
        impl<'a> Read for Stutter<'a> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                let n = cmp::min(1, buf.len()).min(self.data.len() - self.pos);
                buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
                self.pos += n;
                Ok(n)
            }
        }
        let message = vec![1u8, 2, 3, 4, 5];
        let chunked = chunk_bytes(&[&message]);
        let mut dechunker = Dechunker::new(Stutter {
            data: &chunked,
            pos: 0,
        });
        let mut out = Vec::new();
        dechunker.read_to_end(&mut out).unwrap();
        assert_eq!(out, message);
    }
}
