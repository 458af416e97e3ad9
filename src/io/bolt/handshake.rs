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

//! Version negotiation: the 4-byte magic preamble, four version proposals,
//! and either a legacy single-version reply or a manifest of offerings the
//! client picks from.

use std::io::{Read, Write};

use log::{debug, trace};

use crate::error::{Neo4jError, Result};
use crate::io::varint::{read_var_int, ReadVarIntError};
use crate::io::version::Version;

fn read_varint(stream: &mut impl Read) -> Result<u64> {
    read_var_int(stream).map_err(|err| match err {
        ReadVarIntError::Io(err) => Neo4jError::read_err(err),
        ReadVarIntError::TooBig => Neo4jError::protocol("manifest varint overflowed 64 bits"),
    })
}

const MAGIC_PREAMBLE: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// A reply whose major-version byte no legitimate Bolt version will ever
/// use, signaling "I'm offering you a manifest instead of one version" in
/// the same 4 bytes a legacy reply would occupy.
const MANIFEST_SENTINEL: u8 = 0xFF;

/// `(highest version in the band, size of the band - 1)`, offered
/// high-to-low as the four legacy proposal slots.
const PROPOSALS: [(Version, u8); 4] = [
    (Version::new(5, 6), 6),
    (Version::new(4, 4), 2),
    (Version::new(4, 1), 1),
    (Version::new(3, 0), 0),
];

/// Runs the handshake over an already-connected stream and returns the
/// negotiated version. `stream` must not have had anything written to or
/// read from it yet.
pub(crate) fn negotiate(stream: &mut (impl Read + Write)) -> Result<Version> {
    let mut proposal = Vec::with_capacity(20);
    proposal.extend_from_slice(&MAGIC_PREAMBLE);
    for (version, range) in PROPOSALS {
        proposal.extend_from_slice(&version.encode_with_range(range));
    }
    trace!("C: <HANDSHAKE> {proposal:02X?}");
    Neo4jError::wrap_write(stream.write_all(&proposal))?;
    Neo4jError::wrap_write(stream.flush())?;

    let mut reply = [0u8; 4];
    Neo4jError::wrap_read(stream.read_exact(&mut reply))?;
    trace!("S: <HANDSHAKE> {reply:02X?}");

    if reply[3] == MANIFEST_SENTINEL {
        negotiate_manifest(stream)
    } else {
        negotiate_legacy(reply)
    }
}

fn negotiate_legacy(reply: [u8; 4]) -> Result<Version> {
    let version = Version::parse(reply)
        .ok_or_else(|| Neo4jError::disconnect("Server rejected all protocol versions"))?;
    debug!("negotiated Bolt {version} (legacy handshake)");
    Ok(version)
}

/// A single offering in a manifest: the highest version of a contiguous
/// minor-version band the server supports, mirroring the encoding of our
/// own proposals.
struct Offering {
    highest: Version,
    range: u8,
}

impl Offering {
    fn parse(bytes: [u8; 4]) -> Option<Self> {
        Version::parse(bytes).map(|highest| Offering { highest, range: bytes[1] })
    }

    fn contains(&self, version: Version) -> bool {
        // `self.range` comes straight off the wire from a server-controlled
        // manifest offering; widen before adding so a hostile/buggy server
        // proposing a `range` near 255 can't overflow this into wrapping.
        version.major == self.highest.major
            && version.minor <= self.highest.minor
            && u16::from(version.minor) + u16::from(self.range) >= u16::from(self.highest.minor)
    }
}

fn negotiate_manifest(stream: &mut (impl Read + Write)) -> Result<Version> {
    let count = read_varint(stream)?;
    let mut offerings = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mut bytes = [0u8; 4];
        Neo4jError::wrap_read(stream.read_exact(&mut bytes))?;
        let offering = Offering::parse(bytes)
            .ok_or_else(|| Neo4jError::protocol("manifest offering named version 0"))?;
        offerings.push(offering);
    }
    // Capability mask: reserved for future use, read and discarded so the
    // stream stays aligned for the chosen-version reply that follows.
    let _capability_mask = read_varint(stream)?;

    let chosen = PROPOSALS
        .iter()
        .flat_map(|(highest, range)| {
            // Highest minor in the band first, so the first match found is
            // the best one this client can speak within that band.
            (0..=*range).map(move |back| Version::new(highest.major, highest.minor - back))
        })
        .find(|candidate| offerings.iter().any(|o| o.contains(*candidate)));

    match chosen {
        Some(version) => {
            Neo4jError::wrap_write(stream.write_all(&version.encode()))?;
            Neo4jError::wrap_write(stream.flush())?;
            debug!("negotiated Bolt {version} (manifest handshake)");
            Ok(version)
        }
        None => {
            Neo4jError::wrap_write(stream.write_all(&Version::UNINITIALIZED.encode()))?;
            let _ = stream.flush();
            Err(Neo4jError::disconnect("No mutually supported Bolt version found"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct MockStream {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl MockStream {
        fn new(input: Vec<u8>) -> Self {
            Self {
                input: Cursor::new(input),
                output: Vec::new(),
            }
        }
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_proposal_contains_magic_preamble() {
        let mut stream = MockStream::new(Version::new(5, 4).encode().to_vec());
        negotiate(&mut stream).unwrap();
        assert_eq!(&stream.output[0..4], &MAGIC_PREAMBLE);
        assert_eq!(stream.output.len(), 20);
    }

    #[test]
    fn test_legacy_negotiation_picks_server_version() {
        let mut stream = MockStream::new(Version::new(4, 2).encode().to_vec());
        let version = negotiate(&mut stream).unwrap();
        assert_eq!(version, Version::new(4, 2));
    }

    #[test]
    fn test_legacy_all_zero_is_rejected() {
        let mut stream = MockStream::new(vec![0, 0, 0, 0]);
        let err = negotiate(&mut stream).unwrap_err();
        assert!(matches!(err, Neo4jError::Connection { .. }));
    }

    #[test]
    fn test_manifest_negotiation_picks_highest_overlap() {
        let mut input = vec![0, 0, 0, MANIFEST_SENTINEL];
        input.push(1); // one offering
        input.extend_from_slice(&Version::new(5, 3).encode_with_range(3)); // offers 5.0-5.3
        input.push(0); // capability mask = 0
        let mut stream = MockStream::new(input);
        let version = negotiate(&mut stream).unwrap();
        assert_eq!(version, Version::new(5, 3));
        assert_eq!(stream.output[20..24], Version::new(5, 3).encode());
    }

    #[test]
    fn test_manifest_negotiation_no_overlap_fails() {
        let mut input = vec![0, 0, 0, MANIFEST_SENTINEL];
        input.push(1);
        input.extend_from_slice(&Version::new(2, 0).encode_with_range(0));
        input.push(0);
        let mut stream = MockStream::new(input);
        let err = negotiate(&mut stream).unwrap_err();
        assert!(matches!(err, Neo4jError::Connection { .. }));
        assert_eq!(&stream.output[20..24], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_offering_contains_does_not_overflow_on_large_range() {
        // A server is free to send any byte as `range`; it must not be able
        // to overflow the `minor + range` check just by sending one near 255.
        let offering = Offering::parse(Version::new(5, 3).encode_with_range(250)).unwrap();
        assert!(offering.contains(Version::new(5, 0)));
        assert!(offering.contains(Version::new(5, 3)));
        assert!(!offering.contains(Version::new(4, 3)));
    }

    #[test]
    fn test_manifest_negotiation_survives_large_range_offering() {
        let mut input = vec![0, 0, 0, MANIFEST_SENTINEL];
        input.push(1);
        input.extend_from_slice(&Version::new(5, 3).encode_with_range(250));
        input.push(0);
        let mut stream = MockStream::new(input);
        let version = negotiate(&mut stream).unwrap();
        assert_eq!(version, Version::new(5, 3));
    }
}
