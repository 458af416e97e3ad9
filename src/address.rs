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

use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::str::FromStr;
use std::vec::IntoIter;

pub(crate) const DEFAULT_PORT: u16 = 7687;
const COLON_BYTES: usize = ':'.len_utf8();

/// A host/port pair this crate connects to.
///
/// Resolving a host name to one or more `SocketAddr`s (custom resolvers,
/// DNS) is the caller's concern; `Address` itself only carries the
/// unresolved host and implements `ToSocketAddrs` by delegating to the
/// standard resolver.
#[derive(Debug, Clone)]
pub struct Address {
    host: String,
    port: u16,
    key: String,
}

impl PartialEq for Address {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.port == other.port
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.port.hash(state);
    }
}

impl Address {
    fn normalize_ip(host: &str) -> String {
        IpAddr::from_str(host)
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| host.to_string())
    }

    pub fn host(&self) -> &str {
        self.host.as_str()
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.host.find(':').is_some() {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl From<(String, u16)> for Address {
    fn from((host, port): (String, u16)) -> Self {
        let key = Self::normalize_ip(&host);
        Self { host, port, key }
    }
}

impl From<(&str, u16)> for Address {
    fn from((host, port): (&str, u16)) -> Self {
        let key = Self::normalize_ip(host);
        Self {
            host: String::from(host),
            port,
            key,
        }
    }
}

fn parse(host: &str) -> (String, u16) {
    if let Some(pos_colon) = host.rfind(':') {
        if let Some(pos_bracket) = host.rfind(']') {
            if pos_bracket < pos_colon {
                // [IPv6]:port (colon after bracket)
                let port = host[pos_colon + COLON_BYTES..]
                    .parse()
                    .unwrap_or(DEFAULT_PORT);
                (String::from(&host[..pos_colon]), port)
            } else {
                // [IPv6] (bracket after colon)
                (String::from(host), DEFAULT_PORT)
            }
        } else if host[..pos_colon].rfind(':').is_some() {
            // IPv6 (multiple colons)
            (String::from(host), DEFAULT_PORT)
        } else {
            // IPv4:port (single colon)
            let port = host[pos_colon + COLON_BYTES..]
                .parse()
                .unwrap_or(DEFAULT_PORT);
            (String::from(&host[..pos_colon]), port)
        }
    } else {
        // no colon => use default port
        (String::from(host), DEFAULT_PORT)
    }
}

impl From<&str> for Address {
    fn from(host: &str) -> Self {
        let (host, port) = parse(host);
        let key = Self::normalize_ip(&host);
        Self { host, port, key }
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Self::from((addr.ip().to_string(), addr.port()))
    }
}

impl ToSocketAddrs for Address {
    type Iter = IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> std::io::Result<Self::Iter> {
        (self.host.as_str(), self.port).to_socket_addrs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("localhost", "localhost", DEFAULT_PORT)]
    #[case("localhost:1234", "localhost", 1234)]
    #[case("127.0.0.1", "127.0.0.1", DEFAULT_PORT)]
    #[case("127.0.0.1:1234", "127.0.0.1", 1234)]
    #[case("::1", "::1", DEFAULT_PORT)]
    #[case("[::1]", "::1", DEFAULT_PORT)]
    #[case("[::1]:1234", "::1", 1234)]
    fn test_parse(#[case] input: &str, #[case] host: &str, #[case] port: u16) {
        let addr = Address::from(input);
        assert_eq!(addr.host(), host);
        assert_eq!(addr.port(), port);
    }

    #[test]
    fn test_display_v4() {
        let addr = Address::from("localhost:1234");
        assert_eq!(addr.to_string(), "localhost:1234");
    }

    #[test]
    fn test_display_v6() {
        let addr = Address::from("[::1]:1234");
        assert_eq!(addr.to_string(), "[::1]:1234");
    }

    #[test]
    fn test_eq_ignores_unresolved_form() {
        let a = Address::from("127.0.0.1:1234");
        let b = Address::from(("127.0.0.1", 1234));
        assert_eq!(a, b);
    }
}
