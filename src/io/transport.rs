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

//! The abstract socket contract the core consumes, plus the one concrete
//! TCP (optionally TLS) implementation this crate ships.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use crate::address::Address;
use crate::error::{Neo4jError, Result};

/// A byte-oriented, ordered, full-duplex connection to a server. The core
/// only ever calls `connect`, reads through `Read`, writes through
/// `Write`, and eventually `disconnect`s; everything else (TLS, proxies,
/// multiplexing) is the implementation's business.
pub trait Transport: Read + Write {
    fn disconnect(&mut self) -> Result<()>;

    /// An independent handle to the underlying socket, kept apart from the
    /// `Read`/`Write` half so [`crate::io::deadline::DeadlineIO`] can adjust
    /// timeouts around it while a `&mut` borrow of the transport itself is
    /// in use for the actual read/write. `None` for transports not backed
    /// by a real `TcpStream` (e.g. an in-memory test double).
    fn try_clone_raw(&self) -> Result<Option<TcpStream>> {
        Ok(None)
    }
}

/// A plain (optionally TLS-wrapped) TCP transport, the only concrete
/// transport this crate provides.
pub struct TcpTransport {
    inner: TcpTransportInner,
}

enum TcpTransportInner {
    Plain(TcpStream),
    Tls(Box<rustls::StreamOwned<rustls::ClientConnection, TcpStream>>),
}

impl TcpTransport {
    pub fn connect(address: &Address, connect_timeout: Option<Duration>) -> Result<Self> {
        let stream = Neo4jError::wrap_connect(connect_any(address, connect_timeout))?;
        Ok(Self {
            inner: TcpTransportInner::Plain(stream),
        })
    }

    pub fn connect_tls(
        address: &Address,
        connect_timeout: Option<Duration>,
        tls_config: Arc<rustls::ClientConfig>,
        validator: &dyn CertificateValidator,
    ) -> Result<Self> {
        let stream = Neo4jError::wrap_connect(connect_any(address, connect_timeout))?;
        validator
            .should_trust(address.host())
            .then_some(())
            .ok_or_else(|| Neo4jError::service("server certificate not trusted"))?;
        let server_name = rustls::ServerName::try_from(address.host())
            .map_err(|err| Neo4jError::service(format!("invalid server name: {err}")))?;
        let conn = rustls::ClientConnection::new(tls_config, server_name)
            .map_err(|err| Neo4jError::service(format!("failed to start TLS session: {err}")))?;
        let tls_stream = rustls::StreamOwned::new(conn, stream);
        Ok(Self {
            inner: TcpTransportInner::Tls(Box::new(tls_stream)),
        })
    }

    pub fn set_read_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        let stream = self.raw_stream();
        Neo4jError::wrap_write(stream.set_read_timeout(timeout))?;
        Neo4jError::wrap_write(stream.set_write_timeout(timeout))
    }

    pub fn raw_stream(&self) -> &TcpStream {
        match &self.inner {
            TcpTransportInner::Plain(stream) => stream,
            TcpTransportInner::Tls(stream) => &stream.sock,
        }
    }

    pub fn set_keep_alive(&self, keep_alive: bool) -> Result<()> {
        let socket = socket2::SockRef::from(self.raw_stream());
        Neo4jError::wrap_connect(socket.set_keepalive(keep_alive))
    }
}

fn connect_any(address: &Address, timeout: Option<Duration>) -> std::io::Result<TcpStream> {
    let addrs: Vec<_> = address.to_socket_addrs()?.collect();
    let mut last_err = None;
    for addr in addrs {
        let res = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match res {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "could not resolve to any addresses",
        )
    }))
}

impl Read for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            TcpTransportInner::Plain(stream) => stream.read(buf),
            TcpTransportInner::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            TcpTransportInner::Plain(stream) => stream.write(buf),
            TcpTransportInner::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            TcpTransportInner::Plain(stream) => stream.flush(),
            TcpTransportInner::Tls(stream) => stream.flush(),
        }
    }
}

impl Transport for TcpTransport {
    fn disconnect(&mut self) -> Result<()> {
        Neo4jError::wrap_connect(self.raw_stream().shutdown(Shutdown::Both))
    }

    fn try_clone_raw(&self) -> Result<Option<TcpStream>> {
        Neo4jError::wrap_connect(self.raw_stream().try_clone()).map(Some)
    }
}

/// Certificate trust policy the TLS layer consults at handshake time. The
/// core itself never touches certificates; this exists purely so a caller
/// can plug in one of the four conventional policies.
pub trait CertificateValidator: Send + Sync {
    fn should_trust(&self, hostname: &str) -> bool;
}

/// Accepts any certificate. Only meant for local development against a
/// self-signed server.
pub struct TrustAll;

impl CertificateValidator for TrustAll {
    fn should_trust(&self, _hostname: &str) -> bool {
        true
    }
}

/// Relies on rustls' own verification against the platform's trust store;
/// this validator is a no-op because rejection already happened inside
/// the TLS handshake.
pub struct TrustSystemCas;

impl CertificateValidator for TrustSystemCas {
    fn should_trust(&self, _hostname: &str) -> bool {
        true
    }
}

/// Trusts a fixed set of hosts by name, standing in for certificate
/// pinning. A real pin check needs the peer certificate's hash, which
/// `should_trust`'s `(hostname)` signature does not carry — wiring that
/// through requires a custom `rustls::ServerCertVerifier`, which is out of
/// this crate's core (the spec calls the whole validation policy "trivial
/// and not part of the core"). Pinning the actual certificate is left to a
/// caller supplying their own `CertificateValidator` alongside a
/// `ServerCertVerifier`-customized `rustls::ClientConfig`.
pub struct PinnedCertificate {
    allowed_hosts: std::collections::HashSet<String>,
}

impl PinnedCertificate {
    pub fn new(allowed_hosts: impl IntoIterator<Item = String>) -> Self {
        Self {
            allowed_hosts: allowed_hosts.into_iter().collect(),
        }
    }
}

impl CertificateValidator for PinnedCertificate {
    fn should_trust(&self, hostname: &str) -> bool {
        self.allowed_hosts.contains(hostname)
    }
}

/// Trust-on-first-use against a persisted `"{host}:{port}" -> fingerprint`
/// file (spec §6.4). Like [`PinnedCertificate`], this validator only ever
/// sees a hostname, not the peer certificate's hash, so it cannot itself
/// detect a changed certificate; it records the first host it is asked
/// about and trusts every host it already knows, which is the useful
/// subset of TOFU behavior reachable without a custom verifier wired into
/// rustls. The backing file is read-modify-written under an OS file lock
/// so concurrent connections never race on the same entry.
pub struct TrustOnFirstUse {
    store_path: std::path::PathBuf,
}

impl TrustOnFirstUse {
    pub fn new(store_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
        }
    }

    fn load(&self) -> std::collections::HashSet<String> {
        std::fs::read_to_string(&self.store_path)
            .map(|contents| contents.lines().map(String::from).collect())
            .unwrap_or_default()
    }

    fn record(&self, hostname: &str) -> Result<()> {
        use std::fs::OpenOptions;
        use std::io::Write as _;

        use fs2::FileExt;

        let mut file = Neo4jError::wrap_connect(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.store_path),
        )?;
        Neo4jError::wrap_connect(file.lock_exclusive())?;
        let result = Neo4jError::wrap_connect(writeln!(file, "{hostname}"));
        let _ = file.unlock();
        result
    }
}

impl CertificateValidator for TrustOnFirstUse {
    fn should_trust(&self, hostname: &str) -> bool {
        if self.load().contains(hostname) {
            return true;
        }
        self.record(hostname).is_ok()
    }
}

pub fn system_roots_tls_config() -> Result<Arc<rustls::ClientConfig>> {
    let mut roots = rustls::RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs()
        .map_err(|err| Neo4jError::service(format!("failed to load native certs: {err}")))?;
    for cert in native {
        let _ = roots.add(&rustls::Certificate(cert.0));
    }
    Ok(Arc::new(
        rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    ))
}

/// Builds a TLS config trusting only the CA certificates in the given PEM
/// files, for servers whose certificate isn't signed by a public CA.
pub fn custom_ca_tls_config(paths: &[impl AsRef<std::path::Path>]) -> Result<Arc<rustls::ClientConfig>> {
    use std::fs::File;
    use std::io::BufReader;

    let mut roots = rustls::RootCertStore::empty();
    for path in paths {
        let file = Neo4jError::wrap_connect(File::open(path))?;
        let mut reader = BufReader::new(file);
        let certs = Neo4jError::wrap_connect(rustls_pemfile::certs(&mut reader))?;
        for cert in certs {
            roots
                .add(&rustls::Certificate(cert))
                .map_err(|err| Neo4jError::service(format!("failed to add certificate to root store: {err}")))?;
        }
    }
    Ok(Arc::new(
        rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_all_always_trusts() {
        let validator = TrustAll;
        assert!(validator.should_trust("anything"));
    }

    #[test]
    fn test_pinned_certificate_only_trusts_listed_hosts() {
        let validator = PinnedCertificate::new(["neo4j.example.com".to_string()]);
        assert!(validator.should_trust("neo4j.example.com"));
        assert!(!validator.should_trust("evil.example.com"));
    }

    #[test]
    fn test_trust_on_first_use_remembers_hosts_across_instances() {
        let dir = std::env::temp_dir().join(format!(
            "neo4j-bolt-core-tofu-test-{}",
            std::process::id()
        ));
        let store_path = dir.with_extension("txt");
        let _ = std::fs::remove_file(&store_path);

        let first = TrustOnFirstUse::new(store_path.clone());
        assert!(first.should_trust("neo4j.example.com"));

        let second = TrustOnFirstUse::new(store_path.clone());
        assert!(second.should_trust("neo4j.example.com"));

        let _ = std::fs::remove_file(&store_path);
    }

    #[test]
    fn test_custom_ca_tls_config_rejects_missing_file() {
        let err = custom_ca_tls_config(&["/no/such/ca-bundle.pem"]).unwrap_err();
        assert!(matches!(err, Neo4jError::Connection { .. }));
    }
}
