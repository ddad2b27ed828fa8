//! Plain syslog sink.
//!
//! Each chunk becomes one log message at severity info. There is no
//! queueing and no concurrency: a chunk is read, written, and the next
//! chunk is read only after the write returns.
//!
//! Network format: `<PRI>RFC3339 HOSTNAME TAG[PID]: MSG\n`
//! Local format:   `<PRI>Mmm dd hh:mm:ss TAG[PID]: MSG\n`

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;

use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket, UnixDatagram, UnixStream};

use rider_core::{SyslogConfig, SyslogTransport};

use crate::error::RelayError;
use crate::source::ChunkSource;

/// Facility kern, severity info.
const PRIORITY: u8 = 6;

const LOCAL_SOCKETS: [&str; 3] = ["/dev/log", "/var/run/syslog", "/var/run/log"];

enum Conn {
    Udp(UdpSocket),
    Tcp(TcpStream),
    Local(UnixDatagram),
    LocalStream(UnixStream),
}

pub struct SyslogSink {
    conn: Conn,
    tag: String,
    hostname: String,
    pid: u32,
    verbose: bool,
}

impl SyslogSink {
    pub async fn connect(config: &SyslogConfig) -> Result<Self, RelayError> {
        let dial_err = |source| RelayError::Sink { op: "dial", source };

        let conn = match config.transport {
            SyslogTransport::Udp => {
                let peer = resolve(&config.address).await.map_err(dial_err)?;
                let bind: SocketAddr = if peer.is_ipv6() {
                    (Ipv6Addr::UNSPECIFIED, 0).into()
                } else {
                    (Ipv4Addr::UNSPECIFIED, 0).into()
                };
                let socket = UdpSocket::bind(bind).await.map_err(dial_err)?;
                socket.connect(peer).await.map_err(dial_err)?;
                Conn::Udp(socket)
            }
            SyslogTransport::Tcp => {
                Conn::Tcp(TcpStream::connect(&config.address).await.map_err(dial_err)?)
            }
            SyslogTransport::Local => connect_local(&LOCAL_SOCKETS).await.map_err(dial_err)?,
        };

        tracing::debug!(
            transport = %config.transport,
            address = %config.address,
            tag = %config.tag,
            "syslog sink connected"
        );

        Ok(Self {
            conn,
            tag: config.tag.clone(),
            hostname: hostname(),
            pid: std::process::id(),
            verbose: config.verbose,
        })
    }

    /// Write one message. Returns the payload length.
    pub async fn write(&mut self, msg: &[u8]) -> Result<usize, RelayError> {
        let line = self.format(msg);
        let write_err = |source| RelayError::Sink { op: "write", source };

        match &mut self.conn {
            Conn::Udp(socket) => {
                socket.send(&line).await.map_err(write_err)?;
            }
            Conn::Tcp(stream) => stream.write_all(&line).await.map_err(write_err)?,
            Conn::Local(socket) => {
                socket.send(&line).await.map_err(write_err)?;
            }
            Conn::LocalStream(stream) => stream.write_all(&line).await.map_err(write_err)?,
        }

        if self.verbose {
            eprintln!("written: {}", msg.len());
        }
        Ok(msg.len())
    }

    fn format(&self, msg: &[u8]) -> Vec<u8> {
        let now = chrono::Local::now();
        let header = match self.conn {
            Conn::Local(_) | Conn::LocalStream(_) => format!(
                "<{PRIORITY}>{} {}[{}]: ",
                now.format("%b %e %H:%M:%S"),
                self.tag,
                self.pid
            ),
            Conn::Udp(_) | Conn::Tcp(_) => format!(
                "<{PRIORITY}>{} {} {}[{}]: ",
                now.to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
                self.hostname,
                self.tag,
                self.pid
            ),
        };

        let mut line = Vec::with_capacity(header.len() + msg.len() + 1);
        line.extend_from_slice(header.as_bytes());
        line.extend_from_slice(msg);
        if !msg.ends_with(b"\n") {
            line.push(b'\n');
        }
        line
    }
}

/// Copy every chunk from `source` into `sink`. Returns the message count.
pub async fn forward<R: AsyncRead + Unpin>(
    source: &mut ChunkSource<R>,
    sink: &mut SyslogSink,
) -> Result<u64, RelayError> {
    let mut messages = 0u64;
    while let Some(chunk) = source.next_chunk().await? {
        sink.write(&chunk).await?;
        messages += 1;
    }
    tracing::debug!(messages, "end of input");
    Ok(messages)
}

async fn resolve(addr: &str) -> std::io::Result<SocketAddr> {
    tokio::net::lookup_host(addr)
        .await?
        .next()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"))
}

/// First socket that accepts a connection, datagram before stream at each path.
async fn connect_local<P: AsRef<Path>>(paths: &[P]) -> std::io::Result<Conn> {
    let mut last_err = None;
    for path in paths {
        let path = path.as_ref();
        let socket = UnixDatagram::unbound()?;
        match socket.connect(path) {
            Ok(()) => return Ok(Conn::Local(socket)),
            Err(e) => last_err = Some(e),
        }
        match UnixStream::connect(path).await {
            Ok(stream) => return Ok(Conn::LocalStream(stream)),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::ErrorKind::NotFound.into()))
}

fn hostname() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for buf.len() bytes; gethostname NUL-terminates on success.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast::<libc::c_char>(), buf.len()) };
    if rc != 0 {
        return "localhost".to_string();
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
