use std::fmt;
use std::io;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};

/// Socket type used when an address does not name a scheme.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// A persistent TCP stream.
    Tcp,
    /// A connected UDP socket.
    Udp,
}

impl Scheme {
    /// Returns the URL scheme name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Splits an address into its scheme and `host:port` part.
///
/// Addresses without `scheme://` prefix use `default`.
pub fn split_scheme(addr: &str, default: Scheme) -> io::Result<(Scheme, &str)> {
    let Some((scheme, host)) = addr.split_once("://") else {
        return Ok((default, addr));
    };

    let scheme = match scheme {
        "tcp" => Scheme::Tcp,
        "udp" => Scheme::Udp,
        _ => {
            return Err(io::Error::other(format!(
                "invalid scheme '{scheme}', expected one of 'tcp', 'udp'"
            )));
        }
    };

    Ok((scheme, host))
}

/// The outbound connection of a stream or datagram sink.
///
/// The connection is established once and never re-established. Write failures are returned to
/// the caller.
#[derive(Debug)]
pub enum Transport {
    /// A persistent TCP stream.
    Tcp(TcpStream),
    /// A UDP socket connected to the backend.
    Udp(UdpSocket),
}

impl Transport {
    /// Connects to `addr`, which is either `tcp://host:port`, `udp://host:port` or `host:port`.
    pub async fn connect(addr: &str, default: Scheme) -> io::Result<Self> {
        let (scheme, host) = split_scheme(addr, default)?;

        Ok(match scheme {
            Scheme::Tcp => Self::Tcp(TcpStream::connect(host).await?),
            Scheme::Udp => {
                let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
                socket.connect(host).await?;
                Self::Udp(socket)
            }
        })
    }

    /// Returns the socket type of this transport.
    pub fn scheme(&self) -> Scheme {
        match self {
            Self::Tcp(_) => Scheme::Tcp,
            Self::Udp(_) => Scheme::Udp,
        }
    }

    /// Writes a full buffer. Datagrams are sent as a single packet.
    pub async fn send(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.write_all(buf).await,
            Self::Udp(socket) => socket.send(buf).await.map(drop),
        }
    }

    /// Flushes and shuts down the write half of a stream.
    pub async fn close(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => {
                stream.flush().await?;
                stream.shutdown().await
            }
            Self::Udp(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn test_split_scheme() {
        assert_eq!(
            split_scheme("udp://127.0.0.1:8089", Scheme::Tcp).unwrap(),
            (Scheme::Udp, "127.0.0.1:8089")
        );
        assert_eq!(
            split_scheme("tcp://127.0.0.1:4242", Scheme::Udp).unwrap(),
            (Scheme::Tcp, "127.0.0.1:4242")
        );
        assert_eq!(
            split_scheme("127.0.0.1:4242", Scheme::Tcp).unwrap(),
            (Scheme::Tcp, "127.0.0.1:4242")
        );
    }

    #[test]
    fn test_invalid_scheme() {
        let error = split_scheme("unixgram:///tmp/sock", Scheme::Udp).unwrap_err();
        insta::assert_snapshot!(error, @"invalid scheme 'unixgram', expected one of 'tcp', 'udp'");
    }

    #[tokio::test]
    async fn test_tcp_send() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut transport = Transport::connect(&format!("tcp://{addr}"), Scheme::Udp)
            .await
            .unwrap();
        assert_eq!(transport.scheme(), Scheme::Tcp);

        let (mut peer, _) = listener.accept().await.unwrap();
        transport.send(b"hello\n").await.unwrap();
        transport.close().await.unwrap();

        let mut received = String::new();
        peer.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "hello\n");
    }

    #[tokio::test]
    async fn test_udp_send() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();

        let mut transport = Transport::connect(&addr.to_string(), Scheme::Udp)
            .await
            .unwrap();
        transport.send(b"datagram\n").await.unwrap();

        let mut buf = [0; 64];
        let len = server.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"datagram\n");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert!(Transport::connect(&addr.to_string(), Scheme::Tcp).await.is_err());
    }
}
