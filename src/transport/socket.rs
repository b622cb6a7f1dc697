//! UDP socket for the data plane.
//!
//! The socket is bound before the handshake so its OS-assigned port can be
//! announced to the controller, then handed to the tunnel at activation.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::{UdpSocket, lookup_host};

/// Data-plane UDP socket.
#[derive(Debug, Clone)]
pub struct DataPlaneSocket {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
}

impl DataPlaneSocket {
    /// Bind to an explicit local address.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Self::from_socket(socket)
    }

    /// Bind an ephemeral port on the unspecified address of `peer`'s family.
    pub async fn bind_for_peer(peer: IpAddr) -> io::Result<Self> {
        Self::bind(unspecified_for(peer)).await
    }

    /// Wrap an already-bound socket.
    pub fn from_socket(socket: UdpSocket) -> io::Result<Self> {
        let local_addr = socket.local_addr()?;
        Ok(Self {
            socket: Arc::new(socket),
            local_addr,
        })
    }

    /// Local address, with the port the OS assigned.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Local port, as announced to the controller.
    pub fn local_port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Shared handle to the underlying socket.
    pub fn socket_arc(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.socket)
    }
}

/// `0.0.0.0:0` or `[::]:0`, matching `peer`'s address family.
pub fn unspecified_for(peer: IpAddr) -> SocketAddr {
    match peer {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    }
}

/// Resolve `host:port`, taking the first address returned.
pub async fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    // Bracketed IPv6 literals (as written in URLs) are accepted too.
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    lookup_host((bare, port)).await?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no address found for {host}"),
        )
    })
}
