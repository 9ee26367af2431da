use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use anyhow::Context;

/// Best-effort datagram transport. No delivery guarantee; any timeout
/// belongs to the implementation, never to the callers.
pub trait Transport: Send + Sync {
    fn send(&self, data: &[u8], address: IpAddr, port: u16) -> anyhow::Result<()>;

    fn receive(&self, buffer: &mut [u8], timeout: Duration) -> anyhow::Result<usize>;
}

/// UDP transport bound to all interfaces, with broadcast enabled so a
/// single socket serves unicast, broadcast and multicast sends.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub fn new() -> anyhow::Result<Self> {
        Self::bind(0)
    }

    pub fn bind(port: u16) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
            .with_context(|| format!("binding UDP socket on port {port}"))?;
        socket.set_broadcast(true).context("enabling broadcast")?;
        Ok(UdpTransport { socket })
    }
}

impl Transport for UdpTransport {
    fn send(&self, data: &[u8], address: IpAddr, port: u16) -> anyhow::Result<()> {
        self.socket
            .send_to(data, SocketAddr::new(address, port))
            .with_context(|| format!("sending {} bytes to {address}:{port}", data.len()))?;
        Ok(())
    }

    fn receive(&self, buffer: &mut [u8], timeout: Duration) -> anyhow::Result<usize> {
        self.socket
            .set_read_timeout(Some(timeout))
            .context("setting read timeout")?;
        let (len, _from) = self.socket.recv_from(buffer).context("receiving datagram")?;
        Ok(len)
    }
}
