use crate::bip::bvlc::BvlcFrame;
use bacwire_core::EncodeError;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UdpSocket;

/// The default BACnet/IP port, 0xBAC0.
pub const BACNET_DEFAULT_PORT: u16 = 0xBAC0;

/// Largest BACnet/IP frame this link will send.
pub const MAX_FRAME_LEN: usize = 1600;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("frame too large")]
    FrameTooLarge,
    #[error("invalid prefix length {0}")]
    InvalidPrefix(u8),
}

/// The BACnet/IP UDP socket. The link moves whole datagrams and BVLC
/// frames; NPDU and APDU interpretation happens above it.
#[derive(Debug, Clone)]
pub struct BacnetIpLink {
    socket: Arc<UdpSocket>,
    broadcast_ip: Ipv4Addr,
    port: u16,
}

impl BacnetIpLink {
    /// Binds on `0.0.0.0:port` with broadcasting enabled. The local
    /// broadcast address is `ip | !netmask` for the given prefix length.
    pub async fn bind(ip: Ipv4Addr, prefix_len: u8, port: u16) -> Result<Self, LinkError> {
        let broadcast_ip = broadcast_address(ip, prefix_len)?;
        let socket = UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
            .await?;
        socket.set_broadcast(true)?;
        Ok(Self {
            socket: Arc::new(socket),
            broadcast_ip,
            port,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, LinkError> {
        self.socket.local_addr().map_err(LinkError::Io)
    }

    /// The port peers are addressed on (the bound port unless it was 0).
    pub fn peer_port(&self) -> u16 {
        if self.port != 0 {
            self.port
        } else {
            self.local_addr()
                .map(|addr| addr.port())
                .unwrap_or(BACNET_DEFAULT_PORT)
        }
    }

    pub fn broadcast_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.broadcast_ip, self.peer_port())
    }

    pub fn unicast_addr(&self, ip: Ipv4Addr) -> SocketAddrV4 {
        SocketAddrV4::new(ip, self.peer_port())
    }

    pub async fn send_frame(&self, frame: &BvlcFrame, dest: SocketAddr) -> Result<(), LinkError> {
        let bytes = frame.to_vec()?;
        if bytes.len() > MAX_FRAME_LEN {
            return Err(LinkError::FrameTooLarge);
        }
        self.socket.send_to(&bytes, dest).await?;
        Ok(())
    }

    /// Receives one datagram. The buffer should be at least 2 KiB; oversize
    /// datagrams are truncated by the OS.
    pub async fn recv_datagram(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), LinkError> {
        let (n, src) = self.socket.recv_from(buf).await?;
        Ok((n, src))
    }
}

fn broadcast_address(ip: Ipv4Addr, prefix_len: u8) -> Result<Ipv4Addr, LinkError> {
    if prefix_len > 32 {
        return Err(LinkError::InvalidPrefix(prefix_len));
    }
    let mask: u32 = if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - prefix_len as u32)
    };
    Ok(Ipv4Addr::from(u32::from(ip) | !mask))
}

#[cfg(test)]
mod tests {
    use super::{broadcast_address, BacnetIpLink, LinkError};
    use crate::bip::bvlc::{BvlcFrame, BvlcFunction};
    use std::net::Ipv4Addr;

    #[test]
    fn broadcast_is_ip_or_inverted_mask() {
        assert_eq!(
            broadcast_address(Ipv4Addr::new(192, 168, 1, 10), 24).unwrap(),
            Ipv4Addr::new(192, 168, 1, 255)
        );
        assert_eq!(
            broadcast_address(Ipv4Addr::new(10, 2, 3, 4), 8).unwrap(),
            Ipv4Addr::new(10, 255, 255, 255)
        );
        assert_eq!(
            broadcast_address(Ipv4Addr::new(172, 16, 5, 1), 31).unwrap(),
            Ipv4Addr::new(172, 16, 5, 1)
        );
    }

    #[test]
    fn prefix_past_32_is_rejected() {
        assert!(matches!(
            broadcast_address(Ipv4Addr::LOCALHOST, 33),
            Err(LinkError::InvalidPrefix(33))
        ));
    }

    #[tokio::test]
    async fn frames_cross_the_loopback() {
        let a = BacnetIpLink::bind(Ipv4Addr::LOCALHOST, 32, 0).await.unwrap();
        let b = BacnetIpLink::bind(Ipv4Addr::LOCALHOST, 32, 0).await.unwrap();

        let frame = BvlcFrame::new(BvlcFunction::OriginalUnicastNpdu, vec![1, 2, 3]);
        a.send_frame(&frame, b.local_addr().unwrap()).await.unwrap();

        let mut buf = [0u8; 64];
        let (n, src) = b.recv_datagram(&mut buf).await.unwrap();
        assert_eq!(src.port(), a.local_addr().unwrap().port());
        assert_eq!(BvlcFrame::decode(&buf[..n]).unwrap(), frame);
    }
}
