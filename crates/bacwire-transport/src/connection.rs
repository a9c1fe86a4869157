use crate::nexus::MessageNexus;
use crate::TransportError;
use bacwire_core::apdu::UnconfirmedRequest;
use bacwire_core::encoding::writer::Writer;
use bacwire_core::npdu::{Npdu, NpduAddress, Priority};
use bacwire_datalink::{
    BacnetIpLink, BvlcFrame, BvlcFunction, BACNET_DEFAULT_PORT, MAX_FRAME_LEN,
};
use log::{debug, warn};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Size of the fresh buffer allocated per received datagram.
const RECV_BUFFER_LEN: usize = 2048;

#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    pub ip: Ipv4Addr,
    pub prefix_len: u8,
    pub port: u16,
}

impl ConnectionConfig {
    pub const fn new(ip: Ipv4Addr, prefix_len: u8) -> Self {
        Self {
            ip,
            prefix_len,
            port: BACNET_DEFAULT_PORT,
        }
    }

    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

struct IncomingDatagram {
    source: SocketAddr,
    data: Vec<u8>,
}

struct ConnectionState {
    cancel: Option<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
}

/// The BACnet/IP connection: one UDP socket, a listener task, and a
/// dispatch task feeding the message router.
///
/// `start` and `stop` pair up; `stop` cancels both tasks and waits for
/// them, after which no further messages reach the router.
pub struct Connection {
    link: BacnetIpLink,
    local_ip: Ipv4Addr,
    router: Option<Arc<MessageNexus>>,
    state: Mutex<ConnectionState>,
}

/// Binds a connection on the default BACnet port for the given interface
/// address and prefix length.
pub async fn new_connection(ip: Ipv4Addr, prefix_len: u8) -> Result<Connection, TransportError> {
    Connection::connect(ConnectionConfig::new(ip, prefix_len)).await
}

impl Connection {
    pub async fn connect(config: ConnectionConfig) -> Result<Self, TransportError> {
        let link = BacnetIpLink::bind(config.ip, config.prefix_len, config.port).await?;
        Ok(Self {
            link,
            local_ip: config.ip,
            router: None,
            state: Mutex::new(ConnectionState {
                cancel: None,
                tasks: Vec::new(),
            }),
        })
    }

    pub fn set_router(&mut self, router: Arc<MessageNexus>) {
        self.router = Some(router);
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.link.local_addr()?)
    }

    /// Spawns the socket listener and the dispatch task. A router must be
    /// set first.
    pub fn start(&self) -> Result<(), TransportError> {
        let router = self.router.clone().ok_or(TransportError::RouterNotSet)?;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.cancel.is_some() {
            return Err(TransportError::AlreadyStarted);
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (data_tx, data_rx) = mpsc::channel(1);
        state.tasks.push(tokio::spawn(listener_task(
            self.link.clone(),
            data_tx,
            cancel_rx.clone(),
        )));
        state
            .tasks
            .push(tokio::spawn(dispatch_task(router, data_rx, cancel_rx)));
        state.cancel = Some(cancel_tx);
        Ok(())
    }

    /// Cancels and joins the listener and dispatch tasks. After this
    /// returns the connection sends nothing more into the router.
    pub async fn stop(&self) {
        let (cancel, tasks) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            (state.cancel.take(), std::mem::take(&mut state.tasks))
        };
        if let Some(cancel) = cancel {
            let _ = cancel.send(true);
        }
        for task in tasks {
            let _ = task.await;
        }
    }

    /// Encodes the request through all three layers and broadcasts it.
    /// Encoder errors surface to the caller verbatim.
    pub async fn send_unconfirmed(
        &self,
        priority: Priority,
        request: &UnconfirmedRequest,
    ) -> Result<(), TransportError> {
        let mut apdu_buf = [0u8; MAX_FRAME_LEN];
        let mut w = Writer::new(&mut apdu_buf);
        request.encode(&mut w)?;
        let npdu = Npdu::application(priority, w.as_written().to_vec());
        self.broadcast_npdu(&npdu).await
    }

    /// Broadcasts a network-layer message.
    pub async fn send_network_message(
        &self,
        priority: Priority,
        message_type: u8,
        vendor_id: Option<u16>,
    ) -> Result<(), TransportError> {
        let npdu = Npdu::network_message(priority, message_type, vendor_id);
        self.broadcast_npdu(&npdu).await
    }

    async fn broadcast_npdu(&self, npdu: &Npdu) -> Result<(), TransportError> {
        let mut npdu_buf = [0u8; MAX_FRAME_LEN];
        let mut w = Writer::new(&mut npdu_buf);
        npdu.encode(&mut w)?;
        let frame = BvlcFrame::new(BvlcFunction::OriginalBroadcastNpdu, w.as_written().to_vec());
        self.link
            .send_frame(&frame, self.link.broadcast_addr().into())
            .await?;
        Ok(())
    }

    /// This node as an NPDU source address: local network, IP plus port.
    pub fn source_address(&self) -> NpduAddress {
        ip_port_address(self.local_ip, self.link.peer_port())
    }

    /// The local-network broadcast marker (no MAC bytes).
    pub fn broadcast_address(&self) -> NpduAddress {
        NpduAddress::broadcast(0)
    }

    /// A unicast peer on the local network as an NPDU address.
    pub fn destination_address(&self, ip: Ipv4Addr) -> NpduAddress {
        ip_port_address(ip, self.link.peer_port())
    }
}

fn ip_port_address(ip: Ipv4Addr, port: u16) -> NpduAddress {
    let mut mac = [0u8; 6];
    mac[..4].copy_from_slice(&ip.octets());
    mac[4..].copy_from_slice(&port.to_be_bytes());
    NpduAddress::new(0, &mac).expect("6-byte MAC always fits")
}

/// Reads datagrams into fresh buffers and queues them for dispatch.
async fn listener_task(
    link: BacnetIpLink,
    data_tx: mpsc::Sender<IncomingDatagram>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        let mut buf = vec![0u8; RECV_BUFFER_LEN];
        tokio::select! {
            received = link.recv_datagram(&mut buf) => {
                let (n, source) = match received {
                    Ok(received) => received,
                    Err(error) => {
                        warn!("socket receive failed: {error}");
                        continue;
                    }
                };
                buf.truncate(n);
                if data_tx
                    .send(IncomingDatagram { source, data: buf })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            _ = cancel.changed() => break,
        }
    }
}

/// Drains the listener queue, decodes the BVLC envelope, and routes.
/// Malformed datagrams are logged and discarded; the task never dies on
/// bad input.
async fn dispatch_task(
    router: Arc<MessageNexus>,
    mut data_rx: mpsc::Receiver<IncomingDatagram>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            maybe_incoming = data_rx.recv() => {
                let Some(incoming) = maybe_incoming else { break };
                match BvlcFrame::decode(&incoming.data) {
                    Ok(frame) => router.route(frame).await,
                    Err(error) => {
                        debug!(
                            "discarding malformed datagram from {}: {error}",
                            incoming.source
                        );
                    }
                }
            }
            _ = cancel.changed() => break,
        }
    }
}
