//! Control-plane socket: token dissemination over UDP multicast.
//!
//! One socket serves both directions. Receives are decoded on a
//! background task and handed to the dispatcher through an unbounded
//! channel; transmits are queued to a sender task that addresses the
//! all-nodes group on every datagram. The socket is never connected, so
//! a single send reaches every listening peer.

use {
    crate::{
        codec,
        config::NetConfig,
        error::{NetError, Result},
    },
    canopy_dissemination::token::TokenPacket,
    log::*,
    std::{
        net::{IpAddr, SocketAddr},
        sync::Arc,
    },
    tokio::{net::UdpSocket, sync::mpsc},
};

const RECV_BUFFER_SIZE: usize = 64;

/// A token heard from a peer, with its source address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundToken {
    pub packet: TokenPacket,
    pub from: SocketAddr,
}

/// Handle to the running control-plane socket.
pub struct ControlPlane {
    /// Tokens heard from peers.
    pub inbound_rx: crossbeam_channel::Receiver<InboundToken>,
    /// Address the socket actually bound.
    pub local_addr: SocketAddr,
    outbound_tx: mpsc::Sender<TokenPacket>,
    outbound_capacity: usize,
}

impl ControlPlane {
    /// Binds the control socket, joins the configured group, and spawns
    /// the receive and transmit tasks.
    pub async fn start(config: &NetConfig) -> Result<Self> {
        let target = SocketAddr::new(IpAddr::V6(config.control_group), config.control_port);
        Self::start_inner(config, target).await
    }

    /// Starts a control plane whose broadcasts go to an explicit
    /// address instead of the group. Test harnesses point this at a
    /// peer's bound socket.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub async fn start_with_target(config: &NetConfig, target: SocketAddr) -> Result<Self> {
        Self::start_inner(config, target).await
    }

    async fn start_inner(config: &NetConfig, target: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind((config.bind_addr, config.control_port)).await?;
        let local_addr = socket.local_addr()?;
        if config.join_multicast {
            socket.join_multicast_v6(&config.control_group, 0)?;
            // A node must never hear its own broadcasts: the redundancy
            // counter only counts peers.
            socket.set_multicast_loop_v6(false)?;
        }
        let socket = Arc::new(socket);
        info!("control plane bound on {local_addr}, broadcasting to {target}");

        let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded();
        let recv_socket = socket.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; RECV_BUFFER_SIZE];
            loop {
                let (len, from) = match recv_socket.recv_from(&mut buf).await {
                    Ok(received) => received,
                    Err(err) => {
                        warn!("control socket receive failed: {err}");
                        continue;
                    }
                };
                let packet = match codec::decode_token_packet(&buf[..len]) {
                    Ok(packet) => packet,
                    Err(err) => {
                        debug!("dropping malformed control datagram from {from}: {err}");
                        continue;
                    }
                };
                if inbound_tx.send(InboundToken { packet, from }).is_err() {
                    debug!("control inbound channel closed, stopping receiver");
                    break;
                }
            }
        });

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<TokenPacket>(config.outbound_buffer);
        tokio::spawn(async move {
            while let Some(packet) = outbound_rx.recv().await {
                let bytes = match codec::encode_token_packet(&packet) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        error!("failed to encode token packet: {err}");
                        continue;
                    }
                };
                if let Err(err) = socket.send_to(&bytes, target).await {
                    warn!("control broadcast to {target} failed: {err}");
                }
            }
        });

        Ok(Self {
            inbound_rx,
            local_addr,
            outbound_tx,
            outbound_capacity: config.outbound_buffer,
        })
    }

    /// Queues a token packet for broadcast.
    pub fn broadcast(&self, packet: TokenPacket) -> Result<()> {
        self.outbound_tx.try_send(packet).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => NetError::QueueFull {
                capacity: self.outbound_capacity,
            },
            mpsc::error::TrySendError::Closed(_) => NetError::ChannelClosed,
        })
    }
}
