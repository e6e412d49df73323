//! Collection-tree channel carrying sample batches toward the sink.
//!
//! The tree is a single level deep: every sensor's parent is the sink
//! itself, seeded at startup rather than discovered. Frames carry the
//! provenance header from [`crate::codec`] so the sink still learns
//! originator, sequence number, and hop count the way a routed tree
//! would report them. A send from the sink delivers locally without
//! touching the wire.

use {
    crate::{
        codec::{self, CollectHeader},
        config::NetConfig,
        error::{NetError, Result},
    },
    canopy_dissemination::token::NodeId,
    log::*,
    std::net::SocketAddr,
    tokio::{net::UdpSocket, sync::mpsc},
};

const RECV_BUFFER_SIZE: usize = 256;

/// A payload accepted by the sink, with its tree provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectDelivery {
    pub originator: NodeId,
    pub seqno: u8,
    pub hops: u8,
    pub payload: Vec<u8>,
    pub from: SocketAddr,
}

/// One endpoint of the collection tree.
pub struct CollectChannel {
    /// Deliveries accepted from the tree. Only the sink's channel ever
    /// yields anything.
    pub inbound_rx: crossbeam_channel::Receiver<CollectDelivery>,
    /// Address the socket actually bound.
    pub local_addr: SocketAddr,
    inbound_tx: crossbeam_channel::Sender<CollectDelivery>,
    outbound_tx: mpsc::Sender<(SocketAddr, Vec<u8>)>,
    outbound_capacity: usize,
    originator: NodeId,
    channel: u16,
    seqno: u8,
    parent: Option<SocketAddr>,
    is_sink: bool,
}

impl CollectChannel {
    /// Binds the collect socket and spawns the receive and transmit
    /// tasks. The channel starts with no parent and must be seeded with
    /// [`set_parent`](Self::set_parent) or promoted with
    /// [`designate_sink`](Self::designate_sink).
    pub async fn open(config: &NetConfig, originator: NodeId) -> Result<Self> {
        let socket = UdpSocket::bind((config.bind_addr, config.collect_port)).await?;
        let local_addr = socket.local_addr()?;
        info!("collect channel {} bound on {local_addr}", config.collect_channel);

        let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded();
        let (outbound_tx, mut outbound_rx) =
            mpsc::channel::<(SocketAddr, Vec<u8>)>(config.outbound_buffer);

        let send_socket = UdpSocket::bind((config.bind_addr, 0)).await?;
        tokio::spawn(async move {
            while let Some((parent, frame)) = outbound_rx.recv().await {
                if let Err(err) = send_socket.send_to(&frame, parent).await {
                    warn!("collect send to {parent} failed: {err}");
                }
            }
        });

        let channel = config.collect_channel;
        let recv_tx = inbound_tx.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; RECV_BUFFER_SIZE];
            loop {
                let (len, from) = match socket.recv_from(&mut buf).await {
                    Ok(received) => received,
                    Err(err) => {
                        warn!("collect socket receive failed: {err}");
                        continue;
                    }
                };
                let (header, payload) = match codec::decode_collect_frame(&buf[..len]) {
                    Ok(frame) => frame,
                    Err(err) => {
                        debug!("dropping malformed collect frame from {from}: {err}");
                        continue;
                    }
                };
                if header.channel != channel {
                    debug!(
                        "dropping collect frame on channel {} (listening on {channel})",
                        header.channel
                    );
                    continue;
                }
                let delivery = CollectDelivery {
                    originator: header.originator,
                    seqno: header.seqno,
                    hops: header.hops,
                    payload,
                    from,
                };
                if recv_tx.send(delivery).is_err() {
                    debug!("collect inbound channel closed, stopping receiver");
                    break;
                }
            }
        });

        Ok(Self {
            inbound_rx,
            local_addr,
            inbound_tx,
            outbound_tx,
            outbound_capacity: config.outbound_buffer,
            originator,
            channel,
            seqno: 0,
            parent: None,
            is_sink: false,
        })
    }

    /// Promotes or demotes this endpoint as the tree's sink. The sink
    /// has no parent.
    pub fn designate_sink(&mut self, is_sink: bool) {
        self.is_sink = is_sink;
        if is_sink {
            self.parent = None;
        }
    }

    pub fn is_sink(&self) -> bool {
        self.is_sink
    }

    /// Seeds or clears the parent all sends are forwarded to.
    pub fn set_parent(&mut self, parent: Option<SocketAddr>) {
        self.parent = parent;
    }

    /// The node currently serving as this endpoint's parent. The sink
    /// reports `None`.
    pub fn current_parent(&self) -> Option<SocketAddr> {
        self.parent
    }

    /// Sends a payload toward the sink with the given hop budget. The
    /// frame is stamped with this endpoint's originator id and next
    /// sequence number. A send from the sink delivers locally with a
    /// hop count of zero.
    pub fn send(&mut self, payload: &[u8], max_hops: u8) -> Result<()> {
        let seqno = self.seqno;
        self.seqno = self.seqno.wrapping_add(1);

        if self.is_sink {
            let delivery = CollectDelivery {
                originator: self.originator,
                seqno,
                hops: 0,
                payload: payload.to_vec(),
                from: self.local_addr,
            };
            return self
                .inbound_tx
                .send(delivery)
                .map_err(|_| NetError::ChannelClosed);
        }

        let parent = self.parent.ok_or(NetError::NoParent)?;
        let hops = 1u8;
        if hops > max_hops {
            warn!("hop budget {max_hops} cannot reach the sink, dropping frame");
            return Ok(());
        }
        let header = CollectHeader {
            channel: self.channel,
            originator: self.originator,
            seqno,
            hops,
        };
        let frame = codec::encode_collect_frame(&header, payload)?;
        self.outbound_tx
            .try_send((parent, frame))
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => NetError::QueueFull {
                    capacity: self.outbound_capacity,
                },
                mpsc::error::TrySendError::Closed(_) => NetError::ChannelClosed,
            })
    }

    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn set_seqno(&mut self, seqno: u8) {
        self.seqno = seqno;
    }
}
