//! Report path: unicast delivery of full sample batches to the sink.
//!
//! Sensors resolve the sink through the service directory and fire a
//! single datagram per flush; there is no acknowledgement or retry. The
//! border router binds the well-known report port and decodes each
//! datagram as exactly one batch.

use {
    crate::{
        codec,
        config::NetConfig,
        error::{NetError, Result},
    },
    canopy_collector::ring::SampleBatch,
    log::*,
    std::net::SocketAddr,
    tokio::{net::UdpSocket, sync::mpsc},
};

const RECV_BUFFER_SIZE: usize = 128;

/// A decoded batch received by the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundReport {
    pub batch: SampleBatch,
    pub from: SocketAddr,
}

/// Receiving end of the report path.
pub struct ReportSink {
    /// Batches decoded off the wire.
    pub inbound_rx: crossbeam_channel::Receiver<InboundReport>,
    /// Address the sink actually bound.
    pub local_addr: SocketAddr,
}

impl ReportSink {
    /// Binds the report port and spawns the receive task.
    pub async fn bind(config: &NetConfig) -> Result<Self> {
        let socket = UdpSocket::bind((config.bind_addr, config.report_port)).await?;
        let local_addr = socket.local_addr()?;
        info!("report sink bound on {local_addr}");

        let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded();
        tokio::spawn(async move {
            let mut buf = vec![0u8; RECV_BUFFER_SIZE];
            loop {
                let (len, from) = match socket.recv_from(&mut buf).await {
                    Ok(received) => received,
                    Err(err) => {
                        warn!("report socket receive failed: {err}");
                        continue;
                    }
                };
                let batch = match codec::decode_sample_batch(&buf[..len]) {
                    Ok(batch) => batch,
                    Err(err) => {
                        warn!("dropping malformed report from {from}: {err}");
                        continue;
                    }
                };
                if inbound_tx.send(InboundReport { batch, from }).is_err() {
                    debug!("report inbound channel closed, stopping receiver");
                    break;
                }
            }
        });

        Ok(Self {
            inbound_rx,
            local_addr,
        })
    }
}

/// Sending end of the report path. Owns an ephemeral socket on a
/// background task; sends are queued and fire-and-forget.
pub struct ReportSender {
    outbound_tx: mpsc::Sender<(SocketAddr, SampleBatch)>,
    outbound_capacity: usize,
    /// Address the sending socket actually bound.
    pub local_addr: SocketAddr,
}

impl ReportSender {
    /// Binds an ephemeral socket and spawns the transmit task.
    pub async fn start(config: &NetConfig) -> Result<Self> {
        let socket = UdpSocket::bind((config.bind_addr, 0)).await?;
        let local_addr = socket.local_addr()?;

        let (outbound_tx, mut outbound_rx) =
            mpsc::channel::<(SocketAddr, SampleBatch)>(config.outbound_buffer);
        tokio::spawn(async move {
            while let Some((sink, batch)) = outbound_rx.recv().await {
                let bytes = match codec::encode_sample_batch(&batch) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        error!("failed to encode sample batch: {err}");
                        continue;
                    }
                };
                if let Err(err) = socket.send_to(&bytes, sink).await {
                    warn!("report to {sink} failed: {err}");
                }
            }
        });

        Ok(Self {
            outbound_tx,
            outbound_capacity: config.outbound_buffer,
            local_addr,
        })
    }

    /// Queues a batch for delivery to `sink`.
    pub fn send(&self, sink: SocketAddr, batch: SampleBatch) -> Result<()> {
        self.outbound_tx
            .try_send((sink, batch))
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => NetError::QueueFull {
                    capacity: self.outbound_capacity,
                },
                mpsc::error::TrySendError::Closed(_) => NetError::ChannelClosed,
            })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, canopy_collector::ring::Sample, std::time::Duration};

    const RECV_TIMEOUT: Duration = Duration::from_secs(5);

    fn make_batch() -> SampleBatch {
        [
            Sample {
                value: 8,
                index: 4,
                interval_used: 2,
            },
            Sample {
                value: 21,
                index: 5,
                interval_used: 2,
            },
            Sample {
                value: 0,
                index: 6,
                interval_used: 2,
            },
        ]
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sink_binds_ephemeral_port() {
        let sink = ReportSink::bind(&NetConfig::dev_default()).await.unwrap();
        assert_ne!(sink.local_addr.port(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_batch_delivered_to_sink() {
        let config = NetConfig::dev_default();
        let sink = ReportSink::bind(&config).await.unwrap();
        let sender = ReportSender::start(&config).await.unwrap();

        let batch = make_batch();
        sender.send(sink.local_addr, batch).unwrap();

        let inbound = sink.inbound_rx.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(inbound.batch, batch);
        assert_eq!(inbound.from, sender.local_addr);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_wrong_length_report_dropped() {
        let config = NetConfig::dev_default();
        let sink = ReportSink::bind(&config).await.unwrap();

        let raw = UdpSocket::bind("[::1]:0").await.unwrap();
        let bytes = codec::encode_sample_batch(&make_batch()).unwrap();
        // One byte short: the sink must not deliver a partial batch.
        raw.send_to(&bytes[..bytes.len() - 1], sink.local_addr)
            .await
            .unwrap();
        raw.send_to(&bytes, sink.local_addr).await.unwrap();

        let inbound = sink.inbound_rx.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(inbound.batch, make_batch());
    }
}
