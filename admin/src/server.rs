//! Minimal HTTP listener for the status page.
//!
//! The listener only parses the request line and renders nothing
//! itself: every request is forwarded to the node's dispatcher, which
//! executes any command, renders the page under the protocol handlers'
//! run-to-completion rules, and sends the chunks back through a oneshot
//! channel. The connection task then writes them out and closes.

use {
    crate::{
        config::AdminConfig,
        error::{AdminError, Result},
        request::{self, AdminCommand},
    },
    log::*,
    std::net::SocketAddr,
    tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        sync::oneshot,
    },
};

const REQUEST_BUFFER_SIZE: usize = 512;

const RESPONSE_HEAD: &str = "HTTP/1.0 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n";
const BAD_REQUEST: &str = "HTTP/1.0 400 Bad Request\r\nConnection: close\r\n\r\n";

/// A parsed request waiting on the dispatcher for its page.
#[derive(Debug)]
pub struct AdminRequest {
    /// Command decoded from the path, when the path had the command
    /// shape. `None` means plain page fetch.
    pub command: Option<AdminCommand>,
    /// Where the dispatcher delivers the rendered page chunks.
    pub reply: oneshot::Sender<Vec<String>>,
}

/// Handle to the running admin listener.
pub struct AdminServer {
    /// Requests parsed off accepted connections.
    pub requests_rx: crossbeam_channel::Receiver<AdminRequest>,
    /// Address the listener actually bound.
    pub local_addr: SocketAddr,
}

impl AdminServer {
    /// Binds the listener and spawns the accept loop.
    pub async fn start(config: &AdminConfig) -> Result<Self> {
        let listener = TcpListener::bind((config.bind_addr, config.port)).await?;
        let local_addr = listener.local_addr()?;
        info!("admin server listening on {local_addr}");

        let (requests_tx, requests_rx) = crossbeam_channel::unbounded();
        tokio::spawn(async move {
            loop {
                let (stream, peer) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(err) => {
                        warn!("admin accept failed: {err}");
                        continue;
                    }
                };
                let requests_tx = requests_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = serve_connection(stream, requests_tx).await {
                        debug!("admin connection from {peer} ended: {err}");
                    }
                });
            }
        });

        Ok(Self {
            requests_rx,
            local_addr,
        })
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    requests_tx: crossbeam_channel::Sender<AdminRequest>,
) -> Result<()> {
    let mut buf = vec![0u8; REQUEST_BUFFER_SIZE];
    let len = stream.read(&mut buf).await?;
    let head = String::from_utf8_lossy(&buf[..len]);

    let Some(path) = parse_request_line(&head) else {
        stream.write_all(BAD_REQUEST.as_bytes()).await?;
        return Ok(());
    };
    let command = request::parse_path(path);

    let (reply_tx, reply_rx) = oneshot::channel();
    requests_tx
        .send(AdminRequest {
            command,
            reply: reply_tx,
        })
        .map_err(|_| AdminError::ChannelClosed)?;
    let chunks = reply_rx.await.map_err(|_| AdminError::ChannelClosed)?;

    stream.write_all(RESPONSE_HEAD.as_bytes()).await?;
    for chunk in &chunks {
        stream.write_all(chunk.as_bytes()).await?;
    }
    stream.shutdown().await?;
    Ok(())
}

/// Extracts the path from a `GET <path> HTTP/1.x` request line.
fn parse_request_line(head: &str) -> Option<&str> {
    let line = head.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;
    (method == "GET").then_some(path)
}
