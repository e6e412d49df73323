//! Status-page rendering with a bounded builder.
//!
//! The page is assembled through a small fixed-capacity buffer that is
//! flushed into the response whenever headroom runs low, so rendering
//! never holds more than one buffer's worth of text at a time no matter
//! how large the tables grow. The response is the concatenation of the
//! flushed chunks.

use {
    crate::request::AdminCommand,
    canopy_net::tables::{NeighborTable, RouteTable},
    std::time::Instant,
};

/// Capacity of the render buffer.
pub const PAGE_BUFFER_SIZE: usize = 256;

/// The buffer is flushed once fewer than this many bytes remain free.
pub const FLUSH_HEADROOM: usize = 45;

const PAGE_TOP: &str = "<html><head><title>Canopy</title></head><body>\n";
const PAGE_BOTTOM: &str = "</body></html>\n";

/// Bounded string builder for the status page.
#[derive(Debug, Default)]
pub struct PageBuilder {
    buf: String,
    chunks: Vec<String>,
}

impl PageBuilder {
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(PAGE_BUFFER_SIZE),
            chunks: Vec::new(),
        }
    }

    /// Appends a fragment, flushing the buffer first into a finished
    /// chunk when headroom falls below [`FLUSH_HEADROOM`].
    pub fn add(&mut self, fragment: &str) {
        self.buf.push_str(fragment);
        if PAGE_BUFFER_SIZE.saturating_sub(self.buf.len()) < FLUSH_HEADROOM {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if !self.buf.is_empty() {
            let chunk = std::mem::replace(&mut self.buf, String::with_capacity(PAGE_BUFFER_SIZE));
            self.chunks.push(chunk);
        }
    }

    /// Flushes the remainder and returns the chunks in page order.
    pub fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}

/// Renders the full status page: neighbor table, route table, the
/// acknowledgement line for a just-executed command, and the serve
/// counter footer.
pub fn render_status_page(
    neighbors: &NeighborTable,
    routes: &RouteTable,
    ack: Option<AdminCommand>,
    pages_served: u32,
    now: Instant,
) -> Vec<String> {
    let mut page = PageBuilder::new();
    page.add(PAGE_TOP);

    page.add("Neighbors<pre>\n");
    for neighbor in neighbors.entries() {
        page.add(&format!(
            "{}  packets {}  age {}s\n",
            neighbor.addr,
            neighbor.packets_heard,
            neighbor.silence(now).as_secs()
        ));
    }

    page.add("</pre>Routes<pre>\n");
    for route in routes.entries() {
        page.add(&format!(
            "node {} via {}  seq {}  hops {}  age {}s\n",
            route.originator,
            route.via,
            route.last_seqno,
            route.hops,
            now.saturating_duration_since(route.last_updated).as_secs()
        ));
    }
    page.add("</pre>\n");

    if let Some(command) = ack {
        page.add(&format!(
            "<h5>Change Node [{}] to Interval => {}</h5>\n",
            command.node, command.interval
        ));
    }

    page.add(&format!(
        "<br><i>This page sent {pages_served} times</i>\n"
    ));
    page.add(PAGE_BOTTOM);
    page.finish()
}
