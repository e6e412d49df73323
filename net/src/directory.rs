//! Service directory mapping well-known service ids to socket addresses.
//!
//! Sensors resolve the report sink through the directory at every flush.
//! A miss is an expected outcome while the border router has not yet
//! registered, so lookups return `Option` rather than an error.

use std::{collections::HashMap, net::SocketAddr};

/// Well-known service identifier.
pub type ServiceId = u16;

/// Resolution seam between the collector flush path and the mesh.
pub trait ServiceDirectory {
    /// Registers or replaces the address serving `service_id`.
    fn register(&mut self, service_id: ServiceId, addr: SocketAddr);

    /// Resolves `service_id`, or `None` when nothing is registered.
    fn lookup(&self, service_id: ServiceId) -> Option<SocketAddr>;
}

/// In-memory directory. The border router seeds its own entry at
/// startup; sensors seed theirs from configuration.
#[derive(Debug, Default)]
pub struct LocalDirectory {
    services: HashMap<ServiceId, SocketAddr>,
}

impl LocalDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory pre-seeded with the given entries.
    pub fn with_entries(entries: impl IntoIterator<Item = (ServiceId, SocketAddr)>) -> Self {
        Self {
            services: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceDirectory for LocalDirectory {
    fn register(&mut self, service_id: ServiceId, addr: SocketAddr) {
        self.services.insert(service_id, addr);
    }

    fn lookup(&self, service_id: ServiceId) -> Option<SocketAddr> {
        self.services.get(&service_id).copied()
    }
}
