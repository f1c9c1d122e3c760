//! Peer identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a peer connection.
///
/// Assigned by the transport from a counter, so two successive connections
/// from the same address get different IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub u64);

impl PeerId {
    /// Create a new peer ID from a counter value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Direction of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionDirection {
    /// We initiated the connection.
    Outbound,
    /// Peer connected to us.
    Inbound,
}

impl ConnectionDirection {
    /// Whether we dialed this connection.
    pub fn is_outbound(&self) -> bool {
        matches!(self, ConnectionDirection::Outbound)
    }
}

impl fmt::Display for ConnectionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionDirection::Outbound => write!(f, "outbound"),
            ConnectionDirection::Inbound => write!(f, "inbound"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_id_display() {
        let id = PeerId::new(42);
        assert_eq!(format!("{}", id), "peer-42");
    }

    #[test]
    fn test_direction() {
        assert!(ConnectionDirection::Outbound.is_outbound());
        assert!(!ConnectionDirection::Inbound.is_outbound());
        assert_eq!(ConnectionDirection::Inbound.to_string(), "inbound");
    }
}
