use libgwp::MAX_PACKET_SIZE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Read buffer size. This is always larger than the packet size we expect.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// How long a single read may block. This bounds how quickly a read loop notices it has been closed.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 500;

/// Settings shared by all transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Capacity of the request channel. A full channel blocks the read loop until a consumer catches up.
    pub request_channel_len: usize,
    pub read_timeout_ms: u64,
    pub read_buffer_size: usize,
    /// Packets above this size are logged, but still processed.
    pub max_packet_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_channel_len: 1,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_packet_size: MAX_PACKET_SIZE,
        }
    }
}

impl TransportConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn with_request_channel_len(mut self, len: usize) -> Self {
        self.request_channel_len = len;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    pub fn with_max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = size;
        self
    }
}
