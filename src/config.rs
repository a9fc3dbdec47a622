//! Configuration for replwire
//!
//! Decoder limits and format switches with sensible defaults.

use serde::{Deserialize, Serialize};

/// Decoder configuration shared by the reply and snapshot decoders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // -------------------------------------------------------------------------
    // I/O Configuration
    // -------------------------------------------------------------------------
    /// Capacity of the internal read buffer (in bytes)
    pub read_buffer_size: usize,

    // -------------------------------------------------------------------------
    // Reply Protocol Limits
    // -------------------------------------------------------------------------
    /// Longest accepted protocol line, excluding CRLF (in bytes)
    pub max_line_len: usize,

    /// Largest accepted bulk string, also bounds snapshot strings (in bytes)
    pub max_bulk_len: u64,

    /// Largest accepted array element count
    pub max_array_len: u64,

    /// Deepest accepted array nesting
    pub max_depth: usize,

    /// Accept inline commands (lines without a type byte)
    pub inline_commands: bool,

    // -------------------------------------------------------------------------
    // Snapshot Configuration
    // -------------------------------------------------------------------------
    /// First snapshot version that ends with an 8-byte checksum
    pub checksum_min_version: u32,

    /// Compare the trailing checksum against the running CRC64
    pub verify_checksum: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_buffer_size: 8 * 1024,
            max_line_len: 64 * 1024,
            max_bulk_len: 512 * 1024 * 1024, // 512 MB
            max_array_len: 1024 * 1024,
            max_depth: 32,
            inline_commands: true,
            checksum_min_version: 5,
            verify_checksum: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the read buffer capacity (in bytes)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Set the maximum line length (in bytes)
    pub fn max_line_len(mut self, len: usize) -> Self {
        self.config.max_line_len = len;
        self
    }

    /// Set the maximum bulk string length (in bytes)
    pub fn max_bulk_len(mut self, len: u64) -> Self {
        self.config.max_bulk_len = len;
        self
    }

    /// Set the maximum array element count
    pub fn max_array_len(mut self, len: u64) -> Self {
        self.config.max_array_len = len;
        self
    }

    /// Set the maximum array nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Enable or disable inline command framing
    pub fn inline_commands(mut self, enabled: bool) -> Self {
        self.config.inline_commands = enabled;
        self
    }

    /// Set the first snapshot version that carries a checksum
    pub fn checksum_min_version(mut self, version: u32) -> Self {
        self.config.checksum_min_version = version;
        self
    }

    /// Enable or disable trailing checksum verification
    pub fn verify_checksum(mut self, enabled: bool) -> Self {
        self.config.verify_checksum = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
