//! # replwire
//!
//! Decoders for the two binary formats a replica sees on the wire:
//! - The request/reply protocol (RESP), materialized or streamed
//! - The point-in-time snapshot (RDB) sent during full synchronization
//!
//! ## Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────┐
//!                 │  byte source (Read)  │
//!                 └──────────┬───────────┘
//!                            │
//!          ┌─────────────────┴─────────────────┐
//!          │                                   │
//!          ▼                                   ▼
//!   ┌──────────────┐                  ┌─────────────────┐
//!   │ ReplyDecoder │                  │ SnapshotDecoder │
//!   │ value/frame  │                  │  state machine  │
//!   └──────────────┘                  └────────┬────────┘
//!                                              │
//!                               ┌──────────────┼──────────────┐
//!                               ▼              ▼              ▼
//!                        ┌────────────┐ ┌────────────┐ ┌─────────────┐
//!                        │ length     │ │ CRC64      │ │ value       │
//!                        │ encoding   │ │ checksum   │ │ registry    │
//!                        └────────────┘ └────────────┘ └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod observer;

pub mod resp;
pub mod snapshot;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ErrorKind, Result, WireError};
pub use config::Config;
pub use observer::{
    DecodeEvent, DecodeObserver, DecodeStats, NoopObserver, StatsObserver, TracingObserver,
};
pub use resp::{BulkPayload, Frame, ReplyDecoder, Value};
pub use snapshot::{SnapshotDecoder, SnapshotRecord};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of replwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
