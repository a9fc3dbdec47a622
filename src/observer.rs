//! Decode observers
//!
//! Decoders never log on their own. Callers that want diagnostics attach a
//! [`DecodeObserver`]; without one every call site is a single `None` check.

use parking_lot::Mutex;

use crate::error::WireError;
use crate::resp::FrameKind;
use crate::snapshot::{ChecksumStatus, ValueType};

/// Something a decoder did that an observer may care about
#[derive(Debug)]
pub enum DecodeEvent<'a> {
    /// A reply unit was framed (arrays report once, for the header)
    ReplyFrame { kind: FrameKind },

    /// Unread bulk bytes were skipped before the next decode step
    BulkDrained { bytes: u64 },

    /// Snapshot header passed validation
    SnapshotHeader { version: u32 },

    /// Snapshot switched the active database
    SelectDb { index: u64 },

    /// Snapshot key/value record decoded
    Entry {
        key: &'a [u8],
        value_type: ValueType,
        expiring: bool,
    },

    /// Snapshot reached its end marker
    Checksum { status: ChecksumStatus },

    /// Decoding failed; the decoder is now unusable
    Failed { error: &'a WireError },
}

/// Hook invoked by decoders on every [`DecodeEvent`]
pub trait DecodeObserver: Send + Sync {
    fn on_event(&self, _event: &DecodeEvent<'_>) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DecodeObserver for NoopObserver {}

/// Observer that forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DecodeObserver for TracingObserver {
    fn on_event(&self, event: &DecodeEvent<'_>) {
        match event {
            DecodeEvent::ReplyFrame { kind } => tracing::trace!(?kind, "reply frame"),
            DecodeEvent::BulkDrained { bytes } => {
                tracing::trace!(bytes, "drained unread bulk payload")
            }
            DecodeEvent::SnapshotHeader { version } => {
                tracing::debug!(version, "snapshot header")
            }
            DecodeEvent::SelectDb { index } => tracing::debug!(index, "select db"),
            DecodeEvent::Entry {
                key,
                value_type,
                expiring,
            } => tracing::trace!(
                key = %String::from_utf8_lossy(key),
                ?value_type,
                expiring,
                "snapshot entry"
            ),
            DecodeEvent::Checksum { status } => tracing::debug!(?status, "snapshot end"),
            DecodeEvent::Failed { error } => tracing::warn!(%error, "decode failed"),
        }
    }
}

/// Counters collected by [`StatsObserver`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecodeStats {
    pub reply_frames: u64,
    pub bulk_bytes_drained: u64,
    pub databases_selected: u64,
    pub entries: u64,
    pub expiring_entries: u64,
    pub failures: u64,
    pub checksum: Option<ChecksumStatus>,
}

/// Observer that tallies events; share it through an `Arc`
#[derive(Debug, Default)]
pub struct StatsObserver {
    stats: Mutex<DecodeStats>,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the counters collected so far
    pub fn snapshot(&self) -> DecodeStats {
        self.stats.lock().clone()
    }
}

impl DecodeObserver for StatsObserver {
    fn on_event(&self, event: &DecodeEvent<'_>) {
        let mut stats = self.stats.lock();
        match event {
            DecodeEvent::ReplyFrame { .. } => stats.reply_frames += 1,
            DecodeEvent::BulkDrained { bytes } => stats.bulk_bytes_drained += bytes,
            DecodeEvent::SnapshotHeader { .. } => {}
            DecodeEvent::SelectDb { .. } => stats.databases_selected += 1,
            DecodeEvent::Entry { expiring, .. } => {
                stats.entries += 1;
                if *expiring {
                    stats.expiring_entries += 1;
                }
            }
            DecodeEvent::Checksum { status } => stats.checksum = Some(*status),
            DecodeEvent::Failed { .. } => stats.failures += 1,
        }
    }
}
