// SPDX-License-Identifier: GPL-3.0-only

//! Hand-off of shard sets to the transmission layer
//!
//! Packet framing, sequencing and shard-index headers belong to the
//! transmission layer behind [`ShardSink`]; this crate defines no wire
//! format. [`LoggingShardSink`] stands in when no transport is attached.

use crate::constants::timing;
use crate::errors::AppError;
use crate::fec::ShardSet;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Receiver of completed shard sets, in shard-index order
pub trait ShardSink: Send {
    fn submit(&mut self, set: ShardSet) -> Result<(), AppError>;

    /// Called once after the last set
    fn finish(&mut self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Sink that only records what it would have sent
#[derive(Debug, Default)]
pub struct LoggingShardSink {
    sets: u64,
    wire_bytes: u64,
}

impl LoggingShardSink {
    pub fn sets(&self) -> u64 {
        self.sets
    }

    pub fn wire_bytes(&self) -> u64 {
        self.wire_bytes
    }
}

impl ShardSink for LoggingShardSink {
    fn submit(&mut self, set: ShardSet) -> Result<(), AppError> {
        if self.sets % timing::FRAME_LOG_INTERVAL == 0 {
            debug!(
                set = self.sets,
                k = set.data_shard_count(),
                r = set.parity_shard_count(),
                shard_size = set.shard_size(),
                input_len = set.input_len(),
                "Shard set ready"
            );
        }
        self.sets += 1;
        self.wire_bytes += set.wire_bytes() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), AppError> {
        info!(sets = self.sets, wire_bytes = self.wire_bytes, "Shard sink finished");
        Ok(())
    }
}

/// Totals reported by [`forward_shards`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ForwardSummary {
    pub sets: u64,
    pub failed: u64,
}

/// Drain the shard queue into a sink until every sender is dropped
///
/// A failing submit is logged and counted; the set is discarded.
pub async fn forward_shards<S: ShardSink>(
    mut rx: mpsc::Receiver<ShardSet>,
    mut sink: S,
) -> Result<ForwardSummary, AppError> {
    let mut summary = ForwardSummary::default();

    while let Some(set) = rx.recv().await {
        match sink.submit(set) {
            Ok(()) => summary.sets += 1,
            Err(e) => {
                summary.failed += 1;
                warn!(error = %e, "Shard sink rejected set");
            }
        }
    }

    sink.finish()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fec::{FecConfig, FecEncoder};

    struct FailEverySecond {
        seen: u64,
    }

    impl ShardSink for FailEverySecond {
        fn submit(&mut self, _set: ShardSet) -> Result<(), AppError> {
            self.seen += 1;
            if self.seen % 2 == 0 {
                Err(AppError::Other("link down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_forward_until_closed() {
        let (tx, rx) = mpsc::channel(4);
        let encoder = FecEncoder::new(FecConfig::new(4, 2)).unwrap();
        for unit in [&b"first"[..], b"second", b"third"] {
            tx.send(encoder.encode(unit).unwrap()).await.unwrap();
        }
        drop(tx);

        let summary = forward_shards(rx, FailEverySecond { seen: 0 }).await.unwrap();
        assert_eq!(summary, ForwardSummary { sets: 2, failed: 1 });
    }

    #[test]
    fn test_logging_sink_counts_bytes() {
        let encoder = FecEncoder::new(FecConfig::new(10, 4)).unwrap();
        let mut sink = LoggingShardSink::default();
        sink.submit(encoder.encode(&[7u8; 1286]).unwrap()).unwrap();
        assert_eq!(sink.sets(), 1);
        assert_eq!(sink.wire_bytes(), 14 * 144);
    }
}
