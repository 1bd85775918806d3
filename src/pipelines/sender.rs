// SPDX-License-Identifier: GPL-3.0-only

//! Streaming variant: access units from the encode leg become shard sets
//!
//! The hand-off appsink calls back on GStreamer's streaming thread. Each
//! access unit is encoded synchronously while the buffer is mapped, then the
//! resulting [`ShardSet`] is offered to a bounded queue without blocking.

use super::runtime::PipelineRuntime;
use super::topology::{StageGraph, Variant};
use crate::constants::{pipeline, timing};
use crate::errors::{FecError, PipelineError};
use crate::fec::{FecEncoder, ShardSet};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Counters updated from the streaming thread
#[derive(Debug, Default)]
pub struct SenderStats {
    access_units: AtomicU64,
    input_bytes: AtomicU64,
    shard_sets: AtomicU64,
    dropped: AtomicU64,
    encode_failures: AtomicU64,
}

/// Point-in-time copy of [`SenderStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub access_units: u64,
    pub input_bytes: u64,
    pub shard_sets: u64,
    pub dropped: u64,
    pub encode_failures: u64,
}

impl SenderStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            access_units: self.access_units.load(Ordering::Relaxed),
            input_bytes: self.input_bytes.load(Ordering::Relaxed),
            shard_sets: self.shard_sets.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
        }
    }
}

/// What happened to one access unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Shard set queued for transmission
    Queued,
    /// Queue full; the shard set was discarded
    DroppedQueueFull,
    /// Transmission side has gone away
    ReceiverClosed,
}

/// Turns one access unit into a shard set
pub trait UnitEncoder: Send + Sync {
    fn encode_unit(&self, unit: &[u8]) -> Result<ShardSet, FecError>;
}

impl UnitEncoder for FecEncoder {
    fn encode_unit(&self, unit: &[u8]) -> Result<ShardSet, FecError> {
        self.encode(unit)
    }
}

/// Encodes access units and queues the shard sets
pub struct AccessUnitHandler<E = FecEncoder> {
    encoder: E,
    tx: mpsc::Sender<ShardSet>,
    stats: Arc<SenderStats>,
    halt_on_failure: bool,
}

impl<E: UnitEncoder> AccessUnitHandler<E> {
    pub fn new(encoder: E, tx: mpsc::Sender<ShardSet>, halt_on_failure: bool) -> Self {
        Self {
            encoder,
            tx,
            stats: Arc::new(SenderStats::default()),
            halt_on_failure,
        }
    }

    pub fn stats(&self) -> Arc<SenderStats> {
        self.stats.clone()
    }

    /// Encode one access unit and offer it to the queue
    ///
    /// The input is not retained past return.
    pub fn handle(&self, unit: &[u8]) -> Result<UnitOutcome, FecError> {
        let seq = self.stats.access_units.fetch_add(1, Ordering::Relaxed);
        self.stats
            .input_bytes
            .fetch_add(unit.len() as u64, Ordering::Relaxed);

        let started = Instant::now();
        let set = match self.encoder.encode_unit(unit) {
            Ok(set) => set,
            Err(e) => {
                self.stats.encode_failures.fetch_add(1, Ordering::Relaxed);
                error!(unit = seq, len = unit.len(), error = %e, "Shard encoding failed");
                return Err(e);
            }
        };
        let encode_time = started.elapsed();
        let shard_size = set.shard_size();

        match self.tx.try_send(set) {
            Ok(()) => {
                self.stats.shard_sets.fetch_add(1, Ordering::Relaxed);
                if seq % timing::FRAME_LOG_INTERVAL == 0 {
                    debug!(
                        unit = seq,
                        len = unit.len(),
                        shard_size,
                        encode_us = encode_time.as_micros(),
                        "Access unit encoded"
                    );
                }
                Ok(UnitOutcome::Queued)
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.stats.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped % timing::FRAME_LOG_INTERVAL == 1 {
                    warn!(unit = seq, dropped, "Shard queue full, dropping access unit");
                }
                Ok(UnitOutcome::DroppedQueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(unit = seq, "Shard receiver closed");
                Ok(UnitOutcome::ReceiverClosed)
            }
        }
    }

    /// [`handle`](Self::handle) mapped onto GStreamer flow results
    ///
    /// An encode failure drops the unit unless the handler was built to
    /// halt the stream on failure.
    pub fn flow(&self, unit: &[u8]) -> Result<gst::FlowSuccess, gst::FlowError> {
        match self.handle(unit) {
            Ok(UnitOutcome::Queued) | Ok(UnitOutcome::DroppedQueueFull) => Ok(gst::FlowSuccess::Ok),
            Ok(UnitOutcome::ReceiverClosed) => Err(gst::FlowError::Eos),
            Err(_) if self.halt_on_failure => Err(gst::FlowError::Error),
            Err(_) => Ok(gst::FlowSuccess::Ok),
        }
    }
}

/// Streaming pipeline with the shard encoder attached to its hand-off stage
pub struct SenderEngine {
    runtime: PipelineRuntime,
    stats: Arc<SenderStats>,
}

impl SenderEngine {
    pub fn new<E: UnitEncoder + 'static>(
        graph: &StageGraph,
        handler: AccessUnitHandler<E>,
    ) -> Result<Self, PipelineError> {
        if graph.variant != Variant::Streaming {
            return Err(PipelineError::InitializationFailed(
                "sender requires a streaming stage graph".to_string(),
            ));
        }

        let runtime = PipelineRuntime::instantiate(graph, pipeline::SENDER_PIPELINE_NAME)?;
        let appsink = runtime
            .element(pipeline::HANDOFF_STAGE)
            .ok_or_else(|| {
                PipelineError::InitializationFailed("Failed to get hand-off appsink".to_string())
            })?
            .dynamic_cast::<AppSink>()
            .map_err(|_| {
                PipelineError::InitializationFailed("Failed to cast hand-off appsink".to_string())
            })?;
        appsink.set_property("enable-last-sample", false);

        let stats = handler.stats();
        let handler = Arc::new(handler);

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink.pull_sample().map_err(|e| {
                        debug!(error = ?e, "Failed to pull sample");
                        gst::FlowError::Eos
                    })?;
                    let buffer = sample.buffer().ok_or_else(|| {
                        error!("No buffer in sample");
                        gst::FlowError::Error
                    })?;
                    let map = buffer.map_readable().map_err(|e| {
                        error!(error = ?e, "Failed to map buffer");
                        gst::FlowError::Error
                    })?;
                    handler.flow(map.as_slice())
                })
                .build(),
        );

        info!("Shard encoder attached to hand-off stage");
        Ok(Self { runtime, stats })
    }

    pub fn start(&self) -> Result<(), PipelineError> {
        self.runtime.start()
    }

    pub fn run_until(&self, stop: &AtomicBool) -> Result<(), PipelineError> {
        let result = self.runtime.run_until(stop);
        let stats = self.stats.snapshot();
        info!(
            access_units = stats.access_units,
            input_bytes = stats.input_bytes,
            shard_sets = stats.shard_sets,
            dropped = stats.dropped,
            encode_failures = stats.encode_failures,
            "Sender stopped"
        );
        result
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fec::{FecConfig, allocate_shards};

    /// Fails the way an exhausted allocator does
    struct OutOfMemory;

    impl UnitEncoder for OutOfMemory {
        fn encode_unit(&self, _unit: &[u8]) -> Result<ShardSet, FecError> {
            allocate_shards(14, usize::MAX & !15)?;
            unreachable!("allocation of an oversized shard succeeded")
        }
    }

    fn handler(depth: usize) -> (AccessUnitHandler, mpsc::Receiver<ShardSet>) {
        let (tx, rx) = mpsc::channel(depth);
        let encoder = FecEncoder::new(FecConfig::new(10, 4)).unwrap();
        (AccessUnitHandler::new(encoder, tx, false), rx)
    }

    #[tokio::test]
    async fn test_access_unit_is_queued() {
        let (handler, mut rx) = handler(2);
        let unit = vec![0x42u8; 1286];

        assert_eq!(handler.handle(&unit).unwrap(), UnitOutcome::Queued);

        let set = rx.recv().await.unwrap();
        assert_eq!(set.shard_size(), 144);
        assert_eq!(set.len(), 14);
        assert_eq!(set.input_len(), 1286);
    }

    #[tokio::test]
    async fn test_full_queue_drops_and_counts() {
        let (handler, _rx) = handler(1);
        let unit = b"access unit";

        assert_eq!(handler.handle(unit).unwrap(), UnitOutcome::Queued);
        assert_eq!(handler.handle(unit).unwrap(), UnitOutcome::DroppedQueueFull);
        assert_eq!(handler.flow(unit), Ok(gst::FlowSuccess::Ok));

        let stats = handler.stats().snapshot();
        assert_eq!(stats.access_units, 3);
        assert_eq!(stats.shard_sets, 1);
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.input_bytes, 3 * unit.len() as u64);
    }

    #[tokio::test]
    async fn test_closed_receiver_ends_stream() {
        let (handler, rx) = handler(1);
        drop(rx);
        assert_eq!(handler.handle(b"x").unwrap(), UnitOutcome::ReceiverClosed);
        assert_eq!(handler.flow(b"x"), Err(gst::FlowError::Eos));
    }

    #[test]
    fn test_encode_failure_drops_unit_and_continues() {
        let (tx, mut rx) = mpsc::channel(2);
        let handler = AccessUnitHandler::new(OutOfMemory, tx, false);

        assert!(matches!(
            handler.handle(b"unit"),
            Err(FecError::ShardAllocationFailed { index: 0, .. })
        ));
        assert_eq!(handler.flow(b"unit"), Ok(gst::FlowSuccess::Ok));

        let stats = handler.stats().snapshot();
        assert_eq!(stats.access_units, 2);
        assert_eq!(stats.encode_failures, 2);
        assert_eq!(stats.shard_sets, 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_encode_failure_halts_when_configured() {
        let (tx, _rx) = mpsc::channel(2);
        let handler = AccessUnitHandler::new(OutOfMemory, tx, true);

        assert_eq!(handler.flow(b"unit"), Err(gst::FlowError::Error));
        assert_eq!(handler.stats().snapshot().encode_failures, 1);
    }
}
