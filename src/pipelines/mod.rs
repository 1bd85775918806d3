// SPDX-License-Identifier: MPL-2.0

//! Capture pipelines
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │ Camera MJPEG │ ──▶ │ decode [+ post]  │ ──▶ │   Display sink   │
//! │  (v4l2src)   │     │ (VAAPI/NV/CPU)   │  │  └──────────────────┘
//! └──────────────┘     └──────────────────┘  │  ┌──────────────────┐     ┌────────────┐
//!                                            └▶ │ H.264 encode     │ ──▶ │ FEC shards │
//!                                               │ + parse + appsink│     │ ─▶ sink    │
//!                                               └──────────────────┘     └────────────┘
//! ```
//!
//! # Modules
//!
//! - [`topology`]: stage graph description built from resolved roles
//! - [`runtime`]: GStreamer instantiation, bus supervision, teardown
//! - [`preview`]: display-only variant
//! - [`sender`]: streaming variant with the shard encoder attached

pub mod preview;
pub mod runtime;
pub mod sender;
pub mod topology;

pub use preview::PreviewEngine;
pub use runtime::{PipelineRuntime, install_stop_handler};
pub use sender::{
    AccessUnitHandler, SenderEngine, SenderStats, StatsSnapshot, UnitEncoder, UnitOutcome,
};
pub use topology::{StageGraph, TopologyBuilder, TopologySettings, Variant};
