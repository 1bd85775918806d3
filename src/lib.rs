// SPDX-License-Identifier: MPL-2.0

//! Camera Sender - hardware-adaptive camera capture with FEC shard output
//!
//! This library captures a V4L2 camera's MJPEG stream, builds a GStreamer
//! pipeline around whatever GPU acceleration the host offers, and turns each
//! encoded H.264 access unit into a set of erasure-coded shards.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`gpu`]: GPU vendor detection and element probing
//! - [`media`]: Per-role implementation resolution and tuning
//! - [`pipelines`]: Stage graph construction and GStreamer runtime
//! - [`fec`]: Cauchy Reed-Solomon shard encoder and decoder
//! - [`transport`]: Hand-off of shard sets to a transmission layer
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```
//! use camera_sender::fec::encode;
//!
//! let set = encode(&[0u8; 1286], 10, 4).unwrap();
//! assert_eq!(set.shard_size(), 144);
//! assert_eq!(set.len(), 14);
//! ```

pub mod config;
pub mod constants;
pub mod errors;
pub mod fec;
pub mod gpu;
pub mod media;
pub mod pipelines;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use constants::BitratePreset;
pub use errors::{AppError, AppResult, FecError, PipelineError};
pub use fec::{FecConfig, FecDecoder, FecEncoder, ShardSet};
pub use gpu::{CapabilityProbe, VendorClass, VendorSelection};
