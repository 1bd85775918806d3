// SPDX-License-Identifier: MPL-2.0

//! Forward error correction for encoded access units
//!
//! Each access unit is split into `k` zero-padded data shards and extended
//! with `r` parity shards computed from a systematic Cauchy generator
//! matrix over GF(2^8). Any `k` of the `k + r` shards are enough to rebuild
//! the access unit. Field arithmetic is `reed_solomon_erasure::galois_8`
//! (polynomial 0x11d); the generator matrix is our own Cauchy construction.
//!
//! # Modules
//!
//! - [`matrix`]: generator construction and inversion
//! - [`tables`]: per-layout generator tables, cached process-wide
//! - [`encoder`]: shard production
//! - [`decoder`]: reconstruction from surviving shards

pub mod decoder;
pub mod encoder;
pub mod matrix;
pub mod shard;
pub mod tables;

pub use decoder::FecDecoder;
pub use encoder::{FecEncoder, ShardSet, allocate_shards, encode, shard_size_for};
pub use shard::Shard;
pub use tables::{FecConfig, GeneratorTables};
