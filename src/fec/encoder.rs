// SPDX-License-Identifier: MPL-2.0

//! Systematic shard encoder

use super::shard::Shard;
use super::tables::{FecConfig, GeneratorTables};
use crate::constants::fec::SHARD_ALIGNMENT;
use crate::errors::FecError;
use reed_solomon_erasure::galois_8;
use std::sync::Arc;
use tracing::trace;

/// Shard size for an input of `input_len` bytes split over `k` data shards
///
/// `ceil(input_len / k)` rounded up to the 16-byte alignment unit.
pub fn shard_size_for(input_len: usize, k: usize) -> usize {
    input_len.div_ceil(k).next_multiple_of(SHARD_ALIGNMENT)
}

/// `count` zeroed shards of `shard_size` bytes, or the first index that failed
pub fn allocate_shards(count: usize, shard_size: usize) -> Result<Vec<Shard>, FecError> {
    let mut shards = Vec::new();
    shards
        .try_reserve_exact(count)
        .map_err(|_| FecError::ShardAllocationFailed {
            index: 0,
            shard_size,
        })?;
    for index in 0..count {
        let shard = Shard::try_zeroed(shard_size)
            .map_err(|_| FecError::ShardAllocationFailed { index, shard_size })?;
        shards.push(shard);
    }
    Ok(shards)
}

/// k data shards followed by r parity shards, all `shard_size` bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSet {
    config: FecConfig,
    shard_size: usize,
    input_len: usize,
    shards: Vec<Shard>,
}

impl ShardSet {
    pub fn config(&self) -> FecConfig {
        self.config
    }

    pub fn data_shard_count(&self) -> usize {
        self.config.data_shards as usize
    }

    pub fn parity_shard_count(&self) -> usize {
        self.config.parity_shards as usize
    }

    pub fn shard_size(&self) -> usize {
        self.shard_size
    }

    /// Length of the access unit these shards carry
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// All shards in index order
    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    pub fn data_shards(&self) -> &[Shard] {
        &self.shards[..self.data_shard_count()]
    }

    pub fn parity_shards(&self) -> &[Shard] {
        &self.shards[self.data_shard_count()..]
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Total bytes across all shards
    pub fn wire_bytes(&self) -> usize {
        self.shards.len() * self.shard_size
    }

    /// Shards with their indices, ready for index tagging by a transport
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &Shard)> {
        self.shards.iter().enumerate()
    }
}

/// Encoder bound to one `(k, r)` layout
///
/// Construction validates the layout and fetches the shared generator
/// tables; `encode` only allocates shards and does field arithmetic.
#[derive(Debug, Clone)]
pub struct FecEncoder {
    tables: Arc<GeneratorTables>,
}

impl FecEncoder {
    pub fn new(config: FecConfig) -> Result<Self, FecError> {
        Ok(Self {
            tables: GeneratorTables::shared(config)?,
        })
    }

    pub fn config(&self) -> FecConfig {
        self.tables.config()
    }

    /// Encode one access unit into k + r shards
    ///
    /// The input is copied; no reference to it is kept after return.
    pub fn encode(&self, input: &[u8]) -> Result<ShardSet, FecError> {
        let k = self.tables.data_shards();
        let total = self.tables.total_shards();
        let shard_size = shard_size_for(input.len(), k);

        let mut shards = allocate_shards(total, shard_size)?;

        // Buffers start zeroed, so short and unused data shards are already padded
        for (shard, chunk) in shards[..k].iter_mut().zip(input.chunks(shard_size.max(1))) {
            shard.as_bytes_mut()[..chunk.len()].copy_from_slice(chunk);
        }

        let (data, parity) = shards.split_at_mut(k);
        for (p, out) in parity.iter_mut().enumerate() {
            let out = out.as_bytes_mut();
            for (&coefficient, source) in self.tables.parity_row(p).iter().zip(data.iter()) {
                galois_8::mul_slice_xor(coefficient, source.as_bytes(), out);
            }
        }

        trace!(
            input_len = input.len(),
            shard_size,
            shards = total,
            "Encoded access unit"
        );

        Ok(ShardSet {
            config: self.tables.config(),
            shard_size,
            input_len: input.len(),
            shards,
        })
    }
}

/// One-shot encode for callers that do not keep an encoder around
pub fn encode(input: &[u8], k: u32, r: u32) -> Result<ShardSet, FecError> {
    FecEncoder::new(FecConfig::new(k, r))?.encode(input)
}
