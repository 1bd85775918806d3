// SPDX-License-Identifier: MPL-2.0

//! Aligned shard buffers

use crate::constants::fec::SHARD_ALIGNMENT;
use bytemuck::{Pod, Zeroable};
use std::collections::TryReserveError;

/// One alignment unit of shard storage
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C, align(16))]
struct Block([u8; SHARD_ALIGNMENT]);

/// Fixed-size, 16-byte aligned byte buffer holding one shard
#[derive(Clone)]
pub struct Shard {
    blocks: Vec<Block>,
}

impl Shard {
    /// Zero-filled shard of `size` bytes; `size` must be a multiple of 16
    pub(crate) fn try_zeroed(size: usize) -> Result<Self, TryReserveError> {
        debug_assert_eq!(size % SHARD_ALIGNMENT, 0);
        let count = size / SHARD_ALIGNMENT;
        let mut blocks = Vec::new();
        blocks.try_reserve_exact(count)?;
        blocks.resize(count, Block::zeroed());
        Ok(Self { blocks })
    }

    pub fn len(&self) -> usize {
        self.blocks.len() * SHARD_ALIGNMENT
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.blocks)
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.blocks)
    }

    /// Copy out into an owned vector (e.g. for a transport that frames it)
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl AsRef<[u8]> for Shard {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard").field("len", &self.len()).finish()
    }
}

impl PartialEq for Shard {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Shard {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_is_aligned_and_zeroed() {
        let shard = Shard::try_zeroed(144).unwrap();
        assert_eq!(shard.len(), 144);
        assert_eq!(shard.as_bytes().as_ptr() as usize % SHARD_ALIGNMENT, 0);
        assert!(shard.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_shard() {
        let shard = Shard::try_zeroed(0).unwrap();
        assert!(shard.is_empty());
        assert!(shard.as_bytes().is_empty());
    }
}
