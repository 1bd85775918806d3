// SPDX-License-Identifier: MPL-2.0

//! Reconstruction of an access unit from surviving shards

use super::tables::{FecConfig, GeneratorTables};
use crate::errors::FecError;
use reed_solomon_erasure::galois_8;
use std::sync::Arc;
use tracing::debug;

/// Decoder bound to the same `(k, r)` layout as the sending encoder
#[derive(Debug, Clone)]
pub struct FecDecoder {
    tables: Arc<GeneratorTables>,
}

impl FecDecoder {
    pub fn new(config: FecConfig) -> Result<Self, FecError> {
        Ok(Self {
            tables: GeneratorTables::shared(config)?,
        })
    }

    pub fn config(&self) -> FecConfig {
        self.tables.config()
    }

    /// Rebuild the original `input_len` bytes
    ///
    /// `shards` has one slot per shard index (k + r slots), `None` for lost
    /// shards. When more than k survive, the lowest indices are used.
    pub fn reconstruct<S: AsRef<[u8]>>(
        &self,
        shards: &[Option<S>],
        input_len: usize,
    ) -> Result<Vec<u8>, FecError> {
        let k = self.tables.data_shards();
        let total = self.tables.total_shards();

        if shards.len() != total {
            return Err(FecError::ShardCountMismatch {
                expected: total,
                actual: shards.len(),
            });
        }

        let survivors: Vec<(usize, &[u8])> = shards
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s.as_ref())))
            .take(k)
            .collect();

        if survivors.len() < k {
            return Err(FecError::InsufficientShards {
                available: survivors.len(),
                required: k,
            });
        }

        let shard_size = survivors[0].1.len();
        if let Some(&(index, bytes)) = survivors.iter().find(|(_, s)| s.len() != shard_size) {
            return Err(FecError::ShardSizeMismatch {
                index,
                expected: shard_size,
                actual: bytes.len(),
            });
        }

        let capacity = shard_size * k;
        if input_len > capacity {
            return Err(FecError::InputLengthOutOfRange {
                input_len,
                capacity,
            });
        }

        let mut data = vec![0u8; capacity];
        let missing: Vec<usize> = (0..k)
            .filter(|&i| survivors.iter().all(|&(index, _)| index != i))
            .collect();

        // Data shards that survived are copied through unchanged
        for &(index, bytes) in survivors.iter().filter(|(index, _)| *index < k) {
            data[index * shard_size..(index + 1) * shard_size].copy_from_slice(bytes);
        }

        if !missing.is_empty() {
            let rows: Vec<usize> = survivors.iter().map(|&(index, _)| index).collect();
            let decode = self.tables.matrix().select_rows(&rows).invert()?;

            debug!(
                missing = ?missing,
                used = ?rows,
                shard_size,
                "Rebuilding lost data shards"
            );

            for &lost in &missing {
                let out = &mut data[lost * shard_size..(lost + 1) * shard_size];
                for (column, &(_, bytes)) in survivors.iter().enumerate() {
                    galois_8::mul_slice_xor(decode.get(lost, column), bytes, out);
                }
            }
        }

        data.truncate(input_len);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fec::encoder::FecEncoder;

    fn slots(set: &crate::fec::ShardSet) -> Vec<Option<Vec<u8>>> {
        set.shards().iter().map(|s| Some(s.to_vec())).collect()
    }

    #[test]
    fn test_no_loss_is_passthrough() {
        let config = FecConfig::new(4, 2);
        let input: Vec<u8> = (0..=255).collect();
        let set = FecEncoder::new(config).unwrap().encode(&input).unwrap();

        let decoder = FecDecoder::new(config).unwrap();
        let out = decoder.reconstruct(&slots(&set), input.len()).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_loss_of_data_shards() {
        let config = FecConfig::new(10, 4);
        let input: Vec<u8> = (0..1286).map(|i| (i % 251) as u8).collect();
        let set = FecEncoder::new(config).unwrap().encode(&input).unwrap();

        let mut received = slots(&set);
        for lost in [0, 3, 8, 9] {
            received[lost] = None;
        }

        let out = FecDecoder::new(config)
            .unwrap()
            .reconstruct(&received, input.len())
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_too_many_losses() {
        let config = FecConfig::new(3, 1);
        let set = FecEncoder::new(config).unwrap().encode(b"hello").unwrap();
        let mut received = slots(&set);
        received[0] = None;
        received[1] = None;

        let err = FecDecoder::new(config)
            .unwrap()
            .reconstruct(&received, 5)
            .unwrap_err();
        assert_eq!(
            err,
            FecError::InsufficientShards {
                available: 2,
                required: 3
            }
        );
    }

    #[test]
    fn test_slot_count_must_match_layout() {
        let decoder = FecDecoder::new(FecConfig::new(3, 1)).unwrap();
        let received: Vec<Option<Vec<u8>>> = vec![None; 3];
        assert!(matches!(
            decoder.reconstruct(&received, 0),
            Err(FecError::ShardCountMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_mismatched_shard_sizes() {
        let decoder = FecDecoder::new(FecConfig::new(2, 1)).unwrap();
        let received = vec![Some(vec![0u8; 16]), Some(vec![0u8; 32]), None];
        assert!(matches!(
            decoder.reconstruct(&received, 16),
            Err(FecError::ShardSizeMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn test_length_beyond_capacity() {
        let decoder = FecDecoder::new(FecConfig::new(2, 1)).unwrap();
        let received = vec![Some(vec![0u8; 16]), Some(vec![0u8; 16]), None];
        assert!(matches!(
            decoder.reconstruct(&received, 33),
            Err(FecError::InputLengthOutOfRange { capacity: 32, .. })
        ));
    }
}
