// SPDX-License-Identifier: MPL-2.0

//! Integration tests for shard encoding and reconstruction

use camera_sender::fec::{FecConfig, FecDecoder, FecEncoder, ShardSet, encode, shard_size_for};
use camera_sender::FecError;
use std::sync::Arc;

/// Deterministic pseudo-random bytes (xorshift)
fn payload(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

fn received(set: &ShardSet, lost: &[usize]) -> Vec<Option<Vec<u8>>> {
    set.indexed()
        .map(|(i, s)| (!lost.contains(&i)).then(|| s.to_vec()))
        .collect()
}

/// All index subsets of size `n` from `0..total`
fn subsets(total: usize, n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    (0..total)
        .flat_map(|first| {
            subsets(total, n - 1)
                .into_iter()
                .filter(move |rest| rest.first().is_none_or(|&r| r > first))
                .map(move |mut rest| {
                    rest.insert(0, first);
                    rest
                })
        })
        .collect()
}

#[test]
fn test_shard_size_invariants() {
    for k in [1usize, 2, 3, 7, 10, 16, 255] {
        for len in [0usize, 1, 15, 16, 17, 100, 1286, 4096, 65_537] {
            let size = shard_size_for(len, k);
            assert_eq!(size % 16, 0, "len {} k {} gave {}", len, k, size);
            assert!(size * k >= len, "len {} k {} gave {}", len, k, size);
        }
    }
}

#[test]
fn test_reference_layout() {
    let input = payload(1286, 7);
    let set = encode(&input, 10, 4).unwrap();

    assert_eq!(set.shard_size(), 144);
    assert_eq!(set.len(), 14);
    assert!(set.shards().iter().all(|s| s.len() == 144));

    // Shards 0..8 are full input, shard 8 holds the last 134 bytes
    for i in 0..8 {
        assert_eq!(set.shards()[i].as_bytes(), &input[i * 144..(i + 1) * 144]);
    }
    let last = set.shards()[8].as_bytes();
    assert_eq!(&last[..134], &input[1152..1286]);
    assert!(last[134..].iter().all(|&b| b == 0));
    assert!(set.shards()[9].as_bytes().iter().all(|&b| b == 0));
}

#[test]
fn test_encoding_is_deterministic() {
    let input = payload(5000, 99);
    let a = encode(&input, 8, 3).unwrap();
    let b = encode(&input, 8, 3).unwrap();
    assert_eq!(a.shards(), b.shards());
}

#[test]
fn test_any_r_losses_recoverable_small_layouts() {
    for (k, r) in [(1u32, 1u32), (2, 1), (3, 2), (4, 4), (5, 3)] {
        let config = FecConfig::new(k, r);
        let encoder = FecEncoder::new(config).unwrap();
        let decoder = FecDecoder::new(config).unwrap();
        let total = (k + r) as usize;

        for len in [0usize, 1, 33, 250] {
            let input = payload(len, k * 31 + r);
            let set = encoder.encode(&input).unwrap();

            for lost in subsets(total, r as usize) {
                let out = decoder.reconstruct(&received(&set, &lost), len).unwrap();
                assert_eq!(out, input, "k={} r={} len={} lost={:?}", k, r, len, lost);
            }
        }
    }
}

#[test]
fn test_any_four_losses_default_layout() {
    let config = FecConfig::new(10, 4);
    let input = payload(1286, 3);
    let set = FecEncoder::new(config).unwrap().encode(&input).unwrap();
    let decoder = FecDecoder::new(config).unwrap();

    for lost in subsets(14, 4) {
        let out = decoder.reconstruct(&received(&set, &lost), input.len()).unwrap();
        assert_eq!(out, input, "lost {:?}", lost);
    }
}

#[test]
fn test_invalid_layouts_rejected_up_front() {
    assert!(matches!(
        FecEncoder::new(FecConfig::new(0, 2)),
        Err(FecError::InvalidConfiguration { k: 0, r: 2, .. })
    ));
    assert!(matches!(
        encode(b"abc", 250, 10),
        Err(FecError::InvalidConfiguration { .. })
    ));
    assert!(FecEncoder::new(FecConfig::new(128, 128)).is_ok());
}

#[test]
fn test_zero_parity_is_plain_split() {
    let input = payload(40, 1);
    let set = encode(&input, 3, 0).unwrap();
    assert_eq!(set.len(), 3);
    assert!(set.parity_shards().is_empty());
}

#[test]
fn test_encoder_shared_across_threads() {
    let encoder = Arc::new(FecEncoder::new(FecConfig::new(10, 4)).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let encoder = encoder.clone();
            std::thread::spawn(move || {
                let input = payload(3000 + t * 17, t as u32 + 1);
                let set = encoder.encode(&input).unwrap();
                (input, set)
            })
        })
        .collect();

    let decoder = FecDecoder::new(FecConfig::new(10, 4)).unwrap();
    for handle in handles {
        let (input, set) = handle.join().unwrap();
        let out = decoder
            .reconstruct(&received(&set, &[1, 4, 11, 13]), input.len())
            .unwrap();
        assert_eq!(out, input);
    }
}
