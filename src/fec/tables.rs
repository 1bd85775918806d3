// SPDX-License-Identifier: MPL-2.0

//! Generator tables shared across encode calls
//!
//! Tables depend only on `(k, r)`. They are built once per pair, kept in a
//! process-wide cache and handed out as `Arc`s; the per-frame path never
//! touches the cache lock.

use super::matrix::Matrix;
use crate::constants::fec::MAX_TOTAL_SHARDS;
use crate::errors::FecError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

/// Shard layout for one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FecConfig {
    /// Data shards per access unit (k)
    pub data_shards: u32,
    /// Parity shards per access unit (r)
    pub parity_shards: u32,
}

impl Default for FecConfig {
    fn default() -> Self {
        Self {
            data_shards: crate::constants::fec::DEFAULT_DATA_SHARDS,
            parity_shards: crate::constants::fec::DEFAULT_PARITY_SHARDS,
        }
    }
}

impl FecConfig {
    pub fn new(data_shards: u32, parity_shards: u32) -> Self {
        Self {
            data_shards,
            parity_shards,
        }
    }

    /// Total shards per access unit (k + r), saturating for invalid layouts
    pub fn total_shards(&self) -> u32 {
        self.data_shards.saturating_add(self.parity_shards)
    }

    /// Reject layouts the encoder cannot serve
    pub fn validate(&self) -> Result<(), FecError> {
        let invalid = |reason: &str| FecError::InvalidConfiguration {
            k: self.data_shards,
            r: self.parity_shards,
            reason: reason.to_string(),
        };

        if self.data_shards == 0 {
            return Err(invalid("at least one data shard is required"));
        }
        match self.data_shards.checked_add(self.parity_shards) {
            Some(total) if total <= MAX_TOTAL_SHARDS => Ok(()),
            _ => Err(invalid("k + r must not exceed 256")),
        }
    }
}

/// Cauchy generator matrix for `(k, r)`
#[derive(Debug)]
pub struct GeneratorTables {
    config: FecConfig,
    matrix: Matrix,
}

impl GeneratorTables {
    /// Build tables for a validated configuration
    pub fn new(config: FecConfig) -> Result<Self, FecError> {
        config.validate()?;

        let k = config.data_shards as usize;
        let total = config.total_shards() as usize;
        let matrix = Matrix::cauchy(total, k);

        debug!(
            k = config.data_shards,
            r = config.parity_shards,
            "Built generator tables"
        );

        Ok(Self { config, matrix })
    }

    /// Shared tables for `config`, built on first use
    pub fn shared(config: FecConfig) -> Result<Arc<Self>, FecError> {
        static CACHE: OnceLock<RwLock<HashMap<FecConfig, Arc<GeneratorTables>>>> =
            OnceLock::new();
        let cache = CACHE.get_or_init(Default::default);

        if let Some(tables) = cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&config)
        {
            return Ok(Arc::clone(tables));
        }

        let built = Arc::new(Self::new(config)?);
        let mut guard = cache.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have raced us here; keep whichever landed first
        Ok(Arc::clone(guard.entry(config).or_insert(built)))
    }

    pub fn config(&self) -> FecConfig {
        self.config
    }

    pub fn data_shards(&self) -> usize {
        self.config.data_shards as usize
    }

    pub fn parity_shards(&self) -> usize {
        self.config.parity_shards as usize
    }

    pub fn total_shards(&self) -> usize {
        self.config.total_shards() as usize
    }

    /// Full `(k + r) x k` generator matrix
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Coefficients applied to the data shards for parity shard `parity`
    pub fn parity_row(&self, parity: usize) -> &[u8] {
        self.matrix.row(self.data_shards() + parity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_data_shards_rejected() {
        let err = FecConfig::new(0, 4).validate().unwrap_err();
        assert!(matches!(err, FecError::InvalidConfiguration { k: 0, r: 4, .. }));
    }

    #[test]
    fn test_total_shard_limit() {
        assert!(FecConfig::new(200, 56).validate().is_ok());
        assert!(FecConfig::new(200, 57).validate().is_err());
        assert!(FecConfig::new(1, u32::MAX).validate().is_err());
        assert!(FecConfig::new(1, 0).validate().is_ok());
    }

    #[test]
    fn test_total_shards_saturates_on_unvalidated_layout() {
        assert_eq!(FecConfig::new(1, u32::MAX).total_shards(), u32::MAX);
        assert_eq!(FecConfig::new(10, 4).total_shards(), 14);
    }

    #[test]
    fn test_shared_tables_are_reused() {
        let a = GeneratorTables::shared(FecConfig::new(6, 3)).unwrap();
        let b = GeneratorTables::shared(FecConfig::new(6, 3)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let c = GeneratorTables::shared(FecConfig::new(6, 2)).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_tables_depend_only_on_layout() {
        let a = GeneratorTables::new(FecConfig::new(10, 4)).unwrap();
        let b = GeneratorTables::new(FecConfig::new(10, 4)).unwrap();
        assert_eq!(a.matrix(), b.matrix());
        assert_eq!(a.parity_row(3), b.parity_row(3));
        assert_eq!(a.parity_row(3).len(), 10);
    }
}
