// SPDX-License-Identifier: GPL-3.0-only

use std::sync::OnceLock;

use fileman_types::StorageVolume;
use tracing::debug;

use super::{DiscoveryConfig, discover_volumes};
use crate::error::Result;

/// Lazily populated discovery result.
///
/// The first successful discovery is kept for the lifetime of the value.
/// Concurrent first callers may both run discovery, but only one result is
/// ever stored. Invalidation needs `&mut self`, so it cannot race readers.
#[derive(Debug, Default)]
pub struct VolumeCache {
    config: DiscoveryConfig,
    volumes: OnceLock<Vec<StorageVolume>>,
}

impl VolumeCache {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            config,
            volumes: OnceLock::new(),
        }
    }

    /// Seed a cache with known volumes, skipping discovery.
    pub fn with_volumes(config: DiscoveryConfig, volumes: Vec<StorageVolume>) -> Self {
        let cache = Self::new(config);
        let _ = cache.volumes.set(volumes);
        cache
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn is_populated(&self) -> bool {
        self.volumes.get().is_some()
    }

    pub fn volumes(&self) -> Result<&[StorageVolume]> {
        if let Some(volumes) = self.volumes.get() {
            return Ok(volumes);
        }

        let discovered = discover_volumes(&self.config)?;
        Ok(self.volumes.get_or_init(|| discovered))
    }

    pub fn invalidate(&mut self) {
        debug!("Invalidating storage volume cache");
        self.volumes = OnceLock::new();
    }
}

static SHARED: OnceLock<VolumeCache> = OnceLock::new();

/// Install the process-wide cache with `config`.
///
/// Returns `false` when the shared cache already exists; the existing one is
/// kept.
pub fn init_shared_cache(config: DiscoveryConfig) -> bool {
    SHARED.set(VolumeCache::new(config)).is_ok()
}

/// Process-wide cache, created with default settings on first use.
pub fn shared_cache() -> &'static VolumeCache {
    SHARED.get_or_init(VolumeCache::default)
}
