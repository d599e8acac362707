use std::ops::{Deref, DerefMut};

use crate::{
    assets::asset::Asset,
    discover::DiscoveredAsset,
    foundation::error::StackResult,
};

/// Owning, ordered collection of opened assets.
///
/// Every asset is released exactly once: explicitly through [`AssetSet::release_all`], or on drop
/// on any early-return path.
#[derive(Debug, Default)]
pub struct AssetSet {
    assets: Vec<Asset>,
}

impl AssetSet {
    /// Wrap already opened assets, keeping their order.
    pub fn new(assets: Vec<Asset>) -> Self {
        Self { assets }
    }

    /// Open every discovered entry in order; fails on the first entry that does not load.
    ///
    /// Assets opened before the failure are released when the partial set is dropped.
    pub fn load(entries: &[DiscoveredAsset]) -> StackResult<Self> {
        let mut set = Self {
            assets: Vec::with_capacity(entries.len()),
        };
        for entry in entries {
            set.assets.push(Asset::open(&entry.path, entry.kind)?);
        }
        Ok(set)
    }

    /// Release every asset. Safe to call repeatedly.
    pub fn release_all(&mut self) {
        for asset in &mut self.assets {
            asset.release();
        }
    }
}

impl Deref for AssetSet {
    type Target = [Asset];

    fn deref(&self) -> &[Asset] {
        &self.assets
    }
}

impl DerefMut for AssetSet {
    fn deref_mut(&mut self) -> &mut [Asset] {
        &mut self.assets
    }
}

impl Drop for AssetSet {
    fn drop(&mut self) {
        self.release_all();
    }
}
