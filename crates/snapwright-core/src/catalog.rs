use crate::part::PartPrefab;
use std::collections::BTreeMap;

/// Prefabs available for spawning, keyed by prefab key.
///
/// Frozen in practice once loaded; persistence resolves part records
/// against it by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartCatalog {
    prefabs: BTreeMap<String, PartPrefab>,
}

impl PartCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a prefab, returning any prefab it replaced under the same key.
    pub fn insert(&mut self, prefab: PartPrefab) -> Option<PartPrefab> {
        self.prefabs.insert(prefab.key.clone(), prefab)
    }

    pub fn get(&self, key: &str) -> Option<&PartPrefab> {
        self.prefabs.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.prefabs.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.prefabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefabs.is_empty()
    }

    /// Prefabs in key order.
    pub fn iter(&self) -> impl Iterator<Item = &PartPrefab> {
        self.prefabs.values()
    }
}

impl FromIterator<PartPrefab> for PartCatalog {
    fn from_iter<I: IntoIterator<Item = PartPrefab>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for prefab in iter {
            catalog.insert(prefab);
        }
        catalog
    }
}
