use std::collections::BTreeMap;

use crate::models::DatasetKey;

/// Boundary datasets shipped with every deployment, as `(key, path)` pairs.
const DEFAULT_DATASETS: &[(&str, &str)] = &[
    ("kecamatan-boundaries", "kecamatan.geojson"),
    ("kelurahan-boundaries", "kelurahan.geojson"),
    ("rt-boundaries", "rt.geojson"),
];

/// Known dataset keys and the path of each below the geo source base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRegistry {
    datasets: BTreeMap<DatasetKey, String>,
}

impl DatasetRegistry {
    pub fn empty() -> Self {
        Self {
            datasets: BTreeMap::new(),
        }
    }

    /// Register (or re-point) a dataset.
    pub fn with(mut self, key: impl Into<DatasetKey>, path: impl Into<String>) -> Self {
        self.insert(key.into(), path.into());
        self
    }

    pub fn insert(&mut self, key: DatasetKey, path: String) {
        self.datasets.insert(key, path);
    }

    pub fn path(&self, key: &DatasetKey) -> Option<&str> {
        self.datasets.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &DatasetKey) -> bool {
        self.datasets.contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &DatasetKey> {
        self.datasets.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DatasetKey, &str)> {
        self.datasets.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl Default for DatasetRegistry {
    fn default() -> Self {
        DEFAULT_DATASETS
            .iter()
            .fold(Self::empty(), |registry, (key, path)| {
                registry.with(*key, *path)
            })
    }
}
