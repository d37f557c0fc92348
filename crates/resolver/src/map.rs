//! Resolved image map.

use std::collections::BTreeMap;

use clinicsite_registry::Registry;
use serde::Serialize;

/// Slot id to render-ready URL.
///
/// A map produced by [`AssetResolver::resolve_all`](crate::AssetResolver::resolve_all)
/// holds exactly the registry's ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImageMap(BTreeMap<String, String>);

impl ImageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `id` resolved to something other than its bundled default.
    pub fn is_override(&self, id: &str, registry: &Registry) -> bool {
        match (self.get(id), registry.default_path(id)) {
            (Some(url), Some(default)) => url != default,
            _ => false,
        }
    }
}

impl FromIterator<(String, String)> for ImageMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
