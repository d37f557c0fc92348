//! Image slot registry.
//!
//! Each slot has a stable id that pages and the admin console refer to,
//! a key under which an override may exist in the object store, and a
//! bundled default that always exists.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Errors from registry construction.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("image record with empty id")]
    EmptyId,

    #[error("image {0} has no default path")]
    EmptyDefault(String),

    #[error("duplicate image id: {0}")]
    DuplicateId(String),
}

/// Page area an image slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Brand,
    Hero,
    About,
    Services,
    Results,
    Team,
}

impl Section {
    /// Human-readable heading used by the admin listing.
    pub fn title(self) -> &'static str {
        match self {
            Section::Brand => "Brand",
            Section::Hero => "Hero",
            Section::About => "About",
            Section::Services => "Services",
            Section::Results => "Before & After",
            Section::Team => "Team",
        }
    }
}

/// A registered image slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub label: String,
    pub section: Section,
    /// Key of the optional override in the object store.
    pub storage_path: String,
    /// Bundled fallback, always present.
    pub default_path: String,
}

impl ImageRecord {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        section: Section,
        storage_path: impl Into<String>,
        default_path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            section,
            storage_path: storage_path.into(),
            default_path: default_path.into(),
        }
    }
}

/// (id, label, section, storage path, default path)
const BUILTIN_IMAGES: &[(&str, &str, Section, &str, &str)] = &[
    ("logo", "Logo", Section::Brand, "logo.png", "/images/logo-default.png"),
    ("og-image", "Social share preview", Section::Brand, "og-image.jpg", "/images/og-default.jpg"),
    ("hero", "Hero background", Section::Hero, "hero.jpg", "/images/hero-default.jpg"),
    ("hero-mobile", "Hero background (mobile)", Section::Hero, "hero-mobile.jpg", "/images/hero-mobile-default.jpg"),
    ("about", "About the clinic", Section::About, "about.jpg", "/images/about-default.jpg"),
    ("about-interior", "Clinic interior", Section::About, "about-interior.jpg", "/images/about-interior-default.jpg"),
    ("service-injectables", "Injectables", Section::Services, "services/injectables.jpg", "/images/services/injectables-default.jpg"),
    ("service-fillers", "Dermal fillers", Section::Services, "services/fillers.jpg", "/images/services/fillers-default.jpg"),
    ("service-skin", "Skin treatments", Section::Services, "services/skin.jpg", "/images/services/skin-default.jpg"),
    ("service-laser", "Laser treatments", Section::Services, "services/laser.jpg", "/images/services/laser-default.jpg"),
    ("before-after-1-before", "Case 1 (before)", Section::Results, "before-after/1-before.jpg", "/images/before-after/1-before-default.jpg"),
    ("before-after-1-after", "Case 1 (after)", Section::Results, "before-after/1-after.jpg", "/images/before-after/1-after-default.jpg"),
    ("before-after-2-before", "Case 2 (before)", Section::Results, "before-after/2-before.jpg", "/images/before-after/2-before-default.jpg"),
    ("before-after-2-after", "Case 2 (after)", Section::Results, "before-after/2-after.jpg", "/images/before-after/2-after-default.jpg"),
    ("before-after-3-before", "Case 3 (before)", Section::Results, "before-after/3-before.jpg", "/images/before-after/3-before-default.jpg"),
    ("before-after-3-after", "Case 3 (after)", Section::Results, "before-after/3-after.jpg", "/images/before-after/3-after-default.jpg"),
    ("before-after-4-before", "Case 4 (before)", Section::Results, "before-after/4-before.jpg", "/images/before-after/4-before-default.jpg"),
    ("before-after-4-after", "Case 4 (after)", Section::Results, "before-after/4-after.jpg", "/images/before-after/4-after-default.jpg"),
    ("team-lead", "Lead practitioner", Section::Team, "team/lead.jpg", "/images/team/lead-default.jpg"),
    ("team-group", "Team photo", Section::Team, "team/group.jpg", "/images/team/group-default.jpg"),
];

/// Validated, ordered set of image slots.
///
/// Registration order is preserved so listings come out in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    records: Vec<ImageRecord>,
}

impl Registry {
    /// Builds a registry, rejecting empty ids, empty defaults and duplicates.
    pub fn new(records: Vec<ImageRecord>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if record.id.is_empty() {
                return Err(RegistryError::EmptyId);
            }
            if record.default_path.is_empty() {
                return Err(RegistryError::EmptyDefault(record.id.clone()));
            }
            if !seen.insert(record.id.as_str()) {
                return Err(RegistryError::DuplicateId(record.id.clone()));
            }
        }
        Ok(Self { records })
    }

    /// The compile-time table of site image slots.
    pub fn builtin() -> Self {
        let records = BUILTIN_IMAGES
            .iter()
            .map(|&(id, label, section, storage, default)| {
                ImageRecord::new(id, label, section, storage, default)
            })
            .collect();
        // The builtin table is covered by `builtin_registry_is_valid`.
        Self { records }
    }

    /// Looks up a slot by id.
    pub fn get(&self, id: &str) -> Option<&ImageRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Bundled fallback for a slot.
    pub fn default_path(&self, id: &str) -> Option<&str> {
        self.get(id).map(|r| r.default_path.as_str())
    }

    /// Iterates slots in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, default: &str) -> ImageRecord {
        ImageRecord::new(id, id, Section::Hero, format!("{id}.jpg"), default)
    }

    #[test]
    fn builtin_registry_is_valid() {
        let builtin = Registry::builtin();
        let rebuilt = Registry::new(builtin.iter().cloned().collect()).unwrap();
        assert_eq!(builtin, rebuilt);
        assert!(!builtin.is_empty());
    }

    #[test]
    fn builtin_hero_slot() {
        let registry = Registry::builtin();
        let hero = registry.get("hero").unwrap();
        assert_eq!(hero.storage_path, "hero.jpg");
        assert_eq!(hero.default_path, "/images/hero-default.jpg");
        assert_eq!(registry.default_path("hero"), Some("/images/hero-default.jpg"));
    }

    #[test]
    fn builtin_has_before_after_pairs() {
        let registry = Registry::builtin();
        for n in 1..=4 {
            assert!(registry.contains(&format!("before-after-{n}-before")));
            assert!(registry.contains(&format!("before-after-{n}-after")));
        }
    }

    #[test]
    fn rejects_empty_default() {
        let err = Registry::new(vec![record("hero", "")]).unwrap_err();
        assert_eq!(err, RegistryError::EmptyDefault("hero".into()));
    }

    #[test]
    fn rejects_empty_id() {
        let err = Registry::new(vec![record("", "/a.jpg")]).unwrap_err();
        assert_eq!(err, RegistryError::EmptyId);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Registry::new(vec![record("a", "/a.jpg"), record("a", "/b.jpg")]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId("a".into()));
    }

    #[test]
    fn preserves_registration_order() {
        let registry = Registry::new(vec![
            record("z", "/z.jpg"),
            record("a", "/a.jpg"),
            record("m", "/m.jpg"),
        ])
        .unwrap();
        let ids: Vec<&str> = registry.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn unknown_id_has_no_default() {
        let registry = Registry::builtin();
        assert!(registry.get("nope").is_none());
        assert!(registry.default_path("nope").is_none());
    }

    #[test]
    fn record_serializes_camel_case() {
        let json = serde_json::to_value(record("hero", "/h.jpg")).unwrap();
        assert_eq!(json["storagePath"], "hero.jpg");
        assert_eq!(json["defaultPath"], "/h.jpg");
        assert_eq!(json["section"], "hero");
    }
}
