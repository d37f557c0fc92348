//! Site settings record and its built-in defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Admin listing group for a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingGroup {
    Business,
    Contact,
    Address,
    Hours,
    Social,
}

/// Descriptor for a single setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingField {
    pub key: &'static str,
    pub label: &'static str,
    pub group: SettingGroup,
    pub default: &'static str,
}

const fn field(
    key: &'static str,
    label: &'static str,
    group: SettingGroup,
    default: &'static str,
) -> SettingField {
    SettingField {
        key,
        label,
        group,
        default,
    }
}

/// Every recognised setting, in admin listing order.
pub const SETTING_FIELDS: &[SettingField] = &[
    field("business_name", "Business name", SettingGroup::Business, "Lumière Aesthetics Clinic"),
    field("tagline", "Tagline", SettingGroup::Business, "Natural results, expert care"),
    field("phone", "Phone", SettingGroup::Contact, "+44 20 7946 0321"),
    field("email", "Email", SettingGroup::Contact, "hello@lumiere-clinic.co.uk"),
    field("whatsapp", "WhatsApp number", SettingGroup::Contact, "+44 7700 900123"),
    field("booking_url", "Booking link", SettingGroup::Contact, ""),
    field("address_street", "Street", SettingGroup::Address, "12 Harley Street"),
    field("address_city", "City", SettingGroup::Address, "London"),
    field("address_postcode", "Postcode", SettingGroup::Address, "W1G 9PF"),
    field("address_country", "Country", SettingGroup::Address, "United Kingdom"),
    field("hours_weekdays", "Monday to Friday", SettingGroup::Hours, "9:00 – 19:00"),
    field("hours_saturday", "Saturday", SettingGroup::Hours, "10:00 – 16:00"),
    field("hours_sunday", "Sunday", SettingGroup::Hours, "Closed"),
    field("instagram", "Instagram handle", SettingGroup::Social, "@lumiereclinic"),
    field("facebook", "Facebook page", SettingGroup::Social, "lumiereclinic"),
    field("tiktok", "TikTok handle", SettingGroup::Social, ""),
];

/// Looks up a setting descriptor by key.
pub fn setting_field(key: &str) -> Option<&'static SettingField> {
    SETTING_FIELDS.iter().find(|f| f.key == key)
}

/// The complete built-in default record.
pub fn default_settings() -> SettingsRecord {
    SETTING_FIELDS
        .iter()
        .map(|f| (f.key.to_string(), f.default.to_string()))
        .collect()
}

/// Flat, ordered settings map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsRecord(BTreeMap<String, String>);

impl SettingsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns the value or an empty string.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
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

    /// Shallow merge: every override replaces the value under its key,
    /// keys without an override keep their current value.
    pub fn overlay<I, K, V>(&self, overrides: I) -> SettingsRecord
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut merged = self.clone();
        for (key, value) in overrides {
            merged.insert(key, value);
        }
        merged
    }

    /// `tel:` link for the phone number (digits and a leading `+` only).
    pub fn tel_href(&self) -> Option<String> {
        let phone = self.get("phone")?.trim();
        let mut digits = String::with_capacity(phone.len());
        for (i, c) in phone.chars().enumerate() {
            if c.is_ascii_digit() || (i == 0 && c == '+') {
                digits.push(c);
            }
        }
        if digits.trim_start_matches('+').is_empty() {
            return None;
        }
        Some(format!("tel:{digits}"))
    }

    /// Single-line postal address from the non-empty address parts.
    pub fn full_address(&self) -> String {
        [
            "address_street",
            "address_city",
            "address_postcode",
            "address_country",
        ]
        .iter()
        .filter_map(|k| self.get(k))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SettingsRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
