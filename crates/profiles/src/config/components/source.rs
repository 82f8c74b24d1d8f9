//! In-memory shape of a declarative server list, before validation.
//!
//! A [`ProfileSource`] is what an external loader hands to
//! [`Registry::load`](crate::config::registry::Registry::load): an ordered list
//! of `(key, attributes)` entries. Entries are kept as a list rather than a map
//! so that a profile id declared twice is still visible to validation.

use crate::error::ConfigError;
use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use std::fmt;

/// Key under which the server list may be nested, as in `$cfg['Servers']`.
pub const SERVERS_KEY: &str = "servers";

/// A single attribute value: configuration values are strings, integers or booleans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl AttrValue {
    /// Short description used in `InvalidValue` diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            AttrValue::Str(_) => "a string",
            AttrValue::Int(_) => "an integer",
            AttrValue::Bool(_) => "a boolean",
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(i64::from(value))
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl<'de> Deserialize<'de> for AttrValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AttrValueVisitor;

        impl<'de> Visitor<'de> for AttrValueVisitor {
            type Value = AttrValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string, integer or boolean attribute value")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(AttrValue::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(AttrValue::Int(value))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                // Saturate so an oversized port still fails range validation.
                Ok(AttrValue::Int(i64::try_from(value).unwrap_or(i64::MAX)))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(AttrValue::Str(value.to_owned()))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(AttrValue::Str(value))
            }
        }

        deserializer.deserialize_any(AttrValueVisitor)
    }
}

/// Attribute map of one profile, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, AttrValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and programmatic sources.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Appends an attribute. Repeated names are kept so validation can reject them.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<AttrValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (name, value) in iter {
            attributes.insert(name, value);
        }
        attributes
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AttributesVisitor;

        impl<'de> Visitor<'de> for AttributesVisitor {
            type Value = Attributes;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a mapping of attribute names to values")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut attributes = Attributes::new();
                // A null value (`socket:` in YAML) reads as not set.
                while let Some((name, value)) = map.next_entry::<String, Option<AttrValue>>()? {
                    if let Some(value) = value {
                        attributes.insert(name, value);
                    }
                }
                Ok(attributes)
            }
        }

        deserializer.deserialize_map(AttributesVisitor)
    }
}

/// Raw key of a profile entry.
///
/// YAML keeps integer keys, while JSON and TOML only have string keys, so both
/// shapes are accepted here and turned into an id by [`ProfileKey::to_id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileKey {
    Int(i64),
    Str(String),
}

impl ProfileKey {
    /// Converts the key into a positive profile id.
    pub fn to_id(&self) -> Result<u32, ConfigError> {
        let parsed = match self {
            ProfileKey::Int(value) => u32::try_from(*value).ok(),
            ProfileKey::Str(value) => value.trim().parse::<u32>().ok(),
        };
        match parsed {
            Some(id) if id > 0 => Ok(id),
            _ => Err(ConfigError::invalid_id(self.to_string())),
        }
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileKey::Int(value) => write!(f, "{value}"),
            ProfileKey::Str(value) => f.write_str(value),
        }
    }
}

impl From<i64> for ProfileKey {
    fn from(value: i64) -> Self {
        ProfileKey::Int(value)
    }
}

impl From<i32> for ProfileKey {
    fn from(value: i32) -> Self {
        ProfileKey::Int(i64::from(value))
    }
}

impl From<&str> for ProfileKey {
    fn from(value: &str) -> Self {
        ProfileKey::Str(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ProfileKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KeyVisitor;

        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = ProfileKey;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an integer or string profile id")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ProfileKey::Int(value))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                // Out-of-range keys still reach `to_id` and fail there as `InvalidId`.
                Ok(i64::try_from(value)
                    .map(ProfileKey::Int)
                    .unwrap_or_else(|_| ProfileKey::Str(value.to_string())))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ProfileKey::Str(value.to_owned()))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

/// Ordered server list handed to the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSource {
    entries: Vec<(ProfileKey, Attributes)>,
}

impl ProfileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<ProfileKey>, attributes: Attributes) {
        self.entries.push((key.into(), attributes));
    }

    /// Builder-style [`ProfileSource::push`].
    pub fn with(mut self, key: impl Into<ProfileKey>, attributes: Attributes) -> Self {
        self.push(key, attributes);
        self
    }

    /// Appends every entry of `other`, keeping order.
    pub fn extend(&mut self, other: ProfileSource) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> impl Iterator<Item = (&ProfileKey, &Attributes)> {
        self.entries.iter().map(|(key, attributes)| (key, attributes))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for ProfileSource {
    type Item = (ProfileKey, Attributes);
    type IntoIter = std::vec::IntoIter<(ProfileKey, Attributes)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K> FromIterator<(K, Attributes)> for ProfileSource
where
    K: Into<ProfileKey>,
{
    fn from_iter<I: IntoIterator<Item = (K, Attributes)>>(iter: I) -> Self {
        let mut source = ProfileSource::new();
        for (key, attributes) in iter {
            source.push(key, attributes);
        }
        source
    }
}

impl<'de> Deserialize<'de> for ProfileSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SourceVisitor;

        impl<'de> Visitor<'de> for SourceVisitor {
            type Value = ProfileSource;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a mapping of profile ids to attribute mappings")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut source = ProfileSource::new();
                while let Some(key) = map.next_key::<ProfileKey>()? {
                    let nested = matches!(
                        &key,
                        ProfileKey::Str(name) if name.eq_ignore_ascii_case(SERVERS_KEY)
                    );
                    if nested {
                        source.extend(map.next_value::<ProfileSource>()?);
                    } else {
                        let attributes = map.next_value::<Attributes>()?;
                        source.push(key, attributes);
                    }
                }
                Ok(source)
            }
        }

        deserializer.deserialize_map(SourceVisitor)
    }
}
