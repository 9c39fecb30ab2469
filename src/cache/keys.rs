//! Cache key definitions.
//!
//! Defines `Tag` for invalidation groups and `CompositeKey` for cache entries.
//! A composite key is derived from a tag plus the ordered parameters of one read.

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter, Write as _};
use std::str::FromStr;

use serde::Deserialize;
use uuid::Uuid;

/// Logical name grouping every cache entry of one entity or query family.
///
/// Tags are the unit of invalidation: a write drops every key registered under
/// the tags of the entity it touched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(Cow<'static, str>);

impl Tag {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Tag {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// How key parts are joined onto the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFormat {
    /// `tag|len:part|len:part`; unambiguous for any part content.
    #[default]
    Delimited,
    /// `tag + part + part` with no separator.
    ///
    /// Matches keys written by older deployments bit-for-bit, but `("12", "3")`
    /// and `("1", "23")` collide. Only use it when sharing a store with them.
    Concatenated,
}

impl KeyFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delimited => "delimited",
            Self::Concatenated => "concatenated",
        }
    }
}

impl FromStr for KeyFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delimited" => Ok(Self::Delimited),
            "concatenated" => Ok(Self::Concatenated),
            other => Err(format!(
                "unknown key format `{other}` (expected `delimited` or `concatenated`)"
            )),
        }
    }
}

/// A query parameter that can take part in a composite key.
///
/// Stringification must be canonical: no case or whitespace normalization is
/// applied, so callers pass values exactly as they should be distinguished.
pub trait KeyPart: Send + Sync {
    fn key_part(&self) -> Cow<'_, str>;
}

impl KeyPart for str {
    fn key_part(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl KeyPart for String {
    fn key_part(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl KeyPart for bool {
    fn key_part(&self) -> Cow<'_, str> {
        Cow::Borrowed(if *self { "True" } else { "False" })
    }
}

impl KeyPart for Uuid {
    fn key_part(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }
}

impl<T: KeyPart> KeyPart for Option<T> {
    fn key_part(&self) -> Cow<'_, str> {
        match self {
            Some(value) => value.key_part(),
            None => Cow::Borrowed(""),
        }
    }
}

impl<T: KeyPart + ?Sized> KeyPart for &T {
    fn key_part(&self) -> Cow<'_, str> {
        (**self).key_part()
    }
}

macro_rules! integer_key_part {
    ($($ty:ty),* $(,)?) => {
        $(
            impl KeyPart for $ty {
                fn key_part(&self) -> Cow<'_, str> {
                    Cow::Owned(self.to_string())
                }
            }
        )*
    };
}

integer_key_part!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

/// A string filter whose "no filter" value is the parameter's own name.
///
/// Clients send `ArmyNo=ArmyNo` to mean "do not filter by army number", and the
/// raw value is what ends up in the cache key. A caller searching for the
/// literal text `ArmyNo` cannot be told apart from one sending no filter at all.
/// Existing clients depend on the convention, so it is kept as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelFilter {
    name: &'static str,
    value: String,
}

impl SentinelFilter {
    /// Build a filter from an optional request value; absent means unset.
    pub fn new(name: &'static str, value: Option<impl Into<String>>) -> Self {
        let value = value.map_or_else(|| name.to_string(), Into::into);
        Self { name, value }
    }

    pub fn unset(name: &'static str) -> Self {
        Self {
            name,
            value: name.to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_unset(&self) -> bool {
        self.value == self.name
    }

    /// The filter value, or `None` when the sentinel is in place.
    pub fn value(&self) -> Option<&str> {
        (!self.is_unset()).then_some(self.value.as_str())
    }

    /// The value as sent, sentinel included.
    pub fn raw(&self) -> &str {
        &self.value
    }
}

impl KeyPart for SentinelFilter {
    fn key_part(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.value)
    }
}

/// Concrete cache-store key derived from a tag and ordered key parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey(String);

impl CompositeKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CompositeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives composite keys in the configured [`KeyFormat`].
///
/// With no parts both formats yield the bare tag, which is why invalidation
/// also removes the tag itself from the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeKeyBuilder {
    format: KeyFormat,
}

impl CompositeKeyBuilder {
    pub fn new(format: KeyFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> KeyFormat {
        self.format
    }

    pub fn build(&self, tag: &Tag, parts: &[&dyn KeyPart]) -> CompositeKey {
        let mut key = String::from(tag.as_str());
        for part in parts {
            let part = part.key_part();
            match self.format {
                KeyFormat::Delimited => {
                    // Writing into a String cannot fail.
                    let _ = write!(key, "|{}:", part.len());
                    key.push_str(&part);
                }
                KeyFormat::Concatenated => key.push_str(&part),
            }
        }
        CompositeKey(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATEGORY: Tag = Tag::from_static("CategoryData");

    #[test]
    fn same_inputs_produce_same_key() {
        let builder = CompositeKeyBuilder::default();
        let first = builder.build(&CATEGORY, &[&1u32, &10u32, &"Name"]);
        let second = builder.build(&CATEGORY, &[&1u32, &10u32, &"Name"]);
        assert_eq!(first, second);
    }

    #[test]
    fn part_order_matters() {
        let builder = CompositeKeyBuilder::default();
        let first = builder.build(&CATEGORY, &[&1u32, &10u32]);
        let second = builder.build(&CATEGORY, &[&10u32, &1u32]);
        assert_ne!(first, second);
    }

    #[test]
    fn delimited_keys_do_not_collide_on_segmentation() {
        let builder = CompositeKeyBuilder::new(KeyFormat::Delimited);
        let first = builder.build(&CATEGORY, &[&"12", &"3"]);
        let second = builder.build(&CATEGORY, &[&"1", &"23"]);
        assert_ne!(first, second);
        assert_eq!(first.as_str(), "CategoryData|2:12|1:3");
    }

    #[test]
    fn concatenated_keys_match_legacy_surface() {
        let builder = CompositeKeyBuilder::new(KeyFormat::Concatenated);
        let key = builder.build(&CATEGORY, &[&1i32, &10i32, &"Name"]);
        assert_eq!(key.as_str(), "CategoryData110Name");

        // The known hazard of the legacy format.
        let first = builder.build(&CATEGORY, &[&"12", &"3"]);
        let second = builder.build(&CATEGORY, &[&"1", &"23"]);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_parts_yield_bare_tag() {
        let tag = Tag::from_static("DistinctCategoryData");
        for format in [KeyFormat::Delimited, KeyFormat::Concatenated] {
            let key = CompositeKeyBuilder::new(format).build(&tag, &[]);
            assert_eq!(key.as_str(), "DistinctCategoryData");
        }
    }

    #[test]
    fn no_case_or_whitespace_normalization() {
        let builder = CompositeKeyBuilder::default();
        let lower = builder.build(&CATEGORY, &[&"shoes"]);
        let upper = builder.build(&CATEGORY, &[&"Shoes"]);
        let padded = builder.build(&CATEGORY, &[&" shoes"]);
        assert_ne!(lower, upper);
        assert_ne!(lower, padded);
    }

    #[test]
    fn option_and_negative_parts_stringify() {
        let builder = CompositeKeyBuilder::new(KeyFormat::Concatenated);
        let none: Option<i64> = None;
        let key = builder.build(&CATEGORY, &[&Some(-56i64), &none, &true]);
        assert_eq!(key.as_str(), "CategoryData-56True");
    }

    #[test]
    fn sentinel_filter_recognizes_own_name() {
        let unset = SentinelFilter::new("ArmyNo", None::<String>);
        assert!(unset.is_unset());
        assert_eq!(unset.value(), None);
        assert_eq!(unset.raw(), "ArmyNo");

        let explicit = SentinelFilter::new("ArmyNo", Some("ArmyNo"));
        assert!(explicit.is_unset());

        let set = SentinelFilter::new("ArmyNo", Some("JC-4411"));
        assert!(!set.is_unset());
        assert_eq!(set.value(), Some("JC-4411"));
    }

    #[test]
    fn sentinel_filter_keeps_raw_value_in_key() {
        let builder = CompositeKeyBuilder::new(KeyFormat::Concatenated);
        let filter = SentinelFilter::unset("Name");
        let key = builder.build(&CATEGORY, &[&1u32, &10u32, &filter]);
        assert_eq!(key.as_str(), "CategoryData110Name");
    }

    #[test]
    fn key_format_parses_from_config_strings() {
        assert_eq!("delimited".parse::<KeyFormat>(), Ok(KeyFormat::Delimited));
        assert_eq!(
            "concatenated".parse::<KeyFormat>(),
            Ok(KeyFormat::Concatenated)
        );
        assert!("joined".parse::<KeyFormat>().is_err());
    }
}
