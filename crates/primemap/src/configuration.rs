//! Validated request configuration.
//!
//! A [`Configuration`] can only be obtained through [`Configuration::new`]
//! (or by deserializing, which runs the same checks), so every value in the
//! crate satisfies `circle_count >= 1` and `segments_per_circle >= 1`.
//!
//! # Examples
//!
//! ```
//! use primemap::{CategoryFilters, Configuration, MappingStrategy};
//!
//! let config = Configuration::new(10, 24, MappingStrategy::Linear)?
//!     .with_filters(CategoryFilters::new().hide("composite")?);
//! assert_eq!(config.limit(), 240);
//! assert!(Configuration::new(0, 24, MappingStrategy::Linear).is_err());
//! # Ok::<(), primemap::Error>(())
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::{Category, CategorySet};
use crate::error::{Error, Result};
use crate::mapping::{Layout, MappingStrategy};

/// Geometry, mapping strategy and display filters of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawConfiguration")]
pub struct Configuration {
    circle_count: u32,
    segments_per_circle: u32,
    mapping: MappingStrategy,
    filters: CategoryFilters,
}

#[derive(Deserialize)]
struct RawConfiguration {
    circle_count: u32,
    segments_per_circle: u32,
    mapping: MappingStrategy,
    #[serde(default)]
    filters: CategoryFilters,
}

impl TryFrom<RawConfiguration> for Configuration {
    type Error = Error;

    fn try_from(raw: RawConfiguration) -> Result<Self> {
        Ok(Self::new(raw.circle_count, raw.segments_per_circle, raw.mapping)?
            .with_filters(raw.filters))
    }
}

impl Configuration {
    /// Validates the geometry. Filters start out empty (everything visible).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] if either count is zero.
    pub fn new(circle_count: u32, segments_per_circle: u32, mapping: MappingStrategy) -> Result<Self> {
        if circle_count == 0 {
            return Err(Error::InvalidConfiguration(
                "circle_count must be at least 1".into(),
            ));
        }
        if segments_per_circle == 0 {
            return Err(Error::InvalidConfiguration(
                "segments_per_circle must be at least 1".into(),
            ));
        }
        Ok(Self {
            circle_count,
            segments_per_circle,
            mapping,
            filters: CategoryFilters::default(),
        })
    }

    /// Replaces the display filters.
    #[must_use]
    pub fn with_filters(mut self, filters: CategoryFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Same configuration with a different segment count.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] if `segments_per_circle` is zero.
    pub fn with_segments(&self, segments_per_circle: u32) -> Result<Self> {
        Ok(Self::new(self.circle_count, segments_per_circle, self.mapping)?
            .with_filters(self.filters.clone()))
    }

    /// Number of circles.
    #[inline]
    pub const fn circle_count(&self) -> u32 {
        self.circle_count
    }

    /// Segments per circle.
    #[inline]
    pub const fn segments_per_circle(&self) -> u32 {
        self.segments_per_circle
    }

    /// Mapping strategy.
    #[inline]
    pub const fn mapping(&self) -> MappingStrategy {
        self.mapping
    }

    /// Display filters.
    #[inline]
    pub fn filters(&self) -> &CategoryFilters {
        &self.filters
    }

    /// `circle_count × segments_per_circle`: the dataset length.
    #[inline]
    pub const fn limit(&self) -> u64 {
        self.layout().limit()
    }

    /// The grid this configuration maps into.
    #[inline]
    pub const fn layout(&self) -> Layout {
        Layout::new(self.circle_count, self.segments_per_circle)
    }

    /// True if both configurations describe the same grid and mapping,
    /// ignoring filters.
    pub fn same_geometry(&self, other: &Self) -> bool {
        self.circle_count == other.circle_count
            && self.segments_per_circle == other.segments_per_circle
            && self.mapping == other.mapping
    }
}

/// Category name → visible flag.
///
/// Filters decide which records are emitted downstream; they never change
/// classification. A category without an entry is visible. A record is
/// admitted if at least one of its categories is visible.
///
/// Equality compares effective visibility, so an explicit `true` equals an
/// absent entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, bool>", into = "BTreeMap<String, bool>")]
pub struct CategoryFilters {
    flags: BTreeMap<Category, bool>,
}

impl CategoryFilters {
    /// No filters: every category visible.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag for a category.
    #[must_use]
    pub fn set(mut self, category: Category, visible: bool) -> Self {
        self.flags.insert(category, visible);
        self
    }

    /// Hides a category by tag name.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] for an unknown tag name.
    pub fn hide(self, name: &str) -> Result<Self> {
        let category = name
            .parse::<Category>()
            .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        Ok(self.set(category, false))
    }

    /// Visibility of one category.
    #[inline]
    pub fn is_visible(&self, category: Category) -> bool {
        self.flags.get(&category).copied().unwrap_or(true)
    }

    /// True if at least one category in `categories` is visible.
    pub fn admits(&self, categories: CategorySet) -> bool {
        categories.iter().any(|c| self.is_visible(c))
    }

    /// Every category currently marked visible.
    pub fn visible(&self) -> CategorySet {
        Category::ALL
            .iter()
            .copied()
            .filter(|&c| self.is_visible(c))
            .collect()
    }

    /// True if nothing is hidden.
    pub fn is_permissive(&self) -> bool {
        self.flags.values().all(|&v| v)
    }

    /// The explicit flags, keyed by tag name.
    pub fn to_map(&self) -> BTreeMap<String, bool> {
        self.flags
            .iter()
            .map(|(c, &v)| (c.name().to_string(), v))
            .collect()
    }
}

impl PartialEq for CategoryFilters {
    fn eq(&self, other: &Self) -> bool {
        self.visible() == other.visible()
    }
}

impl Eq for CategoryFilters {}

impl std::hash::Hash for CategoryFilters {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.visible().bits().hash(state);
    }
}

impl TryFrom<BTreeMap<String, bool>> for CategoryFilters {
    type Error = Error;

    fn try_from(map: BTreeMap<String, bool>) -> Result<Self> {
        let mut flags = BTreeMap::new();
        for (name, visible) in map {
            let category = name
                .parse::<Category>()
                .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
            flags.insert(category, visible);
        }
        Ok(Self { flags })
    }
}

impl From<CategoryFilters> for BTreeMap<String, bool> {
    fn from(filters: CategoryFilters) -> Self {
        filters.to_map()
    }
}

impl FromIterator<(Category, bool)> for CategoryFilters {
    fn from_iter<I: IntoIterator<Item = (Category, bool)>>(iter: I) -> Self {
        Self {
            flags: iter.into_iter().collect(),
        }
    }
}
