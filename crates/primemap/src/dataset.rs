//! Generated datasets.
//!
//! A [`Dataset`] holds one [`NumberRecord`] per index `1..=limit`, in order,
//! plus summary [`Statistics`]. Datasets are immutable once built; the only
//! transformation, [`Dataset::reprojected`], produces a new value.

use serde::{Deserialize, Serialize};

use crate::classify::CategorySet;
use crate::configuration::{CategoryFilters, Configuration};
use crate::error::{Error, Result};
use crate::mapping::{Cell, Position};

/// One classified, placed number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumberRecord {
    /// The number, `>= 1`.
    pub number: u64,
    /// Circle index.
    pub circle: u32,
    /// Segment index.
    pub segment: u32,
    /// Primality.
    pub is_prime: bool,
    /// Category tags, never empty.
    pub categories: CategorySet,
    /// Projected position.
    pub position: Position,
}

impl NumberRecord {
    /// The grid cell of this record.
    #[inline]
    pub const fn cell(&self) -> Cell {
        Cell {
            circle: self.circle,
            segment: self.segment,
        }
    }
}

/// Summary counters of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Number of records.
    pub total_elements: u64,
    /// Records with `is_prime`.
    pub total_primes: u64,
    /// `total_elements - total_primes`. `1` counts here.
    pub total_composites: u64,
    /// Prime share as a percentage, `0..=100`.
    pub density: f64,
}

impl Statistics {
    /// Counters for a record slice.
    pub fn from_records(records: &[NumberRecord]) -> Self {
        let primes = records.iter().filter(|r| r.is_prime).count() as u64;
        Self::from_counts(records.len() as u64, primes)
    }

    /// Counters from totals.
    pub fn from_counts(total_elements: u64, total_primes: u64) -> Self {
        let density = if total_elements == 0 {
            0.0
        } else {
            total_primes as f64 / total_elements as f64 * 100.0
        };
        Self {
            total_elements,
            total_primes,
            total_composites: total_elements.saturating_sub(total_primes),
            density,
        }
    }
}

/// A complete generated result for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    configuration: Configuration,
    elements: Vec<NumberRecord>,
    statistics: Statistics,
}

impl Dataset {
    /// Assembles a dataset and computes its statistics.
    ///
    /// # Errors
    ///
    /// [`Error::Generation`] if `elements` does not have exactly
    /// `configuration.limit()` records.
    pub fn new(configuration: Configuration, elements: Vec<NumberRecord>) -> Result<Self> {
        if elements.len() as u64 != configuration.limit() {
            return Err(Error::Generation(format!(
                "expected {} elements, got {}",
                configuration.limit(),
                elements.len()
            )));
        }
        let statistics = Statistics::from_records(&elements);
        Ok(Self {
            configuration,
            elements,
            statistics,
        })
    }

    /// The configuration the records were generated for.
    #[inline]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Records in index order.
    #[inline]
    pub fn elements(&self) -> &[NumberRecord] {
        &self.elements
    }

    /// Summary counters.
    #[inline]
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True only for a dataset with no records, which a valid configuration
    /// never produces.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The record for `n`, if `1 <= n <= limit`.
    pub fn record(&self, n: u64) -> Option<&NumberRecord> {
        let idx = usize::try_from(n.checked_sub(1)?).ok()?;
        self.elements.get(idx)
    }

    /// Records admitted by `filters`.
    pub fn filtered<'a>(
        &'a self,
        filters: &'a CategoryFilters,
    ) -> impl Iterator<Item = &'a NumberRecord> + 'a {
        self.elements
            .iter()
            .filter(move |r| filters.admits(r.categories))
    }

    /// Positions recomputed from each stored cell for a grid with
    /// `segments_per_circle` segments. Cells, tags and statistics are kept.
    #[must_use]
    pub fn reprojected(mut self, segments_per_circle: u32) -> Self {
        for record in &mut self.elements {
            record.position = Position::project(record.cell(), segments_per_circle);
        }
        self
    }

    /// Structural checks run on every loaded dataset.
    ///
    /// # Errors
    ///
    /// A description of the first violated invariant.
    pub fn check(&self) -> std::result::Result<(), String> {
        let config = &self.configuration;
        if self.elements.len() as u64 != config.limit() {
            return Err(format!(
                "{} elements for a limit of {}",
                self.elements.len(),
                config.limit()
            ));
        }
        for (i, r) in self.elements.iter().enumerate() {
            if r.number != i as u64 + 1 {
                return Err(format!("record {i} holds number {}", r.number));
            }
            if r.circle >= config.circle_count() || r.segment >= config.segments_per_circle() {
                return Err(format!("number {} lies outside the grid", r.number));
            }
            if r.categories.is_empty() {
                return Err(format!("number {} has no categories", r.number));
            }
        }
        if Statistics::from_records(&self.elements) != self.statistics {
            return Err("statistics do not match the records".into());
        }
        Ok(())
    }
}
