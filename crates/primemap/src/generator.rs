//! Dataset synthesis.
//!
//! The generator builds one [`PrimeTable`] covering
//! [`classification_bound`]`(limit) = 2·limit + 1`, which contains every
//! neighbor the classifier asks about for numbers up to `limit` (the largest
//! is the Sophie Germain candidate `2n + 1`). It then produces records for
//! `n = 1..=limit` in fixed-size batches; within a batch, numbers are
//! classified and mapped in parallel and collected in order.
//!
//! An [`Interrupt`] is polled before every batch. An interrupted or failed
//! run returns an error and yields no dataset.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::classify::classify;
use crate::config::EngineConfig;
use crate::configuration::Configuration;
use crate::dataset::{Dataset, NumberRecord};
use crate::error::{Error, Result};
use crate::mapping::{Layout, MappingStrategy, Position};
use crate::primality::{PrimeTable, SieveStrategy, DEFAULT_CHUNK_SIZE, DEFAULT_SIEVE_THRESHOLD};

/// Records produced per batch.
pub const DEFAULT_BATCH_SIZE: u64 = 100_000;

/// Largest dataset the generator accepts: 10 000 circles × 1 300 segments.
pub const DEFAULT_MAX_ELEMENTS: u64 = 13_000_000;

/// Upper end of the prime table needed to classify `1..=limit`.
#[inline]
pub const fn classification_bound(limit: u64) -> u64 {
    limit.saturating_mul(2).saturating_add(1)
}

/// Cooperative stop flag shared between a long-running job and whoever may
/// want to end it.
///
/// ```
/// use primemap::Interrupt;
///
/// let interrupt = Interrupt::new();
/// let handle = interrupt.clone();
/// assert!(!interrupt.is_triggered());
/// handle.trigger();
/// assert!(interrupt.is_triggered());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// A fresh, untriggered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop. Idempotent.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once [`trigger`](Self::trigger) has been called on any clone.
    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Builds datasets from configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generator {
    sieve_threshold: u64,
    chunk_size: u64,
    batch_size: u64,
    max_elements: u64,
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            sieve_threshold: DEFAULT_SIEVE_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            max_elements: DEFAULT_MAX_ELEMENTS,
        }
    }
}

impl Generator {
    /// Generator tuned by an engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            sieve_threshold: config.primality.sieve_threshold,
            chunk_size: config.primality.chunk_size.max(1),
            batch_size: config.generator.batch_size.max(1),
            max_elements: config.generator.max_elements,
        }
    }

    /// Same generator with a different batch size (at least 1).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Same generator with a different capacity limit.
    #[must_use]
    pub fn with_max_elements(mut self, max_elements: u64) -> Self {
        self.max_elements = max_elements;
        self
    }

    /// Records per batch.
    pub const fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// Largest accepted `limit`.
    pub const fn max_elements(&self) -> u64 {
        self.max_elements
    }

    /// The enumeration path used for a table bound.
    pub fn sieve_strategy(&self, bound: u64) -> SieveStrategy {
        SieveStrategy::select_with_chunk(bound, self.sieve_threshold, self.chunk_size)
    }

    /// The prime table covering [`classification_bound`]`(limit)`.
    pub fn prime_table(&self, limit: u64) -> PrimeTable {
        let bound = classification_bound(limit);
        let strategy = self.sieve_strategy(bound);
        let started = Instant::now();
        let table = PrimeTable::build(bound, strategy);
        debug!(
            bound,
            strategy = strategy.name(),
            primes = table.count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "prime table built"
        );
        table
    }

    /// Generates a dataset without any way to interrupt it.
    ///
    /// # Errors
    ///
    /// See [`generate_with`](Self::generate_with).
    pub fn generate(&self, config: &Configuration) -> Result<Dataset> {
        self.generate_with(config, &Interrupt::new())
    }

    /// Generates a dataset, polling `interrupt` before each batch.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfiguration`] if `config.limit()` exceeds the
    ///   capacity limit.
    /// - [`Error::Generation`] if the record buffer cannot be allocated.
    /// - [`Error::Interrupted`] if `interrupt` was triggered.
    pub fn generate_with(&self, config: &Configuration, interrupt: &Interrupt) -> Result<Dataset> {
        let limit = config.limit();
        if limit > self.max_elements {
            return Err(Error::InvalidConfiguration(format!(
                "{} × {} = {limit} elements exceeds the limit of {}",
                config.circle_count(),
                config.segments_per_circle(),
                self.max_elements
            )));
        }
        let capacity = usize::try_from(limit)
            .map_err(|_| Error::Generation(format!("{limit} elements do not fit in memory")))?;
        let mut elements: Vec<NumberRecord> = Vec::new();
        elements.try_reserve_exact(capacity).map_err(|e| {
            Error::Generation(format!("cannot allocate {limit} records: {e}"))
        })?;

        let started = Instant::now();
        info!(
            circles = config.circle_count(),
            segments = config.segments_per_circle(),
            mapping = %config.mapping(),
            limit,
            "generating dataset"
        );

        if interrupt.is_triggered() {
            return Err(Error::Interrupted {
                completed: 0,
                total: limit,
            });
        }
        let table = self.prime_table(limit);
        let layout = config.layout();
        let strategy = config.mapping();

        let mut start = 1u64;
        while start <= limit {
            if interrupt.is_triggered() {
                info!(completed = start - 1, total = limit, "generation interrupted");
                return Err(Error::Interrupted {
                    completed: start - 1,
                    total: limit,
                });
            }
            let end = start.saturating_add(self.batch_size - 1).min(limit);
            let len = (end - start + 1) as usize;
            let mut batch: Vec<NumberRecord> = (0..len)
                .into_par_iter()
                .map(|i| make_record(start + i as u64, &table, strategy, &layout))
                .collect();
            elements.append(&mut batch);
            drop(batch);
            debug!(
                through = end,
                total = limit,
                percent = end * 100 / limit,
                "batch done"
            );
            start = end + 1;
        }
        drop(table);

        let dataset = Dataset::new(config.clone(), elements)?;
        info!(
            limit,
            primes = dataset.statistics().total_primes,
            density = dataset.statistics().density,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dataset generated"
        );
        Ok(dataset)
    }
}

/// The record for a single number.
pub fn make_record(
    n: u64,
    primes: &PrimeTable,
    strategy: MappingStrategy,
    layout: &Layout,
) -> NumberRecord {
    let cell = strategy.locate(n, layout);
    NumberRecord {
        number: n,
        circle: cell.circle,
        segment: cell.segment,
        is_prime: primes.contains(n),
        categories: classify(n, primes),
        position: Position::project(cell, layout.segments_per_circle),
    }
}
