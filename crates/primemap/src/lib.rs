//! Polar prime atlas engine.
//!
//! Integers `1..=C·S` are classified by number-theoretic category and laid
//! out on a polar grid of `C` concentric circles with `S` segments each.
//! Generated layouts are stored on disk and indexed; later requests are
//! answered from the index, exactly or by adapting the most similar stored
//! layout, and generated only when nothing stored is close enough.
//!
//! # Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`primality`] | trial division, sieve and chunked enumeration, [`PrimeTable`] |
//! | [`classify`] | ordered category tags for one number |
//! | [`mapping`] | four index → (circle, segment) strategies, polar projection |
//! | [`configuration`] | validated request parameters and display filters |
//! | [`key`] | deterministic configuration digests |
//! | [`dataset`] | generated records and statistics |
//! | [`index`] | the persisted, append-only result index |
//! | [`store`] | checksummed dataset files |
//! | [`resolver`] | similarity scoring of stored configurations |
//! | [`generator`] | batched, parallel, interruptible dataset synthesis |
//! | [`atlas`] | exact → similar → generated resolution |
//! | [`batch`] | long-running generation sweeps and their reports |
//! | [`profile`] | detail view of a single number |
//! | [`config`] | TOML engine configuration |
//!
//! # Categories
//!
//! A composite number (including 0 and 1) is tagged `composite` and nothing
//! else. A prime is tested, in this order, for:
//!
//! | Tag | Condition |
//! |-----|-----------|
//! | `twin` | `n − 2` or `n + 2` prime |
//! | `cousin` | `n − 4` or `n + 4` prime |
//! | `sexy` | `n − 6` or `n + 6` prime |
//! | `sophie_germain` | `2n + 1` prime |
//! | `palindrome` | two or more decimal digits, reads the same reversed |
//! | `mersenne` | `n + 1 = 2^p`, `p` prime |
//! | `fermat` | `n > 3`, `n − 1 = 2^k`, `k` a power of two |
//!
//! and tagged `regular` if none apply.
//!
//! # Quick Start
//!
//! ```
//! use primemap::{Category, Configuration, Generator, MappingStrategy};
//!
//! let config = Configuration::new(10, 24, MappingStrategy::Linear)?;
//! let dataset = Generator::default().generate(&config)?;
//! assert_eq!(dataset.len(), 240);
//!
//! let eleven = dataset.record(11).unwrap();
//! assert_eq!((eleven.circle, eleven.segment), (0, 10));
//! assert!(eleven.categories.contains(Category::SophieGermain));
//! # Ok::<(), primemap::Error>(())
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod atlas;
pub mod batch;
pub mod classify;
pub mod config;
pub mod configuration;
pub mod dataset;
pub mod error;
pub mod generator;
pub mod index;
pub mod key;
pub mod mapping;
pub mod primality;
pub mod profile;
pub mod resolver;
pub mod store;

pub use atlas::{Atlas, Resolved, Source};
pub use batch::{BatchJob, GenerationReport};
pub use classify::{classify, Category, CategorySet};
pub use config::EngineConfig;
pub use configuration::{CategoryFilters, Configuration};
pub use dataset::{Dataset, NumberRecord, Statistics};
pub use error::{Error, Result};
pub use generator::{Generator, Interrupt};
pub use index::{IndexEntry, IndexStats, ResultIndex};
pub use key::ConfigurationKey;
pub use mapping::{Cell, Layout, MappingStrategy, Position};
pub use primality::{is_prime, primes_up_to, PrimeLookup, PrimeTable, SieveStrategy};
pub use profile::NumberProfile;
pub use resolver::MatchResolver;
pub use store::DatasetStore;
