//! Primality oracle — single-number tests and prime enumeration.
//!
//! Two enumeration paths share one contract: for any range they both cover,
//! they yield exactly the same primes.
//!
//! | Path | When | Memory |
//! |------|------|--------|
//! | [`SieveStrategy::Eratosthenes`] | `limit <= threshold` | `limit + 1` bytes |
//! | [`SieveStrategy::Chunked`] | `limit > threshold` | one chunk of results per worker |
//!
//! [`PrimeTable`] packs either path's output into a bitset and answers
//! membership queries for the classifier. Queries above the table's bound
//! fall through to [`is_prime`], so a table never reports a prime as
//! composite just because it was sized too small.
//!
//! # Examples
//!
//! ```
//! use primemap::primality::{is_prime, primes_up_to, PrimeTable, SieveStrategy};
//!
//! assert!(is_prime(13));
//! assert!(!is_prime(15));
//! assert_eq!(primes_up_to(20), vec![2, 3, 5, 7, 11, 13, 17, 19]);
//!
//! let table = PrimeTable::build(100, SieveStrategy::Eratosthenes);
//! assert_eq!(table.count(), 25);
//! ```

use std::collections::{BTreeSet, HashSet};

mod sieve;
mod table;

pub use sieve::{chunked_primes, eratosthenes, for_each_prime_chunk};
pub use table::{PrimeTable, PrimeTableIter};

/// Limits at or below this use the full sieve.
pub const DEFAULT_SIEVE_THRESHOLD: u64 = 1_000_000;

/// Numbers per chunk on the chunked path.
pub const DEFAULT_CHUNK_SIZE: u64 = 1_000_000;

/// Deterministic primality by trial division.
///
/// Rejects `n < 2` and even `n > 2`, then divides by odd integers up to
/// `⌊√n⌋`. Total over `u64`.
///
/// # Examples
///
/// ```
/// use primemap::primality::is_prime;
///
/// assert!(!is_prime(0));
/// assert!(!is_prime(1));
/// assert!(is_prime(2));
/// assert!(!is_prime(9));
/// assert!(is_prime(1_000_003));
/// ```
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n == 2 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let root = isqrt(n);
    let mut d = 3u64;
    while d <= root {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// All primes `<= limit`, ascending, using the default path selection.
pub fn primes_up_to(limit: u64) -> Vec<u64> {
    SieveStrategy::select(limit, DEFAULT_SIEVE_THRESHOLD).primes_up_to(limit)
}

/// Integer square root: the largest `r` with `r * r <= n`.
pub(crate) fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut r = (n as f64).sqrt() as u64;
    while r.saturating_mul(r) > n {
        r -= 1;
    }
    while (r + 1).saturating_mul(r + 1) <= n {
        r += 1;
    }
    r
}

/// Which enumeration path to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SieveStrategy {
    /// Full sieve of Eratosthenes over `0..=limit`.
    Eratosthenes,
    /// Fixed-size chunks, each candidate tested by trial division.
    Chunked {
        /// Numbers per chunk.
        chunk_size: u64,
    },
}

impl SieveStrategy {
    /// Picks the full sieve up to `threshold`, chunks above it.
    #[inline]
    pub fn select(limit: u64, threshold: u64) -> Self {
        Self::select_with_chunk(limit, threshold, DEFAULT_CHUNK_SIZE)
    }

    /// Like [`select`](Self::select) with an explicit chunk size.
    #[inline]
    pub fn select_with_chunk(limit: u64, threshold: u64, chunk_size: u64) -> Self {
        if limit > threshold {
            Self::Chunked {
                chunk_size: chunk_size.max(1),
            }
        } else {
            Self::Eratosthenes
        }
    }

    /// Enumerate all primes `<= limit` with this strategy.
    pub fn primes_up_to(self, limit: u64) -> Vec<u64> {
        match self {
            Self::Eratosthenes => eratosthenes(limit),
            Self::Chunked { chunk_size } => chunked_primes(limit, chunk_size),
        }
    }

    /// Short name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Eratosthenes => "eratosthenes",
            Self::Chunked { .. } => "chunked",
        }
    }
}

/// Membership predicate consumed by the classifier.
///
/// Every category detector asks the same predicate, so a classification is a
/// pure function of `(n, lookup)`.
pub trait PrimeLookup {
    /// True if `n` is prime under this lookup.
    fn is_prime(&self, n: u64) -> bool;
}

/// Stateless lookup that trial-divides every query.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrialDivision;

impl PrimeLookup for TrialDivision {
    #[inline]
    fn is_prime(&self, n: u64) -> bool {
        is_prime(n)
    }
}

impl PrimeLookup for PrimeTable {
    #[inline]
    fn is_prime(&self, n: u64) -> bool {
        self.contains(n)
    }
}

impl PrimeLookup for HashSet<u64> {
    #[inline]
    fn is_prime(&self, n: u64) -> bool {
        self.contains(&n)
    }
}

impl PrimeLookup for BTreeSet<u64> {
    #[inline]
    fn is_prime(&self, n: u64) -> bool {
        self.contains(&n)
    }
}

impl<T: PrimeLookup + ?Sized> PrimeLookup for &T {
    #[inline]
    fn is_prime(&self, n: u64) -> bool {
        (**self).is_prime(n)
    }
}
