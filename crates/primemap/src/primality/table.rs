//! Bitset of primes over `0..=bound`.

use super::sieve::{eratosthenes, for_each_prime_chunk};
use super::{is_prime, SieveStrategy};

/// Prime membership over `0..=bound`, one bit per number.
///
/// For the largest supported layout (`2 · 13_000_000 + 1` numbers) the table
/// is about 3.3 MB. Numbers above `bound` are answered by trial division.
///
/// # Examples
///
/// ```
/// use primemap::primality::{PrimeTable, SieveStrategy};
///
/// let table = PrimeTable::build(50, SieveStrategy::Eratosthenes);
/// assert!(table.contains(47));
/// assert!(!table.contains(49));
/// assert!(table.contains(101)); // above the bound, trial division
/// assert_eq!(table.iter().take(4).collect::<Vec<_>>(), vec![2, 3, 5, 7]);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct PrimeTable {
    words: Vec<u64>,
    bound: u64,
    count: u64,
}

impl PrimeTable {
    /// Empty table covering `0..=bound`.
    pub fn empty(bound: u64) -> Self {
        let words = (bound / 64 + 1) as usize;
        Self {
            words: vec![0; words],
            bound,
            count: 0,
        }
    }

    /// Build the table with the given enumeration path.
    pub fn build(bound: u64, strategy: SieveStrategy) -> Self {
        let mut table = Self::empty(bound);
        match strategy {
            SieveStrategy::Eratosthenes => {
                for p in eratosthenes(bound) {
                    table.insert(p);
                }
            }
            SieveStrategy::Chunked { chunk_size } => {
                for_each_prime_chunk(bound, chunk_size, |chunk| {
                    for &p in chunk {
                        table.insert(p);
                    }
                });
            }
        }
        table
    }

    /// Build from an explicit list of primes. Values above `bound` are ignored.
    pub fn from_primes(bound: u64, primes: impl IntoIterator<Item = u64>) -> Self {
        let mut table = Self::empty(bound);
        for p in primes {
            if p <= bound {
                table.insert(p);
            }
        }
        table
    }

    #[inline]
    fn insert(&mut self, value: u64) {
        let word = (value >> 6) as usize;
        let mask = 1u64 << (value & 63);
        if self.words[word] & mask == 0 {
            self.words[word] |= mask;
            self.count += 1;
        }
    }

    /// Membership test. Exact for every `u64`.
    #[inline]
    pub fn contains(&self, value: u64) -> bool {
        if value > self.bound {
            return is_prime(value);
        }
        let word = (value >> 6) as usize;
        (self.words[word] >> (value & 63)) & 1 == 1
    }

    /// Largest number answered from the bitset.
    #[inline]
    pub const fn bound(&self) -> u64 {
        self.bound
    }

    /// Number of primes in `0..=bound`.
    #[inline]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Number of primes in `0..=limit`, for `limit <= bound`.
    pub fn count_up_to(&self, limit: u64) -> u64 {
        let limit = limit.min(self.bound);
        let full = (limit / 64) as usize;
        let mut total: u64 = self.words[..full]
            .iter()
            .map(|w| u64::from(w.count_ones()))
            .sum();
        let rem = limit & 63;
        let mask = if rem == 63 {
            u64::MAX
        } else {
            (1u64 << (rem + 1)) - 1
        };
        total += u64::from((self.words[full] & mask).count_ones());
        total
    }

    /// Ascending iterator over the primes in `0..=bound`.
    pub fn iter(&self) -> PrimeTableIter<'_> {
        PrimeTableIter {
            words: &self.words,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl std::fmt::Debug for PrimeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimeTable")
            .field("bound", &self.bound)
            .field("count", &self.count)
            .finish()
    }
}

/// Iterator over a [`PrimeTable`].
pub struct PrimeTableIter<'a> {
    words: &'a [u64],
    word_idx: usize,
    current: u64,
}

impl Iterator for PrimeTableIter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros();
                self.current &= self.current - 1;
                return Some(self.word_idx as u64 * 64 + u64::from(bit));
            }
            self.word_idx += 1;
            self.current = *self.words.get(self.word_idx)?;
        }
    }
}
