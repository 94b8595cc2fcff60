//! The two enumeration paths behind [`SieveStrategy`](super::SieveStrategy).

use rayon::prelude::*;
use tracing::debug;

use super::isqrt;

/// Sieve of Eratosthenes over `0..=limit`.
///
/// O(limit log log limit) time, one byte per number.
pub fn eratosthenes(limit: u64) -> Vec<u64> {
    if limit < 2 {
        return Vec::new();
    }
    let len = limit as usize + 1;
    let mut composite = vec![false; len];
    let root = isqrt(limit) as usize;
    for i in 2..=root {
        if !composite[i] {
            let mut j = i * i;
            while j < len {
                composite[j] = true;
                j += i;
            }
        }
    }
    (2..len)
        .filter(|&i| !composite[i])
        .map(|i| i as u64)
        .collect()
}

/// All primes `<= limit` via the chunked path, ascending.
pub fn chunked_primes(limit: u64, chunk_size: u64) -> Vec<u64> {
    let mut primes = Vec::new();
    for_each_prime_chunk(limit, chunk_size, |chunk| primes.extend_from_slice(chunk));
    primes
}

/// Drives the chunked path, handing each chunk's primes to `sink` in
/// ascending order.
///
/// `[2, limit]` is cut into chunks of `chunk_size` numbers, at most one chunk
/// spanning the whole range. Chunks are tested
/// in waves of one chunk per rayon worker, so at most that many chunk results
/// are alive at once. Each odd candidate is trial-divided by the primes up to
/// `√limit`.
pub fn for_each_prime_chunk<F>(limit: u64, chunk_size: u64, mut sink: F)
where
    F: FnMut(&[u64]),
{
    if limit < 2 {
        return;
    }
    let chunk_size = chunk_size.clamp(1, limit - 1);
    let divisors = eratosthenes(isqrt(limit));
    let chunk_count = (limit - 1).div_ceil(chunk_size);
    let wave = rayon::current_num_threads().max(1) as u64;

    let mut first = 0u64;
    while first < chunk_count {
        let last = (first + wave).min(chunk_count);
        let results: Vec<Vec<u64>> = (first..last)
            .into_par_iter()
            .map(|i| {
                let start = 2 + i * chunk_size;
                let end = start.saturating_add(chunk_size - 1).min(limit);
                primes_in_range(start, end, &divisors)
            })
            .collect();
        for chunk in &results {
            sink(chunk);
        }
        debug!(
            limit,
            through = last.saturating_mul(chunk_size).saturating_add(1).min(limit),
            "prime chunks tested"
        );
        first = last;
    }
}

fn primes_in_range(start: u64, end: u64, divisors: &[u64]) -> Vec<u64> {
    let mut found = Vec::new();
    let mut n = start;
    if n <= 2 && end >= 2 {
        found.push(2);
    }
    if n <= 2 {
        n = 3;
    }
    if n % 2 == 0 {
        n += 1;
    }
    while n <= end {
        if trial_divide(n, divisors) {
            found.push(n);
        }
        n += 2;
    }
    found
}

fn trial_divide(n: u64, divisors: &[u64]) -> bool {
    for &d in divisors {
        if d * d > n {
            break;
        }
        if n % d == 0 {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eratosthenes_edges() {
        assert!(eratosthenes(0).is_empty());
        assert!(eratosthenes(1).is_empty());
        assert_eq!(eratosthenes(2), vec![2]);
        assert_eq!(eratosthenes(3), vec![2, 3]);
        assert_eq!(eratosthenes(10), vec![2, 3, 5, 7]);
    }

    #[test]
    fn chunk_boundaries_do_not_drop_primes() {
        // Chunk sizes that put primes exactly on chunk edges.
        for chunk in [1u64, 2, 3, 7, 10, 97] {
            assert_eq!(chunked_primes(1_000, chunk), eratosthenes(1_000), "chunk={chunk}");
        }
    }

    #[test]
    fn chunk_sink_sees_ascending_order() {
        let mut last = 0u64;
        for_each_prime_chunk(50_000, 1_234, |chunk| {
            for &p in chunk {
                assert!(p > last);
                last = p;
            }
        });
        assert_eq!(Some(&last), eratosthenes(50_000).last());
    }

    #[test]
    fn oversized_chunks_cover_the_whole_range() {
        let expected = eratosthenes(100);
        assert_eq!(expected.len(), 25);
        for chunk in [99u64, 100, 1_000, u64::MAX / 2, u64::MAX] {
            assert_eq!(chunked_primes(100, chunk), expected, "chunk={chunk}");
        }
        assert_eq!(chunked_primes(2, u64::MAX), vec![2]);
    }

    #[test]
    fn prime_count_below_one_million() {
        assert_eq!(eratosthenes(1_000_000).len(), 78_498);
        assert_eq!(chunked_primes(1_000_000, 65_536).len(), 78_498);
    }
}
