//! Detail view of a single number.
//!
//! ```
//! use primemap::{Category, NumberProfile};
//!
//! let p = NumberProfile::of(360);
//! assert!(!p.is_prime);
//! assert_eq!(p.factors, vec![2, 2, 2, 3, 3, 5]);
//! assert_eq!(p.properties.digit_sum, 9);
//!
//! let q = NumberProfile::of(13);
//! assert!(q.categories.contains(Category::Twin));
//! assert_eq!(q.partners.twin, vec![11]);
//! ```

use serde::Serialize;

use crate::classify::{classify, CategorySet};
use crate::primality::{is_prime, isqrt, TrialDivision};

/// Everything known about one number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberProfile {
    /// The number.
    pub number: u64,
    /// Primality.
    pub is_prime: bool,
    /// Category tags.
    pub categories: CategorySet,
    /// Prime factors with multiplicity, ascending. Empty for primes, 0 and 1.
    pub factors: Vec<u64>,
    /// Prime partners at gaps 2, 4 and 6, for primes.
    pub partners: Partners,
    /// Elementary properties.
    pub properties: Properties,
}

/// Primes at distance 2, 4 and 6 from a prime, below then above.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partners {
    /// `n ± 2`.
    pub twin: Vec<u64>,
    /// `n ± 4`.
    pub cousin: Vec<u64>,
    /// `n ± 6`.
    pub sexy: Vec<u64>,
}

/// Elementary properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Properties {
    /// Divisible by two.
    pub even: bool,
    /// Square of an integer.
    pub perfect_square: bool,
    /// Decimal digit count.
    pub digits: u32,
    /// Sum of decimal digits.
    pub digit_sum: u32,
}

impl NumberProfile {
    /// Profile of `n`. Primality and tags use trial division.
    pub fn of(n: u64) -> Self {
        let prime = is_prime(n);
        let root = isqrt(n);
        Self {
            number: n,
            is_prime: prime,
            categories: classify(n, &TrialDivision),
            factors: if prime { Vec::new() } else { factorize(n) },
            partners: if prime { partners(n) } else { Partners::default() },
            properties: Properties {
                even: n % 2 == 0,
                perfect_square: root * root == n,
                digits: digits(n),
                digit_sum: digit_sum(n),
            },
        }
    }
}

fn partners(n: u64) -> Partners {
    let at = |gap: u64| -> Vec<u64> {
        [n.checked_sub(gap), n.checked_add(gap)]
            .into_iter()
            .flatten()
            .filter(|&m| is_prime(m))
            .collect()
    };
    Partners {
        twin: at(2),
        cousin: at(4),
        sexy: at(6),
    }
}

/// Prime factorization with multiplicity, ascending. Empty for `n < 2`.
pub fn factorize(mut n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    if n < 2 {
        return factors;
    }
    while n % 2 == 0 {
        factors.push(2);
        n /= 2;
    }
    let mut d = 3u64;
    while d <= n / d {
        while n % d == 0 {
            factors.push(d);
            n /= d;
        }
        d += 2;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

fn digits(n: u64) -> u32 {
    n.checked_ilog10().map_or(1, |d| d + 1)
}

fn digit_sum(mut n: u64) -> u32 {
    let mut sum = 0u32;
    loop {
        sum += (n % 10) as u32;
        n /= 10;
        if n == 0 {
            return sum;
        }
    }
}
