//! Number-theoretic category classifier.
//!
//! A number that is not prime is tagged [`Category::Composite`] and nothing
//! else. A prime is run through seven independent detectors, in this fixed
//! order, and collects every tag that applies:
//!
//! | Order | Tag | Condition |
//! |-------|-----|-----------|
//! | 1 | `twin` | `n − 2` or `n + 2` prime |
//! | 2 | `cousin` | `n − 4` or `n + 4` prime |
//! | 3 | `sexy` | `n − 6` or `n + 6` prime |
//! | 4 | `sophie_germain` | `2n + 1` prime |
//! | 5 | `palindrome` | decimal palindrome with more than one digit |
//! | 6 | `mersenne` | `n + 1 = 2^p` with `p` prime |
//! | 7 | `fermat` | `n > 3` and `n − 1 = 2^k` with `k` a power of two |
//!
//! A prime that matches none of them is [`Category::Regular`].
//!
//! The Mersenne and Fermat detectors are bit-pattern heuristics: they check
//! the shape of `n ± 1`, not membership in the proven families.
//!
//! # Examples
//!
//! ```
//! use primemap::classify::{classify, Category};
//! use primemap::primality::TrialDivision;
//!
//! let tags: Vec<Category> = classify(13, &TrialDivision).iter().collect();
//! assert_eq!(tags, vec![Category::Twin, Category::Cousin, Category::Sexy]);
//! assert_eq!(classify(9, &TrialDivision).iter().collect::<Vec<_>>(), vec![Category::Composite]);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::primality::PrimeLookup;

/// A category tag.
///
/// Discriminants fix both the bit inside a [`CategorySet`] and the order in
/// which tags are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Category {
    /// Not prime.
    Composite = 0,
    /// `n ± 2` is prime.
    Twin = 1,
    /// `n ± 4` is prime.
    Cousin = 2,
    /// `n ± 6` is prime.
    Sexy = 3,
    /// `2n + 1` is prime.
    SophieGermain = 4,
    /// Multi-digit decimal palindrome.
    Palindrome = 5,
    /// `n + 1` is a power of two with a prime exponent.
    Mersenne = 6,
    /// `n − 1` is a power of two whose exponent is a power of two.
    Fermat = 7,
    /// Prime with no other tag.
    Regular = 8,
}

impl Category {
    /// Every tag, in report order.
    pub const ALL: [Category; 9] = [
        Category::Composite,
        Category::Twin,
        Category::Cousin,
        Category::Sexy,
        Category::SophieGermain,
        Category::Palindrome,
        Category::Mersenne,
        Category::Fermat,
        Category::Regular,
    ];

    /// Wire name of the tag.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Composite => "composite",
            Self::Twin => "twin",
            Self::Cousin => "cousin",
            Self::Sexy => "sexy",
            Self::SophieGermain => "sophie_germain",
            Self::Palindrome => "palindrome",
            Self::Mersenne => "mersenne",
            Self::Fermat => "fermat",
            Self::Regular => "regular",
        }
    }

    #[inline]
    const fn bit(self) -> u16 {
        1 << self as u8
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a tag name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category `{0}`")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Ordered set of [`Category`] tags packed into 16 bits.
///
/// Iteration follows detector order, so two sets with the same members always
/// list them identically. Serializes as a list of names in human-readable
/// formats and as the raw bits otherwise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CategorySet(u16);

impl CategorySet {
    /// No tags.
    pub const EMPTY: Self = Self(0);

    const VALID: u16 = (1 << Category::ALL.len()) - 1;

    /// Set with one tag.
    #[inline]
    pub const fn only(category: Category) -> Self {
        Self(category.bit())
    }

    /// Rebuild from raw bits. Unknown bits are dropped.
    #[inline]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & Self::VALID)
    }

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Add a tag.
    #[inline]
    pub const fn with(self, category: Category) -> Self {
        Self(self.0 | category.bit())
    }

    /// Membership.
    #[inline]
    pub const fn contains(self, category: Category) -> bool {
        self.0 & category.bit() != 0
    }

    /// Number of tags.
    #[inline]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// True when no tag is set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if any tag is shared with `other`.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Tags in detector order.
    pub fn iter(self) -> impl Iterator<Item = Category> {
        Category::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl fmt::Debug for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl Serialize for CategorySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_seq(self.iter())
        } else {
            serializer.serialize_u16(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for CategorySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = CategorySet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of category names or a u16 bitmask")
            }

            fn visit_u16<E: de::Error>(self, v: u16) -> Result<CategorySet, E> {
                if v & !CategorySet::VALID != 0 {
                    return Err(E::custom(format!("invalid category bits {v:#06x}")));
                }
                Ok(CategorySet(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<CategorySet, E> {
                let v = u16::try_from(v).map_err(|_| E::custom("category bits overflow u16"))?;
                self.visit_u16(v)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<CategorySet, A::Error> {
                let mut set = CategorySet::EMPTY;
                while let Some(c) = seq.next_element::<Category>()? {
                    set = set.with(c);
                }
                Ok(set)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_seq(SetVisitor)
        } else {
            deserializer.deserialize_u16(SetVisitor)
        }
    }
}

/// Classify `n` against a prime lookup.
///
/// Pure: the result depends only on `n` and the answers `primes` gives.
/// Always non-empty.
pub fn classify<P: PrimeLookup + ?Sized>(n: u64, primes: &P) -> CategorySet {
    if !primes.is_prime(n) {
        return CategorySet::only(Category::Composite);
    }

    let neighbor = |gap: u64| {
        n.checked_sub(gap).is_some_and(|m| primes.is_prime(m))
            || n.checked_add(gap).is_some_and(|m| primes.is_prime(m))
    };

    let mut tags = CategorySet::EMPTY;
    if neighbor(2) {
        tags = tags.with(Category::Twin);
    }
    if neighbor(4) {
        tags = tags.with(Category::Cousin);
    }
    if neighbor(6) {
        tags = tags.with(Category::Sexy);
    }
    if n.checked_mul(2)
        .and_then(|d| d.checked_add(1))
        .is_some_and(|m| primes.is_prime(m))
    {
        tags = tags.with(Category::SophieGermain);
    }
    if is_palindrome(n) {
        tags = tags.with(Category::Palindrome);
    }
    if is_mersenne_pattern(n, primes) {
        tags = tags.with(Category::Mersenne);
    }
    if is_fermat_pattern(n) {
        tags = tags.with(Category::Fermat);
    }

    if tags.is_empty() {
        CategorySet::only(Category::Regular)
    } else {
        tags
    }
}

/// `x & (x − 1) == 0` for positive `x`.
#[inline]
pub const fn is_power_of_two(x: u64) -> bool {
    x > 0 && x & (x - 1) == 0
}

/// Decimal palindrome with at least two digits.
pub fn is_palindrome(n: u64) -> bool {
    if n < 10 {
        return false;
    }
    let digits = n.to_string();
    digits.bytes().eq(digits.bytes().rev())
}

/// `n + 1` is `2^p` and `p` is prime under `primes`.
pub fn is_mersenne_pattern<P: PrimeLookup + ?Sized>(n: u64, primes: &P) -> bool {
    match n.checked_add(1) {
        Some(m) if m > 1 && is_power_of_two(m) => primes.is_prime(u64::from(m.trailing_zeros())),
        _ => false,
    }
}

/// `n > 3`, `n − 1` is `2^k`, and `k` is itself a power of two.
pub fn is_fermat_pattern(n: u64) -> bool {
    if n <= 3 {
        return false;
    }
    let k = n - 1;
    is_power_of_two(k) && is_power_of_two(u64::from(k.trailing_zeros()))
}
