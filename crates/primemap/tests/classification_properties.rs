//! Property-based tests for classification, mapping, keys and scoring.
//!
//! Trial division is the reference lookup throughout; table-backed lookups
//! must agree with it for every input.

use proptest::prelude::*;
use primemap::mapping::Layout;
use primemap::primality::TrialDivision;
use primemap::resolver::similarity_score;
use primemap::{
    classify, is_prime, Category, CategoryFilters, Configuration, ConfigurationKey,
    MappingStrategy, PrimeTable, SieveStrategy,
};

fn strategy() -> impl Strategy<Value = MappingStrategy> {
    prop::sample::select(MappingStrategy::ALL.to_vec())
}

fn configuration() -> impl Strategy<Value = Configuration> {
    (1u32..=200, 1u32..=200, strategy())
        .prop_map(|(c, s, m)| Configuration::new(c, s, m).unwrap())
}

// =============================================================================
// Classification
// =============================================================================

proptest! {
    /// Tags are never empty, and `composite` appears alone exactly for
    /// non-primes.
    #[test]
    fn prop_tags_non_empty_and_exclusive(n in 0u64..5_000_000) {
        let tags = classify(n, &TrialDivision);
        prop_assert!(!tags.is_empty());
        if is_prime(n) {
            prop_assert!(!tags.contains(Category::Composite));
        } else {
            prop_assert_eq!(tags.iter().collect::<Vec<_>>(), vec![Category::Composite]);
        }
        if tags.contains(Category::Regular) {
            prop_assert_eq!(tags.len(), 1);
        }
    }

    /// Repeated classification yields the same ordered tags.
    #[test]
    fn prop_classification_deterministic(n in any::<u32>()) {
        let n = u64::from(n);
        let a: Vec<Category> = classify(n, &TrialDivision).iter().collect();
        let b: Vec<Category> = classify(n, &TrialDivision).iter().collect();
        prop_assert_eq!(a, b);
    }

    /// A table sized by the generator's rule classifies like trial division.
    #[test]
    fn prop_table_matches_trial_division(limit in 1u64..3_000, pick in any::<prop::sample::Index>()) {
        let table = PrimeTable::build(2 * limit + 1, SieveStrategy::Eratosthenes);
        let n = pick.index(limit as usize) as u64 + 1;
        prop_assert_eq!(classify(n, &table), classify(n, &TrialDivision));
    }

    /// Iteration follows the documented test order.
    #[test]
    fn prop_tag_order_is_fixed(n in 2u64..200_000) {
        let tags: Vec<u8> = classify(n, &TrialDivision).iter().map(|c| c as u8).collect();
        prop_assert!(tags.windows(2).all(|w| w[0] < w[1]));
    }
}

// =============================================================================
// Mapping
// =============================================================================

proptest! {
    /// Every strategy keeps every index inside the grid.
    #[test]
    fn prop_cells_inside_grid(
        c in 1u32..=2_000,
        s in 1u32..=2_000,
        m in strategy(),
        pick in any::<prop::sample::Index>(),
    ) {
        let layout = Layout::new(c, s);
        let n = pick.index(layout.limit() as usize) as u64 + 1;
        let cell = m.locate(n, &layout);
        prop_assert!(cell.circle < c);
        prop_assert!(cell.segment < s);
    }

    /// Linear mapping inverts to the index.
    #[test]
    fn prop_linear_inverts(c in 1u32..=500, s in 1u32..=500, pick in any::<prop::sample::Index>()) {
        let layout = Layout::new(c, s);
        let n = pick.index(layout.limit() as usize) as u64 + 1;
        let cell = MappingStrategy::Linear.locate(n, &layout);
        prop_assert_eq!(u64::from(cell.circle) * u64::from(s) + u64::from(cell.segment) + 1, n);
    }

    /// Projection radius is circle + 1 and lies on that circle.
    #[test]
    fn prop_projection_on_circle(circle in 0u32..10_000, segment in 0u32..1_300, s in 1u32..1_300) {
        let p = primemap::Position::project(primemap::Cell { circle, segment }, s);
        prop_assert_eq!(p.radius, circle + 1);
        let r = (p.x * p.x + p.y * p.y).sqrt();
        prop_assert!((r - f64::from(circle + 1)).abs() < 1e-6);
    }
}

// =============================================================================
// Keys and Scoring
// =============================================================================

proptest! {
    /// Equal configurations share a key; a differing geometry changes it.
    #[test]
    fn prop_key_deterministic(config in configuration()) {
        let copy = Configuration::new(config.circle_count(), config.segments_per_circle(), config.mapping()).unwrap();
        prop_assert_eq!(ConfigurationKey::of(&config), ConfigurationKey::of(&copy));
        let wider = config.with_segments(config.segments_per_circle() + 1).unwrap();
        prop_assert_ne!(ConfigurationKey::of(&config), ConfigurationKey::of(&wider));
    }

    /// Hiding a category changes the key.
    #[test]
    fn prop_filters_participate(config in configuration(), idx in 0usize..9) {
        let hidden = config.clone().with_filters(CategoryFilters::new().set(Category::ALL[idx], false));
        prop_assert_ne!(ConfigurationKey::of(&config), ConfigurationKey::of(&hidden));
    }

    /// Scores are symmetric, bounded, and 100 only for identical geometry.
    #[test]
    fn prop_score_bounds(a in configuration(), b in configuration()) {
        let ab = similarity_score(&a, &b);
        prop_assert_eq!(ab, similarity_score(&b, &a));
        prop_assert!(ab <= 100);
        prop_assert_eq!(ab == 100, a.same_geometry(&b));
        if a.mapping() != b.mapping() {
            prop_assert!(ab <= 50);
        }
    }
}

// =============================================================================
// Concrete scenarios
// =============================================================================

#[test]
fn eleven_on_ten_by_twenty_four() {
    let layout = Layout::new(10, 24);
    let cell = MappingStrategy::Linear.locate(11, &layout);
    assert_eq!((cell.circle, cell.segment), (0, 10));
    let tags: Vec<Category> = classify(11, &TrialDivision).iter().collect();
    assert_eq!(
        &tags[..4],
        &[Category::Twin, Category::Cousin, Category::Sexy, Category::SophieGermain]
    );
}

#[test]
fn seven_is_mersenne() {
    assert!(classify(7, &TrialDivision).contains(Category::Mersenne));
    assert!(classify(31, &TrialDivision).contains(Category::Mersenne));
    // 2^11 − 1 = 2047 = 23 · 89 is composite, so the pattern never sees it.
    assert!(!classify(2047, &TrialDivision).contains(Category::Mersenne));
}

#[test]
fn fermat_pattern_primes() {
    for n in [5u64, 17, 257, 65_537] {
        assert!(classify(n, &TrialDivision).contains(Category::Fermat), "n={n}");
    }
    assert!(!classify(3, &TrialDivision).contains(Category::Fermat));
}
