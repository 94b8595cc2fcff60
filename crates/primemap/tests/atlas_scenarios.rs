//! End-to-end resolution against a temporary data directory.
//!
//! Each test opens its own [`Atlas`] so the index and dataset files it sees
//! are exactly the ones it wrote.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use primemap::resolver::similarity_score;
use primemap::{
    primes_up_to, Atlas, Category, CategoryFilters, Configuration, ConfigurationKey, EngineConfig,
    Interrupt, MappingStrategy, ResultIndex, Source,
};

fn open(dir: &Path) -> Atlas {
    Atlas::open(EngineConfig::with_data_dir(dir)).unwrap()
}

fn config(c: u32, s: u32, m: MappingStrategy) -> Configuration {
    Configuration::new(c, s, m).unwrap()
}

// =============================================================================
// Resolution paths
// =============================================================================

#[test]
fn ten_by_twenty_four_linear() {
    let dir = tempfile::tempdir().unwrap();
    let atlas = open(dir.path());
    let resolved = atlas
        .resolve(&config(10, 24, MappingStrategy::Linear))
        .unwrap();

    let stats = resolved.dataset.statistics();
    assert_eq!(stats.total_elements, 240);
    assert_eq!(stats.total_primes, 52);
    assert_eq!(stats.total_composites, 188);

    let eleven = resolved.dataset.record(11).unwrap();
    assert_eq!((eleven.circle, eleven.segment), (0, 10));
    assert!(eleven.is_prime);
    assert!(eleven.categories.contains(Category::SophieGermain));
    assert_eq!(eleven.position.radius, 1);
    assert!((eleven.position.angle - 150.0).abs() < 1e-12);

    let seven = resolved.dataset.record(7).unwrap();
    assert!(seven.categories.contains(Category::Mersenne));
}

#[test]
fn mapping_only_difference_scores_fifty() {
    let linear = config(10, 24, MappingStrategy::Linear);
    let spiral = config(10, 24, MappingStrategy::ArchimedeanSpiral);
    assert_eq!(similarity_score(&spiral, &linear), 50);

    let dir = tempfile::tempdir().unwrap();
    let atlas = open(dir.path());
    atlas.resolve(&linear).unwrap();
    // 50 clears the default threshold of 30, so the linear dataset answers.
    let resolved = atlas.resolve(&spiral).unwrap();
    assert_eq!(resolved.score(), 50);
    assert!(matches!(resolved.source, Source::Similar { .. }));
}

#[test]
fn raised_threshold_forces_generation() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = EngineConfig::with_data_dir(dir.path());
    engine.resolver.min_score = 90;
    let atlas = Atlas::open(engine).unwrap();

    atlas.resolve(&config(10, 24, MappingStrategy::Linear)).unwrap();
    let near = config(11, 24, MappingStrategy::Linear);
    assert_eq!(similarity_score(&near, &config(10, 24, MappingStrategy::Linear)), 95);
    let resolved = atlas.resolve(&near).unwrap();
    assert!(matches!(resolved.source, Source::Similar { score: 95, .. }));

    let far = config(12, 24, MappingStrategy::Linear);
    let resolved = atlas.resolve(&far).unwrap();
    assert!(matches!(resolved.source, Source::Generated { .. }));
    assert_eq!(resolved.dataset.len(), 288);
}

#[test]
fn best_candidate_wins() {
    let dir = tempfile::tempdir().unwrap();
    let atlas = open(dir.path());
    let none = Interrupt::new();
    atlas.generate_and_store(&config(10, 30, MappingStrategy::Linear), &none).unwrap();
    atlas.generate_and_store(&config(10, 26, MappingStrategy::Linear), &none).unwrap();
    let target = ConfigurationKey::of(&config(10, 26, MappingStrategy::Linear));

    let resolved = atlas.resolve(&config(10, 24, MappingStrategy::Linear)).unwrap();
    assert_eq!(resolved.key(), &target);
    assert_eq!(resolved.score(), 50 + 25 + 21);
}

#[test]
fn filters_select_records_not_classification() {
    let dir = tempfile::tempdir().unwrap();
    let atlas = open(dir.path());
    let plain = config(10, 24, MappingStrategy::Linear);
    let primes_only = plain
        .clone()
        .with_filters(CategoryFilters::new().set(Category::Composite, false));
    assert_ne!(ConfigurationKey::of(&plain), ConfigurationKey::of(&primes_only));

    let a = atlas.resolve(&plain).unwrap();
    // Identical geometry scores 100, so the unfiltered dataset answers.
    let b = atlas.resolve(&primes_only).unwrap();
    assert!(matches!(b.source, Source::Similar { score: 100, .. }));
    assert_eq!(a.dataset.elements(), b.dataset.elements());
    assert_eq!(a.visible().count(), 240);
    assert_eq!(b.visible().count(), 52);
    assert!(b.visible().all(|r| r.is_prime));
}

#[test]
fn unusable_candidates_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let atlas = open(dir.path());
    let stored = atlas.resolve(&config(10, 24, MappingStrategy::Linear)).unwrap();
    fs::remove_file(atlas.store().path_for(stored.key())).unwrap();

    let resolved = atlas.resolve(&config(10, 22, MappingStrategy::Linear)).unwrap();
    assert!(matches!(resolved.source, Source::Generated { .. }));
    assert_eq!(resolved.dataset.len(), 220);
}

#[test]
fn corrupt_index_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    {
        let atlas = open(dir.path());
        atlas.resolve(&config(4, 4, MappingStrategy::Logarithmic)).unwrap();
    }
    let engine = EngineConfig::with_data_dir(dir.path());
    fs::write(engine.index_path(), b"{ not json").unwrap();
    assert!(ResultIndex::load(engine.index_path()).is_empty());

    let atlas = open(dir.path());
    let resolved = atlas
        .resolve(&config(4, 4, MappingStrategy::Logarithmic))
        .unwrap();
    assert!(matches!(resolved.source, Source::Generated { .. }));
    assert_eq!(atlas.index().len(), 1);
}

#[test]
fn alternatives_list_other_filters() {
    let dir = tempfile::tempdir().unwrap();
    let atlas = open(dir.path());
    let base = config(6, 8, MappingStrategy::FibonacciSpiral);
    atlas.resolve(&base).unwrap();
    for category in [Category::Composite, Category::Regular, Category::Twin] {
        let filtered = base
            .clone()
            .with_filters(CategoryFilters::new().set(category, false));
        atlas.generate_and_store(&filtered, &Interrupt::new()).unwrap();
    }
    let alternatives = atlas.alternatives(&base);
    assert_eq!(alternatives.len(), 3);
    assert!(alternatives
        .iter()
        .all(|e| e.configuration.same_geometry(&base) && e.key != ConfigurationKey::of(&base)));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn concurrent_generation_shares_the_index() {
    let dir = tempfile::tempdir().unwrap();
    let atlas = Arc::new(open(dir.path()));
    let handles: Vec<_> = (1..=4u32)
        .map(|i| {
            let atlas = Arc::clone(&atlas);
            thread::spawn(move || {
                let request = config(i * 10, 50, MappingStrategy::Linear);
                atlas.generate_and_store(&request, &Interrupt::new()).unwrap();
                request
            })
        })
        .collect();
    let requests: Vec<Configuration> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(atlas.index().len(), 4);
    let reopened = open(dir.path());
    assert_eq!(reopened.index().len(), 4);
    for request in &requests {
        assert!(reopened.has_usable(request));
    }
}

#[test]
fn separate_atlases_on_one_directory_keep_both_entries() {
    let dir = tempfile::tempdir().unwrap();
    let generator = open(dir.path());
    let server = open(dir.path());
    let swept = config(10, 24, MappingStrategy::Linear);
    let requested = config(3, 7, MappingStrategy::Logarithmic);

    generator.generate_and_store(&swept, &Interrupt::new()).unwrap();
    server.generate_and_store(&requested, &Interrupt::new()).unwrap();

    let reopened = open(dir.path());
    assert_eq!(reopened.index().len(), 2);
    assert!(reopened.has_usable(&swept));
    assert!(reopened.has_usable(&requested));
    assert!(server.has_usable(&swept));
}

// =============================================================================
// Full-size target
// =============================================================================

/// Generates and writes the full 13 000 000-record dataset.
#[test]
#[ignore = "generates the full-size dataset"]
fn ten_thousand_by_thirteen_hundred() {
    let dir = tempfile::tempdir().unwrap();
    let atlas = open(dir.path());
    let request = config(10_000, 1_300, MappingStrategy::Linear);
    let resolved = atlas.resolve(&request).unwrap();
    assert!(matches!(resolved.source, Source::Generated { .. }));
    assert_eq!(resolved.dataset.len(), 13_000_000);
    assert_eq!(
        resolved.dataset.statistics().total_primes,
        primes_up_to(13_000_000).len() as u64
    );
    let last = resolved.dataset.record(13_000_000).unwrap();
    assert_eq!((last.circle, last.segment), (9_999, 1_299));
}
