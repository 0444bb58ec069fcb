//! Log-pattern analysis engine.
//!
//! The analyzer maintains a bounded store of message templates keyed by
//! content hash. Each analyzed message resolves to a stored pattern by
//! exact hash, by similarity search, or by seeding a new template; every
//! insert is followed by age- and size-based eviction so the store never
//! outgrows its limits.

use crate::application::config::AnalyzerConfig;
use crate::application::metrics::AnalyzerMetrics;
use crate::application::ports::Clock;
use crate::domain::pattern::{message_hash, Pattern};
use crate::domain::rules::{categorize, extract_variables};
use crate::domain::similarity::byte_set_similarity;
use crate::error::Result;
use crate::infrastructure::clock::SystemClock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Concurrent pattern recognizer over a stream of log messages.
///
/// A single mutex serializes all analyzer state, including the similarity
/// search over every stored template. The analyzer exclusively owns its
/// patterns; callers receive clones.
#[derive(Debug)]
pub struct PatternAnalyzer {
    config: AnalyzerConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<AnalyzerState>,
    metrics: AnalyzerMetrics,
}

#[derive(Debug)]
struct AnalyzerState {
    /// wyhash of the template -> pattern. ahash keys the map itself.
    patterns: HashMap<u64, Pattern, ahash::RandomState>,
}

impl PatternAnalyzer {
    /// Create an analyzer with the given configuration and the system
    /// clock.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for out-of-range settings or rules
    /// with unrecognized pattern keys.
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create an analyzer with an explicit clock (mainly for testing).
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for out-of-range settings or rules
    /// with unrecognized pattern keys.
    pub fn with_clock(config: AnalyzerConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            state: Mutex::new(AnalyzerState {
                patterns: HashMap::default(),
            }),
            metrics: AnalyzerMetrics::new(),
        })
    }

    /// Resolve a message to its pattern.
    ///
    /// Lookup order: exact hash, then the best similarity match strictly
    /// above the configured threshold, then a freshly seeded pattern with
    /// extracted variables and an assigned category. Eviction runs after
    /// every insert, under the same lock.
    ///
    /// The returned pattern is a snapshot; it stays valid even if the
    /// stored original is evicted later.
    pub fn analyze(&self, message: &str) -> Pattern {
        let now = self.clock.epoch_secs();
        let hash = message_hash(message);
        let mut state = self.lock();

        if let Some(pattern) = state.patterns.get_mut(&hash) {
            pattern.touch(now);
            self.metrics.record_exact_match();
            return pattern.clone();
        }

        if let Some((best_hash, similarity)) = best_match(&state.patterns, message) {
            if similarity > self.config.similarity_threshold {
                // get_mut can't miss: best_hash came from this map under
                // the same lock.
                if let Some(pattern) = state.patterns.get_mut(&best_hash) {
                    pattern.touch(now);
                    pattern.weaken_confidence(similarity);
                    self.metrics.record_similarity_match();
                    return pattern.clone();
                }
            }
        }

        let mut pattern = Pattern::seed(message, now);
        pattern.variables = extract_variables(message, &self.config.variable_rules);
        pattern.category = categorize(message, &self.config.category_rules);
        let snapshot = pattern.clone();
        state.patterns.insert(hash, pattern);
        self.metrics.record_created();

        self.evict(&mut state, now);
        snapshot
    }

    /// Number of stored patterns. Takes the analyzer lock.
    pub fn pattern_count(&self) -> usize {
        self.lock().patterns.len()
    }

    /// Snapshot of the pattern stored under `hash`, if any.
    pub fn find_pattern(&self, hash: u64) -> Option<Pattern> {
        self.lock().patterns.get(&hash).cloned()
    }

    /// Snapshots of every stored pattern with the given category.
    pub fn patterns_by_category(&self, category: &str) -> Vec<Pattern> {
        self.lock()
            .patterns
            .values()
            .filter(|p| p.category == category)
            .cloned()
            .collect()
    }

    /// Drop every stored pattern.
    pub fn clear(&self) {
        self.lock().patterns.clear();
    }

    /// Tear down the analyzer, destroying all stored patterns.
    pub fn close(&self) {
        self.clear();
    }

    /// Observability counters.
    pub fn metrics(&self) -> &AnalyzerMetrics {
        &self.metrics
    }

    /// Active configuration.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Age out idle patterns, then trim the store to `max_patterns` by
    /// dropping the least recently seen.
    fn evict(&self, state: &mut AnalyzerState, now: i64) {
        let before = state.patterns.len();
        let max_age = self.config.max_pattern_age;
        state
            .patterns
            .retain(|_, pattern| now - pattern.metadata.last_seen <= max_age);

        let excess = state
            .patterns
            .len()
            .saturating_sub(self.config.max_patterns);
        if excess > 0 {
            let mut by_recency: Vec<(u64, i64)> = state
                .patterns
                .iter()
                .map(|(&hash, pattern)| (hash, pattern.metadata.last_seen))
                .collect();
            by_recency.sort_by_key(|&(_, last_seen)| last_seen);
            for &(hash, _) in by_recency.iter().take(excess) {
                state.patterns.remove(&hash);
            }
        }

        let evicted = before - state.patterns.len();
        if evicted > 0 {
            self.metrics.record_evicted(evicted as u64);
        }
    }

    // Every critical section leaves the pattern map consistent (a failed
    // insert never happens partially), so a poisoned lock is recoverable.
    fn lock(&self) -> MutexGuard<'_, AnalyzerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Best similarity candidate over the whole store: `(hash, score)` of the
/// argmax, ties resolved by first encounter.
fn best_match(
    patterns: &HashMap<u64, Pattern, ahash::RandomState>,
    message: &str,
) -> Option<(u64, f32)> {
    let mut best: Option<(u64, f32)> = None;
    for (&hash, pattern) in patterns {
        let similarity = byte_set_similarity(message, &pattern.template);
        if best.map(|(_, score)| similarity > score).unwrap_or(true) {
            best = Some((hash, similarity));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pattern::{PatternType, VariableType};
    use crate::domain::rules::{CategoryRule, VariableRule, KEY_DIGITS, KEY_IPV4};
    use crate::infrastructure::mocks::MockClock;

    fn analyzer(config: AnalyzerConfig) -> PatternAnalyzer {
        PatternAnalyzer::new(config).unwrap()
    }

    #[test]
    fn test_exact_repeat_increments_frequency() {
        let analyzer = analyzer(AnalyzerConfig::default());

        let first = analyzer.analyze("Cache flushed");
        assert_eq!(first.metadata.frequency, 1);

        let second = analyzer.analyze("Cache flushed");
        assert_eq!(second.hash, first.hash);
        assert_eq!(second.metadata.frequency, 2);
        assert_eq!(analyzer.pattern_count(), 1);
        assert_eq!(analyzer.metrics().exact_matches(), 1);
    }

    #[test]
    fn test_similar_messages_share_a_pattern() {
        let analyzer = analyzer(AnalyzerConfig::default());

        let first = analyzer.analyze("User admin logged in from 192.168.1.1");
        let second = analyzer.analyze("User john logged in from 192.168.1.2");

        assert_eq!(first.hash, second.hash);
        assert_eq!(second.metadata.frequency, 2);
        assert_eq!(analyzer.pattern_count(), 1);
        assert_eq!(analyzer.metrics().similarity_matches(), 1);
        // The template stays the seed message.
        assert_eq!(second.template, "User admin logged in from 192.168.1.1");
    }

    #[test]
    fn test_similarity_match_weakens_confidence() {
        let analyzer = analyzer(AnalyzerConfig::default());
        analyzer.analyze("User admin logged in from 192.168.1.1");
        let matched = analyzer.analyze("User john logged in from 192.168.1.2");
        assert!(matched.metadata.confidence < 1.0);
        assert!(matched.metadata.confidence > 0.85);
    }

    #[test]
    fn test_dissimilar_messages_get_their_own_patterns() {
        let analyzer = analyzer(AnalyzerConfig::default());
        let a = analyzer.analyze("Cache flushed");
        let b = analyzer.analyze("User admin logged in from 192.168.1.1");
        assert_ne!(a.hash, b.hash);
        assert_eq!(analyzer.pattern_count(), 2);
    }

    #[test]
    fn test_threshold_is_strict() {
        // With threshold 1.0 only byte-identical alphabets match, and the
        // comparison is strict, so even a perfect score seeds new state
        // only via the exact-hash path.
        let config = AnalyzerConfig {
            similarity_threshold: 1.0,
            ..AnalyzerConfig::default()
        };
        let analyzer = analyzer(config);
        analyzer.analyze("abc");
        // Same byte set, different message: similarity exactly 1.0 is not
        // strictly above the threshold.
        analyzer.analyze("cba");
        assert_eq!(analyzer.pattern_count(), 2);
    }

    #[test]
    fn test_rule_driven_extraction_and_category() {
        let config = AnalyzerConfig::default()
            .with_variable_rule(
                VariableRule::new("ip", KEY_IPV4, VariableType::IpAddress).unwrap(),
            )
            .with_variable_rule(
                VariableRule::new("number", KEY_DIGITS, VariableType::Number).unwrap(),
            )
            .with_category_rule(CategoryRule::new(
                "security",
                &["auth", "breach", "malware"],
                2,
            ));
        let analyzer = analyzer(config);

        let pattern = analyzer.analyze("User auth breach detected from 192.168.1.100");
        assert_eq!(pattern.category, "security");
        assert_eq!(pattern.variables.len(), 1);
        assert_eq!(pattern.variables[0].var_type, VariableType::IpAddress);
        assert_eq!(pattern.variables[0].seen_values[0], "192.168.1.100");
    }

    #[test]
    fn test_category_threshold_miss_stays_uncategorized() {
        let config = AnalyzerConfig::default()
            .with_variable_rule(
                VariableRule::new("ip", KEY_IPV4, VariableType::IpAddress).unwrap(),
            )
            .with_variable_rule(
                VariableRule::new("number", KEY_DIGITS, VariableType::Number).unwrap(),
            )
            .with_category_rule(CategoryRule::new(
                "security",
                &["auth", "breach", "malware"],
                2,
            ));
        let analyzer = analyzer(config);

        let pattern = analyzer.analyze("Request took 350ms");
        assert_eq!(pattern.category, "uncategorized");
        assert_eq!(pattern.variables.len(), 1);
        assert_eq!(pattern.variables[0].var_type, VariableType::Number);
        assert_eq!(pattern.variables[0].seen_values[0], "350ms");
    }

    #[test]
    fn test_custom_type_prefix() {
        let analyzer = analyzer(AnalyzerConfig::default());
        let pattern = analyzer.analyze("CUSTOM_TYPE: Special message");
        assert_eq!(pattern.pattern_type, PatternType::Custom);
    }

    #[test]
    fn test_empty_message_pattern() {
        let analyzer = analyzer(AnalyzerConfig::default());
        let pattern = analyzer.analyze("");
        assert_eq!(pattern.template, "");
        assert_eq!(pattern.pattern_type, PatternType::Message);
        assert_eq!(pattern.category, "uncategorized");
        assert!(pattern.variables.is_empty());
    }

    #[test]
    fn test_size_eviction_under_pressure() {
        // A pinned clock keeps max_pattern_age = 0 from aging anything
        // out mid-test; only the size limit evicts here.
        let clock = Arc::new(MockClock::new(1_000));
        let config = AnalyzerConfig {
            max_patterns: 2,
            max_pattern_age: 0,
            ..AnalyzerConfig::default()
        };
        let analyzer = PatternAnalyzer::with_clock(config, clock).unwrap();

        analyzer.analyze("alpha one");
        analyzer.analyze("bravo two two");
        analyzer.analyze("charlie 3333");
        assert_eq!(analyzer.pattern_count(), 2);
    }

    #[test]
    fn test_age_eviction_drops_idle_patterns() {
        let clock = Arc::new(MockClock::new(1_000));
        let config = AnalyzerConfig {
            max_pattern_age: 60,
            ..AnalyzerConfig::default()
        };
        let analyzer = PatternAnalyzer::with_clock(config, clock.clone()).unwrap();

        analyzer.analyze("alpha one");
        clock.advance_secs(61);
        // The insert-triggered sweep removes the pattern idle for 61 > 60
        // seconds.
        analyzer.analyze("totally different message");
        assert_eq!(analyzer.pattern_count(), 1);
        assert_eq!(analyzer.metrics().patterns_evicted(), 1);
    }

    #[test]
    fn test_age_eviction_spares_recently_seen() {
        let clock = Arc::new(MockClock::new(1_000));
        let config = AnalyzerConfig {
            max_pattern_age: 60,
            ..AnalyzerConfig::default()
        };
        let analyzer = PatternAnalyzer::with_clock(config, clock.clone()).unwrap();

        analyzer.analyze("alpha one");
        clock.advance_secs(30);
        analyzer.analyze("alpha one");
        clock.advance_secs(40);
        // 70 seconds since first_seen but only 40 since last_seen.
        analyzer.analyze("totally different message");
        assert_eq!(analyzer.pattern_count(), 2);
    }

    #[test]
    fn test_size_eviction_removes_least_recently_seen() {
        let clock = Arc::new(MockClock::new(1_000));
        let config = AnalyzerConfig {
            max_patterns: 2,
            ..AnalyzerConfig::default()
        };
        let analyzer = PatternAnalyzer::with_clock(config, clock.clone()).unwrap();

        let oldest = analyzer.analyze("alpha one");
        clock.advance_secs(10);
        let kept = analyzer.analyze("bravo two two");
        clock.advance_secs(10);
        let newest = analyzer.analyze("charlie 3333");

        assert_eq!(analyzer.pattern_count(), 2);
        assert!(analyzer.find_pattern(oldest.hash).is_none());
        assert!(analyzer.find_pattern(kept.hash).is_some());
        assert!(analyzer.find_pattern(newest.hash).is_some());
    }

    #[test]
    fn test_returned_snapshot_survives_eviction() {
        let config = AnalyzerConfig {
            max_patterns: 1,
            ..AnalyzerConfig::default()
        };
        let analyzer = analyzer(config);
        let first = analyzer.analyze("alpha one");
        analyzer.analyze("totally different message");
        // The snapshot is still usable even though the store dropped it.
        assert_eq!(first.template, "alpha one");
        assert_eq!(analyzer.pattern_count(), 1);
    }

    #[test]
    fn test_find_and_category_queries() {
        let config = AnalyzerConfig::default().with_category_rule(CategoryRule::new(
            "security",
            &["auth", "breach"],
            1,
        ));
        let analyzer = analyzer(config);
        let pattern = analyzer.analyze("auth token rotated");
        analyzer.analyze("Cache flushed");

        assert_eq!(
            analyzer.find_pattern(pattern.hash).unwrap().category,
            "security"
        );
        assert_eq!(analyzer.patterns_by_category("security").len(), 1);
        assert_eq!(analyzer.patterns_by_category("uncategorized").len(), 1);
        assert!(analyzer.patterns_by_category("absent").is_empty());
    }

    #[test]
    fn test_clear_and_close_destroy_patterns() {
        let analyzer = analyzer(AnalyzerConfig::default());
        analyzer.analyze("alpha one");
        analyzer.analyze("totally different message");
        analyzer.clear();
        assert_eq!(analyzer.pattern_count(), 0);
        analyzer.close();
        assert_eq!(analyzer.pattern_count(), 0);
    }

    #[test]
    fn test_rejects_invalid_configuration() {
        let config = AnalyzerConfig {
            similarity_threshold: 0.0,
            ..AnalyzerConfig::default()
        };
        assert!(PatternAnalyzer::new(config).is_err());
    }

    #[test]
    fn test_concurrent_analysis_stays_bounded() {
        use std::thread;

        let config = AnalyzerConfig {
            max_patterns: 50,
            similarity_threshold: 0.99,
            ..AnalyzerConfig::default()
        };
        let analyzer = Arc::new(analyzer(config));
        let mut handles = vec![];

        for t in 0..4 {
            let analyzer = Arc::clone(&analyzer);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    analyzer.analyze(&format!("worker {} step {}", t, i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(analyzer.pattern_count() <= 50);
    }
}
