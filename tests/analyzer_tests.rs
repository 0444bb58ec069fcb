//! End-to-end pattern analysis scenarios.

use logweave::infrastructure::mocks::MockClock;
use logweave::{
    AnalyzerConfig, CategoryRule, PatternAnalyzer, PatternType, VariableRule, VariableType,
    KEY_DIGITS, KEY_IPV4,
};
use std::sync::Arc;

fn security_config() -> AnalyzerConfig {
    AnalyzerConfig::default()
        .with_variable_rule(VariableRule::new("ip", KEY_IPV4, VariableType::IpAddress).unwrap())
        .with_variable_rule(VariableRule::new("number", KEY_DIGITS, VariableType::Number).unwrap())
        .with_category_rule(CategoryRule::new(
            "security",
            &["auth", "breach", "malware"],
            2,
        ))
}

#[test]
fn test_pattern_identity_across_variable_fields() {
    let analyzer = PatternAnalyzer::new(AnalyzerConfig::default()).unwrap();

    let first = analyzer.analyze("User admin logged in from 192.168.1.1");
    let second = analyzer.analyze("User john logged in from 192.168.1.2");

    // Both resolve to the same stored pattern via the similarity match.
    assert_eq!(first.hash, second.hash);
    assert_eq!(analyzer.pattern_count(), 1);
    assert_eq!(second.metadata.frequency, 2);
}

#[test]
fn test_variable_extraction_by_rule() {
    let analyzer = PatternAnalyzer::new(security_config()).unwrap();

    let pattern = analyzer.analyze("User auth breach detected from 192.168.1.100");

    assert_eq!(pattern.category, "security");
    assert_eq!(pattern.variables.len(), 1);
    assert_eq!(pattern.variables[0].var_type, VariableType::IpAddress);
    assert_eq!(pattern.variables[0].seen_values[0], "192.168.1.100");
}

#[test]
fn test_category_threshold_miss() {
    let analyzer = PatternAnalyzer::new(security_config()).unwrap();

    let pattern = analyzer.analyze("Request took 350ms");

    assert_eq!(pattern.category, "uncategorized");
    assert_eq!(pattern.variables.len(), 1);
    assert_eq!(pattern.variables[0].var_type, VariableType::Number);
    assert_eq!(pattern.variables[0].seen_values[0], "350ms");
}

#[test]
fn test_eviction_under_pressure() {
    let clock = Arc::new(MockClock::new(1_700_000_000));
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
fn test_custom_type_detection() {
    let analyzer = PatternAnalyzer::new(AnalyzerConfig::default()).unwrap();
    let pattern = analyzer.analyze("CUSTOM_TYPE: Special message");
    assert_eq!(pattern.pattern_type, PatternType::Custom);
}

#[test]
fn test_empty_message_boundary() {
    let analyzer = PatternAnalyzer::new(AnalyzerConfig::default()).unwrap();
    let pattern = analyzer.analyze("");
    assert_eq!(pattern.template, "");
    assert_eq!(pattern.pattern_type, PatternType::Message);
    assert_eq!(pattern.category, "uncategorized");
    assert!(pattern.variables.is_empty());
}

#[test]
fn test_single_character_boundary() {
    let analyzer = PatternAnalyzer::new(AnalyzerConfig::default()).unwrap();

    // A one-byte message is a variable iff that byte is an ASCII digit.
    let digit = analyzer.analyze("5");
    assert_eq!(digit.variables.len(), 1);
    assert_eq!(digit.variables[0].var_type, VariableType::Number);

    let letter = analyzer.analyze("x");
    assert!(letter.variables.is_empty());
}

#[test]
fn test_ip_heuristic_boundary() {
    // Heuristic alone: three dots classify even non-numeric sections.
    let analyzer = PatternAnalyzer::new(AnalyzerConfig::default()).unwrap();
    let pattern = analyzer.analyze("probe from a.b.c.d");
    assert_eq!(pattern.variables.len(), 1);
    assert_eq!(pattern.variables[0].var_type, VariableType::IpAddress);

    // With the IPv4 rule registered, its rejection is final.
    let config = AnalyzerConfig::default()
        .with_variable_rule(VariableRule::new("ip", KEY_IPV4, VariableType::IpAddress).unwrap());
    let analyzer = PatternAnalyzer::new(config).unwrap();
    let pattern = analyzer.analyze("probe from a.b.c.d");
    assert!(pattern.variables.is_empty());
}

#[test]
fn test_error_fallback_category_and_type() {
    let analyzer = PatternAnalyzer::new(AnalyzerConfig::default()).unwrap();
    let pattern = analyzer.analyze("replication failed on shard 7");
    assert_eq!(pattern.pattern_type, PatternType::Error);
    assert_eq!(pattern.category, "error");
}

#[test]
fn test_frequency_accumulates_over_identity_and_similarity() {
    let analyzer = PatternAnalyzer::new(AnalyzerConfig::default()).unwrap();

    analyzer.analyze("Session 100 opened by admin");
    analyzer.analyze("Session 100 opened by admin");
    let third = analyzer.analyze("Session 200 opened by admin");

    assert_eq!(analyzer.pattern_count(), 1);
    assert_eq!(third.metadata.frequency, 3);
    let metrics = analyzer.metrics().snapshot();
    assert_eq!(metrics.patterns_created, 1);
    assert_eq!(metrics.exact_matches, 1);
    assert_eq!(metrics.similarity_matches, 1);
}

#[test]
fn test_age_eviction_respects_strict_inequality() {
    let clock = Arc::new(MockClock::new(1_000));
    let config = AnalyzerConfig {
        max_pattern_age: 60,
        ..AnalyzerConfig::default()
    };
    let analyzer = PatternAnalyzer::with_clock(config, clock.clone()).unwrap();

    let first = analyzer.analyze("alpha one");

    // Exactly max_pattern_age seconds idle survives the sweep.
    clock.advance_secs(60);
    analyzer.analyze("totally different message");
    assert!(analyzer.find_pattern(first.hash).is_some());

    // One second past the limit does not.
    clock.advance_secs(1);
    analyzer.analyze("yet another unrelated line ###");
    assert!(analyzer.find_pattern(first.hash).is_none());
}

#[test]
fn test_seen_values_record_the_seeding_tokens() {
    let analyzer = PatternAnalyzer::new(AnalyzerConfig::default()).unwrap();
    let pattern = analyzer.analyze("retry 3 of 5 for job@worker");
    let values: Vec<&str> = pattern
        .variables
        .iter()
        .map(|v| v.seen_values[0].as_str())
        .collect();
    assert_eq!(values, vec!["3", "5", "job@worker"]);
    let types: Vec<VariableType> = pattern.variables.iter().map(|v| v.var_type).collect();
    assert_eq!(
        types,
        vec![
            VariableType::Number,
            VariableType::Number,
            VariableType::Email
        ]
    );
}
