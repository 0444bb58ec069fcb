//! Message templates recognized by the pattern analyzer.
//!
//! A [`Pattern`] is seeded by the first message of its class. The template
//! string stays immutable; frequency, recency and confidence are updated
//! on every subsequent match.

use serde::{Deserialize, Serialize};

/// Stable content hash of a message, used as the pattern-store key.
///
/// Uses wyhash with seed 0 so identical messages map to identical patterns
/// across runs and processes.
pub fn message_hash(message: &str) -> u64 {
    wyhash::wyhash(message.as_bytes(), 0)
}

/// Coarse classification of a message template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Ordinary log message
    Message,
    /// Failure report
    Error,
    /// Measurement or gauge reading
    Metric,
    /// Domain event notification
    Event,
    /// Caller-tagged custom class
    Custom,
}

impl PatternType {
    /// Classify a raw message by keyword scan. The first matching rule
    /// wins; the scan order is fixed.
    pub fn classify(message: &str) -> Self {
        if message.starts_with("CUSTOM_TYPE:") {
            PatternType::Custom
        } else if message.contains("error") || message.contains("fail") {
            PatternType::Error
        } else if message.contains("metric") || message.contains("measure") {
            PatternType::Metric
        } else if message.contains("event") {
            PatternType::Event
        } else {
            PatternType::Message
        }
    }
}

/// Kind of data a recognized variable token carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    /// Free-form text
    String,
    /// Token beginning with a decimal digit
    Number,
    /// Calendar date
    Date,
    /// RFC 4122 UUID
    Uuid,
    /// Email address
    Email,
    /// Dotted-quad IP address
    IpAddress,
    /// Filesystem path
    Path,
    /// URL
    Url,
    /// Rule-defined custom kind
    Custom,
}

/// A token within a template recognized as parameterized data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Token index within the template (split on ASCII spaces)
    pub position: usize,
    /// Classified kind of the variable
    pub var_type: VariableType,
    /// Concrete values observed at this position, in arrival order
    pub seen_values: Vec<String>,
}

impl Variable {
    /// Create a variable seeded with its first observed value.
    pub fn new(position: usize, var_type: VariableType, first_value: &str) -> Self {
        Self {
            position,
            var_type,
            seen_values: vec![first_value.to_string()],
        }
    }
}

/// Mutable bookkeeping attached to a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternMetadata {
    /// Epoch second the pattern was first seen
    pub first_seen: i64,
    /// Epoch second of the most recent match
    pub last_seen: i64,
    /// Number of messages attributed to this pattern
    pub frequency: u32,
    /// Match confidence in `[0, 1]`; lowered by loose similarity matches
    pub confidence: f32,
}

/// A recognized message template with its extracted structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// The message that seeded this pattern
    pub template: String,
    /// Keyword classification of the template
    pub pattern_type: PatternType,
    /// wyhash of the template, the store key
    pub hash: u64,
    /// Variables extracted from the template, in token order
    pub variables: Vec<Variable>,
    /// Assigned category label
    pub category: String,
    /// Frequency and recency bookkeeping
    pub metadata: PatternMetadata,
}

impl Pattern {
    /// Seed a new pattern from a message at the given epoch second.
    ///
    /// Variables and the category are filled in by the analyzer after
    /// construction; a fresh pattern starts uncategorized with full
    /// confidence.
    pub fn seed(message: &str, now: i64) -> Self {
        Self {
            template: message.to_string(),
            pattern_type: PatternType::classify(message),
            hash: message_hash(message),
            variables: Vec::new(),
            category: "uncategorized".to_string(),
            metadata: PatternMetadata {
                first_seen: now,
                last_seen: now,
                frequency: 1,
                confidence: 1.0,
            },
        }
    }

    /// Record an exact or approximate match at the given epoch second.
    pub fn touch(&mut self, now: i64) {
        self.metadata.frequency = self.metadata.frequency.saturating_add(1);
        self.metadata.last_seen = now;
    }

    /// Lower confidence to the given similarity score if it is below the
    /// current value. Confidence never rises.
    pub fn weaken_confidence(&mut self, similarity: f32) {
        if similarity < self.metadata.confidence {
            self.metadata.confidence = similarity;
        }
    }
}
