//! Variable and category rules.
//!
//! Variable rules classify individual tokens. Rule patterns are not a
//! general regex engine: only the four keys in [`RegexKey`] are
//! recognized, and registering any other key is a configuration error.
//! Tokens no rule claims fall back to a small heuristic.
//!
//! Category rules label whole messages by counting keyword hits among the
//! message's cleaned tokens.

use crate::domain::pattern::{Variable, VariableType};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Key string recognized as the IPv4 dotted-quad pattern.
pub const KEY_IPV4: &str = r"^\d+\.\d+\.\d+\.\d+$";
/// Key string recognized as the pure-decimal pattern.
pub const KEY_DIGITS: &str = r"^\d+$";
/// Key string recognized as the RFC 4122 UUID pattern.
pub const KEY_UUID: &str =
    r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";
/// Key string recognized as the email pattern.
pub const KEY_EMAIL: &str = r"^[\w\.]+@[\w\.]+$";

/// The closed set of pattern keys variable rules may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexKey {
    /// Four non-empty decimal groups separated by exactly three dots
    Ipv4Quad,
    /// One or more decimal digits and nothing else
    Digits,
    /// 36 characters, hex groups of 8-4-4-4-12 separated by dashes
    Uuid,
    /// Word/dot characters around a single `@`
    Email,
}

impl RegexKey {
    /// Look up a pattern key. Unknown keys are rejected, not interpreted.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            KEY_IPV4 => Some(RegexKey::Ipv4Quad),
            KEY_DIGITS => Some(RegexKey::Digits),
            KEY_UUID => Some(RegexKey::Uuid),
            KEY_EMAIL => Some(RegexKey::Email),
            _ => None,
        }
    }

    /// Test a token against this key.
    pub fn matches(&self, token: &str) -> bool {
        match self {
            RegexKey::Ipv4Quad => {
                let mut groups = 0;
                for group in token.split('.') {
                    if group.is_empty() || !group.bytes().all(|b| b.is_ascii_digit()) {
                        return false;
                    }
                    groups += 1;
                }
                groups == 4
            }
            RegexKey::Digits => {
                !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
            }
            RegexKey::Uuid => {
                let bytes = token.as_bytes();
                if bytes.len() != 36 {
                    return false;
                }
                for (i, &b) in bytes.iter().enumerate() {
                    match i {
                        8 | 13 | 18 | 23 => {
                            if b != b'-' {
                                return false;
                            }
                        }
                        _ => {
                            if !b.is_ascii_hexdigit() {
                                return false;
                            }
                        }
                    }
                }
                true
            }
            RegexKey::Email => {
                let Some((local, domain)) = token.split_once('@') else {
                    return false;
                };
                let word = |s: &str| {
                    !s.is_empty()
                        && s.bytes()
                            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
                };
                word(local) && word(domain)
            }
        }
    }
}

/// A rule mapping tokens that match a pattern key to a variable type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRule {
    /// Human-readable rule name, used in diagnostics
    pub name: String,
    /// One of the recognized pattern keys ([`KEY_IPV4`] and friends)
    pub regex_key: String,
    /// Variable type assigned to matching tokens
    pub var_type: VariableType,
}

impl VariableRule {
    /// Create a rule, rejecting unknown pattern keys.
    pub fn new(name: &str, regex_key: &str, var_type: VariableType) -> Result<Self> {
        if RegexKey::parse(regex_key).is_none() {
            return Err(Error::InvalidConfiguration(format!(
                "variable rule '{}' uses unrecognized pattern key '{}'",
                name, regex_key
            )));
        }
        Ok(Self {
            name: name.to_string(),
            regex_key: regex_key.to_string(),
            var_type,
        })
    }

    /// Test a token. A rule whose key failed registration-time validation
    /// (possible when rules arrive via deserialization) never matches.
    pub fn matches(&self, token: &str) -> bool {
        RegexKey::parse(&self.regex_key)
            .map(|key| key.matches(token))
            .unwrap_or(false)
    }
}

/// A rule assigning a category when enough of its keywords appear.
///
/// Keywords are compared against cleaned, lowercased tokens, so they
/// should be written in lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Category label assigned on a win
    pub category: String,
    /// Keywords counted against the message's cleaned tokens
    pub keywords: BTreeSet<String>,
    /// Minimum number of distinct keyword hits required to win
    pub threshold: usize,
}

impl CategoryRule {
    /// Create a category rule from a keyword list.
    pub fn new(category: &str, keywords: &[&str], threshold: usize) -> Self {
        Self {
            category: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            threshold,
        }
    }
}

/// Heuristic token classification, applied when no variable rule matches.
///
/// A token is a variable iff its first byte is an ASCII digit (number), it
/// contains exactly three dots (IP address), or it contains `@` (email).
pub fn heuristic_variable_type(token: &str) -> Option<VariableType> {
    if token
        .as_bytes()
        .first()
        .map(|b| b.is_ascii_digit())
        .unwrap_or(false)
    {
        return Some(VariableType::Number);
    }
    if token.bytes().filter(|&b| b == b'.').count() == 3 {
        return Some(VariableType::IpAddress);
    }
    if token.contains('@') {
        return Some(VariableType::Email);
    }
    None
}

/// Extract variables from a message: split on ASCII spaces, try each rule
/// in registration order, then the heuristic. Token order is preserved;
/// `position` is the token index within the message.
///
/// A registered IPv4 rule owns IP classification outright: a token it
/// rejects is not reclassified by the looser three-dot heuristic. The
/// other heuristic clauses always apply as fallback.
pub fn extract_variables(message: &str, rules: &[VariableRule]) -> Vec<Variable> {
    let ipv4_rule_present = rules.iter().any(|rule| rule.regex_key == KEY_IPV4);
    let mut variables = Vec::new();
    for (position, token) in message.split(' ').enumerate() {
        if token.is_empty() {
            continue;
        }
        let var_type = rules
            .iter()
            .find(|rule| rule.matches(token))
            .map(|rule| rule.var_type)
            .or_else(|| match heuristic_variable_type(token) {
                Some(VariableType::IpAddress) if ipv4_rule_present => None,
                other => other,
            });
        if let Some(var_type) = var_type {
            variables.push(Variable::new(position, var_type, token));
        }
    }
    variables
}

/// Normalize a token for category matching: strip leading whitespace and
/// trailing non-alphanumerics, then lowercase.
pub fn clean_token(token: &str) -> String {
    token
        .trim_start()
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Assign a category to a message.
///
/// Each rule scores the number of distinct cleaned tokens equal to one of
/// its keywords. The highest score at or above its rule's threshold wins;
/// ties go to the earliest rule. With no winner, a message mentioning
/// `error` or `fail` is categorized `error`, anything else
/// `uncategorized`.
pub fn categorize(message: &str, rules: &[CategoryRule]) -> String {
    let tokens: HashSet<String> = message
        .split(' ')
        .map(clean_token)
        .filter(|t| !t.is_empty())
        .collect();

    let mut winner: Option<(&CategoryRule, usize)> = None;
    for rule in rules {
        let score = tokens.iter().filter(|t| rule.keywords.contains(*t)).count();
        if score >= rule.threshold && winner.map(|(_, best)| score > best).unwrap_or(true) {
            winner = Some((rule, score));
        }
    }

    if let Some((rule, _)) = winner {
        return rule.category.clone();
    }
    if message.contains("error") || message.contains("fail") {
        return "error".to_string();
    }
    "uncategorized".to_string()
}
