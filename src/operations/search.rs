//! Client-side filename matching for `search_files`.
//!
//! Patterns use shell-glob syntax: `*`, `?`, `[seq]` and `[!seq]`. Every
//! other character is literal, including `{`, `}`, `\` and an unclosed `[`.
//! Matching is case-sensitive and `*` also matches `/`.

use regex::Regex;

use crate::error::{BridgeError, Result};

/// A compiled shell-glob pattern.
#[derive(Debug, Clone)]
pub struct GlobFilter {
    pattern: String,
    /// `None` when a set in the pattern can never match, e.g. `[z-a]`.
    matcher: Option<Regex>,
}

impl GlobFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        let matcher = match translate(pattern) {
            Some(re) => Some(Regex::new(&re).map_err(|e| BridgeError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.matcher.as_ref().is_some_and(|re| re.is_match(name))
    }

    /// Keeps matching names in their original order.
    pub fn filter(&self, names: Vec<String>) -> Vec<String> {
        names.into_iter().filter(|name| self.is_match(name)).collect()
    }
}

fn escape(c: char) -> String {
    regex::escape(c.encode_utf8(&mut [0; 4]))
}

/// Anchored regex for `pattern`, or `None` when nothing can match.
fn translate(pattern: &str) -> Option<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut re = String::from("^(?s:");
    let mut i = 0;
    let mut after_star = false;

    while i < chars.len() {
        let c = chars[i];
        i += 1;

        if c == '*' {
            if !after_star {
                re.push_str(".*");
            }
            after_star = true;
            continue;
        }
        after_star = false;

        match c {
            '?' => re.push('.'),
            '[' => match set_end(&chars, i) {
                Some(end) => {
                    re.push_str(&set(&chars[i..end])?);
                    i = end + 1;
                }
                None => re.push_str(r"\["),
            },
            c => re.push_str(&escape(c)),
        }
    }

    re.push_str(r")\z");
    Some(re)
}

/// Index of the `]` closing a set opened just before `start`. A `]` right
/// after the opening (or after `!`) belongs to the set.
fn set_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() && chars[j] != ']' {
        j += 1;
    }
    (j < chars.len()).then_some(j)
}

/// Regex class for the body of a `[...]` set.
///
/// Reversed ranges are dropped. A set left empty matches nothing, or any
/// single character when negated.
fn set(body: &[char]) -> Option<String> {
    let (negated, body) = match body.split_first() {
        Some(('!', rest)) => (true, rest),
        _ => (false, body),
    };

    let mut ranges = Vec::new();
    let mut k = 0;
    while k < body.len() {
        if k + 2 < body.len() && body[k + 1] == '-' {
            ranges.push((body[k], body[k + 2]));
            k += 3;
        } else {
            ranges.push((body[k], body[k]));
            k += 1;
        }
    }
    ranges.retain(|(lo, hi)| lo <= hi);

    if ranges.is_empty() {
        return negated.then(|| ".".to_string());
    }

    let mut class = String::from(if negated { "[^" } else { "[" });
    for (lo, hi) in ranges {
        class.push_str(&escape(lo));
        if lo != hi {
            class.push('-');
            class.push_str(&escape(hi));
        }
    }
    class.push(']');
    Some(class)
}
