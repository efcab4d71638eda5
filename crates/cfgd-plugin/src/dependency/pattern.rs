//! Database key patterns.
//!
//! Keys are dot-separated, with numeric vector indices: `a.0.b.8`.
//! In a pattern, `[]` stands for one `.<index>` step and a `*` matches the
//! rest of the key: `a[].b*` matches `a.0.b`, `a.0.b.8` and `a.12.bc`.
//! A pattern may end in `:variable`, which is kept apart from the key part.

use std::fmt;

/// A parsed dependency key pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPattern {
    /// Key part, e.g. `a[].b*`.
    key: String,
    /// Optional variable name after `:`.
    variable: Option<String>,
}

impl KeyPattern {
    /// Parses `key[:variable]`.
    pub fn parse(pattern: &str) -> Self {
        match pattern.split_once(':') {
            Some((key, var)) => Self {
                key: key.to_string(),
                variable: Some(var.to_string()),
            },
            None => Self {
                key: pattern.to_string(),
                variable: None,
            },
        }
    }

    /// Returns the key part.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the variable name, if one was given.
    pub fn variable(&self) -> Option<&str> {
        self.variable.as_deref()
    }

    /// Matches a concrete key, returning the matched part of it.
    pub fn matches<'k>(&self, key: &'k str) -> Option<&'k str> {
        match_key(key, &self.key)
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variable {
            Some(var) => write!(f, "{}:{}", self.key, var),
            None => f.write_str(&self.key),
        }
    }
}

/// Matches `key` against the key part of a pattern.
///
/// On success returns the prefix of `key` that the pattern covered: the
/// whole key for an exact match, or the part before the `*` for a wildcard.
pub fn match_key<'k>(key: &'k str, pattern: &str) -> Option<&'k str> {
    let k = key.as_bytes();
    let p = pattern.as_bytes();
    let (mut i, mut j) = (0, 0);

    while i < k.len() && j < p.len() {
        match p[j] {
            b'*' => return key.get(..i),
            b'[' if k[i] == b'.' => {
                if p.get(j + 1) != Some(&b']') {
                    return None;
                }
                let digits = k[i + 1..].iter().take_while(|c| c.is_ascii_digit()).count();
                if digits == 0 {
                    return None;
                }
                i += 1 + digits;
                j += 2;
            }
            c if c == k[i] => {
                i += 1;
                j += 1;
            }
            _ => return None,
        }
    }

    if i == k.len() && (j == p.len() || &p[j..] == b"*") {
        Some(key)
    } else {
        None
    }
}
