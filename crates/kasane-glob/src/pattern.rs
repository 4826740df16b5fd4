//! Parsed path patterns and pattern-set evaluation.

use crate::brace::expand_braces;
use crate::segment::Segment;
use crate::PatternError;

/// Upper bound on brace alternatives per pattern. Anything beyond this is
/// a malformed or adversarial pattern.
const MAX_ALTERNATIVES: usize = 4096;

/// A parsed glob pattern: optional negation prefix plus one segment list per
/// brace alternative.
///
/// Patterns may be absolute (`/app/**/*.js`) or relative (`test/**`); a
/// leading `/` is not significant for matching — callers decide which
/// namespace a pattern applies to. The empty pattern has a single empty
/// alternative and matches only the empty path.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    negated: bool,
    alternatives: Vec<Vec<Segment>>,
}

impl PathPattern {
    /// Parse a pattern string. A leading `!` marks the pattern as negated.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let (negated, body) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let expanded = expand_braces(body);
        if expanded.len() > MAX_ALTERNATIVES {
            return Err(PatternError::TooManyAlternatives(expanded.len()));
        }

        let alternatives = expanded
            .iter()
            .map(|alt| split_segments(alt).map(Segment::classify).collect())
            .collect();

        Ok(Self {
            raw: raw.to_string(),
            negated,
            alternatives,
        })
    }

    /// The original pattern text, including any negation prefix.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// True if the pattern carries a `!` negation prefix.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// The decomposed segment lists, one per brace alternative.
    pub fn alternatives(&self) -> &[Vec<Segment>] {
        &self.alternatives
    }

    /// Match a path against this pattern, ignoring the negation prefix.
    ///
    /// Negation is an instruction to the *set* evaluation, not to the single
    /// pattern: `!/x/**` still *matches* `/x/y`, which is what subtracts it.
    pub fn matches(&self, path: &str) -> bool {
        let input: Vec<&str> = split_segments(path).collect();
        self.alternatives
            .iter()
            .any(|alt| match_segments(alt, &input))
    }
}

/// Split a pattern or path into segments, dropping leading slashes and empty
/// runs (`//`). The empty string yields no segments.
fn split_segments(s: &str) -> impl Iterator<Item = &str> {
    s.split('/').filter(|seg| !seg.is_empty())
}

fn match_segments(pattern: &[Segment], input: &[&str]) -> bool {
    match pattern.first() {
        None => input.is_empty(),
        Some(Segment::Globstar) => {
            // Zero segments consumed, or one consumed and retry.
            match_segments(&pattern[1..], input)
                || (!input.is_empty() && match_segments(pattern, &input[1..]))
        }
        Some(seg) => match input.first() {
            Some(head) => seg.matches(head) && match_segments(&pattern[1..], &input[1..]),
            None => false,
        },
    }
}

/// An ordered list of patterns evaluated as a set: a path is in the set
/// when it matches at least one positive pattern and no negated one.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    positive: Vec<PathPattern>,
    negative: Vec<PathPattern>,
}

impl PatternSet {
    pub fn new(patterns: impl IntoIterator<Item = PathPattern>) -> Self {
        let mut set = Self::default();
        for pattern in patterns {
            set.push(pattern);
        }
        set
    }

    pub fn push(&mut self, pattern: PathPattern) {
        if pattern.is_negated() {
            self.negative.push(pattern);
        } else {
            self.positive.push(pattern);
        }
    }

    /// True if no positive pattern is present.
    pub fn is_empty(&self) -> bool {
        self.positive.is_empty()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.positive.iter().any(|p| p.matches(path))
            && !self.negative.iter().any(|p| p.matches(path))
    }
}
