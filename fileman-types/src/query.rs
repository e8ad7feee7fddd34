// SPDX-License-Identifier: GPL-3.0-only

//! Search queries and their results
//!
//! Terms are matched case-insensitively against file names. A term with `*`,
//! `?` or a `[...]` class is a glob over the whole name; any other term matches as a
//! substring, which is the same as the glob `*term*`.

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

use crate::FileSystemObject;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    terms: Vec<String>,
}

impl Query {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms
                .into_iter()
                .map(Into::into)
                .map(|term| term.trim().to_string())
                .filter(|term| !term.is_empty())
                .collect(),
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Glob pattern for a term, as understood by `find -iname`.
    pub fn glob_for(term: &str) -> String {
        if is_glob(term) {
            term.to_string()
        } else {
            format!("*{term}*")
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.terms.iter().any(|term| term_score(term, name) > 0.0)
    }

    /// Relevance in `0.0..=1.0`: the mean over all terms of the per-term
    /// score (exact name 1.0, prefix 0.75, anywhere else 0.5, no match 0.0).
    pub fn relevance(&self, name: &str) -> f32 {
        if self.terms.is_empty() {
            return 0.0;
        }

        let total: f32 = self.terms.iter().map(|term| term_score(term, name)).sum();
        total / self.terms.len() as f32
    }
}

fn is_glob(term: &str) -> bool {
    term.contains(['*', '?', '['])
}

fn term_score(term: &str, name: &str) -> f32 {
    let term = term.to_lowercase();
    let name = name.to_lowercase();

    if term == name {
        return 1.0;
    }

    if is_glob(&term) {
        return if glob_match(&term, &name) { 0.5 } else { 0.0 };
    }

    if name.starts_with(&term) {
        0.75
    } else if name.contains(&term) {
        0.5
    } else {
        0.0
    }
}

/// Whole-name glob match; a term that is not a valid pattern matches
/// literally, as `find -iname` treats it.
fn glob_match(term: &str, name: &str) -> bool {
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    Pattern::new(term)
        .or_else(|_| Pattern::new(&Pattern::escape(term)))
        .is_ok_and(|pattern| pattern.matches_with(name, options))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub object: FileSystemObject,
    pub relevance: f32,
}

impl SearchResult {
    pub fn new(object: FileSystemObject, query: &Query) -> Self {
        let relevance = query.relevance(&object.name);
        Self { object, relevance }
    }
}

/// Highest relevance first, then by full path.
pub fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(|left, right| {
        right
            .relevance
            .total_cmp(&left.relevance)
            .then_with(|| left.object.full_path().cmp(&right.object.full_path()))
    });
}
