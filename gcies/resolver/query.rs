use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::error::QueryError;

/// Lower-cases and strips whitespace and hyphens, so that "New-York",
/// "new york" and "NewYork" compare equal.
#[must_use]
pub fn normalize_term(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// A place lookup: the primary term plus hierarchical context hints.
///
/// `"Springfield, Illinois"` parses to primary term `Springfield` and context
/// term `illinois`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    primary_term: String,
    context_terms: Vec<String>,
}

impl Query {
    /// Splits raw input on commas.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let mut segments = raw.split(',');
        let primary = segments.next().unwrap_or_default();
        Self::new(primary, segments)
    }

    /// Builds a query from parts; context terms are normalized and empty ones
    /// dropped.
    pub fn new<I, S>(primary_term: &str, context_terms: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let primary_term = primary_term.split_whitespace().collect::<Vec<_>>().join(" ");
        if primary_term.is_empty() {
            return Err(QueryError::EmptyPrimaryTerm);
        }
        let context_terms = context_terms
            .into_iter()
            .map(|term| normalize_term(term.as_ref()))
            .filter(|term| !term.is_empty())
            .collect();
        Ok(Self {
            primary_term,
            context_terms,
        })
    }

    /// The place name itself.
    #[must_use]
    pub fn primary_term(&self) -> &str {
        &self.primary_term
    }

    /// Normalized disambiguation hints, in input order.
    #[must_use]
    pub fn context_terms(&self) -> &[String] {
        &self.context_terms
    }
}

impl FromStr for Query {
    type Err = QueryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.primary_term)?;
        for term in &self.context_terms {
            write!(f, ", {term}")?;
        }
        Ok(())
    }
}
