use thiserror::Error;

/// Raw input that cannot form a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Nothing before the first comma.
    #[error("location name has an empty primary term")]
    EmptyPrimaryTerm,
}

/// Failures talking to a candidate source.
///
/// An empty search result is `Ok(vec![])`, never an error, so callers can tell
/// "nothing matched" apart from "the service is down".
#[derive(Debug, Error)]
pub enum SourceError {
    /// The identifier does not resolve to an existing page.
    #[error("not found: {0}")]
    NotFound(String),
    /// Connection, timeout or body read failure.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying client error.
        message: String,
    },
    /// Non-success HTTP status other than 404.
    #[error("{url} answered with HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status code.
        status: u16,
    },
    /// Payload did not have the expected shape.
    #[error("unexpected payload: {0}")]
    Decode(String),
}

/// Outcome of a failed resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Input had no usable primary term.
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] QueryError),
    /// No eligible candidate, or the resolved page does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Anything else: transport, classification, configuration.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ResolveError {
    /// True for the "not found" outward signal.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<SourceError> for ResolveError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(what) => Self::NotFound(what),
            other => Self::Internal(anyhow::Error::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_not_found_maps_to_not_found() {
        let err: ResolveError = SourceError::NotFound("Atlantis".into()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn transport_failures_are_internal() {
        let err: ResolveError = SourceError::Status {
            url: "https://en.wikipedia.org/w/api.php".into(),
            status: 503,
        }
        .into();
        assert!(matches!(err, ResolveError::Internal(_)));
        assert!(err.to_string().contains("503"));
    }
}
