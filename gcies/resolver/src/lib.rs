#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Resolves free-text place names to a single canonical entity and turns its
//! page into geo-cultural insights.

/// Error taxonomy shared by sources and the pipeline.
#[path = "../error.rs"]
pub mod error;

/// Parsed place queries.
#[path = "../query.rs"]
pub mod query;

/// Candidates and raw documents produced by sources.
#[path = "../candidate.rs"]
pub mod candidate;

/// Lexical candidate scoring and selection.
#[path = "../ranker.rs"]
pub mod ranker;

/// HTTP seam used by the sources.
#[path = "../transport.rs"]
pub mod transport;

/// Candidate sources (Wikipedia, regional directory).
#[path = "../sources/main.rs"]
pub mod sources;

/// TOML configuration.
#[path = "../config.rs"]
pub mod config;

/// Telemetry helpers.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Resolution pipeline entry point.
#[path = "../main.rs"]
pub mod pipeline;

pub use candidate::{Candidate, RawDocument, ScoredCandidate, SourceKind};
pub use config::{DirectoryConfig, FilterSettings, GciesConfig, HttpSettings, WikipediaConfig};
pub use error::{QueryError, ResolveError, SourceError};
pub use pipeline::{
    PipelineContext, Resolution, ResolutionPipeline, ResolutionPipelineBuilder, Suggestion,
};
pub use query::Query;
pub use ranker::{rank, rank_scored, score_candidate};
pub use sources::{CandidateSource, DirectorySource, WikipediaSource};
pub use telemetry::{ResolverTelemetry, ResolverTelemetryBuilder};
pub use transport::{HttpTransport, ReqwestTransport};
