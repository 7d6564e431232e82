use spargebra::SparqlSyntaxError;
use std::io;
use tpf_fusion_client::FragmentError;
use tpf_fusion_execution::QueryError;

/// An error raised by a [`TpfEngine`](crate::TpfEngine).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The query could not be parsed.
    #[error(transparent)]
    Syntax(#[from] SparqlSyntaxError),
    /// The query uses a feature that cannot be evaluated over triple pattern fragments.
    #[error("Unsupported query: {0}")]
    Unsupported(String),
    /// The evaluation of the query failed.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// The fragment client could not be created.
    #[error(transparent)]
    Fragment(#[from] FragmentError),
    /// An error raised while writing the results.
    #[error("Could not serialize the results: {0}")]
    Serialization(#[from] io::Error),
    /// The configuration could not be read.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
