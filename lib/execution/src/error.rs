use futures::Stream;
use std::pin::Pin;
use thiserror::Error;
use tpf_fusion_client::FragmentError;
use tpf_fusion_model::{MappingChunk, SolutionMapping, TriplePattern};

pub type QueryResult<T> = Result<T, QueryError>;

/// A stream of solution mappings.
pub type SendableMappingStream = Pin<Box<dyn Stream<Item = QueryResult<SolutionMapping>> + Send>>;

/// A stream of chunks of solution mappings.
pub type SendableChunkStream = Pin<Box<dyn Stream<Item = QueryResult<MappingChunk>> + Send>>;

/// An error that aborts the evaluation of a query.
///
/// Most fragment errors only affect a single fragment and are treated as if the fragment had no
/// matches. Only errors that make every further request impossible abort the evaluation.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("The start fragment is not usable: {0}")]
    StartFragment(#[source] FragmentError),
}

/// Decides whether `error`, raised by a fragment of `pattern`, aborts the evaluation.
///
/// Errors of the start fragment are returned. All other errors are logged and ignored.
pub(crate) fn downgrade_fragment_error(
    pattern: &TriplePattern,
    error: FragmentError,
) -> QueryResult<()> {
    if error.is_start_fragment_error() {
        return Err(QueryError::StartFragment(error));
    }
    tracing::warn!("Treating fragment of {pattern} as empty: {error}");
    Ok(())
}
