use crate::EngineError;
use futures::{Stream, StreamExt};
pub use sparesults::{QueryResultsFormat, QuerySolution};
use sparesults::QueryResultsSerializer;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tpf_fusion_execution::{QueryError, SendableMappingStream};
use tpf_fusion_model::Variable;

/// A stream over [`QuerySolution`]s.
pub struct QuerySolutionStream {
    /// The variables used in the query solutions.
    variables: Arc<[Variable]>,
    inner: SendableMappingStream,
}

impl QuerySolutionStream {
    pub(crate) fn new(variables: Arc<[Variable]>, inner: SendableMappingStream) -> Self {
        Self { variables, inner }
    }

    /// The variables used in the solutions.
    #[inline]
    pub fn variables(&self) -> &[Variable] {
        self.variables.as_ref()
    }

    /// Writes all solutions in the given `format`.
    pub async fn write<W: Write>(
        mut self,
        writer: W,
        format: QueryResultsFormat,
    ) -> Result<W, EngineError> {
        let mut serializer = QueryResultsSerializer::from_format(format)
            .serialize_solutions_to_writer(writer, self.variables.to_vec())?;
        while let Some(solution) = self.next().await {
            serializer.serialize(&solution?)?;
        }
        Ok(serializer.finish()?)
    }
}

impl Stream for QuerySolutionStream {
    type Item = Result<QuerySolution, QueryError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mapping = match ready!(self.inner.as_mut().poll_next(cx)) {
            Some(Ok(mapping)) => mapping,
            Some(Err(error)) => return Poll::Ready(Some(Err(error))),
            None => return Poll::Ready(None),
        };
        let values = self
            .variables
            .iter()
            .map(|variable| mapping.get(variable).cloned())
            .collect::<Vec<_>>();
        Poll::Ready(Some(Ok((Arc::clone(&self.variables), values).into())))
    }
}
