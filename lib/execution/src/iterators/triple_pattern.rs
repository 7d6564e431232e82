use crate::{
    ArrayToElementsIterator, FirstTriplePatternIterator, QueryResult, SendableMappingStream,
};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tpf_fusion_client::FragmentClient;
use tpf_fusion_model::{SolutionMapping, TriplePattern};

/// Evaluates a single triple pattern for every input mapping and yields individual mappings.
pub struct TriplePatternIterator {
    inner: ArrayToElementsIterator,
}

impl TriplePatternIterator {
    pub fn new(
        input: SendableMappingStream,
        pattern: TriplePattern,
        chunk_size: usize,
        client: FragmentClient,
    ) -> Self {
        let first = FirstTriplePatternIterator::new(input, pattern, chunk_size, client);
        Self {
            inner: ArrayToElementsIterator::new(Box::pin(first)),
        }
    }
}

impl Stream for TriplePatternIterator {
    type Item = QueryResult<SolutionMapping>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
